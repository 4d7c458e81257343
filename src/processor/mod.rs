mod core;
mod logic;

pub use self::core::Core;
pub use self::logic::TickResult;

use log::{debug, info};

use crate::constants;
use crate::error::RuntimeError;
use crate::interrupt::InterruptHandle;
use crate::memory::{Memory, Storage};
use crate::pacer::Pacer;
use crate::streams::VmStreams;

/// Why a run of the VM ended.
#[derive(Debug, PartialEq, Eq)]
pub enum ExitCode {
    /// `HALT` was executed.
    Halted,
}

/// Ties together the register/flag state, the flat memory, the interrupt
/// mailbox and the tick pacer into one runnable machine.
pub struct Processor {
    core: Core,
    memory: Memory,
    interrupt: InterruptHandle,
    pacer: Pacer,
}

impl Processor {
    pub fn new(interrupt: InterruptHandle, step_ms: u64) -> Processor {
        Processor {
            core: Core::new(),
            memory: Memory::new(),
            interrupt,
            pacer: Pacer::new(step_ms),
        }
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    /// Seeds memory (e.g. interrupt vectors) ahead of a test run.
    #[cfg(test)]
    pub(crate) fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    pub fn registers(&self) -> &[u16; constants::REGISTER_COUNT] {
        &self.core.registers
    }

    pub fn flags(&self) -> u8 {
        self.core.flags
    }

    /// Copies `rom` into the ROM region and reads the startup vector.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), RuntimeError> {
        self.memory.load_rom(rom)?;
        self.core.reset(&self.memory)
    }

    /// Runs the fetch-decode-execute loop until `HALT` is set.
    pub fn run(&mut self, streams: &mut dyn VmStreams) -> Result<ExitCode, RuntimeError> {
        info!("starting run at ip={:#06x}", self.core.ip);
        loop {
            self.service_interrupt()?;

            debug!(
                "step ip={:#06x} flags={:#04x} rs={:?}",
                self.core.ip, self.core.flags, self.core.registers
            );

            match logic::tick(&mut self.core, &mut self.memory, streams)? {
                TickResult::Next => {}
                TickResult::Halted => {
                    info!("halted at ip={:#06x}", self.core.ip);
                    return Ok(ExitCode::Halted);
                }
            }

            self.pacer.wait();
        }
    }

    fn service_interrupt(&mut self) -> Result<(), RuntimeError> {
        if !self.core.interrupt_mask || self.core.perf_int {
            return Ok(());
        }

        match self.interrupt.take() {
            Some(id) => {
                debug!("servicing interrupt {:?}", id);
                self.core.perf_int = true;
                let ret_ip = self.core.ip;
                let saved_flags = self.core.flags;
                self.core.push_word(&mut self.memory, ret_ip)?;
                self.core.push_byte(&mut self.memory, saved_flags)?;
                let vector_addr = constants::INTERRUPT_VECTORS[id.vector_index()];
                self.core.ip = self
                    .memory
                    .read_word(vector_addr)
                    .map_err(|_| RuntimeError::BadMemoryAccess {
                        address: vector_addr,
                    })?;
            }
            None => {}
        }

        Ok(())
    }
}
