//! picovm: a 16-bit virtual machine over a flat 64 KiB memory, driven by a
//! byte-opcode instruction set with packed-nibble register operands.

pub mod constants;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod opcode;
pub mod pacer;
pub mod processor;
pub mod streams;

pub use error::RuntimeError;
pub use interrupt::{spawn_fifo_producer, InterruptHandle, InterruptId};
pub use memory::{Memory, Storage};
pub use opcode::Opcode;
pub use processor::{ExitCode, Processor};
pub use streams::{StdStreams, VmStreams};

#[cfg(test)]
mod test;
