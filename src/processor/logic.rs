//! The fetch-decode-execute step. Grounded in the teaching codebase's
//! `processor::logic::tick` free function, which takes the mutable register
//! file and storage by reference and returns a small result enum instead of
//! mutating a result field — adapted here to picovm's byte-opcode, packed
//! nibble-operand instruction shape rather than the teacher's 32-bit
//! R/I/J-format words.

use num_traits::FromPrimitive;

use super::core::Core;
use crate::constants;
use crate::error::RuntimeError;
use crate::memory::Storage;
use crate::opcode::Opcode;
use crate::streams::VmStreams;

pub enum TickResult {
    Next,
    Halted,
}

fn widen_add(a: u16, b: u16) -> (u16, bool) {
    let sum = a as u32 + b as u32;
    (sum as u16, sum > 0xFFFF)
}

fn widen_sub(a: u16, b: u16) -> (u16, bool) {
    let borrow = (a as i32) - (b as i32) < 0;
    (a.wrapping_sub(b), borrow)
}

fn widen_mul(a: u16, b: u16) -> (u16, bool) {
    let product = a as u32 * b as u32;
    (product as u16, product > 0xFFFF)
}

/// Executes the single instruction at `core.ip`, advancing `ip` past its
/// encoded length and updating flags for flag-setting instructions.
pub fn tick(
    core: &mut Core,
    memory: &mut dyn Storage,
    streams: &mut dyn VmStreams,
) -> Result<TickResult, RuntimeError> {
    let opcode_byte = core.fetch_opcode_byte(memory)?;
    let opcode = match Opcode::from_u8(opcode_byte) {
        Some(opcode) => opcode,
        // No `default:` case in the original dispatch switch: an unmatched
        // byte is silently skipped and execution continues at the next one.
        None => return Ok(TickResult::Next),
    };

    match opcode {
        Opcode::Nop | Opcode::Swap => {}

        Opcode::LoadRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            core.registers[rd] = core.registers[rs];
        }
        Opcode::LoadRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            core.registers[rd] = imm;
        }
        Opcode::LoadRegDeref => {
            let rd = core.fetch_reg(memory)?;
            let addr = core.fetch_word(memory)?;
            core.registers[rd] = memory
                .read_word(addr)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::LoadRegRegderef => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let addr = core.registers[rs];
            core.registers[rd] = memory
                .read_word(addr)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::LoadRegRegderefOff => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let off = core.fetch_word(memory)?;
            let addr = core.registers[rs].wrapping_add(off);
            core.registers[rd] = memory
                .read_word(addr)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }

        Opcode::StorPtrderefReg => {
            let addr = core.fetch_word(memory)?;
            let rs = core.fetch_reg(memory)?;
            let value = core.registers[rs];
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::StorRegderefReg => {
            let (ra, rs) = core.fetch_reg_pair(memory)?;
            let addr = core.registers[ra];
            let value = core.registers[rs];
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::StorRegderefOffReg => {
            let (ra, rs) = core.fetch_reg_pair(memory)?;
            let off = core.fetch_word(memory)?;
            let addr = core.registers[ra].wrapping_add(off);
            let value = core.registers[rs];
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::StorPtrderefImm => {
            let addr = core.fetch_word(memory)?;
            let value = core.fetch_word(memory)?;
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::StorRegderefImm => {
            let ra = core.fetch_reg(memory)?;
            let value = core.fetch_word(memory)?;
            let addr = core.registers[ra];
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }
        Opcode::StorRegderefOffImm => {
            let ra = core.fetch_reg(memory)?;
            let off = core.fetch_word(memory)?;
            let value = core.fetch_word(memory)?;
            let addr = core.registers[ra].wrapping_add(off);
            memory
                .write_word(addr, value)
                .map_err(|_| RuntimeError::BadMemoryAccess { address: addr })?;
        }

        Opcode::AddRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let (result, carry) = widen_add(core.registers[rd], core.registers[rs]);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::AddRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            let (result, carry) = widen_add(core.registers[rd], imm);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::SubRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let (result, carry) = widen_sub(core.registers[rd], core.registers[rs]);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::SubRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            let (result, carry) = widen_sub(core.registers[rd], imm);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::MulRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let (result, carry) = widen_mul(core.registers[rd], core.registers[rs]);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::MulRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            let (result, carry) = widen_mul(core.registers[rd], imm);
            core.registers[rd] = result;
            core.set_flag(constants::FLAG_CARRY, carry);
        }
        Opcode::DivRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            let divisor = core.registers[rs];
            core.registers[rd] = if divisor == 0 {
                0
            } else {
                core.registers[rd] / divisor
            };
        }
        Opcode::DivRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            core.registers[rd] = if imm == 0 { 0 } else { core.registers[rd] / imm };
        }

        Opcode::NotReg => {
            let rd = core.fetch_reg(memory)?;
            core.registers[rd] = !core.registers[rd];
        }
        Opcode::OrRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            core.registers[rd] |= core.registers[rs];
        }
        Opcode::OrRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            core.registers[rd] |= imm;
        }
        Opcode::AndRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            core.registers[rd] &= core.registers[rs];
        }
        Opcode::AndRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            core.registers[rd] &= imm;
        }
        Opcode::XorRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            core.registers[rd] ^= core.registers[rs];
        }
        Opcode::XorRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            core.registers[rd] ^= imm;
        }

        Opcode::TestRegReg => {
            let (rd, rs) = core.fetch_reg_pair(memory)?;
            test(core, core.registers[rd], core.registers[rs]);
        }
        Opcode::TestRegImm => {
            let rd = core.fetch_reg(memory)?;
            let imm = core.fetch_word(memory)?;
            test(core, core.registers[rd], imm);
        }

        Opcode::Call => {
            let target = core.fetch_word(memory)?;
            let ret = core.ip;
            core.push_word(memory, ret)?;
            core.ip = target;
        }
        Opcode::Calldyn => {
            let rs = core.fetch_reg(memory)?;
            let target = core.registers[rs];
            let ret = core.ip;
            core.push_word(memory, ret)?;
            core.ip = target;
        }
        Opcode::Ret => {
            core.ip = core.pop_word(memory)?;
        }
        Opcode::Rti => {
            let saved_flags = core.pop_byte(memory)?;
            core.ip = core.pop_word(memory)?;
            core.flags = saved_flags;
            core.perf_int = false;
        }
        Opcode::Push => {
            let rs = core.fetch_reg(memory)?;
            let value = core.registers[rs];
            core.push_word(memory, value)?;
        }
        Opcode::Pop => {
            let rd = core.fetch_reg(memory)?;
            let value = core.pop_word(memory)?;
            core.registers[rd] = value;
        }
        Opcode::Sethead => {
            let imm = core.fetch_word(memory)?;
            core.registers[constants::STACK_HEAD] = imm;
        }
        Opcode::Setbase => {
            let imm = core.fetch_word(memory)?;
            core.registers[constants::STACK_BASE] = imm;
        }

        Opcode::Branch => {
            let target = core.fetch_word(memory)?;
            core.ip = target;
        }
        Opcode::BranchEqual => {
            let target = core.fetch_word(memory)?;
            if core.flag(constants::FLAG_ZERO) {
                core.ip = target;
            }
        }
        Opcode::BranchNotEqual => {
            let target = core.fetch_word(memory)?;
            if !core.flag(constants::FLAG_ZERO) {
                core.ip = target;
            }
        }
        Opcode::BranchLessThan | Opcode::BranchGreaterThan => {
            let target = core.fetch_word(memory)?;
            if !core.flag(constants::FLAG_ZERO) && !core.flag(constants::FLAG_PLUS) {
                core.ip = target;
            }
        }
        Opcode::BranchLessThanEqual | Opcode::BranchGreaterThanEqual => {
            let target = core.fetch_word(memory)?;
            if core.flag(constants::FLAG_ZERO) || !core.flag(constants::FLAG_PLUS) {
                core.ip = target;
            }
        }

        Opcode::ReadinImmImm => {
            let count = core.fetch_word(memory)?;
            let addr = core.fetch_word(memory)?;
            readin(memory, streams, count, addr)?;
        }
        Opcode::ReadinRegImm => {
            let rcount = core.fetch_reg(memory)?;
            let addr = core.fetch_word(memory)?;
            let count = core.registers[rcount];
            readin(memory, streams, count, addr)?;
        }
        Opcode::ReadinImmReg => {
            let count = core.fetch_word(memory)?;
            let raddr = core.fetch_reg(memory)?;
            let addr = core.registers[raddr];
            readin(memory, streams, count, addr)?;
        }
        Opcode::ReadinRegReg => {
            let (rcount, raddr) = core.fetch_reg_pair(memory)?;
            let count = core.registers[rcount];
            let addr = core.registers[raddr];
            readin(memory, streams, count, addr)?;
        }
        Opcode::WriteoutImmImm => {
            let count = core.fetch_word(memory)?;
            let addr = core.fetch_word(memory)?;
            writeout(memory, streams, count, addr)?;
        }
        Opcode::WriteoutRegImm => {
            let rcount = core.fetch_reg(memory)?;
            let addr = core.fetch_word(memory)?;
            let count = core.registers[rcount];
            writeout(memory, streams, count, addr)?;
        }
        Opcode::WriteoutImmReg => {
            let count = core.fetch_word(memory)?;
            let raddr = core.fetch_reg(memory)?;
            let addr = core.registers[raddr];
            writeout(memory, streams, count, addr)?;
        }
        Opcode::WriteoutRegReg => {
            let (rcount, raddr) = core.fetch_reg_pair(memory)?;
            let count = core.registers[rcount];
            let addr = core.registers[raddr];
            writeout(memory, streams, count, addr)?;
        }

        Opcode::Enint => {
            core.interrupt_mask = true;
        }
        Opcode::Disint => {
            core.interrupt_mask = false;
        }
        Opcode::Halt => {
            core.set_flag(constants::FLAG_HALT, true);
            return Ok(TickResult::Halted);
        }
    }

    Ok(TickResult::Next)
}

fn test(core: &mut Core, a: u16, b: u16) {
    let (result, borrow) = widen_sub(a, b);
    core.set_flag(constants::FLAG_ZERO, result == 0);
    core.set_flag(constants::FLAG_PLUS, borrow);
    core.set_flag(constants::FLAG_PARITY, result % 2 != 0);
}

fn readin(
    memory: &mut dyn Storage,
    streams: &mut dyn VmStreams,
    count: u16,
    addr: u16,
) -> Result<(), RuntimeError> {
    let mut buf = vec![0u8; count as usize];
    streams.read_bytes(&mut buf).map_err(RuntimeError::Stream)?;
    for (i, byte) in buf.into_iter().enumerate() {
        let a = addr.wrapping_add(i as u16);
        memory
            .write_byte(a, byte)
            .map_err(|_| RuntimeError::BadMemoryAccess { address: a })?;
    }
    Ok(())
}

fn writeout(
    memory: &dyn Storage,
    streams: &mut dyn VmStreams,
    count: u16,
    addr: u16,
) -> Result<(), RuntimeError> {
    let mut buf = vec![0u8; count as usize];
    for (i, slot) in buf.iter_mut().enumerate() {
        let a = addr.wrapping_add(i as u16);
        *slot = memory
            .read_byte(a)
            .map_err(|_| RuntimeError::BadMemoryAccess { address: a })?;
    }
    streams.write_bytes(&buf).map_err(RuntimeError::Stream)
}
