use matches::assert_matches;

use super::*;
use crate::constants;
use crate::error::RuntimeError;
use crate::streams::VmStreams;
use std::io;

struct NullStreams;

impl VmStreams for NullStreams {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<()> {
        for b in buf.iter_mut() {
            *b = 0;
        }
        Ok(())
    }

    fn write_bytes(&mut self, _buf: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Assembles nothing by hand; builds a raw ROM byte vector and places the
/// startup vector at the end, mirroring the `.set 0xFFFE; .word start`
/// idiom the assembler emits.
fn rom_with_startup(body: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; constants::ROM_LEN];
    rom[..body.len()].copy_from_slice(body);
    let startup = constants::ROM_BASE;
    let off = (constants::STARTUP_VECTOR - constants::ROM_BASE) as usize;
    rom[off] = (startup >> 8) as u8;
    rom[off + 1] = (startup & 0xFF) as u8;
    rom
}

fn run_rom(body: &[u8]) -> Processor {
    let rom = rom_with_startup(body);
    let mut processor = Processor::new(interrupt::disabled(), 0);
    processor.load_rom(&rom).unwrap();
    let mut streams = NullStreams;
    let exit = processor.run(&mut streams).unwrap();
    assert_eq!(exit, ExitCode::Halted);
    processor
}

fn reg_imm(opcode: u8, reg: u8, imm: u16) -> Vec<u8> {
    vec![opcode, reg, (imm >> 8) as u8, (imm & 0xFF) as u8]
}

fn reg_reg(opcode: u8, rd: u8, rs: u8) -> Vec<u8> {
    vec![opcode, (rd << 4) | rs]
}

#[test]
fn s1_arithmetic_and_halt() {
    let mut body = Vec::new();
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 5));
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 1, 3));
    body.extend(reg_reg(Opcode::AddRegReg as u8, 0, 1));
    body.push(Opcode::Halt as u8);

    let processor = run_rom(&body);

    assert_eq!(processor.registers()[0], 8);
    assert!(processor.flags() & constants::FLAG_HALT != 0);
    assert!(processor.flags() & constants::FLAG_CARRY == 0);
}

#[test]
fn s2_branch_taken_on_zero() {
    let mut body = Vec::new();
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 0));
    body.extend(reg_imm(Opcode::TestRegImm as u8, 0, 0));

    // beql done
    let done_target = constants::ROM_BASE + 16;
    body.push(Opcode::BranchEqual as u8);
    body.push((done_target >> 8) as u8);
    body.push((done_target & 0xFF) as u8);

    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 1));

    let mut rom = vec![0u8; constants::ROM_LEN];
    rom[..body.len()].copy_from_slice(&body);
    let done_off = 16usize;
    rom[done_off] = Opcode::Halt as u8;
    let off = (constants::STARTUP_VECTOR - constants::ROM_BASE) as usize;
    rom[off] = (constants::ROM_BASE >> 8) as u8;
    rom[off + 1] = (constants::ROM_BASE & 0xFF) as u8;

    let mut processor = Processor::new(interrupt::disabled(), 0);
    processor.load_rom(&rom).unwrap();
    let mut streams = NullStreams;
    let exit = processor.run(&mut streams).unwrap();

    assert_eq!(exit, ExitCode::Halted);
    assert_eq!(processor.registers()[0], 0);
}

#[test]
fn s3_stack_round_trip() {
    let mut body = Vec::new();
    body.push(Opcode::Sethead as u8);
    body.push(0x80);
    body.push(0x00);

    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 0x1234));
    body.push(Opcode::Push as u8);
    body.push(0);
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 0));
    body.push(Opcode::Pop as u8);
    body.push(0);
    body.push(Opcode::Halt as u8);

    let processor = run_rom(&body);

    assert_eq!(processor.registers()[0], 0x1234);
    assert_eq!(processor.registers()[constants::STACK_HEAD], 0x8000);
}

#[test]
fn s6_div_by_zero_yields_zero() {
    let mut body = Vec::new();
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 0x10));
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 1, 0));
    body.extend(reg_reg(Opcode::DivRegReg as u8, 0, 1));
    body.push(Opcode::Halt as u8);

    let processor = run_rom(&body);

    assert_eq!(processor.registers()[0], 0);
}

#[test]
fn test_does_not_modify_destination_register() {
    let mut body = Vec::new();
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 7));
    body.extend(reg_imm(Opcode::TestRegImm as u8, 0, 7));
    body.push(Opcode::Halt as u8);

    let processor = run_rom(&body);

    assert_eq!(processor.registers()[0], 7);
    assert!(processor.flags() & constants::FLAG_ZERO != 0);
}

#[test]
fn call_then_ret_returns_to_instruction_after_call() {
    // call sub; load %1,#1; halt;   sub: load %0,#9; ret;
    let mut body = Vec::new();
    body.push(Opcode::Sethead as u8);
    body.push(0x90);
    body.push(0x00);
    let call_operand_at = body.len() + 1;
    body.push(Opcode::Call as u8);
    body.push(0);
    body.push(0);
    body.extend(reg_imm(Opcode::LoadRegImm as u8, 1, 1));
    body.push(Opcode::Halt as u8);

    let sub_start = constants::ROM_BASE + body.len() as u16;
    body[call_operand_at] = (sub_start >> 8) as u8;
    body[call_operand_at + 1] = (sub_start & 0xFF) as u8;

    body.extend(reg_imm(Opcode::LoadRegImm as u8, 0, 9));
    body.push(Opcode::Ret as u8);

    let processor = run_rom(&body);

    assert_eq!(processor.registers()[0], 9);
    assert_eq!(processor.registers()[1], 1);
}

#[test]
fn s4_interrupt_pushes_return_state_and_dispatches_vector() {
    let mut rom = vec![0u8; constants::ROM_LEN];

    // sethead #8000h; enint; loop: jump loop;
    rom[0] = Opcode::Sethead as u8;
    rom[1] = 0x80;
    rom[2] = 0x00;
    rom[3] = Opcode::Enint as u8;
    let loop_offset = 4usize;
    let loop_addr = constants::ROM_BASE + loop_offset as u16;
    rom[loop_offset] = Opcode::Branch as u8;
    rom[loop_offset + 1] = (loop_addr >> 8) as u8;
    rom[loop_offset + 2] = (loop_addr & 0xFF) as u8;

    // the P0 handler, well clear of the loop body: halt;
    let handler_offset = 0x10usize;
    let handler_addr = constants::ROM_BASE + handler_offset as u16;
    rom[handler_offset] = Opcode::Halt as u8;

    let off = (constants::STARTUP_VECTOR - constants::ROM_BASE) as usize;
    rom[off] = (constants::ROM_BASE >> 8) as u8;
    rom[off + 1] = (constants::ROM_BASE & 0xFF) as u8;

    // post P0 before the run starts; it stays pending until `enint` sets the
    // interrupt mask, matching the FIFO producer's wait-for-drain contract.
    let handle = interrupt::disabled();
    handle.post(InterruptId::P0);

    let mut processor = Processor::new(handle, 0);
    processor.load_rom(&rom).unwrap();
    let vector_addr = constants::INTERRUPT_VECTORS[InterruptId::P0.vector_index()];
    processor.memory_mut().write_word(vector_addr, handler_addr).unwrap();

    let mut streams = NullStreams;
    let exit = processor.run(&mut streams).unwrap();

    assert_eq!(exit, ExitCode::Halted);
    // push order is ip (word) then flags (byte), matching RTI's pop order.
    assert_eq!(processor.registers()[constants::STACK_HEAD], 0x8003);
    assert_eq!(processor.memory().read_word(0x8000).unwrap(), loop_addr);
    assert_eq!(processor.memory().read_byte(0x8002).unwrap(), 0);
}

#[test]
fn oversized_rom_is_rejected() {
    let rom = vec![0u8; constants::ROM_LEN + 1];
    let mut processor = Processor::new(interrupt::disabled(), 0);
    assert_matches!(
        processor.load_rom(&rom),
        Err(RuntimeError::RomTooLarge { .. })
    );
}

#[test]
fn big_endian_word_round_trip() {
    let mut memory = Memory::new();
    memory.write_word(0x1000, 0xBEEF).unwrap();
    assert_eq!(memory.read_word(0x1000).unwrap(), 0xBEEF);
    assert_eq!(memory.borrow_slice(0x1000, 2).unwrap(), &[0xBE, 0xEF]);
}
