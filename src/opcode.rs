use num_derive::{FromPrimitive, ToPrimitive};
use std::fmt;

/// Closed enumeration of byte-valued opcodes understood by the VM core and
/// emitted by the assembler's instruction matrix.
///
/// Variants are grouped by family; the explicit discriminants are the
/// authoritative, consolidated layout used by the ROM format.
#[derive(Clone, Copy, PartialEq, Eq, Debug, FromPrimitive, ToPrimitive)]
pub enum Opcode {
    Nop = 0x00,
    Swap = 0x01,

    LoadRegReg = 0x10,
    LoadRegImm = 0x11,
    LoadRegDeref = 0x12,
    LoadRegRegderef = 0x13,
    LoadRegRegderefOff = 0x14,
    StorPtrderefReg = 0x15,
    StorRegderefReg = 0x16,
    StorRegderefOffReg = 0x17,
    StorPtrderefImm = 0x18,
    StorRegderefImm = 0x19,
    StorRegderefOffImm = 0x1A,

    AddRegReg = 0x30,
    AddRegImm = 0x31,
    SubRegReg = 0x32,
    SubRegImm = 0x33,
    MulRegReg = 0x34,
    MulRegImm = 0x35,
    DivRegReg = 0x36,
    DivRegImm = 0x37,

    NotReg = 0x40,
    OrRegReg = 0x41,
    OrRegImm = 0x42,
    AndRegReg = 0x43,
    AndRegImm = 0x44,
    XorRegReg = 0x45,
    XorRegImm = 0x46,

    TestRegReg = 0x50,
    TestRegImm = 0x51,

    Call = 0xA0,
    Calldyn = 0xA1,
    Ret = 0xA2,
    Rti = 0xA3,
    Push = 0xA5,
    Pop = 0xA6,
    Sethead = 0xAA,
    Setbase = 0xAB,

    Branch = 0xB0,
    BranchEqual = 0xB1,
    BranchNotEqual = 0xB2,
    BranchLessThan = 0xB3,
    BranchGreaterThan = 0xB4,
    BranchLessThanEqual = 0xB5,
    BranchGreaterThanEqual = 0xB6,

    ReadinRegReg = 0xD0,
    ReadinRegImm = 0xD1,
    ReadinImmReg = 0xD2,
    ReadinImmImm = 0xD3,
    WriteoutRegReg = 0xD4,
    WriteoutRegImm = 0xD5,
    WriteoutImmReg = 0xD6,
    WriteoutImmImm = 0xD7,

    Enint = 0xFA,
    Disint = 0xFB,
    Halt = 0xFF,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
