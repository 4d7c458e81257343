//! The declarative mnemonic → opcode table. Grounded directly in the
//! upstream assembler's `instruction_matrix`: each mnemonic owns an ordered
//! list of variants, and a variant is matched by arity then by operand kind,
//! first match wins.

use picovm::Opcode;

use crate::token::Mnemonic;

/// The class of token a matrix slot accepts. Several token shapes carry the
/// same information to the encoder (an immediate or a label both resolve to
/// a two-byte value) and are folded into one class here.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum OperandClass {
    Register,
    /// `IMMVAL` or `LBLVAL`.
    ValueOrLabel,
    /// `DEREFVAL` or `LBLDEREF`.
    DerefOrLabelDeref,
}

pub struct Variant {
    pub opcode: Opcode,
    pub operands: &'static [OperandClass],
}

pub struct Row {
    pub mnemonic: Mnemonic,
    pub variants: &'static [Variant],
}

macro_rules! variant {
    ($op:expr) => {
        Variant {
            opcode: $op,
            operands: &[],
        }
    };
    ($op:expr, $($class:expr),+) => {
        Variant {
            opcode: $op,
            operands: &[$($class),+],
        }
    };
}

use OperandClass::{DerefOrLabelDeref as Deref, Register as Reg, ValueOrLabel as Val};

static NOP_VARIANTS: &[Variant] = &[variant!(Opcode::Nop)];
static RET_VARIANTS: &[Variant] = &[variant!(Opcode::Ret)];
static RTI_VARIANTS: &[Variant] = &[variant!(Opcode::Rti)];
static ENINT_VARIANTS: &[Variant] = &[variant!(Opcode::Enint)];
static DISINT_VARIANTS: &[Variant] = &[variant!(Opcode::Disint)];
static HALT_VARIANTS: &[Variant] = &[variant!(Opcode::Halt)];

static SETHEAD_VARIANTS: &[Variant] = &[variant!(Opcode::Sethead, Val)];
static SETBASE_VARIANTS: &[Variant] = &[variant!(Opcode::Setbase, Val)];
static CALL_VARIANTS: &[Variant] = &[variant!(Opcode::Call, Val)];

static LOAD_VARIANTS: &[Variant] = &[
    variant!(Opcode::LoadRegReg, Reg, Reg),
    variant!(Opcode::LoadRegImm, Reg, Val),
    variant!(Opcode::LoadRegDeref, Reg, Deref),
];

static STOR_VARIANTS: &[Variant] = &[
    variant!(Opcode::StorPtrderefImm, Deref, Val),
    variant!(Opcode::StorPtrderefReg, Deref, Reg),
];

static ADD_VARIANTS: &[Variant] = &[
    variant!(Opcode::AddRegReg, Reg, Reg),
    variant!(Opcode::AddRegImm, Reg, Val),
];
static SUB_VARIANTS: &[Variant] = &[
    variant!(Opcode::SubRegReg, Reg, Reg),
    variant!(Opcode::SubRegImm, Reg, Val),
];
static MUL_VARIANTS: &[Variant] = &[
    variant!(Opcode::MulRegReg, Reg, Reg),
    variant!(Opcode::MulRegImm, Reg, Val),
];
static DIV_VARIANTS: &[Variant] = &[
    variant!(Opcode::DivRegReg, Reg, Reg),
    variant!(Opcode::DivRegImm, Reg, Val),
];
static TEST_VARIANTS: &[Variant] = &[
    variant!(Opcode::TestRegReg, Reg, Reg),
    variant!(Opcode::TestRegImm, Reg, Val),
];

static JUMP_VARIANTS: &[Variant] = &[variant!(Opcode::Branch, Val)];
static BEQL_VARIANTS: &[Variant] = &[variant!(Opcode::BranchEqual, Val)];
static BNEQ_VARIANTS: &[Variant] = &[variant!(Opcode::BranchNotEqual, Val)];
static BLES_VARIANTS: &[Variant] = &[variant!(Opcode::BranchLessThan, Val)];
static BGRT_VARIANTS: &[Variant] = &[variant!(Opcode::BranchGreaterThan, Val)];
static BLTE_VARIANTS: &[Variant] = &[variant!(Opcode::BranchLessThanEqual, Val)];
static BGTE_VARIANTS: &[Variant] = &[variant!(Opcode::BranchGreaterThanEqual, Val)];

static WRITE_VARIANTS: &[Variant] = &[
    variant!(Opcode::WriteoutImmImm, Val, Deref),
    variant!(Opcode::WriteoutRegImm, Reg, Deref),
    variant!(Opcode::WriteoutImmReg, Val, Reg),
    variant!(Opcode::WriteoutRegReg, Reg, Reg),
];
static READ_VARIANTS: &[Variant] = &[
    variant!(Opcode::ReadinImmImm, Val, Deref),
    variant!(Opcode::ReadinRegImm, Reg, Deref),
    variant!(Opcode::ReadinImmReg, Val, Reg),
    variant!(Opcode::ReadinRegReg, Reg, Reg),
];

/// `push`/`pop` have no matrix row; their opcodes exist in the catalogue but
/// are unreachable through mnemonic syntax, matching the upstream assembler
/// exactly. `swap`/`calldyn`/`not`/`or`/`and`/`xor` aren't even tokenized as
/// mnemonics (see `Mnemonic`) and so never reach this function at all.
pub fn lookup(mnemonic: Mnemonic) -> Option<&'static [Variant]> {
    Some(match mnemonic {
        Mnemonic::NOP => NOP_VARIANTS,
        Mnemonic::RET => RET_VARIANTS,
        Mnemonic::RTI => RTI_VARIANTS,
        Mnemonic::ENINT => ENINT_VARIANTS,
        Mnemonic::DISINT => DISINT_VARIANTS,
        Mnemonic::HALT => HALT_VARIANTS,
        Mnemonic::SETHEAD => SETHEAD_VARIANTS,
        Mnemonic::SETBASE => SETBASE_VARIANTS,
        Mnemonic::CALL => CALL_VARIANTS,
        Mnemonic::LOAD => LOAD_VARIANTS,
        Mnemonic::STOR => STOR_VARIANTS,
        Mnemonic::ADD => ADD_VARIANTS,
        Mnemonic::SUB => SUB_VARIANTS,
        Mnemonic::MUL => MUL_VARIANTS,
        Mnemonic::DIV => DIV_VARIANTS,
        Mnemonic::TEST => TEST_VARIANTS,
        Mnemonic::JUMP => JUMP_VARIANTS,
        Mnemonic::BEQL => BEQL_VARIANTS,
        Mnemonic::BNEQ => BNEQ_VARIANTS,
        Mnemonic::BLES => BLES_VARIANTS,
        Mnemonic::BGRT => BGRT_VARIANTS,
        Mnemonic::BLTE => BLTE_VARIANTS,
        Mnemonic::BGTE => BGTE_VARIANTS,
        Mnemonic::WRITE => WRITE_VARIANTS,
        Mnemonic::READ => READ_VARIANTS,
        Mnemonic::PUSH | Mnemonic::POP => return None,
    })
}
