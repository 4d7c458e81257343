use util_derive::EnumFromStr;

/// One mnemonic family. Matched case-insensitively against a bare identifier
/// in the lexer.
#[derive(Clone, Copy, Eq, PartialEq, Debug, EnumFromStr)]
#[allow(non_camel_case_types)]
pub enum Mnemonic {
    NOP,
    LOAD,
    STOR,
    ADD,
    SUB,
    MUL,
    DIV,
    TEST,
    CALL,
    RET,
    RTI,
    PUSH,
    POP,
    SETHEAD,
    SETBASE,
    JUMP,
    BEQL,
    BNEQ,
    BLES,
    BGRT,
    BLTE,
    BGTE,
    READ,
    WRITE,
    ENINT,
    DISINT,
    HALT,
}

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    Mnemonic(Mnemonic),
    Directive(String),
    /// A bare identifier that is neither a mnemonic nor followed by `:` —
    /// equivalent to `&name`.
    Identifier(String),
    LabelDef(String),
    String(Vec<u8>),
    Register(u8),
    Immediate(u16),
    DirectDeref(u16),
    LabelRef(String),
    LabelDeref(String),
    Comma,
    Semicolon,
    Eof,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Spanned<T> {
    pub value: T,
    pub pos: Position,
}
