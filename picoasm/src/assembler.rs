//! The two-pass assembler: a synchronous pipeline over the token stream that
//! fills a fixed-size output buffer, then a relocation pass patching forward
//! references. Grounded in the upstream assembler's `outbuf`/`outbuf_idx`/
//! `outbuf_offset` write head and its post-assembly unresolved-reference
//! walk, adapted from its pest-driven, 32-bit-word parser to a hand-rolled
//! scanner over this grammar's byte-opcode, variable-length instructions.

use std::collections::HashMap;

use byteorder::ByteOrder;
use log::debug;

use picovm::constants;
use util::Endian;

use crate::error::{AssembleError, Error};
use crate::lexer;
use crate::matrix::{self, OperandClass};
use crate::token::{Position, Spanned, Token};

#[derive(Clone, Debug, PartialEq)]
enum Operand {
    Register(u8),
    Immediate(u16),
    DirectDeref(u16),
    Label(String),
    LabelDeref(String),
}

impl Operand {
    fn class(&self) -> OperandClass {
        match self {
            Operand::Register(_) => OperandClass::Register,
            Operand::Immediate(_) | Operand::Label(_) => OperandClass::ValueOrLabel,
            Operand::DirectDeref(_) | Operand::LabelDeref(_) => OperandClass::DerefOrLabelDeref,
        }
    }

    fn label_name(&self) -> Option<&str> {
        match self {
            Operand::Label(name) | Operand::LabelDeref(name) => Some(name),
            _ => None,
        }
    }
}

struct TokenCursor {
    tokens: Vec<Spanned<Token>>,
    pos: usize,
}

impl TokenCursor {
    fn peek(&self) -> &Spanned<Token> {
        &self.tokens[self.pos]
    }

    fn next(&mut self) -> Spanned<Token> {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }
}

/// Owns the output buffer, write head, symbol table and unresolved-reference
/// list for the lifetime of a single `assemble` call.
struct Assembler {
    buf: Vec<u8>,
    idx: usize,
    offset: u16,
    max_len: usize,
    symbols: HashMap<String, u16>,
    relocations: Vec<(usize, String)>,
}

impl Assembler {
    fn new() -> Assembler {
        Assembler {
            buf: vec![0u8; constants::MEMORY_SIZE],
            idx: 0,
            offset: 0,
            max_len: 0,
            symbols: HashMap::new(),
            relocations: Vec::new(),
        }
    }

    fn push_byte(&mut self, byte: u8) -> Result<(), AssembleError> {
        if self.idx >= self.buf.len() {
            return Err(AssembleError::RomTooLarge {
                len: self.idx + 1,
                max: self.buf.len(),
            });
        }
        self.buf[self.idx] = byte;
        self.idx += 1;
        self.max_len = self.max_len.max(self.idx);
        Ok(())
    }

    fn push_word(&mut self, value: u16) -> Result<(), AssembleError> {
        if self.idx + 2 > self.buf.len() {
            return Err(AssembleError::RomTooLarge {
                len: self.idx + 2,
                max: self.buf.len(),
            });
        }
        let at = self.idx;
        self.idx += 2;
        self.max_len = self.max_len.max(self.idx);
        Endian::write_u16(&mut self.buf[at..at + 2], value);
        Ok(())
    }

    fn push_label_word(&mut self, name: &str) -> Result<(), AssembleError> {
        let patch_site = self.idx;
        self.push_word(0)?;
        self.relocations.push((patch_site, name.to_owned()));
        Ok(())
    }

    fn define_label(&mut self, name: String) -> Result<(), AssembleError> {
        let location = self.idx as u16 + self.offset;
        debug!("label {} = {:#06x}", name, location);
        if self.symbols.insert(name.clone(), location).is_some() {
            return Err(AssembleError::DuplicateSymbol { name });
        }
        Ok(())
    }

    /// Patches every recorded relocation against the completed symbol table
    /// and returns the full address-space image the assembler wrote into.
    /// `outbuf_max_len`, the high-water write-head mark, is left available
    /// to `assemble_image`'s caller for diagnostics.
    fn relocate(mut self) -> Result<(Vec<u8>, usize), AssembleError> {
        debug!("relocating {} forward reference(s)", self.relocations.len());
        for (patch_site, name) in &self.relocations {
            let address = self
                .symbols
                .get(name)
                .copied()
                .ok_or_else(|| AssembleError::UnresolvedSymbol { name: name.clone() })?;
            Endian::write_u16(&mut self.buf[*patch_site..*patch_site + 2], address);
        }

        Ok((self.buf, self.max_len))
    }
}

fn token_to_operand(spanned: &Spanned<Token>) -> Result<Operand, AssembleError> {
    match &spanned.value {
        Token::Register(r) => Ok(Operand::Register(*r)),
        Token::Immediate(v) => Ok(Operand::Immediate(*v)),
        Token::DirectDeref(v) => Ok(Operand::DirectDeref(*v)),
        Token::LabelRef(name) => Ok(Operand::Label(name.clone())),
        Token::Identifier(name) => Ok(Operand::Label(name.clone())),
        Token::LabelDeref(name) => Ok(Operand::LabelDeref(name.clone())),
        _ => Err(AssembleError::BadDirectiveArgument {
            pos: spanned.pos,
            name: "<operand>".to_owned(),
        }),
    }
}

fn collect_operands(cursor: &mut TokenCursor) -> Result<Vec<Operand>, AssembleError> {
    let mut operands = Vec::new();
    loop {
        match &cursor.peek().value {
            Token::Semicolon => {
                cursor.next();
                break;
            }
            Token::Comma => {
                cursor.next();
            }
            _ => {
                let spanned = cursor.next();
                operands.push(token_to_operand(&spanned)?);
            }
        }
    }
    Ok(operands)
}

fn emit_matrix_instruction(
    assembler: &mut Assembler,
    mnemonic_pos: Position,
    mnemonic_name: &str,
    variants: &[matrix::Variant],
    operands: &[Operand],
) -> Result<(), AssembleError> {
    let classes: Vec<OperandClass> = operands.iter().map(Operand::class).collect();

    let matched = variants
        .iter()
        .find(|v| v.operands.len() == classes.len() && v.operands.iter().eq(classes.iter()))
        .ok_or_else(|| AssembleError::NoMatchingVariant {
            pos: mnemonic_pos,
            mnemonic: mnemonic_name.to_owned(),
        })?;

    assembler.push_byte(matched.opcode as u8)?;

    let mut i = 0;
    while i < operands.len() {
        if i + 1 < operands.len() {
            if let (Operand::Register(hi), Operand::Register(lo)) = (&operands[i], &operands[i + 1]) {
                assembler.push_byte((hi << 4) | lo)?;
                i += 2;
                continue;
            }
        }

        match &operands[i] {
            Operand::Register(r) => assembler.push_byte(*r)?,
            Operand::Immediate(v) => assembler.push_word(*v)?,
            Operand::DirectDeref(v) => assembler.push_word(*v)?,
            Operand::Label(_) | Operand::LabelDeref(_) => {
                let name = operands[i].label_name().unwrap().to_owned();
                assembler.push_label_word(&name)?;
            }
        }
        i += 1;
    }

    Ok(())
}

fn directive_immediate(cursor: &mut TokenCursor, name: &str) -> Result<u16, AssembleError> {
    let pos = cursor.peek().pos;
    match cursor.next().value {
        Token::Immediate(v) => Ok(v),
        _ => Err(AssembleError::BadDirectiveArgument {
            pos,
            name: name.to_owned(),
        }),
    }
}

fn directive_string(cursor: &mut TokenCursor, name: &str) -> Result<Vec<u8>, AssembleError> {
    let pos = cursor.peek().pos;
    match cursor.next().value {
        Token::String(bytes) => Ok(bytes),
        _ => Err(AssembleError::BadDirectiveArgument {
            pos,
            name: name.to_owned(),
        }),
    }
}

fn handle_directive(
    assembler: &mut Assembler,
    cursor: &mut TokenCursor,
    pos: Position,
    name: &str,
) -> Result<(), AssembleError> {
    match name {
        "set" => {
            let value = directive_immediate(cursor, name)?;
            assembler.idx = value as usize;
        }
        "offset" => {
            let value = directive_immediate(cursor, name)?;
            assembler.offset = value;
        }
        "word" => {
            let arg_pos = cursor.peek().pos;
            match &cursor.peek().value {
                Token::Immediate(_) => {
                    let value = directive_immediate(cursor, name)?;
                    assembler.push_word(value)?;
                }
                Token::LabelRef(_) | Token::Identifier(_) => {
                    let label = match cursor.next().value {
                        Token::LabelRef(n) | Token::Identifier(n) => n,
                        _ => unreachable!(),
                    };
                    assembler.push_label_word(&label)?;
                }
                _ => {
                    return Err(AssembleError::BadDirectiveArgument {
                        pos: arg_pos,
                        name: name.to_owned(),
                    })
                }
            }
        }
        "byte" => {
            let value = directive_immediate(cursor, name)?;
            if value > 0xFF {
                return Err(AssembleError::BadDirectiveArgument {
                    pos,
                    name: name.to_owned(),
                });
            }
            assembler.push_byte(value as u8)?;
        }
        "ascii" => {
            let bytes = directive_string(cursor, name)?;
            for b in bytes {
                assembler.push_byte(b)?;
            }
        }
        "asciz" => {
            let bytes = directive_string(cursor, name)?;
            for b in bytes {
                assembler.push_byte(b)?;
            }
            assembler.push_byte(0)?;
        }
        other => {
            return Err(AssembleError::UnknownDirective {
                pos,
                name: other.to_owned(),
            })
        }
    }
    Ok(())
}

/// Assembles `source` against the full 64KB address space and returns the
/// complete image plus the write-head high-water mark (`outbuf_max_len`).
/// `.set`/`.offset` place the write head and label locations anywhere in
/// that space, matching the upstream assembler's unchecked `outbuf_idx`;
/// the buffer is sized to the whole address space rather than just the ROM
/// region so that a `.set` below `ROM_BASE`, used to patch the reset vector
/// or a low-memory scratch label, never overruns it.
pub(crate) fn assemble_image(source: &str) -> Result<(Vec<u8>, usize), Error> {
    let tokens = lexer::lex(source)?;
    debug!("lexed {} token(s)", tokens.len());
    let mut cursor = TokenCursor { tokens, pos: 0 };
    let mut assembler = Assembler::new();

    loop {
        let spanned = cursor.peek().clone();
        match spanned.value {
            Token::Eof => break,
            Token::LabelDef(name) => {
                cursor.next();
                assembler.define_label(name)?;
            }
            Token::Directive(name) => {
                cursor.next();
                handle_directive(&mut assembler, &mut cursor, spanned.pos, &name)?;
            }
            Token::Mnemonic(mnemonic) => {
                cursor.next();
                let operands = collect_operands(&mut cursor)?;
                let variants = matrix::lookup(mnemonic).ok_or_else(|| AssembleError::NoMatchingVariant {
                    pos: spanned.pos,
                    mnemonic: format!("{:?}", mnemonic),
                })?;
                emit_matrix_instruction(
                    &mut assembler,
                    spanned.pos,
                    &format!("{:?}", mnemonic),
                    variants,
                    &operands,
                )?;
            }
            _ => {
                return Err(AssembleError::NoMatchingVariant {
                    pos: spanned.pos,
                    mnemonic: "<token>".to_owned(),
                }
                .into())
            }
        }
    }

    Ok(assembler.relocate()?)
}

/// Assembles `source` and returns just the `ROM_BASE..ROM_BASE+ROM_LEN`
/// slice of the assembled image, ready to hand to `Processor::load_rom`.
pub fn assemble(source: &str) -> Result<Vec<u8>, Error> {
    let (image, _max_len) = assemble_image(source)?;
    let start = constants::ROM_BASE as usize;
    Ok(image[start..start + constants::ROM_LEN].to_vec())
}
