use std::str::FromStr;

use crate::error::LexError;
use crate::token::{Mnemonic, Position, Spanned, Token};

/// Scans source text into a flat token vector up front. The grammar needs
/// only a single token of lookahead, so a `Vec` plus cursor behaves exactly
/// like the on-demand scanner the grammar describes.
pub struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
    column: u32,
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Lexer<'a> {
        Lexer {
            chars: src.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn pos(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('|') => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn take_while<F: Fn(char) -> bool>(&mut self, pred: F) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn lex_number(&mut self, pos: Position) -> Result<u16, LexError> {
        let text = self.take_while(|c| c.is_ascii_hexdigit());
        let (digits, radix) = match self.peek_char() {
            Some('h') | Some('H') => {
                self.bump();
                (text.as_str(), 16)
            }
            _ => (text.as_str(), 10),
        };

        if digits.is_empty() {
            return Err(LexError::InvalidNumber {
                pos,
                text: digits.to_owned(),
            });
        }

        let value = u32::from_str_radix(digits, radix).map_err(|_| LexError::InvalidNumber {
            pos,
            text: digits.to_owned(),
        })?;

        if value > 0xFFFF {
            return Err(LexError::NumberOutOfRange {
                pos,
                text: digits.to_owned(),
            });
        }

        Ok(value as u16)
    }

    fn lex_identifier(&mut self, pos: Position) -> Result<Spanned<Token>, LexError> {
        let name = self.take_while(is_ident_continue);

        // A colon immediately (modulo whitespace) after the identifier marks
        // a label definition; this takes priority over mnemonic matching.
        let mut lookahead = self.chars.clone();
        loop {
            match lookahead.peek() {
                Some(c) if c.is_whitespace() => {
                    lookahead.next();
                }
                _ => break,
            }
        }
        if lookahead.peek() == Some(&':') {
            self.skip_trivia();
            self.bump(); // ':'
            return Ok(Spanned {
                value: Token::LabelDef(name),
                pos,
            });
        }

        if let Ok(mnemonic) = Mnemonic::from_str(&name.to_uppercase()) {
            return Ok(Spanned {
                value: Token::Mnemonic(mnemonic),
                pos,
            });
        }

        Ok(Spanned {
            value: Token::Identifier(name),
            pos,
        })
    }

    fn lex_string(&mut self, pos: Position) -> Result<Spanned<Token>, LexError> {
        self.bump(); // opening quote
        let mut bytes = Vec::new();
        loop {
            match self.bump() {
                Some('"') => break,
                Some(c) => {
                    let mut buf = [0u8; 4];
                    bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
                None => return Err(LexError::UnterminatedString { pos }),
            }
        }
        Ok(Spanned {
            value: Token::String(bytes),
            pos,
        })
    }

    fn next_token(&mut self) -> Result<Option<Spanned<Token>>, LexError> {
        self.skip_trivia();
        let pos = self.pos();
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(None),
        };

        let token = match c {
            ';' => {
                self.bump();
                Token::Semicolon
            }
            ',' => {
                self.bump();
                Token::Comma
            }
            '%' => {
                self.bump();
                let start = self.pos();
                let value = self.lex_number(start)?;
                if value > 15 {
                    return Err(LexError::RegisterOutOfRange {
                        pos: start,
                        index: value as u32,
                    });
                }
                Token::Register(value as u8)
            }
            '#' => {
                self.bump();
                Token::Immediate(self.lex_number(pos)?)
            }
            '*' => {
                self.bump();
                Token::DirectDeref(self.lex_number(pos)?)
            }
            '&' => {
                self.bump();
                let name = self.take_while(is_ident_continue);
                Token::LabelRef(name)
            }
            '@' => {
                self.bump();
                let name = self.take_while(is_ident_continue);
                Token::LabelDeref(name)
            }
            '.' => {
                self.bump();
                let name = self.take_while(is_ident_continue);
                Token::Directive(name)
            }
            '"' => return Ok(Some(self.lex_string(pos)?)),
            c if is_ident_start(c) => return Ok(Some(self.lex_identifier(pos)?)),
            other => return Err(LexError::UnexpectedChar { pos, found: other }),
        };

        Ok(Some(Spanned { value: token, pos }))
    }
}

pub fn lex(src: &str) -> Result<Vec<Spanned<Token>>, LexError> {
    let mut lexer = Lexer::new(src);
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    tokens.push(Spanned {
        value: Token::Eof,
        pos: lexer.pos(),
    });
    Ok(tokens)
}
