//! Builds one [`Line`] from the token stream of a single source line.

use crate::error::ParseError;
use crate::lexer::{Token, TokenKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperandKind {
    Register,
    Immediate,
    Number,
    Label,
    IndirectReg,
    Direct,
    StringLiteral,
}

/// One operand of a parsed line. `text` is the raw lexeme — register name,
/// number/char text, label name, or (for `StringLiteral`) the quoted string
/// text — left undecoded until the pass that needs its value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operand {
    pub kind: OperandKind,
    pub text: String,
}

/// A fully parsed source line: optional label, optional mnemonic/directive,
/// and its operand list. A line with neither a label nor an op is blank
/// (comment-only or whitespace-only) and emits nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub label: Option<String>,
    pub op: Option<String>,
    pub is_directive: bool,
    pub operands: Vec<Operand>,
    pub line_number: u32,
}

fn unexpected(line_number: u32, token: &Token) -> ParseError {
    ParseError::UnexpectedToken {
        line: line_number,
        found: format!("{:?}({})", token.kind, token.text),
    }
}

/// Parses the tokens of one source line into a [`Line`].
pub fn parse_line(tokens: &[Token], line_number: u32) -> Result<Line, ParseError> {
    let mut line = Line {
        line_number,
        ..Line::default()
    };
    let mut idx = 0usize;

    if tokens.is_empty() {
        return Ok(line);
    }

    if idx + 1 < tokens.len()
        && tokens[idx].kind == TokenKind::Identifier
        && tokens[idx + 1].kind == TokenKind::Colon
    {
        line.label = Some(tokens[idx].text.clone());
        idx += 2;
    }
    if idx >= tokens.len() {
        return Ok(line);
    }

    if tokens[idx].kind != TokenKind::Identifier {
        return Err(ParseError::ExpectedMnemonic { line: line_number });
    }
    let op = tokens[idx].text.clone();
    line.is_directive = op.starts_with('.');
    line.op = Some(op);
    idx += 1;

    while idx < tokens.len() {
        if tokens[idx].kind == TokenKind::Comma {
            idx += 1;
            continue;
        }
        let operand = parse_operand(tokens, &mut idx, line_number)?;
        line.operands.push(operand);
    }

    Ok(line)
}

fn parse_operand(tokens: &[Token], idx: &mut usize, line_number: u32) -> Result<Operand, ParseError> {
    let token = &tokens[*idx];
    match token.kind {
        TokenKind::Register => {
            *idx += 1;
            Ok(Operand {
                kind: OperandKind::Register,
                text: token.text.clone(),
            })
        }
        TokenKind::Hash => {
            *idx += 1;
            let number = expect_number_like(tokens, idx, line_number)?;
            Ok(Operand {
                kind: OperandKind::Immediate,
                text: number,
            })
        }
        TokenKind::Number | TokenKind::Char => {
            *idx += 1;
            Ok(Operand {
                kind: OperandKind::Number,
                text: token.text.clone(),
            })
        }
        TokenKind::String => {
            *idx += 1;
            Ok(Operand {
                kind: OperandKind::StringLiteral,
                text: token.text.clone(),
            })
        }
        TokenKind::Identifier => {
            *idx += 1;
            Ok(Operand {
                kind: OperandKind::Label,
                text: token.text.clone(),
            })
        }
        TokenKind::LBracket => {
            *idx += 1;
            if *idx >= tokens.len() {
                return Err(ParseError::MalformedIndirection { line: line_number });
            }
            let operand = match tokens[*idx].kind {
                TokenKind::Register => {
                    let text = tokens[*idx].text.clone();
                    *idx += 1;
                    Operand {
                        kind: OperandKind::IndirectReg,
                        text,
                    }
                }
                TokenKind::Hash => {
                    *idx += 1;
                    let number = expect_number_like(tokens, idx, line_number)?;
                    Operand {
                        kind: OperandKind::Direct,
                        text: number,
                    }
                }
                TokenKind::Identifier => {
                    let text = tokens[*idx].text.clone();
                    *idx += 1;
                    Operand {
                        kind: OperandKind::Direct,
                        text,
                    }
                }
                _ => return Err(ParseError::MalformedIndirection { line: line_number }),
            };
            if *idx >= tokens.len() || tokens[*idx].kind != TokenKind::RBracket {
                return Err(ParseError::MalformedIndirection { line: line_number });
            }
            *idx += 1;
            Ok(operand)
        }
        _ => Err(unexpected(line_number, token)),
    }
}

fn expect_number_like(tokens: &[Token], idx: &mut usize, line_number: u32) -> Result<String, ParseError> {
    if *idx >= tokens.len()
        || !matches!(tokens[*idx].kind, TokenKind::Number | TokenKind::Char)
    {
        return Err(ParseError::MissingOperand { line: line_number });
    }
    let text = tokens[*idx].text.clone();
    *idx += 1;
    Ok(text)
}
