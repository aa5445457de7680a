//! Turns one source line into a flat token stream.
//!
//! Comments starting with `;` are stripped before tokenizing. Identifiers
//! are uppercased at this stage so the symbol table built downstream is
//! case-insensitive by construction.

use crate::error::LexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Identifier,
    Number,
    Register,
    Comma,
    Colon,
    Hash,
    LBracket,
    RBracket,
    String,
    Char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Token {
        Token {
            kind,
            text: text.into(),
        }
    }
}

/// The escape set accepted after a `\` inside a string or character literal:
/// `\n`, `\t`, `\r`, `\0`, `\\`, `\'`, `\"`.
fn is_known_escape(ch: char) -> bool {
    matches!(ch, 'n' | 't' | 'r' | '0' | '\\' | '\'' | '"')
}

/// Tokenizes a single already-trimmed source line. `line_number` is carried
/// only for error reporting.
pub fn tokenize_line(line: &str, line_number: u32) -> Result<Vec<Token>, LexError> {
    let work = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    let chars: Vec<char> = work.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => {
                i += 1;
            }
            ',' => {
                tokens.push(Token::new(TokenKind::Comma, ","));
                i += 1;
            }
            ':' => {
                tokens.push(Token::new(TokenKind::Colon, ":"));
                i += 1;
            }
            '#' => {
                tokens.push(Token::new(TokenKind::Hash, "#"));
                i += 1;
            }
            '[' => {
                tokens.push(Token::new(TokenKind::LBracket, "["));
                i += 1;
            }
            ']' => {
                tokens.push(Token::new(TokenKind::RBracket, "]"));
                i += 1;
            }
            '"' => {
                let start = i;
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        if !is_known_escape(chars[i + 1]) {
                            return Err(LexError::InvalidEscape {
                                line: line_number,
                                ch: chars[i + 1],
                            });
                        }
                        i += 2;
                        continue;
                    }
                    if chars[i] == '"' {
                        closed = true;
                        break;
                    }
                    i += 1;
                }
                if !closed {
                    return Err(LexError::UnterminatedString { line: line_number });
                }
                i += 1; // include closing quote
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::new(TokenKind::String, text));
            }
            '\'' => {
                let start = i;
                i += 1;
                if i < chars.len() && chars[i] == '\\' {
                    i += 1;
                    if i < chars.len() {
                        if !is_known_escape(chars[i]) {
                            return Err(LexError::InvalidEscape {
                                line: line_number,
                                ch: chars[i],
                            });
                        }
                        i += 1;
                    }
                } else if i < chars.len() {
                    i += 1;
                }
                if i >= chars.len() || chars[i] != '\'' {
                    return Err(LexError::UnterminatedChar { line: line_number });
                }
                i += 1; // include closing quote
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::new(TokenKind::Char, text));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric()) {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::new(TokenKind::Number, text));
            }
            '-' if i + 1 < chars.len() && chars[i + 1].is_ascii_digit() => {
                let start = i;
                i += 2;
                while i < chars.len() && chars[i].is_ascii_alphanumeric() {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::new(TokenKind::Number, text));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '.' => {
                let start = i;
                i += 1;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                let upper = ident.to_ascii_uppercase();
                if upper == "R0" || upper == "R1" || upper == "R2" || upper == "R3" {
                    tokens.push(Token::new(TokenKind::Register, upper));
                } else {
                    tokens.push(Token::new(TokenKind::Identifier, upper));
                }
            }
            other => {
                return Err(LexError::StrayCharacter {
                    line: line_number,
                    ch: other,
                });
            }
        }
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_mnemonic_register_comma_and_immediate() {
        let tokens = tokenize_line("ADD R0, #1 ; comment", 1).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Register,
                TokenKind::Comma,
                TokenKind::Hash,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn label_colon_is_its_own_token() {
        let tokens = tokenize_line("start: HALT", 1).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, "START");
        assert_eq!(tokens[1].kind, TokenKind::Colon);
    }

    #[test]
    fn directive_leading_dot_is_identifier() {
        let tokens = tokenize_line(".ORG 0x8000", 1).unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].text, ".ORG");
    }

    #[test]
    fn string_and_char_literals_are_distinct_kinds() {
        let tokens = tokenize_line(r#".STRING "hi\n""#, 1).unwrap();
        assert_eq!(tokens[1].kind, TokenKind::String);
        assert_eq!(tokens[1].text, r#""hi\n""#);

        let tokens = tokenize_line("MOV R0, '\\n'", 1).unwrap();
        assert_eq!(tokens[3].kind, TokenKind::Char);
        assert_eq!(tokens[3].text, "'\\n'");
    }

    #[test]
    fn unterminated_string_is_a_lex_error() {
        let err = tokenize_line(".STRING \"oops", 5).unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { line: 5 });
    }

    #[test]
    fn invalid_escape_in_string_literal_is_a_lex_error() {
        let err = tokenize_line(r#".STRING "oh\qno""#, 6).unwrap_err();
        assert_eq!(err, LexError::InvalidEscape { line: 6, ch: 'q' });
    }

    #[test]
    fn invalid_escape_in_char_literal_is_a_lex_error() {
        let err = tokenize_line("MOV R0, '\\q'", 9).unwrap_err();
        assert_eq!(err, LexError::InvalidEscape { line: 9, ch: 'q' });
    }

    #[test]
    fn stray_character_is_rejected() {
        let err = tokenize_line("MOV R0, $1", 2).unwrap_err();
        assert_eq!(
            err,
            LexError::StrayCharacter {
                line: 2,
                ch: '$'
            }
        );
    }

    #[test]
    fn indirection_brackets_tokenize() {
        let tokens = tokenize_line("LOAD R0, [R1]", 1).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Register,
                TokenKind::Comma,
                TokenKind::LBracket,
                TokenKind::Register,
                TokenKind::RBracket,
            ]
        );
    }
}
