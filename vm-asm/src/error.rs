//! The assembler's three-tier error taxonomy: lexing, parsing, semantics.
//! Every variant carries the source line number it was raised on.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("line {line}: unterminated string literal")]
    UnterminatedString { line: u32 },

    #[error("line {line}: unterminated character literal")]
    UnterminatedChar { line: u32 },

    #[error("line {line}: stray character '{ch}'")]
    StrayCharacter { line: u32, ch: char },

    #[error("line {line}: invalid escape sequence '\\{ch}'")]
    InvalidEscape { line: u32, ch: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unexpected token {found}")]
    UnexpectedToken { line: u32, found: String },

    #[error("line {line}: expected a mnemonic or directive")]
    ExpectedMnemonic { line: u32 },

    #[error("line {line}: missing operand")]
    MissingOperand { line: u32 },

    #[error("line {line}: malformed indirect operand")]
    MalformedIndirection { line: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SemanticError {
    #[error("line {line}: unknown mnemonic '{text}'")]
    UnknownMnemonic { line: u32, text: String },

    #[error("line {line}: unknown directive '{text}'")]
    UnknownDirective { line: u32, text: String },

    #[error("line {line}: '{mnemonic}' expects {expected} operand(s), found {found}")]
    OperandCountMismatch {
        line: u32,
        mnemonic: String,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: '{mnemonic}' received an operand of the wrong kind")]
    OperandKindMismatch { line: u32, mnemonic: String },

    #[error("line {line}: immediate value '{text}' is out of 16-bit range")]
    ImmediateOutOfRange { line: u32, text: String },

    #[error("line {line}: duplicate label '{label}'")]
    DuplicateLabel { line: u32, label: String },

    #[error("line {line}: undefined label '{label}'")]
    UndefinedLabel { line: u32, label: String },

    #[error("line {line}: negative literal '{text}' is not supported")]
    NegativeLiteral { line: u32, text: String },

    #[error("line {line}: invalid numeric literal '{text}'")]
    InvalidNumberLiteral { line: u32, text: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AsmError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Semantic(#[from] SemanticError),
}

impl AsmError {
    pub fn line(&self) -> u32 {
        match self {
            AsmError::Lex(LexError::UnterminatedString { line })
            | AsmError::Lex(LexError::UnterminatedChar { line })
            | AsmError::Lex(LexError::StrayCharacter { line, .. })
            | AsmError::Lex(LexError::InvalidEscape { line, .. }) => *line,
            AsmError::Parse(ParseError::UnexpectedToken { line, .. })
            | AsmError::Parse(ParseError::ExpectedMnemonic { line })
            | AsmError::Parse(ParseError::MissingOperand { line })
            | AsmError::Parse(ParseError::MalformedIndirection { line }) => *line,
            AsmError::Semantic(err) => match err {
                SemanticError::UnknownMnemonic { line, .. }
                | SemanticError::UnknownDirective { line, .. }
                | SemanticError::OperandCountMismatch { line, .. }
                | SemanticError::OperandKindMismatch { line, .. }
                | SemanticError::ImmediateOutOfRange { line, .. }
                | SemanticError::DuplicateLabel { line, .. }
                | SemanticError::UndefinedLabel { line, .. }
                | SemanticError::NegativeLiteral { line, .. }
                | SemanticError::InvalidNumberLiteral { line, .. } => *line,
            },
        }
    }
}
