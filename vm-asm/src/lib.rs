//! Two-pass symbolic assembler for the 16-bit VM instruction set.
//!
//! Source text flows through [`lexer::tokenize_line`] and [`parser::parse_line`]
//! into a stream of [`parser::Line`]s, then through [`assemble::assemble`]'s
//! two passes into a little-endian byte image plus a [`source_map::SourceMap`].
//! This crate has no knowledge of files or CLI surfaces (see `vm-cli`); it
//! only turns source text into bytes `vm-core::Memory::load_image` accepts.

pub mod assemble;
pub mod error;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod source_map;
pub mod symbols;

pub use assemble::{assemble, AssembleOutput};
pub use error::{AsmError, LexError, ParseError, SemanticError};
pub use parser::{Line, Operand, OperandKind};
pub use source_map::{SourceMap, SourceMapItem};
pub use symbols::SymbolTable;
