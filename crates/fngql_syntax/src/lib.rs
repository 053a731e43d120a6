//! Syntax layer for fngql.
//!
//! This crate provides:
//! - `token`: Token kinds and token structures
//! - `lexer`: Tokenization of the TypeScript subset
//! - `ast`: Declaration-level syntax tree
//! - `parser`: Recursive descent parser
//! - `type_string`: Parser for rendered structural type strings
//! - `exports`: Fast export-name scan

pub mod ast;
pub mod exports;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod type_string;

pub use ast::*;
pub use exports::{exports_name, scan_exports, ExportKind, ExportedName};
pub use lexer::{doc_text, tokenize, Lexer};
pub use parser::{parse, parse_type, ParseResult};
pub use token::{Token, TokenKind};
pub use type_string::{parse_type_string, TypeStringEntry, TypeStringError, TypeStringMap};
