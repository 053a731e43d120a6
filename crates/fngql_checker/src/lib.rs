//! Program construction and type checking for fngql.
//!
//! This crate provides:
//! - `host`: Source file access (file system or in memory)
//! - `config`: `tsconfig.json` path aliases
//! - `program`: The Program Builder
//! - `types`: Checker type representation
//! - `checker`: The type oracle

pub mod checker;
pub mod config;
mod display;
pub mod host;
pub mod program;
pub mod types;

pub use checker::{Primitives, TypeChecker};
pub use config::{ConfigError, PathAlias, ProjectConfig};
pub use host::{display_relative, normalize_path, FileSystemHost, MemoryHost, SourceHost};
pub use program::{
    probe_path, FileDiagnostic, FileId, ModuleTarget, Program, ProgramBuilder, ProgramError,
    SourceFile, PROBE_SUFFIX,
};
pub use types::{
    quote_string, Builtin, DeclName, EnumMemberType, LiteralType, ObjectType, ParamType, Property,
    Signature, TupleElementType, Type, TypeId, TypeKind,
};
