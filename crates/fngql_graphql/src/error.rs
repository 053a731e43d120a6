//! Errors of a generation run.

use fngql_checker::{ConfigError, ProgramError};
use thiserror::Error;

/// A fatal error of [`Generator::generate`](crate::Generator::generate).
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    #[error(transparent)]
    Structure(#[from] StructureError),

    #[error("generated schema is invalid:\n{}", problems.join("\n"))]
    InvalidSchema {
        /// The best-effort schema text.
        schema: String,
        problems: Vec<String>,
    },
}

/// The collected types are inconsistent with what a type-extension file or
/// the renderer expects.
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("type `{name}` extended by `{file}` is not declared by any operation")]
    MissingExtendedType { name: String, file: String },

    #[error("type `{name}` extended by `{file}` is not an object type")]
    NotAnObjectType { name: String, file: String },

    #[error("two different definitions were generated for `{name}`")]
    ConflictingDefinition { name: String },

    #[error("operation `{kind}.{name}` is declared by both `{first}` and `{second}`")]
    DuplicateOperation {
        kind: &'static str,
        name: String,
        first: String,
        second: String,
    },
}
