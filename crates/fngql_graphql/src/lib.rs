//! GraphQL schema synthesis for fngql.
//!
//! Turns a directory of TypeScript operation functions into:
//! - a GraphQL schema (`render`)
//! - a resolver entrypoint wiring each function to its root field (`resolvers`)
//! - a typed client SDK (`sdk`)
//! - declaration fragments for extended types (`fragments`)
//!
//! # Example
//!
//! ```ignore
//! use fngql_checker::FileSystemHost;
//! use fngql_graphql::{Generator, GeneratorOptions};
//!
//! let host = FileSystemHost;
//! let options = GeneratorOptions::load(&host, "./app".as_ref())?;
//! let artifacts = Generator::new(&host, options).generate()?;
//! println!("{}", artifacts.schema);
//! ```

pub mod error;
pub mod fragments;
pub mod gather;
pub mod generator;
pub mod naming;
pub mod options;
pub mod render;
pub mod resolvers;
pub mod sdk;

pub use error::{GenerateError, StructureError};
pub use fragments::render_type_fragments;
pub use gather::{discover_extensions, discover_operations, gather_meta};
pub use generator::{GeneratedArtifacts, Generator};
pub use naming::{operation_name, protocol_friendly};
pub use options::{GeneratorOptions, NumberScalar, CONFIG_FILE};
pub use render::{render_schema, type_ref};
pub use resolvers::render_resolvers;
pub use sdk::render_sdk;
