//! Collected type model for fngql.
//!
//! This crate provides:
//! - `meta`: `TypeMeta`, `OperationMeta` and `SchemaMeta`
//! - `collector`: the per-run registry that deduplicates types

pub mod collector;
pub mod meta;

pub use collector::Collector;
pub use meta::{
    ArgumentMeta, CustomScalar, EnumValueMeta, ExtendedTypeMeta, FieldMeta, MetaId, MetaKind,
    MetaPath, OperationKind, OperationMeta, SchemaMeta, TupleElementMeta, TypeMeta, TypeRef,
    Warning, BUILTIN_SCALARS, RESERVED_NAMES,
};
