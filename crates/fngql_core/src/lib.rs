//! Core utilities for fngql.
//!
//! This crate provides foundational types used throughout fngql:
//! - `span`: Source location tracking
//! - `arena`: Index-based arena storage
//! - `diagnostics`: Error reporting

pub mod arena;
pub mod diagnostics;
pub mod span;

pub use arena::{Arena, Idx};
pub use diagnostics::{Diagnostic, DiagnosticBag, DiagnosticSeverity, Label};
pub use span::{LineCol, LineIndex, Span};
