//! `jsreflect_core` — parse JavaScript source and reflect it as an
//! ESTree-style AST, in the shape of SpiderMonkey's `Reflect.parse`.
//!
//! # Crate layout
//!
//! - [`error`] — error type and error classes.
//! - [`zone`] — per-call arena backing parse trees.
//! - [`parser`] — scanner and recursive-descent parser.
//! - [`reflect`] — operator tables, node builder, tree serializer and the
//!   [`reflect_parse`] entry point.

/// Error type shared by the parser and the reflect layer.
pub mod error;
/// JavaScript scanner and parser.
pub mod parser;
/// Parse tree to AST translation.
pub mod reflect;
mod stack;
/// Arena allocation for parse trees.
pub mod zone;

pub use error::{ErrorKind, ReflectError, ReflectResult};
pub use reflect::builder::{BuilderEntry, OverrideTable};
pub use reflect::value::AstValue;
pub use reflect::{ReflectConfig, ReflectOptions, reflect_parse};
