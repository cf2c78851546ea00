//! Model Context data model.
//!
//! A normalized, serializable view of a design document: a flat element list,
//! an explicit hierarchy index over the same ids, named styles and optional
//! variables, semantics, interactions, assets and extensions.

pub mod context;
pub mod element;
pub mod validate;

pub use context::*;
pub use element::*;
pub use validate::{validate, validate_value, ValidationReport};

/// Model Context format version written into `metadata.version`.
pub const MODEL_CONTEXT_VERSION: &str = "1.0.0";

/// Generator identifier written into `metadata.generator`.
pub fn generator() -> String {
    format!("figma-context-mcp/{}", crate::VERSION)
}
