//! Tool infrastructure: compiled definitions, the compiler, the catalog.
//!
//! The compiler turns a [`SpecModel`](crate::spec::SpecModel) into tools;
//! the catalog indexes them and the handle publishes them to sessions.

pub mod catalog;
pub mod compiler;
pub mod tool;

pub use catalog::{CatalogHandle, ToolCatalog};
pub use compiler::{compile, tool_name, BODY_PROPERTY};
pub use tool::{ArgumentBinding, Endpoint, InputSchema, PropertySchema, Tool};
