//! API description input: loading, normalization and reporting.
//!
//! The loader decodes a `.yaml`/`.yml`/`.json` file into a [`SpecModel`];
//! the compiler consumes only the model, never the raw document.

pub mod loader;
pub mod model;
pub mod summary;

pub use loader::{load_document, parse_document, DocumentFormat};
pub use model::{
    HttpMethod, JsonSchema, Operation, Parameter, ParameterLocation, PathItem, RequestBody,
    SchemaType, Server, SpecModel,
};
pub use summary::SpecSummary;
