//! Specification validation.
//!
//! Two stages, both accumulating every independent error instead of
//! stopping at the first:
//!
//! - [`validate_schema`] checks the untyped [`Document`](crate::Document)
//!   against the expected shape.
//! - [`validate_values`] checks the semantics of a schema-valid
//!   [`RawSpec`](crate::RawSpec): query file, parameter types, condition
//!   syntax.

mod schema;
mod values;

pub use schema::validate_schema;
pub use values::validate_values;
