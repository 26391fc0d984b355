//! bqspec-core: specification model and validation for bqspec.
//!
//! A specification file names a SQL query, binds typed parameters and
//! declares conditions over the query's result rows. This crate turns the
//! file into a validated [`RawSpec`]:
//!
//! - [`load_document()`] -- decode YAML into an untyped [`Document`]
//! - [`validate_schema()`] -- structural checks, located [`SpecError`]s
//! - [`RawSpec::from_document`] -- typed raw model
//! - [`validate_values()`] -- query file, parameter types, condition syntax
//!
//! The condition language lives in [`lexer`], [`parser`] and [`ast`];
//! evaluation against rows is done by `bqspec-eval`.

pub mod ast;
pub mod bqtype;
pub mod document;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod raw;
pub mod rcpath;
pub mod validate;

// ── Convenience re-exports ───────────────────────────────────────────

pub use ast::Expr;
pub use bqtype::ScalarType;
pub use document::{load_document, parse_document, Document, LoadError, Scalar};
pub use error::{ErrorKind, SpecError};
pub use parser::{parse, ParseError};
pub use raw::{RawCase, RawParam, RawSpec};
pub use rcpath::ResourcePath;
pub use validate::{validate_schema, validate_values};
