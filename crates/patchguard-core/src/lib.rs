//! Core contracts and helpers for patchguard.
//!
//! This crate defines the schema tree, the rule engine seam with its bundled
//! implementation, and the pointer resolver shared by the validator and the
//! CLI.

pub mod engine;
pub mod error;
pub mod pointer;
pub mod schema;
pub mod validation;

pub use engine::{
    EngineOptions, RuleEngine, StandardEngine, Validated, Violation, ViolationDetail,
};
pub use error::{Error, Result};
pub use pointer::{NodeRef, dotted, resolve};
pub use schema::{Presence, Rule, RuleKind, SchemaNode};
pub use validation::validate_schema;
