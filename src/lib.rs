// ============================================================================
// caseschema Library
// ============================================================================

//! Dynamic schemas for case-management payloads.
//!
//! * [`schema`]: versioned schema definitions and the parent/child schema graph
//! * [`entity`]: runtime-typed entities addressed by dotted paths
//! * [`form`]: form configuration trees checked against entities
//! * [`audit`]: before/after diffs of entities for audit records
//!
//! ```
//! use caseschema::{Attribute, AttributeType, DynamicEntity, SchemaRegistry, Value};
//!
//! # fn main() -> caseschema::Result<()> {
//! let mut registry = SchemaRegistry::new();
//! let schema = registry.define_schema(
//!     "Applicant",
//!     vec![Attribute::new("name", AttributeType::String)],
//!     vec![],
//!     vec![],
//! )?;
//!
//! let mut applicant = DynamicEntity::new(schema);
//! applicant.set("name", "Ada")?;
//! assert_eq!(applicant.get("name")?, Value::from("Ada"));
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod config;
pub mod core;
pub mod entity;
pub mod evaluator;
pub mod form;
pub mod parser;
pub mod schema;
pub mod storage;

// Re-export main types for convenience
pub use crate::core::{Attribute, AttributeType, DocumentRef, Result, SchemaError, Value};
pub use config::ValidatorConfig;
pub use schema::{ComputedAttribute, Schema, SchemaDocument, SchemaRegistry};
pub use entity::DynamicEntity;
pub use form::{FormComponent, FormConfiguration, FormValidator, ValidationErrorItem};
pub use audit::{EntityDiff, diff, diff_entities, flatten_excluding_computed};
