//! Registry-driven validation for table documents.
//!
//! A [`StyleRegistry`] describes the CSS classes and typed `data-*`
//! attributes a project permits on cells; [`DocumentValidator`] checks whole
//! documents against it (plus the structural and merge-geometry invariants),
//! and [`parse_table_json`] is the strict import entry point: any finding is
//! an error, and the failure carries the full human-readable list.

mod import;
mod registry;
mod validator;

pub use import::{parse_table_json, ImportError};
pub use registry::{AttrSpec, AttrType, ClassSpec, ImportPolicy, RegistryRules, StyleRegistry};
pub use validator::{DocumentValidator, ValidationError};
