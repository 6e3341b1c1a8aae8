//! Schema registry, version migrator, and JSON-Schema-like validator
//! shared by the content-type, content, and block services (§4.6).

pub mod migrator;
pub mod registry;
pub mod validator;
pub mod version;

pub use migrator::{MigrationFn, Migrator};
pub use registry::SchemaRegistry;
pub use validator::{validate_partial_payload, validate_payload, validate_schema, ValidationMode};
pub use version::{ensure_schema_version, SchemaVersion};
