//! Error surface of the screen IR core.
//!
//! The core never errors on bad *input*: malformed records degrade to
//! defaults, structural violations are repaired during reconciliation, and a
//! document that fails the schema check comes back as a non-ok
//! [`ValidationReport`](crate::ValidationReport), not an `Err`. What remains
//! is configuration: a schema that cannot be read or compiled, and reconcile
//! settings that make no sense.

use thiserror::Error;

/// Errors produced by the screen IR core.
#[derive(Debug, Error)]
pub enum IrError {
    /// The structural schema file could not be read. Fatal at startup; there
    /// is no meaningful default to degrade to.
    #[error("schema read error: {0}")]
    SchemaRead(String),
    /// The structural schema was read but is not a valid JSON Schema.
    #[error("schema compile error: {0}")]
    SchemaCompile(String),
    /// Reconcile configuration failed validation.
    #[error("invalid reconcile config: {0}")]
    InvalidConfig(String),
}
