//! Error Types
//!
//! This module defines the error types used throughout the exporter.
//!
//! # Overview
//!
//! The main error type [`ExportError`] covers the hard failure modes:
//! - Configuration errors (invalid axes, unknown collection or object names)
//! - Object types that have no scene-graph node variant
//! - Dangling references inside the source scene
//! - I/O, JSON and XML errors from the file-facing entry points
//!
//! Structural problems (a MergeChildren object without mesh children, a skinned
//! mesh whose armature is not exported, an unresolved child-of target, ...) are
//! *not* errors. They are logged with `log::warn!`, collected in the
//! [`ExportReport`](crate::exporter::ExportReport), and the exporter falls back
//! to a safe node type.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, ExportError>`.

use thiserror::Error;

use crate::source::ObjectKind;

/// The main error type for the exporter.
#[derive(Error, Debug)]
pub enum ExportError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Export settings or selection could not be applied.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested collection does not exist in the source scene.
    #[error("Collection '{0}' was not found")]
    CollectionNotFound(String),

    // ========================================================================
    // Scene Errors
    // ========================================================================
    /// The traversal reached an object type that has no node variant.
    #[error("Object type {kind:?} of '{name}' is not supported yet")]
    UnsupportedObjectType {
        /// Name of the offending object
        name: String,
        /// Its type tag
        kind: ObjectKind,
    },

    /// A reference inside the source scene points at nothing.
    #[error("Missing source data: {0}")]
    MissingObject(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The i3d document could not be emitted.
    #[error("XML write error: {0}")]
    XmlError(#[from] xmltree::Error),
}

/// Alias for `Result<T, ExportError>`.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Non-fatal problems found during an export.
///
/// Every entry is also logged at `warn` level when it is pushed.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{message}");
        self.warnings.push(message);
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    #[must_use]
    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
