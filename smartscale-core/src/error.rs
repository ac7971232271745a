//! Error types for the smartscale-core crate.
//!
//! Two tiers: [`TransformError`] covers hard failures while loading a model
//! artifact, [`ValidationError`] is the strict gate run once on a loaded set.
//! Soft per-item parse and apply issues are not errors; they are reported as
//! diagnostics and the offending item is skipped.

use std::path::PathBuf;

use thiserror::Error;

use crate::definition::TransformKind;

/// Hard failures that abort loading a transform configuration.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("failed to read model file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("found transforms start marker but no end marker in the tail of {}", path.display())]
    MissingEndMarker { path: PathBuf },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl TransformError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Structural or numeric defects found by [`crate::FeatureTransformSet::validate`].
///
/// `position` is the transform's index in application order, `id` its key prefix.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("feature order mapping is empty")]
    EmptyFeatureOrder,

    #[error("feature index {index} missing in feature order mapping")]
    MissingOrderIndex { index: usize },

    #[error("transform {position} ({id}): unsupported transform type {kind}")]
    UnsupportedKind {
        position: usize,
        id: String,
        kind: TransformKind,
    },

    #[error("transform {position} ({id}): feature indices list is empty")]
    EmptyFeatureIndices { position: usize, id: String },

    #[error("transform {position} ({id}): feature index {index} out of range [0, {expected})")]
    IndexOutOfRange {
        position: usize,
        id: String,
        index: usize,
        expected: usize,
    },

    #[error("transform {position} ({id}): {kind} is missing parameter '{param}'")]
    MissingParameter {
        position: usize,
        id: String,
        kind: TransformKind,
        param: &'static str,
    },

    #[error(
        "transform {position} ({id}): {kind} {param} parameter count mismatch, expected {expected}, got {actual}"
    )]
    ParameterCountMismatch {
        position: usize,
        id: String,
        kind: TransformKind,
        param: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("transform {position} ({id}): {kind} scale[{offset}] is zero")]
    ZeroScale {
        position: usize,
        id: String,
        kind: TransformKind,
        offset: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_end_marker_message_names_file() {
        let err = TransformError::MissingEndMarker {
            path: PathBuf::from("/models/Model.bin"),
        };
        let msg = err.to_string();
        assert!(msg.contains("no end marker"));
        assert!(msg.contains("/models/Model.bin"));
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::ParameterCountMismatch {
            position: 1,
            id: "std".into(),
            kind: TransformKind::StandardScale,
            param: "mean",
            expected: 3,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "transform 1 (std): StandardScaler mean parameter count mismatch, expected 3, got 2"
        );
    }
}
