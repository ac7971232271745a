//! Strict validation of a loaded transform set.
//!
//! Parsing keeps whatever it can; this is the gate that refuses a set before it
//! is trusted for scoring.

use crate::definition::{PARAM_SCALE, TransformDefinition};
use crate::error::ValidationError;
use crate::transform_set::FeatureTransformSet;

impl FeatureTransformSet {
    /// Check the set against the feature count the scoring model expects.
    ///
    /// A disabled set always passes. Returns the first defect found.
    pub fn validate(&self, expected_feature_count: usize) -> Result<(), ValidationError> {
        if !self.enabled {
            return Ok(());
        }

        if self.order.is_empty() {
            return Err(ValidationError::EmptyFeatureOrder);
        }
        if let Some(index) = (0..expected_feature_count).find(|i| !self.order.contains(*i)) {
            return Err(ValidationError::MissingOrderIndex { index });
        }

        for (position, transform) in self.transforms.iter().enumerate() {
            validate_transform(position, transform, expected_feature_count)?;
        }

        tracing::debug!(
            transforms = self.transforms.len(),
            expected_feature_count,
            "[Smart] transform set validated"
        );
        Ok(())
    }
}

fn validate_transform(
    position: usize,
    transform: &TransformDefinition,
    expected: usize,
) -> Result<(), ValidationError> {
    let id = || transform.id.clone();

    let Some(required) = transform.kind.required_params() else {
        return Err(ValidationError::UnsupportedKind {
            position,
            id: id(),
            kind: transform.kind.clone(),
        });
    };

    if transform.feature_indices.is_empty() {
        return Err(ValidationError::EmptyFeatureIndices { position, id: id() });
    }
    if let Some(&index) = transform.feature_indices.iter().find(|i| **i >= expected) {
        return Err(ValidationError::IndexOutOfRange {
            position,
            id: id(),
            index,
            expected,
        });
    }

    let count = transform.feature_indices.len();
    for param in required {
        let Some(values) = transform.param(param) else {
            return Err(ValidationError::MissingParameter {
                position,
                id: id(),
                kind: transform.kind.clone(),
                param,
            });
        };
        if values.len() != count {
            return Err(ValidationError::ParameterCountMismatch {
                position,
                id: id(),
                kind: transform.kind.clone(),
                param,
                expected: count,
                actual: values.len(),
            });
        }
        if param == PARAM_SCALE
            && let Some(offset) = values.iter().position(|s| *s == 0.0)
        {
            return Err(ValidationError::ZeroScale {
                position,
                id: id(),
                kind: transform.kind.clone(),
                offset,
            });
        }
    }

    Ok(())
}
