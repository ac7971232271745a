//! Applying a transform set to a feature vector.

use std::borrow::Cow;

use crate::definition::{PARAM_CENTER, PARAM_MEAN, PARAM_SCALE, TransformDefinition, TransformKind};
use crate::diagnostics::Diagnostics;
use crate::pool::{ScratchPool, global_pool};
use crate::transform_set::FeatureTransformSet;

impl FeatureTransformSet {
    /// Scale `features` using the process-wide scratch pool.
    ///
    /// Returns the input untouched (borrowed) when the set is disabled or
    /// empty; otherwise a freshly allocated, transformed copy. The caller's
    /// slice is never modified.
    pub fn apply<'a>(&self, features: &'a [f64]) -> Cow<'a, [f64]> {
        self.apply_with(global_pool(), features)
    }

    /// Same as [`apply`](Self::apply) with an explicit pool.
    pub fn apply_with<'a>(&self, pool: &ScratchPool, features: &'a [f64]) -> Cow<'a, [f64]> {
        if !self.is_active() {
            return Cow::Borrowed(features);
        }

        let mut scratch = pool.acquire(features.len());
        scratch.fill_from(features);

        let mut diags = Diagnostics::new();
        for (position, transform) in self.transforms.iter().enumerate() {
            if let Some(idx) = transform
                .feature_indices
                .iter()
                .find(|idx| **idx >= scratch.len())
            {
                diags.push(format!(
                    "transform {position} ({}) feature index {idx} out of range",
                    transform.id
                ));
                continue;
            }
            apply_in_place(&mut scratch, transform, &mut diags);
        }
        diags.emit("Apply transforms errors");

        Cow::Owned(scratch.to_vec())
    }
}

/// Apply one transform. Every index in `transform` must be within `features`.
fn apply_in_place(features: &mut [f64], transform: &TransformDefinition, diags: &mut Diagnostics) {
    match &transform.kind {
        TransformKind::StandardScale => standard_scale(features, transform, diags),
        TransformKind::RobustScale => robust_scale(features, transform),
        TransformKind::Unknown(kind) => {
            diags.push(format!("unknown transform type: {kind}"));
        }
    }
}

/// `(x - mean) / scale`. A count mismatch skips the whole transform; a zero
/// scale leaves only that feature unscaled.
fn standard_scale(features: &mut [f64], transform: &TransformDefinition, diags: &mut Diagnostics) {
    let mean = transform.param(PARAM_MEAN).unwrap_or_default();
    let scale = transform.param(PARAM_SCALE).unwrap_or_default();
    if mean.is_empty() || scale.is_empty() {
        return;
    }

    let expected = transform.feature_indices.len();
    if mean.len() != expected || scale.len() != expected {
        diags.push(format!(
            "StandardScaler parameter count mismatch, expected {expected}, got mean={} scale={}",
            mean.len(),
            scale.len()
        ));
        return;
    }

    for (i, &idx) in transform.feature_indices.iter().enumerate() {
        if scale[i] == 0.0 {
            diags.push(format!("scale[{i}] is zero for feature {idx}"));
            continue;
        }
        features[idx] = (features[idx] - mean[i]) / scale[i];
    }
}

/// `(x - center) / scale`. Zero scales are skipped without a diagnostic.
fn robust_scale(features: &mut [f64], transform: &TransformDefinition) {
    let center = transform.param(PARAM_CENTER).unwrap_or_default();
    let scale = transform.param(PARAM_SCALE).unwrap_or_default();

    for ((&idx, &c), &s) in transform.feature_indices.iter().zip(center).zip(scale) {
        if s != 0.0 {
            features[idx] = (features[idx] - c) / s;
        }
    }
}
