//! Transform definitions and the builder that assembles them from
//! prefix-grouped `[definitions]` keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::tokenizer::Entry;

pub const PARAM_TYPE: &str = "type";
pub const PARAM_FEATURES: &str = "features";
pub const PARAM_MEAN: &str = "mean";
pub const PARAM_CENTER: &str = "center";
pub const PARAM_SCALE: &str = "scale";

/// Supported scaling algorithms.
///
/// Unrecognised kind strings survive parsing as [`TransformKind::Unknown`] and
/// are rejected by validation, never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum TransformKind {
    StandardScale,
    RobustScale,
    Unknown(String),
}

impl TransformKind {
    pub fn as_str(&self) -> &str {
        match self {
            TransformKind::StandardScale => "StandardScaler",
            TransformKind::RobustScale => "RobustScaler",
            TransformKind::Unknown(raw) => raw,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, TransformKind::Unknown(_))
    }

    /// Names of the parameter arrays this kind reads, offset first, then scale.
    pub fn required_params(&self) -> Option<[&'static str; 2]> {
        match self {
            TransformKind::StandardScale => Some([PARAM_MEAN, PARAM_SCALE]),
            TransformKind::RobustScale => Some([PARAM_CENTER, PARAM_SCALE]),
            TransformKind::Unknown(_) => None,
        }
    }
}

impl From<String> for TransformKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "StandardScaler" => TransformKind::StandardScale,
            "RobustScaler" => TransformKind::RobustScale,
            _ => TransformKind::Unknown(s),
        }
    }
}

impl From<TransformKind> for String {
    fn from(kind: TransformKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One scaling operation over a fixed set of feature positions.
///
/// Each parameter array is aligned positionally with `feature_indices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformDefinition {
    pub id: String,
    pub kind: TransformKind,
    pub feature_indices: Vec<usize>,
    pub parameters: BTreeMap<String, Vec<f64>>,
}

impl TransformDefinition {
    pub fn new(id: impl Into<String>, kind: TransformKind, feature_indices: Vec<usize>) -> Self {
        Self {
            id: id.into(),
            kind,
            feature_indices,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.parameters.insert(name.into(), values);
        self
    }

    pub fn param(&self, name: &str) -> Option<&[f64]> {
        self.parameters.get(name).map(Vec::as_slice)
    }
}

/// Assemble definitions from `[definitions]` entries.
///
/// Keys are split on the first `_` into transform id and parameter name; keys
/// without `_` are ignored. Groups that fail to build are skipped with a
/// diagnostic. The result is ordered lexicographically by transform id, which
/// is also the order transforms are applied in.
pub fn build_definitions<'a>(
    entries: impl IntoIterator<Item = &'a Entry>,
    max_feature_size: usize,
    diags: &mut Diagnostics,
) -> Vec<TransformDefinition> {
    let mut groups: BTreeMap<&str, BTreeMap<&str, &str>> = BTreeMap::new();
    for entry in entries {
        if let Some((id, param)) = entry.key.split_once('_') {
            groups
                .entry(id)
                .or_default()
                .insert(param, entry.value.as_str());
        }
    }

    let mut definitions = Vec::with_capacity(groups.len());
    for (id, params) in groups {
        let definition = match build_one(id, &params) {
            Ok(definition) => definition,
            Err(reason) => {
                diags.push(format!("failed to build transform {id}: {reason}"));
                continue;
            }
        };

        if definition.feature_indices.is_empty() {
            diags.push(format!("transform {id} has no feature indices"));
            continue;
        }
        if let Some(bad) = definition
            .feature_indices
            .iter()
            .find(|idx| **idx >= max_feature_size)
        {
            diags.push(format!("transform {id} contains invalid feature index {bad}"));
            continue;
        }

        definitions.push(definition);
    }

    definitions
}

fn build_one(id: &str, params: &BTreeMap<&str, &str>) -> Result<TransformDefinition, String> {
    let kind = params
        .get(PARAM_TYPE)
        .map(|raw| TransformKind::from(raw.to_string()))
        .ok_or("missing transform type")?;

    let features = params
        .get(PARAM_FEATURES)
        .ok_or("missing feature indices")?;
    let feature_indices = parse_index_list(features)
        .map_err(|e| format!("failed to parse feature indices: {e}"))?;

    let mut definition = TransformDefinition::new(id, kind, feature_indices);
    for (name, raw) in params {
        if *name == PARAM_TYPE || *name == PARAM_FEATURES {
            continue;
        }
        let values =
            parse_float_list(raw).map_err(|e| format!("failed to parse parameter {name}: {e}"))?;
        definition.parameters.insert((*name).to_string(), values);
    }

    Ok(definition)
}

fn split_list(raw: &str) -> impl Iterator<Item = &str> {
    // An empty value is an empty list, not a list with one empty item.
    let parts = (!raw.is_empty()).then(|| raw.split(','));
    parts.into_iter().flatten().map(str::trim)
}

/// Parse a comma-separated list of feature indices.
///
/// Negative numbers are reported as out-of-range indices.
fn parse_index_list(raw: &str) -> Result<Vec<usize>, String> {
    split_list(raw)
        .map(|part| {
            let value: i64 = part
                .parse()
                .map_err(|e| format!("failed to parse integer '{part}': {e}"))?;
            usize::try_from(value).map_err(|_| format!("negative feature index {value}"))
        })
        .collect()
}

fn parse_float_list(raw: &str) -> Result<Vec<f64>, String> {
    split_list(raw)
        .map(|part| {
            part.parse::<f64>()
                .map_err(|e| format!("failed to parse float '{part}': {e}"))
        })
        .collect()
}

/// Comma-separated list of trimmed strings, kept verbatim.
pub(crate) fn parse_string_list(raw: &str) -> Vec<String> {
    split_list(raw).map(str::to_string).collect()
}
