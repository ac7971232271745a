//! The loaded transform configuration and the parse pipeline that builds it.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::config::{SmartScaleConfig, default_max_feature_size};
use crate::definition::{self, PARAM_FEATURES, PARAM_TYPE, TransformDefinition};
use crate::diagnostics::Diagnostics;
use crate::error::TransformError;
use crate::loader::{END_MARKER, START_MARKER};
use crate::order::FeatureOrder;
use crate::tokenizer::{self, Section};

const KEY_TRANSFORM: &str = "transform";
const KEY_UNTRANSFORMED: &str = "untransformed_features";

/// Everything read from one `[transforms]` block.
///
/// Built once at load time and never mutated afterwards, so a single instance
/// can be shared across scoring threads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTransformSet {
    #[serde(rename = "transforms_enabled")]
    pub enabled: bool,
    pub order: FeatureOrder,
    pub transforms: Vec<TransformDefinition>,
    /// `index:name` descriptors of features left as-is. Informational only.
    pub untransformed_features: Vec<String>,
}

impl Default for FeatureTransformSet {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Result of parsing a block: the set plus every soft issue skipped on the way.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub set: FeatureTransformSet,
    pub diagnostics: Diagnostics,
}

/// Knobs for [`FeatureTransformSet::parse_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_feature_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_feature_size: default_max_feature_size(),
        }
    }
}

impl From<&SmartScaleConfig> for ParseOptions {
    fn from(config: &SmartScaleConfig) -> Self {
        Self {
            max_feature_size: config.max_feature_size,
        }
    }
}

impl FeatureTransformSet {
    /// Set used when a model carries no transform block: nothing is applied.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            order: FeatureOrder::default(),
            transforms: Vec::new(),
            untransformed_features: Vec::new(),
        }
    }

    /// Parse the text between the block markers with default options.
    pub fn parse(content: &str) -> ParseOutcome {
        Self::parse_with(content, ParseOptions::default())
    }

    /// Parse the text between the block markers.
    ///
    /// Malformed items are skipped and reported in the outcome's diagnostics,
    /// which are also logged. Parsing itself never fails.
    pub fn parse_with(content: &str, options: ParseOptions) -> ParseOutcome {
        let mut diagnostics = Diagnostics::new();
        let entries = tokenizer::tokenize(content);

        let mut enabled = false;
        let mut untransformed_features = Vec::new();
        let mut order_entries = Vec::new();
        let mut definition_entries = Vec::new();

        for entry in &entries {
            match &entry.section {
                Section::Order => order_entries.push(entry),
                Section::Definitions => definition_entries.push(entry),
                Section::Top | Section::Other(_) => match entry.key.as_str() {
                    KEY_TRANSFORM => enabled = entry.value == "true",
                    KEY_UNTRANSFORMED => {
                        untransformed_features = definition::parse_string_list(&entry.value);
                    }
                    _ => {}
                },
            }
        }

        let transforms = definition::build_definitions(
            definition_entries,
            options.max_feature_size,
            &mut diagnostics,
        );
        let order =
            FeatureOrder::from_entries(order_entries, options.max_feature_size, &mut diagnostics);

        diagnostics.emit("Transform parsing errors");

        ParseOutcome {
            set: Self {
                enabled,
                order,
                transforms,
                untransformed_features,
            },
            diagnostics,
        }
    }

    pub fn is_active(&self) -> bool {
        self.enabled && !self.transforms.is_empty()
    }

    /// One-line summary of the set, also logged at debug level.
    pub fn debug_dump(&self) -> String {
        let summary: Vec<String> = self
            .transforms
            .iter()
            .map(|t| format!("{}[{} features]", t.kind, t.feature_indices.len()))
            .collect();
        let dump = format!(
            "FeatureTransforms: enabled={}, features={}, transforms={} [{}], untransformed=[{}]",
            self.enabled,
            self.order.len(),
            self.transforms.len(),
            summary.join(", "),
            self.untransformed_features.join(" "),
        );
        tracing::debug!("[Smart] {dump}");
        dump
    }

    /// Render the set as a `[transforms]` block in the format the loader reads.
    pub fn to_block(&self) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_block(&mut out);
        out
    }

    fn write_block(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{START_MARKER}")?;

        writeln!(out, "[order]")?;
        for (idx, name) in self.order.iter() {
            writeln!(out, "{idx}={name}")?;
        }
        writeln!(out, "[/order]")?;

        writeln!(out, "[definitions]")?;
        for transform in &self.transforms {
            let id = &transform.id;
            writeln!(out, "{id}_{PARAM_TYPE}={}", transform.kind)?;
            writeln!(
                out,
                "{id}_{PARAM_FEATURES}={}",
                join_values(&transform.feature_indices)
            )?;
            for (name, values) in &transform.parameters {
                writeln!(out, "{id}_{name}={}", join_values(values))?;
            }
            writeln!(out)?;
        }
        writeln!(out, "[/definitions]")?;

        writeln!(
            out,
            "{KEY_UNTRANSFORMED}={}",
            self.untransformed_features.join(",")
        )?;
        writeln!(out, "{KEY_TRANSFORM}={}", self.enabled)?;
        writeln!(out, "{END_MARKER}")
    }

    pub fn to_json(&self) -> Result<String, TransformError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn join_values<T: ToString>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::TransformKind;
    use pretty_assertions::assert_eq;

    const BLOCK: &str = "
[order]
0=success
1=failure
2=connect_time
3=latency
[/order]

[definitions]
std_type=StandardScaler
std_features=2,3
std_mean=10,20
std_scale=2,5

robust_type=RobustScaler
robust_features=0,1
robust_center=0.5,1
robust_scale=2,4
[/definitions]

untransformed_features=8:is_udp, 9:is_tcp
transform=true
";

    #[test]
    fn test_parse_full_block() {
        let ParseOutcome { set, diagnostics } = FeatureTransformSet::parse(BLOCK);
        assert!(diagnostics.is_empty());
        assert!(set.enabled);
        assert!(set.is_active());
        assert_eq!(set.order.len(), 21);
        assert_eq!(set.order.get(3), Some("latency"));
        assert_eq!(set.transforms.len(), 2);
        assert_eq!(set.transforms[0].kind, TransformKind::RobustScale);
        assert_eq!(set.transforms[1].kind, TransformKind::StandardScale);
        assert_eq!(
            set.untransformed_features,
            vec!["8:is_udp".to_string(), "9:is_tcp".to_string()]
        );
    }

    #[test]
    fn test_transform_flag_must_be_exactly_true() {
        let set = FeatureTransformSet::parse("transform=True").set;
        assert!(!set.enabled);
        let set = FeatureTransformSet::parse("transform=true").set;
        assert!(set.enabled);
        assert!(!set.is_active());
    }

    #[test]
    fn test_unknown_section_keys_act_as_top_level() {
        let set = FeatureTransformSet::parse("[meta]\ntransform=true\n[/meta]").set;
        assert!(set.enabled);
    }

    #[test]
    fn test_max_feature_size_option() {
        let text = "[definitions]\nwide_type=StandardScaler\nwide_features=25\nwide_mean=0\nwide_scale=1\n[/definitions]";
        let narrow = FeatureTransformSet::parse(text);
        assert!(narrow.set.transforms.is_empty());
        assert!(narrow.diagnostics.contains("invalid feature index 25"));

        let wide = FeatureTransformSet::parse_with(
            text,
            ParseOptions {
                max_feature_size: 32,
            },
        );
        assert_eq!(wide.set.transforms.len(), 1);
    }

    #[test]
    fn test_debug_dump_format() {
        let set = FeatureTransformSet::parse(BLOCK).set;
        assert_eq!(
            set.debug_dump(),
            "FeatureTransforms: enabled=true, features=21, transforms=2 \
             [RobustScaler[2 features], StandardScaler[2 features]], \
             untransformed=[8:is_udp 9:is_tcp]"
        );
        assert_eq!(
            FeatureTransformSet::disabled().debug_dump(),
            "FeatureTransforms: enabled=false, features=21, transforms=0 [], untransformed=[]"
        );
    }

    #[test]
    fn test_rendered_block_parses_back() {
        let original = FeatureTransformSet::parse(BLOCK).set;
        let block = original.to_block();
        assert!(block.starts_with("[transforms]\n[order]\n0=success\n"));
        assert!(block.contains("std_features=2,3\n"));
        assert!(block.trim_end().ends_with("transform=true\n[/transforms]"));

        let inner = block
            .strip_prefix(START_MARKER)
            .and_then(|b| b.trim_end().strip_suffix(END_MARKER))
            .expect("rendered block carries both markers");
        let reparsed = FeatureTransformSet::parse(inner);
        assert!(reparsed.diagnostics.is_empty());
        assert_eq!(reparsed.set, original);
    }

    #[test]
    fn test_json_view() {
        let json = FeatureTransformSet::parse(BLOCK).set.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["transforms_enabled"], true);
        assert_eq!(value["transforms"][1]["kind"], "StandardScaler");
        assert_eq!(value["order"]["5"], "download_mb");

        let back: FeatureTransformSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back.transforms[1].kind, TransformKind::StandardScale);
    }
}
