//! Subcommand definitions and handlers.

use std::path::{Path, PathBuf};

use anyhow::Context;
use smartscale_core::{FeatureTransformSet, ModelLoader, ScratchPool, SmartScaleConfig};

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Show the transform block of a model file
    Inspect {
        /// Model file path
        model: PathBuf,
        /// Print the parsed set as JSON
        #[arg(long, conflicts_with = "block")]
        json: bool,
        /// Print the set re-rendered as a [transforms] block
        #[arg(long)]
        block: bool,
    },
    /// Load and strictly validate the transform block
    Validate {
        /// Model file path
        model: PathBuf,
        /// Feature count the scoring model expects (defaults to config)
        #[arg(short, long)]
        expected: Option<usize>,
    },
    /// Apply the transforms to a feature vector
    Apply {
        /// Model file path
        model: PathBuf,
        /// Comma-separated feature values
        #[arg(long, allow_hyphen_values = true)]
        values: String,
        /// Apply even if validation fails
        #[arg(long)]
        skip_validation: bool,
    },
}

pub fn handle_command(command: Commands, config: &SmartScaleConfig) -> anyhow::Result<()> {
    match command {
        Commands::Inspect { model, json, block } => {
            let output = handle_inspect(&model, json, block, config)?;
            println!("{output}");
            Ok(())
        }
        Commands::Validate { model, expected } => {
            let expected = expected.unwrap_or(config.expected_feature_count);
            handle_validate(&model, expected, config)?;
            println!(
                "{}: transform block is valid for {expected} features",
                model.display()
            );
            Ok(())
        }
        Commands::Apply {
            model,
            values,
            skip_validation,
        } => {
            let output = handle_apply(&model, &values, skip_validation, config)?;
            println!("{output}");
            Ok(())
        }
    }
}

fn load(model: &Path, config: &SmartScaleConfig) -> anyhow::Result<FeatureTransformSet> {
    let outcome = ModelLoader::new(config)
        .load(model)
        .with_context(|| format!("failed to load transforms from {}", model.display()))?;
    for message in outcome.diagnostics.messages() {
        tracing::warn!("skipped: {message}");
    }
    Ok(outcome.set)
}

fn handle_inspect(
    model: &Path,
    json: bool,
    block: bool,
    config: &SmartScaleConfig,
) -> anyhow::Result<String> {
    let set = load(model, config)?;
    if json {
        Ok(set.to_json()?)
    } else if block {
        Ok(set.to_block())
    } else {
        Ok(set.debug_dump())
    }
}

fn handle_validate(model: &Path, expected: usize, config: &SmartScaleConfig) -> anyhow::Result<()> {
    let set = load(model, config)?;
    set.validate(expected)
        .with_context(|| format!("{} failed validation", model.display()))
}

fn handle_apply(
    model: &Path,
    values: &str,
    skip_validation: bool,
    config: &SmartScaleConfig,
) -> anyhow::Result<String> {
    let features = parse_values(values)?;
    let set = load(model, config)?;

    if !skip_validation {
        set.validate(config.expected_feature_count)
            .with_context(|| format!("{} failed validation", model.display()))?;
    }

    let pool = ScratchPool::from(config);
    let scaled = set.apply_with(&pool, &features);
    Ok(format_values(&scaled))
}

fn parse_values(raw: &str) -> anyhow::Result<Vec<f64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<f64>()
                .with_context(|| format!("invalid feature value '{part}'"))
        })
        .collect()
}

fn format_values(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn model(tail: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "tree\nend of trees\n\n{tail}").unwrap();
        file.flush().unwrap();
        file
    }

    const TAIL: &str = "[transforms]\n[definitions]\n\
        std_type=StandardScaler\nstd_features=0,1\nstd_mean=1,2\nstd_scale=2,4\n\
        [/definitions]\ntransform=true\n[/transforms]\n";

    #[test]
    fn test_parse_values() {
        assert_eq!(parse_values("1, -2.5,3e2").unwrap(), vec![1.0, -2.5, 300.0]);
        assert!(parse_values("1,abc").is_err());
    }

    #[test]
    fn test_apply_scales_values() {
        let file = model(TAIL);
        let out = handle_apply(file.path(), "5,10,7", false, &SmartScaleConfig::default()).unwrap();
        assert_eq!(out, "2,2,7");
    }

    #[test]
    fn test_apply_refuses_invalid_block_unless_skipped() {
        let file = model(
            "[transforms]\n[definitions]\nstd_type=StandardScaler\nstd_features=0\nstd_mean=1\nstd_scale=0\n\
             [/definitions]\ntransform=true\n[/transforms]\n",
        );
        let config = SmartScaleConfig::default();
        let err = handle_apply(file.path(), "5", false, &config).unwrap_err();
        assert!(format!("{err:#}").contains("scale[0] is zero"));

        let out = handle_apply(file.path(), "5", true, &config).unwrap();
        assert_eq!(out, "5");
    }

    #[test]
    fn test_inspect_modes() {
        let file = model(TAIL);
        let config = SmartScaleConfig::default();

        let dump = handle_inspect(file.path(), false, false, &config).unwrap();
        assert!(dump.starts_with("FeatureTransforms: enabled=true"));

        let json = handle_inspect(file.path(), true, false, &config).unwrap();
        assert!(json.contains("\"transforms_enabled\": true"));

        let block = handle_inspect(file.path(), false, true, &config).unwrap();
        assert!(block.contains("std_scale=2,4"));
    }

    #[test]
    fn test_validate_reports_truncated_model() {
        let file = model("[transforms]\ntransform=true\n");
        let err = handle_validate(file.path(), 21, &SmartScaleConfig::default()).unwrap_err();
        assert!(format!("{err:#}").contains("no end marker"));
    }
}
