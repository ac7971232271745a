//! Locating and loading the transform block embedded in a model artifact.
//!
//! The block is appended to the end of the model file, so only a bounded tail
//! window is read.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::config::{SmartScaleConfig, default_tail_window_bytes};
use crate::error::TransformError;
use crate::transform_set::{FeatureTransformSet, ParseOptions, ParseOutcome};

pub const START_MARKER: &str = "[transforms]";
pub const END_MARKER: &str = "[/transforms]";

/// Load the transform set from `path` with default settings.
pub fn load_transforms(path: impl AsRef<Path>) -> Result<FeatureTransformSet, TransformError> {
    ModelLoader::default()
        .load(path)
        .map(|outcome| outcome.set)
}

/// Reads transform blocks out of model files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelLoader {
    tail_window_bytes: u64,
    options: ParseOptions,
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self {
            tail_window_bytes: default_tail_window_bytes(),
            options: ParseOptions::default(),
        }
    }
}

impl From<&SmartScaleConfig> for ModelLoader {
    fn from(config: &SmartScaleConfig) -> Self {
        Self {
            tail_window_bytes: config.tail_window_bytes,
            options: ParseOptions::from(config),
        }
    }
}

impl ModelLoader {
    pub fn new(config: &SmartScaleConfig) -> Self {
        Self::from(config)
    }

    pub fn tail_window_bytes(&self) -> u64 {
        self.tail_window_bytes
    }

    /// Load the block from `path`.
    ///
    /// A file without a start marker yields a disabled set. A start marker
    /// without an end marker after it is an error: the file is truncated or
    /// the block does not fit in the tail window.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ParseOutcome, TransformError> {
        let path = path.as_ref();
        let tail = read_tail(path, self.tail_window_bytes)?;
        let content = String::from_utf8_lossy(&tail);

        let outcome = match extract_block(&content) {
            Block::Absent => {
                tracing::debug!(path = %path.display(), "[Smart] no transform block in model");
                ParseOutcome {
                    set: FeatureTransformSet::disabled(),
                    diagnostics: Default::default(),
                }
            }
            Block::Unterminated => {
                return Err(TransformError::MissingEndMarker {
                    path: path.to_path_buf(),
                });
            }
            Block::Found(inner) => FeatureTransformSet::parse_with(inner, self.options),
        };

        tracing::info!(
            path = %path.display(),
            enabled = outcome.set.enabled,
            transforms = outcome.set.transforms.len(),
            skipped = outcome.diagnostics.len(),
            "[Smart] loaded feature transforms"
        );
        Ok(outcome)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Block<'a> {
    Absent,
    Unterminated,
    Found(&'a str),
}

/// Find the text strictly between the first start marker and the end marker
/// following it.
fn extract_block(content: &str) -> Block<'_> {
    let Some(start) = content.find(START_MARKER) else {
        return Block::Absent;
    };
    let body = &content[start + START_MARKER.len()..];
    match body.find(END_MARKER) {
        Some(end) => Block::Found(&body[..end]),
        None => Block::Unterminated,
    }
}

/// Read at most the last `window` bytes of the file at `path`.
fn read_tail(path: &Path, window: u64) -> Result<Vec<u8>, TransformError> {
    let io_err = |e: std::io::Error| TransformError::io(PathBuf::from(path), e);

    let mut file = File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();
    let read_size = window.min(size);

    file.seek(SeekFrom::End(-(read_size as i64)))
        .map_err(io_err)?;

    let mut buf = Vec::with_capacity(read_size as usize);
    file.take(read_size)
        .read_to_end(&mut buf)
        .map_err(io_err)?;
    Ok(buf)
}
