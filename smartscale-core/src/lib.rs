//! # smartscale-core: feature scaling from model-embedded transform blocks
//!
//! Models trained with a scaled feature set carry their scaler parameters in a
//! small text block appended to the model artifact:
//!
//! ```text
//! [transforms]
//! [order]
//! 0=success
//! ...
//! [/order]
//! [definitions]
//! std_type=StandardScaler
//! std_features=2,3
//! std_mean=10,20
//! std_scale=2,5
//! [/definitions]
//! untransformed_features=8:is_udp,9:is_tcp
//! transform=true
//! [/transforms]
//! ```
//!
//! This crate finds that block in the file tail, parses it tolerantly
//! (malformed items are skipped and reported), validates the result strictly,
//! and applies the scalers to feature vectors on every scoring call.
//!
//! ```no_run
//! use smartscale_core::load_transforms;
//!
//! let set = load_transforms("Model.bin")?;
//! set.validate(21)?;
//! let scaled = set.apply(&[0.0; 21]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod definition;
pub mod diagnostics;
pub mod error;
mod executor;
pub mod loader;
pub mod order;
pub mod pool;
pub mod tokenizer;
pub mod transform_set;
mod validate;

pub use config::{SmartScaleConfig, load_config};
pub use definition::{TransformDefinition, TransformKind};
pub use diagnostics::Diagnostics;
pub use error::{TransformError, ValidationError};
pub use loader::{END_MARKER, ModelLoader, START_MARKER, load_transforms};
pub use order::{DEFAULT_FEATURE_COUNT, DEFAULT_FEATURE_NAMES, FeatureOrder};
pub use pool::{PoolStats, ScratchBuffer, ScratchPool, global_pool};
pub use transform_set::{FeatureTransformSet, ParseOptions, ParseOutcome};
