pub mod detection;
pub mod enhancement;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod render;
pub mod report;

pub use detection::{Detector, MergeConfig, MergeOutcome, merge_detections};
pub use enhancement::{EnhanceConfig, enhance};
pub use error::{DetectionError, FailureKind};
pub use models::{BoundingBox, ClassTally, Detection};
pub use pipeline::{Pipeline, PipelineContext, PipelineData, PipelineStep, StageOutput};
pub use report::{DetectionReport, analyze};

use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};
use log::LevelFilter;
use std::path::Path;

/// Initialize logging once. `RUST_LOG` wins over the default level.
pub fn init_logging(verbose: bool) {
    let default_filter = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_filter.as_str()),
    );
    // A second call (e.g. from tests) keeps the first logger.
    let _ = builder.try_init();
}

/// Read an image file as 8-bit RGB, rejecting empty images
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Could not read {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("Failed to decode image {}", path.display()))?
        .to_rgb8();

    detection::validate_image(&img)?;
    Ok(img)
}
