pub mod clahe;
pub mod color;
pub mod filters;
pub mod steps;

use crate::error::DetectionError;
use crate::pipeline::Pipeline;
use anyhow::Result;
use image::RgbImage;
use std::sync::Arc;

/// Parameters of the three-stage enhancement.
#[derive(Debug, Clone, PartialEq)]
pub struct EnhanceConfig {
    /// Sigma of the heavy blur that models large-scale lighting (typically 15-45)
    pub illumination_sigma: f32,
    pub clahe_clip_limit: f32,
    /// CLAHE tiles per axis
    pub clahe_tiles: u32,
    /// Radius of the disk used by the top-hat; about half the expected object width
    pub tophat_radius: u8,
    pub tophat_weight: f32,
    pub unsharp_sigma: f32,
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            illumination_sigma: 25.0,
            clahe_clip_limit: 3.0,
            clahe_tiles: 8,
            tophat_radius: 15,
            tophat_weight: 0.7,
            unsharp_sigma: 1.2,
        }
    }
}

impl EnhanceConfig {
    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(self.illumination_sigma > 0.0) {
            return Err(DetectionError::BadInput(format!(
                "illumination sigma must be positive, got {}",
                self.illumination_sigma
            )));
        }
        if !(self.unsharp_sigma > 0.0) {
            return Err(DetectionError::BadInput(format!(
                "unsharp sigma must be positive, got {}",
                self.unsharp_sigma
            )));
        }
        if !(self.clahe_clip_limit > 0.0) {
            return Err(DetectionError::BadInput(format!(
                "CLAHE clip limit must be positive, got {}",
                self.clahe_clip_limit
            )));
        }
        if self.clahe_tiles == 0 {
            return Err(DetectionError::BadInput("CLAHE tile grid must be at least 1x1".into()));
        }
        if self.tophat_radius == 0 {
            return Err(DetectionError::BadInput("top-hat radius must be at least 1".into()));
        }
        Ok(())
    }

    pub fn clahe_params(&self) -> clahe::ClaheParams {
        clahe::ClaheParams {
            clip_limit: self.clahe_clip_limit,
            tiles_x: self.clahe_tiles,
            tiles_y: self.clahe_tiles,
        }
    }
}

/// Build the illumination -> local contrast -> unsharp pipeline
pub fn build_enhancement_pipeline(config: &EnhanceConfig) -> Result<Pipeline> {
    use steps::*;

    config.validate()?;

    Ok(Pipeline::new()
        .add_step(Arc::new(IlluminationFlattenStep {
            sigma: config.illumination_sigma,
        }))
        .add_step(Arc::new(LocalContrastStep {
            clahe: config.clahe_params(),
            tophat_radius: config.tophat_radius,
            tophat_weight: config.tophat_weight,
        }))
        .add_step(Arc::new(UnsharpMaskStep {
            sigma: config.unsharp_sigma,
        })))
}

/// Run the full enhancement on one image
pub fn enhance(image: &RgbImage, config: &EnhanceConfig) -> Result<RgbImage> {
    let pipeline = build_enhancement_pipeline(config)?;
    let enhanced = pipeline.run(image.clone())?;
    log::info!("enhanced {}x{} image", enhanced.width(), enhanced.height());
    Ok(enhanced)
}
