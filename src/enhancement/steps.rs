use crate::enhancement::clahe::{self, ClaheParams};
use crate::enhancement::{color, filters};
use crate::pipeline::{PipelineContext, PipelineData, PipelineStep};
use anyhow::Result;

/// Remove slow brightness gradients: 1.5 * input - 0.5 * heavy blur
pub struct IlluminationFlattenStep {
    pub sigma: f32,
}

impl PipelineStep for IlluminationFlattenStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let blurred = filters::gaussian_blur(&data.image, self.sigma);
        let flattened = filters::add_weighted(&data.image, 1.5, &blurred, -0.5, 0.0);
        Ok(PipelineData::from_image(flattened))
    }

    fn name(&self) -> &str {
        "Illumination Flattening"
    }
}

/// CLAHE on lightness, then boost bright compact blobs found by a white top-hat
pub struct LocalContrastStep {
    pub clahe: ClaheParams,
    pub tophat_radius: u8,
    pub tophat_weight: f32,
}

impl PipelineStep for LocalContrastStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let mut lab = color::split_lab(&data.image);
        lab.l = clahe::equalize(&lab.l, &self.clahe);
        let contrasted = color::merge_lab(&lab);

        let gray = filters::to_luma(&contrasted);
        let tophat = filters::white_top_hat(&gray, self.tophat_radius);
        let mask = filters::normalize_min_max(&tophat);

        let boosted = filters::add_gray_weighted(&contrasted, &mask, self.tophat_weight);
        Ok(PipelineData::from_image(boosted))
    }

    fn name(&self) -> &str {
        "Local Contrast"
    }
}

/// Sharpen edges: 1.5 * input - 0.5 * light blur
pub struct UnsharpMaskStep {
    pub sigma: f32,
}

impl PipelineStep for UnsharpMaskStep {
    fn process(&self, data: PipelineData, _context: &PipelineContext) -> Result<PipelineData> {
        let soft = filters::gaussian_blur(&data.image, self.sigma);
        let sharp = filters::add_weighted(&data.image, 1.5, &soft, -0.5, 0.0);
        Ok(PipelineData::from_image(sharp))
    }

    fn name(&self) -> &str {
        "Unsharp Mask"
    }
}
