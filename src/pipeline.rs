use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::error::DetectionError;

/// Data that flows through the pipeline
#[derive(Clone)]
pub struct PipelineData {
    /// The image produced by the previous step
    pub image: RgbImage,
}

impl PipelineData {
    pub fn from_image(image: RgbImage) -> Self {
        Self { image }
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Directory that receives one image per stage
    pub output_dir: PathBuf,
}

/// Context available to all pipeline steps
#[derive(Clone, Default)]
pub struct PipelineContext {
    pub debug: Option<DebugConfig>,
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Consume the previous stage's output and return a same-sized image
    fn process(&self, data: PipelineData, context: &PipelineContext) -> Result<PipelineData>;

    /// Human-readable name for this step (used in logs and debug filenames)
    fn name(&self) -> &str;
}

/// Output of one executed step
pub struct StageOutput {
    pub name: String,
    pub image: RgbImage,
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                anyhow::bail!("Debug directory is not empty: {}", output_dir.display());
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        self.context.debug = Some(DebugConfig { output_dir });
        Ok(self)
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step and return the final image
    pub fn run(&self, input: RgbImage) -> Result<RgbImage> {
        let mut stages = self.execute(input, self.steps.len())?;
        match stages.pop() {
            Some(last) => Ok(last.image),
            None => anyhow::bail!("pipeline produced no output"),
        }
    }

    /// Run every step and return each stage's output, starting with the input
    pub fn run_stages(&self, input: RgbImage) -> Result<Vec<StageOutput>> {
        self.execute(input, self.steps.len())
    }

    /// Run the pipeline but stop at an intermediate step (useful for debugging)
    pub fn run_partial(&self, input: RgbImage, num_steps: usize) -> Result<RgbImage> {
        let mut stages = self.execute(input, num_steps.min(self.steps.len()))?;
        match stages.pop() {
            Some(last) => Ok(last.image),
            None => anyhow::bail!("pipeline produced no output"),
        }
    }

    fn execute(&self, input: RgbImage, num_steps: usize) -> Result<Vec<StageOutput>> {
        let (width, height) = input.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectionError::BadInput(format!(
                "image has zero dimension ({}x{})",
                width, height
            ))
            .into());
        }

        self.save_debug(0, "input", &input)?;

        let mut stages = vec![StageOutput {
            name: "input".to_string(),
            image: input.clone(),
        }];
        let mut data = PipelineData::from_image(input);

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            let started = Instant::now();
            data = step
                .process(data, &self.context)
                .with_context(|| format!("step '{}' failed", step.name()))?;
            log::debug!(
                "{} finished in {:.1} ms",
                step.name(),
                started.elapsed().as_secs_f64() * 1000.0
            );

            if data.image.dimensions() != (width, height) {
                anyhow::bail!(
                    "step '{}' changed image size to {:?}",
                    step.name(),
                    data.image.dimensions()
                );
            }

            self.save_debug(step_idx + 1, step.name(), &data.image)?;
            stages.push(StageOutput {
                name: step.name().to_string(),
                image: data.image.clone(),
            });
        }

        Ok(stages)
    }

    fn save_debug(&self, index: usize, name: &str, image: &RgbImage) -> Result<()> {
        let Some(debug_config) = &self.context.debug else {
            return Ok(());
        };

        let output_path = debug_config.output_dir.join(debug_filename(index, name));
        image
            .save(&output_path)
            .with_context(|| format!("Failed to save debug image {}", output_path.display()))?;
        log::debug!("saved {}", display_name(&output_path));
        Ok(())
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Filename used for a stage in debug mode (e.g. "01_illumination_flattening.png")
pub fn debug_filename(index: usize, name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{:02}_{}.png", index, slug)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
