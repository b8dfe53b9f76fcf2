use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aerodetect::detection::hosted::{DEFAULT_API_URL, HostedDetector, HostedModelConfig};
use aerodetect::enhancement::build_enhancement_pipeline;
use aerodetect::render::{self, RenderOptions};
use aerodetect::detection::VEHICLE_LABELS;
use aerodetect::{DetectionReport, EnhanceConfig, MergeConfig, analyze, enhance, load_rgb};
use image::RgbImage;

const DEFAULT_IMAGE: &str = "plane only.jpg";

#[derive(Parser)]
#[command(name = "aerodetect")]
#[command(about = "Enhance aerial images and detect aircraft and vehicles")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the three-stage enhancement and save the result
    Enhance {
        /// Path to input image file
        #[arg(value_name = "IMAGE", default_value = DEFAULT_IMAGE)]
        image_path: PathBuf,

        /// Output path (defaults to <stem>_enhanced.jpg next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save every intermediate stage to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Save the original and every enhancement stage side by side
    Compare {
        #[arg(value_name = "IMAGE", default_value = DEFAULT_IMAGE)]
        image_path: PathBuf,

        #[arg(short, long, default_value = "enhancement_comparison.jpg")]
        output: PathBuf,

        /// Height of each panel in pixels
        #[arg(long, default_value_t = 400)]
        height: u32,

        /// Font used for panel labels
        #[arg(long)]
        font: Option<PathBuf>,

        #[command(flatten)]
        enhance: EnhanceArgs,
    },

    /// Enhance, run both detectors, merge and draw the result
    Detect(DetectArgs),
}

#[derive(Args)]
struct EnhanceArgs {
    /// Sigma of the illumination blur
    #[arg(long, default_value_t = 25.0)]
    sigma: f32,

    /// CLAHE clip limit
    #[arg(long, default_value_t = 3.0)]
    clip_limit: f32,

    /// CLAHE tiles per axis
    #[arg(long, default_value_t = 8)]
    tiles: u32,

    /// Top-hat disk radius (about half the expected object width)
    #[arg(long, default_value_t = 15)]
    tophat_radius: u8,
}

impl EnhanceArgs {
    fn to_config(&self) -> EnhanceConfig {
        EnhanceConfig {
            illumination_sigma: self.sigma,
            clahe_clip_limit: self.clip_limit,
            clahe_tiles: self.tiles,
            tophat_radius: self.tophat_radius,
            ..EnhanceConfig::default()
        }
    }
}

/// Which image the boxes are drawn on
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Canvas {
    Original,
    Enhanced,
}

#[derive(Args)]
struct DetectArgs {
    #[arg(value_name = "IMAGE", default_value = DEFAULT_IMAGE)]
    image_path: PathBuf,

    /// Hosted inference API key
    #[arg(long, env = "ROBOFLOW_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    #[arg(long, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// General-purpose model (project/version)
    #[arg(long, default_value = "military-equipment-detect/1")]
    primary_model: String,

    /// Aircraft model (project/version)
    #[arg(long, default_value = "airplanes-graua/2")]
    secondary_model: String,

    /// Service-side NMS overlap for both models
    #[arg(long, default_value_t = 0.45)]
    service_overlap: f32,

    /// Detect on the raw image instead of the enhanced one
    #[arg(long)]
    no_enhance: bool,

    #[arg(short, long, default_value = "detection_result.jpg")]
    output: PathBuf,

    /// Write the JSON report to this file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the JSON report instead of a text summary
    #[arg(long)]
    json: bool,

    /// Font used for labels and the summary line
    #[arg(long)]
    font: Option<PathBuf>,

    /// Draw the boxes on the original image or on the one that was analysed
    #[arg(long, value_enum, default_value_t = Canvas::Original)]
    draw_on: Canvas,

    /// Comma-separated labels always listed in the counts (defaults to the vehicle classes)
    #[arg(long, value_delimiter = ',')]
    known_labels: Option<Vec<String>>,

    #[arg(long, default_value_t = 0.25)]
    primary_confidence: f32,

    #[arg(long, default_value_t = 0.50)]
    primary_text_confidence: f32,

    #[arg(long, default_value_t = 0.10)]
    precheck_confidence: f32,

    #[arg(long, default_value_t = 0.50)]
    gate_confidence: f32,

    #[arg(long, default_value_t = 0.40)]
    secondary_confidence: f32,

    #[arg(long, default_value_t = 0.60)]
    secondary_text_confidence: f32,

    /// IoU above which an aircraft box duplicating a kept box is dropped
    #[arg(long, default_value_t = 0.5)]
    overlap_threshold: f32,

    #[command(flatten)]
    enhance: EnhanceArgs,
}

impl DetectArgs {
    fn merge_config(&self) -> MergeConfig {
        let config = MergeConfig {
            primary_confidence: self.primary_confidence,
            primary_text_confidence: self.primary_text_confidence,
            precheck_confidence: self.precheck_confidence,
            gate_confidence: self.gate_confidence,
            secondary_confidence: self.secondary_confidence,
            secondary_text_confidence: self.secondary_text_confidence,
            overlap_threshold: self.overlap_threshold,
            known_labels: Vec::new(),
        };
        match &self.known_labels {
            Some(labels) => config.with_known_labels(labels),
            None => config.with_known_labels(VEHICLE_LABELS),
        }
    }

    fn hosted_config(&self, model_id: &str) -> HostedModelConfig {
        HostedModelConfig {
            api_url: self.api_url.clone(),
            overlap: self.service_overlap,
            ..HostedModelConfig::new(model_id, self.api_key.clone())
        }
    }
}

fn canvas<'a>(choice: Canvas, original: &'a RgbImage, analysed: &'a RgbImage) -> &'a RgbImage {
    match choice {
        Canvas::Original => original,
        Canvas::Enhanced => analysed,
    }
}

fn default_enhanced_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    input.with_file_name(format!("{}_enhanced.jpg", stem))
}

fn run_enhance(
    image_path: &Path,
    output: Option<PathBuf>,
    debug_out: Option<PathBuf>,
    config: &EnhanceConfig,
) -> Result<()> {
    let img = load_rgb(image_path)?;
    log::info!("Image loaded: {}x{}", img.width(), img.height());

    let mut pipeline = build_enhancement_pipeline(config)?;
    if let Some(debug_dir) = debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let enhanced = pipeline.run(img)?;
    let out_path = output.unwrap_or_else(|| default_enhanced_path(image_path));
    enhanced
        .save(&out_path)
        .with_context(|| format!("Failed to save {}", out_path.display()))?;
    println!("Saved enhanced image: {}", out_path.display());
    Ok(())
}

fn run_compare(
    image_path: &Path,
    output: &Path,
    height: u32,
    font: Option<&Path>,
    config: &EnhanceConfig,
) -> Result<()> {
    let img = load_rgb(image_path)?;
    let font = font.map(render::load_font).transpose()?;

    let stages = build_enhancement_pipeline(config)?.run_stages(img)?;
    let strip = render::comparison_strip(&stages, height, font.as_ref());
    strip
        .save(output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    println!("Saved {}", output.display());
    Ok(())
}

fn run_detect(args: &DetectArgs) -> Result<bool> {
    let img = load_rgb(&args.image_path)?;
    let font = args.font.as_deref().map(render::load_font).transpose()?;

    let detectors = HostedDetector::connect(args.hosted_config(&args.primary_model)).and_then(
        |primary| {
            HostedDetector::connect(args.hosted_config(&args.secondary_model))
                .map(|secondary| (primary, secondary))
        },
    );

    let (report, analysed) = match detectors {
        Ok((primary, secondary)) => {
            let analysed = if args.no_enhance {
                img.clone()
            } else {
                enhance(&img, &args.enhance.to_config())?
            };
            let report = analyze(&analysed, &primary, &secondary, &args.merge_config());
            (report, analysed)
        }
        Err(err) => {
            log::error!("{}", err);
            (DetectionReport::failure(&err), img.clone())
        }
    };

    if let Some(report_path) = &args.report {
        let file = std::fs::File::create(report_path)
            .with_context(|| format!("Failed to create {}", report_path.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    if report.is_success() {
        let options = RenderOptions {
            font: font.as_ref(),
            summary: vec![format!(
                "Detected {} objects ({} at summary confidence)",
                report.total_detections, report.text_total
            )],
            ..RenderOptions::default()
        };
        let base = canvas(args.draw_on, &img, &analysed);
        let annotated = render::annotate(base, &report.detections, &options);
        annotated
            .save(&args.output)
            .with_context(|| format!("Failed to save {}", args.output.display()))?;
        println!("Detection result saved as {}", args.output.display());
    }

    Ok(report.is_success())
}

fn print_summary(report: &DetectionReport) {
    if let Some(error) = &report.error {
        println!("{}", report.message);
        log::debug!("{}", error);
        return;
    }

    println!("\n=== Detection Results ===");
    println!("Objects drawn: {}", report.total_detections);
    println!("Objects at summary confidence: {}", report.text_total);
    if !report.secondary_checked {
        println!("Aircraft model skipped (pre-check found nothing)");
    }

    if report.detections.is_empty() {
        println!("No objects detected.");
    } else {
        println!("\nDetected objects:");
        for (i, detection) in report.detections.iter().enumerate() {
            println!("  {}. {}", i + 1, detection.label());
        }
    }
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();
    aerodetect::init_logging(args.verbose);

    match args.command {
        Command::Enhance {
            image_path,
            output,
            debug_out,
            enhance,
        } => run_enhance(&image_path, output, debug_out, &enhance.to_config())?,
        Command::Compare {
            image_path,
            output,
            height,
            font,
            enhance,
        } => run_compare(&image_path, &output, height, font.as_deref(), &enhance.to_config())?,
        Command::Detect(detect) => {
            if !run_detect(&detect)? {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
