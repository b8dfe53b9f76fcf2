//! Adapter for a hosted inference endpoint (Roboflow-style detect API).
//!
//! The image is sent as a base64 JPEG body; thresholds travel as integer
//! percentages in the query string. Predictions come back as center/size
//! boxes and are converted to corner form.

use crate::detection::Detector;
use crate::error::DetectionError;
use crate::models::{BoundingBox, Detection};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use image::{DynamicImage, ImageFormat, RgbImage};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://detect.roboflow.com";

/// Where and how to call one hosted model
#[derive(Debug, Clone, PartialEq)]
pub struct HostedModelConfig {
    pub api_url: String,
    /// "project/version", e.g. "airplanes-graua/2"
    pub model_id: String,
    pub api_key: String,
    /// Service-side NMS overlap, 0..=1
    pub overlap: f32,
    pub timeout: Duration,
}

impl HostedModelConfig {
    pub fn new(model_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model_id: model_id.into(),
            api_key: api_key.into(),
            overlap: 0.45,
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HostedResponse {
    #[serde(default)]
    predictions: Vec<HostedPrediction>,
}

#[derive(Debug, Deserialize)]
struct HostedPrediction {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    confidence: f32,
    class: String,
}

impl From<HostedPrediction> for Detection {
    fn from(p: HostedPrediction) -> Self {
        Detection::new(
            p.class,
            p.confidence,
            BoundingBox::from_center_size(p.x, p.y, p.width, p.height),
        )
    }
}

/// Parse a hosted API response body into detections
pub fn parse_predictions(body: &str) -> Result<Vec<Detection>, DetectionError> {
    let response: HostedResponse = serde_json::from_str(body)
        .map_err(|e| DetectionError::Inference(format!("malformed prediction payload: {}", e)))?;
    Ok(response.predictions.into_iter().map(Detection::from).collect())
}

fn percent(value: f32) -> String {
    ((value * 100.0).round() as u32).to_string()
}

/// A model served over HTTP
pub struct HostedDetector {
    agent: ureq::Agent,
    config: HostedModelConfig,
    endpoint: String,
}

impl HostedDetector {
    /// Validate the configuration and prepare the HTTP agent.
    pub fn connect(config: HostedModelConfig) -> Result<Self, DetectionError> {
        if config.api_key.trim().is_empty() {
            return Err(DetectionError::ModelUnavailable(format!(
                "no API key configured for {}",
                config.model_id
            )));
        }

        let parts: Vec<&str> = config.model_id.split('/').collect();
        let valid_id = matches!(parts.as_slice(), [project, version]
            if !project.is_empty() && version.parse::<u32>().is_ok());
        if !valid_id {
            return Err(DetectionError::ModelUnavailable(format!(
                "model id '{}' is not of the form project/version",
                config.model_id
            )));
        }

        if !(0.0..=1.0).contains(&config.overlap) {
            return Err(DetectionError::ModelUnavailable(format!(
                "overlap {} for {} must be within [0, 1]",
                config.overlap, config.model_id
            )));
        }

        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        let endpoint = format!("{}/{}", config.api_url.trim_end_matches('/'), config.model_id);
        log::debug!("hosted model {} at {}", config.model_id, endpoint);

        Ok(Self {
            agent,
            config,
            endpoint,
        })
    }

    pub fn config(&self) -> &HostedModelConfig {
        &self.config
    }

    // The request URL carries the API key, so only the status or transport kind is reported.
    fn request_error(&self, err: ureq::Error) -> DetectionError {
        let reason = match err {
            ureq::Error::Status(code, _) => format!("service returned status {}", code),
            ureq::Error::Transport(transport) => format!("transport error ({})", transport.kind()),
        };
        DetectionError::Inference(format!("{}: {}", self.config.model_id, reason))
    }

    fn encode(image: &RgbImage) -> Result<String, DetectionError> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut buffer, ImageFormat::Jpeg)
            .map_err(|e| DetectionError::Inference(format!("failed to encode image: {}", e)))?;
        Ok(BASE64.encode(buffer.into_inner()))
    }
}

impl Detector for HostedDetector {
    fn name(&self) -> &str {
        &self.config.model_id
    }

    fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        let body = Self::encode(image)?;

        let response = self
            .agent
            .post(&self.endpoint)
            .query("api_key", &self.config.api_key)
            .query("confidence", &percent(confidence))
            .query("overlap", &percent(self.config.overlap))
            .query("format", "json")
            .set("Content-Type", "application/x-www-form-urlencoded")
            .send_string(&body)
            .map_err(|e| self.request_error(e))?;

        let text = response
            .into_string()
            .map_err(|e| DetectionError::Inference(format!("{}: {}", self.config.model_id, e)))?;

        parse_predictions(&text)
    }
}
