//! Adapter for detectors that run local weight files.
//!
//! The runtime itself stays behind [`LocalModel`]; this module only turns its
//! class ids into names and its raw boxes into [`Detection`]s.

use crate::detection::Detector;
use crate::error::DetectionError;
use crate::models::{BoundingBox, Detection};
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::Path;

/// One box as produced by a local model, before names are attached
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// A loaded set of weights
pub trait LocalModel {
    fn infer(&self, image: &RgbImage, confidence: f32) -> Result<Vec<RawDetection>, DetectionError>;
}

/// Class id -> name lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassNames {
    names: Vec<String>,
}

impl ClassNames {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a names file: one class per line, blank lines ignored
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty()),
        )
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read class names from {}", path.display()))?;
        Ok(Self::parse(&contents))
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    /// Name for an id; ids outside the table get a synthetic `class_<id>` label
    pub fn resolve(&self, class_id: usize) -> String {
        match self.get(class_id) {
            Some(name) => name.to_string(),
            None => format!("class_{}", class_id),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Wrap a [`LocalModel`] and its class table as a [`Detector`]
pub struct LocalDetector<M> {
    name: String,
    model: M,
    classes: ClassNames,
}

impl<M: LocalModel> LocalDetector<M> {
    pub fn new(name: impl Into<String>, model: M, classes: ClassNames) -> Self {
        Self {
            name: name.into(),
            model,
            classes,
        }
    }

    pub fn classes(&self) -> &ClassNames {
        &self.classes
    }
}

impl<M: LocalModel> Detector for LocalDetector<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn detect(&self, image: &RgbImage, confidence: f32) -> Result<Vec<Detection>, DetectionError> {
        let raw = self.model.infer(image, confidence)?;
        Ok(raw
            .into_iter()
            .map(|r| {
                if self.classes.get(r.class_id).is_none() {
                    log::warn!("{}: class id {} has no name", self.name, r.class_id);
                }
                Detection::new(self.classes.resolve(r.class_id), r.confidence, r.bbox)
            })
            .collect())
    }
}
