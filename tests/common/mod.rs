#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from aerodetect for tests
pub use aerodetect::{
    BoundingBox, ClassTally, Detection, DetectionError, DetectionReport, Detector, EnhanceConfig,
    MergeConfig, MergeOutcome,
};
