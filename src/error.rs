use thiserror::Error;

/// Failures raised by the aggregation core and its input layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    #[error("track {0} is missing from the track index")]
    UnknownTrack(String),

    #[error("unknown category name: {0}")]
    UnknownCategory(String),

    #[error("track references unknown category token {0}")]
    UnknownCategoryToken(String),

    #[error("invalid map boundary: width {width}, height {height}")]
    InvalidBoundary { width: f64, height: f64 },

    #[error("map boundary of {width} x {height} cells exceeds the speed grid limit")]
    GridTooLarge { width: f64, height: f64 },

    #[error("invalid sampling proportion {0}, expected a value in (0, 1]")]
    InvalidProportion(f64),

    #[error("histogram needs at least one bin")]
    InvalidBinCount,

    #[error("speed grid report requires a map boundary")]
    MissingBoundary,
}
