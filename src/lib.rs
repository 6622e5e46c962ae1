pub mod analysis;
pub mod config;
pub mod error;
pub mod exercise;
pub mod logging;
pub mod pipeline;
pub mod pose;
pub mod render;
pub mod video;

pub use error::{AnalysisError, CompressionError};
pub use pipeline::{AnalysisOutcome, AnalysisRequest, VideoAnalysisResult, VideoAnalyzer};
