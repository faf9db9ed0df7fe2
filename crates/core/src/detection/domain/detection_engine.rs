use thiserror::Error;

use crate::catalog::domain::model_repository::ModelPaths;
use crate::detection::domain::detection::RawDetection;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to load model: {0}")]
    Load(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Boundary to the native inference runtime.
///
/// Implementations own preprocessing, the network forward pass and
/// non-maximum suppression; callers pass thresholds per call so changing
/// them never requires a reload. Implementations may keep internal
/// buffers between calls, hence `&mut self`.
pub trait DetectionEngine: Send {
    fn detect(
        &mut self,
        frame: &Frame,
        confidence_threshold: f32,
        nms_threshold: f32,
    ) -> Result<Vec<RawDetection>, EngineError>;

    /// Wall-clock duration of the most recent `detect` call.
    fn last_latency_ms(&self) -> f64;

    /// Network input size (width, height) the engine resizes frames to.
    fn input_size(&self) -> (u32, u32);
}

/// Constructs engines from model files on disk.
pub trait EngineLoader: Send {
    fn load(&self, paths: &ModelPaths) -> Result<Box<dyn DetectionEngine>, EngineError>;
}
