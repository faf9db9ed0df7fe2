use crate::catalog::domain::model_record::ModelRecord;
use crate::catalog::domain::model_repository::ModelPaths;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_engine::{DetectionEngine, EngineError, EngineLoader};
use crate::shared::frame::Frame;

/// An engine paired with the record it was loaded from.
///
/// The pair is immutable: switching models means constructing a fresh
/// adapter, so an engine can never drift out of step with the record
/// whose class names label its output.
pub struct InferenceAdapter {
    engine: Box<dyn DetectionEngine>,
    record: ModelRecord,
}

impl InferenceAdapter {
    pub fn load(
        loader: &dyn EngineLoader,
        record: ModelRecord,
        paths: &ModelPaths,
    ) -> Result<Self, EngineError> {
        let engine = loader.load(paths)?;
        Ok(Self { engine, record })
    }

    pub fn record(&self) -> &ModelRecord {
        &self.record
    }

    pub fn model_name(&self) -> &str {
        self.record.display_name()
    }

    pub fn class_names(&self) -> &[String] {
        &self.record.class_names
    }

    /// Input size the record declares, which may differ from what the
    /// engine negotiated.
    pub fn input_size(&self) -> (u32, u32) {
        (self.record.input_width, self.record.input_height)
    }

    pub fn last_latency_ms(&self) -> f64 {
        self.engine.last_latency_ms()
    }

    /// Runs one frame through the engine and labels the output.
    ///
    /// An engine failure is logged and reported as zero detections; one
    /// bad frame must not take the session down.
    pub fn detect(
        &mut self,
        frame: &Frame,
        confidence_threshold: f32,
        nms_threshold: f32,
    ) -> Vec<Detection> {
        let raws = match self
            .engine
            .detect(frame, confidence_threshold, nms_threshold)
        {
            Ok(raws) => raws,
            Err(e) => {
                log::warn!("inference failed on frame {}: {e}", frame.index());
                return Vec::new();
            }
        };

        raws.into_iter()
            .map(|raw| Detection {
                class_id: raw.class_id,
                class_name: self
                    .record
                    .class_names
                    .get(raw.class_id)
                    .map(String::as_str)
                    .unwrap_or("unknown")
                    .to_string(),
                confidence: raw.confidence,
                bounding_box: raw.bounding_box,
            })
            .collect()
    }
}
