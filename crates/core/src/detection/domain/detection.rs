use crate::shared::bounding_box::BoundingBox;

/// Unlabeled network output, straight from the engine.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawDetection {
    pub class_id: usize,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

/// One detected object, labeled for presentation.
///
/// Coordinates stay in source-frame pixels until a viewport transform
/// maps them for display.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub class_name: String,
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl Detection {
    /// Overlay caption, e.g. `person 87%`.
    pub fn confidence_label(&self) -> String {
        format!("{} {:.0}%", self.class_name, self.confidence * 100.0)
    }
}
