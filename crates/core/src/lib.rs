//! Live object detection sessions: a local model catalog, an inference
//! seam, frame scheduling with backpressure, and overlay geometry.

pub mod catalog;
pub mod detection;
pub mod pipeline;
pub mod shared;
