pub mod frame_scheduler;
pub mod pipeline_stats;
pub mod session_controller;
