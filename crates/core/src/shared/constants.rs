use std::time::Duration;

use uuid::Uuid;

/// Reserved identity of the bundled model. Imported models always receive
/// a random v4 id, which can never collide with the nil UUID.
pub const BUILT_IN_MODEL_ID: Uuid = Uuid::nil();

pub const BUILT_IN_MODEL_NAME: &str = "yolov4-tiny-coco";
pub const BUILT_IN_INPUT_SIZE: u32 = 416;

pub const WEIGHTS_FILE_NAME: &str = "yolov4-tiny.weights";
pub const CONFIG_FILE_NAME: &str = "yolov4-tiny.cfg";
pub const NAMES_FILE_NAME: &str = "coco.names";

pub const WEIGHTS_URL: &str =
    "https://github.com/AlexeyAB/darknet/releases/download/darknet_yolo_v4_pre/yolov4-tiny.weights";
pub const CONFIG_URL: &str =
    "https://raw.githubusercontent.com/AlexeyAB/darknet/master/cfg/yolov4-tiny.cfg";
pub const NAMES_URL: &str =
    "https://raw.githubusercontent.com/AlexeyAB/darknet/master/data/coco.names";

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

/// Window over which frame counters are folded into one stats event.
pub const STATS_INTERVAL: Duration = Duration::from_secs(1);
