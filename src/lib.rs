pub mod annotator;
pub mod bbox;
pub mod config;
pub mod detection;
pub mod detector;
pub mod display;
pub mod error;
pub mod labels;
pub mod pipeline;
pub mod prompt;
pub mod video;

pub use annotator::{annotate, Style};
pub use config::Config;
pub use detection::Detection;
pub use detector::{Detect, YoloDetector, YoloDetectorConfig};
pub use error::Error;
pub use labels::Labels;
pub use pipeline::{process_video, Pipeline, RunSummary, StopReason};
pub use video::{FrameSink, FrameSource, StreamInfo};
