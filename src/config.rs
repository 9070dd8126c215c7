use serde_derive::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::Error;

/// Looked up in the working directory when no explicit path is given.
pub const CONFIG_FILE: &str = "people-counter.json";

/// How a frame is fitted into the fixed network input.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InputFit {
    /// scale each axis independently
    Stretch,
    /// keep aspect ratio, cut the overhanging sides
    Crop,
    /// keep aspect ratio, pad the short side with gray
    Letterbox,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// ONNX weights of a YOLOv8-style detector
    pub model: PathBuf,
    /// `.names` file; the bundled COCO vocabulary when unset
    pub labels: Option<PathBuf>,
    pub input_size: (i32, i32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub fit: InputFit,
    /// live preview window and quit key; off for headless runs
    pub display: bool,
    pub progress_interval: u64,
    pub fourcc: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: PathBuf::from("yolov8n.onnx"),
            labels: None,
            input_size: (640, 640),
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            fit: InputFit::Letterbox,
            display: true,
            progress_interval: 100,
            fourcc: String::from("mp4v"),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let cfg: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        cfg.fourcc_code()?;

        Ok(cfg)
    }

    /// Reads `path` when it exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();

        if path.exists() {
            log::info!("loading config from {}", path.display());
            Self::from_file(path)
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Four-character codec code for the output sink; shorter codes are space padded.
    /// Anything but 1 to 4 ASCII alphanumerics or spaces is rejected.
    pub fn fourcc_code(&self) -> Result<[u8; 4], Error> {
        let bytes = self.fourcc.as_bytes();
        let valid = (1..=4).contains(&bytes.len())
            && bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b' ');

        if !valid {
            return Err(Error::InvalidFourcc(self.fourcc.clone()));
        }

        let mut code = [b' '; 4];
        code[..bytes.len()].copy_from_slice(bytes);
        Ok(code)
    }
}
