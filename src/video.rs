//! Decoding and encoding of video files through OpenCV's `videoio`.

use opencv::{core, prelude::*, videoio};
use std::path::Path;

use crate::error::Error;

/// Geometry and rate shared by a source and the sink it feeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: i32,
    pub height: i32,
    pub fps: f64,
}

impl StreamInfo {
    #[inline]
    pub fn dims(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn size(&self) -> core::Size {
        core::Size::new(self.width, self.height)
    }
}

pub trait FrameSource {
    fn info(&self) -> StreamInfo;

    /// Next decoded frame, `None` once the source is exhausted or unreadable.
    fn read(&mut self) -> Result<Option<core::Mat>, Error>;

    /// Must be safe to call more than once.
    fn release(&mut self) -> Result<(), Error>;
}

pub trait FrameSink {
    fn write(&mut self, frame: &core::Mat) -> Result<(), Error>;

    /// Flushes and closes; must be safe to call more than once.
    fn release(&mut self) -> Result<(), Error>;
}

pub struct VideoReader {
    cap: Option<videoio::VideoCapture>,
    info: StreamInfo,
}

impl VideoReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_string_lossy().into_owned();
        let cap = videoio::VideoCapture::from_file(&path, videoio::CAP_ANY)
            .map_err(|_| Error::SourceUnavailable(path.clone()))?;

        if !cap.is_opened()? {
            return Err(Error::SourceUnavailable(path));
        }

        let info = StreamInfo {
            width: cap.get(videoio::CAP_PROP_FRAME_WIDTH)? as i32,
            height: cap.get(videoio::CAP_PROP_FRAME_HEIGHT)? as i32,
            fps: cap.get(videoio::CAP_PROP_FPS)?,
        };

        log::info!(
            "opened {} ({}x{} @ {} fps)",
            path,
            info.width,
            info.height,
            info.fps
        );

        Ok(Self {
            cap: Some(cap),
            info,
        })
    }
}

impl FrameSource for VideoReader {
    #[inline]
    fn info(&self) -> StreamInfo {
        self.info
    }

    fn read(&mut self) -> Result<Option<core::Mat>, Error> {
        let cap = match self.cap.as_mut() {
            Some(cap) => cap,
            None => return Ok(None),
        };

        let mut frame = core::Mat::default();
        match cap.read(&mut frame) {
            Ok(true) => {}
            Ok(false) => return Ok(None),
            Err(err) => {
                log::warn!("frame read failed, treating as end of stream: {}", err);
                return Ok(None);
            }
        }

        if frame.rows() == 0 || frame.cols() == 0 {
            return Ok(None);
        }

        Ok(Some(frame))
    }

    fn release(&mut self) -> Result<(), Error> {
        if let Some(mut cap) = self.cap.take() {
            cap.release()?;
        }
        Ok(())
    }
}

impl Drop for VideoReader {
    fn drop(&mut self) {
        if let Err(err) = FrameSource::release(self) {
            log::error!("releasing video source: {}", err);
        }
    }
}

pub struct VideoWriter {
    writer: Option<videoio::VideoWriter>,
    info: StreamInfo,
    out_file: String,
    written: u64,
}

impl VideoWriter {
    /// Opens a color sink at `path` with exactly the geometry and rate of `info`.
    pub fn create<P: AsRef<Path>>(path: P, fourcc: [u8; 4], info: StreamInfo) -> Result<Self, Error> {
        let out_file = path.as_ref().to_string_lossy().into_owned();
        let code = videoio::VideoWriter::fourcc(
            fourcc[0] as _,
            fourcc[1] as _,
            fourcc[2] as _,
            fourcc[3] as _,
        )?;

        let writer = videoio::VideoWriter::new(&out_file, code, info.fps, info.size(), true)
            .map_err(|_| Error::SinkUnavailable(out_file.clone()))?;

        if !writer.is_opened()? {
            return Err(Error::SinkUnavailable(out_file));
        }

        log::info!(
            "writing {} ({}x{} @ {} fps, {})",
            out_file,
            info.width,
            info.height,
            info.fps,
            String::from_utf8_lossy(&fourcc)
        );

        Ok(Self {
            writer: Some(writer),
            info,
            out_file,
            written: 0,
        })
    }

    #[inline]
    pub fn info(&self) -> StreamInfo {
        self.info
    }

    #[inline]
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl FrameSink for VideoWriter {
    fn write(&mut self, frame: &core::Mat) -> Result<(), Error> {
        match self.writer.as_mut() {
            Some(writer) => {
                writer.write(frame)?;
                self.written += 1;
                Ok(())
            }
            None => Err(Error::SinkUnavailable(self.out_file.clone())),
        }
    }

    fn release(&mut self) -> Result<(), Error> {
        if let Some(mut writer) = self.writer.take() {
            writer.release()?;
            log::info!("closed {} after {} frames", self.out_file, self.written);
        }
        Ok(())
    }
}

impl Drop for VideoWriter {
    fn drop(&mut self) {
        if let Err(err) = FrameSink::release(self) {
            log::error!("releasing video sink: {}", err);
        }
    }
}
