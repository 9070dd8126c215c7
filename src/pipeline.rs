use opencv::prelude::*;
use std::path::Path;

use crate::annotator::{annotate, Style};
use crate::config::Config;
use crate::detector::Detect;
use crate::display::{self, Display};
use crate::error::Error;
use crate::video::{FrameSink, FrameSource, VideoReader, VideoWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// source ran out of readable frames
    Exhausted,
    UserQuit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub frames: u64,
    pub last_count: usize,
    pub peak_count: usize,
    pub stop: StopReason,
}

/// Sequential read -> detect -> draw -> write -> show loop.
pub struct Pipeline<D> {
    detector: D,
    style: Style,
    progress_interval: u64,
}

impl<D: Detect> Pipeline<D> {
    pub fn new(detector: D) -> Self {
        Self {
            detector,
            style: Style::default(),
            progress_interval: 100,
        }
    }

    /// Logs progress every `interval` frames, 0 disables.
    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Streams `source` into `sink` and `display`. All three are released on
    /// every exit path, the first error wins.
    pub fn run<S, W, V>(
        &mut self,
        source: &mut S,
        sink: &mut W,
        display: &mut V,
    ) -> Result<RunSummary, Error>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
        V: Display + ?Sized,
    {
        let streamed = self.stream(source, sink, display);

        let closed = [source.release(), sink.release(), display.close()]
            .into_iter()
            .collect::<Result<Vec<()>, Error>>();

        let summary = streamed?;
        closed?;

        log::info!(
            "stopped ({:?}) after {} frames, peak people count {}",
            summary.stop,
            summary.frames,
            summary.peak_count
        );

        Ok(summary)
    }

    fn stream<S, W, V>(
        &mut self,
        source: &mut S,
        sink: &mut W,
        display: &mut V,
    ) -> Result<RunSummary, Error>
    where
        S: FrameSource + ?Sized,
        W: FrameSink + ?Sized,
        V: Display + ?Sized,
    {
        let expected = source.info().dims();
        let mut summary = RunSummary {
            frames: 0,
            last_count: 0,
            peak_count: 0,
            stop: StopReason::Exhausted,
        };

        while let Some(mut frame) = source.read()? {
            let got = (frame.cols(), frame.rows());
            if got != expected {
                return Err(Error::GeometryMismatch { expected, got });
            }

            let count = annotate(&mut frame, &mut self.detector, &self.style)?;
            sink.write(&frame)?;
            display.show(&frame)?;

            summary.frames += 1;
            summary.last_count = count;
            summary.peak_count = summary.peak_count.max(count);
            log::debug!("frame {}: {} people", summary.frames, count);

            if self.progress_interval > 0 && summary.frames % self.progress_interval == 0 {
                log::info!("processed {} frames", summary.frames);
            }

            if display.quit_requested()? {
                summary.stop = StopReason::UserQuit;
                break;
            }
        }

        Ok(summary)
    }
}

/// Opens `input`, mirrors its geometry and rate into `output`, and runs the
/// pipeline with the display configured in `cfg`. Nothing is created at
/// `output` when `input` cannot be opened.
pub fn process_video<D, P, Q>(
    input: P,
    output: Q,
    detector: D,
    cfg: &Config,
) -> Result<RunSummary, Error>
where
    D: Detect,
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let fourcc = cfg.fourcc_code()?;
    let mut source = VideoReader::open(input)?;
    let mut sink = VideoWriter::create(output, fourcc, source.info())?;
    let mut display = display::open(cfg.display)?;

    let summary = Pipeline::new(detector)
        .with_progress_interval(cfg.progress_interval)
        .run(&mut source, &mut sink, &mut display)?;

    if sink.written() != summary.frames {
        log::warn!(
            "sink holds {} frames, {} were processed",
            sink.written(),
            summary.frames
        );
    }

    Ok(summary)
}
