use opencv::{core, prelude::*, videoio};
use people_counter::{Config, Detect, Detection, Error, Labels, StopReason};

struct Nothing(Labels);

impl Detect for Nothing {
    fn detect(&mut self, _frame: &core::Mat) -> Result<Vec<Detection>, Error> {
        Ok(vec![])
    }

    fn labels(&self) -> &Labels {
        &self.0
    }
}

fn write_clip(path: &std::path::Path, frames: usize, fps: f64) -> opencv::Result<()> {
    let code = videoio::VideoWriter::fourcc('M', 'J', 'P', 'G')?;
    let mut writer = videoio::VideoWriter::new_with_backend(
        &path.to_string_lossy(),
        videoio::CAP_OPENCV_MJPEG,
        code,
        fps,
        core::Size::new(320, 240),
        true,
    )?;

    for idx in 0..frames {
        let frame = core::Mat::new_rows_cols_with_default(
            240,
            320,
            core::CV_8UC3,
            core::Scalar::all((idx * 10) as f64),
        )?;
        writer.write(&frame)?;
    }

    writer.release()
}

#[test]
fn output_matches_input_geometry_rate_and_length() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input.avi");
    let output = dir.path().join("output.avi");
    write_clip(&input, 15, 20.0).unwrap();

    let cfg = Config {
        display: false,
        fourcc: "MJPG".into(),
        ..Config::default()
    };

    let summary =
        people_counter::process_video(&input, &output, Nothing(Labels::coco()), &cfg).unwrap();
    assert_eq!(summary.frames, 15);
    assert_eq!(summary.stop, StopReason::Exhausted);

    let src = videoio::VideoCapture::from_file(&input.to_string_lossy(), videoio::CAP_ANY).unwrap();
    let dst = videoio::VideoCapture::from_file(&output.to_string_lossy(), videoio::CAP_ANY).unwrap();

    for prop in [
        videoio::CAP_PROP_FRAME_WIDTH,
        videoio::CAP_PROP_FRAME_HEIGHT,
        videoio::CAP_PROP_FPS,
        videoio::CAP_PROP_FRAME_COUNT,
    ] {
        assert_eq!(src.get(prop).unwrap(), dst.get(prop).unwrap());
    }
}
