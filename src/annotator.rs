use opencv::{core, imgproc, prelude::*};

use crate::detection::Detection;
use crate::detector::Detect;
use crate::error::Error;
use crate::labels::{Labels, PERSON};

/// Colors are BGR, the channel order of decoded frames.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    pub box_color: core::Scalar,
    pub thickness: i32,
    pub label_scale: f64,
    /// distance of the label baseline above the box
    pub label_lift: i32,
    pub count_color: core::Scalar,
    pub count_scale: f64,
    pub count_origin: core::Point,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            box_color: core::Scalar::new(0.0, 255.0, 0.0, 0.0),
            thickness: 2,
            label_scale: 0.9,
            label_lift: 10,
            count_color: core::Scalar::new(0.0, 0.0, 255.0, 0.0),
            count_scale: 1.0,
            count_origin: core::Point::new(10, 30),
        }
    }
}

/// Runs `detector` on `frame` and burns boxes, labels and the person count
/// into it. Returns the number of "person" detections in this frame alone.
pub fn annotate<D: Detect + ?Sized>(
    frame: &mut core::Mat,
    detector: &mut D,
    style: &Style,
) -> Result<usize, Error> {
    let detections = detector.detect(frame)?;
    if log::log_enabled!(log::Level::Trace) {
        if let Ok(json) = serde_json::to_string(&detections) {
            log::trace!("detections: {}", json);
        }
    }

    annotate_detections(frame, &detections, detector.labels(), style)
}

pub fn annotate_detections(
    frame: &mut core::Mat,
    detections: &[Detection],
    labels: &Labels,
    style: &Style,
) -> Result<usize, Error> {
    let mut person_count = 0;

    for det in detections {
        let label = labels.name(det.class)?;
        draw_detection(frame, det, label, style)?;

        if label == PERSON {
            person_count += 1;
        }
    }

    draw_count(frame, person_count, style)?;

    Ok(person_count)
}

pub fn people_count_text(count: usize) -> String {
    format!("People Count: {}", count)
}

fn draw_detection(
    frame: &mut core::Mat,
    det: &Detection,
    label: &str,
    style: &Style,
) -> opencv::Result<()> {
    let rect = det.bbox.to_rect();

    imgproc::rectangle(
        frame,
        rect,
        style.box_color,
        style.thickness,
        imgproc::LINE_8,
        0,
    )?;

    imgproc::put_text(
        frame,
        label,
        core::Point::new(rect.x, rect.y - style.label_lift),
        imgproc::FONT_HERSHEY_SIMPLEX,
        style.label_scale,
        style.box_color,
        style.thickness,
        imgproc::LINE_8,
        false,
    )
}

fn draw_count(frame: &mut core::Mat, count: usize, style: &Style) -> opencv::Result<()> {
    imgproc::put_text(
        frame,
        &people_count_text(count),
        style.count_origin,
        imgproc::FONT_HERSHEY_SIMPLEX,
        style.count_scale,
        style.count_color,
        style.thickness,
        imgproc::LINE_8,
        false,
    )
}
