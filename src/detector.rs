use crate::bbox::BBox;
use crate::config::{Config, InputFit};
use crate::detection::Detection;
use crate::error::Error;
use crate::labels::Labels;

use ndarray::prelude::*;
use opencv::{core, dnn, imgproc, prelude::*};
use std::path::Path;

/// Padding value used by the stock YOLOv8 preprocessing.
const LETTERBOX_GRAY: f64 = 114.0;

/// Anything that turns a frame into detections over a fixed label vocabulary.
pub trait Detect {
    fn detect(&mut self, frame: &core::Mat) -> Result<Vec<Detection>, Error>;
    fn labels(&self) -> &Labels;
}

#[derive(Debug, Clone, PartialEq)]
pub struct YoloDetectorConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub input_size: (i32, i32),
    pub fit: InputFit,
}

impl From<&Config> for YoloDetectorConfig {
    fn from(cfg: &Config) -> Self {
        Self {
            confidence_threshold: cfg.confidence_threshold,
            iou_threshold: cfg.iou_threshold,
            input_size: cfg.input_size,
            fit: cfg.fit,
        }
    }
}

/// YOLOv8-style ONNX network run through OpenCV's DNN module.
///
/// The network must emit a single `[1, 4 + classes, candidates]` tensor where
/// the first four rows are the box center and size in input pixels and the
/// remaining rows are per-class scores.
pub struct YoloDetector {
    net: dnn::Net,
    labels: Labels,
    config: YoloDetectorConfig,
}

impl YoloDetector {
    pub fn new<P: AsRef<Path>>(
        model_src: P,
        labels: Labels,
        config: YoloDetectorConfig,
    ) -> Result<Self, Error> {
        let model_src = model_src.as_ref();
        let net = dnn::read_net_from_onnx(&model_src.to_string_lossy())?;
        log::info!(
            "loaded {} with {} classes, input {:?} ({:?})",
            model_src.display(),
            labels.len(),
            config.input_size,
            config.fit
        );

        Ok(Self {
            net,
            labels,
            config,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, Error> {
        let labels = match &cfg.labels {
            Some(path) => Labels::from_file(path)?,
            None => Labels::coco(),
        };

        Self::new(&cfg.model, labels, cfg.into())
    }

    fn blob(&self, frame: &core::Mat) -> Result<core::Mat, Error> {
        let (in_w, in_h) = self.config.input_size;
        let input = core::Size::new(in_w, in_h);

        let blob = match self.config.fit {
            InputFit::Stretch | InputFit::Crop => dnn::blob_from_image(
                frame,
                1.0 / 255.0,
                input,
                core::Scalar::default(),
                true,
                self.config.fit == InputFit::Crop,
                core::CV_32F,
            )?,
            InputFit::Letterbox => {
                let size = frame.size()?;
                let (scaled, left, top) =
                    letterbox_layout(self.config.input_size, size.width, size.height);

                let mut resized = core::Mat::default();
                imgproc::resize(frame, &mut resized, scaled, 0.0, 0.0, imgproc::INTER_LINEAR)?;

                let mut padded = core::Mat::default();
                core::copy_make_border(
                    &resized,
                    &mut padded,
                    top,
                    in_h - scaled.height - top,
                    left,
                    in_w - scaled.width - left,
                    core::BORDER_CONSTANT,
                    core::Scalar::all(LETTERBOX_GRAY),
                )?;

                dnn::blob_from_image(
                    &padded,
                    1.0 / 255.0,
                    input,
                    core::Scalar::default(),
                    true,
                    false,
                    core::CV_32F,
                )?
            }
        };

        Ok(blob)
    }
}

impl Detect for YoloDetector {
    fn detect(&mut self, frame: &core::Mat) -> Result<Vec<Detection>, Error> {
        let blob = self.blob(frame)?;

        self.net.set_input(&blob, "", 1.0, core::Scalar::default())?;
        let output = self.net.forward_single("")?;

        let view = output_table(&output, self.labels.len())?;
        let size = frame.size()?;

        Ok(postprocess(view, &self.config, (size.width, size.height)))
    }

    #[inline]
    fn labels(&self) -> &Labels {
        &self.labels
    }
}

/// Views a raw network output as a `[4 + nclasses, candidates]` table.
/// Any other shape is malformed.
pub fn output_table(output: &core::Mat, nclasses: usize) -> Result<ArrayView2<'_, f32>, Error> {
    let attrs = 4 + nclasses;
    let size = output.mat_size();
    let dims: &[i32] = &size;

    match *dims {
        [1, rows, candidates] if rows as usize == attrs && candidates > 0 => {
            let data = output.data_typed::<f32>()?;
            Ok(ArrayView2::from_shape((attrs, candidates as usize), data)?)
        }
        _ => Err(Error::MalformedOutput(format!(
            "expected output [1, {}, N], got {:?}",
            attrs, dims
        ))),
    }
}

/// Scaled frame size inside the input plus the left and top padding.
fn letterbox_layout(
    (in_w, in_h): (i32, i32),
    frame_width: i32,
    frame_height: i32,
) -> (core::Size, i32, i32) {
    let (fw, fh) = (frame_width as f32, frame_height as f32);
    let r = (in_w as f32 / fw).min(in_h as f32 / fh);

    let w = ((fw * r).round() as i32).clamp(1, in_w);
    let h = ((fh * r).round() as i32).clamp(1, in_h);

    (core::Size::new(w, h), (in_w - w) / 2, (in_h - h) / 2)
}

/// Region of the frame that the network input covers, as (x, y, w, h).
/// Letterboxing yields a window larger than the frame.
fn input_window(
    config: &YoloDetectorConfig,
    frame_width: i32,
    frame_height: i32,
) -> (f32, f32, f32, f32) {
    let (in_w, in_h) = config.input_size;
    let (fw, fh) = (frame_width as f32, frame_height as f32);

    match config.fit {
        InputFit::Stretch => (0.0, 0.0, fw, fh),
        InputFit::Crop => {
            let in_a = in_h as f32 / in_w as f32;
            let frame_a = fh / fw;

            if in_a > frame_a {
                let w = fh / in_a;
                ((fw - w) / 2.0, 0.0, w, fh)
            } else {
                let h = fw * in_a;
                (0.0, (fh - h) / 2.0, fw, h)
            }
        }
        InputFit::Letterbox => {
            let (scaled, left, top) = letterbox_layout(config.input_size, frame_width, frame_height);
            let sx = scaled.width as f32 / fw;
            let sy = scaled.height as f32 / fh;

            (
                -(left as f32) / sx,
                -(top as f32) / sy,
                in_w as f32 / sx,
                in_h as f32 / sy,
            )
        }
    }
}

/// Turns raw `[4 + classes, candidates]` network rows into frame-space
/// detections: best class per candidate, confidence cut, per-class NMS.
pub fn postprocess(
    view: ArrayView2<'_, f32>,
    config: &YoloDetectorConfig,
    (frame_width, frame_height): (i32, i32),
) -> Vec<Detection> {
    let nclasses = view.nrows().saturating_sub(4);
    let (in_w, in_h) = config.input_size;
    let (ox, oy, ow, oh) = input_window(config, frame_width, frame_height);
    let (sx, sy) = (ow / in_w as f32, oh / in_h as f32);

    // candidates grouped by their best class
    let mut grouped: Vec<Vec<Detection>> = (0..nclasses).map(|_| vec![]).collect();

    for candidate in view.axis_iter(Axis(1)) {
        let mut class_index = -1;
        let mut confidence = 0.0;

        for (idx, val) in candidate.iter().skip(4).copied().enumerate() {
            if val > confidence {
                class_index = idx as i32;
                confidence = val;
            }
        }

        if class_index < 0 || confidence <= config.confidence_threshold {
            continue;
        }

        let bbox = BBox::xywh(
            ox + candidate[0] * sx,
            oy + candidate[1] * sy,
            candidate[2] * sx,
            candidate[3] * sy,
        )
        .as_ltrb()
        .clamp(frame_width as f32, frame_height as f32);

        grouped[class_index as usize].push(Detection::new(bbox, confidence, class_index));
    }

    let mut results = Vec::new();
    for dets in grouped.into_iter().filter(|d| !d.is_empty()) {
        results.extend(non_maximum_supression(dets, config.iou_threshold));
    }

    results
}

fn non_maximum_supression(mut dets: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    dets.sort_unstable_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut retain = vec![true; dets.len()];
    for idx in 0..dets.len() {
        if !retain[idx] {
            continue;
        }

        for other in idx + 1..dets.len() {
            if retain[other] && dets[idx].iou(&dets[other]) > iou_threshold {
                retain[other] = false;
            }
        }
    }

    dets.into_iter()
        .zip(retain)
        .filter_map(|(det, keep)| keep.then_some(det))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a `[4 + nclasses, candidates]` output from (cx, cy, w, h, class, score).
    fn raw_output(nclasses: usize, cands: &[(f32, f32, f32, f32, usize, f32)]) -> Array2<f32> {
        let mut out = Array2::zeros((4 + nclasses, cands.len()));
        for (col, &(cx, cy, w, h, class, score)) in cands.iter().enumerate() {
            out[[0, col]] = cx;
            out[[1, col]] = cy;
            out[[2, col]] = w;
            out[[3, col]] = h;
            out[[4 + class, col]] = score;
        }
        out
    }

    fn config() -> YoloDetectorConfig {
        YoloDetectorConfig {
            confidence_threshold: 0.25,
            iou_threshold: 0.45,
            input_size: (640, 640),
            fit: InputFit::Stretch,
        }
    }

    #[test]
    fn low_confidence_candidates_are_dropped() {
        let out = raw_output(
            3,
            &[
                (100.0, 100.0, 20.0, 40.0, 0, 0.9),
                (300.0, 300.0, 20.0, 40.0, 0, 0.1),
            ],
        );

        let dets = postprocess(out.view(), &config(), (640, 640));

        assert_eq!(dets.len(), 1);
        assert_eq!(dets[0].class, 0);
        assert_eq!(dets[0].bbox.as_slice(), &[90.0, 80.0, 110.0, 120.0]);
    }

    #[test]
    fn overlapping_boxes_of_same_class_are_suppressed() {
        let out = raw_output(
            3,
            &[
                (100.0, 100.0, 50.0, 50.0, 0, 0.6),
                (102.0, 101.0, 50.0, 50.0, 0, 0.8),
                (400.0, 400.0, 50.0, 50.0, 0, 0.7),
            ],
        );

        let mut dets = postprocess(out.view(), &config(), (640, 640));
        dets.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        assert_eq!(dets.len(), 2);
        assert_eq!(dets[0].confidence, 0.8);
        assert_eq!(dets[1].confidence, 0.7);
    }

    #[test]
    fn overlapping_boxes_of_different_classes_survive() {
        let out = raw_output(
            3,
            &[
                (100.0, 100.0, 50.0, 50.0, 0, 0.8),
                (100.0, 100.0, 50.0, 50.0, 2, 0.7),
            ],
        );

        let dets = postprocess(out.view(), &config(), (640, 640));

        assert_eq!(dets.len(), 2);
        assert!(dets.iter().any(|d| d.class == 2));
    }

    #[test]
    fn boxes_are_scaled_to_frame() {
        let out = raw_output(1, &[(320.0, 320.0, 64.0, 64.0, 0, 0.9)]);

        let dets = postprocess(out.view(), &config(), (1280, 720));

        // x scale 2.0, y scale 1.125
        assert_eq!(dets[0].bbox.as_slice(), &[576.0, 324.0, 704.0, 396.0]);
    }

    #[test]
    fn cropped_input_maps_into_centered_window() {
        let cfg = YoloDetectorConfig {
            fit: InputFit::Crop,
            ..config()
        };
        let out = raw_output(1, &[(0.0, 320.0, 0.0, 0.0, 0, 0.9)]);

        let dets = postprocess(out.view(), &cfg, (1280, 720));

        // square input covers the middle 720x720 of the frame
        assert_eq!(dets[0].bbox.left(), 280.0);
        assert_eq!(dets[0].bbox.top(), 360.0);
    }

    #[test]
    fn boxes_are_clamped_to_frame() {
        let out = raw_output(1, &[(5.0, 5.0, 40.0, 40.0, 0, 0.9)]);

        let dets = postprocess(out.view(), &config(), (640, 640));

        assert_eq!(dets[0].bbox.as_slice(), &[0.0, 0.0, 25.0, 25.0]);
    }

    #[test]
    fn letterboxed_input_maps_back_through_padding() {
        let cfg = YoloDetectorConfig {
            fit: InputFit::Letterbox,
            ..config()
        };
        // 1280x720 becomes 640x360 with 140 rows of padding on top
        let out = raw_output(1, &[(320.0, 320.0, 64.0, 64.0, 0, 0.9)]);

        let dets = postprocess(out.view(), &cfg, (1280, 720));

        assert_eq!(dets[0].bbox.as_slice(), &[576.0, 296.0, 704.0, 424.0]);
    }

    #[test]
    fn letterbox_layout_centers_frame() {
        let (size, left, top) = letterbox_layout((640, 640), 1280, 720);
        assert_eq!((size.width, size.height, left, top), (640, 360, 0, 140));

        let (size, left, top) = letterbox_layout((640, 640), 480, 640);
        assert_eq!((size.width, size.height, left, top), (480, 640, 80, 0));
    }

    fn output_mat(dims: &[i32]) -> core::Mat {
        core::Mat::new_nd_with_default(dims, core::CV_32F, core::Scalar::all(0.0)).unwrap()
    }

    #[test]
    fn output_with_expected_shape_is_viewed_as_table() {
        let out = output_mat(&[1, 7, 10]);

        let view = output_table(&out, 3).unwrap();

        assert_eq!(view.dim(), (7, 10));
    }

    #[test]
    fn output_with_other_class_count_is_malformed() {
        // 5 * 8400 also splits into rows of 84, the shape must still match
        let out = output_mat(&[1, 5, 8400]);

        assert!(matches!(
            output_table(&out, 80),
            Err(Error::MalformedOutput(_))
        ));
    }

    #[test]
    fn output_without_batch_axis_is_malformed() {
        let out = output_mat(&[84, 500]);

        assert!(matches!(
            output_table(&out, 80),
            Err(Error::MalformedOutput(_))
        ));
    }
}
