use opencv::core;
use serde_derive::Serialize;
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// X-y-width-height format, contains coordinates of the center of bbox and width-height
#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct Xywh;
impl BBoxFormat for Xywh {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Debug, Copy, Clone, PartialEq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct BBox<F: BBoxFormat>([f32; 4], #[serde(skip)] PhantomData<F>);

impl<F: BBoxFormat> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[f32; 4] {
        &self.0
    }
}

impl BBox<Xywh> {
    #[inline]
    pub fn xywh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        BBox([cx, cy, w, h], PhantomData)
    }

    #[inline]
    pub fn as_ltrb(&self) -> BBox<Ltrb> {
        self.into()
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        BBox([left, top, right, bottom], PhantomData)
    }

    #[inline(always)]
    pub fn left(&self) -> f32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> f32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> f32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> f32 {
        self.0[3]
    }

    #[inline]
    pub fn area(&self) -> f32 {
        (self.right() - self.left()).max(0.0) * (self.bottom() - self.top()).max(0.0)
    }

    pub fn iou(&self, other: &BBox<Ltrb>) -> f32 {
        let i_area = BBox::ltrb(
            self.left().max(other.left()),
            self.top().max(other.top()),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
        .area();

        if i_area <= 0.0 {
            return 0.0;
        }

        i_area / (self.area() + other.area() - i_area)
    }

    /// Clips the box to a `width` x `height` frame.
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        BBox::ltrb(
            self.left().clamp(0.0, width),
            self.top().clamp(0.0, height),
            self.right().clamp(0.0, width),
            self.bottom().clamp(0.0, height),
        )
    }

    /// Integer pixel rectangle for drawing.
    pub fn to_rect(&self) -> core::Rect {
        let (x1, y1) = (self.left().round() as i32, self.top().round() as i32);
        let (x2, y2) = (self.right().round() as i32, self.bottom().round() as i32);

        core::Rect::new(x1, y1, x2 - x1, y2 - y1)
    }
}

impl<'a> From<&'a BBox<Xywh>> for BBox<Ltrb> {
    #[inline]
    fn from(v: &'a BBox<Xywh>) -> Self {
        let (w2, h2) = (v.0[2] / 2.0, v.0[3] / 2.0);

        Self(
            [v.0[0] - w2, v.0[1] - h2, v.0[0] + w2, v.0[1] + h2],
            PhantomData,
        )
    }
}
