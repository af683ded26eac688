use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::image::{Image, Pixel};
use crate::image_pipeline::geometry::flip::FlipCode;

/// Crop rectangle in pixel coordinates; `right` and `bottom` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CropRect {
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
}

impl CropRect {
    pub fn new(left: usize, top: usize, right: usize, bottom: usize) -> Self {
        Self { left, top, right, bottom }
    }

    /// The whole of a `width`×`height` image.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> usize {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> usize {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Orders the edges and clamps them to a `width`×`height` image. An empty or
    /// degenerate result becomes the full image.
    pub fn normalized(self, width: usize, height: usize) -> Self {
        let (left, right) = (self.left.min(self.right), self.left.max(self.right));
        let (top, bottom) = (self.top.min(self.bottom), self.top.max(self.bottom));
        let rect = Self::new(
            left.min(width),
            top.min(height),
            right.min(width),
            bottom.min(height),
        );
        if rect.is_empty() { Self::full(width, height) } else { rect }
    }

    /// The same region after `code` is applied to a `width`×`height` image.
    pub fn flipped(self, code: FlipCode, width: usize, height: usize) -> Self {
        let Self { mut left, mut top, mut right, mut bottom } = self;
        if code.code() & 1 != 0 {
            (left, right) = (width.saturating_sub(right), width.saturating_sub(left));
        }
        if code.code() & 2 != 0 {
            (top, bottom) = (height.saturating_sub(bottom), height.saturating_sub(top));
        }
        if code.swaps_axes() {
            (left, top) = (top, left);
            (right, bottom) = (bottom, right);
        }
        Self { left, top, right, bottom }
    }

    /// Maps a rectangle from a `from` sized image onto a `to` sized one, keeping it
    /// inside the target.
    pub fn rescaled(self, from: (usize, usize), to: (usize, usize)) -> Self {
        if from == to || from.0 == 0 || from.1 == 0 {
            return self.normalized(to.0, to.1);
        }
        let sx = to.0 as f64 / from.0 as f64;
        let sy = to.1 as f64 / from.1 as f64;
        Self::new(
            (self.left as f64 * sx).floor() as usize,
            (self.top as f64 * sy).floor() as usize,
            (self.right as f64 * sx).ceil() as usize,
            (self.bottom as f64 * sy).ceil() as usize,
        )
        .normalized(to.0, to.1)
    }
}

/// Copies the part of `image` inside `rect`, clamped to the image.
pub fn crop<P: Pixel>(image: &Image<P>, rect: CropRect) -> Image<P> {
    let rect = rect.normalized(image.width, image.height);
    if rect == CropRect::full(image.width, image.height) {
        return image.clone();
    }
    let mut pixels = Vec::with_capacity(rect.width() * rect.height());
    for y in rect.top..rect.bottom {
        pixels.extend_from_slice(&image.row(y)[rect.left..rect.right]);
    }
    Image::from_pixels(rect.width(), rect.height(), image.colors, pixels)
}
