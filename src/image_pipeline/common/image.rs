//! Interleaved pixel buffers shared by every pipeline stage.

/// A fixed-size pixel whose channels can be read and written as 16-bit values.
///
/// 8-bit pixels store the low byte; callers keep values in range.
pub trait Pixel: Copy + Default + PartialEq + Send + Sync + 'static {
    const CHANNELS: usize;

    fn channel(&self, c: usize) -> u16;
    fn set_channel(&mut self, c: usize, value: u16);
}

impl Pixel for [u16; 4] {
    const CHANNELS: usize = 4;

    #[inline(always)]
    fn channel(&self, c: usize) -> u16 {
        self[c]
    }

    #[inline(always)]
    fn set_channel(&mut self, c: usize, value: u16) {
        self[c] = value;
    }
}

impl Pixel for [u16; 3] {
    const CHANNELS: usize = 3;

    #[inline(always)]
    fn channel(&self, c: usize) -> u16 {
        self[c]
    }

    #[inline(always)]
    fn set_channel(&mut self, c: usize, value: u16) {
        self[c] = value;
    }
}

impl Pixel for [u8; 3] {
    const CHANNELS: usize = 3;

    #[inline(always)]
    fn channel(&self, c: usize) -> u16 {
        self[c] as u16
    }

    #[inline(always)]
    fn set_channel(&mut self, c: usize, value: u16) {
        self[c] = value.min(0xFF) as u8;
    }
}

/// Row-major image of interleaved pixels.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image<P> {
    pub width: usize,
    pub height: usize,
    /// Number of meaningful channels (3 for RGB, 4 for RGBG/CMYG sensors).
    pub colors: usize,
    pub pixels: Vec<P>,
}

/// 16-bit, four slot image: raw RGBG cells or demosaiced RGB with a spare slot.
pub type Image16 = Image<[u16; 4]>;
/// 8-bit RGB display image.
pub type Rgb8Image = Image<[u8; 3]>;
/// 16-bit RGB output image.
pub type Rgb16Image = Image<[u16; 3]>;

impl<P: Pixel> Image<P> {
    pub fn new(width: usize, height: usize, colors: usize) -> Self {
        Self {
            width,
            height,
            colors,
            pixels: vec![P::default(); width * height],
        }
    }

    pub fn from_pixels(width: usize, height: usize, colors: usize, pixels: Vec<P>) -> Self {
        assert_eq!(
            pixels.len(),
            width * height,
            "pixel count {} doesn't match {}x{}",
            pixels.len(),
            width,
            height
        );
        Self {
            width,
            height,
            colors,
            pixels,
        }
    }

    #[inline(always)]
    pub fn index(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    #[inline(always)]
    pub fn pixel(&self, x: usize, y: usize) -> &P {
        &self.pixels[y * self.width + x]
    }

    #[inline(always)]
    pub fn pixel_mut(&mut self, x: usize, y: usize) -> &mut P {
        let idx = y * self.width + x;
        &mut self.pixels[idx]
    }

    pub fn row(&self, y: usize) -> &[P] {
        &self.pixels[y * self.width..(y + 1) * self.width]
    }

    pub fn row_mut(&mut self, y: usize) -> &mut [P] {
        let w = self.width;
        &mut self.pixels[y * w..(y + 1) * w]
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Bytes per channel of the stored samples.
    pub fn bytes_per_channel(&self) -> usize {
        std::mem::size_of::<P>() / P::CHANNELS
    }

    /// Bytes between the starts of two consecutive rows.
    pub fn rowstride(&self) -> usize {
        self.width * std::mem::size_of::<P>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_properties() {
        let img = Image16::new(5, 3, 3);
        assert_eq!(img.pixels.len(), 15);
        assert_eq!(img.bytes_per_channel(), 2);
        assert_eq!(img.rowstride(), 40);

        let rgb = Rgb8Image::new(5, 3, 3);
        assert_eq!(rgb.bytes_per_channel(), 1);
        assert_eq!(rgb.rowstride(), 15);
    }

    #[test]
    fn test_row_access() {
        let mut img = Image16::new(3, 2, 3);
        img.row_mut(1)[2] = [1, 2, 3, 0];
        assert_eq!(*img.pixel(2, 1), [1, 2, 3, 0]);
        assert_eq!(img.index(2, 1), 5);
    }

    #[test]
    fn test_u8_channel_saturates() {
        let mut p = [0u8; 3];
        p.set_channel(0, 300);
        p.set_channel(1, 7);
        assert_eq!(p, [255, 7, 0]);
        assert_eq!(p.channel(1), 7);
    }
}
