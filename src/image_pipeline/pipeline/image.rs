use crate::image_pipeline::common::image::{Image16, Rgb8Image};

/// Number of subareas an image is split into for lazy recomputation.
pub const SUBAREA_COUNT: usize = 32;
const GRID_COLUMNS: usize = 4;
const GRID_ROWS: usize = 8;
const ALL_VALID: u32 = u32::MAX;

/// Rectangle of one subarea.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subarea {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Subarea {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Fixed 4×8 partition of a `width`×`height` image. The last column and row take
/// whatever is left, which may be nothing for very small images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubareaGrid {
    width: usize,
    height: usize,
    cell_width: usize,
    cell_height: usize,
}

impl SubareaGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cell_width: width.div_ceil(GRID_COLUMNS).max(1),
            cell_height: height.div_ceil(GRID_ROWS).max(1),
        }
    }

    /// Rectangle of subarea `index` (0..32), row-major.
    pub fn rect(&self, index: usize) -> Subarea {
        let (col, row) = (index % GRID_COLUMNS, index / GRID_COLUMNS);
        let x = (col * self.cell_width).min(self.width);
        let y = (row * self.cell_height).min(self.height);
        let width = if col == GRID_COLUMNS - 1 {
            self.width - x
        } else {
            self.cell_width.min(self.width - x)
        };
        let height = if row == GRID_ROWS - 1 {
            self.height - y
        } else {
            self.cell_height.min(self.height - y)
        };
        Subarea { x, y, width, height }
    }

    /// Subarea containing pixel `(x, y)`.
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let col = (x / self.cell_width).min(GRID_COLUMNS - 1);
        let row = (y / self.cell_height).min(GRID_ROWS - 1);
        Some(row * GRID_COLUMNS + col)
    }

    /// Subareas overlapping the half-open box `left..right`×`top..bottom`.
    pub fn intersecting(&self, left: usize, top: usize, right: usize, bottom: usize) -> Vec<usize> {
        if left >= right || top >= bottom {
            return Vec::new();
        }
        let (Some(first), Some(last)) = (
            self.index_of(left.min(self.width.saturating_sub(1)), top.min(self.height.saturating_sub(1))),
            self.index_of(
                (right - 1).min(self.width.saturating_sub(1)),
                (bottom - 1).min(self.height.saturating_sub(1)),
            ),
        ) else {
            return Vec::new();
        };
        let (c0, r0) = (first % GRID_COLUMNS, first / GRID_COLUMNS);
        let (c1, r1) = (last % GRID_COLUMNS, last / GRID_COLUMNS);
        (r0..=r1)
            .flat_map(|r| (c0..=c1).map(move |c| r * GRID_COLUMNS + c))
            .collect()
    }
}

/// Channel arrangement of a phase buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    Rgb,
    /// Four channels, the second green (or fourth sensor color) kept apart.
    Rgbg,
}

#[derive(Debug, Clone, Default)]
pub enum PhaseBuffer {
    #[default]
    Empty,
    Wide(Image16),
    Rgb8(Rgb8Image),
}

/// Buffer of one phase plus its validity tracking.
///
/// One bit per subarea; a bit is set once that subarea holds up-to-date pixels.
#[derive(Debug, Clone, Default)]
pub struct PipelineImage {
    buffer: PhaseBuffer,
    valid: u32,
    invalidate_event: bool,
}

impl PipelineImage {
    pub fn buffer(&self) -> &PhaseBuffer {
        &self.buffer
    }

    pub fn width(&self) -> usize {
        match &self.buffer {
            PhaseBuffer::Empty => 0,
            PhaseBuffer::Wide(img) => img.width,
            PhaseBuffer::Rgb8(img) => img.width,
        }
    }

    pub fn height(&self) -> usize {
        match &self.buffer {
            PhaseBuffer::Empty => 0,
            PhaseBuffer::Wide(img) => img.height,
            PhaseBuffer::Rgb8(img) => img.height,
        }
    }

    pub fn bytes_per_channel(&self) -> usize {
        match &self.buffer {
            PhaseBuffer::Empty => 0,
            PhaseBuffer::Wide(img) => img.bytes_per_channel(),
            PhaseBuffer::Rgb8(img) => img.bytes_per_channel(),
        }
    }

    pub fn rowstride(&self) -> usize {
        match &self.buffer {
            PhaseBuffer::Empty => 0,
            PhaseBuffer::Wide(img) => img.rowstride(),
            PhaseBuffer::Rgb8(img) => img.rowstride(),
        }
    }

    pub fn layout(&self) -> ChannelLayout {
        match &self.buffer {
            PhaseBuffer::Wide(img) if img.colors == 4 => ChannelLayout::Rgbg,
            _ => ChannelLayout::Rgb,
        }
    }

    pub fn grid(&self) -> SubareaGrid {
        SubareaGrid::new(self.width(), self.height())
    }

    pub fn wide(&self) -> Option<&Image16> {
        match &self.buffer {
            PhaseBuffer::Wide(img) => Some(img),
            _ => None,
        }
    }

    pub fn rgb8(&self) -> Option<&Rgb8Image> {
        match &self.buffer {
            PhaseBuffer::Rgb8(img) => Some(img),
            _ => None,
        }
    }

    pub(crate) fn wide_mut(&mut self) -> Option<&mut Image16> {
        match &mut self.buffer {
            PhaseBuffer::Wide(img) => Some(img),
            _ => None,
        }
    }

    pub(crate) fn rgb8_mut(&mut self) -> Option<&mut Rgb8Image> {
        match &mut self.buffer {
            PhaseBuffer::Rgb8(img) => Some(img),
            _ => None,
        }
    }

    pub(crate) fn set_buffer(&mut self, buffer: PhaseBuffer) {
        self.buffer = buffer;
    }

    /// Makes this an 8-bit RGB buffer of the given size. Validity is dropped, without
    /// an event, when the size changes.
    pub(crate) fn prepare_rgb8(&mut self, width: usize, height: usize) {
        let fits = matches!(&self.buffer, PhaseBuffer::Rgb8(img) if img.width == width && img.height == height);
        if !fits {
            self.valid = 0;
            self.buffer = PhaseBuffer::Rgb8(Rgb8Image::new(width, height, 3));
        }
    }

    pub(crate) fn release(&mut self) {
        self.buffer = PhaseBuffer::Empty;
    }

    pub fn valid_mask(&self) -> u32 {
        self.valid
    }

    pub fn is_valid(&self, area: usize) -> bool {
        self.valid & (1 << area) != 0
    }

    pub fn is_complete(&self) -> bool {
        self.valid == ALL_VALID
    }

    pub fn is_stale(&self) -> bool {
        self.valid == 0
    }

    pub(crate) fn mark_valid(&mut self, area: usize) {
        self.valid |= 1 << area;
    }

    pub(crate) fn mark_complete(&mut self) {
        self.valid = ALL_VALID;
    }

    pub(crate) fn set_valid_mask(&mut self, mask: u32) {
        self.valid = mask;
    }

    /// Drops every subarea and raises the invalidate event.
    pub(crate) fn invalidate(&mut self) {
        self.valid = 0;
        self.invalidate_event = true;
    }

    pub fn has_invalidate_event(&self) -> bool {
        self.invalidate_event
    }

    /// Returns the invalidate event and clears it.
    pub fn take_invalidate_event(&mut self) -> bool {
        std::mem::take(&mut self.invalidate_event)
    }
}
