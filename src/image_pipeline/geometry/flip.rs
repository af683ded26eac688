use serde::{Deserialize, Serialize};

use crate::image_pipeline::common::image::{Image, Pixel};

/// Composition table: `COMPOSE[a][b]` is the single flip equal to `a` followed by `b`.
const COMPOSE: [[u8; 8]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7],
    [1, 0, 3, 2, 5, 4, 7, 6],
    [2, 3, 0, 1, 6, 7, 4, 5],
    [3, 2, 1, 0, 7, 6, 5, 4],
    [4, 6, 5, 7, 0, 2, 1, 3],
    [5, 7, 4, 6, 1, 3, 0, 2],
    [6, 4, 7, 5, 2, 0, 3, 1],
    [7, 5, 6, 4, 3, 1, 2, 0],
];

/// One of the eight dihedral transforms of a rectangle.
///
/// Bit 0 mirrors columns, bit 1 mirrors rows and bit 2 transposes before mirroring.
/// Code 3 is a half turn, 6 a clockwise and 5 a counter-clockwise quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlipCode(u8);

impl FlipCode {
    pub const NONE: FlipCode = FlipCode(0);
    pub const MIRROR_COLUMNS: FlipCode = FlipCode(1);
    pub const MIRROR_ROWS: FlipCode = FlipCode(2);
    pub const HALF_TURN: FlipCode = FlipCode(3);
    pub const TRANSPOSE: FlipCode = FlipCode(4);
    pub const QUARTER_TURN_CCW: FlipCode = FlipCode(5);
    pub const QUARTER_TURN_CW: FlipCode = FlipCode(6);

    pub fn new(code: u8) -> Self {
        Self(code & 7)
    }

    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 0
    }

    pub fn swaps_axes(self) -> bool {
        self.0 & 4 != 0
    }

    /// Whether the transform changes handedness, which reverses rotation angles.
    pub fn is_mirror(self) -> bool {
        matches!(self.0, 1 | 2 | 4 | 7)
    }

    /// `self` followed by `next`.
    pub fn then(self, next: FlipCode) -> FlipCode {
        FlipCode(COMPOSE[self.0 as usize][next.0 as usize])
    }

    pub fn inverse(self) -> FlipCode {
        match self.0 {
            5 => FlipCode(6),
            6 => FlipCode(5),
            c => FlipCode(c),
        }
    }

    /// Dimensions after applying the flip to a `width`×`height` image.
    pub fn apply_dimensions(self, width: usize, height: usize) -> (usize, usize) {
        if self.swaps_axes() { (height, width) } else { (width, height) }
    }
}

/// Applies `code` in place by following permutation cycles, tracking visited
/// destinations in a bitmask and holding a single pixel per cycle.
pub fn flip<P: Pixel>(image: &mut Image<P>, code: FlipCode) {
    let code = code.code();
    if code == 0 {
        return;
    }
    let (width, height) = (image.width, image.height);
    let size = width * height;
    let mut visited = vec![0u32; (size + 31) >> 5];
    let pixels = &mut image.pixels;

    for base in 0..size {
        if visited[base >> 5] & (1 << (base & 31)) != 0 {
            continue;
        }
        let hold = pixels[base];
        let mut dest = base;
        loop {
            let (mut row, mut col) = if code & 4 != 0 {
                (dest % height, dest / height)
            } else {
                (dest / width, dest % width)
            };
            if code & 2 != 0 {
                row = height - 1 - row;
            }
            if code & 1 != 0 {
                col = width - 1 - col;
            }
            let next = row * width + col;
            if next == base {
                break;
            }
            visited[next >> 5] |= 1 << (next & 31);
            pixels[dest] = pixels[next];
            dest = next;
        }
        pixels[dest] = hold;
    }

    if code & 4 != 0 {
        std::mem::swap(&mut image.width, &mut image.height);
    }
}

/// Reduces `angle` (degrees) to `[0, 90)`, folding the removed quarter turns into
/// `orientation`.
pub fn normalize_rotation(angle: f64, orientation: FlipCode) -> (f64, FlipCode) {
    if !angle.is_finite() {
        return (0.0, orientation);
    }
    let mut angle = angle % 360.0;
    if angle < 0.0 {
        angle += 360.0;
    }
    let (turn, reduced) = if angle >= 270.0 {
        (FlipCode::QUARTER_TURN_CCW, angle - 270.0)
    } else if angle >= 180.0 {
        (FlipCode::HALF_TURN, angle - 180.0)
    } else if angle >= 90.0 {
        (FlipCode::QUARTER_TURN_CW, angle - 90.0)
    } else {
        (FlipCode::NONE, angle)
    };
    // Guard against 89.99999... rounding back up to 90
    let reduced = if reduced >= 90.0 { 0.0 } else { reduced };
    (reduced, orientation.then(turn))
}
