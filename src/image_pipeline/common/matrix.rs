//! Small dense color-matrix helpers.

/// Standard XYZ to linear sRGB (D65) matrix.
pub const XYZ_TO_SRGB: [[f64; 3]; 3] = [
    [ 3.2404542, -1.5371385, -0.4985314],
    [-0.9692660,  1.8760108,  0.0415560],
    [ 0.0556434, -0.2040259,  1.0572252],
];

/// Linear sRGB (D65) to XYZ matrix.
pub const SRGB_TO_XYZ: [[f64; 3]; 3] = [
    [0.412453, 0.357580, 0.180423],
    [0.212671, 0.715160, 0.072169],
    [0.019334, 0.119193, 0.950227],
];

/// Identity sensor matrix: channel `c` maps to RGB channel `c`, a fourth channel to green.
pub fn identity_rgb_cam(colors: usize) -> [[f32; 4]; 3] {
    let mut m = [[0.0f32; 4]; 3];
    for (c, row) in m.iter_mut().enumerate() {
        row[c] = 1.0;
    }
    if colors == 4 {
        m[1][1] = 0.5;
        m[1][3] = 0.5;
    }
    m
}

/// Inverse of a 3×3 matrix, `None` when singular.
pub fn invert3(m: &[[f64; 3]; 3]) -> Option<[[f64; 3]; 3]> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 {
        return None;
    }
    let inv_det = 1.0 / det;
    let mut out = [[0.0; 3]; 3];
    out[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det;
    out[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det;
    out[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det;
    out[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det;
    out[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det;
    out[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det;
    out[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det;
    out[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det;
    out[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det;
    Some(out)
}

/// Moore-Penrose pseudo-inverse of a `size`×3 matrix, returned in the same `size`×3 shape
/// (`out = m · (mᵀ·m)⁻¹`), so that `mᵀ · out = I`.
pub fn pseudoinverse(m: &[[f64; 3]; 4], size: usize) -> Option<[[f64; 3]; 4]> {
    let mut work = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            work[i][j] = (0..size).map(|k| m[k][i] * m[k][j]).sum();
        }
    }
    let work = invert3(&work)?;
    let mut out = [[0.0; 3]; 4];
    for i in 0..size {
        for j in 0..3 {
            out[i][j] = (0..3).map(|k| work[j][k] * m[i][k]).sum();
        }
    }
    Some(out)
}

/// Camera multipliers' counterpart: `cam_rgb` (colors×3) from `rgb_cam` (3×colors).
pub fn cam_rgb_from_rgb_cam(rgb_cam: &[[f32; 4]; 3], colors: usize) -> [[f64; 3]; 4] {
    let mut transpose = [[0.0; 3]; 4];
    for (i, row) in transpose.iter_mut().enumerate().take(colors) {
        for (j, v) in row.iter_mut().enumerate() {
            *v = rgb_cam[j][i] as f64;
        }
    }
    pseudoinverse(&transpose, colors).unwrap_or_else(|| {
        let mut fallback = [[0.0; 3]; 4];
        for (i, row) in fallback.iter_mut().enumerate().take(colors) {
            row[i.min(2)] = 1.0;
        }
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert3_identity() {
        let id = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(invert3(&id), Some(id));
        assert!(invert3(&[[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [0.0, 0.0, 1.0]]).is_none());
    }

    #[test]
    fn test_srgb_matrices_are_inverse() {
        let inv = invert3(&XYZ_TO_SRGB).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert!((inv[i][j] - SRGB_TO_XYZ[i][j]).abs() < 1e-3);
            }
        }
    }

    #[test]
    fn test_pseudoinverse_of_square_matrix() {
        let m = [[2.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 0.5], [0.0; 3]];
        let p = pseudoinverse(&m, 3).unwrap();
        // mᵀ · p = I
        for i in 0..3 {
            for j in 0..3 {
                let v: f64 = (0..3).map(|k| m[k][i] * p[k][j]).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((v - expected).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_cam_rgb_of_identity() {
        let cam_rgb = cam_rgb_from_rgb_cam(&identity_rgb_cam(3), 3);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((cam_rgb[i][j] - expected).abs() < 1e-9);
            }
        }
    }
}
