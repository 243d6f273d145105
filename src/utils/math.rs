//! Planar affine helpers layered on top of `glam`.
//!
//! All matrices are 3×3 homogeneous transforms acting on column vectors
//! `[x, y, 1]`. Positions live in a [`DVec3`] whose third component is 1.

use glam::{DMat3, DVec3};

use crate::config::{DEFAULT_TOLERANCE, SINGULARITY_TOLERANCE};
use crate::error::{PhysmError, Result};

/// Builds a matrix from row-major entries.
pub fn from_rows(r0: [f64; 3], r1: [f64; 3], r2: [f64; 3]) -> DMat3 {
    DMat3::from_cols(
        DVec3::new(r0[0], r1[0], r2[0]),
        DVec3::new(r0[1], r1[1], r2[1]),
        DVec3::new(r0[2], r1[2], r2[2]),
    )
}

/// Entry at `(row, col)`.
#[inline]
pub fn entry(mat: &DMat3, row: usize, col: usize) -> f64 {
    mat.col(col)[row]
}

/// Homogeneous point `[x, y, 1]`.
#[inline]
pub fn point(x: f64, y: f64) -> DVec3 {
    DVec3::new(x, y, 1.0)
}

pub fn scale_matrix(sx: f64, sy: f64) -> DMat3 {
    from_rows([sx, 0.0, 0.0], [0.0, sy, 0.0], [0.0, 0.0, 1.0])
}

pub fn rotation_matrix(angle: f64) -> DMat3 {
    let (s, c) = angle.sin_cos();
    from_rows([c, -s, 0.0], [s, c, 0.0], [0.0, 0.0, 1.0])
}

pub fn translation_matrix(dx: f64, dy: f64) -> DMat3 {
    from_rows([1.0, 0.0, dx], [0.0, 1.0, dy], [0.0, 0.0, 1.0])
}

/// Rotation by `angle` followed by a translation of `(dx, dy)`.
pub fn rotation_translation_matrix(angle: f64, dx: f64, dy: f64) -> DMat3 {
    let (s, c) = angle.sin_cos();
    from_rows([c, -s, dx], [s, c, dy], [0.0, 0.0, 1.0])
}

/// Exact inverse through the adjugate and the determinant.
///
/// A singular input yields `Inf`/`NaN` entries rather than an error; callers
/// that can meet degenerate transforms must check the result themselves.
pub fn invert(mat: &DMat3) -> DMat3 {
    let m = |r, c| entry(mat, r, c);
    let (a, b, c) = (m(0, 0), m(0, 1), m(0, 2));
    let (d, e, f) = (m(1, 0), m(1, 1), m(1, 2));
    let (g, h, i) = (m(2, 0), m(2, 1), m(2, 2));

    let co_a = e * i - f * h;
    let co_b = -(d * i - f * g);
    let co_c = d * h - e * g;
    let det = a * co_a + b * co_b + c * co_c;
    let inv_det = 1.0 / det;

    from_rows(
        [co_a, -(b * i - c * h), b * f - c * e],
        [co_b, a * i - c * g, -(a * f - c * d)],
        [co_c, -(a * h - b * g), a * e - b * d],
    ) * inv_det
}

/// Like [`invert`], but reports a near-zero determinant as a singular matrix.
pub fn checked_invert(mat: &DMat3) -> Result<DMat3> {
    if mat.determinant().abs() < SINGULARITY_TOLERANCE {
        return Err(PhysmError::SingularMatrix {
            matrix: format_mat3(mat),
        });
    }
    Ok(invert(mat))
}

/// Whether the linear part is a rotation combined with a uniform scale
/// (reflections included), i.e. free of shear and non-uniform scale.
pub fn is_similarity(mat: &DMat3, tolerance: f64) -> bool {
    let c0 = mat.col(0).truncate();
    let c1 = mat.col(1).truncate();
    let scale = c0.length().max(c1.length()).max(1.0);
    c0.dot(c1).abs() <= tolerance * scale * scale
        && (c0.length() - c1.length()).abs() <= tolerance * scale
}

/// Linear scale factor `sqrt(|det|)`.
///
/// Only meaningful for similarity transforms (see [`is_similarity`]).
pub fn scale_factor(mat: &DMat3) -> f64 {
    debug_assert!(
        is_similarity(mat, DEFAULT_TOLERANCE),
        "scale_factor expects a similarity transform"
    );
    mat.determinant().abs().sqrt()
}

/// Rotation angle `atan2(m[1,0], -m[0,0])` of a pure rotation+translation.
///
/// Shear or non-uniform scale make the result meaningless.
pub fn rotation_angle(mat: &DMat3) -> f64 {
    debug_assert!(
        is_similarity(mat, DEFAULT_TOLERANCE),
        "rotation_angle expects a similarity transform"
    );
    entry(mat, 1, 0).atan2(-entry(mat, 0, 0))
}

/// Applies an affine transform to a homogeneous point.
#[inline]
pub fn transform_point(mat: &DMat3, position: DVec3) -> DVec3 {
    *mat * position
}

/// Whether two matrices agree entry-wise within `tolerance`.
pub fn mat3_approx_eq(a: &DMat3, b: &DMat3, tolerance: f64) -> bool {
    a.to_cols_array()
        .iter()
        .zip(b.to_cols_array().iter())
        .all(|(x, y)| (x - y).abs() < tolerance)
}

/// Row-major rendering used in error messages.
pub fn format_mat3(mat: &DMat3) -> String {
    let rows: Vec<String> = (0..3)
        .map(|r| {
            format!(
                "[{}, {}, {}]",
                entry(mat, r, 0),
                entry(mat, r, 1),
                entry(mat, r, 2)
            )
        })
        .collect();
    format!("[{}]", rows.join(", "))
}

/// Coerces 2 or 3 components into a homogeneous position.
///
/// A third component is ignored; the homogeneous coordinate is always 1.
pub fn coerce_position(components: &[f64]) -> Result<DVec3> {
    match components {
        [x, y] | [x, y, _] => Ok(point(*x, *y)),
        other => Err(PhysmError::dimension(format!(
            "expected position with 2 or 3 components; got {}",
            other.len()
        ))),
    }
}

/// Coerces `[q]` or `[q, qd]` into a state tuple; a missing velocity is zero.
pub fn coerce_state(components: &[f64]) -> Result<(f64, f64)> {
    match components {
        [q] => Ok((*q, 0.0)),
        [q, qd] => Ok((*q, *qd)),
        other => Err(PhysmError::dimension(format!(
            "expected state with 1 or 2 components; got {}",
            other.len()
        ))),
    }
}
