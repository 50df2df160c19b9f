//! Interpolation functions for curve and CLUT evaluation
//!
//! - Linear interpolation (1D)
//! - Multilinear interpolation over an N-dimensional grid
//! - Tetrahedral interpolation over a 3D grid

/// Returns a + t * (b - a)
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

/// Lookup in a uniformly spaced 1D table over [0, 1]
pub fn lut1d_interp(lut: &[f64], input: f64) -> f64 {
    if lut.is_empty() {
        return input;
    }
    if lut.len() == 1 {
        return lut[0];
    }

    let max_idx = (lut.len() - 1) as f64;
    let pos = (input * max_idx).clamp(0.0, max_idx);

    let i0 = pos.floor() as usize;
    let i1 = (i0 + 1).min(lut.len() - 1);
    lerp(lut[i0], lut[i1], pos - i0 as f64)
}

/// Grid cell location for one axis
#[derive(Debug, Clone, Copy)]
struct Axis {
    base: usize,
    frac: f64,
}

#[inline]
fn locate(input: f64, points: usize) -> Axis {
    let max_idx = (points - 1) as f64;
    // NaN inputs land on the first grid point
    let pos = if input.is_nan() {
        0.0
    } else {
        (input * max_idx).clamp(0.0, max_idx)
    };
    let mut base = pos.floor() as usize;
    if base >= points - 1 && points > 1 {
        base = points - 2;
    }
    Axis {
        base,
        frac: if points > 1 { pos - base as f64 } else { 0.0 },
    }
}

/// Row-major strides for a grid with `outputs` values per node
///
/// The first axis varies slowest, as in ICC CLUTs.
pub fn grid_strides(grid: &[usize], outputs: usize) -> Vec<usize> {
    let mut strides = vec![0; grid.len()];
    let mut acc = outputs;
    for (stride, &points) in strides.iter_mut().zip(grid).rev() {
        *stride = acc;
        acc *= points;
    }
    strides
}

/// Multilinear interpolation across an N-dimensional grid
///
/// `grid[i]` is the point count for input axis `i`, `table` holds
/// `outputs` values per node, and out-of-range inputs clamp to the grid.
pub fn multilinear(
    table: &[f64],
    grid: &[usize],
    strides: &[usize],
    input: &[f64],
    output: &mut [f64],
) {
    let outputs = output.len();
    output.iter_mut().for_each(|o| *o = 0.0);

    let mut axes = [Axis { base: 0, frac: 0.0 }; 16];
    let mut active = [0usize; 16];
    let mut active_len = 0;
    let mut origin = 0;

    for (i, (&x, &points)) in input.iter().zip(grid).enumerate() {
        let axis = locate(x, points);
        origin += axis.base * strides[i];
        axes[i] = axis;
        if axis.frac > 0.0 {
            active[active_len] = i;
            active_len += 1;
        }
    }

    // Only axes with a fractional part contribute a second corner
    for corner in 0..(1usize << active_len) {
        let mut weight = 1.0;
        let mut offset = origin;
        for (bit, &axis_idx) in active[..active_len].iter().enumerate() {
            let f = axes[axis_idx].frac;
            if corner & (1 << bit) != 0 {
                weight *= f;
                offset += strides[axis_idx];
            } else {
                weight *= 1.0 - f;
            }
        }
        if weight == 0.0 {
            continue;
        }
        for (o, v) in output.iter_mut().zip(&table[offset..offset + outputs]) {
            *o += weight * v;
        }
    }
}

/// Tetrahedral interpolation for a 3-input grid with any number of outputs
///
/// Divides each cube into 6 tetrahedra and interpolates within the one
/// containing the input.
pub fn tetrahedral(
    table: &[f64],
    grid: &[usize],
    strides: &[usize],
    input: &[f64],
    output: &mut [f64],
) {
    let r = locate(input[0], grid[0]);
    let g = locate(input[1], grid[1]);
    let b = locate(input[2], grid[2]);

    let (fr, fg, fb) = (r.frac, g.frac, b.frac);
    let base = r.base * strides[0] + g.base * strides[1] + b.base * strides[2];
    let dr = if grid[0] > 1 { strides[0] } else { 0 };
    let dg = if grid[1] > 1 { strides[1] } else { 0 };
    let db = if grid[2] > 1 { strides[2] } else { 0 };

    let at = |offset: usize, c: usize| table[base + offset + c];

    for (c, out) in output.iter_mut().enumerate() {
        let c000 = at(0, c);
        let c100 = at(dr, c);
        let c010 = at(dg, c);
        let c001 = at(db, c);
        let c110 = at(dr + dg, c);
        let c101 = at(dr + db, c);
        let c011 = at(dg + db, c);
        let c111 = at(dr + dg + db, c);

        *out = if fr >= fg {
            if fg >= fb {
                c000 + fr * (c100 - c000) + fg * (c110 - c100) + fb * (c111 - c110)
            } else if fr >= fb {
                c000 + fr * (c100 - c000) + fb * (c101 - c100) + fg * (c111 - c101)
            } else {
                c000 + fb * (c001 - c000) + fr * (c101 - c001) + fg * (c111 - c101)
            }
        } else if fg >= fb {
            if fr >= fb {
                c000 + fg * (c010 - c000) + fr * (c110 - c010) + fb * (c111 - c110)
            } else {
                c000 + fg * (c010 - c000) + fb * (c011 - c010) + fr * (c111 - c011)
            }
        } else {
            c000 + fb * (c001 - c000) + fg * (c011 - c001) + fr * (c111 - c011)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-10;

    fn identity_grid(points: usize) -> Vec<f64> {
        let mut lut = Vec::with_capacity(points * points * points * 3);
        let step = (points - 1) as f64;
        for r in 0..points {
            for g in 0..points {
                for b in 0..points {
                    lut.extend([r as f64 / step, g as f64 / step, b as f64 / step]);
                }
            }
        }
        lut
    }

    #[test]
    fn test_lerp() {
        assert!((lerp(0.0, 1.0, 0.5) - 0.5).abs() < EPSILON);
        assert!((lerp(2.0, 4.0, 0.25) - 2.5).abs() < EPSILON);
    }

    #[test]
    fn test_lut1d() {
        let lut = vec![0.0, 0.5, 1.0];
        assert!((lut1d_interp(&lut, 0.25) - 0.25).abs() < EPSILON);
        assert!((lut1d_interp(&lut, 2.0) - 1.0).abs() < EPSILON);
        assert!((lut1d_interp(&lut, -1.0) - 0.0).abs() < EPSILON);
    }

    #[test]
    fn test_strides_first_axis_slowest() {
        assert_eq!(grid_strides(&[2, 3, 4], 3), vec![36, 12, 3]);
    }

    #[test]
    fn test_identity_grid() {
        let grid = [5, 5, 5];
        let strides = grid_strides(&grid, 3);
        let lut = identity_grid(5);

        for input in [
            [0.0, 0.0, 0.0],
            [1.0, 1.0, 1.0],
            [0.5, 0.5, 0.5],
            [0.25, 0.6, 0.85],
            [0.9, 0.1, 0.33],
        ] {
            let mut multi = [0.0; 3];
            let mut tetra = [0.0; 3];
            multilinear(&lut, &grid, &strides, &input, &mut multi);
            tetrahedral(&lut, &grid, &strides, &input, &mut tetra);
            for c in 0..3 {
                assert!((multi[c] - input[c]).abs() < 1e-9, "{:?} -> {:?}", input, multi);
                assert!((tetra[c] - input[c]).abs() < 1e-9, "{:?} -> {:?}", input, tetra);
            }
        }
    }

    #[test]
    fn test_out_of_range_clamps() {
        let grid = [2, 2];
        let strides = grid_strides(&grid, 1);
        let table = [0.0, 1.0, 2.0, 3.0];
        let mut out = [0.0];

        multilinear(&table, &grid, &strides, &[-5.0, 7.0], &mut out);
        assert!((out[0] - 1.0).abs() < EPSILON);

        multilinear(&table, &grid, &strides, &[0.5, 0.5], &mut out);
        assert!((out[0] - 1.5).abs() < EPSILON);
    }

    #[test]
    fn test_four_dimensional() {
        // f(x) = sum of inputs / 4 on a 3-point grid
        let grid = [3, 3, 3, 3];
        let strides = grid_strides(&grid, 1);
        let mut table = Vec::new();
        for a in 0..3 {
            for b in 0..3 {
                for c in 0..3 {
                    for d in 0..3 {
                        table.push((a + b + c + d) as f64 / 8.0);
                    }
                }
            }
        }
        let mut out = [0.0];
        multilinear(&table, &grid, &strides, &[0.1, 0.7, 0.3, 0.9], &mut out);
        assert!((out[0] - 0.5).abs() < 1e-9);
    }
}
