use rayon::prelude::*;
use std::collections::VecDeque;

use super::BinaryMask;

/// Voxel offsets of an axis-aligned ellipsoid with radii `(ri, rj, rk)`.
///
/// A zero radius collapses that axis to the center plane.
pub fn ellipsoid_kernel(radius: [usize; 3]) -> Vec<[i64; 3]> {
    let r = radius.map(|v| v as i64);
    let mut offsets = Vec::new();
    for dk in -r[2]..=r[2] {
        for dj in -r[1]..=r[1] {
            for di in -r[0]..=r[0] {
                let term = |d: i64, r: i64| {
                    if r == 0 {
                        0.0
                    } else {
                        (d as f64 / r as f64).powi(2)
                    }
                };
                if term(di, r[0]) + term(dj, r[1]) + term(dk, r[2]) <= 1.0 + 1e-9 {
                    offsets.push([di, dj, dk]);
                }
            }
        }
    }
    offsets
}

/// Set every voxel whose kernel neighbourhood touches the foreground.
pub fn dilate(mask: &BinaryMask, radius: [usize; 3]) -> BinaryMask {
    let kernel = ellipsoid_kernel(radius);
    apply_kernel(mask, &kernel, |hits, _| hits > 0)
}

/// Keep only voxels whose whole kernel neighbourhood is foreground.
///
/// Neighbours outside the grid are ignored, so the border never erodes by
/// itself; callers pad first.
pub fn erode(mask: &BinaryMask, radius: [usize; 3]) -> BinaryMask {
    let kernel = ellipsoid_kernel(radius);
    apply_kernel(mask, &kernel, |hits, in_bounds| hits == in_bounds)
}

fn apply_kernel<F>(mask: &BinaryMask, kernel: &[[i64; 3]], decide: F) -> BinaryMask
where
    F: Fn(usize, usize) -> bool + Sync,
{
    let [nx, ny, nz] = mask.dims();
    let slice_len = nx * ny;
    let mut out = BinaryMask::empty(mask.geometry.clone());
    if slice_len == 0 {
        return out;
    }

    out.data
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(k, slice)| {
            for j in 0..ny {
                for i in 0..nx {
                    let mut hits = 0usize;
                    let mut in_bounds = 0usize;
                    for [di, dj, dk] in kernel {
                        let (x, y, z) = (i as i64 + di, j as i64 + dj, k as i64 + dk);
                        if x < 0 || y < 0 || z < 0 {
                            continue;
                        }
                        let (x, y, z) = (x as usize, y as usize, z as usize);
                        if x >= nx || y >= ny || z >= nz {
                            continue;
                        }
                        in_bounds += 1;
                        if mask.get(x, y, z) {
                            hits += 1;
                        }
                    }
                    slice[i + j * nx] = decide(hits, in_bounds);
                }
            }
        });
    out
}

/// Fill background regions not connected (6-neighbourhood) to the grid border.
pub fn fill_holes(mask: &BinaryMask) -> BinaryMask {
    let [nx, ny, nz] = mask.dims();
    let g = &mask.geometry;
    let mut reached = vec![false; mask.data.len()];
    let mut queue = VecDeque::new();

    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let on_border =
                    i == 0 || j == 0 || k == 0 || i == nx - 1 || j == ny - 1 || k == nz - 1;
                let idx = g.linear_index(i, j, k);
                if on_border && !mask.data[idx] && !reached[idx] {
                    reached[idx] = true;
                    queue.push_back((i, j, k));
                }
            }
        }
    }

    while let Some((i, j, k)) = queue.pop_front() {
        let mut visit = |x: usize, y: usize, z: usize| {
            let idx = g.linear_index(x, y, z);
            if !mask.data[idx] && !reached[idx] {
                reached[idx] = true;
                queue.push_back((x, y, z));
            }
        };
        if i > 0 {
            visit(i - 1, j, k);
        }
        if i + 1 < nx {
            visit(i + 1, j, k);
        }
        if j > 0 {
            visit(i, j - 1, k);
        }
        if j + 1 < ny {
            visit(i, j + 1, k);
        }
        if k > 0 {
            visit(i, j, k - 1);
        }
        if k + 1 < nz {
            visit(i, j, k + 1);
        }
    }

    let data = mask
        .data
        .iter()
        .zip(reached.iter())
        .map(|(fg, outside)| *fg || !*outside)
        .collect();
    BinaryMask {
        geometry: mask.geometry.clone(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::ImageGeometry;
    use nalgebra::{Point3, Vector3};

    fn grid(n: usize) -> BinaryMask {
        BinaryMask::empty(ImageGeometry::new(
            [n, n, n],
            Vector3::new(1.0, 1.0, 1.0),
            Point3::origin(),
        ))
    }

    #[test]
    fn test_kernel_respects_anisotropic_radius() {
        let kernel = ellipsoid_kernel([2, 2, 1]);
        assert!(kernel.contains(&[2, 0, 0]));
        assert!(kernel.contains(&[0, 0, 1]));
        assert!(!kernel.contains(&[0, 0, 2]));
        assert!(!kernel.contains(&[2, 2, 0]));
        let flat = ellipsoid_kernel([1, 1, 0]);
        assert!(flat.iter().all(|o| o[2] == 0));
        assert_eq!(flat.len(), 5);
    }

    #[test]
    fn test_dilate_then_erode_closes_gap() {
        let mut mask = grid(15);
        for i in 3..12 {
            if i == 7 {
                continue;
            }
            for j in 5..10 {
                for k in 5..10 {
                    mask.set(i, j, k, true);
                }
            }
        }
        assert!(!mask.get(7, 7, 7));
        let closed = erode(&dilate(&mask, [1, 1, 1]), [1, 1, 1]);
        assert!(closed.get(7, 7, 7));
        assert!(!closed.get(1, 1, 1));
    }

    #[test]
    fn test_erode_removes_thin_features() {
        let mut mask = grid(9);
        for i in 1..8 {
            mask.set(i, 4, 4, true);
        }
        let eroded = erode(&mask, [1, 1, 1]);
        assert_eq!(eroded.count_foreground(), 0);
    }

    #[test]
    fn test_fill_holes_fills_enclosed_cavity() {
        let mut mask = grid(7);
        for k in 1..6 {
            for j in 1..6 {
                for i in 1..6 {
                    mask.set(i, j, k, true);
                }
            }
        }
        mask.set(3, 3, 3, false);
        mask.set(3, 3, 2, false);
        let filled = fill_holes(&mask);
        assert!(filled.get(3, 3, 3));
        assert!(filled.get(3, 3, 2));
        assert!(!filled.get(0, 0, 0));
        assert_eq!(filled.count_foreground(), 125);
    }

    #[test]
    fn test_fill_holes_keeps_open_channel() {
        let mut mask = grid(7);
        for k in 1..6 {
            for j in 1..6 {
                for i in 1..6 {
                    mask.set(i, j, k, true);
                }
            }
        }
        for i in 0..4 {
            mask.set(i, 3, 3, false);
        }
        let filled = fill_holes(&mask);
        assert!(!filled.get(3, 3, 3));
    }
}
