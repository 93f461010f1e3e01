use log::{debug, info};
use nalgebra::{Point3, Vector3};
use std::collections::HashMap;

use super::decimation::decimate;
use super::normals::compute_normals;
use super::smoothing::{relax, taubin_smooth};
use super::SurfaceMesh;
use crate::config::{ReconstructionConfig, MAX_DECIMATION_FRACTION};
use crate::error::{Result, SurfaceCutError};
use crate::volume::BinaryMask;

/// Builds a closed surface of the mask foreground in physical coordinates.
///
/// Extraction, component filtering, smoothing and decimation run in voxel
/// index space; the mesh is moved to physical space last, after its winding
/// has been corrected for mirroring index-to-physical transforms.
pub fn reconstruct(mask: &BinaryMask, config: &ReconstructionConfig) -> Result<SurfaceMesh> {
    if mask.is_empty() || mask.count_foreground() == 0 {
        return Err(SurfaceCutError::InsufficientInput(
            "mask has no foreground voxels".to_string(),
        ));
    }

    let mut mesh = extract_surface(mask);
    info!(
        "reconstruct: extracted {} vertices, {} triangles",
        mesh.vertices.len(),
        mesh.faces.len()
    );

    if config.keep_largest_component {
        let before = mesh.faces.len();
        mesh.keep_largest_component();
        if mesh.faces.len() != before {
            debug!(
                "reconstruct: dropped {} triangles outside the largest component",
                before - mesh.faces.len()
            );
        }
    }

    taubin_smooth(&mut mesh, config.smoothing_iterations, config.pass_band);
    decimate(
        &mut mesh,
        config.decimation_fraction.min(MAX_DECIMATION_FRACTION),
        config.decimation_max_error,
    );

    let geometry = &mask.geometry;
    if geometry.determinant() < 0.0 {
        debug!("reconstruct: mirrored geometry, reversing winding");
        mesh.reverse_orientation();
    }
    relax(&mut mesh, config.relaxation_iterations, config.relaxation_factor);

    mesh.transform(&geometry.index_to_physical_matrix());
    compute_normals(&mut mesh, config.feature_angle_deg, config.split_normals);

    info!(
        "reconstruct: final mesh {} vertices, {} triangles, area {:.1}, volume {:.1}",
        mesh.vertices.len(),
        mesh.faces.len(),
        mesh.area(),
        mesh.signed_volume()
    );
    Ok(mesh)
}

/// Surface nets over the binary mask, in voxel index coordinates.
///
/// Voxels outside the grid count as background, so the result is closed
/// even when the foreground touches the border. One vertex is placed per
/// cell that straddles the boundary, at the mean of its crossing edge
/// midpoints; each grid edge with a sign change emits one quad.
pub fn extract_surface(mask: &BinaryMask) -> SurfaceMesh {
    let [nx, ny, nz] = mask.dims();
    // one background voxel on every side
    let (px, py, pz) = (nx + 2, ny + 2, nz + 2);
    let mut padded = vec![false; px * py * pz];
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                padded[(i + 1) + (j + 1) * px + (k + 1) * px * py] = mask.get(i, j, k);
            }
        }
    }
    let inside = |x: usize, y: usize, z: usize| padded[x + y * px + z * px * py];

    const CORNERS: [(usize, usize, usize); 8] = [
        (0, 0, 0),
        (1, 0, 0),
        (1, 1, 0),
        (0, 1, 0),
        (0, 0, 1),
        (1, 0, 1),
        (1, 1, 1),
        (0, 1, 1),
    ];
    const EDGES: [(usize, usize); 12] = [
        (0, 1),
        (1, 2),
        (2, 3),
        (3, 0),
        (4, 5),
        (5, 6),
        (6, 7),
        (7, 4),
        (0, 4),
        (1, 5),
        (2, 6),
        (3, 7),
    ];

    let mut cell_verts: HashMap<(usize, usize, usize), usize> = HashMap::new();
    let mut vertices: Vec<Point3<f64>> = Vec::new();
    for cz in 0..pz - 1 {
        for cy in 0..py - 1 {
            for cx in 0..px - 1 {
                let vals: [bool; 8] = std::array::from_fn(|c| {
                    let (dx, dy, dz) = CORNERS[c];
                    inside(cx + dx, cy + dy, cz + dz)
                });
                let count = vals.iter().filter(|v| **v).count();
                if count == 0 || count == 8 {
                    continue;
                }

                let mut sum = Vector3::zeros();
                let mut crossings = 0;
                for (a, b) in EDGES {
                    if vals[a] != vals[b] {
                        let (da, db) = (CORNERS[a], CORNERS[b]);
                        sum += Vector3::new(
                            (da.0 + db.0) as f64,
                            (da.1 + db.1) as f64,
                            (da.2 + db.2) as f64,
                        ) * 0.5;
                        crossings += 1;
                    }
                }
                let local = sum / crossings as f64;
                // shift back from padded to mask index space
                cell_verts.insert((cx, cy, cz), vertices.len());
                vertices.push(Point3::new(
                    cx as f64 + local.x - 1.0,
                    cy as f64 + local.y - 1.0,
                    cz as f64 + local.z - 1.0,
                ));
            }
        }
    }

    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut emit = |cells: [(usize, usize, usize); 4], flip: bool| {
        let ids: Vec<usize> = cells
            .iter()
            .filter_map(|c| cell_verts.get(c).copied())
            .collect();
        if let [a, b, c, d] = ids[..] {
            if flip {
                faces.push([a, c, b]);
                faces.push([a, d, c]);
            } else {
                faces.push([a, b, c]);
                faces.push([a, c, d]);
            }
        }
    };

    // x edges: (ix, iy, iz) -> (ix + 1, iy, iz)
    for iz in 1..pz - 1 {
        for iy in 1..py - 1 {
            for ix in 0..px - 1 {
                let (v0, v1) = (inside(ix, iy, iz), inside(ix + 1, iy, iz));
                if v0 == v1 {
                    continue;
                }
                emit(
                    [
                        (ix, iy - 1, iz - 1),
                        (ix, iy, iz - 1),
                        (ix, iy, iz),
                        (ix, iy - 1, iz),
                    ],
                    !v0,
                );
            }
        }
    }
    // y edges: (ix, iy, iz) -> (ix, iy + 1, iz)
    for iz in 1..pz - 1 {
        for iy in 0..py - 1 {
            for ix in 1..px - 1 {
                let (v0, v1) = (inside(ix, iy, iz), inside(ix, iy + 1, iz));
                if v0 == v1 {
                    continue;
                }
                emit(
                    [
                        (ix - 1, iy, iz - 1),
                        (ix, iy, iz - 1),
                        (ix, iy, iz),
                        (ix - 1, iy, iz),
                    ],
                    v0,
                );
            }
        }
    }
    // z edges: (ix, iy, iz) -> (ix, iy, iz + 1)
    for iz in 0..pz - 1 {
        for iy in 1..py - 1 {
            for ix in 1..px - 1 {
                let (v0, v1) = (inside(ix, iy, iz), inside(ix, iy, iz + 1));
                if v0 == v1 {
                    continue;
                }
                emit(
                    [
                        (ix - 1, iy - 1, iz),
                        (ix, iy - 1, iz),
                        (ix, iy, iz),
                        (ix - 1, iy, iz),
                    ],
                    !v0,
                );
            }
        }
    }

    SurfaceMesh::new(vertices, faces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::ImageGeometry;
    use approx::assert_relative_eq;
    use nalgebra::Matrix3;

    fn ball_mask(n: usize, radius: f64, geometry: ImageGeometry) -> BinaryMask {
        let mut mask = BinaryMask::empty(geometry);
        let c = (n / 2) as f64;
        for k in 0..n {
            for j in 0..n {
                for i in 0..n {
                    let d = Vector3::new(i as f64 - c, j as f64 - c, k as f64 - c).norm();
                    if d <= radius {
                        mask.set(i, j, k, true);
                    }
                }
            }
        }
        mask
    }

    #[test]
    fn test_single_voxel_gives_small_cube() {
        let g = ImageGeometry::new([3, 3, 3], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let mut mask = BinaryMask::empty(g);
        mask.set(1, 1, 1, true);
        let mesh = extract_surface(&mask);
        assert_eq!(mesh.vertices.len(), 8);
        assert_eq!(mesh.faces.len(), 12);
        assert!(mesh.is_closed());
        // corners sit a sixth of a voxel from the center
        assert_relative_eq!(mesh.signed_volume(), 1.0 / 27.0, epsilon = 1e-12);
        let (min, max) = mesh.bounds().unwrap();
        assert_relative_eq!(min.x, 1.0 - 1.0 / 6.0, epsilon = 1e-12);
        assert_relative_eq!(max.z, 1.0 + 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn test_border_voxel_is_still_closed() {
        let g = ImageGeometry::new([2, 2, 2], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let mask = BinaryMask::from_data(g, vec![true; 8]).unwrap();
        let mesh = extract_surface(&mask);
        assert!(mesh.is_closed());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_ball_reconstructs_in_physical_space() {
        let g = ImageGeometry::new([20, 20, 20], Vector3::new(2.0, 2.0, 2.0), Point3::new(10.0, 0.0, 0.0));
        let mask = ball_mask(20, 6.0, g);
        let mesh = reconstruct(&mask, &ReconstructionConfig::default()).unwrap();
        assert!(mesh.is_closed());
        assert!(mesh.signed_volume() > 0.0);
        assert_eq!(mesh.normals.as_ref().map(Vec::len), Some(mesh.vertices.len()));

        let center = Point3::new(30.0, 20.0, 20.0);
        for v in &mesh.vertices {
            let r = (v - center).norm();
            assert!(r > 9.0 && r < 15.0, "radius {}", r);
        }
        // normals point away from the center
        let normals = mesh.normals.as_ref().unwrap();
        let outward = mesh
            .vertices
            .iter()
            .zip(normals)
            .filter(|(v, n)| (*v - center).dot(n) > 0.0)
            .count();
        assert!(outward as f64 >= 0.98 * mesh.vertices.len() as f64);
    }

    #[test]
    fn test_mirrored_geometry_keeps_outward_winding() {
        let mirror = Matrix3::from_diagonal(&Vector3::new(-1.0, 1.0, 1.0));
        let g = ImageGeometry::new([16, 16, 16], Vector3::new(1.0, 1.0, 1.0), Point3::origin())
            .with_direction(mirror);
        let mask = ball_mask(16, 5.0, g);
        let mesh = reconstruct(&mask, &ReconstructionConfig::default()).unwrap();
        assert!(mesh.signed_volume() > 0.0);
        let (min, max) = mesh.bounds().unwrap();
        assert!(max.x < 0.0 && min.x > -16.0);
    }

    #[test]
    fn test_largest_component_wins() {
        let g = ImageGeometry::new([20, 10, 10], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let mut mask = BinaryMask::empty(g);
        for k in 2..8 {
            for j in 2..8 {
                for i in 2..8 {
                    mask.set(i, j, k, true);
                }
            }
        }
        mask.set(15, 5, 5, true);
        let mesh = reconstruct(&mask, &ReconstructionConfig::default()).unwrap();
        let (_, max) = mesh.bounds().unwrap();
        assert!(max.x < 10.0);
    }

    #[test]
    fn test_empty_mask_is_insufficient_input() {
        let g = ImageGeometry::new([4, 4, 4], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let mask = BinaryMask::empty(g);
        assert!(matches!(
            reconstruct(&mask, &ReconstructionConfig::default()),
            Err(SurfaceCutError::InsufficientInput(_))
        ));
    }
}
