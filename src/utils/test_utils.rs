use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

use crate::mesh::SurfaceMesh;
use crate::volume::{ImageGeometry, VolumetricImage};

/// Cubic volume of side `n` holding a bright ball (1000) of `radius` voxels
/// around the center voxel; everything else is 0.
pub fn sphere_volume(n: usize, radius: f64, spacing: f64) -> VolumetricImage {
    let geometry = ImageGeometry::new(
        [n, n, n],
        Vector3::new(spacing, spacing, spacing),
        Point3::origin(),
    );
    let c = (n / 2) as f64;
    let mut image = VolumetricImage::empty(geometry);
    for k in 0..n {
        for j in 0..n {
            for i in 0..n {
                let d = ((i as f64 - c).powi(2) + (j as f64 - c).powi(2) + (k as f64 - c).powi(2))
                    .sqrt();
                if d <= radius {
                    image.set(i, j, k, 1000.0);
                }
            }
        }
    }
    image
}

/// Axis-aligned closed box with outward winding.
pub fn box_mesh(center: Point3<f64>, extents: [f64; 3]) -> SurfaceMesh {
    let vertices = (0..8)
        .map(|bits| {
            let sign = |bit: usize| if bits & (1 << bit) != 0 { 0.5 } else { -0.5 };
            Point3::new(
                center.x + sign(0) * extents[0],
                center.y + sign(1) * extents[1],
                center.z + sign(2) * extents[2],
            )
        })
        .collect();
    let faces = vec![
        [0, 2, 3],
        [0, 3, 1],
        [4, 5, 7],
        [4, 7, 6],
        [0, 1, 5],
        [0, 5, 4],
        [2, 6, 7],
        [2, 7, 3],
        [0, 4, 6],
        [0, 6, 2],
        [1, 3, 7],
        [1, 7, 5],
    ];
    SurfaceMesh::new(vertices, faces)
}

/// Closed octahedron `|x| + |y| + |z| <= radius` around `center`, outward
/// winding. With integer inputs every vertex sits on an integer grid column.
pub fn octahedron_mesh(center: Point3<f64>, radius: f64) -> SurfaceMesh {
    let vertices = vec![
        center + Vector3::new(radius, 0.0, 0.0),
        center - Vector3::new(radius, 0.0, 0.0),
        center + Vector3::new(0.0, radius, 0.0),
        center - Vector3::new(0.0, radius, 0.0),
        center + Vector3::new(0.0, 0.0, radius),
        center - Vector3::new(0.0, 0.0, radius),
    ];
    let mut faces = Vec::new();
    for (x, sx) in [(0, 1.0), (1, -1.0)] {
        for (y, sy) in [(2, 1.0), (3, -1.0)] {
            for (z, sz) in [(4, 1.0), (5, -1.0)] {
                if sx * sy * sz > 0.0 {
                    faces.push([x, y, z]);
                } else {
                    faces.push([x, z, y]);
                }
            }
        }
    }
    SurfaceMesh::new(vertices, faces)
}

/// Closed latitude/longitude sphere with outward winding.
pub fn uv_sphere_mesh(center: Point3<f64>, radius: f64, stacks: usize, slices: usize) -> SurfaceMesh {
    let mut vertices = vec![center + Vector3::new(0.0, 0.0, radius)];
    for i in 1..stacks {
        let theta = PI * i as f64 / stacks as f64;
        for j in 0..slices {
            let phi = 2.0 * PI * j as f64 / slices as f64;
            vertices.push(
                center
                    + Vector3::new(
                        radius * theta.sin() * phi.cos(),
                        radius * theta.sin() * phi.sin(),
                        radius * theta.cos(),
                    ),
            );
        }
    }
    let south = vertices.len();
    vertices.push(center - Vector3::new(0.0, 0.0, radius));

    let ring = |i: usize, j: usize| 1 + (i - 1) * slices + (j % slices);
    let mut faces = Vec::new();
    for j in 0..slices {
        faces.push([0, ring(1, j), ring(1, j + 1)]);
    }
    for i in 1..stacks - 1 {
        for j in 0..slices {
            let (a, b, c, d) = (ring(i, j), ring(i + 1, j), ring(i + 1, j + 1), ring(i, j + 1));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }
    for j in 0..slices {
        faces.push([south, ring(stacks - 1, j + 1), ring(stacks - 1, j)]);
    }
    SurfaceMesh::new(vertices, faces)
}

/// `count` points along +x, `spacing` apart, starting at the origin.
pub fn line_cloud(count: usize, spacing: f64) -> Vec<Point3<f64>> {
    (0..count)
        .map(|i| Point3::new(i as f64 * spacing, 0.0, 0.0))
        .collect()
}
