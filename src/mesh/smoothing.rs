use nalgebra::{Point3, Vector3};

use super::SurfaceMesh;

/// Taubin lambda/mu low-pass filter.
///
/// `pass_band` is the frequency `k_pb` with `1/lambda + 1/mu = k_pb`; each
/// iteration shrinks with `lambda` and inflates with `mu`, removing voxel
/// staircase noise without the volume loss of plain Laplacian smoothing.
pub fn taubin_smooth(mesh: &mut SurfaceMesh, iterations: usize, pass_band: f64) {
    if iterations == 0 || mesh.is_empty() {
        return;
    }
    let lambda = 0.5;
    let mu = 1.0 / (pass_band - 1.0 / lambda);
    let neighbors = mesh.vertex_neighbors();
    for _ in 0..iterations {
        laplacian_step(&mut mesh.vertices, &neighbors, lambda);
        laplacian_step(&mut mesh.vertices, &neighbors, mu);
    }
}

/// Plain Laplacian relaxation: every vertex moves `factor` of the way
/// towards the centroid of its neighbours.
pub fn relax(mesh: &mut SurfaceMesh, iterations: usize, factor: f64) {
    if iterations == 0 || factor == 0.0 || mesh.is_empty() {
        return;
    }
    let neighbors = mesh.vertex_neighbors();
    for _ in 0..iterations {
        laplacian_step(&mut mesh.vertices, &neighbors, factor);
    }
}

fn laplacian_step(vertices: &mut [Point3<f64>], neighbors: &[Vec<usize>], factor: f64) {
    let offsets: Vec<Vector3<f64>> = vertices
        .iter()
        .zip(neighbors.iter())
        .map(|(v, adj)| {
            if adj.is_empty() {
                return Vector3::zeros();
            }
            let sum = adj
                .iter()
                .fold(Vector3::zeros(), |acc, n| acc + vertices[*n].coords);
            sum / adj.len() as f64 - v.coords
        })
        .collect();
    for (v, offset) in vertices.iter_mut().zip(offsets) {
        *v += offset * factor;
    }
}
