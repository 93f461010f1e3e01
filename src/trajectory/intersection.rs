use log::debug;
use nalgebra::Point3;
use std::collections::HashSet;

use super::Plane;
use crate::error::{Result, SurfaceCutError};
use crate::mesh::SurfaceMesh;

const ON_PLANE_EPS: f64 = 1e-10;

/// Points where mesh edges cross `plane`, as an unordered cloud.
///
/// Each edge is visited once even though two faces share it; a vertex lying
/// on the plane is reported once.
pub fn intersect_plane(mesh: &SurfaceMesh, plane: &Plane) -> Result<Vec<Point3<f64>>> {
    if mesh.is_empty() {
        return Err(SurfaceCutError::InsufficientInput(
            "cannot cut an empty mesh".to_string(),
        ));
    }

    let distances: Vec<f64> = mesh
        .vertices
        .iter()
        .map(|v| plane.signed_distance(v))
        .collect();

    let mut points = Vec::new();
    let mut seen_edges: HashSet<(usize, usize)> = HashSet::new();
    let mut seen_vertices: HashSet<usize> = HashSet::new();

    for [a, b, c] in &mesh.faces {
        for (u, v) in [(*a, *b), (*b, *c), (*c, *a)] {
            let (du, dv) = (distances[u], distances[v]);
            for (w, dw) in [(u, du), (v, dv)] {
                if dw.abs() <= ON_PLANE_EPS && seen_vertices.insert(w) {
                    points.push(mesh.vertices[w]);
                }
            }
            if du.abs() <= ON_PLANE_EPS || dv.abs() <= ON_PLANE_EPS {
                continue;
            }
            if (du > 0.0) == (dv > 0.0) {
                continue;
            }
            if !seen_edges.insert((u.min(v), u.max(v))) {
                continue;
            }
            let t = du / (du - dv);
            let (pu, pv) = (mesh.vertices[u], mesh.vertices[v]);
            points.push(pu + (pv - pu) * t);
        }
    }

    if points.is_empty() {
        return Err(SurfaceCutError::NoIntersection);
    }
    debug!("intersect_plane: {} points", points.len());
    Ok(points)
}
