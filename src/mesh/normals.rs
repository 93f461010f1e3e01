use nalgebra::Vector3;

use super::SurfaceMesh;

/// Recomputes per-vertex normals as area-weighted averages of face normals.
///
/// With `split` set, faces around a vertex whose normals differ by more than
/// `feature_angle_deg` from the first face of a group get their own copy of
/// the vertex, so shading breaks cleanly along sharp edges.
pub fn compute_normals(mesh: &mut SurfaceMesh, feature_angle_deg: f64, split: bool) {
    if mesh.is_empty() {
        mesh.normals = None;
        return;
    }
    if split {
        split_feature_edges(mesh, feature_angle_deg.to_radians().cos());
    }

    let mut normals = vec![Vector3::zeros(); mesh.vertices.len()];
    for (f, face) in mesh.faces.iter().enumerate() {
        let cross = mesh.face_cross(f);
        for v in face {
            normals[*v] += cross;
        }
    }
    for n in normals.iter_mut() {
        let len = n.norm();
        if len > 0.0 {
            *n /= len;
        }
    }
    mesh.normals = Some(normals);
}

fn split_feature_edges(mesh: &mut SurfaceMesh, cos_limit: f64) {
    let original = mesh.vertices.len();
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); original];
    for (f, face) in mesh.faces.iter().enumerate() {
        for v in face {
            incident[*v].push(f);
        }
    }
    let face_normals: Vec<Vector3<f64>> = (0..mesh.faces.len())
        .map(|f| mesh.face_normal(f))
        .collect();

    let mut added = 0usize;
    for (v, faces) in incident.iter().enumerate() {
        // (seed normal, member faces)
        let mut groups: Vec<(Vector3<f64>, Vec<usize>)> = Vec::new();
        for f in faces {
            let n = face_normals[*f];
            let slot = if n == Vector3::zeros() {
                (!groups.is_empty()).then_some(0)
            } else {
                groups.iter().position(|(seed, _)| seed.dot(&n) >= cos_limit)
            };
            match slot {
                Some(g) => groups[g].1.push(*f),
                None => groups.push((n, vec![*f])),
            }
        }

        for (_, members) in groups.iter().skip(1) {
            let copy = mesh.vertices.len();
            mesh.vertices.push(mesh.vertices[v]);
            added += 1;
            for f in members {
                for idx in mesh.faces[*f].iter_mut() {
                    if *idx == v {
                        *idx = copy;
                    }
                }
            }
        }
    }
    if added > 0 {
        log::debug!("compute_normals: split {} vertices along feature edges", added);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{box_mesh, uv_sphere_mesh};
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_box_corners_split_into_three() {
        let mut mesh = box_mesh(Point3::origin(), [2.0, 2.0, 2.0]);
        compute_normals(&mut mesh, 60.0, true);
        assert_eq!(mesh.vertices.len(), 24);
        assert!(mesh.is_closed());
        let normals = mesh.normals.as_ref().unwrap();
        for (p, n) in mesh.vertices.iter().zip(normals) {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
            // axis aligned and pointing away from the center
            assert_relative_eq!(n.abs().max(), 1.0, epsilon = 1e-12);
            assert!(p.coords.dot(n) > 0.0);
        }
    }

    #[test]
    fn test_without_split_keeps_vertices() {
        let mut mesh = box_mesh(Point3::origin(), [2.0, 2.0, 2.0]);
        compute_normals(&mut mesh, 60.0, false);
        assert_eq!(mesh.vertices.len(), 8);
        let normals = mesh.normals.as_ref().unwrap();
        for (p, n) in mesh.vertices.iter().zip(normals) {
            assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-12);
            assert!(p.coords.dot(n) > 0.0);
        }
    }

    #[test]
    fn test_smooth_sphere_is_not_split() {
        let mut mesh = uv_sphere_mesh(Point3::origin(), 10.0, 12, 16);
        let count = mesh.vertices.len();
        compute_normals(&mut mesh, 60.0, true);
        assert_eq!(mesh.vertices.len(), count);
        let normals = mesh.normals.as_ref().unwrap();
        for (p, n) in mesh.vertices.iter().zip(normals) {
            assert!(p.coords.normalize().dot(n) > 0.95);
        }
    }
}
