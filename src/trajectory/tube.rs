use nalgebra::{Point3, Vector3};
use std::f64::consts::TAU;

use super::OrderedCurve;
use crate::mesh::SurfaceMesh;

/// Closed tube of `curve.tube_radius` around the curve polyline.
///
/// Rings of `sides` vertices sit at every distinct curve point, oriented by
/// a parallel-transported frame, and both ends are capped. Curves with fewer
/// than two distinct points give an empty mesh.
pub fn tube_mesh(curve: &OrderedCurve, sides: usize) -> SurfaceMesh {
    let mut path: Vec<Point3<f64>> = Vec::with_capacity(curve.len());
    for p in curve.points() {
        if path.last().map_or(true, |last| (p - last).norm() > 1e-9) {
            path.push(*p);
        }
    }
    let sides = sides.max(3);
    let radius = curve.tube_radius;
    if path.len() < 2 || radius <= 0.0 {
        return SurfaceMesh::default();
    }

    let tangents: Vec<Vector3<f64>> = (0..path.len())
        .map(|i| {
            let prev = path[i.saturating_sub(1)];
            let next = path[(i + 1).min(path.len() - 1)];
            // a hairpin cancels the central difference; fall back to the forward one
            (next - prev)
                .try_normalize(1e-12)
                .or_else(|| (next - path[i]).try_normalize(1e-12))
                .unwrap_or_else(Vector3::x)
        })
        .collect();

    let mut normal = perpendicular(&tangents[0]);
    let mut vertices = Vec::with_capacity(path.len() * sides + 2);
    for (p, t) in path.iter().zip(&tangents) {
        // transport the previous normal onto this ring's plane
        let projected = normal - t * normal.dot(t);
        normal = if projected.norm() > 1e-9 {
            projected.normalize()
        } else {
            perpendicular(t)
        };
        let binormal = t.cross(&normal);
        for s in 0..sides {
            let angle = TAU * s as f64 / sides as f64;
            vertices.push(p + (normal * angle.cos() + binormal * angle.sin()) * radius);
        }
    }

    let ring = |i: usize, s: usize| i * sides + s % sides;
    let mut faces = Vec::with_capacity(2 * sides * path.len());
    for i in 0..path.len() - 1 {
        for s in 0..sides {
            let (a, b, c, d) = (ring(i, s), ring(i, s + 1), ring(i + 1, s + 1), ring(i + 1, s));
            faces.push([a, b, c]);
            faces.push([a, c, d]);
        }
    }

    let last = path.len() - 1;
    let start = vertices.len();
    vertices.push(path[0]);
    let end = vertices.len();
    vertices.push(path[last]);
    for s in 0..sides {
        faces.push([start, ring(0, s + 1), ring(0, s)]);
        faces.push([end, ring(last, s), ring(last, s + 1)]);
    }

    SurfaceMesh::new(vertices, faces)
}

fn perpendicular(v: &Vector3<f64>) -> Vector3<f64> {
    let helper = if v.x.abs() < 0.9 {
        Vector3::x()
    } else {
        Vector3::y()
    };
    v.cross(&helper).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_straight_tube_is_a_closed_prism() {
        let mut curve = OrderedCurve::new(0.5);
        curve.push(Point3::new(0.0, 0.0, 0.0));
        curve.push(Point3::new(5.0, 0.0, 0.0));
        curve.push(Point3::new(10.0, 0.0, 0.0));
        let mesh = tube_mesh(&curve, 8);
        assert!(mesh.is_closed());
        // regular octagon of circumradius 0.5, extruded by 10
        let octagon = 0.5 * 8.0 * 0.25 * (TAU / 8.0).sin();
        assert_relative_eq!(mesh.signed_volume(), octagon * 10.0, epsilon = 1e-9);
        for v in &mesh.vertices {
            assert!((v.y * v.y + v.z * v.z).sqrt() <= 0.5 + 1e-12);
        }
    }

    #[test]
    fn test_bent_tube_keeps_outward_winding() {
        let mut curve = OrderedCurve::new(1.0);
        for i in 0..10 {
            let a = i as f64 * 0.15;
            curve.push(Point3::new(20.0 * a.cos(), 20.0 * a.sin(), i as f64));
        }
        let mesh = tube_mesh(&curve, 12);
        assert!(mesh.is_closed());
        assert!(mesh.signed_volume() > 0.0);
    }

    #[test]
    fn test_duplicate_points_are_skipped() {
        let mut curve = OrderedCurve::new(0.5);
        curve.push(Point3::new(1.0, 1.0, 1.0));
        curve.push(Point3::new(1.0, 1.0, 1.0));
        assert!(tube_mesh(&curve, 8).is_empty());
        curve.push(Point3::new(1.0, 1.0, 4.0));
        let mesh = tube_mesh(&curve, 8);
        assert_eq!(mesh.vertices.len(), 2 * 8 + 2);
        assert!(mesh.is_closed());
    }
}
