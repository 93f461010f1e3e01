//! Landmark planes, plane–surface intersection and length-bounded curve tracing.

pub mod intersection;
pub mod landmarks;
pub mod tracing;
pub mod tube;

use nalgebra::{Point3, Vector3};

use crate::error::{Result, SurfaceCutError};

/// Ordered anatomical landmarks in physical space.
///
/// Index 0 is the primary anchor (nasion), index 1 when present fixes the
/// patient yaw.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    points: Vec<Point3<f64>>,
}

impl Landmarks {
    pub fn new(points: Vec<Point3<f64>>) -> Result<Self> {
        if points.is_empty() {
            return Err(SurfaceCutError::InsufficientInput(
                "at least one landmark is required".to_string(),
            ));
        }
        Ok(Self { points })
    }

    pub fn anchor(&self) -> Point3<f64> {
        self.points[0]
    }

    pub fn secondary(&self) -> Option<Point3<f64>> {
        self.points.get(1).copied()
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Infinite plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub origin: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    /// Normalizes `normal`; a zero normal is degenerate.
    pub fn new(origin: Point3<f64>, normal: Vector3<f64>) -> Result<Self> {
        let len = normal.norm();
        if len < 1e-12 {
            return Err(SurfaceCutError::DegenerateTransform);
        }
        Ok(Self {
            origin,
            normal: normal / len,
        })
    }

    pub fn signed_distance(&self, p: &Point3<f64>) -> f64 {
        (p - self.origin).dot(&self.normal)
    }
}

/// Polyline with running arc length and a display/carving thickness.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedCurve {
    points: Vec<Point3<f64>>,
    /// Arc length up to and including each point; first entry is 0.
    cumulative: Vec<f64>,
    pub tube_radius: f64,
}

impl OrderedCurve {
    pub fn new(tube_radius: f64) -> Self {
        Self {
            points: Vec::new(),
            cumulative: Vec::new(),
            tube_radius,
        }
    }

    pub fn push(&mut self, point: Point3<f64>) {
        let length = match (self.points.last(), self.cumulative.last()) {
            (Some(last), Some(total)) => total + (point - last).norm(),
            _ => 0.0,
        };
        self.points.push(point);
        self.cumulative.push(length);
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn cumulative_lengths(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn arc_length(&self) -> f64 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Last accepted point; the anchor of the next trace.
    pub fn tip(&self) -> Option<Point3<f64>> {
        self.points.last().copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_curve_tracks_arc_length() {
        let mut curve = OrderedCurve::new(0.5);
        assert_eq!(curve.arc_length(), 0.0);
        assert!(curve.tip().is_none());
        curve.push(Point3::new(0.0, 0.0, 0.0));
        curve.push(Point3::new(3.0, 4.0, 0.0));
        curve.push(Point3::new(3.0, 4.0, 2.0));
        assert_relative_eq!(curve.arc_length(), 7.0);
        assert_eq!(curve.cumulative_lengths(), &[0.0, 5.0, 7.0]);
        assert_eq!(curve.tip(), Some(Point3::new(3.0, 4.0, 2.0)));
    }

    #[test]
    fn test_plane_normalizes_and_rejects_zero_normal() {
        let plane = Plane::new(Point3::new(1.0, 0.0, 0.0), Vector3::new(2.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(plane.normal.norm(), 1.0);
        assert_relative_eq!(plane.signed_distance(&Point3::new(4.0, 7.0, 7.0)), 3.0);
        assert!(matches!(
            Plane::new(Point3::origin(), Vector3::zeros()),
            Err(SurfaceCutError::DegenerateTransform)
        ));
    }

    #[test]
    fn test_landmarks_require_a_point() {
        assert!(matches!(
            Landmarks::new(Vec::new()),
            Err(SurfaceCutError::InsufficientInput(_))
        ));
        let lm = Landmarks::new(vec![Point3::new(1.0, 2.0, 3.0)]).unwrap();
        assert_eq!(lm.anchor(), Point3::new(1.0, 2.0, 3.0));
        assert!(lm.secondary().is_none());
    }
}
