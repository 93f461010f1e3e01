use log::debug;
use nalgebra::{Point3, Vector3};

use super::{Landmarks, Plane};
use crate::error::Result;

/// Sagittal plane plus the patient yaw it was derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SagittalFrame {
    pub plane: Plane,
    /// Rotation about the vertical axis, radians.
    pub yaw: f64,
}

impl SagittalFrame {
    /// Left-right axis of the patient; the sagittal plane normal.
    pub fn lateral_axis(&self) -> Vector3<f64> {
        self.plane.normal
    }

    /// Anterior-posterior axis of the patient; the coronal plane normal.
    pub fn coronal_normal(&self) -> Vector3<f64> {
        Vector3::new(self.yaw.sin(), -self.yaw.cos(), 0.0)
    }

    /// Coronal plane through `tip`, perpendicular to the sagittal plane.
    pub fn coronal_plane(&self, tip: Point3<f64>) -> Result<Plane> {
        Plane::new(tip, self.coronal_normal())
    }
}

/// Patient yaw from the first two landmarks; zero with a single landmark.
pub fn yaw_angle(landmarks: &Landmarks) -> f64 {
    match landmarks.secondary() {
        Some(second) => {
            let first = landmarks.anchor();
            -(first.x - second.x).atan2(first.y - second.y)
        }
        None => 0.0,
    }
}

/// Vertical plane through the anchor landmark whose normal follows the
/// patient yaw: `(cos yaw, sin yaw, 0)`.
pub fn build_sagittal_plane(landmarks: &Landmarks) -> Result<SagittalFrame> {
    let yaw = yaw_angle(landmarks);
    let plane = Plane::new(landmarks.anchor(), Vector3::new(yaw.cos(), yaw.sin(), 0.0))?;
    debug!(
        "sagittal plane: origin {:?}, yaw {:.3} rad",
        plane.origin, yaw
    );
    Ok(SagittalFrame { plane, yaw })
}
