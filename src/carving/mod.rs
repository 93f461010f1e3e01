//! Voxel carving: oriented regions and meshes rasterized into label volumes.

pub mod guide;
pub mod rasterize;

use nalgebra::{Point3, Rotation3, Vector3};

use crate::error::Result;
use crate::mesh::SurfaceMesh;
use crate::volume::{BinaryMask, ImageGeometry, LabelVolume};

/// Binary voxel selection on a target grid.
pub type Stencil = BinaryMask;

/// Oriented box in physical space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub center: Point3<f64>,
    /// Full edge lengths along the box's local x, y and z.
    pub extents: Vector3<f64>,
    /// Local-to-physical rotation.
    pub rotation: Rotation3<f64>,
}

impl Region {
    pub fn axis_aligned(center: Point3<f64>, extents: Vector3<f64>) -> Self {
        Self {
            center,
            extents,
            rotation: Rotation3::identity(),
        }
    }

    /// Box anchored at a landmark.
    ///
    /// The rotation is yaw about z, then pitch about x, then roll about y
    /// (`R = Rz(yaw) * Rx(pitch) * Ry(roll)`); `offset` is given in the
    /// rotated frame, so the center is `anchor + R * offset`.
    pub fn oriented(
        anchor: Point3<f64>,
        extents: Vector3<f64>,
        offset: Vector3<f64>,
        yaw: f64,
        pitch: f64,
        roll: f64,
    ) -> Self {
        let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), yaw)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), pitch)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), roll);
        Self {
            center: anchor + rotation * offset,
            extents,
            rotation,
        }
    }

    /// Inclusive containment test against the box faces.
    pub fn contains(&self, p: &Point3<f64>) -> bool {
        let local = self.rotation.inverse_transform_vector(&(p - self.center));
        (0..3).all(|axis| local[axis].abs() <= self.extents[axis] * 0.5 + 1e-9)
    }
}

/// Shape a carving call rasterizes.
#[derive(Debug, Clone, Copy)]
pub enum Primitive<'a> {
    Region(Region),
    /// Closed mesh in physical coordinates.
    Mesh(&'a SurfaceMesh),
}

impl Primitive<'_> {
    /// Voxels of `geometry` whose centers lie inside the primitive.
    pub fn stencil(&self, geometry: &ImageGeometry) -> Result<Stencil> {
        match self {
            Primitive::Region(region) => Ok(rasterize::rasterize_region(region, geometry)),
            Primitive::Mesh(mesh) => rasterize::rasterize_mesh(mesh, geometry),
        }
    }
}

/// Rasterizes `primitive` on `geometry` and raises the selected voxels of
/// `target` to `fill_value`.
///
/// With `fill_inside` unset the stencil is inverted and everything outside
/// the primitive is carved. Labels only ever grow: an earlier carve is never
/// erased by a later one.
pub fn carve(
    geometry: &ImageGeometry,
    primitive: &Primitive<'_>,
    fill_inside: bool,
    fill_value: u8,
    target: &mut LabelVolume,
) -> Result<()> {
    let mut stencil = primitive.stencil(geometry)?;
    if !fill_inside {
        for v in stencil.data.iter_mut() {
            *v = !*v;
        }
    }
    target.carve(&stencil, fill_value)
}
