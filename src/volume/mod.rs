pub mod morphology;
pub mod segmentation;

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};

use crate::error::{Result, SurfaceCutError};

/// Physical placement of a voxel grid.
///
/// Voxel `(i, j, k)` sits at `origin + direction * diag(spacing) * (i, j, k)`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    pub dims: [usize; 3],
    pub spacing: Vector3<f64>,
    pub origin: Point3<f64>,
    /// Columns are the physical directions of the i, j and k axes.
    pub direction: Matrix3<f64>,
}

impl ImageGeometry {
    pub fn new(dims: [usize; 3], spacing: Vector3<f64>, origin: Point3<f64>) -> Self {
        Self {
            dims,
            spacing,
            origin,
            direction: Matrix3::identity(),
        }
    }

    pub fn with_direction(mut self, direction: Matrix3<f64>) -> Self {
        self.direction = direction;
        self
    }

    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn linear_index(&self, i: usize, j: usize, k: usize) -> usize {
        i + j * self.dims[0] + k * self.dims[0] * self.dims[1]
    }

    /// Homogeneous index-to-physical matrix.
    pub fn index_to_physical_matrix(&self) -> Matrix4<f64> {
        let linear = self.direction * Matrix3::from_diagonal(&self.spacing);
        let mut m = linear.to_homogeneous();
        m.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.origin.coords);
        m
    }

    /// Homogeneous physical-to-index matrix.
    pub fn physical_to_index_matrix(&self) -> Result<Matrix4<f64>> {
        let m = self.index_to_physical_matrix();
        if m.determinant().abs() < 1e-12 {
            return Err(SurfaceCutError::DegenerateTransform);
        }
        m.try_inverse().ok_or(SurfaceCutError::DegenerateTransform)
    }

    /// Determinant of the linear part; negative means the transform mirrors.
    pub fn determinant(&self) -> f64 {
        (self.direction * Matrix3::from_diagonal(&self.spacing)).determinant()
    }

    pub fn index_to_physical(&self, index: &Point3<f64>) -> Point3<f64> {
        self.index_to_physical_matrix().transform_point(index)
    }

    /// Same grid grown by `margin` voxels on every side.
    pub fn padded(&self, margin: usize) -> ImageGeometry {
        let m = margin as f64;
        let shift = self.direction * Vector3::new(
            self.spacing.x * m,
            self.spacing.y * m,
            self.spacing.z * m,
        );
        ImageGeometry {
            dims: [
                self.dims[0] + 2 * margin,
                self.dims[1] + 2 * margin,
                self.dims[2] + 2 * margin,
            ],
            spacing: self.spacing,
            origin: self.origin - shift,
            direction: self.direction,
        }
    }

    /// Grid sampled every `factor` voxels, keeping the origin.
    pub fn downsampled(&self, factor: usize) -> ImageGeometry {
        let f = factor.max(1);
        ImageGeometry {
            dims: [
                (self.dims[0] / f).max(1),
                (self.dims[1] / f).max(1),
                (self.dims[2] / f).max(1),
            ],
            spacing: self.spacing * f as f64,
            origin: self.origin,
            direction: self.direction,
        }
    }
}

/// A scalar field on an [`ImageGeometry`], stored i-fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct VoxelGrid<T> {
    pub geometry: ImageGeometry,
    pub data: Vec<T>,
}

/// Raw scan intensities.
pub type VolumetricImage = VoxelGrid<f32>;
/// Foreground/background voxels.
pub type BinaryMask = VoxelGrid<bool>;
/// Integer labels, 0 = background.
pub type LabelVolume = VoxelGrid<u8>;

impl<T: Copy + Default> VoxelGrid<T> {
    /// Grid filled with `T::default()`.
    pub fn empty(geometry: ImageGeometry) -> Self {
        let data = vec![T::default(); geometry.voxel_count()];
        Self { geometry, data }
    }

    pub fn from_data(geometry: ImageGeometry, data: Vec<T>) -> Result<Self> {
        if data.len() != geometry.voxel_count() {
            return Err(SurfaceCutError::InsufficientInput(format!(
                "expected {} voxels for grid {:?}, got {}",
                geometry.voxel_count(),
                geometry.dims,
                data.len()
            )));
        }
        Ok(Self { geometry, data })
    }

    pub fn dims(&self) -> [usize; 3] {
        self.geometry.dims
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> T {
        self.data[self.geometry.linear_index(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: T) {
        let idx = self.geometry.linear_index(i, j, k);
        self.data[idx] = value;
    }

    fn ensure_same_shape<U>(&self, other: &VoxelGrid<U>) -> Result<()> {
        if self.geometry.dims != other.geometry.dims {
            return Err(SurfaceCutError::GeometryMismatch {
                expected: self.geometry.dims,
                found: other.geometry.dims,
            });
        }
        Ok(())
    }
}

impl BinaryMask {
    pub fn count_foreground(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }
}

impl LabelVolume {
    /// Raise every voxel selected by `stencil` to at least `value`.
    pub fn carve(&mut self, stencil: &BinaryMask, value: u8) -> Result<()> {
        self.ensure_same_shape(stencil)?;
        for (label, inside) in self.data.iter_mut().zip(stencil.data.iter()) {
            if *inside {
                *label = (*label).max(value);
            }
        }
        Ok(())
    }

    /// Voxelwise maximum with another label volume.
    pub fn combine_max(&mut self, other: &LabelVolume) -> Result<()> {
        self.ensure_same_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = (*a).max(*b);
        }
        Ok(())
    }

    /// Voxelwise `self - other`, clamped at zero.
    pub fn subtract(&mut self, other: &LabelVolume) -> Result<()> {
        self.ensure_same_shape(other)?;
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a = a.saturating_sub(*b);
        }
        Ok(())
    }

    /// Subtract `value` wherever `stencil` is set, clamped at zero.
    pub fn subtract_stencil(&mut self, stencil: &BinaryMask, value: u8) -> Result<()> {
        self.ensure_same_shape(stencil)?;
        for (label, inside) in self.data.iter_mut().zip(stencil.data.iter()) {
            if *inside {
                *label = label.saturating_sub(value);
            }
        }
        Ok(())
    }

    pub fn count_label(&self, value: u8) -> usize {
        self.data.iter().filter(|v| **v == value).count()
    }
}
