use nalgebra::{Matrix3, Point3, Vector3};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::entry::SurfaceCutOutput;
use crate::mesh::SurfaceMesh;
use crate::trajectory::tracing::{TraceOutcome, TraceResult};
use crate::trajectory::tube::tube_mesh;
use crate::trajectory::OrderedCurve;
use crate::volume::{ImageGeometry, LabelVolume, VolumetricImage};

pub type PyPoint = (f64, f64, f64);

fn to_tuple(p: &Point3<f64>) -> PyPoint {
    (p.x, p.y, p.z)
}

fn to_point(t: &PyPoint) -> Point3<f64> {
    Point3::new(t.0, t.1, t.2)
}

/// Scalar volume with its physical placement.
///
/// Attributes:
///     dims (tuple[int, int, int]): Voxel counts along i, j, k
///     spacing (tuple[float, float, float]): Voxel size in mm
///     origin (tuple[float, float, float]): Physical position of voxel (0, 0, 0)
///     direction (list[list[float]]): 3x3 row-major direction cosines
///     data (list[float]): Intensities, i fastest
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyVolume {
    #[pyo3(get, set)]
    pub dims: (usize, usize, usize),
    #[pyo3(get, set)]
    pub spacing: PyPoint,
    #[pyo3(get, set)]
    pub origin: PyPoint,
    #[pyo3(get, set)]
    pub direction: [[f64; 3]; 3],
    #[pyo3(get, set)]
    pub data: Vec<f32>,
}

#[pymethods]
impl PyVolume {
    #[new]
    #[pyo3(signature = (dims, spacing, origin, data, direction = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]))]
    fn new(
        dims: (usize, usize, usize),
        spacing: PyPoint,
        origin: PyPoint,
        data: Vec<f32>,
        direction: [[f64; 3]; 3],
    ) -> Self {
        Self {
            dims,
            spacing,
            origin,
            direction,
            data,
        }
    }

    fn __repr__(&self) -> String {
        format!(
            "Volume(dims={:?}, spacing=({:.3}, {:.3}, {:.3}))",
            self.dims, self.spacing.0, self.spacing.1, self.spacing.2
        )
    }
}

impl PyVolume {
    fn geometry(&self) -> ImageGeometry {
        let d = self.direction;
        let direction = Matrix3::new(
            d[0][0], d[0][1], d[0][2], d[1][0], d[1][1], d[1][2], d[2][0], d[2][1], d[2][2],
        );
        ImageGeometry::new(
            [self.dims.0, self.dims.1, self.dims.2],
            Vector3::new(self.spacing.0, self.spacing.1, self.spacing.2),
            to_point(&self.origin),
        )
        .with_direction(direction)
    }

    pub fn to_rust_volume(&self) -> PyResult<VolumetricImage> {
        VolumetricImage::from_data(self.geometry(), self.data.clone())
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }
}

/// Triangle mesh in physical coordinates.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyMesh {
    #[pyo3(get)]
    pub vertices: Vec<PyPoint>,
    #[pyo3(get)]
    pub faces: Vec<(usize, usize, usize)>,
    #[pyo3(get)]
    pub normals: Option<Vec<PyPoint>>,
}

#[pymethods]
impl PyMesh {
    fn __repr__(&self) -> String {
        format!(
            "Mesh(vertices={}, faces={})",
            self.vertices.len(),
            self.faces.len()
        )
    }
}

impl From<&SurfaceMesh> for PyMesh {
    fn from(mesh: &SurfaceMesh) -> Self {
        Self {
            vertices: mesh.vertices.iter().map(to_tuple).collect(),
            faces: mesh.faces.iter().map(|f| (f[0], f[1], f[2])).collect(),
            normals: mesh
                .normals
                .as_ref()
                .map(|ns| ns.iter().map(|n| (n.x, n.y, n.z)).collect()),
        }
    }
}

/// Traced reference curve.
///
/// Attributes:
///     points (list[tuple[float, float, float]]): Ordered curve points
///     arc_length (float): Length of the polyline
///     tube_radius (float): Display and carving thickness
///     reached_target (bool): False when candidates ran out early
///     rejected (int): Candidates dropped by the gap threshold
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyCurve {
    #[pyo3(get)]
    pub points: Vec<PyPoint>,
    #[pyo3(get)]
    pub arc_length: f64,
    #[pyo3(get)]
    pub tube_radius: f64,
    #[pyo3(get)]
    pub reached_target: bool,
    #[pyo3(get)]
    pub rejected: usize,
}

#[pymethods]
impl PyCurve {
    /// Closed tube mesh around the curve.
    #[pyo3(signature = (sides = 8))]
    fn tube(&self, sides: usize) -> PyMesh {
        let mut curve = OrderedCurve::new(self.tube_radius);
        for p in &self.points {
            curve.push(to_point(p));
        }
        PyMesh::from(&tube_mesh(&curve, sides))
    }

    fn __repr__(&self) -> String {
        format!(
            "Curve(points={}, arc_length={:.2}, reached_target={})",
            self.points.len(),
            self.arc_length,
            self.reached_target
        )
    }
}

impl From<&TraceResult> for PyCurve {
    fn from(result: &TraceResult) -> Self {
        Self {
            points: result.curve.points().iter().map(to_tuple).collect(),
            arc_length: result.curve.arc_length(),
            tube_radius: result.curve.tube_radius,
            reached_target: result.outcome == TraceOutcome::ReachedTarget,
            rejected: result.rejected,
        }
    }
}

/// Label volume on the input image grid, 0 = background.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PyLabelVolume {
    #[pyo3(get)]
    pub dims: (usize, usize, usize),
    #[pyo3(get)]
    pub spacing: PyPoint,
    #[pyo3(get)]
    pub origin: PyPoint,
    #[pyo3(get)]
    pub data: Vec<u8>,
}

#[pymethods]
impl PyLabelVolume {
    /// Number of voxels carrying `label`.
    fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|v| **v == label).count()
    }

    fn __repr__(&self) -> String {
        format!("LabelVolume(dims={:?})", self.dims)
    }
}

impl From<&LabelVolume> for PyLabelVolume {
    fn from(label: &LabelVolume) -> Self {
        let g = &label.geometry;
        Self {
            dims: (g.dims[0], g.dims[1], g.dims[2]),
            spacing: (g.spacing.x, g.spacing.y, g.spacing.z),
            origin: to_tuple(&g.origin),
            data: label.data.clone(),
        }
    }
}

/// Everything `run_surface_cut` produces.
#[pyclass]
#[derive(Debug, Clone)]
pub struct PySurfaceCut {
    #[pyo3(get)]
    pub mesh: PyMesh,
    #[pyo3(get)]
    pub sagittal: PyCurve,
    #[pyo3(get)]
    pub coronal: PyCurve,
    #[pyo3(get)]
    pub cut_model: PyMesh,
    #[pyo3(get)]
    pub guide: PyLabelVolume,
    /// Patient yaw derived from the landmarks, radians.
    #[pyo3(get)]
    pub yaw: f64,
}

impl From<&SurfaceCutOutput> for PySurfaceCut {
    fn from(out: &SurfaceCutOutput) -> Self {
        Self {
            mesh: PyMesh::from(&out.mesh),
            sagittal: PyCurve::from(&out.sagittal.result),
            coronal: PyCurve::from(&out.coronal),
            cut_model: PyMesh::from(&out.cut_model),
            guide: PyLabelVolume::from(&out.guide),
            yaw: out.sagittal.frame.yaw,
        }
    }
}

pub fn to_points(points: &[PyPoint]) -> Vec<Point3<f64>> {
    points.iter().map(to_point).collect()
}

pub fn to_tuples(points: &[Point3<f64>]) -> Vec<PyPoint> {
    points.iter().map(to_tuple).collect()
}
