pub mod classes;

use classes::{to_points, to_tuples, PyMesh, PyPoint, PySurfaceCut, PyVolume};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;

use crate::config::SurfaceCutConfig;
use crate::entry::{build_surface, run_surface_cut};
use crate::trajectory::tracing::sort_points;
use crate::trajectory::Landmarks;

fn load_config(config_path: Option<&str>) -> PyResult<SurfaceCutConfig> {
    match config_path {
        Some(path) => SurfaceCutConfig::from_file(path)
            .map_err(|e| PyValueError::new_err(format!("failed to load config from {}: {}", path, e))),
        None => Ok(SurfaceCutConfig::default()),
    }
}

/// Runs the full surgical-access pipeline on one image.
///
/// Arguments:
///
/// - ``volume`` – ``PyVolume`` holding the head scan
/// - ``landmarks`` – Physical points, the first one anchors both curves
/// - ``threshold`` (default: 100.0) – Intensity separating tissue from air
/// - ``config_path`` (default: None) – Optional TOML file overriding defaults
///
/// Returns:
///
/// A ``PySurfaceCut`` with the surface mesh, the sagittal and coronal
/// curves, the clipped display model and the guide label volume.
///
/// Example:
///
/// .. code-block:: python
///
///    import surfacecut as sc
///    vol = sc.PyVolume((256, 256, 180), (1.0, 1.0, 1.0), (0.0, 0.0, 0.0), data)
///    out = sc.run_surface_cut(vol, [(128.0, 40.0, 90.0), (128.0, 200.0, 90.0)])
///    print(out.sagittal.arc_length)
#[pyfunction(name = "run_surface_cut")]
#[pyo3(signature = (volume, landmarks, threshold = 100.0, config_path = None))]
pub fn run_surface_cut_py(
    volume: &PyVolume,
    landmarks: Vec<PyPoint>,
    threshold: f64,
    config_path: Option<&str>,
) -> PyResult<PySurfaceCut> {
    let config = load_config(config_path)?;
    let image = volume.to_rust_volume()?;
    let landmarks =
        Landmarks::new(to_points(&landmarks)).map_err(|e| PyValueError::new_err(e.to_string()))?;

    let out = run_surface_cut(&image, &landmarks, threshold, &config)
        .map_err(|e| PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok(PySurfaceCut::from(&out))
}

/// Segments and reconstructs the skin surface only.
#[pyfunction(name = "build_surface")]
#[pyo3(signature = (volume, threshold = 100.0, config_path = None))]
pub fn build_surface_py(
    volume: &PyVolume,
    threshold: f64,
    config_path: Option<&str>,
) -> PyResult<PyMesh> {
    let config = load_config(config_path)?;
    let image = volume.to_rust_volume()?;
    let mesh = build_surface(&image, threshold, &config)
        .map_err(|e| PyRuntimeError::new_err(format!("{:#}", e)))?;
    Ok(PyMesh::from(&mesh))
}

/// Orders ``points`` by distance from ``anchor``, nearest first.
#[pyfunction(name = "sort_points")]
pub fn sort_points_py(points: Vec<PyPoint>, anchor: PyPoint) -> Vec<PyPoint> {
    let anchor = to_points(&[anchor])[0];
    to_tuples(&sort_points(to_points(&points), &anchor))
}
