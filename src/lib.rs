pub mod carving;
pub mod config;
pub mod entry;
pub mod error;
pub mod mesh;
pub mod trajectory;
pub mod volume;

mod utils;

#[cfg(feature = "python")]
mod binding;

pub use config::SurfaceCutConfig;
pub use entry::{run_surface_cut, run_surface_cut_from_file, SurfaceCutOutput};
pub use error::{Result, SurfaceCutError};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// This is the module importable from Python:
///
/// ```python
/// import surfacecut as sc
/// out = sc.run_surface_cut(volume, landmarks, 100.0)
/// ```
#[cfg(feature = "python")]
#[pymodule]
fn surfacecut(m: &Bound<'_, PyModule>) -> PyResult<()> {
    use binding::classes::{PyCurve, PyLabelVolume, PyMesh, PySurfaceCut, PyVolume};

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    m.add_function(wrap_pyfunction!(binding::run_surface_cut_py, m)?)?;
    m.add_function(wrap_pyfunction!(binding::build_surface_py, m)?)?;
    m.add_function(wrap_pyfunction!(binding::sort_points_py, m)?)?;

    m.add_class::<PyVolume>()?;
    m.add_class::<PyMesh>()?;
    m.add_class::<PyCurve>()?;
    m.add_class::<PyLabelVolume>()?;
    m.add_class::<PySurfaceCut>()?;
    Ok(())
}
