use log::info;
use nalgebra::{Point3, Vector3};

use super::{carve, Primitive, Region};
use crate::config::GuideConfig;
use crate::error::Result;
use crate::mesh::normals::compute_normals;
use crate::mesh::SurfaceMesh;
use crate::trajectory::tube::tube_mesh;
use crate::trajectory::OrderedCurve;
use crate::volume::{ImageGeometry, LabelVolume};

/// Wide region the guide is carved from.
pub fn base_region(anchor: Point3<f64>, yaw: f64, config: &GuideConfig) -> Region {
    Region::oriented(
        anchor,
        Vector3::from(config.base_extents),
        Vector3::zeros(),
        yaw + config.yaw,
        config.pitch,
        config.roll,
    )
}

/// Narrow region removed from the base.
pub fn hook_region(anchor: Point3<f64>, yaw: f64, config: &GuideConfig) -> Region {
    Region::oriented(
        anchor,
        Vector3::from(config.hook_extents),
        Vector3::from(config.hook_offset),
        yaw + config.yaw,
        config.pitch,
        config.roll,
    )
}

/// Label volume of everything in `base` that is not also in `hook`.
///
/// Both boxes are carved into their own volumes and subtracted voxelwise,
/// clamped at zero.
pub fn base_minus_hook(
    geometry: &ImageGeometry,
    base: &Region,
    hook: &Region,
    fill_value: u8,
) -> Result<LabelVolume> {
    let mut label = LabelVolume::empty(geometry.clone());
    carve(geometry, &Primitive::Region(*base), true, fill_value, &mut label)?;
    let mut cut = LabelVolume::empty(geometry.clone());
    carve(geometry, &Primitive::Region(*hook), true, fill_value, &mut cut)?;
    label.subtract(&cut)?;
    Ok(label)
}

/// Carves the drill guide on `geometry`.
///
/// Order matters: base box, minus the surface interior (so the guide sits
/// on the skin), minus the hook box, then the curve tubes added back.
pub fn build_guide(
    geometry: &ImageGeometry,
    anchor: Point3<f64>,
    yaw: f64,
    surface: Option<&SurfaceMesh>,
    curves: &[&OrderedCurve],
    tube_sides: usize,
    config: &GuideConfig,
) -> Result<LabelVolume> {
    let base = base_region(anchor, yaw, config);
    let hook = hook_region(anchor, yaw, config);
    let mut guide = LabelVolume::empty(geometry.clone());
    carve(geometry, &Primitive::Region(base), true, config.fill_value, &mut guide)?;

    if config.subtract_surface {
        if let Some(mesh) = surface {
            let interior = Primitive::Mesh(mesh).stencil(geometry)?;
            guide.subtract_stencil(&interior, config.fill_value)?;
        }
    }

    let mut cut = LabelVolume::empty(geometry.clone());
    carve(geometry, &Primitive::Region(hook), true, config.fill_value, &mut cut)?;
    guide.subtract(&cut)?;

    if config.carve_curves {
        let mut tubes = LabelVolume::empty(geometry.clone());
        for curve in curves {
            let tube = tube_mesh(curve, tube_sides);
            if tube.is_empty() {
                continue;
            }
            carve(geometry, &Primitive::Mesh(&tube), true, config.fill_value, &mut tubes)?;
        }
        guide.combine_max(&tubes)?;
    }

    info!(
        "build_guide: {} voxels labeled {}",
        guide.count_label(config.fill_value),
        config.fill_value
    );
    Ok(guide)
}

/// Display model: the surface clipped to the base region plus the curve
/// tubes.
pub fn cut_surface(
    mesh: &SurfaceMesh,
    base: &Region,
    curves: &[&OrderedCurve],
    tube_sides: usize,
    feature_angle_deg: f64,
) -> SurfaceMesh {
    let mut clipped = mesh.clone();
    clipped.faces = mesh
        .faces
        .iter()
        .filter(|face| face.iter().all(|v| base.contains(&mesh.vertices[*v])))
        .copied()
        .collect();
    clipped.remove_unused_vertices();

    for curve in curves {
        let mut tube = tube_mesh(curve, tube_sides);
        if tube.is_empty() {
            continue;
        }
        if clipped.normals.is_some() {
            compute_normals(&mut tube, feature_angle_deg, true);
        }
        clipped.append(&tube);
    }
    clipped
}
