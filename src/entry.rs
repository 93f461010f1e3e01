use anyhow::{Context, Result};
use log::info;

use crate::carving::guide::{base_region, build_guide, cut_surface};
use crate::config::SurfaceCutConfig;
use crate::mesh::reconstruction::reconstruct;
use crate::mesh::SurfaceMesh;
use crate::trajectory::tracing::{trace_coronal, trace_sagittal, SagittalTrace, TraceResult};
use crate::trajectory::Landmarks;
use crate::volume::segmentation::segment;
use crate::volume::{LabelVolume, VolumetricImage};

/// Everything the pipeline hands back for display and manufacturing.
#[derive(Debug, Clone)]
pub struct SurfaceCutOutput {
    /// Reconstructed skin surface, physical coordinates.
    pub mesh: SurfaceMesh,
    pub sagittal: SagittalTrace,
    pub coronal: TraceResult,
    /// Surface clipped to the base region with both curve tubes appended.
    pub cut_model: SurfaceMesh,
    /// Guide label volume on the input image grid.
    pub guide: LabelVolume,
}

/// Segments and reconstructs the surface of everything above `threshold`.
pub fn build_surface(
    image: &VolumetricImage,
    threshold: f64,
    config: &SurfaceCutConfig,
) -> Result<SurfaceMesh> {
    let mask = segment(image, threshold, &config.segmentation).context("segment() failed")?;
    let mesh = reconstruct(&mask, &config.reconstruction).context("reconstruct() failed")?;
    Ok(mesh)
}

/// Sagittal curve first, then the coronal curve anchored at its tip.
pub fn trace_curves(
    mesh: &SurfaceMesh,
    landmarks: &Landmarks,
    config: &SurfaceCutConfig,
) -> Result<(SagittalTrace, TraceResult)> {
    let sagittal =
        trace_sagittal(mesh, landmarks, &config.trace).context("trace_sagittal() failed")?;
    let coronal =
        trace_coronal(mesh, &sagittal, &config.trace).context("trace_coronal() failed")?;
    Ok((sagittal, coronal))
}

/// Full pipeline: surface, both reference curves, display model and guide.
pub fn run_surface_cut(
    image: &VolumetricImage,
    landmarks: &Landmarks,
    threshold: f64,
    config: &SurfaceCutConfig,
) -> Result<SurfaceCutOutput> {
    config.validate().context("configuration rejected")?;

    let mesh = build_surface(image, threshold, config)?;
    let (sagittal, coronal) = trace_curves(&mesh, landmarks, config)?;

    let curves = [&sagittal.result.curve, &coronal.curve];
    let base = base_region(sagittal.anchor, sagittal.frame.yaw, &config.guide);
    let cut_model = cut_surface(
        &mesh,
        &base,
        &curves,
        config.trace.tube_sides,
        config.reconstruction.feature_angle_deg,
    );
    let guide = build_guide(
        &image.geometry,
        sagittal.anchor,
        sagittal.frame.yaw,
        Some(&mesh),
        &curves,
        config.trace.tube_sides,
        &config.guide,
    )
    .context("build_guide() failed")?;

    info!(
        "run_surface_cut: sagittal {:.2}, coronal {:.2}, guide {} voxels",
        sagittal.result.curve.arc_length(),
        coronal.curve.arc_length(),
        guide.count_label(config.guide.fill_value)
    );

    Ok(SurfaceCutOutput {
        mesh,
        sagittal,
        coronal,
        cut_model,
        guide,
    })
}

/// Same as [`run_surface_cut`] with the configuration read from a TOML file.
pub fn run_surface_cut_from_file(
    image: &VolumetricImage,
    landmarks: &Landmarks,
    threshold: f64,
    config_path: &str,
) -> Result<SurfaceCutOutput> {
    let config = SurfaceCutConfig::from_file(config_path)
        .with_context(|| format!("failed to load config from {}", config_path))?;
    run_surface_cut(image, landmarks, threshold, &config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentationConfig;
    use crate::utils::test_utils::sphere_volume;
    use crate::volume::ImageGeometry;
    use nalgebra::{Point3, Vector3};

    fn quick_config() -> SurfaceCutConfig {
        let mut config = SurfaceCutConfig {
            segmentation: SegmentationConfig {
                downsample_factor: 1,
                pad_voxels: 3,
                dilate_radius: [2, 2, 1],
                erode_radius: [1, 1, 1],
                ..Default::default()
            },
            ..Default::default()
        };
        config.trace.sagittal_length = 40.0;
        config.trace.coronal_length = 20.0;
        config
    }

    #[test]
    fn test_pipeline_on_synthetic_head() {
        // ball of radius 36 around (48, 48, 48)
        let image = sphere_volume(48, 18.0, 2.0);
        let anchor = Point3::new(48.0, 11.0, 48.0);
        let landmarks =
            Landmarks::new(vec![anchor, Point3::new(48.0, -69.0, 48.0)]).unwrap();
        let config = quick_config();

        let out = run_surface_cut(&image, &landmarks, 100.0, &config).unwrap();
        assert!(out.mesh.signed_volume() > 0.0);

        let sagittal = &out.sagittal.result.curve;
        assert!(sagittal.arc_length() >= 0.85 * 40.0);
        assert!(sagittal.points().iter().all(|p| p.z >= anchor.z));

        let tip = out.sagittal.tip().unwrap();
        assert_eq!(out.coronal.curve.points()[0], tip);

        assert_eq!(out.guide.dims(), image.dims());
        assert!(out.guide.count_label(1) > 0);
        assert!(!out.cut_model.faces.is_empty());
    }

    #[test]
    fn test_empty_image_reports_stage() {
        let geometry = ImageGeometry::new([0, 0, 0], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let image = VolumetricImage::empty(geometry);
        let landmarks = Landmarks::new(vec![Point3::origin()]).unwrap();
        let err = run_surface_cut(&image, &landmarks, 100.0, &quick_config()).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("segment() failed"));
        assert!(message.contains("insufficient input"));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        let image = sphere_volume(8, 2.0, 1.0);
        let landmarks = Landmarks::new(vec![Point3::origin()]).unwrap();
        let err = run_surface_cut_from_file(&image, &landmarks, 100.0, "does/not/exist.toml")
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load config"));
    }
}
