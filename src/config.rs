use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Result, SurfaceCutError};

/// Upper bound on the decimation fraction; removing more triangles than this
/// visibly degrades the reconstructed surface.
pub const MAX_DECIMATION_FRACTION: f64 = 0.005;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Integer downsampling factor applied before thresholding (1 = none).
    pub downsample_factor: usize,
    /// Exclusive upper sentinel of the foreground intensity band.
    pub upper_threshold: f64,
    /// Margin added on every side so morphology does not clip at the border.
    pub pad_voxels: usize,
    /// Ellipsoidal dilation radius in voxels (i, j, k).
    pub dilate_radius: [usize; 3],
    /// Ellipsoidal erosion radius in voxels (i, j, k).
    pub erode_radius: [usize; 3],
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            downsample_factor: 2,
            upper_threshold: 10000.0,
            pad_voxels: 10,
            dilate_radius: [7, 7, 5],
            erode_radius: [5, 5, 3],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconstructionConfig {
    /// Number of Taubin low-pass iterations.
    pub smoothing_iterations: usize,
    /// Pass-band frequency of the low-pass filter. Smaller values smooth harder.
    pub pass_band: f64,
    /// Fraction of triangles removed by decimation, capped at
    /// [`MAX_DECIMATION_FRACTION`].
    pub decimation_fraction: f64,
    /// Longest edge (voxel units) a decimation collapse may remove.
    pub decimation_max_error: f64,
    /// Laplacian relaxation step after decimation.
    pub relaxation_factor: f64,
    pub relaxation_iterations: usize,
    /// Faces meeting at a sharper angle than this get split normals.
    pub feature_angle_deg: f64,
    pub split_normals: bool,
    /// Drop every surface component except the one with most faces.
    pub keep_largest_component: bool,
}

impl Default for ReconstructionConfig {
    fn default() -> Self {
        Self {
            smoothing_iterations: 10,
            pass_band: 0.1,
            decimation_fraction: 0.001,
            decimation_max_error: 1.0,
            relaxation_factor: 0.33,
            relaxation_iterations: 10,
            feature_angle_deg: 60.0,
            split_normals: true,
            keep_largest_component: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceConfig {
    /// Accepted consecutive curve points are never farther apart than this.
    pub gap_threshold: f64,
    /// Arc length fraction of the target at which the coarse sweep stops.
    pub coarse_fraction: f64,
    /// Coarse stride as a fraction of the candidate count.
    pub coarse_stride_fraction: f64,
    /// Target arc length of the sagittal reference curve.
    pub sagittal_length: f64,
    /// Target arc length of the coronal reference curve.
    pub coronal_length: f64,
    pub tube_radius: f64,
    pub tube_sides: usize,
    /// Trace the coronal curve over the left hemisphere instead of the right.
    pub use_left_hemisphere: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            gap_threshold: 50.0,
            coarse_fraction: 0.85,
            coarse_stride_fraction: 0.1,
            sagittal_length: 110.0,
            coronal_length: 30.0,
            tube_radius: 0.5,
            tube_sides: 8,
            use_left_hemisphere: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuideConfig {
    /// Wide region the guide is carved from, centered at the anchor.
    pub base_extents: [f64; 3],
    /// Narrow hook region removed from the base.
    pub hook_extents: [f64; 3],
    /// Hook center offset in the region frame.
    pub hook_offset: [f64; 3],
    /// Extra rotation of the regions on top of the landmark yaw (radians).
    pub yaw: f64,
    pub pitch: f64,
    pub roll: f64,
    pub fill_value: u8,
    /// Remove the head interior so the guide rests on the surface.
    pub subtract_surface: bool,
    /// Add the reference curve tubes back after the subtractions.
    pub carve_curves: bool,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            base_extents: [100.0, 50.0, 50.0],
            hook_extents: [40.0, 20.0, 20.0],
            hook_offset: [0.0, 0.0, 0.0],
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            fill_value: 1,
            subtract_surface: true,
            carve_curves: true,
        }
    }
}

/// Every tunable value of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfaceCutConfig {
    pub segmentation: SegmentationConfig,
    pub reconstruction: ReconstructionConfig,
    pub trace: TraceConfig,
    pub guide: GuideConfig,
}

impl SurfaceCutConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SurfaceCutConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Rejects values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(SurfaceCutError::InvalidConfig(msg.to_string()));

        if self.segmentation.downsample_factor == 0 {
            return invalid("segmentation.downsample_factor must be at least 1");
        }
        let r = &self.reconstruction;
        if !(r.pass_band > 0.0 && r.pass_band < 2.0) {
            return invalid("reconstruction.pass_band must lie in (0, 2)");
        }
        if !(0.0..=MAX_DECIMATION_FRACTION).contains(&r.decimation_fraction) {
            return invalid("reconstruction.decimation_fraction must lie in [0, 0.005]");
        }
        if !(0.0..=1.0).contains(&r.relaxation_factor) {
            return invalid("reconstruction.relaxation_factor must lie in [0, 1]");
        }
        let t = &self.trace;
        if t.gap_threshold <= 0.0 {
            return invalid("trace.gap_threshold must be positive");
        }
        if !(t.coarse_fraction > 0.0 && t.coarse_fraction <= 1.0) {
            return invalid("trace.coarse_fraction must lie in (0, 1]");
        }
        if !(t.coarse_stride_fraction > 0.0 && t.coarse_stride_fraction <= 1.0) {
            return invalid("trace.coarse_stride_fraction must lie in (0, 1]");
        }
        if t.sagittal_length <= 0.0 || t.coronal_length <= 0.0 {
            return invalid("trace lengths must be positive");
        }
        if t.tube_radius <= 0.0 || t.tube_sides < 3 {
            return invalid("trace tube needs a positive radius and at least 3 sides");
        }
        let g = &self.guide;
        if g.base_extents.iter().chain(g.hook_extents.iter()).any(|e| *e <= 0.0) {
            return invalid("guide extents must be positive");
        }
        Ok(())
    }
}
