use log::{debug, info};

use super::morphology::{dilate, erode, fill_holes};
use super::{BinaryMask, ImageGeometry, VolumetricImage};
use crate::config::SegmentationConfig;
use crate::error::{Result, SurfaceCutError};

/// Turns a raw scan into a closed binary mask of everything at or above
/// `threshold`: downsample, threshold, pad, dilate, erode, fill holes.
pub fn segment(
    image: &VolumetricImage,
    threshold: f64,
    config: &SegmentationConfig,
) -> Result<BinaryMask> {
    if image.is_empty() {
        return Err(SurfaceCutError::InsufficientInput(
            "volume has no voxel data".to_string(),
        ));
    }

    let resampled = downsample(image, config.downsample_factor);
    debug!(
        "segment: resampled {:?} -> {:?}",
        image.dims(),
        resampled.dims()
    );

    let thresholded = binary_threshold(&resampled, threshold, config.upper_threshold);
    let padded = pad(&thresholded, config.pad_voxels);
    let dilated = dilate(&padded, config.dilate_radius);
    let eroded = erode(&dilated, config.erode_radius);
    let filled = fill_holes(&eroded);

    info!(
        "segment: {} foreground voxels after threshold, {} after closing",
        thresholded.count_foreground(),
        filled.count_foreground()
    );
    Ok(filled)
}

/// Point-samples every `factor`-th voxel; spacing grows, origin is kept.
pub fn downsample(image: &VolumetricImage, factor: usize) -> VolumetricImage {
    if factor <= 1 {
        return image.clone();
    }
    let geometry = image.geometry.downsampled(factor);
    let [nx, ny, nz] = geometry.dims;
    let [sx, sy, sz] = image.dims();
    let mut data = Vec::with_capacity(geometry.voxel_count());
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let (x, y, z) = (
                    (i * factor).min(sx - 1),
                    (j * factor).min(sy - 1),
                    (k * factor).min(sz - 1),
                );
                data.push(image.get(x, y, z));
            }
        }
    }
    VolumetricImage { geometry, data }
}

/// Foreground where `lower <= value < upper`.
pub fn binary_threshold(image: &VolumetricImage, lower: f64, upper: f64) -> BinaryMask {
    let data = image
        .data
        .iter()
        .map(|v| {
            let v = *v as f64;
            v >= lower && v < upper
        })
        .collect();
    BinaryMask {
        geometry: image.geometry.clone(),
        data,
    }
}

/// Surrounds the mask with `margin` background voxels.
pub fn pad(mask: &BinaryMask, margin: usize) -> BinaryMask {
    if margin == 0 {
        return mask.clone();
    }
    let geometry: ImageGeometry = mask.geometry.padded(margin);
    let mut out = BinaryMask::empty(geometry);
    let [nx, ny, nz] = mask.dims();
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                if mask.get(i, j, k) {
                    out.set(i + margin, j + margin, k + margin, true);
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::sphere_volume;
    use approx::assert_relative_eq;
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_empty_volume_is_insufficient_input() {
        let geometry = ImageGeometry::new([0, 0, 0], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let image = VolumetricImage::empty(geometry);
        let err = segment(&image, 100.0, &SegmentationConfig::default()).unwrap_err();
        assert!(matches!(err, SurfaceCutError::InsufficientInput(_)));
    }

    #[test]
    fn test_threshold_band_is_half_open() {
        let geometry = ImageGeometry::new([4, 1, 1], Vector3::new(1.0, 1.0, 1.0), Point3::origin());
        let image = VolumetricImage::from_data(geometry, vec![99.0, 100.0, 500.0, 10000.0]).unwrap();
        let mask = binary_threshold(&image, 100.0, 10000.0);
        assert_eq!(mask.data, vec![false, true, true, false]);
    }

    #[test]
    fn test_downsample_doubles_spacing() {
        let image = sphere_volume(20, 6.0, 1.0);
        let small = downsample(&image, 2);
        assert_eq!(small.dims(), [10, 10, 10]);
        assert_relative_eq!(small.geometry.spacing.x, 2.0);
        assert_eq!(small.get(5, 5, 5), image.get(10, 10, 10));
    }

    #[test]
    fn test_segment_sphere_is_padded_and_solid() {
        let image = sphere_volume(24, 8.0, 1.0);
        let config = SegmentationConfig {
            downsample_factor: 1,
            pad_voxels: 3,
            dilate_radius: [2, 2, 1],
            erode_radius: [1, 1, 1],
            ..Default::default()
        };
        let mask = segment(&image, 100.0, &config).unwrap();
        assert_eq!(mask.dims(), [30, 30, 30]);
        // sphere center (12, 12, 12) moves to (15, 15, 15)
        assert!(mask.get(15, 15, 15));
        assert!(!mask.get(0, 0, 0));
        let raw = image.data.iter().filter(|v| **v >= 100.0).count();
        let closed = mask.count_foreground();
        assert!(closed >= raw);
        assert!((closed as f64) < raw as f64 * 2.0);
    }
}
