use log::{debug, info, warn};
use nalgebra::{Point3, Vector3};

use super::intersection::intersect_plane;
use super::landmarks::{build_sagittal_plane, SagittalFrame};
use super::{Landmarks, OrderedCurve, Plane};
use crate::config::TraceConfig;
use crate::error::{Result, SurfaceCutError};
use crate::mesh::SurfaceMesh;

/// Which side of the anchor a candidate point must lie on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisRule {
    /// Superior half: height (z) at or above the anchor.
    Sagittal,
    /// One hemisphere along `lateral_axis`, measured from the anchor.
    Coronal {
        lateral_axis: Vector3<f64>,
        use_left: bool,
    },
}

impl AxisRule {
    pub fn accepts(&self, point: &Point3<f64>, anchor: &Point3<f64>) -> bool {
        match self {
            AxisRule::Sagittal => point.z >= anchor.z,
            AxisRule::Coronal {
                lateral_axis,
                use_left,
            } => {
                let lateral = (point - anchor).dot(lateral_axis);
                if *use_left {
                    lateral <= 0.0
                } else {
                    lateral >= 0.0
                }
            }
        }
    }
}

/// How path construction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceOutcome {
    /// The final accepted point pushed the arc length past the target.
    ReachedTarget,
    /// Candidates ran out first; the curve is as long as they allowed.
    ExhaustedCandidates,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceResult {
    pub curve: OrderedCurve,
    pub outcome: TraceOutcome,
    /// Candidates skipped for jumping farther than the gap threshold.
    pub rejected: usize,
}

/// Output of the sagittal trace, carried explicitly into the coronal trace.
#[derive(Debug, Clone, PartialEq)]
pub struct SagittalTrace {
    pub frame: SagittalFrame,
    pub anchor: Point3<f64>,
    pub result: TraceResult,
}

impl SagittalTrace {
    pub fn tip(&self) -> Result<Point3<f64>> {
        self.result.curve.tip().ok_or_else(|| {
            SurfaceCutError::InsufficientInput("sagittal curve has no points".to_string())
        })
    }
}

/// Keeps points strictly closer than `target_length` to `anchor` that
/// satisfy `rule`.
pub fn filter_points(
    points: &[Point3<f64>],
    anchor: &Point3<f64>,
    target_length: f64,
    rule: &AxisRule,
) -> Vec<Point3<f64>> {
    points
        .iter()
        .filter(|p| (*p - anchor).norm() < target_length && rule.accepts(p, anchor))
        .copied()
        .collect()
}

/// Orders points by distance to the fixed `anchor`, nearest first.
///
/// Selection sort: each pass picks the remaining point nearest the anchor.
/// Ties keep their input order. Quadratic, which is fine for a single plane
/// cut; a spatial index could replace it as long as the ordering is kept.
pub fn sort_points(points: Vec<Point3<f64>>, anchor: &Point3<f64>) -> Vec<Point3<f64>> {
    let distances: Vec<f64> = points.iter().map(|p| (p - anchor).norm()).collect();
    let mut order: Vec<usize> = (0..points.len()).collect();
    for slot in 0..order.len() {
        let mut best = slot;
        for candidate in slot + 1..order.len() {
            if distances[order[candidate]] < distances[order[best]] {
                best = candidate;
            }
        }
        // shift rather than swap so equal distances keep input order
        let picked = order.remove(best);
        order.insert(slot, picked);
    }
    order.into_iter().map(|i| points[i]).collect()
}

/// Walks anchor-ordered candidates into a curve of about `target_length`.
///
/// The first point is always taken. A coarse sweep with a stride of
/// `coarse_stride_fraction` of the candidates runs until the arc length
/// passes `coarse_fraction * target_length`. A fine sweep then scans the
/// remaining candidates one at a time, measuring from the last coarse point,
/// and appends only the single candidate that carries the length past
/// `target_length`, or the final candidate when none does.
/// Any candidate farther than `gap_threshold` from the last accepted point
/// is skipped in both sweeps.
pub fn construct_path(ordered: &[Point3<f64>], target_length: f64, config: &TraceConfig) -> TraceResult {
    let mut curve = OrderedCurve::new(config.tube_radius);
    let mut rejected = 0;
    let Some(first) = ordered.first() else {
        return TraceResult {
            curve,
            outcome: TraceOutcome::ExhaustedCandidates,
            rejected,
        };
    };
    curve.push(*first);

    let n = ordered.len();
    let stride = ((config.coarse_stride_fraction * n as f64).floor() as usize).max(1);
    let coarse_target = config.coarse_fraction * target_length;
    let mut last = 0;

    let mut i = stride;
    while i < n && curve.arc_length() <= coarse_target {
        if (ordered[i] - ordered[last]).norm() > config.gap_threshold {
            rejected += 1;
        } else {
            curve.push(ordered[i]);
            last = i;
        }
        i += stride;
    }
    debug!(
        "construct_path: coarse sweep reached {:.2} with {} points (stride {})",
        curve.arc_length(),
        curve.len(),
        stride
    );

    let mut outcome = TraceOutcome::ExhaustedCandidates;
    let from = ordered[last];
    for (idx, candidate) in ordered.iter().enumerate().skip(last + 1) {
        let step = (candidate - from).norm();
        if step > config.gap_threshold {
            rejected += 1;
            continue;
        }
        if curve.arc_length() + step > target_length {
            curve.push(*candidate);
            outcome = TraceOutcome::ReachedTarget;
            break;
        }
        if idx == n - 1 {
            curve.push(*candidate);
        }
    }

    if rejected > 0 {
        warn!(
            "construct_path: rejected {} candidates farther than {} from the path",
            rejected, config.gap_threshold
        );
    }
    TraceResult {
        curve,
        outcome,
        rejected,
    }
}

/// Filter, order and walk an already intersected point cloud.
pub fn trace_points(
    points: &[Point3<f64>],
    anchor: &Point3<f64>,
    target_length: f64,
    rule: &AxisRule,
    config: &TraceConfig,
) -> Result<TraceResult> {
    let candidates = filter_points(points, anchor, target_length, rule);
    if candidates.is_empty() {
        return Err(SurfaceCutError::InsufficientInput(format!(
            "no candidates within {} of the anchor on the requested side",
            target_length
        )));
    }
    let ordered = sort_points(candidates, anchor);
    let result = construct_path(&ordered, target_length, config);
    info!(
        "trace: {} candidates -> {} points, arc length {:.2} of {:.2} ({:?})",
        ordered.len(),
        result.curve.len(),
        result.curve.arc_length(),
        target_length,
        result.outcome
    );
    Ok(result)
}

/// Cuts `mesh` with `plane` and traces the cut from `anchor`.
pub fn trace(
    mesh: &SurfaceMesh,
    plane: &Plane,
    anchor: &Point3<f64>,
    target_length: f64,
    rule: &AxisRule,
    config: &TraceConfig,
) -> Result<TraceResult> {
    let points = intersect_plane(mesh, plane)?;
    trace_points(&points, anchor, target_length, rule, config)
}

/// Sagittal curve from the anchor landmark over the superior surface.
pub fn trace_sagittal(
    mesh: &SurfaceMesh,
    landmarks: &Landmarks,
    config: &TraceConfig,
) -> Result<SagittalTrace> {
    let frame = build_sagittal_plane(landmarks)?;
    let anchor = landmarks.anchor();
    let result = trace(
        mesh,
        &frame.plane,
        &anchor,
        config.sagittal_length,
        &AxisRule::Sagittal,
        config,
    )?;
    Ok(SagittalTrace {
        frame,
        anchor,
        result,
    })
}

/// Coronal curve from the sagittal tip over the selected hemisphere.
///
/// The cut is seeded with the tip itself so the coronal curve starts where
/// the sagittal one ends.
pub fn trace_coronal(
    mesh: &SurfaceMesh,
    sagittal: &SagittalTrace,
    config: &TraceConfig,
) -> Result<TraceResult> {
    let tip = sagittal.tip()?;
    let plane = sagittal.frame.coronal_plane(tip)?;
    let mut points = intersect_plane(mesh, &plane)?;
    points.insert(0, tip);
    let rule = AxisRule::Coronal {
        lateral_axis: sagittal.frame.lateral_axis(),
        use_left: config.use_left_hemisphere,
    };
    trace_points(&points, &tip, config.coronal_length, &rule, config)
}
