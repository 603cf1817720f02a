//! Track geometry derived from the centerline: Bezier segments for native
//! curve drawing, offset rails, and cross ties.
//!
//! Everything here is pure geometry; styling is left to the renderer.

use serde::{Deserialize, Serialize};

use crate::arc_length::ArcLengthTable;
use crate::spline::{CubicSegment, SplineEvaluator};
use crate::types::{EngineError, Placement, Polyline, TrackConfig};

/// Upper bound on samples per rail or tie list.
///
/// Guards against a tiny step on a long curve allocating without limit.
const MAX_TRACK_SAMPLES: usize = 1_000_000;

/// Rails, ties and Bezier segments for one curve snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackGeometry {
    /// The `n` Bezier segments of the centerline.
    pub segments: Vec<CubicSegment>,
    /// Rail offset to the left of the travel direction.
    pub left_rail: Polyline,
    /// Rail offset to the right of the travel direction.
    pub right_rail: Polyline,
    /// Cross ties along the centerline.
    pub ties: Vec<Placement>,
}

impl TrackGeometry {
    /// Build the full track for one curve snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] for a non-positive step or
    /// spacing, [`EngineError::DegenerateTangent`] when a sample has no
    /// heading, and [`EngineError::ParameterOutOfRange`] on a zero-length
    /// curve.
    pub fn build(
        spline: &SplineEvaluator<'_>,
        table: &ArcLengthTable,
        config: &TrackConfig,
        tangent_epsilon: f64,
    ) -> Result<Self, EngineError> {
        let left_rail = rail_polyline(
            spline,
            table,
            config.rail_offset,
            config.rail_step,
            tangent_epsilon,
        )?;
        let right_rail = rail_polyline(
            spline,
            table,
            -config.rail_offset,
            config.rail_step,
            tangent_epsilon,
        )?;
        let ties = tie_placements(spline, table, config.tie_spacing, tangent_epsilon)?;
        Ok(Self {
            segments: bezier_segments(spline),
            left_rail,
            right_rail,
            ties,
        })
    }
}

/// The Bezier segments `(curr, cp1, cp2, next)` of the closed curve, one
/// per control point.
#[must_use]
pub fn bezier_segments(spline: &SplineEvaluator<'_>) -> Vec<CubicSegment> {
    spline.segments()
}

/// Arc lengths `0, step, 2·step, ...` strictly below `total`.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn arc_stations(total: f64, step: f64, what: &str) -> Result<Vec<f64>, EngineError> {
    if !(step.is_finite() && step > 0.0) {
        return Err(EngineError::InvalidConfig(format!(
            "{what} must be positive and finite, got {step}"
        )));
    }
    let count = (total / step).ceil();
    if !count.is_finite() || count > MAX_TRACK_SAMPLES as f64 {
        return Err(EngineError::InvalidConfig(format!(
            "{what} {step} is too small for a curve of length {total}"
        )));
    }
    Ok((0..count as usize)
        .map(|k| k as f64 * step)
        .filter(|&s| s < total)
        .collect())
}

/// One rail: the centerline offset sideways by `offset`, sampled every
/// `step` units of arc length.
///
/// Positive offsets lie to the left of the travel direction. The last
/// point sits at `L_total` and therefore repeats the first, so the rail
/// is closed.
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfig`] for a non-positive `step` or a
/// non-finite `offset`, [`EngineError::DegenerateTangent`] when a sample
/// has no heading, and [`EngineError::ParameterOutOfRange`] on a
/// zero-length curve.
pub fn rail_polyline(
    spline: &SplineEvaluator<'_>,
    table: &ArcLengthTable,
    offset: f64,
    step: f64,
    tangent_epsilon: f64,
) -> Result<Polyline, EngineError> {
    if !offset.is_finite() {
        return Err(EngineError::InvalidConfig(format!(
            "rail_offset must be finite, got {offset}"
        )));
    }
    let total = table.total_length();
    let mut stations = arc_stations(total, step, "rail_step")?;
    stations.push(total);

    let points = stations
        .into_iter()
        .map(|s| {
            let u = table.parameter_at_length(s)?;
            let center = spline.position(u)?;
            let normal = spline.direction(u, tangent_epsilon)?.perpendicular();
            Ok(center + normal * offset)
        })
        .collect::<Result<Vec<_>, EngineError>>()?;
    Ok(Polyline::new(points))
}

/// Cross ties every `spacing` units of arc length, oriented along the
/// centerline.
///
/// # Errors
///
/// Same as [`rail_polyline`].
pub fn tie_placements(
    spline: &SplineEvaluator<'_>,
    table: &ArcLengthTable,
    spacing: f64,
    tangent_epsilon: f64,
) -> Result<Vec<Placement>, EngineError> {
    let total = table.total_length();
    if total <= 0.0 {
        return Err(EngineError::ParameterOutOfRange { value: total });
    }
    arc_stations(total, spacing, "tie_spacing")?
        .into_iter()
        .map(|s| {
            let u = table.parameter_at_length(s)?;
            let position = spline.position(u)?;
            let tangent = spline.tangent(u, tangent_epsilon)?;
            Ok(Placement::new(position, tangent.angle()))
        })
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use super::*;
    use crate::types::{ControlPointSet, Point};

    fn square() -> ControlPointSet {
        ControlPointSet::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ])
    }

    #[test]
    fn bezier_segments_chain_through_control_points() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let segments = bezier_segments(&spline);
        assert_eq!(segments.len(), 5);
        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.start, set.points()[i]);
            assert_eq!(segment.end, set.points()[(i + 1) % 5]);
        }
    }

    #[test]
    fn zero_offset_rail_follows_centerline() {
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let rail = rail_polyline(&spline, &table, 0.0, 1.0, 1e-9).unwrap();
        for (k, point) in rail.points().iter().enumerate() {
            let s = (k as f64).min(table.total_length());
            let u = table.parameter_at_length(s).unwrap();
            let center = spline.position(u).unwrap();
            assert!(point.distance(center) < 1e-9, "sample {k}: {point:?}");
        }
    }

    #[test]
    fn rail_is_closed() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let rail = rail_polyline(&spline, &table, 15.0, 5.0, 1e-9).unwrap();
        let points = rail.points();
        assert_eq!(points.first(), points.last());
        let expected = (table.total_length() / 5.0).ceil() as usize + 1;
        assert_eq!(rail.len(), expected);
    }

    #[test]
    fn rail_keeps_constant_distance_from_centerline() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let rail = rail_polyline(&spline, &table, -15.0, 5.0, 1e-9).unwrap();
        for (k, point) in rail.points().iter().enumerate() {
            let s = (k as f64 * 5.0).min(table.total_length());
            let u = table.parameter_at_length(s).unwrap();
            let center = spline.position(u).unwrap();
            let d = point.distance(center);
            assert!((d - 15.0).abs() < 1e-9, "sample {k}: distance {d}");
        }
    }

    #[test]
    fn positive_offset_is_left_of_travel() {
        // Counter-clockwise square: left of travel is the interior.
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let step = table.total_length() / 8.0;
        let left = rail_polyline(&spline, &table, 1.0, step, 1e-9).unwrap();
        let right = rail_polyline(&spline, &table, -1.0, step, 1e-9).unwrap();
        // Sample 1 is the middle of the bottom edge, heading in +x.
        let l = left.points()[1];
        let r = right.points()[1];
        assert!((l.x - 5.0).abs() < 1e-6, "left {l:?}");
        assert!((r.x - 5.0).abs() < 1e-6, "right {r:?}");
        assert!((l.y - r.y - 2.0).abs() < 1e-6, "left {l:?} right {r:?}");
    }

    #[test]
    fn ties_are_evenly_spaced() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let ties = tie_placements(&spline, &table, 30.0, 1e-9).unwrap();
        let expected = (table.total_length() / 30.0).ceil() as usize;
        assert_eq!(ties.len(), expected);
        assert_eq!(ties[0].position, set.points()[0]);
    }

    #[test]
    fn invalid_steps_rejected() {
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        for step in [0.0, -1.0, f64::NAN, 1e-12] {
            assert!(matches!(
                rail_polyline(&spline, &table, 1.0, step, 1e-9),
                Err(EngineError::InvalidConfig(_))
            ));
            assert!(matches!(
                tie_placements(&spline, &table, step, 1e-9),
                Err(EngineError::InvalidConfig(_))
            ));
        }
        assert!(rail_polyline(&spline, &table, f64::INFINITY, 1.0, 1e-9).is_err());
    }

    #[test]
    fn zero_length_curve_has_no_track() {
        let set = ControlPointSet::new(vec![Point::new(3.0, 3.0); 4]);
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        assert!(matches!(
            rail_polyline(&spline, &table, 1.0, 1.0, 1e-9),
            Err(EngineError::ParameterOutOfRange { .. })
        ));
        assert!(matches!(
            tie_placements(&spline, &table, 1.0, 1e-9),
            Err(EngineError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn geometry_bundles_both_rails_and_ties() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let track = TrackGeometry::build(&spline, &table, &TrackConfig::default(), 1e-9).unwrap();
        assert_eq!(track.segments.len(), 5);
        assert_eq!(track.left_rail.len(), track.right_rail.len());
        let gap = track.left_rail.points()[0].distance(track.right_rail.points()[0]);
        assert!((gap - 30.0).abs() < 1e-9, "gauge {gap}");
        assert!(!track.ties.is_empty());
    }
}
