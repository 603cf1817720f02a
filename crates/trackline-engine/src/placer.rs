//! Object placement: turn one drive parameter into a placement per object.
//!
//! Object 0 is the leader; objects `1..count` trail behind it at a fixed
//! spacing. The [`SpeedMode`] decides what "spacing" and "drive" mean:
//! raw curve-parameter units, or physical length along the track.

use serde::{Deserialize, Serialize};

use crate::arc_length::ArcLengthTable;
use crate::cyclic::{wrap_behind_seam, wrap_scalar};
use crate::spline::SplineEvaluator;
use crate::types::{EngineConfig, EngineError, Placement};

/// Selects how the drive parameter maps to curve positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpeedMode {
    /// Use the drive parameter directly as the curve parameter.
    ///
    /// Objects move fast where control points are far apart and slow
    /// where they are close, and trailing objects bunch up or stretch
    /// out accordingly.
    RawParameter,

    /// Re-parameterize by arc length through the lookup table.
    ///
    /// Objects move at constant speed and trailing objects keep equal
    /// physical gaps regardless of curvature.
    #[default]
    ArcLength,
}

/// Places objects on one frame's curve.
///
/// Only reads the spline and the table, so calls for different objects
/// are independent of each other.
#[derive(Debug, Clone, Copy)]
pub struct ObjectPlacer<'a> {
    spline: SplineEvaluator<'a>,
    table: &'a ArcLengthTable,
    config: &'a EngineConfig,
}

impl<'a> ObjectPlacer<'a> {
    /// Bind a spline, its arc-length table and a configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when the configuration is
    /// invalid or the table was built for a curve with a different
    /// number of segments.
    pub fn new(
        spline: SplineEvaluator<'a>,
        table: &'a ArcLengthTable,
        config: &'a EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        if (table.period() - spline.period()).abs() > f64::EPSILON {
            return Err(EngineError::InvalidConfig(format!(
                "arc-length table covers {} segments but the curve has {}",
                table.period(),
                spline.segment_count(),
            )));
        }
        Ok(Self {
            spline,
            table,
            config,
        })
    }

    /// Curve parameter for object `index` at the given drive parameter.
    ///
    /// The drive parameter is in curve-parameter units; any finite value
    /// is accepted and reduced modulo `n`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParameterOutOfRange`] for a non-finite
    /// drive parameter or, in arc-length mode, a zero-length curve.
    #[allow(clippy::cast_precision_loss)]
    pub fn resolve_parameter(&self, drive: f64, index: usize) -> Result<f64, EngineError> {
        let n = self.spline.period();
        let behind = index as f64;
        match self.config.speed_mode {
            SpeedMode::RawParameter => {
                let raw = behind.mul_add(-self.config.parameter_spacing, drive);
                wrap_behind_seam(raw, n, self.config.seam_epsilon)
                    .ok_or(EngineError::ParameterOutOfRange { value: raw })
            }
            SpeedMode::ArcLength => {
                let total = self.table.total_length();
                let lead = wrap_scalar(drive, n)
                    .ok_or(EngineError::ParameterOutOfRange { value: drive })?;
                let target = behind.mul_add(-self.config.length_spacing, lead / n * total);
                let wrapped = wrap_behind_seam(target, total, self.config.seam_epsilon)
                    .ok_or(EngineError::ParameterOutOfRange { value: target })?;
                self.table.parameter_at_length(wrapped)
            }
        }
    }

    /// Placement of object `index` at the given drive parameter.
    ///
    /// # Errors
    ///
    /// Propagates [`resolve_parameter`](Self::resolve_parameter) errors
    /// and returns [`EngineError::DegenerateTangent`] when the heading is
    /// undefined at the resolved parameter.
    pub fn place(&self, drive: f64, index: usize) -> Result<Placement, EngineError> {
        let u = self.resolve_parameter(drive, index)?;
        let position = self.spline.position(u)?;
        let tangent = self.spline.tangent(u, self.config.tangent_epsilon)?;
        Ok(Placement::new(position, tangent.angle()))
    }

    /// Placements for every configured object, leader first.
    ///
    /// The pass is all-or-nothing: the first failing object aborts it and
    /// no partial list is returned.
    ///
    /// # Errors
    ///
    /// Same as [`place`](Self::place).
    pub fn place_all(&self, drive: f64) -> Result<Vec<Placement>, EngineError> {
        let placements = (0..self.config.object_count)
            .map(|index| self.place(drive, index))
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!(
            "placed {} objects at drive {drive} ({:?})",
            placements.len(),
            self.config.speed_mode,
        );
        Ok(placements)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::cast_precision_loss)]
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

    fn config(mode: SpeedMode, count: usize) -> EngineConfig {
        EngineConfig {
            speed_mode: mode,
            object_count: count,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn leader_in_raw_mode_follows_drive() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::RawParameter, 1);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        let placements = placer.place_all(2.0).unwrap();
        assert_eq!(placements.len(), 1);
        assert_eq!(placements[0].position, Point::new(100.0, 540.0));
    }

    #[test]
    fn raw_mode_trailing_objects_use_parameter_spacing() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::RawParameter, 3);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        let u1 = placer.resolve_parameter(1.0, 1).unwrap();
        let u2 = placer.resolve_parameter(1.0, 2).unwrap();
        assert!((u1 - 0.77).abs() < 1e-12);
        assert!((u2 - 0.54).abs() < 1e-12);
    }

    #[test]
    fn raw_mode_look_behind_wraps_past_start() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::RawParameter, 2);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        let u = placer.resolve_parameter(0.1, 1).unwrap();
        assert!((u - (5.0 - 0.13)).abs() < 1e-12, "got {u}");
    }

    #[test]
    fn arc_mode_leader_at_integer_drive_hits_matching_length() {
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::ArcLength, 1);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        // The square is symmetric, so a quarter of the perimeter is the
        // second corner.
        let p = placer.place(1.0, 0).unwrap();
        assert!(p.position.distance(Point::new(10.0, 0.0)) < 1e-6, "{p:?}");
    }

    #[test]
    fn arc_mode_trailing_objects_keep_equal_length_gaps() {
        let set = ControlPointSet::default_track();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = EngineConfig {
            length_spacing: 40.0,
            ..config(SpeedMode::ArcLength, 5)
        };
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        let drive = 0.3;
        let lead = placer.resolve_parameter(drive, 0).unwrap();
        for k in 1..5 {
            let u = placer.resolve_parameter(drive, k).unwrap();
            let gap = table.forward_distance(u, lead).unwrap();
            assert!(
                (gap - 40.0 * k as f64).abs() < 1e-6,
                "object {k}: gap {gap}"
            );
        }
    }

    #[test]
    fn orientation_follows_tangent() {
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::RawParameter, 1);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        // Midway along the bottom edge the curve heads in +x.
        let p = placer.place(0.5, 0).unwrap();
        assert!(p.orientation.abs() < 1e-12, "got {}", p.orientation);
        // Midway along the right edge it heads in +y.
        let p = placer.place(1.5, 0).unwrap();
        assert!((p.orientation - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn degenerate_tangent_aborts_whole_pass() {
        let set = ControlPointSet::new(vec![
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.0),
            Point::new(5.0, 5.0),
            Point::new(20.0, 0.0),
        ]);
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = EngineConfig {
            parameter_spacing: 1.0,
            ..config(SpeedMode::RawParameter, 3)
        };
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        // Leader at t = 2 is fine, the first car at t = 1 is degenerate.
        assert!(placer.place(2.0, 0).is_ok());
        assert!(matches!(
            placer.place_all(2.0),
            Err(EngineError::DegenerateTangent { .. })
        ));
    }

    #[test]
    fn zero_length_curve_fails_in_arc_mode() {
        let set = ControlPointSet::new(vec![Point::new(2.0, 2.0); 3]);
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::ArcLength, 1);
        let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
        assert!(matches!(
            placer.resolve_parameter(1.0, 0),
            Err(EngineError::ParameterOutOfRange { .. })
        ));
    }

    #[test]
    fn mismatched_table_rejected() {
        let big = ControlPointSet::default_track();
        let small = square();
        let big_spline = SplineEvaluator::new(&big).unwrap();
        let small_spline = SplineEvaluator::new(&small).unwrap();
        let table = ArcLengthTable::build(&big_spline, 0.1).unwrap();
        let config = EngineConfig::default();
        assert!(matches!(
            ObjectPlacer::new(small_spline, &table, &config),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn invalid_config_rejected() {
        let set = square();
        let spline = SplineEvaluator::new(&set).unwrap();
        let table = ArcLengthTable::build(&spline, 0.1).unwrap();
        let config = config(SpeedMode::ArcLength, 0);
        assert!(ObjectPlacer::new(spline, &table, &config).is_err());
    }

    #[test]
    fn speed_mode_default_is_arc_length() {
        assert_eq!(SpeedMode::default(), SpeedMode::ArcLength);
    }
}
