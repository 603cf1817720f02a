//! Integration tests: place objects on whole curves through the public API.

#![allow(clippy::unwrap_used, clippy::cast_precision_loss)]

use trackline_engine::{
    ArcLengthTable, ControlPointSet, EngineConfig, EngineError, ObjectPlacer, Point, SpeedMode,
    SplineEvaluator, place_frame,
};

fn unit_square() -> ControlPointSet {
    ControlPointSet::new(vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ])
}

#[test]
fn unit_square_scenario() {
    let set = unit_square();
    let spline = SplineEvaluator::new(&set).unwrap();
    assert_eq!(spline.position(0.0).unwrap(), Point::new(0.0, 0.0));
    assert_eq!(spline.position(2.0).unwrap(), Point::new(10.0, 10.0));

    let table = ArcLengthTable::build(&spline, 0.1).unwrap();
    let total = table.total_length();
    let config = EngineConfig {
        speed_mode: SpeedMode::ArcLength,
        object_count: 2,
        length_spacing: 5.0,
        ..EngineConfig::default()
    };
    let placer = ObjectPlacer::new(spline, &table, &config).unwrap();

    // Put the leader 5 units past the middle of the first edge so the
    // trailing object lands on the middle itself.
    let drive = (total / 8.0 + 5.0) / total * spline.period();
    let placements = placer.place_all(drive).unwrap();
    assert_eq!(placements.len(), 2);

    let u = placer.resolve_parameter(drive, 1).unwrap();
    let from_start = table.forward_distance(0.0, u).unwrap();
    let to_next = table.forward_distance(u, 1.0).unwrap();
    assert!(
        (from_start - to_next).abs() < 1e-6,
        "second object should sit halfway between corners: {from_start} vs {to_next}"
    );

    // Midway along the bottom edge by symmetry, heading in +x.
    let car = placements[1];
    assert!((car.position.x - 5.0).abs() < 1e-6, "{car:?}");
    assert!(car.orientation.abs() < 1e-6, "{car:?}");

    let gap = table
        .forward_distance(u, placer.resolve_parameter(drive, 0).unwrap())
        .unwrap();
    assert!((gap - 5.0).abs() < 1e-6, "leader gap {gap}");
}

#[test]
fn boundary_wrap_matches_start_in_both_modes() {
    let set = ControlPointSet::default_track();
    let start = set.points()[0];
    let n = set.len() as f64;
    for mode in [SpeedMode::RawParameter, SpeedMode::ArcLength] {
        let config = EngineConfig {
            speed_mode: mode,
            ..EngineConfig::default()
        };
        for drive in [n, 2.0 * n, -n, 0.0] {
            let placements = place_frame(&set, drive, &config).unwrap();
            let d = placements[0].position.distance(start);
            assert!(d < 1e-9, "{mode:?} at drive {drive}: off by {d}");
        }
    }
}

#[test]
fn drive_just_below_period_stays_near_end() {
    let set = ControlPointSet::default_track();
    let n = set.len() as f64;
    let config = EngineConfig::default();
    let placements = place_frame(&set, n - 1e-12, &config).unwrap();
    let d = placements[0].position.distance(set.points()[0]);
    assert!(d < 1e-6, "off by {d}");
}

#[test]
fn trailing_objects_wrap_behind_the_seam() {
    let set = ControlPointSet::default_track();
    let config = EngineConfig {
        object_count: 8,
        ..EngineConfig::default()
    };
    // Leader at the start: every car sits behind the seam.
    let placements = place_frame(&set, 0.0, &config).unwrap();
    assert_eq!(placements.len(), 8);
    for placement in &placements {
        assert!(placement.position.x.is_finite() && placement.position.y.is_finite());
        assert!(placement.orientation.is_finite());
    }
}

#[test]
fn constant_speed_spacing_holds_everywhere() {
    let set = ControlPointSet::default_track();
    let spline = SplineEvaluator::new(&set).unwrap();
    let table = ArcLengthTable::build(&spline, 0.05).unwrap();
    let total = table.total_length();
    let config = EngineConfig {
        object_count: 6,
        ..EngineConfig::default()
    };
    let placer = ObjectPlacer::new(spline, &table, &config).unwrap();

    for step in 0..40 {
        let drive = f64::from(step) * 0.125;
        let lead = placer.resolve_parameter(drive, 0).unwrap();
        for k in 1..6 {
            let u = placer.resolve_parameter(drive, k).unwrap();
            let gap = table.forward_distance(u, lead).unwrap();
            let expected = (k as f64 * config.length_spacing).rem_euclid(total);
            assert!(
                (gap - expected).abs() < 1e-6,
                "drive {drive}, object {k}: gap {gap}, expected {expected}"
            );
        }
    }
}

#[test]
fn raw_mode_gaps_follow_control_point_spacing() {
    // Uneven points: equal parameter steps give unequal lengths.
    let set = ControlPointSet::default_track();
    let spline = SplineEvaluator::new(&set).unwrap();
    let table = ArcLengthTable::build(&spline, 0.1).unwrap();
    let config = EngineConfig {
        speed_mode: SpeedMode::RawParameter,
        object_count: 2,
        parameter_spacing: 0.5,
        ..EngineConfig::default()
    };
    let placer = ObjectPlacer::new(spline, &table, &config).unwrap();
    let gaps: Vec<f64> = [1.0, 3.5]
        .into_iter()
        .map(|drive| {
            let lead = placer.resolve_parameter(drive, 0).unwrap();
            let car = placer.resolve_parameter(drive, 1).unwrap();
            table.forward_distance(car, lead).unwrap()
        })
        .collect();
    assert!(
        (gaps[0] - gaps[1]).abs() > 1.0,
        "raw spacing should vary with the curve: {gaps:?}"
    );
}

#[test]
fn inversion_round_trips_on_irregular_track() {
    let set = ControlPointSet::default_track();
    let spline = SplineEvaluator::new(&set).unwrap();
    let table = ArcLengthTable::build(&spline, 0.1).unwrap();
    let samples = table.samples();
    for window in samples.windows(2) {
        assert!(window[1].a >= window[0].a, "table must be monotonic");
    }
    for row in &samples[..samples.len() - 1] {
        let u = table.parameter_at_length(row.a).unwrap();
        assert!((u - row.u).abs() < 1e-9, "row {row:?} came back as {u}");
    }
}

#[test]
fn two_points_are_rejected_everywhere() {
    let set = ControlPointSet::new(vec![Point::new(0.0, 0.0), Point::new(5.0, 5.0)]);
    assert!(matches!(
        SplineEvaluator::new(&set),
        Err(EngineError::InsufficientControlPoints { count: 2 })
    ));
    assert!(matches!(
        SplineEvaluator::from_points(set.points()),
        Err(EngineError::InsufficientControlPoints { count: 2 })
    ));
    for mode in [SpeedMode::RawParameter, SpeedMode::ArcLength] {
        let config = EngineConfig {
            speed_mode: mode,
            ..EngineConfig::default()
        };
        assert!(matches!(
            place_frame(&set, 0.0, &config),
            Err(EngineError::InsufficientControlPoints { count: 2 })
        ));
    }
}

#[test]
fn config_survives_json_round_trip() {
    let config = EngineConfig {
        speed_mode: SpeedMode::RawParameter,
        object_count: 5,
        ..EngineConfig::default()
    };
    let json = serde_json::to_string(&config).unwrap();
    let back: EngineConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);

    let partial: EngineConfig = serde_json::from_str(r#"{"object_count": 3}"#).unwrap();
    assert_eq!(partial.object_count, 3);
    assert_eq!(partial.speed_mode, SpeedMode::ArcLength);
}
