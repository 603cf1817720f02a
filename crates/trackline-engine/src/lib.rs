//! trackline-engine: Closed Catmull-Rom track curves (sans-IO).
//!
//! Turns a small set of control points into a smooth closed curve and
//! places a train of objects on it:
//! control points -> spline evaluation -> arc-length table ->
//! object placement (position + heading).
//!
//! Objects can move either with the raw curve parameter, where speed
//! varies with control-point spacing, or at constant speed through an
//! arc-length re-parameterization.
//!
//! This crate has **no I/O dependencies**. It operates on in-memory
//! points and returns structured data; drawing, input handling and the
//! animation clock belong to the caller.

pub mod arc_length;
pub mod cyclic;
pub mod diagnostics;
pub mod driver;
pub mod placer;
pub mod spline;
pub mod track;
pub mod types;

pub use arc_length::{ArcLengthSample, ArcLengthTable};
pub use diagnostics::FrameDiagnostics;
pub use driver::{Frame, FrameDriver};
pub use placer::{ObjectPlacer, SpeedMode};
pub use spline::{CubicSegment, SplineEvaluator};
pub use track::TrackGeometry;
pub use types::{
    ControlPointSet, EngineConfig, EngineError, MIN_CONTROL_POINTS, Placement, Point, Polyline,
    TrackConfig,
};

/// Place every configured object for one frame, without caching.
///
/// Builds the spline and its arc-length table from scratch and runs one
/// placement pass. Callers that render many frames of the same curve
/// should use a [`FrameDriver`] instead, which only rebuilds the table
/// when the control points change.
///
/// # Examples
///
/// ```
/// use trackline_engine::{place_frame, ControlPointSet, EngineConfig, SpeedMode};
///
/// let points = ControlPointSet::default_track();
/// let config = EngineConfig {
///     speed_mode: SpeedMode::RawParameter,
///     ..EngineConfig::default()
/// };
/// let placements = place_frame(&points, 0.0, &config)?;
/// assert_eq!(placements[0].position, points.points()[0]);
/// # Ok::<(), trackline_engine::EngineError>(())
/// ```
///
/// # Errors
///
/// Returns [`EngineError::InvalidConfig`] for an invalid configuration,
/// [`EngineError::InsufficientControlPoints`] for fewer than three
/// points, and any error of the placement pass.
pub fn place_frame(
    points: &ControlPointSet,
    drive: f64,
    config: &EngineConfig,
) -> Result<Vec<Placement>, EngineError> {
    config.validate()?;
    let spline = SplineEvaluator::new(points)?;
    let table = ArcLengthTable::build(&spline, config.sample_step)?;
    ObjectPlacer::new(spline, &table, config)?.place_all(drive)
}
