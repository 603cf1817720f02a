//! Shared types for the trackline curve engine.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::cyclic::wrap_index;
use crate::placer::SpeedMode;

/// Smallest control-point count that defines a closed curve with a full
/// four-point neighborhood around every segment.
pub const MIN_CONTROL_POINTS: usize = 3;

/// A 2D point (or displacement vector) in track coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// The origin.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Create a new point.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to another point.
    ///
    /// Avoids the square root for comparison purposes.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.mul_add(dx, dy * dy)
    }

    /// Euclidean distance to another point.
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        self.distance_squared(other).sqrt()
    }

    /// Magnitude when treated as a vector from the origin.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Angle of the vector in radians, measured from the +x axis.
    #[must_use]
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// The vector rotated a quarter turn counter-clockwise.
    #[must_use]
    pub const fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Unit vector in the same direction, or `None` when the magnitude is
    /// below `min_length`.
    #[must_use]
    pub fn normalized(self, min_length: f64) -> Option<Self> {
        let len = self.length();
        if len.is_finite() && len > min_length {
            Some(Self::new(self.x / len, self.y / len))
        } else {
            None
        }
    }

    /// Linear interpolation towards `other`; `t = 0` yields `self`.
    #[must_use]
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self::new(
            (other.x - self.x).mul_add(t, self.x),
            (other.y - self.y).mul_add(t, self.y),
        )
    }
}

impl Add for Point {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// A sequence of connected points forming an open path.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline(Vec<Point>);

impl Polyline {
    /// Create a new polyline from a vector of points.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self(points)
    }

    /// Returns `true` if the polyline has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of points in the polyline.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns a slice of all points.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.0
    }

    /// Sum of the straight-line distances between consecutive points.
    #[must_use]
    pub fn length(&self) -> f64 {
        self.0.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// Ordered control points of the closed track, with a revision counter.
///
/// The set is mutated by an interactive editor outside the engine.
/// Every mutation bumps [`revision`](Self::revision), which lets a
/// caching caller (see [`FrameDriver`](crate::driver::FrameDriver))
/// decide whether derived data such as the arc-length table must be
/// rebuilt, without the engine observing mutation itself.
///
/// The set may temporarily hold fewer than [`MIN_CONTROL_POINTS`]
/// points; evaluating such a set fails with
/// [`EngineError::InsufficientControlPoints`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlPointSet {
    points: Vec<Point>,
    revision: u64,
}

impl ControlPointSet {
    /// Create a set at revision 0.
    #[must_use]
    pub const fn new(points: Vec<Point>) -> Self {
        Self {
            points,
            revision: 0,
        }
    }

    /// The five-point loop the track starts out with before any editing.
    #[must_use]
    pub fn default_track() -> Self {
        Self::new(vec![
            Point::new(125.0, 150.0),
            Point::new(200.0, 350.0),
            Point::new(100.0, 540.0),
            Point::new(450.0, 450.0),
            Point::new(470.0, 100.0),
        ])
    }

    /// Number of control points.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the set has no points.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns a slice of all points in order.
    #[must_use]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Number of mutations applied since construction.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Point at `index`, if in range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Point> {
        self.points.get(index).copied()
    }

    /// Point at a cyclic `index`; negative indices count from the end.
    ///
    /// Returns `None` only when the set is empty.
    #[must_use]
    pub fn get_wrapped(&self, index: i64) -> Option<Point> {
        self.points.get(wrap_index(index, self.points.len())).copied()
    }

    /// Replace the point at `index`, returning the previous value.
    ///
    /// Out-of-range indices leave the set (and its revision) untouched.
    pub fn set_point(&mut self, index: usize, point: Point) -> Option<Point> {
        let slot = self.points.get_mut(index)?;
        let old = std::mem::replace(slot, point);
        self.bump();
        Some(old)
    }

    /// Translate the point at `index` by `delta` (a drag step).
    pub fn move_point(&mut self, index: usize, delta: Point) -> Option<Point> {
        let slot = self.points.get_mut(index)?;
        *slot = *slot + delta;
        let moved = *slot;
        self.bump();
        Some(moved)
    }

    /// Append a point at the end of the loop.
    pub fn push(&mut self, point: Point) {
        self.points.push(point);
        self.bump();
    }

    /// Insert a point before `index`. Returns `false` if `index > len`.
    pub fn insert(&mut self, index: usize, point: Point) -> bool {
        if index > self.points.len() {
            return false;
        }
        self.points.insert(index, point);
        self.bump();
        true
    }

    /// Remove and return the point at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Point> {
        if index >= self.points.len() {
            return None;
        }
        let removed = self.points.remove(index);
        self.bump();
        Some(removed)
    }

    const fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

/// Resolved position and heading of one object at one instant.
///
/// This is the only value handed to a renderer. It is recomputed every
/// frame and never stored by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Where the object sits on the curve.
    pub position: Point,
    /// Heading in radians, `atan2` of the curve tangent.
    pub orientation: f64,
}

impl Placement {
    /// Create a new placement.
    #[must_use]
    pub const fn new(position: Point, orientation: f64) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// Configuration for the curve engine.
///
/// All parameters have defaults matching the reference track. Call
/// [`validate`](Self::validate) (every engine entry point does) to reject
/// values outside their documented domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Parameter step Δ between arc-length table samples.
    ///
    /// Smaller steps give more accurate constant-speed motion at the cost
    /// of `n / Δ` curve evaluations per rebuild.
    pub sample_step: f64,

    /// How the drive parameter is turned into curve positions.
    pub speed_mode: SpeedMode,

    /// Number of objects to place, the leader included. Must be at least 1.
    pub object_count: usize,

    /// Distance between consecutive objects in parameter units
    /// (used by [`SpeedMode::RawParameter`]).
    pub parameter_spacing: f64,

    /// Distance between consecutive objects in length units
    /// (used by [`SpeedMode::ArcLength`]).
    pub length_spacing: f64,

    /// Amount a trailing object that lands exactly on the seam is pulled
    /// back by.
    pub seam_epsilon: f64,

    /// Tangent magnitudes at or below this are treated as degenerate.
    pub tangent_epsilon: f64,
}

impl EngineConfig {
    /// Default arc-length table sample step.
    pub const DEFAULT_SAMPLE_STEP: f64 = 0.1;
    /// Default speed mode.
    pub const DEFAULT_SPEED_MODE: SpeedMode = SpeedMode::ArcLength;
    /// Default object count (just the leader).
    pub const DEFAULT_OBJECT_COUNT: usize = 1;
    /// Default car spacing in parameter units.
    pub const DEFAULT_PARAMETER_SPACING: f64 = 0.23;
    /// Default car spacing in length units.
    pub const DEFAULT_LENGTH_SPACING: f64 = 65.0;
    /// Default seam nudge.
    pub const DEFAULT_SEAM_EPSILON: f64 = 0.01;
    /// Default minimum tangent magnitude.
    pub const DEFAULT_TANGENT_EPSILON: f64 = 1e-9;

    /// Check every field against its documented domain.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.sample_step.is_finite() && self.sample_step > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sample_step must be positive and finite, got {}",
                self.sample_step
            )));
        }
        if self.object_count < 1 {
            return Err(EngineError::InvalidConfig(
                "object_count must be at least 1".to_owned(),
            ));
        }
        let non_negative = [
            ("parameter_spacing", self.parameter_spacing),
            ("length_spacing", self.length_spacing),
            ("seam_epsilon", self.seam_epsilon),
            ("tangent_epsilon", self.tangent_epsilon),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::InvalidConfig(format!(
                    "{name} must be non-negative and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_step: Self::DEFAULT_SAMPLE_STEP,
            speed_mode: Self::DEFAULT_SPEED_MODE,
            object_count: Self::DEFAULT_OBJECT_COUNT,
            parameter_spacing: Self::DEFAULT_PARAMETER_SPACING,
            length_spacing: Self::DEFAULT_LENGTH_SPACING,
            seam_epsilon: Self::DEFAULT_SEAM_EPSILON,
            tangent_epsilon: Self::DEFAULT_TANGENT_EPSILON,
        }
    }
}

/// Configuration for the supplementary rail and tie geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Perpendicular distance from the center line to each rail.
    pub rail_offset: f64,
    /// Arc-length distance between consecutive rail samples.
    pub rail_step: f64,
    /// Arc-length distance between consecutive ties.
    pub tie_spacing: f64,
}

impl TrackConfig {
    /// Default rail offset.
    pub const DEFAULT_RAIL_OFFSET: f64 = 15.0;
    /// Default rail sampling step.
    pub const DEFAULT_RAIL_STEP: f64 = 5.0;
    /// Default tie spacing.
    pub const DEFAULT_TIE_SPACING: f64 = 30.0;
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            rail_offset: Self::DEFAULT_RAIL_OFFSET,
            rail_step: Self::DEFAULT_RAIL_STEP,
            tie_spacing: Self::DEFAULT_TIE_SPACING,
        }
    }
}

/// Errors that can occur while evaluating the curve or placing objects.
///
/// All of them are local to a single frame: the caller skips rendering
/// that frame (or reuses the previous placements) and tries again on the
/// next one. None are retried, because the outcome only changes when the
/// control points change.
#[derive(Debug, Clone, PartialEq, thiserror::Error, Serialize, Deserialize)]
pub enum EngineError {
    /// Fewer than [`MIN_CONTROL_POINTS`] control points.
    #[error("closed curve needs at least 3 control points, got {count}")]
    InsufficientControlPoints {
        /// Number of control points supplied.
        count: usize,
    },

    /// The tangent vanishes at the requested parameter, so no heading
    /// can be derived.
    #[error("tangent is degenerate at parameter {parameter}")]
    DegenerateTangent {
        /// Curve parameter (already wrapped) where the tangent vanished.
        parameter: f64,
    },

    /// A parameter or length could not be reduced into its domain, e.g.
    /// because the curve has zero total length or the value is not finite.
    #[error("value {value} cannot be reduced into the curve domain")]
    ParameterOutOfRange {
        /// The offending input value.
        value: f64,
    },

    /// Engine configuration is invalid.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),
}
