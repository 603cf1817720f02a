//! Closed Catmull-Rom spline through the control points.
//!
//! Each segment `i` runs from control point `i` to control point `i + 1`
//! (indices taken cyclically) and is expressed as a cubic Bezier whose
//! inner handles come from the Cardinal construction with tension 1/6:
//!
//! ```text
//! cp1 = curr + (next  - prev) / 6
//! cp2 = next - (next2 - curr) / 6
//! ```
//!
//! The curve passes through every control point at integer parameter
//! values and is periodic with period `n`, so the parameter domain is
//! effectively `t mod n`.

use serde::{Deserialize, Serialize};

use crate::cyclic::{wrap_index, wrap_scalar};
use crate::types::{ControlPointSet, EngineError, MIN_CONTROL_POINTS, Point};

/// Handle scale of the Cardinal construction.
const TENSION: f64 = 1.0 / 6.0;

/// One cubic Bezier segment of the closed curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CubicSegment {
    /// Segment start (a control point).
    pub start: Point,
    /// First inner handle.
    pub handle1: Point,
    /// Second inner handle.
    pub handle2: Point,
    /// Segment end (the next control point).
    pub end: Point,
}

impl CubicSegment {
    /// Position at local parameter `f ∈ [0, 1]`.
    ///
    /// Evaluated by de Casteljau subdivision, so `f = 0` reproduces
    /// `start` bit-for-bit and a segment whose four points coincide
    /// stays exactly on that point.
    #[must_use]
    pub fn position(&self, f: f64) -> Point {
        let a = self.start.lerp(self.handle1, f);
        let b = self.handle1.lerp(self.handle2, f);
        let c = self.handle2.lerp(self.end, f);
        let ab = a.lerp(b, f);
        let bc = b.lerp(c, f);
        ab.lerp(bc, f)
    }

    /// First derivative with respect to `f` (unnormalized tangent).
    #[must_use]
    pub fn derivative(&self, f: f64) -> Point {
        let mt = 1.0 - f;
        let d0 = 3.0 * mt * mt;
        let d1 = 6.0 * mt * f;
        let d2 = 3.0 * f * f;
        let a = self.handle1 - self.start;
        let b = self.handle2 - self.handle1;
        let c = self.end - self.handle2;
        Point::new(
            d0 * a.x + d1 * b.x + d2 * c.x,
            d0 * a.y + d1 * b.y + d2 * c.y,
        )
    }
}

/// Evaluates position and tangent on the closed spline.
///
/// Borrows the control points of one snapshot; it holds nothing that
/// outlives the frame it was created for.
///
/// # Examples
///
/// ```
/// use trackline_engine::{ControlPointSet, Point, SplineEvaluator};
///
/// let square = ControlPointSet::new(vec![
///     Point::new(0.0, 0.0),
///     Point::new(10.0, 0.0),
///     Point::new(10.0, 10.0),
///     Point::new(0.0, 10.0),
/// ]);
/// let spline = SplineEvaluator::new(&square)?;
/// assert_eq!(spline.position(2.0)?, Point::new(10.0, 10.0));
/// # Ok::<(), trackline_engine::EngineError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SplineEvaluator<'a> {
    points: &'a [Point],
}

impl<'a> SplineEvaluator<'a> {
    /// Create an evaluator over the given control points.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InsufficientControlPoints`] when the set has
    /// fewer than [`MIN_CONTROL_POINTS`] points.
    pub fn new(set: &'a ControlPointSet) -> Result<Self, EngineError> {
        Self::from_points(set.points())
    }

    /// Create an evaluator over a raw slice of control points.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub const fn from_points(points: &'a [Point]) -> Result<Self, EngineError> {
        if points.len() < MIN_CONTROL_POINTS {
            return Err(EngineError::InsufficientControlPoints {
                count: points.len(),
            });
        }
        Ok(Self { points })
    }

    /// Number of segments, equal to the number of control points and to
    /// the parameter period.
    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.points.len()
    }

    /// The parameter period `n` as a float.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn period(&self) -> f64 {
        self.points.len() as f64
    }

    /// The Bezier segment starting at control point `index` (cyclic).
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn segment(&self, index: i64) -> CubicSegment {
        let n = self.points.len();
        let prev = self.points[wrap_index(index - 1, n)];
        let curr = self.points[wrap_index(index, n)];
        let next = self.points[wrap_index(index + 1, n)];
        let next2 = self.points[wrap_index(index + 2, n)];
        CubicSegment {
            start: curr,
            handle1: curr + (next - prev) * TENSION,
            handle2: next - (next2 - curr) * TENSION,
            end: next,
        }
    }

    /// All `n` segments in order, one per control point.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn segments(&self) -> Vec<CubicSegment> {
        (0..self.points.len() as i64)
            .map(|i| self.segment(i))
            .collect()
    }

    /// Reduce `t` into `[0, n)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParameterOutOfRange`] when `t` is not finite.
    pub fn wrap_parameter(&self, t: f64) -> Result<f64, EngineError> {
        wrap_scalar(t, self.period()).ok_or(EngineError::ParameterOutOfRange { value: t })
    }

    /// Split a parameter into its segment and local position in `[0, 1)`.
    #[allow(clippy::cast_possible_truncation)]
    fn locate(&self, t: f64) -> Result<(CubicSegment, f64), EngineError> {
        let wrapped = self.wrap_parameter(t)?;
        let floor = wrapped.floor();
        let segment = self.segment(floor as i64);
        Ok((segment, wrapped - floor))
    }

    /// Position on the curve at parameter `t` (any real value).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParameterOutOfRange`] when `t` is not finite.
    pub fn position(&self, t: f64) -> Result<Point, EngineError> {
        let (segment, f) = self.locate(t)?;
        Ok(segment.position(f))
    }

    /// Unnormalized tangent at parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DegenerateTangent`] when the tangent
    /// magnitude is at or below `min_magnitude` (e.g. where three or more
    /// consecutive control points coincide), and
    /// [`EngineError::ParameterOutOfRange`] when `t` is not finite.
    pub fn tangent(&self, t: f64, min_magnitude: f64) -> Result<Point, EngineError> {
        let (segment, f) = self.locate(t)?;
        let tangent = segment.derivative(f);
        let magnitude = tangent.length();
        if !magnitude.is_finite() || magnitude <= min_magnitude {
            return Err(EngineError::DegenerateTangent {
                parameter: self.wrap_parameter(t)?,
            });
        }
        Ok(tangent)
    }

    /// Unit tangent at parameter `t`.
    ///
    /// # Errors
    ///
    /// Same as [`tangent`](Self::tangent).
    pub fn direction(&self, t: f64, min_magnitude: f64) -> Result<Point, EngineError> {
        let tangent = self.tangent(t, min_magnitude)?;
        tangent
            .normalized(min_magnitude)
            .ok_or(EngineError::DegenerateTangent {
                parameter: self.wrap_parameter(t)?,
            })
    }
}
