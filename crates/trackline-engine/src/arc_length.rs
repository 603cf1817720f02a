//! Arc-length lookup table for the closed spline.
//!
//! The table samples the curve at a fixed parameter step and records the
//! cumulative chord length at each sample. Inverting it turns a physical
//! distance along the track into a curve parameter, which is what makes
//! constant-speed motion possible on a curve whose parametric speed
//! varies.
//!
//! Rows are `(u, a)` pairs with `u` strictly increasing and `a`
//! non-decreasing. The first row is always `(0, 0)`. The last row sits at
//! `u = n` and closes the loop: its length includes the chord from the
//! last interior sample back to the start, so its `a` is the full
//! perimeter `L_total`. No extra curve evaluation happens for that row,
//! since `Position(n) == Position(0)`.

use serde::{Deserialize, Serialize};

use crate::cyclic::wrap_scalar;
use crate::spline::SplineEvaluator;
use crate::types::{EngineError, Point};

/// Slack used when deciding whether a sample would land on the seam.
const SEAM_SLACK: f64 = 1e-9;

/// Upper bound on table rows.
const MAX_ROWS: usize = 10_000_000;

/// Fewest interior samples that still trace a loop with nonzero length.
const MIN_INTERIOR_SAMPLES: usize = 3;

/// One row of the table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcLengthSample {
    /// Curve parameter.
    pub u: f64,
    /// Cumulative length from `u = 0` up to `u`.
    pub a: f64,
}

/// Monotonic parameter → length mapping for one control-point snapshot.
///
/// Deserialization checks the same invariants [`build`](Self::build)
/// guarantees, so a table received from elsewhere is safe to query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTable")]
pub struct ArcLengthTable {
    samples: Vec<ArcLengthSample>,
    step: f64,
    period: f64,
}

impl ArcLengthTable {
    /// Build the table by sampling `spline` every `step` parameter units.
    ///
    /// Performs `ceil(n / step)` position evaluations.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConfig`] when `step` is not a
    /// positive finite number, is small enough to need more than ten
    /// million rows, or is so coarse that fewer than three samples fall
    /// on the curve. Propagates evaluation errors.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn build(spline: &SplineEvaluator<'_>, step: f64) -> Result<Self, EngineError> {
        if !(step.is_finite() && step > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sample_step must be positive and finite, got {step}"
            )));
        }

        let period = spline.period();
        // Interior samples at k * step for every k with k * step < n.
        let interior = (period / step - SEAM_SLACK).ceil().max(1.0) as usize;
        if interior > MAX_ROWS {
            return Err(EngineError::InvalidConfig(format!(
                "sample_step {step} needs more than {MAX_ROWS} rows for {period} segments"
            )));
        }
        if interior < MIN_INTERIOR_SAMPLES {
            return Err(EngineError::InvalidConfig(format!(
                "sample_step {step} leaves fewer than {MIN_INTERIOR_SAMPLES} samples on {period} segments"
            )));
        }

        let mut samples = Vec::with_capacity(interior + 1);
        let start = spline.position(0.0)?;
        let mut previous = start;
        let mut cumulative = 0.0;
        samples.push(ArcLengthSample { u: 0.0, a: 0.0 });

        for k in 1..interior {
            let u = k as f64 * step;
            let p = spline.position(u)?;
            cumulative += previous.distance(p);
            samples.push(ArcLengthSample { u, a: cumulative });
            previous = p;
        }

        cumulative += previous.distance(start);
        samples.push(ArcLengthSample {
            u: period,
            a: cumulative,
        });

        log::trace!(
            "built arc-length table: {} rows, step {step}, total length {cumulative:.3}",
            samples.len(),
        );

        Ok(Self {
            samples,
            step,
            period,
        })
    }

    /// All rows in increasing `u` order.
    #[must_use]
    pub fn samples(&self) -> &[ArcLengthSample] {
        &self.samples
    }

    /// Number of rows, the closing row included.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always `false`: both built and deserialized tables keep at least
    /// their first and closing rows.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Parameter step the table was built with.
    #[must_use]
    pub const fn step(&self) -> f64 {
        self.step
    }

    /// Parameter period `n` of the curve the table was built from.
    #[must_use]
    pub const fn period(&self) -> f64 {
        self.period
    }

    /// Total sampled perimeter `L_total`.
    #[must_use]
    pub fn total_length(&self) -> f64 {
        self.samples.last().map_or(0.0, |s| s.a)
    }

    /// Curve parameter at which the cumulative length equals `length`.
    ///
    /// `length` is reduced modulo `L_total` first, so any finite value is
    /// accepted. The bracketing rows are found by binary search over the
    /// monotonic `a` column; among rows with equal `a` the lowest-index
    /// valid bracket wins. A target that rounding pushes to `L_total`
    /// is clamped into the last bracket. The result lies in `[0, n)`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParameterOutOfRange`] when `L_total` is
    /// zero (all control points coincide) or `length` is not finite.
    pub fn parameter_at_length(&self, length: f64) -> Result<f64, EngineError> {
        let target = wrap_scalar(length, self.total_length())
            .ok_or(EngineError::ParameterOutOfRange { value: length })?;

        let rows = &self.samples;
        let last_bracket = rows.len().saturating_sub(2);
        // First row whose length exceeds the target; the bracket starts
        // one before it.
        let above = rows.partition_point(|row| row.a <= target);
        let i = above.saturating_sub(1).min(last_bracket);

        let lo = rows[i];
        let hi = rows[i + 1];
        let span = hi.a - lo.a;
        let fraction = if span > 0.0 {
            ((target - lo.a) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let u = (hi.u - lo.u).mul_add(fraction, lo.u);

        Ok(wrap_scalar(u, self.period).unwrap_or(0.0))
    }

    /// Cumulative length at curve parameter `u` (any finite value),
    /// interpolated between rows.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ParameterOutOfRange`] when `u` is not finite.
    pub fn length_at_parameter(&self, u: f64) -> Result<f64, EngineError> {
        let u = wrap_scalar(u, self.period).ok_or(EngineError::ParameterOutOfRange { value: u })?;
        let rows = &self.samples;
        let last_bracket = rows.len().saturating_sub(2);
        let i = rows
            .partition_point(|row| row.u <= u)
            .saturating_sub(1)
            .min(last_bracket);
        let lo = rows[i];
        let hi = rows[i + 1];
        let span = hi.u - lo.u;
        let fraction = if span > 0.0 {
            ((u - lo.u) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok((hi.a - lo.a).mul_add(fraction, lo.a))
    }

    /// Distance travelled forward along the curve from parameter `from`
    /// to parameter `to`, in `[0, L_total)`.
    ///
    /// # Errors
    ///
    /// Propagates [`length_at_parameter`](Self::length_at_parameter)
    /// errors and fails with [`EngineError::ParameterOutOfRange`] on a
    /// zero-length curve.
    pub fn forward_distance(&self, from: f64, to: f64) -> Result<f64, EngineError> {
        let delta = self.length_at_parameter(to)? - self.length_at_parameter(from)?;
        wrap_scalar(delta, self.total_length())
            .ok_or(EngineError::ParameterOutOfRange { value: delta })
    }
}

/// Wire form of [`ArcLengthTable`], checked before it becomes a table.
#[derive(Deserialize)]
struct RawTable {
    samples: Vec<ArcLengthSample>,
    step: f64,
    period: f64,
}

impl TryFrom<RawTable> for ArcLengthTable {
    type Error = EngineError;

    fn try_from(raw: RawTable) -> Result<Self, EngineError> {
        let invalid = |what: &str| EngineError::InvalidConfig(format!("arc-length table {what}"));
        if !(raw.step.is_finite() && raw.step > 0.0) {
            return Err(invalid("step must be positive and finite"));
        }
        if !(raw.period.is_finite() && raw.period > 0.0) {
            return Err(invalid("period must be positive and finite"));
        }
        let [first, .., last] = raw.samples.as_slice() else {
            return Err(invalid("needs at least two rows"));
        };
        if first.u.abs() > 0.0 || first.a.abs() > 0.0 || (last.u - raw.period).abs() > SEAM_SLACK {
            return Err(invalid("must start at (0, 0) and end at the period"));
        }
        let ordered = raw
            .samples
            .windows(2)
            .all(|w| w[1].u > w[0].u && w[1].a.is_finite() && w[1].a >= w[0].a);
        if !ordered {
            return Err(invalid("rows need increasing u and non-decreasing length"));
        }
        Ok(Self {
            samples: raw.samples,
            step: raw.step,
            period: raw.period,
        })
    }
}

/// Sum of chord lengths between consecutive points of a closed loop,
/// the closing chord included.
#[must_use]
pub fn closed_chord_length(points: &[Point]) -> f64 {
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    match (points.first(), points.last()) {
        (Some(&first), Some(&last)) if points.len() > 1 => open + last.distance(first),
        _ => open,
    }
}
