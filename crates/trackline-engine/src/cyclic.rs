//! Cyclic index and scalar wrapping for the closed curve.
//!
//! Every place that turns a signed index or an unbounded parameter into
//! a position on the loop goes through these helpers, so the modulo
//! conventions (Euclidean remainder, seam nudge) live in exactly one spot.

/// Wrap a signed index into `[0, n)`.
///
/// Negative indices count backwards from the end, so `wrap_index(-1, n)`
/// is the last element. Returns 0 when `n == 0`.
///
/// # Examples
///
/// ```
/// use trackline_engine::cyclic::wrap_index;
///
/// assert_eq!(wrap_index(-1, 5), 4);
/// assert_eq!(wrap_index(7, 5), 2);
/// ```
#[must_use]
#[allow(
    clippy::cast_possible_wrap,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub const fn wrap_index(index: i64, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    index.rem_euclid(n as i64) as usize
}

/// Wrap a real value into `[0, period)`.
///
/// Uses the Euclidean remainder so negative values wrap from the top.
/// Floating-point rounding can make `rem_euclid` return exactly `period`
/// for tiny negative inputs; that case maps back to 0.
///
/// Returns `None` when `period` is not a positive finite number or
/// `value` is not finite.
#[must_use]
pub fn wrap_scalar(value: f64, period: f64) -> Option<f64> {
    if !value.is_finite() || !period.is_finite() || period <= 0.0 {
        return None;
    }
    let wrapped = value.rem_euclid(period);
    if wrapped >= period {
        Some(0.0)
    } else {
        Some(wrapped)
    }
}

/// Wrap a real value into `[0, period)`, nudging values that land on the
/// seam down by `epsilon`.
///
/// This is the look-behind wrap used for trailing objects: subtracting a
/// spacing from the leader can produce a negative value which, once
/// shifted up by one period, sits exactly on the end of the domain.
/// Such values become `period - epsilon` instead of being folded to 0,
/// keeping the trailing object just behind the seam.
///
/// Returns `None` under the same conditions as [`wrap_scalar`].
#[must_use]
pub fn wrap_behind_seam(value: f64, period: f64, epsilon: f64) -> Option<f64> {
    if !value.is_finite() || !period.is_finite() || period <= 0.0 {
        return None;
    }
    let wrapped = value.rem_euclid(period);
    if wrapped >= period {
        Some((period - epsilon).max(0.0))
    } else {
        Some(wrapped)
    }
}
