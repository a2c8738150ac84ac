//! Numeric conversions shared by the effect formulas.
//!
//! Formulas are written in `f64` and truncated toward zero, then applied
//! to integer stats with saturating arithmetic. All lossy casts live here.

/// Truncate toward zero. `NaN` maps to 0; out-of-range values saturate.
#[allow(clippy::cast_possible_truncation)]
pub fn trunc(value: f64) -> i64 {
    if value.is_nan() { 0 } else { value.trunc() as i64 }
}

/// Round up to the next integer.
#[allow(clippy::cast_possible_truncation)]
pub fn ceil(value: f64) -> i64 {
    if value.is_nan() { 0 } else { value.ceil() as i64 }
}

/// Widen an integer stat into a float for formula evaluation.
#[allow(clippy::cast_precision_loss)]
pub const fn real(value: i64) -> f64 {
    value as f64
}

/// Clamp a percentage-style stat into `0..=100`.
pub fn pct(value: i64) -> i64 {
    value.clamp(0, 100)
}

/// `value + delta`, clamped into `0..=100`.
pub fn pct_add(value: i64, delta: i64) -> i64 {
    pct(value.saturating_add(delta))
}

/// `value - delta`, clamped into `0..=100`.
pub fn pct_sub(value: i64, delta: i64) -> i64 {
    pct(value.saturating_sub(delta))
}

/// Round to two decimals.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
