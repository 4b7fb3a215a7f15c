//! Floating-point helpers shared by constraint checks and log formatting.

/// Default number of decimals in human-readable output.
pub const DEFAULT_PRECISION: usize = 10;

/// Logistic function `1 / (1 + e^-x)`.
#[inline]
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Compare two values with an absolute tolerance, falling back to a
/// relative `f64::EPSILON` comparison for large magnitudes.
pub fn are_equal(x: f64, y: f64, epsilon: f64) -> bool {
    let diff = (x - y).abs();
    if diff <= epsilon {
        return true;
    }
    let largest = x.abs().max(y.abs());
    diff <= largest * f64::EPSILON
}

/// Fixed-precision rendering with trailing zeros (and a dangling `.`) removed.
///
/// `format_real(0.25, 4) == "0.25"`, `format_real(3.0, 4) == "3"`.
pub fn format_real(x: f64, precision: usize) -> String {
    if !x.is_finite() {
        return format!("{x}");
    }
    let mut s = format!("{x:.precision$}");
    if s.contains('.') {
        let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
        s.truncate(trimmed);
    }
    if s == "-0" {
        s = "0".to_string();
    }
    s
}
