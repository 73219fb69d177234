//! Number formatting for i3d attribute values.
//!
//! i3d files store floats with six significant digits in `printf("%g")`
//! style: trailing zeros are stripped and very small or very large values
//! switch to scientific notation.

use glam::Vec3;

const SIGNIFICANT_DIGITS: i32 = 6;

/// Formats `value` like C's `%.6g`.
#[must_use]
pub fn g6(value: f32) -> String {
    let value = f64::from(value);
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }

    // Round to the target precision first, the exponent must come from the rounded value.
    let scientific = format!("{:.*e}", (SIGNIFICANT_DIGITS - 1) as usize, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .map_or((scientific.as_str(), 0), |(m, e)| (m, e.parse::<i32>().unwrap_or(0)));

    if exponent < -4 || exponent >= SIGNIFICANT_DIGITS {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", strip_zeros(mantissa), exponent.abs())
    } else {
        let decimals = (SIGNIFICANT_DIGITS - 1 - exponent).max(0) as usize;
        strip_zeros(&format!("{value:.decimals$}")).to_owned()
    }
}

/// Formats a vector as three space separated `%.6g` values.
#[must_use]
pub fn g6_vec3(v: Vec3) -> String {
    format!("{} {} {}", g6(v.x), g6(v.y), g6(v.z))
}

fn strip_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
