//! Exact mean and two-place rounding over `f64` samples.
//!
//! The mean is the correctly rounded value of the exact rational mean of the inputs,
//! not a running f64 sum. Rounding works on the exact binary value of the double and
//! breaks exact ties to even, so `100.125` rounds to `100.12` while `2.675` (stored as
//! `2.67499999...`) rounds to `2.67`.

const MANTISSA_BITS: u32 = 52;
const EXPONENT_BIAS: i32 = 1075;

/// Split a finite double into `(mantissa, exponent, negative)` with
/// `|value| == mantissa * 2^exponent`.
fn decompose(value: f64) -> (u64, i32, bool) {
    let bits = value.to_bits();
    let negative = bits >> 63 == 1;
    let biased = ((bits >> MANTISSA_BITS) & 0x7ff) as i32;
    let fraction = bits & ((1u64 << MANTISSA_BITS) - 1);
    if biased == 0 {
        (fraction, 1 - EXPONENT_BIAS, negative)
    } else {
        (fraction | (1u64 << MANTISSA_BITS), biased - EXPONENT_BIAS, negative)
    }
}

/// `value * 2^exp`, exact while the result stays in the normal range.
fn scale_by_pow2(mut value: f64, mut exp: i32) -> f64 {
    let pow2 = |e: i32| f64::from_bits(((e + 1023) as u64) << MANTISSA_BITS);
    while exp > 1023 {
        value *= pow2(1023);
        exp -= 1023;
    }
    while exp < -1022 {
        value *= pow2(-1022);
        exp += 1022;
    }
    value * pow2(exp)
}

/// Arithmetic mean. Caller guarantees `values` is non-empty.
pub fn mean(values: &[f64]) -> f64 {
    exact_mean(values).unwrap_or_else(|| compensated_sum(values) / values.len() as f64)
}

/// Sum every input exactly in fixed point, then divide once with correct rounding.
/// Returns `None` when the inputs span too wide a binary range for 128-bit fixed
/// point or are not all finite.
fn exact_mean(values: &[f64]) -> Option<f64> {
    if values.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let terms: Vec<(u64, i32, bool)> = values
        .iter()
        .map(|&v| decompose(v))
        .filter(|&(m, _, _)| m != 0)
        .map(|(m, e, neg)| {
            let tz = m.trailing_zeros();
            (m >> tz, e + tz as i32, neg)
        })
        .collect();

    let Some(emin) = terms.iter().map(|&(_, e, _)| e).min() else {
        return Some(0.0);
    };

    let mut sum: i128 = 0;
    for &(m, e, negative) in &terms {
        let shift = (e - emin) as u32;
        if shift + (64 - m.leading_zeros()) > 126 {
            return None;
        }
        let term = (m as i128) << shift;
        sum = if negative { sum.checked_sub(term)? } else { sum.checked_add(term)? };
    }
    if sum == 0 {
        return Some(0.0);
    }

    let magnitude = sum.unsigned_abs();
    let len = 128 - magnitude.leading_zeros();
    if len > 127 {
        return None;
    }
    let n = values.len() as u128;
    let n_len = 128 - n.leading_zeros();

    // Widen so the quotient keeps at least 56 significant bits; the sticky bit below
    // the rounding position then makes the final int-to-float cast correctly rounded.
    let k = (57 + n_len).saturating_sub(len);
    let numerator = magnitude << k;
    let quotient = numerator / n;
    let sticky = u128::from(numerator % n != 0);
    let approx = scale_by_pow2((quotient | sticky) as f64, emin - k as i32);

    Some(if sum < 0 { -approx } else { approx })
}

/// Neumaier summation, used only when the exact path cannot represent the inputs.
fn compensated_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    for &v in values {
        let t = sum + v;
        if sum.abs() >= v.abs() {
            compensation += (sum - t) + v;
        } else {
            compensation += (v - t) + sum;
        }
        sum = t;
    }
    sum + compensation
}

/// Round to two decimal places using the exact binary value, ties to even.
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let (mantissa, exponent, negative) = decompose(value);
    if exponent >= 0 {
        // already an integer
        return value;
    }

    let scaled = mantissa as u128 * 100;
    let shift = (-exponent) as u32;
    let hundredths = if shift >= 64 {
        // scaled < 2^60, so the value is below half a hundredth
        0
    } else {
        let whole = scaled >> shift;
        let rem = scaled & ((1u128 << shift) - 1);
        let half = 1u128 << (shift - 1);
        if rem > half || (rem == half && whole & 1 == 1) {
            whole + 1
        } else {
            whole
        }
    };

    let magnitude = if hundredths <= 1u128 << 53 {
        hundredths as f64 / 100.0
    } else {
        // too wide for an exact f64 numerator; let the decimal parser round once
        format!("{}.{:02}", hundredths / 100, hundredths % 100)
            .parse::<f64>()
            .unwrap_or(value.abs())
    };
    if negative {
        -magnitude
    } else {
        magnitude
    }
}
