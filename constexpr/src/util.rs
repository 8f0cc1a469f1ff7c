//! Shared numeric helpers
//!
//! Small bit-twiddling routines used by the rewrite rules.

// ============================================================================
// Powers of two
// ============================================================================

/// Exponent `n` when `value == 2^n`
pub fn power_of_two_exponent(value: i128) -> Option<u32> {
    (value > 0 && value & (value - 1) == 0).then(|| value.trailing_zeros())
}

pub fn is_power_of_two(value: i128) -> bool {
    power_of_two_exponent(value).is_some()
}

/// Decompose `value` as `2^n + 1` (`Some((n, true))`) or `2^n - 1`
/// (`Some((n, false))`), preferring the additive form. Values that are
/// themselves powers of two, and values below 3, have no decomposition.
pub fn adjacent_power_of_two(value: i128) -> Option<(u32, bool)> {
    if value < 3 || is_power_of_two(value) {
        return None;
    }
    if let Some(n) = power_of_two_exponent(value - 1) {
        return Some((n, true));
    }
    power_of_two_exponent(value + 1).map(|n| (n, false))
}

// ============================================================================
// Floating point
// ============================================================================

/// `1 / value` when it is exactly representable (`value` is a power of two
/// whose reciprocal is a normal number)
pub fn exact_reciprocal(value: f64, single: bool) -> Option<f64> {
    if !value.is_normal() {
        return None;
    }
    let reciprocal = 1.0 / value;
    if single {
        let (v, r) = (value as f32, reciprocal as f32);
        let mantissa_zero = v.to_bits() & 0x007f_ffff == 0;
        (v.is_normal() && r.is_normal() && mantissa_zero && v as f64 == value)
            .then_some(r as f64)
    } else {
        let mantissa_zero = value.to_bits() & 0x000f_ffff_ffff_ffff == 0;
        (reciprocal.is_normal() && mantissa_zero).then_some(reciprocal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_of_two() {
        assert_eq!(power_of_two_exponent(1), Some(0));
        assert_eq!(power_of_two_exponent(64), Some(6));
        assert_eq!(power_of_two_exponent(0), None);
        assert_eq!(power_of_two_exponent(-8), None);
        assert_eq!(power_of_two_exponent(12), None);
    }

    #[test]
    fn test_adjacent_power_of_two() {
        assert_eq!(adjacent_power_of_two(3), Some((1, true)));
        assert_eq!(adjacent_power_of_two(5), Some((2, true)));
        assert_eq!(adjacent_power_of_two(7), Some((3, false)));
        assert_eq!(adjacent_power_of_two(9), Some((3, true)));
        assert_eq!(adjacent_power_of_two(8), None);
        assert_eq!(adjacent_power_of_two(11), None);
        assert_eq!(adjacent_power_of_two(2), None);
    }

    #[test]
    fn test_exact_reciprocal() {
        assert_eq!(exact_reciprocal(4.0, false), Some(0.25));
        assert_eq!(exact_reciprocal(-0.5, true), Some(-2.0));
        assert_eq!(exact_reciprocal(3.0, false), None);
        assert_eq!(exact_reciprocal(0.0, false), None);
        assert_eq!(exact_reciprocal(f64::INFINITY, false), None);
    }
}
