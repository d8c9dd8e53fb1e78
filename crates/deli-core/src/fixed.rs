use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits. Used for
/// seconds, rates and multipliers.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation bookkeeping (one per step).
pub type Ticks = u64;

/// Money is tracked in integral cents.
pub type Cents = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::saturating_from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

/// Scale a cent amount by a non-negative multiplier, flooring the result.
///
/// Computed on the raw Q32.32 bits in 128-bit space so large wallets never
/// overflow the 32 integer bits of `Fixed64`.
#[inline]
pub fn scale_cents(cents: Cents, factor: Fixed64) -> Cents {
    if factor <= Fixed64::ZERO {
        return 0;
    }
    let raw = (cents as i128) * (factor.to_bits() as i128);
    let scaled = raw >> 32;
    u64::try_from(scaled).unwrap_or(u64::MAX)
}

/// Points for a priced amount: `floor(cents / 100 * factor * multiplier)`.
#[inline]
pub fn points_for(cents: Cents, factor: Fixed64, multiplier: u32) -> u64 {
    if factor <= Fixed64::ZERO {
        return 0;
    }
    let raw = (cents as i128) * (multiplier as i128) * (factor.to_bits() as i128);
    let points = raw / (100i128 << 32);
    u64::try_from(points).unwrap_or(u64::MAX)
}

/// Format cents as a currency string (`"12.05"`). Display only.
pub fn format_cents(cents: Cents) -> String {
    format!("{}.{:02}", cents / 100, cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scale_cents_identity() {
        assert_eq!(scale_cents(500, Fixed64::ONE), 500);
    }

    #[test]
    fn scale_cents_floors() {
        // 333 * 0.5 = 166.5 -> 166
        assert_eq!(scale_cents(333, f64_to_fixed64(0.5)), 166);
    }

    #[test]
    fn scale_cents_zero_or_negative_factor() {
        assert_eq!(scale_cents(1_000, Fixed64::ZERO), 0);
        assert_eq!(scale_cents(1_000, f64_to_fixed64(-1.0)), 0);
    }

    #[test]
    fn scale_cents_large_wallet_does_not_overflow() {
        let big = 50_000_000_000u64;
        assert_eq!(scale_cents(big, f64_to_fixed64(0.5)), 25_000_000_000);
    }

    #[test]
    fn points_for_five_dollars() {
        assert_eq!(points_for(500, Fixed64::ONE, 10), 50);
    }

    #[test]
    fn points_for_floors_fractional_points() {
        // 3.45 * 1.5 * 10 = 51.75 -> 51
        assert_eq!(points_for(345, f64_to_fixed64(1.5), 10), 51);
    }

    #[test]
    fn format_cents_pads() {
        assert_eq!(format_cents(1205), "12.05");
        assert_eq!(format_cents(7), "0.07");
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }
}
