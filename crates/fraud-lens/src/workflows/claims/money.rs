/// Largest charge magnitude accepted from an export: one trillion dollars.
pub const MAX_CHARGE_DOLLARS: f64 = 1e12;

/// Converts a dollar amount into whole cents, rounding half away from zero.
///
/// Non-finite amounts collapse to zero so a malformed charge never poisons an
/// aggregate. Magnitudes beyond [`MAX_CHARGE_DOLLARS`] are clamped to it.
pub fn to_cents(dollars: f64) -> i64 {
    if !dollars.is_finite() {
        return 0;
    }
    let limit = MAX_CHARGE_DOLLARS * 100.0;
    (dollars * 100.0).round().clamp(-limit, limit) as i64
}

pub fn to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Parses a raw charge cell such as `"1,250.00"` or `"$80"`; anything
/// unparsable or beyond [`MAX_CHARGE_DOLLARS`] becomes `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|ch| !matches!(ch, '$' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && value.abs() <= MAX_CHARGE_DOLLARS)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cents_round_to_nearest_unit() {
        assert_eq!(to_cents(150.0), 15_000);
        assert_eq!(to_cents(-12.5), -1_250);
        assert_eq!(to_cents(19.999), 2_000);
        assert_eq!(to_cents(f64::NAN), 0);
        assert_eq!(to_dollars(12_345), 123.45);
    }

    #[test]
    fn amount_parsing_tolerates_currency_formatting() {
        assert_eq!(parse_amount("1,250.50"), 1250.5);
        assert_eq!(parse_amount(" $80 "), 80.0);
        assert_eq!(parse_amount("n/a"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("inf"), 0.0);
    }

    #[test]
    fn absurd_amounts_are_bounded() {
        assert_eq!(parse_amount("1e20"), 0.0);
        assert_eq!(parse_amount("$1,000,000,000,000"), MAX_CHARGE_DOLLARS);
        assert_eq!(to_cents(1e20), 100_000_000_000_000);
        assert_eq!(to_cents(-1e20), -100_000_000_000_000);
        assert_eq!(to_cents(f64::MAX), 100_000_000_000_000);
    }
}
