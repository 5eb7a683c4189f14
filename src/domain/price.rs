//! Price derivation
//!
//! The discounted price is a derived field. It is recomputed from the
//! original price on every write and on every edit of the price input,
//! never taken from stale input.

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

/// Multiplier applied to the original price (10% off)
pub const DISCOUNT_RATE: Decimal = Decimal::from_parts(90, 0, 0, false, 2);

/// Largest accepted original price (one billion)
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Decimal places kept on derived prices
const PRICE_SCALE: u32 = 2;

/// Derive the discounted price from an original price.
///
/// Returns `0.00` when `original_price` is not positive, otherwise
/// `round(original_price * 0.90, 2)` with halves rounded away from zero.
///
/// # Example
/// ```
/// use rust_decimal::Decimal;
/// use inventory_sync::domain::derive_discounted_price;
///
/// assert_eq!(derive_discounted_price(Decimal::new(20, 0)), Decimal::new(1800, 2));
/// ```
pub fn derive_discounted_price(original_price: Decimal) -> Decimal {
    if original_price <= Decimal::ZERO {
        return zero_price();
    }

    original_price
        .checked_mul(DISCOUNT_RATE)
        .map(|value| value.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or_else(zero_price)
}

/// Live discount preview for a raw price field.
///
/// Anything that does not parse to a positive decimal previews as `0.00`.
pub fn discount_preview(raw_price: &str) -> Decimal {
    parse_price(raw_price)
        .map(derive_discounted_price)
        .unwrap_or_else(zero_price)
}

/// Parse a raw price field into a positive decimal no larger than `MAX_PRICE`.
pub fn parse_price(raw_price: &str) -> Option<Decimal> {
    Decimal::from_str(raw_price.trim())
        .ok()
        .filter(|value| *value > Decimal::ZERO && *value <= MAX_PRICE)
}

fn zero_price() -> Decimal {
    Decimal::new(0, PRICE_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_discount_whole_price() {
        assert_eq!(derive_discounted_price(dec!(20)), dec!(18.00));
        assert_eq!(derive_discounted_price(dec!(100)), dec!(90.00));
    }

    #[test]
    fn test_discount_rounds_to_cents() {
        // 19.99 * 0.90 = 17.991
        assert_eq!(derive_discounted_price(dec!(19.99)), dec!(17.99));
        // 0.05 * 0.90 = 0.045, half rounds up
        assert_eq!(derive_discounted_price(dec!(0.05)), dec!(0.05));
        // 10.55 * 0.90 = 9.495
        assert_eq!(derive_discounted_price(dec!(10.55)), dec!(9.50));
    }

    #[test]
    fn test_discount_keeps_two_decimals() {
        let discounted = derive_discounted_price(dec!(20));
        assert_eq!(discounted.scale(), 2);
        assert_eq!(discounted.to_string(), "18.00");
    }

    #[test]
    fn test_discount_non_positive_is_zero() {
        assert_eq!(derive_discounted_price(Decimal::ZERO), dec!(0.00));
        assert_eq!(derive_discounted_price(dec!(-5)), dec!(0.00));
    }

    #[test]
    fn test_discount_preview() {
        assert_eq!(discount_preview("20"), dec!(18.00));
        assert_eq!(discount_preview(" 19.99 "), dec!(17.99));
        assert_eq!(discount_preview(""), dec!(0.00));
        assert_eq!(discount_preview("abc"), dec!(0.00));
        assert_eq!(discount_preview("-3"), dec!(0.00));
        assert_eq!(discount_preview("0"), dec!(0.00));
    }

    #[test]
    fn test_parse_price() {
        assert_eq!(parse_price("12.5"), Some(dec!(12.5)));
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("NaN"), None);
    }

    #[test]
    fn test_parse_price_upper_bound() {
        assert_eq!(parse_price("1000000000"), Some(MAX_PRICE));
        assert_eq!(parse_price("1000000000.01"), None);
        assert_eq!(parse_price("1000000000000000000000000"), None);
        assert_eq!(discount_preview("1000000000000000000000000"), dec!(0.00));
    }
}
