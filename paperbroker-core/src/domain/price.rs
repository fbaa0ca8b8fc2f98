//! Fixed-precision value types: `Price`, `Money`, `Quantity`.
//!
//! A `Price` carries the tick precision of its instrument: a price for a
//! symbol quoted to 4 decimal places always holds exactly four fractional
//! digits. Floating-point input is quantised with banker's rounding so the
//! same raw series always produces the same decimals.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PriceError {
    #[error("price input {0} is not a finite number")]
    NotFinite(f64),
}

/// Quantise to `precision` fractional digits (banker's rounding), then
/// pad the scale so the decimal always carries exactly that many digits.
fn quantise(value: Decimal, precision: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(precision, RoundingStrategy::MidpointNearestEven);
    rounded.rescale(precision);
    rounded
}

/// A price quantised to a fixed number of fractional digits.
///
/// Total ordering compares the decimal value; prices of the same
/// instrument always share a precision.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Price {
    value: Decimal,
    precision: u32,
}

impl Price {
    pub fn new(value: Decimal, precision: u32) -> Self {
        Self {
            value: quantise(value, precision),
            precision,
        }
    }

    /// Quantise a raw floating-point price. Fails on NaN or infinity.
    pub fn from_f64(value: f64, precision: u32) -> Result<Self, PriceError> {
        if !value.is_finite() {
            return Err(PriceError::NotFinite(value));
        }
        let decimal = Decimal::from_f64(value).ok_or(PriceError::NotFinite(value))?;
        Ok(Self::new(decimal, precision))
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// Add another price (e.g. a slippage offset), keeping this price's
    /// precision.
    pub fn checked_add(&self, other: Price) -> Option<Price> {
        let sum = self.value.checked_add(other.value)?;
        Some(Price::new(sum, self.precision))
    }

    /// Subtract another price, keeping this price's precision.
    pub fn checked_sub(&self, other: Price) -> Option<Price> {
        let diff = self.value.checked_sub(other.value)?;
        Some(Price::new(diff, self.precision))
    }

    /// Multiply by an integer tick count (slippage table construction).
    pub fn checked_mul(&self, factor: u32) -> Option<Price> {
        let product = self.value.checked_mul(Decimal::from(factor))?;
        Some(Price::new(product, self.precision))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A signed cash amount at two fractional digits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Money(Decimal);

impl Money {
    const PRECISION: u32 = 2;

    pub fn new(value: Decimal) -> Self {
        Self(quantise(value, Self::PRECISION))
    }

    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn checked_add(&self, other: Money) -> Option<Money> {
        Some(Money::new(self.0.checked_add(other.0)?))
    }

    pub fn checked_sub(&self, other: Money) -> Option<Money> {
        Some(Money::new(self.0.checked_sub(other.0)?))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A whole-unit order or fill quantity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Quantity(pub u64);

impl Quantity {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(&self, other: Quantity) -> Option<Quantity> {
        Some(Quantity(self.0.checked_add(other.0)?))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // ── Quantisation ───────────────────────────────────────────────────

    #[test]
    fn price_quantises_to_tick_precision() {
        let price = Price::from_f64(1.10005, 4).unwrap();
        // Banker's rounding: 1.10005 → 1.1000 (even neighbour)
        assert_eq!(price.value(), dec!(1.1000));
        assert_eq!(price.to_string(), "1.1000");
    }

    #[test]
    fn price_bankers_rounding_rounds_half_to_even() {
        assert_eq!(Price::from_f64(0.125, 2).unwrap().value(), dec!(0.12));
        assert_eq!(Price::from_f64(0.135, 2).unwrap().value(), dec!(0.14));
    }

    #[test]
    fn price_pads_scale_to_precision() {
        let price = Price::from_f64(1.1, 4).unwrap();
        assert_eq!(price.to_string(), "1.1000");
        assert_eq!(price.precision(), 4);
    }

    #[test]
    fn price_rejects_non_finite_input() {
        assert!(Price::from_f64(f64::NAN, 4).is_err());
        assert!(Price::from_f64(f64::INFINITY, 4).is_err());
    }

    // ── Ordering and arithmetic ────────────────────────────────────────

    #[test]
    fn price_total_order() {
        let lo = Price::from_f64(1.1000, 4).unwrap();
        let hi = Price::from_f64(1.1001, 4).unwrap();
        assert!(lo < hi);
        assert_eq!(lo, Price::from_f64(1.1, 4).unwrap());
    }

    #[test]
    fn price_slippage_addition_keeps_precision() {
        let price = Price::from_f64(1.1000, 4).unwrap();
        let tick = Price::from_f64(0.0001, 4).unwrap();
        let slipped = price.checked_add(tick).unwrap();
        assert_eq!(slipped.to_string(), "1.1001");
        assert_eq!(slipped.precision(), 4);
    }

    #[test]
    fn price_tick_multiple() {
        let tick = Price::from_f64(0.0001, 4).unwrap();
        assert_eq!(tick.checked_mul(3).unwrap().to_string(), "0.0003");
        assert_eq!(tick.checked_mul(0).unwrap().to_string(), "0.0000");
    }

    // ── Money ──────────────────────────────────────────────────────────

    #[test]
    fn money_two_fractional_digits() {
        let cash = Money::new(dec!(1000000));
        assert_eq!(cash.to_string(), "1000000.00");
    }

    #[test]
    fn money_arithmetic() {
        let a = Money::new(dec!(100.50));
        let b = Money::new(dec!(0.25));
        assert_eq!(a.checked_add(b).unwrap(), Money::new(dec!(100.75)));
        assert_eq!(a.checked_sub(b).unwrap(), Money::new(dec!(100.25)));
        assert!(a.is_positive());
        assert!(!Money::zero().is_positive());
    }

    // ── Quantity ───────────────────────────────────────────────────────

    #[test]
    fn quantity_accumulates() {
        let filled = Quantity::new(0);
        let fill = Quantity::new(100_000);
        assert!(filled.is_zero());
        assert_eq!(filled.checked_add(fill).unwrap(), Quantity::new(100_000));
    }
}
