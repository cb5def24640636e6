//! Fixed-point money, tax rates and the pricing calculation.
//!
//! Amounts are held as integer cents and tax rates as basis points so the
//! pricing arithmetic never touches floating point. Decimal input (from
//! reasoning output, edits or configuration) is parsed from its textual form.

use super::DealDomainError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CENTS_PER_UNIT: i64 = 100;
const BASIS_POINTS_PER_UNIT: i128 = 10_000;

/// Error returned while parsing a decimal amount or rate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid decimal value: {0}")]
pub struct ParseDecimalError(pub String);

/// Monetary amount in minor units (cents).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Money(i64);

impl Money {
    /// Zero amount.
    pub const ZERO: Self = Self(0);

    /// Creates an amount from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Creates an amount from whole units.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::AmountOverflow`] when the value does not
    /// fit in minor units.
    pub const fn from_units(units: i64) -> Result<Self, DealDomainError> {
        match units.checked_mul(CENTS_PER_UNIT) {
            Some(cents) => Ok(Self(cents)),
            None => Err(DealDomainError::AmountOverflow),
        }
    }

    /// Returns the amount in minor units.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns whether the amount is below zero.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::AmountOverflow`] on overflow.
    pub const fn checked_add(self, other: Self) -> Result<Self, DealDomainError> {
        match self.0.checked_add(other.0) {
            Some(cents) => Ok(Self(cents)),
            None => Err(DealDomainError::AmountOverflow),
        }
    }

    /// Multiplies the amount by a quantity.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::AmountOverflow`] on overflow.
    pub fn checked_mul_quantity(self, quantity: u32) -> Result<Self, DealDomainError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or(DealDomainError::AmountOverflow)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let units = magnitude.div_euclid(100);
        let cents = magnitude.rem_euclid(100);
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl FromStr for Money {
    type Err = ParseDecimalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let scaled = parse_scaled_decimal(value, 2)?;
        i64::try_from(scaled)
            .map(Self)
            .map_err(|_| ParseDecimalError(value.to_owned()))
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor::<Self>::new("a monetary amount"))
    }
}

/// Tax rate in basis points (1/100 of a percent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Largest accepted rate (100%).
    pub const MAX: Self = Self(10_000);

    /// Creates a rate from basis points, capping it at [`TaxRate::MAX`].
    #[must_use]
    pub const fn saturating_from_basis_points(basis_points: u32) -> Self {
        if basis_points > Self::MAX.0 {
            Self::MAX
        } else {
            Self(basis_points)
        }
    }

    /// Creates a rate from basis points.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InvalidTaxRate`] when the rate exceeds 100%.
    pub const fn from_basis_points(basis_points: u32) -> Result<Self, DealDomainError> {
        if basis_points > Self::MAX.0 {
            return Err(DealDomainError::InvalidTaxRate(basis_points));
        }
        Ok(Self(basis_points))
    }

    /// Returns the rate in basis points.
    #[must_use]
    pub const fn basis_points(self) -> u32 {
        self.0
    }

    /// Applies the rate to an amount, rounding half away from zero to cents.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::AmountOverflow`] when the result does not
    /// fit in minor units.
    pub fn apply(self, amount: Money) -> Result<Money, DealDomainError> {
        let product = i128::from(amount.cents()) * i128::from(self.0);
        let half = BASIS_POINTS_PER_UNIT.div_euclid(2);
        let magnitude = (product.abs() + half).div_euclid(BASIS_POINTS_PER_UNIT);
        let rounded = if product < 0 { -magnitude } else { magnitude };
        i64::try_from(rounded)
            .map(Money::from_cents)
            .map_err(|_| DealDomainError::AmountOverflow)
    }
}

impl fmt::Display for TaxRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0.div_euclid(10_000);
        let fraction = self.0.rem_euclid(10_000);
        write!(f, "{whole}.{fraction:04}")
    }
}

impl FromStr for TaxRate {
    type Err = ParseDecimalError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let scaled = parse_scaled_decimal(value, 4)?;
        let basis_points =
            u32::try_from(scaled).map_err(|_| ParseDecimalError(value.to_owned()))?;
        Self::from_basis_points(basis_points).map_err(|_| ParseDecimalError(value.to_owned()))
    }
}

impl Serialize for TaxRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TaxRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DecimalVisitor::<Self>::new("a tax rate between 0 and 1"))
    }
}

/// Consistent subtotal, tax and total for a priced offer.
///
/// The three amounts only ever change together through [`Pricing::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    subtotal: Money,
    tax: Money,
    total: Money,
}

impl Pricing {
    /// Computes `subtotal = quantity x unit_price`, `tax = subtotal x rate`
    /// (rounded to cents) and `total = subtotal + tax`.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InvalidQuantity`] for a zero quantity,
    /// [`DealDomainError::NegativeAmount`] for a negative unit price, or
    /// [`DealDomainError::AmountOverflow`] when any amount overflows.
    pub fn compute(
        quantity: u32,
        unit_price: Money,
        tax_rate: TaxRate,
    ) -> Result<Self, DealDomainError> {
        if quantity == 0 {
            return Err(DealDomainError::InvalidQuantity);
        }
        if unit_price.is_negative() {
            return Err(DealDomainError::NegativeAmount(unit_price));
        }
        let subtotal = unit_price.checked_mul_quantity(quantity)?;
        let tax = tax_rate.apply(subtotal)?;
        let total = subtotal.checked_add(tax)?;
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }

    /// Rebuilds pricing from stored amounts.
    ///
    /// # Errors
    ///
    /// Returns [`DealDomainError::InconsistentPricing`] when the total is not
    /// the sum of subtotal and tax.
    pub fn from_parts(subtotal: Money, tax: Money, total: Money) -> Result<Self, DealDomainError> {
        if subtotal.checked_add(tax)? != total {
            return Err(DealDomainError::InconsistentPricing);
        }
        Ok(Self {
            subtotal,
            tax,
            total,
        })
    }

    /// Returns the pre-tax amount.
    #[must_use]
    pub const fn subtotal(&self) -> Money {
        self.subtotal
    }

    /// Returns the tax amount.
    #[must_use]
    pub const fn tax(&self) -> Money {
        self.tax
    }

    /// Returns the amount payable.
    #[must_use]
    pub const fn total(&self) -> Money {
        self.total
    }
}

/// Parses a non-negative or negative decimal string into an integer scaled by
/// `10^scale`, rounding any extra fractional digits half away from zero.
fn parse_scaled_decimal(value: &str, scale: u32) -> Result<i128, ParseDecimalError> {
    let invalid = || ParseDecimalError(value.to_owned());
    let trimmed = value.trim();
    let (negative, digits) = trimmed
        .strip_prefix('-')
        .map_or((false, trimmed), |rest| (true, rest));
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits, ""));
    let all_digits = |part: &str| part.chars().all(|c| c.is_ascii_digit());
    if (whole.is_empty() && fraction.is_empty()) || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }

    let factor = 10_i128.pow(scale);
    let whole_value = if whole.is_empty() {
        0
    } else {
        whole.parse::<i128>().map_err(|_| invalid())?
    };

    let kept_digits = usize::try_from(scale).map_err(|_| invalid())?;
    let mut fraction_value: i128 = 0;
    let mut round_up = false;
    for (position, digit) in fraction.chars().enumerate() {
        let digit_value = i128::from(digit.to_digit(10).ok_or_else(invalid)?);
        if position < kept_digits {
            fraction_value = fraction_value * 10 + digit_value;
        } else {
            round_up = digit_value >= 5;
            break;
        }
    }
    let fraction_len = u32::try_from(fraction.len()).map_err(|_| invalid())?;
    if fraction_len < scale {
        fraction_value *= 10_i128.pow(scale - fraction_len);
    }

    let magnitude = whole_value
        .checked_mul(factor)
        .and_then(|scaled| scaled.checked_add(fraction_value))
        .and_then(|scaled| scaled.checked_add(i128::from(round_up)))
        .ok_or_else(invalid)?;
    Ok(if negative { -magnitude } else { magnitude })
}

/// Accepts JSON-style numbers or decimal strings and parses them via
/// [`FromStr`], so `100`, `100.0` and `"100.00"` all decode identically.
struct DecimalVisitor<T> {
    expecting: &'static str,
    marker: std::marker::PhantomData<T>,
}

impl<T> DecimalVisitor<T> {
    const fn new(expecting: &'static str) -> Self {
        Self {
            expecting,
            marker: std::marker::PhantomData,
        }
    }
}

impl<T> Visitor<'_> for DecimalVisitor<T>
where
    T: FromStr<Err = ParseDecimalError>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.expecting)
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<T, E> {
        value.parse().map_err(E::custom)
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<T, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<T, E> {
        self.visit_str(&value.to_string())
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<T, E> {
        self.visit_str(&value.to_string())
    }
}
