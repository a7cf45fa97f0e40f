// programs/quasar_core/src/pricing.rs
//
// Coverage Pricing
// ================
// Maps (period, covered amount, unit price) to the premium a buyer must pay.
// The curve is a trait so the pool can swap models without touching the
// registry logic; the linear curve below is the one stored in pool config.

use anchor_lang::prelude::*;

use crate::protocol_constants::{
    DEFAULT_PRICE_SCALE, MAX_COVERAGE_PERIOD, MIN_COVERAGE_PERIOD, SECONDS_PER_YEAR,
};
use crate::{CurveError, CurveResult};

/// A premium model. Implementations must be deterministic and monotonically
/// non-decreasing in both `amount` and `period`.
pub trait PremiumCurve {
    /// Premium for an already-validated period and nonzero amount
    fn premium(&self, period: i64, amount: u64, unit_price: u64) -> CurveResult<u64>;
}

/// Linear premium curve.
///
/// `premium = ceil(amount * unit_price * period / (base_period * price_scale))`
///
/// With the defaults (`price_scale = 100`, `base_period = 1 year`) the unit
/// price reads as "percent of the covered amount per year of coverage":
/// covering 100 for a year at unit price 2 costs 2.
///
/// Rounding is upward so a nonzero quote never collapses to a free cover.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub struct LinearPremiumCurve {
    /// Denominator applied to the unit price
    pub price_scale: u64,
    /// Period, in seconds, the unit price is quoted for
    pub base_period: i64,
}

impl Default for LinearPremiumCurve {
    fn default() -> Self {
        Self {
            price_scale: DEFAULT_PRICE_SCALE,
            base_period: SECONDS_PER_YEAR,
        }
    }
}

impl LinearPremiumCurve {
    /// Reject parameters that would divide by zero
    pub fn validate(&self) -> CurveResult<()> {
        if self.price_scale == 0 || self.base_period <= 0 {
            return Err(CurveError::InvalidParameters);
        }
        Ok(())
    }
}

impl PremiumCurve for LinearPremiumCurve {
    fn premium(&self, period: i64, amount: u64, unit_price: u64) -> CurveResult<u64> {
        self.validate()?;

        let numerator = (amount as u128)
            .checked_mul(unit_price as u128)
            .and_then(|v| v.checked_mul(period as u128))
            .ok_or(CurveError::Overflow)?;
        let denominator = (self.base_period as u128)
            .checked_mul(self.price_scale as u128)
            .ok_or(CurveError::Overflow)?;

        let premium = numerator
            .checked_add(denominator - 1)
            .ok_or(CurveError::Overflow)?
            / denominator;

        u64::try_from(premium).map_err(|_| CurveError::Overflow)
    }
}

/// Check `MIN_COVERAGE_PERIOD <= period <= MAX_COVERAGE_PERIOD`
pub fn validate_period(period: i64) -> CurveResult<()> {
    if !(MIN_COVERAGE_PERIOD..=MAX_COVERAGE_PERIOD).contains(&period) {
        return Err(CurveError::InvalidPeriod);
    }
    Ok(())
}

/// Quote the premium for a cover. Period bounds and amount are re-checked here
/// so the function is total regardless of what the caller validated.
pub fn quote<C: PremiumCurve + ?Sized>(
    curve: &C,
    period: i64,
    amount: u64,
    unit_price: u64,
) -> CurveResult<u64> {
    validate_period(period)?;
    if amount == 0 {
        return Err(CurveError::InvalidAmount);
    }
    curve.premium(period, amount, unit_price)
}
