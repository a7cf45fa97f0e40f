// programs/quasar_core/src/rewards.rs
//
// Reward Accrual Curve
// ====================
// Capital providers earn the reward asset in proportion to how much they
// staked and for how long. The pool checkpoints accrual on every stake change,
// so a curve only ever sees a constant amount over one elapsed interval.

use anchor_lang::prelude::*;

use crate::protocol_constants::{DEFAULT_REWARD_RATE_PER_SECOND, REWARD_RATE_SCALE};
use crate::{CurveError, CurveResult};

/// A reward model. Must return 0 for zero stake or non-positive elapsed time
/// and be non-decreasing in both inputs.
pub trait RewardCurve {
    fn reward(&self, amount: u64, elapsed: i64) -> CurveResult<u64>;
}

/// `reward = floor(amount * elapsed * rate_per_second / rate_scale)`
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq, InitSpace)]
pub struct LinearRewardCurve {
    /// Reward units per staked unit per second, scaled by `rate_scale`
    pub rate_per_second: u64,
    /// Fixed-point denominator for `rate_per_second`
    pub rate_scale: u64,
}

impl Default for LinearRewardCurve {
    fn default() -> Self {
        Self {
            rate_per_second: DEFAULT_REWARD_RATE_PER_SECOND,
            rate_scale: REWARD_RATE_SCALE,
        }
    }
}

impl LinearRewardCurve {
    pub fn validate(&self) -> CurveResult<()> {
        if self.rate_scale == 0 {
            return Err(CurveError::InvalidParameters);
        }
        Ok(())
    }
}

impl RewardCurve for LinearRewardCurve {
    fn reward(&self, amount: u64, elapsed: i64) -> CurveResult<u64> {
        self.validate()?;
        if amount == 0 || elapsed <= 0 {
            return Ok(0);
        }

        let reward = (amount as u128)
            .checked_mul(elapsed as u128)
            .and_then(|v| v.checked_mul(self.rate_per_second as u128))
            .ok_or(CurveError::Overflow)?
            / self.rate_scale as u128;

        u64::try_from(reward).map_err(|_| CurveError::Overflow)
    }
}
