// programs/quasar_pool/src/errors.rs

use anchor_lang::prelude::*;
use quasar_core::CurveError;

#[error_code]
pub enum PoolError {
    #[msg("Unauthorized: caller lacks the required role")]
    Unauthorized,

    #[msg("Amount must be greater than zero")]
    InvalidAmount,

    #[msg("Coverage period must be between 14 and 365 days")]
    InvalidPeriod,

    #[msg("Attached payment is below the required premium")]
    InsufficientPayment,

    #[msg("Withdrawal exceeds staked balance")]
    InsufficientStake,

    #[msg("Coverage amount exceeds available pool capacity")]
    PoolCapacityExceeded,

    #[msg("Operation would leave capital below the minimum capital requirement")]
    SolvencyViolation,

    #[msg("Coverage or claim not found")]
    NotFound,

    #[msg("Coverage or claim is not in the required state")]
    InvalidState,

    #[msg("Coverage period has elapsed")]
    CoverageExpired,

    #[msg("Coverage period has not elapsed yet")]
    CoverageNotExpired,

    #[msg("Minimum wait before opening a claim has not passed")]
    ClaimWindowNotOpen,

    #[msg("Claim reason must be at most 200 bytes")]
    InvalidReason,

    #[msg("Invalid pool configuration")]
    InvalidConfig,

    #[msg("Invalid token account")]
    InvalidTokenAccount,

    #[msg("Math overflow")]
    MathOverflow,
}

impl From<CurveError> for PoolError {
    fn from(err: CurveError) -> Self {
        match err {
            CurveError::InvalidPeriod => PoolError::InvalidPeriod,
            CurveError::InvalidAmount => PoolError::InvalidAmount,
            CurveError::InvalidParameters => PoolError::InvalidConfig,
            CurveError::Overflow => PoolError::MathOverflow,
        }
    }
}
