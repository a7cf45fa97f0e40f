// programs/quasar_core/src/lib.rs
//
// Quasar Core - Shared Curves and Token Utilities
// ===============================================
//
// This crate provides:
// - Coverage period bounds and protocol-wide constants
// - The premium curve (coverage pricing) as a pluggable pure function
// - The reward curve (time-weighted stake accrual) as a pluggable pure function
// - CPI helpers for base-asset transfers and reward-asset minting
//
// Nothing in here owns an account. The pool program stores the curve
// parameters in its config account and calls into these functions.

use anchor_lang::prelude::*;

// =============================================================================
// SUBMODULES
// =============================================================================

/// Coverage pricing: period bounds and the premium curve
pub mod pricing;

/// Reward accrual curve for capital providers
pub mod rewards;

pub use pricing::{quote, validate_period, LinearPremiumCurve, PremiumCurve};
pub use rewards::{LinearRewardCurve, RewardCurve};

// =============================================================================
// PROTOCOL CONSTANTS
// =============================================================================

pub mod protocol_constants {
    /// Seconds in one day
    pub const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

    /// Seconds in a 365-day year (31_536_000)
    pub const SECONDS_PER_YEAR: i64 = 365 * SECONDS_PER_DAY;

    /// Shortest coverage period that can be bought (inclusive)
    pub const MIN_COVERAGE_PERIOD: i64 = 14 * SECONDS_PER_DAY;

    /// Longest coverage period that can be bought (inclusive)
    pub const MAX_COVERAGE_PERIOD: i64 = 365 * SECONDS_PER_DAY;

    /// Initial unit price: 2% of the covered amount per year of coverage
    pub const DEFAULT_UNIT_PRICE: u64 = 2;

    /// Unit price is expressed in hundredths of the covered amount
    pub const DEFAULT_PRICE_SCALE: u64 = 100;

    /// Reward units minted per staked unit per second, scaled by REWARD_RATE_SCALE
    pub const DEFAULT_REWARD_RATE_PER_SECOND: u64 = 1_000;

    /// Fixed-point scale for the reward rate (1e6)
    pub const REWARD_RATE_SCALE: u64 = 1_000_000;

    /// Maximum byte length of a claim reason
    pub const MAX_REASON_LEN: usize = 200;
}

// =============================================================================
// ERRORS
// =============================================================================

/// Failure modes of the pure curve functions.
///
/// The pool program maps each variant onto its own error code, so these stay
/// plain Rust values instead of an on-chain error enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CurveError {
    /// Coverage period outside [MIN_COVERAGE_PERIOD, MAX_COVERAGE_PERIOD]
    InvalidPeriod,
    /// Zero covered amount
    InvalidAmount,
    /// Curve configured with a zero scale or period
    InvalidParameters,
    /// Result does not fit in u64
    Overflow,
}

impl std::fmt::Display for CurveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CurveError::InvalidPeriod => write!(f, "coverage period out of bounds"),
            CurveError::InvalidAmount => write!(f, "amount must be greater than zero"),
            CurveError::InvalidParameters => write!(f, "curve parameters are invalid"),
            CurveError::Overflow => write!(f, "curve arithmetic overflow"),
        }
    }
}

pub type CurveResult<T> = core::result::Result<T, CurveError>;

// =============================================================================
// CPI HELPERS
// =============================================================================

/// Helper functions for moving the base asset and minting the reward asset.
/// Works with both the classic Token program and Token-2022.
pub mod cpi_helpers {
    use super::*;

    use anchor_spl::token_interface;

    /// Transfer base-asset tokens with transfer_checked.
    /// Pass signer seeds when the reserve vault PDA is the authority.
    #[allow(clippy::too_many_arguments)]
    pub fn transfer_base_asset<'info>(
        token_program: &AccountInfo<'info>,
        from: &AccountInfo<'info>,
        to: &AccountInfo<'info>,
        authority: &AccountInfo<'info>,
        mint: &AccountInfo<'info>,
        amount: u64,
        decimals: u8,
        signer_seeds: Option<&[&[&[u8]]]>,
    ) -> Result<()> {
        let cpi_accounts = token_interface::TransferChecked {
            from: from.clone(),
            to: to.clone(),
            authority: authority.clone(),
            mint: mint.clone(),
        };

        let cpi_ctx = if let Some(seeds) = signer_seeds {
            CpiContext::new_with_signer(token_program.clone(), cpi_accounts, seeds)
        } else {
            CpiContext::new(token_program.clone(), cpi_accounts)
        };

        token_interface::transfer_checked(cpi_ctx, amount, decimals)
    }

    /// Mint reward-asset tokens. The mint authority is always a program PDA.
    pub fn mint_reward<'info>(
        token_program: &AccountInfo<'info>,
        mint: &AccountInfo<'info>,
        to: &AccountInfo<'info>,
        authority: &AccountInfo<'info>,
        amount: u64,
        signer_seeds: &[&[&[u8]]],
    ) -> Result<()> {
        let cpi_accounts = token_interface::MintTo {
            mint: mint.clone(),
            to: to.clone(),
            authority: authority.clone(),
        };

        token_interface::mint_to(
            CpiContext::new_with_signer(token_program.clone(), cpi_accounts, signer_seeds),
            amount,
        )
    }
}
