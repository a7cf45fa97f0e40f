// programs/quasar_pool/src/events.rs

use anchor_lang::prelude::*;

use crate::state::ClaimDecision;

/// Emitted when the pool is initialized
#[event]
pub struct PoolInitialized {
    pub authority: Pubkey,
    pub pricer: Pubkey,
    pub adjudicator: Pubkey,
    pub base_mint: Pubkey,
    pub reward_mint: Pubkey,
    pub unit_price: u64,
    pub timestamp: i64,
}

/// Emitted when the pricer changes the unit price
#[event]
pub struct PriceUpdated {
    pub pricer: Pubkey,
    pub old_price: u64,
    pub new_price: u64,
    pub timestamp: i64,
}

/// Emitted when a provider stakes capital
#[event]
pub struct Deposited {
    pub provider: Pubkey,
    pub amount: u64,
    pub stake_amount: u64,
    pub total_staked: u64,
    pub timestamp: i64,
}

/// Emitted when a provider withdraws capital
#[event]
pub struct Withdrawn {
    pub provider: Pubkey,
    /// Nominal stake removed
    pub amount: u64,
    /// Base asset paid out (below `amount` only after socialized claim losses)
    pub payout: u64,
    pub remaining_stake: u64,
    pub total_staked: u64,
    pub timestamp: i64,
}

/// Emitted when accrued reward is minted to a provider
#[event]
pub struct RewardPaid {
    pub provider: Pubkey,
    pub reward: u64,
    pub timestamp: i64,
}

/// Emitted when coverage is bought
#[event]
pub struct CoverPurchased {
    pub coverage_id: u64,
    pub buyer: Pubkey,
    pub amount: u64,
    pub period: i64,
    pub premium: u64,
    pub paid_value: u64,
    pub expires_at: i64,
    pub mcr: u64,
    pub timestamp: i64,
}

/// Emitted when a lapsed coverage releases its obligation
#[event]
pub struct CoverExpired {
    pub coverage_id: u64,
    pub amount: u64,
    pub mcr: u64,
    pub timestamp: i64,
}

/// Emitted when a buyer opens a claim
#[event]
pub struct ClaimOpened {
    pub coverage_id: u64,
    pub claimant: Pubkey,
    pub amount: u64,
    pub reason: String,
    pub timestamp: i64,
}

/// Emitted when an approved claim is paid
#[event]
pub struct ClaimPayedOut {
    pub coverage_id: u64,
    pub claimant: Pubkey,
    pub amount: u64,
    pub from_premium_revenue: u64,
    pub from_capital: u64,
    pub timestamp: i64,
}

/// Emitted when the adjudicator decides a claim
#[event]
pub struct ClaimResolved {
    pub coverage_id: u64,
    pub decision: ClaimDecision,
    pub adjudicator: Pubkey,
    pub mcr: u64,
    pub timestamp: i64,
}
