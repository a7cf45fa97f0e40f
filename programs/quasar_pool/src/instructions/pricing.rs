// programs/quasar_pool/src/instructions/pricing.rs
//
// Unit Price Control and Premium Quotes
// =====================================

use anchor_lang::prelude::*;
use quasar_core::quote;

use crate::errors::PoolError;
use crate::events::PriceUpdated;
use crate::state::{PoolConfig, PoolState};

// =============================================================================
// SET UNIT PRICE
// =============================================================================

/// Pricer-only. Affects future purchases, never existing covers.
#[derive(Accounts)]
pub struct SetUnitPrice<'info> {
    #[account(
        seeds = [PoolConfig::SEED_PREFIX],
        bump = pool_config.bump,
        constraint = pool_config.is_pricer(&pricer.key()) @ PoolError::Unauthorized
    )]
    pub pool_config: Account<'info, PoolConfig>,

    #[account(
        mut,
        seeds = [PoolState::SEED_PREFIX],
        bump = pool_state.bump,
    )]
    pub pool_state: Account<'info, PoolState>,

    pub pricer: Signer<'info>,
}

pub fn set_unit_price(ctx: Context<SetUnitPrice>, new_price: u64) -> Result<()> {
    let clock = Clock::get()?;
    let state = &mut ctx.accounts.pool_state;

    let old_price = state.set_unit_price(new_price);

    emit!(PriceUpdated {
        pricer: ctx.accounts.pricer.key(),
        old_price,
        new_price,
        timestamp: clock.unix_timestamp,
    });

    msg!("Unit price {} -> {}", old_price, new_price);
    Ok(())
}

// =============================================================================
// QUOTE PREMIUM
// =============================================================================

/// Read-only premium quote at the current unit price
#[derive(Accounts)]
pub struct QuotePremium<'info> {
    #[account(
        seeds = [PoolConfig::SEED_PREFIX],
        bump = pool_config.bump,
    )]
    pub pool_config: Account<'info, PoolConfig>,

    #[account(
        seeds = [PoolState::SEED_PREFIX],
        bump = pool_state.bump,
    )]
    pub pool_state: Account<'info, PoolState>,
}

pub fn quote_premium(ctx: Context<QuotePremium>, period: i64, amount: u64) -> Result<u64> {
    let premium = quote(
        &ctx.accounts.pool_config.premium_curve,
        period,
        amount,
        ctx.accounts.pool_state.unit_price,
    )
    .map_err(PoolError::from)?;

    msg!("Premium for {} over {}s: {}", amount, period, premium);
    Ok(premium)
}
