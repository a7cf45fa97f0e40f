// programs/quasar_pool/src/instructions/coverage.rs
//
// Coverage Purchase and Expiry
// ============================
// A purchase charges the premium at the current unit price and reserves the
// covered amount against backing capital. Expiry is permissionless: once the
// period has elapsed anyone may release the obligation.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    Mint as MintInterface, TokenAccount as TokenAccountInterface, TokenInterface,
};
use quasar_core::cpi_helpers;

use crate::errors::PoolError;
use crate::events::{CoverExpired, CoverPurchased};
use crate::state::{CoverageAccount, PoolConfig, PoolState};

// =============================================================================
// BUY COVERAGE
// =============================================================================

#[derive(Accounts)]
pub struct BuyCoverage<'info> {
    #[account(
        seeds = [PoolConfig::SEED_PREFIX],
        bump = pool_config.bump,
    )]
    pub pool_config: Account<'info, PoolConfig>,

    #[account(
        mut,
        seeds = [PoolState::SEED_PREFIX],
        bump = pool_state.bump,
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        init,
        payer = buyer,
        space = 8 + CoverageAccount::INIT_SPACE,
        seeds = [
            CoverageAccount::SEED_PREFIX,
            &pool_state.next_coverage_id.to_le_bytes()
        ],
        bump
    )]
    pub coverage: Account<'info, CoverageAccount>,

    #[account(
        constraint = base_mint.key() == pool_config.base_mint @ PoolError::InvalidTokenAccount
    )]
    pub base_mint: InterfaceAccount<'info, MintInterface>,

    #[account(
        mut,
        constraint = buyer_token_account.mint == pool_config.base_mint @ PoolError::InvalidTokenAccount,
        constraint = buyer_token_account.owner == buyer.key() @ PoolError::Unauthorized
    )]
    pub buyer_token_account: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(
        mut,
        constraint = reserve_vault.key() == pool_config.reserve_vault @ PoolError::InvalidTokenAccount
    )]
    pub reserve_vault: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(mut)]
    pub buyer: Signer<'info>,

    pub system_program: Program<'info, System>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn buy_coverage(
    ctx: Context<BuyCoverage>,
    period: i64,
    amount: u64,
    paid_value: u64,
) -> Result<()> {
    let clock = Clock::get()?;
    let curve = ctx.accounts.pool_config.premium_curve;
    let buyer = ctx.accounts.buyer.key();

    let coverage = &mut ctx.accounts.coverage;
    let state = &mut ctx.accounts.pool_state;
    let premium = state.purchase_coverage(
        coverage,
        buyer,
        period,
        amount,
        paid_value,
        clock.unix_timestamp,
        &curve,
    )?;
    coverage.bump = ctx.bumps.coverage;

    emit!(CoverPurchased {
        coverage_id: coverage.coverage_id,
        buyer,
        amount,
        period,
        premium,
        paid_value,
        expires_at: coverage.expires_at(),
        mcr: state.mcr,
        timestamp: clock.unix_timestamp,
    });
    msg!(
        "Coverage {} bought: amount {}, premium {}, capacity left {}",
        coverage.coverage_id,
        amount,
        premium,
        state.available_capacity()
    );

    // Persist bookkeeping before handing control to the token program
    ctx.accounts.pool_state.exit(&crate::ID)?;
    ctx.accounts.coverage.exit(&crate::ID)?;

    if paid_value == 0 {
        return Ok(());
    }

    cpi_helpers::transfer_base_asset(
        &ctx.accounts.token_program.to_account_info(),
        &ctx.accounts.buyer_token_account.to_account_info(),
        &ctx.accounts.reserve_vault.to_account_info(),
        &ctx.accounts.buyer.to_account_info(),
        &ctx.accounts.base_mint.to_account_info(),
        paid_value,
        ctx.accounts.base_mint.decimals,
        None,
    )
}

// =============================================================================
// EXPIRE COVERAGE
// =============================================================================

#[derive(Accounts)]
#[instruction(coverage_id: u64)]
pub struct ExpireCoverage<'info> {
    #[account(
        mut,
        seeds = [PoolState::SEED_PREFIX],
        bump = pool_state.bump,
    )]
    pub pool_state: Account<'info, PoolState>,

    #[account(
        mut,
        seeds = [CoverageAccount::SEED_PREFIX, &coverage_id.to_le_bytes()],
        bump = coverage.bump,
    )]
    pub coverage: Account<'info, CoverageAccount>,

    pub caller: Signer<'info>,
}

pub fn expire_coverage(ctx: Context<ExpireCoverage>, coverage_id: u64) -> Result<()> {
    let clock = Clock::get()?;

    let coverage = &mut ctx.accounts.coverage;
    let state = &mut ctx.accounts.pool_state;
    state.expire_coverage(coverage, clock.unix_timestamp)?;

    emit!(CoverExpired {
        coverage_id,
        amount: coverage.amount,
        mcr: state.mcr,
        timestamp: clock.unix_timestamp,
    });

    msg!("Coverage {} expired, MCR now {}", coverage_id, state.mcr);
    Ok(())
}
