// programs/quasar_pool/src/instructions/claims.rs
//
// Claim Submission and Resolution
// ===============================
// A buyer opens at most one claim per cover while the cover is Active.
// The adjudicator approves or rejects it; an approval pays the full covered
// amount from the reserve vault, premium revenue first.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    Mint as MintInterface, TokenAccount as TokenAccountInterface, TokenInterface,
};
use quasar_core::cpi_helpers;

use crate::errors::PoolError;
use crate::events::{ClaimOpened, ClaimPayedOut, ClaimResolved};
use crate::state::{ClaimAccount, CoverageAccount, PoolConfig, PoolState, Verdict};

// =============================================================================
// OPEN CLAIM
// =============================================================================

#[derive(Accounts)]
#[instruction(coverage_id: u64)]
pub struct OpenClaim<'info> {
    #[account(
        seeds = [PoolConfig::SEED_PREFIX],
        bump = pool_config.bump,
    )]
    pub pool_config: Account<'info, PoolConfig>,

    #[account(
        mut,
        seeds = [CoverageAccount::SEED_PREFIX, &coverage_id.to_le_bytes()],
        bump = coverage.bump,
    )]
    pub coverage: Account<'info, CoverageAccount>,

    /// Existing only when the cover already carried a claim, which
    /// `open_claim` then rejects as InvalidState
    #[account(
        init_if_needed,
        payer = claimant,
        space = 8 + ClaimAccount::INIT_SPACE,
        seeds = [ClaimAccount::SEED_PREFIX, &coverage_id.to_le_bytes()],
        bump
    )]
    pub claim: Account<'info, ClaimAccount>,

    #[account(mut)]
    pub claimant: Signer<'info>,

    pub system_program: Program<'info, System>,
}

pub fn open_claim(ctx: Context<OpenClaim>, coverage_id: u64, reason: String) -> Result<()> {
    let clock = Clock::get()?;
    let min_claim_delay = ctx.accounts.pool_config.min_claim_delay;
    let claimant = ctx.accounts.claimant.key();

    let coverage = &mut ctx.accounts.coverage;
    let claim = &mut ctx.accounts.claim;
    coverage.open_claim(
        claim,
        claimant,
        reason,
        clock.unix_timestamp,
        min_claim_delay,
    )?;
    claim.bump = ctx.bumps.claim;

    emit!(ClaimOpened {
        coverage_id,
        claimant,
        amount: coverage.amount,
        reason: claim.reason.clone(),
        timestamp: clock.unix_timestamp,
    });

    msg!("Claim opened on coverage {}", coverage_id);
    Ok(())
}

// =============================================================================
// RESOLVE CLAIM
// =============================================================================

#[derive(Accounts)]
#[instruction(coverage_id: u64)]
pub struct ResolveClaim<'info> {
    #[account(
        seeds = [PoolConfig::SEED_PREFIX],
        bump = pool_config.bump,
        constraint = pool_config.is_adjudicator(&adjudicator.key()) @ PoolError::Unauthorized
    )]
    pub pool_config: Account<'info, PoolConfig>,

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

    #[account(
        mut,
        seeds = [ClaimAccount::SEED_PREFIX, &coverage_id.to_le_bytes()],
        bump = claim.bump,
    )]
    pub claim: Account<'info, ClaimAccount>,

    #[account(
        constraint = base_mint.key() == pool_config.base_mint @ PoolError::InvalidTokenAccount
    )]
    pub base_mint: InterfaceAccount<'info, MintInterface>,

    /// Payout destination, must belong to the cover's buyer
    #[account(
        mut,
        constraint = claimant_token_account.mint == pool_config.base_mint @ PoolError::InvalidTokenAccount,
        constraint = claimant_token_account.owner == coverage.buyer @ PoolError::InvalidTokenAccount
    )]
    pub claimant_token_account: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(
        mut,
        constraint = reserve_vault.key() == pool_config.reserve_vault @ PoolError::InvalidTokenAccount
    )]
    pub reserve_vault: InterfaceAccount<'info, TokenAccountInterface>,

    pub adjudicator: Signer<'info>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn resolve_claim(ctx: Context<ResolveClaim>, coverage_id: u64, verdict: Verdict) -> Result<()> {
    let clock = Clock::get()?;
    let vault_balance = ctx.accounts.reserve_vault.amount;

    let coverage = &mut ctx.accounts.coverage;
    let claim = &mut ctx.accounts.claim;
    let state = &mut ctx.accounts.pool_state;
    let settlement = state.resolve_claim(coverage, claim, verdict, clock.unix_timestamp)?;

    // Ledger and vault must agree before anything leaves the pool
    require!(
        vault_balance >= settlement.payout,
        PoolError::SolvencyViolation
    );

    if settlement.payout > 0 {
        emit!(ClaimPayedOut {
            coverage_id,
            claimant: coverage.buyer,
            amount: settlement.payout,
            from_premium_revenue: settlement.from_premium_revenue,
            from_capital: settlement.from_capital,
            timestamp: clock.unix_timestamp,
        });
    }

    emit!(ClaimResolved {
        coverage_id,
        decision: claim.decision,
        adjudicator: ctx.accounts.adjudicator.key(),
        mcr: state.mcr,
        timestamp: clock.unix_timestamp,
    });
    msg!(
        "Claim on coverage {} resolved as {:?}, payout {}",
        coverage_id,
        claim.decision,
        settlement.payout
    );

    // Persist bookkeeping before handing control to the token program
    ctx.accounts.pool_state.exit(&crate::ID)?;
    ctx.accounts.coverage.exit(&crate::ID)?;
    ctx.accounts.claim.exit(&crate::ID)?;

    if settlement.payout == 0 {
        return Ok(());
    }

    let bump = ctx.accounts.pool_state.bump;
    let seeds: &[&[u8]] = &[PoolState::SEED_PREFIX, &[bump]];
    let signer_seeds: &[&[&[u8]]] = &[seeds];

    cpi_helpers::transfer_base_asset(
        &ctx.accounts.token_program.to_account_info(),
        &ctx.accounts.reserve_vault.to_account_info(),
        &ctx.accounts.claimant_token_account.to_account_info(),
        &ctx.accounts.pool_state.to_account_info(),
        &ctx.accounts.base_mint.to_account_info(),
        settlement.payout,
        ctx.accounts.base_mint.decimals,
        Some(signer_seeds),
    )
}
