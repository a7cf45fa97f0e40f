// programs/quasar_pool/src/instructions/capital.rs
//
// Capital Provider Operations
// ===========================
// Deposit, partial withdrawal and full exit. Every stake change checkpoints
// reward accrual first. Withdrawals and exits are refused while they would
// leave backing capital below the minimum capital requirement.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    Mint as MintInterface, TokenAccount as TokenAccountInterface, TokenInterface,
};
use quasar_core::cpi_helpers;

use crate::errors::PoolError;
use crate::events::{Deposited, RewardPaid, Withdrawn};
use crate::state::{PoolConfig, PoolState, StakeAccount};

// =============================================================================
// DEPOSIT
// =============================================================================

#[derive(Accounts)]
pub struct Deposit<'info> {
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
        init_if_needed,
        payer = provider,
        space = 8 + StakeAccount::INIT_SPACE,
        seeds = [StakeAccount::SEED_PREFIX, provider.key().as_ref()],
        bump
    )]
    pub stake_account: Account<'info, StakeAccount>,

    #[account(
        constraint = base_mint.key() == pool_config.base_mint @ PoolError::InvalidTokenAccount
    )]
    pub base_mint: InterfaceAccount<'info, MintInterface>,

    #[account(
        mut,
        constraint = provider_token_account.mint == pool_config.base_mint @ PoolError::InvalidTokenAccount,
        constraint = provider_token_account.owner == provider.key() @ PoolError::Unauthorized
    )]
    pub provider_token_account: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(
        mut,
        constraint = reserve_vault.key() == pool_config.reserve_vault @ PoolError::InvalidTokenAccount
    )]
    pub reserve_vault: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(mut)]
    pub provider: Signer<'info>,

    pub system_program: Program<'info, System>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn deposit(ctx: Context<Deposit>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let curve = ctx.accounts.pool_config.reward_curve;
    let provider = ctx.accounts.provider.key();

    let stake = &mut ctx.accounts.stake_account;
    if stake.provider == Pubkey::default() {
        stake.provider = provider;
        stake.bump = ctx.bumps.stake_account;
    }

    let state = &mut ctx.accounts.pool_state;
    let units = state.deposit(stake, amount, clock.unix_timestamp, &curve)?;

    emit!(Deposited {
        provider,
        amount,
        stake_amount: stake.amount,
        total_staked: state.total_staked,
        timestamp: clock.unix_timestamp,
    });
    msg!("Deposited {} for {} stake units", amount, units);

    // Persist bookkeeping before handing control to the token program
    ctx.accounts.pool_state.exit(&crate::ID)?;
    ctx.accounts.stake_account.exit(&crate::ID)?;

    cpi_helpers::transfer_base_asset(
        &ctx.accounts.token_program.to_account_info(),
        &ctx.accounts.provider_token_account.to_account_info(),
        &ctx.accounts.reserve_vault.to_account_info(),
        &ctx.accounts.provider.to_account_info(),
        &ctx.accounts.base_mint.to_account_info(),
        amount,
        ctx.accounts.base_mint.decimals,
        None,
    )
}

// =============================================================================
// WITHDRAW
// =============================================================================

#[derive(Accounts)]
pub struct Withdraw<'info> {
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
        mut,
        seeds = [StakeAccount::SEED_PREFIX, provider.key().as_ref()],
        bump = stake_account.bump,
        constraint = stake_account.provider == provider.key() @ PoolError::Unauthorized
    )]
    pub stake_account: Account<'info, StakeAccount>,

    #[account(
        constraint = base_mint.key() == pool_config.base_mint @ PoolError::InvalidTokenAccount
    )]
    pub base_mint: InterfaceAccount<'info, MintInterface>,

    #[account(
        mut,
        constraint = provider_token_account.mint == pool_config.base_mint @ PoolError::InvalidTokenAccount,
        constraint = provider_token_account.owner == provider.key() @ PoolError::Unauthorized
    )]
    pub provider_token_account: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(
        mut,
        constraint = reserve_vault.key() == pool_config.reserve_vault @ PoolError::InvalidTokenAccount
    )]
    pub reserve_vault: InterfaceAccount<'info, TokenAccountInterface>,

    pub provider: Signer<'info>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
    let clock = Clock::get()?;
    let curve = ctx.accounts.pool_config.reward_curve;

    let stake = &mut ctx.accounts.stake_account;
    let state = &mut ctx.accounts.pool_state;
    let payout = state.withdraw(stake, amount, clock.unix_timestamp, &curve)?;

    emit!(Withdrawn {
        provider: stake.provider,
        amount,
        payout,
        remaining_stake: stake.amount,
        total_staked: state.total_staked,
        timestamp: clock.unix_timestamp,
    });

    ctx.accounts.pool_state.exit(&crate::ID)?;
    ctx.accounts.stake_account.exit(&crate::ID)?;

    if payout == 0 {
        return Ok(());
    }

    let bump = ctx.accounts.pool_state.bump;
    let seeds: &[&[u8]] = &[PoolState::SEED_PREFIX, &[bump]];
    let signer_seeds: &[&[&[u8]]] = &[seeds];

    cpi_helpers::transfer_base_asset(
        &ctx.accounts.token_program.to_account_info(),
        &ctx.accounts.reserve_vault.to_account_info(),
        &ctx.accounts.provider_token_account.to_account_info(),
        &ctx.accounts.pool_state.to_account_info(),
        &ctx.accounts.base_mint.to_account_info(),
        payout,
        ctx.accounts.base_mint.decimals,
        Some(signer_seeds),
    )
}

// =============================================================================
// EXIT
// =============================================================================

/// Withdraw everything, mint accrued reward and close the stake account
#[derive(Accounts)]
pub struct Exit<'info> {
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
        mut,
        close = provider,
        seeds = [StakeAccount::SEED_PREFIX, provider.key().as_ref()],
        bump = stake_account.bump,
        constraint = stake_account.provider == provider.key() @ PoolError::Unauthorized
    )]
    pub stake_account: Account<'info, StakeAccount>,

    #[account(
        constraint = base_mint.key() == pool_config.base_mint @ PoolError::InvalidTokenAccount
    )]
    pub base_mint: InterfaceAccount<'info, MintInterface>,

    #[account(
        mut,
        constraint = reward_mint.key() == pool_config.reward_mint @ PoolError::InvalidTokenAccount
    )]
    pub reward_mint: InterfaceAccount<'info, MintInterface>,

    #[account(
        mut,
        constraint = provider_token_account.mint == pool_config.base_mint @ PoolError::InvalidTokenAccount,
        constraint = provider_token_account.owner == provider.key() @ PoolError::Unauthorized
    )]
    pub provider_token_account: InterfaceAccount<'info, TokenAccountInterface>,

    /// Receives the reward asset
    #[account(
        mut,
        constraint = provider_reward_account.mint == pool_config.reward_mint @ PoolError::InvalidTokenAccount,
        constraint = provider_reward_account.owner == provider.key() @ PoolError::Unauthorized
    )]
    pub provider_reward_account: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(
        mut,
        constraint = reserve_vault.key() == pool_config.reserve_vault @ PoolError::InvalidTokenAccount
    )]
    pub reserve_vault: InterfaceAccount<'info, TokenAccountInterface>,

    #[account(mut)]
    pub provider: Signer<'info>,

    pub token_program: Interface<'info, TokenInterface>,
}

pub fn exit(ctx: Context<Exit>) -> Result<()> {
    let clock = Clock::get()?;
    let curve = ctx.accounts.pool_config.reward_curve;
    let provider = ctx.accounts.provider.key();

    let stake = &mut ctx.accounts.stake_account;
    let state = &mut ctx.accounts.pool_state;
    let settlement = state.settle_exit(stake, clock.unix_timestamp, &curve)?;

    emit!(Withdrawn {
        provider,
        amount: settlement.withdrawn,
        payout: settlement.payout,
        remaining_stake: 0,
        total_staked: state.total_staked,
        timestamp: clock.unix_timestamp,
    });
    emit!(RewardPaid {
        provider,
        reward: settlement.reward,
        timestamp: clock.unix_timestamp,
    });
    msg!(
        "Provider exited: payout {}, reward {}",
        settlement.payout,
        settlement.reward
    );

    ctx.accounts.pool_state.exit(&crate::ID)?;
    ctx.accounts.stake_account.exit(&crate::ID)?;

    let bump = ctx.accounts.pool_state.bump;
    let seeds: &[&[u8]] = &[PoolState::SEED_PREFIX, &[bump]];
    let signer_seeds: &[&[&[u8]]] = &[seeds];

    if settlement.payout > 0 {
        cpi_helpers::transfer_base_asset(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.reserve_vault.to_account_info(),
            &ctx.accounts.provider_token_account.to_account_info(),
            &ctx.accounts.pool_state.to_account_info(),
            &ctx.accounts.base_mint.to_account_info(),
            settlement.payout,
            ctx.accounts.base_mint.decimals,
            Some(signer_seeds),
        )?;
    }

    if settlement.reward > 0 {
        cpi_helpers::mint_reward(
            &ctx.accounts.token_program.to_account_info(),
            &ctx.accounts.reward_mint.to_account_info(),
            &ctx.accounts.provider_reward_account.to_account_info(),
            &ctx.accounts.pool_state.to_account_info(),
            settlement.reward,
            signer_seeds,
        )?;
    }

    Ok(())
}
