// programs/quasar_pool/src/instructions/initialize.rs
//
// Pool Initialization
// ===================
// Creates the config and state accounts, the reserve vault for the base
// asset and the reward mint. The pool state PDA owns both token accounts.

use anchor_lang::prelude::*;
use anchor_spl::token_interface::{
    Mint as MintInterface, TokenAccount as TokenAccountInterface, TokenInterface,
};
use quasar_core::protocol_constants::DEFAULT_UNIT_PRICE;
use quasar_core::{LinearPremiumCurve, LinearRewardCurve};

use crate::errors::PoolError;
use crate::events::PoolInitialized;
use crate::state::{PoolConfig, PoolState};

#[derive(Accounts)]
#[instruction(params: InitializePoolParams)]
pub struct InitializePool<'info> {
    #[account(
        init,
        payer = authority,
        space = 8 + PoolConfig::INIT_SPACE,
        seeds = [PoolConfig::SEED_PREFIX],
        bump
    )]
    pub pool_config: Account<'info, PoolConfig>,

    #[account(
        init,
        payer = authority,
        space = 8 + PoolState::INIT_SPACE,
        seeds = [PoolState::SEED_PREFIX],
        bump
    )]
    pub pool_state: Account<'info, PoolState>,

    /// Base asset mint
    pub base_mint: Box<InterfaceAccount<'info, MintInterface>>,

    /// Reserve vault holding staked capital and premium revenue
    #[account(
        init,
        payer = authority,
        token::mint = base_mint,
        token::authority = pool_state,
        token::token_program = token_program,
        seeds = [PoolConfig::RESERVE_VAULT_SEED, base_mint.key().as_ref()],
        bump
    )]
    pub reserve_vault: Box<InterfaceAccount<'info, TokenAccountInterface>>,

    /// Reward asset, minted only by the pool
    #[account(
        init,
        payer = authority,
        mint::decimals = params.reward_decimals,
        mint::authority = pool_state,
        mint::token_program = token_program,
        seeds = [PoolConfig::REWARD_MINT_SEED],
        bump
    )]
    pub reward_mint: Box<InterfaceAccount<'info, MintInterface>>,

    #[account(mut)]
    pub authority: Signer<'info>,

    pub system_program: Program<'info, System>,

    pub token_program: Interface<'info, TokenInterface>,

    pub rent: Sysvar<'info, Rent>,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone)]
pub struct InitializePoolParams {
    pub pricer: Pubkey,
    pub adjudicator: Pubkey,
    pub unit_price: Option<u64>,
    pub premium_curve: Option<LinearPremiumCurve>,
    pub reward_curve: Option<LinearRewardCurve>,
    pub min_claim_delay: Option<i64>,
    pub reward_decimals: u8,
}

pub fn handler(ctx: Context<InitializePool>, params: InitializePoolParams) -> Result<()> {
    let clock = Clock::get()?;

    require_keys_neq!(params.pricer, Pubkey::default(), PoolError::InvalidConfig);
    require_keys_neq!(params.adjudicator, Pubkey::default(), PoolError::InvalidConfig);

    let config = &mut ctx.accounts.pool_config;
    config.authority = ctx.accounts.authority.key();
    config.pricer = params.pricer;
    config.adjudicator = params.adjudicator;
    config.base_mint = ctx.accounts.base_mint.key();
    config.reserve_vault = ctx.accounts.reserve_vault.key();
    config.reward_mint = ctx.accounts.reward_mint.key();
    config.premium_curve = params.premium_curve.unwrap_or_default();
    config.reward_curve = params.reward_curve.unwrap_or_default();
    config.min_claim_delay = params
        .min_claim_delay
        .unwrap_or(PoolConfig::DEFAULT_MIN_CLAIM_DELAY);
    config.bump = ctx.bumps.pool_config;
    config.validate()?;

    let unit_price = params.unit_price.unwrap_or(DEFAULT_UNIT_PRICE);

    let state = &mut ctx.accounts.pool_state;
    state.total_staked = 0;
    state.unit_price = unit_price;
    state.mcr = 0;
    state.premium_revenue = 0;
    state.principal_loss = 0;
    state.next_coverage_id = 0;
    state.active_coverages = 0;
    state.total_claims_paid = 0;
    state.total_rewards_minted = 0;
    state.bump = ctx.bumps.pool_state;

    msg!("Base mint: {}", config.base_mint);
    msg!("Reserve vault: {}", config.reserve_vault);
    msg!("Reward mint: {}", config.reward_mint);

    emit!(PoolInitialized {
        authority: config.authority,
        pricer: config.pricer,
        adjudicator: config.adjudicator,
        base_mint: config.base_mint,
        reward_mint: config.reward_mint,
        unit_price,
        timestamp: clock.unix_timestamp,
    });

    msg!("Capital pool initialized, unit price {}", unit_price);
    Ok(())
}
