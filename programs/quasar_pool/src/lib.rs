// programs/quasar_pool/src/lib.rs
//
// Quasar Mutual Capital Pool
// ==========================
// A single pooled reserve that:
// - Accepts stake from capital providers and pays them a time-weighted reward
// - Sells fixed-period coverage priced by the premium curve
// - Keeps backing capital at or above the minimum capital requirement (MCR)
// - Pays approved claims from premium revenue first, then from principal
//
// Roles:
// - Pricer: sets the unit price
// - Adjudicator: approves or rejects claims
//
// Token flows go through a reserve vault and a reward mint, both owned by
// the pool state PDA. Bookkeeping is written before any token CPI.

use anchor_lang::prelude::*;

pub mod state;
pub mod errors;
pub mod events;
pub mod instructions;

use instructions::*;
use state::Verdict;

declare_id!("QsrPoo1Mutua1Capita1Poo11111111111111111111");

#[program]
pub mod quasar_pool {
    use super::*;

    // ==================== INITIALIZATION ====================

    /// Create pool config, pool state, reserve vault and reward mint
    pub fn initialize_pool(
        ctx: Context<InitializePool>,
        params: InitializePoolParams,
    ) -> Result<()> {
        instructions::initialize::handler(ctx, params)
    }

    // ==================== PRICING ====================

    /// Replace the unit price (pricer only)
    pub fn set_unit_price(ctx: Context<SetUnitPrice>, new_price: u64) -> Result<()> {
        instructions::pricing::set_unit_price(ctx, new_price)
    }

    /// Premium for a prospective cover, returned as return data
    pub fn quote_premium(ctx: Context<QuotePremium>, period: i64, amount: u64) -> Result<u64> {
        instructions::pricing::quote_premium(ctx, period, amount)
    }

    // ==================== CAPITAL ====================

    /// Stake base asset into the pool
    pub fn deposit(ctx: Context<Deposit>, amount: u64) -> Result<()> {
        instructions::capital::deposit(ctx, amount)
    }

    /// Withdraw part of a stake while the pool stays solvent
    pub fn withdraw(ctx: Context<Withdraw>, amount: u64) -> Result<()> {
        instructions::capital::withdraw(ctx, amount)
    }

    /// Withdraw the whole stake, collect the reward and close the stake account
    pub fn exit(ctx: Context<Exit>) -> Result<()> {
        instructions::capital::exit(ctx)
    }

    // ==================== COVERAGE ====================

    /// Buy coverage, attaching at least the quoted premium
    pub fn buy_coverage(
        ctx: Context<BuyCoverage>,
        period: i64,
        amount: u64,
        paid_value: u64,
    ) -> Result<()> {
        instructions::coverage::buy_coverage(ctx, period, amount, paid_value)
    }

    /// Release a lapsed cover's obligation (permissionless)
    pub fn expire_coverage(ctx: Context<ExpireCoverage>, coverage_id: u64) -> Result<()> {
        instructions::coverage::expire_coverage(ctx, coverage_id)
    }

    // ==================== CLAIMS ====================

    /// Open a claim against an active cover (buyer only)
    pub fn open_claim(ctx: Context<OpenClaim>, coverage_id: u64, reason: String) -> Result<()> {
        instructions::claims::open_claim(ctx, coverage_id, reason)
    }

    /// Approve or reject a pending claim (adjudicator only)
    pub fn resolve_claim(
        ctx: Context<ResolveClaim>,
        coverage_id: u64,
        verdict: Verdict,
    ) -> Result<()> {
        instructions::claims::resolve_claim(ctx, coverage_id, verdict)
    }
}
