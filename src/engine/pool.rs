//! Pool creation and governance updates.

use tracing::info;

use super::Amm;
use crate::config::Params;
use crate::domain::{Address, Dec, Denom, MarketId, PoolId};
use crate::error::{AmmError, Result};
use crate::math::{tick_at_price, tick_at_sqrt_price};
use crate::state::{Pool, PoolState};
use crate::traits::BankKeeper;

impl<B: BankKeeper> Amm<B> {
    /// Creates the pool of a market at an initial price.
    ///
    /// `denom0` is the market's base and `denom1` its quote; `price` is
    /// quoted in `denom1` per `denom0`.  When `tick_spacing` is `None` the
    /// default spacing from [`Params`] is used.  The creator pays the pool
    /// creation fee to the fee collector.
    ///
    /// # Errors
    ///
    /// - [`AmmError::InvalidDenom`] if the denominations are equal.
    /// - [`AmmError::AlreadyExists`] if the market already has a pool.
    /// - [`AmmError::InvalidConfiguration`] if the tick spacing is not
    ///   allowed.
    /// - [`AmmError::InvalidPrice`] if `price` is outside the tick range.
    /// - [`AmmError::InsufficientFunds`] if the creator cannot pay the fee.
    pub fn create_pool(
        &mut self,
        creator: &Address,
        market_id: MarketId,
        denom0: Denom,
        denom1: Denom,
        price: Dec,
        tick_spacing: Option<u32>,
    ) -> Result<Pool> {
        self.transact(|amm| amm.execute_create_pool(creator, market_id, denom0, denom1, price, tick_spacing))
    }

    fn execute_create_pool(
        &mut self,
        creator: &Address,
        market_id: MarketId,
        denom0: Denom,
        denom1: Denom,
        price: Dec,
        tick_spacing: Option<u32>,
    ) -> Result<Pool> {
        if denom0 == denom1 {
            return Err(AmmError::InvalidDenom("pool denominations must differ"));
        }
        if self.store.pool_by_market(market_id).is_some() {
            return Err(AmmError::AlreadyExists("market already has a pool"));
        }
        let params = self.store.params();
        let tick_spacing = tick_spacing.unwrap_or(params.default_tick_spacing);
        if !params.is_allowed_tick_spacing(tick_spacing) {
            return Err(AmmError::InvalidConfiguration("tick spacing not allowed"));
        }
        tick_at_price(price)?;
        let sqrt_price = price.sqrt()?;
        let current_tick = tick_at_sqrt_price(sqrt_price)?;

        let fee = params.pool_creation_fee.clone();
        let fee_collector = params.fee_collector.clone();
        if !fee.is_empty() {
            self.bank.transfer(creator, &fee_collector, &fee)?;
        }

        let id = self.store.next_pool_id();
        let pool = Pool {
            id,
            market_id,
            denom0,
            denom1,
            tick_spacing,
            reserve_address: Address::pool_reserve(id),
        };
        self.store.set_pool(pool.clone());
        self.store.set_pool_state(id, PoolState::new(current_tick, sqrt_price));
        info!(
            pool_id = %id,
            market_id = %market_id,
            denom0 = %pool.denom0,
            denom1 = %pool.denom1,
            price = %price,
            tick = %current_tick,
            tick_spacing,
            "pool created"
        );
        Ok(pool)
    }

    /// Changes a pool's tick spacing.
    ///
    /// Every initialized tick of the pool must be a multiple of the new
    /// spacing, so existing positions stay valid bounds.
    ///
    /// # Errors
    ///
    /// - [`AmmError::NotFound`] if the pool does not exist.
    /// - [`AmmError::InvalidConfiguration`] if the spacing is not allowed
    ///   or an initialized tick would become misaligned.
    pub fn update_pool_tick_spacing(&mut self, pool_id: PoolId, tick_spacing: u32) -> Result<()> {
        self.transact(|amm| {
            if !amm.store.params().is_allowed_tick_spacing(tick_spacing) {
                return Err(AmmError::InvalidConfiguration("tick spacing not allowed"));
            }
            let mut pool = amm.store.get_pool(pool_id)?.clone();
            if amm
                .store
                .pool_ticks(pool_id)
                .any(|(tick, _)| !tick.is_aligned(tick_spacing))
            {
                return Err(AmmError::InvalidConfiguration(
                    "initialized ticks are not aligned to the new spacing",
                ));
            }
            let previous = pool.tick_spacing;
            pool.tick_spacing = tick_spacing;
            amm.store.set_pool(pool);
            info!(pool_id = %pool_id, previous, tick_spacing, "pool tick spacing updated");
            Ok(())
        })
    }

    /// Replaces the governance parameters.
    ///
    /// # Errors
    ///
    /// Returns [`AmmError::InvalidConfiguration`] if `params` is invalid.
    pub fn update_params(&mut self, params: Params) -> Result<()> {
        params.validate()?;
        self.store.set_params(params);
        info!("params updated");
        Ok(())
    }
}
