//! Coin tap mini-game: tap for coins, buy tap power with balance, and
//! exchange coins for balance once enough have been collected.

use crate::config::TapConfig;
use crate::errors::{CasinoResult, GameError};
use crate::storage::{load_or, KeyValueStore};
use crate::wallet::{BalanceOwner, Wallet};
use std::sync::Arc;

pub const COINS_KEY: &str = "tap_coins";
pub const COIN_POWER_KEY: &str = "coin_tap_power";
pub const SUBSCRIBED_KEY: &str = "telegram_subscribed";

#[derive(Debug, Clone, Copy, PartialEq)]
struct Progress {
    coins: u64,
    power: u64,
    subscribed: bool,
}

pub struct TapGame {
    progress: Progress,
    config: TapConfig,
    store: Arc<dyn KeyValueStore>,
}

impl TapGame {
    pub fn load(store: Arc<dyn KeyValueStore>, config: TapConfig) -> CasinoResult<Self> {
        let progress = Progress {
            coins: load_or(store.as_ref(), COINS_KEY, 0u64)?,
            power: load_or(store.as_ref(), COIN_POWER_KEY, 1u64)?,
            subscribed: load_or(store.as_ref(), SUBSCRIBED_KEY, false)?,
        };

        Ok(Self {
            progress,
            config,
            store,
        })
    }

    pub fn coins(&self) -> u64 {
        self.progress.coins
    }

    pub fn power(&self) -> u64 {
        self.progress.power
    }

    pub fn is_subscribed(&self) -> bool {
        self.progress.subscribed
    }

    /// Add one tap's worth of coins
    pub fn tap(&mut self) -> CasinoResult<u64> {
        let next = Progress {
            coins: self.progress.coins + self.progress.power,
            ..self.progress
        };
        self.commit(next)?;
        Ok(self.progress.coins)
    }

    /// Pay the wallet's tap upgrade cost for one more coin per tap
    pub fn upgrade(&mut self, wallet: &Wallet) -> CasinoResult<u64> {
        let cost = wallet.tap_upgrade_cost();
        wallet.debit(cost)?;

        let next = Progress {
            power: self.progress.power + 1,
            ..self.progress
        };
        if let Err(e) = self.commit(next) {
            if let Err(refund) = wallet.credit(cost) {
                tracing::error!(cost, "Failed to refund coin tap upgrade: {}", refund);
            }
            return Err(e);
        }

        tracing::info!(power = self.progress.power, "Coin tap upgraded");
        Ok(self.progress.power)
    }

    /// Exchange the withdraw threshold in coins for the withdraw amount.
    /// Returns the new balance.
    pub fn withdraw(&mut self, wallet: &dyn BalanceOwner) -> CasinoResult<f64> {
        let threshold = self.config.withdraw_threshold;
        if self.progress.coins < threshold {
            return Err(GameError::InsufficientFunds {
                required: threshold as f64,
                available: self.progress.coins as f64,
            }
            .into());
        }

        let before = self.progress;
        self.commit(Progress {
            coins: before.coins - threshold,
            ..before
        })?;

        match wallet.credit(self.config.withdraw_amount) {
            Ok(balance) => {
                tracing::info!(coins = self.progress.coins, balance, "Coins withdrawn");
                Ok(balance)
            }
            Err(e) => {
                if let Err(restore) = self.commit(before) {
                    tracing::error!(coins = before.coins, "Failed to restore coins: {}", restore);
                }
                Err(e)
            }
        }
    }

    /// One-time coin bonus. Returns whether the bonus was granted now.
    pub fn claim_subscription_bonus(&mut self) -> CasinoResult<bool> {
        if self.progress.subscribed {
            return Ok(false);
        }
        self.commit(Progress {
            coins: self.progress.coins + self.config.subscribe_bonus,
            subscribed: true,
            ..self.progress
        })?;
        Ok(true)
    }

    /// Persist `next` and only then make it the live progress
    fn commit(&mut self, next: Progress) -> CasinoResult<()> {
        self.store.batch_write(&[
            (COINS_KEY, next.coins.to_string()),
            (COIN_POWER_KEY, next.power.to_string()),
            (SUBSCRIBED_KEY, next.subscribed.to_string()),
        ])?;
        self.progress = next;
        Ok(())
    }
}
