//! The balance owner.
//!
//! `Wallet` is the only component that changes the balance. All debits and
//! credits go through one mutex, and every change is mirrored to the
//! key-value store under the same keys the web client used.

use crate::config::WalletConfig;
use crate::errors::{CasinoResult, GameError};
use crate::storage::{load_or, KeyValueStore, MemoryStore};
use std::sync::{Arc, Mutex, MutexGuard};

pub const BALANCE_KEY: &str = "casino_balance";
pub const TAP_POWER_KEY: &str = "tap_power";

/// Debit/credit interface the game layer settles through
pub trait BalanceOwner: Send + Sync {
    fn balance(&self) -> f64;

    /// Remove `amount`, failing without change when the balance is short or
    /// the new balance cannot be persisted. Returns the new balance.
    fn debit(&self, amount: f64) -> CasinoResult<f64>;

    /// Add `amount`, failing without change when the new balance cannot be
    /// persisted. Returns the new balance.
    fn credit(&self, amount: f64) -> CasinoResult<f64>;
}

#[derive(Debug, Clone, Copy)]
struct WalletState {
    balance: f64,
    tap_power: u32,
}

pub struct Wallet {
    state: Mutex<WalletState>,
    store: Arc<dyn KeyValueStore>,
    tap_upgrade_cost: f64,
}

impl Wallet {
    /// Initialize from `store`, using config defaults for missing keys
    pub fn load(store: Arc<dyn KeyValueStore>, config: &WalletConfig) -> CasinoResult<Self> {
        let balance = load_or(store.as_ref(), BALANCE_KEY, config.initial_balance)?;
        let tap_power = load_or(store.as_ref(), TAP_POWER_KEY, config.initial_tap_power)?;

        tracing::info!(balance, tap_power, "Wallet loaded");
        Ok(Self {
            state: Mutex::new(WalletState { balance, tap_power }),
            store,
            tap_upgrade_cost: config.tap_upgrade_cost,
        })
    }

    /// Wallet over a fresh in-memory store
    pub fn in_memory(config: &WalletConfig) -> Self {
        Self {
            state: Mutex::new(WalletState {
                balance: config.initial_balance,
                tap_power: config.initial_tap_power,
            }),
            store: Arc::new(MemoryStore::new()),
            tap_upgrade_cost: config.tap_upgrade_cost,
        }
    }

    pub fn tap_power(&self) -> u32 {
        self.lock().tap_power
    }

    /// Balance cost of one tap upgrade, shared by the coin tap game
    pub fn tap_upgrade_cost(&self) -> f64 {
        self.tap_upgrade_cost
    }

    /// Credit one tap's worth of balance
    pub fn tap(&self) -> CasinoResult<f64> {
        let mut state = self.lock();
        let next = WalletState {
            balance: state.balance + state.tap_power as f64,
            ..*state
        };
        self.commit(&mut state, next)?;
        Ok(state.balance)
    }

    /// Spend the upgrade cost to raise tap power by one
    pub fn upgrade_tap(&self) -> CasinoResult<u32> {
        let mut state = self.lock();
        if state.balance < self.tap_upgrade_cost {
            return Err(GameError::InsufficientFunds {
                required: self.tap_upgrade_cost,
                available: state.balance,
            }
            .into());
        }
        let next = WalletState {
            balance: state.balance - self.tap_upgrade_cost,
            tap_power: state.tap_power + 1,
        };
        self.commit(&mut state, next)?;

        tracing::info!(tap_power = state.tap_power, balance = state.balance, "Tap upgraded");
        Ok(state.tap_power)
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        // A panic mid-update leaves plain numbers behind; keep serving them.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Persist `next` and only then make it the live state
    fn commit(&self, state: &mut WalletState, next: WalletState) -> CasinoResult<()> {
        let items = [
            (BALANCE_KEY, next.balance.to_string()),
            (TAP_POWER_KEY, next.tap_power.to_string()),
        ];
        if let Err(e) = self.store.batch_write(&items) {
            tracing::warn!("Failed to persist wallet state, change discarded: {}", e);
            return Err(e);
        }
        *state = next;
        Ok(())
    }
}

impl BalanceOwner for Wallet {
    fn balance(&self) -> f64 {
        self.lock().balance
    }

    fn debit(&self, amount: f64) -> CasinoResult<f64> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(GameError::InvalidStake {
                stake: amount,
                minimum: 0.0,
            }
            .into());
        }

        let mut state = self.lock();
        if state.balance < amount {
            return Err(GameError::InsufficientFunds {
                required: amount,
                available: state.balance,
            }
            .into());
        }
        let next = WalletState {
            balance: state.balance - amount,
            ..*state
        };
        self.commit(&mut state, next)?;

        tracing::debug!(amount, balance = state.balance, "Debited");
        Ok(state.balance)
    }

    fn credit(&self, amount: f64) -> CasinoResult<f64> {
        let mut state = self.lock();
        if amount.is_finite() && amount > 0.0 {
            let next = WalletState {
                balance: state.balance + amount,
                ..*state
            };
            self.commit(&mut state, next)?;
            tracing::debug!(amount, balance = state.balance, "Credited");
        }
        Ok(state.balance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::CasinoError;
    use crate::storage::testing::FlakyStore;

    fn config() -> WalletConfig {
        WalletConfig::default()
    }

    #[test]
    fn test_defaults() {
        let wallet = Wallet::in_memory(&config());
        assert_eq!(wallet.balance(), 100.0);
        assert_eq!(wallet.tap_power(), 1);
        assert_eq!(wallet.tap_upgrade_cost(), 50.0);
    }

    #[test]
    fn test_debit_never_goes_negative() {
        let wallet = Wallet::in_memory(&config());
        assert_eq!(wallet.debit(60.0).unwrap(), 40.0);
        assert!(matches!(
            wallet.debit(40.01),
            Err(CasinoError::Game(GameError::InsufficientFunds { required, available }))
                if required == 40.01 && available == 40.0
        ));
        assert_eq!(wallet.balance(), 40.0);
        assert!(wallet.debit(-5.0).is_err());
    }

    #[test]
    fn test_credit_ignores_non_positive() {
        let wallet = Wallet::in_memory(&config());
        assert_eq!(wallet.credit(0.0).unwrap(), 100.0);
        assert_eq!(wallet.credit(f64::NAN).unwrap(), 100.0);
        assert_eq!(wallet.credit(36.0).unwrap(), 136.0);
    }

    #[test]
    fn test_tap_and_upgrade() {
        let wallet = Wallet::in_memory(&config());
        assert_eq!(wallet.tap().unwrap(), 101.0);
        assert_eq!(wallet.upgrade_tap().unwrap(), 2);
        assert_eq!(wallet.balance(), 51.0);
        assert_eq!(wallet.tap().unwrap(), 53.0);
        assert_eq!(wallet.upgrade_tap().unwrap(), 3);
        assert!(wallet.upgrade_tap().is_err());
        assert_eq!(wallet.tap_power(), 3);
    }

    #[test]
    fn test_state_mirrored_to_store() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        {
            let wallet = Wallet::load(store.clone(), &config()).unwrap();
            wallet.debit(25.5).unwrap();
            wallet.upgrade_tap().unwrap();
        }

        assert_eq!(store.get(BALANCE_KEY).unwrap().as_deref(), Some("24.5"));
        let wallet = Wallet::load(store, &config()).unwrap();
        assert_eq!(wallet.balance(), 24.5);
        assert_eq!(wallet.tap_power(), 2);
    }

    #[test]
    fn test_failed_write_leaves_memory_and_store_in_step() {
        let store = Arc::new(FlakyStore::new());
        let wallet = Wallet::load(store.clone(), &config()).unwrap();
        wallet.debit(10.0).unwrap();

        store.fail_writes(true);
        assert!(matches!(wallet.debit(20.0), Err(CasinoError::Storage(_))));
        assert!(wallet.credit(50.0).is_err());
        assert!(wallet.tap().is_err());
        assert!(wallet.upgrade_tap().is_err());
        assert_eq!(wallet.balance(), 90.0);
        assert_eq!(wallet.tap_power(), 1);

        // A restart sees exactly what the live wallet reported
        store.fail_writes(false);
        let reloaded = Wallet::load(store, &config()).unwrap();
        assert_eq!(reloaded.balance(), 90.0);
        assert_eq!(reloaded.tap_power(), 1);
    }

    #[test]
    fn test_concurrent_debits_serialize() {
        let wallet = Arc::new(Wallet::in_memory(&WalletConfig {
            initial_balance: 1000.0,
            ..config()
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let wallet = wallet.clone();
                std::thread::spawn(move || (0..50).filter(|_| wallet.debit(3.0).is_ok()).count())
            })
            .collect();
        let successes: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();

        assert_eq!(successes, 333);
        assert!((wallet.balance() - 1.0).abs() < 1e-9);
    }
}
