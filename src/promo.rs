//! Promo code redemption.
//!
//! The live client talks to a remote endpoint; `PromoService` is the seam, and
//! `InMemoryPromoService` applies the same rules locally.

use crate::errors::{CasinoResult, PromoError};
use crate::wallet::BalanceOwner;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

/// A redeemable code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoCode {
    pub code: String,
    pub reward: f64,
    pub max_uses: u32,
    pub current_uses: u32,
    pub is_active: bool,
}

impl PromoCode {
    pub fn new(code: impl Into<String>, reward: f64, max_uses: u32) -> Self {
        Self {
            code: code.into(),
            reward,
            max_uses,
            current_uses: 0,
            is_active: true,
        }
    }
}

/// Successful redemption
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromoReward {
    pub code: String,
    pub reward: f64,
}

#[async_trait]
pub trait PromoService: Send + Sync {
    async fn redeem(&self, user_id: &str, code: &str) -> Result<PromoReward, PromoError>;
}

#[derive(Default)]
struct PromoLedger {
    codes: HashMap<String, PromoCode>,
    activations: HashSet<(String, String)>,
}

#[derive(Default)]
pub struct InMemoryPromoService {
    ledger: Mutex<PromoLedger>,
}

impl InMemoryPromoService {
    pub fn new(codes: impl IntoIterator<Item = PromoCode>) -> Self {
        let codes = codes.into_iter().map(|c| (c.code.clone(), c)).collect();
        Self {
            ledger: Mutex::new(PromoLedger {
                codes,
                activations: HashSet::new(),
            }),
        }
    }

    pub async fn add_code(&self, code: PromoCode) {
        self.ledger.lock().await.codes.insert(code.code.clone(), code);
    }

    pub async fn deactivate(&self, code: &str) -> bool {
        match self.ledger.lock().await.codes.get_mut(code) {
            Some(promo) => {
                promo.is_active = false;
                true
            }
            None => false,
        }
    }

    pub async fn uses(&self, code: &str) -> Option<u32> {
        self.ledger.lock().await.codes.get(code).map(|c| c.current_uses)
    }
}

#[async_trait]
impl PromoService for InMemoryPromoService {
    async fn redeem(&self, user_id: &str, code: &str) -> Result<PromoReward, PromoError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PromoError::EmptyCode);
        }

        let mut ledger = self.ledger.lock().await;
        let PromoLedger { codes, activations } = &mut *ledger;

        let promo = codes
            .get_mut(code)
            .ok_or_else(|| PromoError::NotFound(code.to_string()))?;
        if !promo.is_active {
            return Err(PromoError::Inactive(code.to_string()));
        }
        if promo.current_uses >= promo.max_uses {
            return Err(PromoError::Exhausted(code.to_string()));
        }

        let key = (user_id.to_string(), code.to_string());
        if activations.contains(&key) {
            return Err(PromoError::AlreadyUsed {
                code: code.to_string(),
                user_id: user_id.to_string(),
            });
        }

        activations.insert(key);
        promo.current_uses += 1;
        tracing::info!(user_id, code, reward = promo.reward, "Promo code redeemed");

        Ok(PromoReward {
            code: code.to_string(),
            reward: promo.reward,
        })
    }
}

/// Redeem `code` for `user_id` and credit the reward. Returns the new balance.
pub async fn apply_promo(
    service: &dyn PromoService,
    wallet: &dyn BalanceOwner,
    user_id: &str,
    code: &str,
) -> CasinoResult<f64> {
    let reward = service.redeem(user_id, code).await?;
    wallet.credit(reward.reward)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use crate::errors::CasinoError;
    use crate::wallet::Wallet;

    fn service() -> InMemoryPromoService {
        InMemoryPromoService::new([PromoCode::new("NEON50", 50.0, 2)])
    }

    #[tokio::test]
    async fn test_redeem_credits_wallet() {
        let service = service();
        let wallet = Wallet::in_memory(&WalletConfig::default());

        let balance = apply_promo(&service, &wallet, "alice", "  NEON50 ").await.unwrap();
        assert_eq!(balance, 150.0);
        assert_eq!(service.uses("NEON50").await, Some(1));
    }

    #[tokio::test]
    async fn test_rules() {
        let service = service();

        assert_eq!(service.redeem("alice", "   ").await, Err(PromoError::EmptyCode));
        assert!(matches!(service.redeem("alice", "NOPE").await, Err(PromoError::NotFound(_))));

        service.redeem("alice", "NEON50").await.unwrap();
        assert!(matches!(
            service.redeem("alice", "NEON50").await,
            Err(PromoError::AlreadyUsed { .. })
        ));

        service.redeem("bob", "NEON50").await.unwrap();
        assert!(matches!(service.redeem("carol", "NEON50").await, Err(PromoError::Exhausted(_))));

        service.add_code(PromoCode::new("OLD", 10.0, 100)).await;
        assert!(service.deactivate("OLD").await);
        assert!(matches!(service.redeem("carol", "OLD").await, Err(PromoError::Inactive(_))));
    }

    #[tokio::test]
    async fn test_failed_redeem_leaves_balance() {
        let service = service();
        let wallet = Wallet::in_memory(&WalletConfig::default());
        let err = apply_promo(&service, &wallet, "alice", "MISSING").await.unwrap_err();
        assert!(matches!(err, CasinoError::Promo(PromoError::NotFound(_))));
        assert_eq!(wallet.balance(), 100.0);
    }
}
