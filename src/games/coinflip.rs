//! Coinflip: call a side, flip, and win double only if the call matches and
//! a second gate also passes.

use crate::config::CoinflipConfig;
use crate::errors::GameError;
use crate::games::types::{check_stake, CoinSide, GameOutcome, Settlement};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CoinflipResult {
    pub call: CoinSide,
    pub outcome: CoinSide,
    pub won: bool,
    pub settlement: Settlement,
}

impl CoinflipResult {
    pub fn game_outcome(&self) -> GameOutcome {
        if self.won {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        }
    }
}

/// Flip a fair coin
pub fn flip(rng: &mut dyn RandomSource) -> CoinSide {
    if rng.chance(0.5) {
        CoinSide::Heads
    } else {
        CoinSide::Tails
    }
}

/// Play one round. The gate is only drawn when the call matched.
pub fn play(
    call: CoinSide,
    stake: f64,
    available_balance: f64,
    config: &CoinflipConfig,
    rng: &mut dyn RandomSource,
) -> Result<CoinflipResult, GameError> {
    check_stake(stake, config.min_stake, available_balance)?;

    let outcome = flip(rng);
    let won = outcome == call && rng.chance(config.win_probability);
    let settlement = if won {
        Settlement::win(stake, stake * config.payout_multiplier)
    } else {
        Settlement::loss(stake)
    };

    tracing::debug!(%call, %outcome, won, stake, payout = settlement.payout, "Coinflip played");

    Ok(CoinflipResult {
        call,
        outcome,
        won,
        settlement,
    })
}
