use crate::errors::GameError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a live Crash or Mines session
pub type SessionId = Uuid;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameType {
    Crash,
    Mines,
    CoinFlip,
    Case,
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameType::Crash => write!(f, "crash"),
            GameType::Mines => write!(f, "mines"),
            GameType::CoinFlip => write!(f, "coinflip"),
            GameType::Case => write!(f, "case"),
        }
    }
}

impl std::str::FromStr for GameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "crash" => Ok(GameType::Crash),
            "mines" => Ok(GameType::Mines),
            "coinflip" | "coin" => Ok(GameType::CoinFlip),
            "case" | "cases" => Ok(GameType::Case),
            other => Err(format!("unknown game type: {}", other)),
        }
    }
}

/// Coin side, used both for the player's call and the landed face
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoinSide {
    Heads,
    Tails,
}

impl fmt::Display for CoinSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoinSide::Heads => write!(f, "heads"),
            CoinSide::Tails => write!(f, "tails"),
        }
    }
}

impl std::str::FromStr for CoinSide {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "heads" | "h" => Ok(CoinSide::Heads),
            "tails" | "t" => Ok(CoinSide::Tails),
            other => Err(format!("expected heads or tails, got {}", other)),
        }
    }
}

/// Game outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Win,
    Loss,
}

/// Final balance effect of a finished round: the stake that was debited up
/// front and the payout credited at the end (zero on a loss).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub stake: f64,
    pub payout: f64,
}

impl Settlement {
    pub fn win(stake: f64, payout: f64) -> Self {
        Self { stake, payout }
    }

    pub fn loss(stake: f64) -> Self {
        Self { stake, payout: 0.0 }
    }

    /// Signed change to the balance over the whole round
    pub fn net(&self) -> f64 {
        self.payout - self.stake
    }

    pub fn outcome(&self) -> GameOutcome {
        if self.payout > 0.0 {
            GameOutcome::Win
        } else {
            GameOutcome::Loss
        }
    }
}

/// Shared precondition for starting any staked round
pub(crate) fn check_stake(stake: f64, minimum: f64, available: f64) -> Result<(), GameError> {
    if !stake.is_finite() || stake < minimum {
        return Err(GameError::InvalidStake { stake, minimum });
    }
    if available < stake {
        return Err(GameError::InsufficientFunds {
            required: stake,
            available,
        });
    }
    Ok(())
}
