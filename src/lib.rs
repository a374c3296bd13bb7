//! Neon Casino - reward and settlement engine
//!
//! Weighted prize resolution for cases and three staked mini-games (Crash,
//! Mines, Coinflip) modeled as explicit state machines. All randomness comes
//! from an injected `RandomSource`; all balance changes go through the
//! `Wallet`.

pub mod casino;
pub mod config;
pub mod errors;
pub mod games;
pub mod odds;
pub mod promo;
pub mod random;
pub mod storage;
pub mod tap;
pub mod wallet;

pub use casino::{Casino, CasinoStats, SettlementRecord};
pub use config::{CasinoConfig, ConfigLoader};
pub use errors::{CasinoError, CasinoResult, GameError};
pub use odds::{resolve, OddsEntry};
pub use random::{RandomSource, ScriptedDraws, SeededRandom, ThreadRandom};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore};
pub use wallet::{BalanceOwner, Wallet};
