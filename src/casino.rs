//! The casino facade: starts rounds, routes their transitions, and applies
//! every settlement to the wallet exactly once.
//!
//! Stakes are debited when a round starts. Payouts are credited when the
//! round reaches a terminal state, after which the session is dropped from
//! the registry and a `SettlementRecord` is appended to the history. The
//! history keeps the newest `history.max_records` entries; stats cover every
//! round.

use crate::config::CasinoConfig;
use crate::errors::{CasinoResult, GameError};
use crate::games::cases::{open_case, CaseOpening};
use crate::games::coinflip::{self, CoinflipResult};
use crate::games::crash::{CrashSession, CrashView, Tick};
use crate::games::crash_driver::CrashHandle;
use crate::games::mines::{MinesSession, MinesView, Reveal};
use crate::games::registry::{LiveSession, SessionRegistry};
use crate::games::types::{CoinSide, GameType, SessionId, Settlement};
use crate::random::{RandomSource, ThreadRandom};
use crate::storage::KeyValueStore;
use crate::wallet::{BalanceOwner, Wallet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, RwLock};
use uuid::Uuid;

/// One finished round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettlementRecord {
    pub id: Uuid,
    pub game: GameType,
    pub stake: f64,
    pub payout: f64,
    pub net: f64,
    pub settled_at: DateTime<Utc>,
}

/// Totals over every settled round
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CasinoStats {
    pub rounds: usize,
    pub wagered: f64,
    pub paid_out: f64,
    pub house_edge: f64,
}

/// Recent records plus running totals
#[derive(Default)]
struct Ledger {
    records: VecDeque<SettlementRecord>,
    rounds: usize,
    wagered: f64,
    paid_out: f64,
}

impl Ledger {
    fn record(&mut self, record: SettlementRecord, max_records: usize) {
        self.rounds += 1;
        self.wagered += record.stake;
        self.paid_out += record.payout;

        self.records.push_back(record);
        while self.records.len() > max_records {
            self.records.pop_front();
        }
    }
}

pub struct Casino {
    config: CasinoConfig,
    wallet: Arc<Wallet>,
    rng: Mutex<Box<dyn RandomSource>>,
    sessions: SessionRegistry,
    ledger: RwLock<Ledger>,
}

impl Casino {
    pub fn new(config: CasinoConfig, wallet: Arc<Wallet>, rng: Box<dyn RandomSource>) -> Self {
        Self {
            config,
            wallet,
            rng: Mutex::new(rng),
            sessions: SessionRegistry::new(),
            ledger: RwLock::new(Ledger::default()),
        }
    }

    /// Casino over a persisted wallet with an entropy-seeded random source
    pub fn open(config: CasinoConfig, store: Arc<dyn KeyValueStore>) -> CasinoResult<Self> {
        let wallet = Arc::new(Wallet::load(store, &config.wallet)?);
        Ok(Self::new(config, wallet, Box::new(ThreadRandom::new())))
    }

    pub fn config(&self) -> &CasinoConfig {
        &self.config
    }

    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    pub fn balance(&self) -> f64 {
        self.wallet.balance()
    }

    pub fn live_sessions(&self) -> usize {
        self.sessions.count()
    }

    // Cases

    /// Charge the case price and draw the prize. The prize is not credited
    /// until `settle_case`.
    pub fn open_case(&self, name: &str) -> CasinoResult<CaseOpening> {
        let case = self
            .config
            .case(name)
            .ok_or_else(|| GameError::UnknownCase(name.to_string()))?;

        let opening = self.with_rng(|rng| open_case(case, self.wallet.balance(), rng))?;
        self.wallet.debit(opening.price)?;

        tracing::info!(
            case = %opening.case_name,
            price = opening.price,
            payout = opening.payout,
            fallback = opening.fallback,
            "Case opened"
        );
        Ok(opening)
    }

    /// Credit the prize of an opened case. Returns the new balance.
    pub fn settle_case(&self, opening: CaseOpening) -> CasinoResult<f64> {
        self.settle(GameType::Case, opening.settlement())
    }

    /// Open a case and credit the prize after the presentation delay
    pub async fn open_case_revealed(&self, name: &str) -> CasinoResult<CaseOpening> {
        let opening = self.open_case(name)?;
        tokio::time::sleep(self.config.presentation.case_reveal_delay()).await;
        self.settle_case(opening.clone())?;
        Ok(opening)
    }

    // Crash

    /// Debit the stake and register a stepped Crash session
    pub fn start_crash(&self, stake: f64) -> CasinoResult<SessionId> {
        let session = self.begin_crash(stake)?;
        let id = self.sessions.insert(LiveSession::Crash(session));
        tracing::info!(session = %id, stake, "Crash started");
        Ok(id)
    }

    /// Advance a stepped Crash session by one tick
    pub fn crash_tick(&self, id: SessionId) -> CasinoResult<Tick> {
        let tick = self.sessions.with_crash(id, |session| session.tick())?;
        if let Tick::Crashed(multiplier) = tick {
            tracing::info!(session = %id, multiplier, "Crash round crashed");
            self.finish_session(id)?;
        }
        Ok(tick)
    }

    pub fn crash_cash_out(&self, id: SessionId) -> CasinoResult<Settlement> {
        let settlement = self.sessions.with_crash(id, |session| session.cash_out())??;
        self.finish_session(id)?;
        Ok(settlement)
    }

    /// Debit the stake and run the session on its own timer
    pub fn spawn_crash(&self, stake: f64) -> CasinoResult<CrashHandle> {
        let session = self.begin_crash(stake)?;
        tracing::info!(stake, "Crash spawned");
        Ok(CrashHandle::spawn(session, self.config.crash.tick_interval()))
    }

    /// Wait for a spawned round to end and apply its settlement
    pub async fn finish_crash(
        &self,
        handle: CrashHandle,
    ) -> CasinoResult<(CrashView, Settlement)> {
        let session = handle.finish().await?;
        let settlement = session.settlement().ok_or(GameError::InvalidTransition {
            state: session.state().as_str(),
            action: "settle",
        })?;
        self.settle(GameType::Crash, settlement)?;
        Ok((session.view(), settlement))
    }

    /// Player view of a stepped Crash session
    pub fn crash_session(&self, id: SessionId) -> Option<CrashView> {
        match self.sessions.get(id) {
            Some(LiveSession::Crash(session)) => Some(session.view()),
            _ => None,
        }
    }

    fn begin_crash(&self, stake: f64) -> CasinoResult<CrashSession> {
        let session = self.with_rng(|rng| {
            CrashSession::start(stake, self.wallet.balance(), &self.config.crash, rng)
        })?;
        self.wallet.debit(stake)?;
        Ok(session)
    }

    // Mines

    pub fn start_mines(&self, stake: f64) -> CasinoResult<SessionId> {
        let session = self.with_rng(|rng| {
            MinesSession::start(stake, self.wallet.balance(), &self.config.mines, rng)
        })?;
        self.wallet.debit(stake)?;

        let id = self.sessions.insert(LiveSession::Mines(session));
        tracing::info!(session = %id, stake, "Mines started");
        Ok(id)
    }

    pub fn reveal_cell(&self, id: SessionId, index: usize) -> CasinoResult<Reveal> {
        let reveal = self.sessions.with_mines(id, |session| session.reveal(index))??;
        match reveal {
            Reveal::Mine | Reveal::Cleared(_) => {
                tracing::info!(session = %id, index, ?reveal, "Mines round over");
                self.finish_session(id)?;
            }
            Reveal::Safe { .. } | Reveal::Ignored => {}
        }
        Ok(reveal)
    }

    pub fn mines_cash_out(&self, id: SessionId) -> CasinoResult<Settlement> {
        let settlement = self.sessions.with_mines(id, |session| session.cash_out())??;
        self.finish_session(id)?;
        Ok(settlement)
    }

    /// Player view of a live Mines session
    pub fn mines_session(&self, id: SessionId) -> Option<MinesView> {
        match self.sessions.get(id) {
            Some(LiveSession::Mines(session)) => Some(session.view()),
            _ => None,
        }
    }

    // Coinflip

    pub fn play_coinflip(&self, call: CoinSide, stake: f64) -> CasinoResult<CoinflipResult> {
        let result = self.flip(call, stake)?;
        self.settle(GameType::CoinFlip, result.settlement)?;
        Ok(result)
    }

    /// Coinflip with the landing animation delay before the payout
    pub async fn play_coinflip_revealed(
        &self,
        call: CoinSide,
        stake: f64,
    ) -> CasinoResult<CoinflipResult> {
        let result = self.flip(call, stake)?;
        tokio::time::sleep(self.config.presentation.coinflip_reveal_delay()).await;
        self.settle(GameType::CoinFlip, result.settlement)?;
        Ok(result)
    }

    fn flip(&self, call: CoinSide, stake: f64) -> CasinoResult<CoinflipResult> {
        let result = self.with_rng(|rng| {
            coinflip::play(call, stake, self.wallet.balance(), &self.config.coinflip, rng)
        })?;
        self.wallet.debit(stake)?;
        Ok(result)
    }

    // History

    /// Most recent settlements, oldest first
    pub fn history(&self) -> Vec<SettlementRecord> {
        self.with_ledger(|ledger| ledger.records.iter().cloned().collect())
    }

    pub fn stats(&self) -> CasinoStats {
        self.with_ledger(|ledger| {
            let house_edge = if ledger.wagered > 0.0 {
                (ledger.wagered - ledger.paid_out) / ledger.wagered
            } else {
                0.0
            };

            CasinoStats {
                rounds: ledger.rounds,
                wagered: ledger.wagered,
                paid_out: ledger.paid_out,
                house_edge,
            }
        })
    }

    /// Remove a terminal session and apply its settlement
    fn finish_session(&self, id: SessionId) -> CasinoResult<()> {
        let finished = match self.sessions.remove(id) {
            Some(LiveSession::Crash(session)) => {
                session.settlement().map(|s| (GameType::Crash, s))
            }
            Some(LiveSession::Mines(session)) => {
                session.settlement().map(|s| (GameType::Mines, s))
            }
            None => None,
        };
        match finished {
            Some((game, settlement)) => {
                self.settle(game, settlement)?;
            }
            None => tracing::warn!(session = %id, "Finished session had no settlement"),
        }
        Ok(())
    }

    fn settle(&self, game: GameType, settlement: Settlement) -> CasinoResult<f64> {
        let balance = self.wallet.credit(settlement.payout).map_err(|e| {
            tracing::error!(%game, payout = settlement.payout, "Payout not credited: {}", e);
            e
        })?;
        let record = SettlementRecord {
            id: Uuid::new_v4(),
            game,
            stake: settlement.stake,
            payout: settlement.payout,
            net: settlement.net(),
            settled_at: Utc::now(),
        };

        tracing::info!(
            %game,
            stake = record.stake,
            payout = record.payout,
            net = record.net,
            balance,
            "Round settled"
        );

        let max_records = self.config.history.max_records;
        match self.ledger.write() {
            Ok(mut ledger) => ledger.record(record, max_records),
            Err(poisoned) => poisoned.into_inner().record(record, max_records),
        }
        Ok(balance)
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        match self.ledger.read() {
            Ok(ledger) => f(&ledger),
            Err(poisoned) => f(&poisoned.into_inner()),
        }
    }

    fn with_rng<R>(&self, f: impl FnOnce(&mut dyn RandomSource) -> R) -> R {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut **rng)
    }
}
