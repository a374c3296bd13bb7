//! Batch play for return-to-player analysis.
//!
//! Each strategy plays its rounds against a `SeededRandom` with an unlimited
//! bankroll, so two runs with the same seed produce identical reports.

use crate::config::CasinoConfig;
use crate::errors::{CasinoResult, ConfigurationError, GameError};
use crate::games::cases::open_case;
use crate::games::coinflip;
use crate::games::crash::{CrashSession, CrashState};
use crate::games::mines::{MinesSession, MinesState, Reveal};
use crate::games::types::{CoinSide, GameType, Settlement};
use crate::random::{RandomSource, SeededRandom};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Fixed playing strategy for one game
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "game", rename_all = "lowercase")]
pub enum Strategy {
    /// Cash out as soon as the multiplier reaches `cash_at`
    Crash { stake: f64, cash_at: f64 },
    /// Reveal `reveals` random hidden cells, then cash out
    Mines { stake: f64, reveals: usize },
    /// Always call heads
    CoinFlip { stake: f64 },
    /// Open the named case
    Case { name: String },
}

impl Strategy {
    pub fn game_type(&self) -> GameType {
        match self {
            Strategy::Crash { .. } => GameType::Crash,
            Strategy::Mines { .. } => GameType::Mines,
            Strategy::CoinFlip { .. } => GameType::CoinFlip,
            Strategy::Case { .. } => GameType::Case,
        }
    }
}

/// Aggregate results of a simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub game_type: GameType,
    pub seed: String,
    pub rounds: usize,
    pub wins: usize,
    pub win_rate: f64,
    pub wagered: f64,
    pub paid_out: f64,
    /// Paid out divided by wagered
    pub rtp: f64,
    pub house_edge: f64,
    pub execution_time: Duration,
}

/// Play `rounds` rounds of `strategy` seeded from `seed`
pub fn simulate(
    strategy: &Strategy,
    rounds: usize,
    seed: &str,
    config: &CasinoConfig,
) -> CasinoResult<SimulationReport> {
    let start_time = Instant::now();
    let mut rng = SeededRandom::from_seed_str(seed);

    let mut wins = 0;
    let mut wagered = 0.0;
    let mut paid_out = 0.0;

    for _ in 0..rounds {
        let settlement = play_round(strategy, config, &mut rng)?;
        wagered += settlement.stake;
        paid_out += settlement.payout;
        if settlement.net() > 0.0 {
            wins += 1;
        }
    }

    let win_rate = if rounds > 0 { wins as f64 / rounds as f64 } else { 0.0 };
    let rtp = if wagered > 0.0 { paid_out / wagered } else { 0.0 };
    let house_edge = if wagered > 0.0 { (wagered - paid_out) / wagered } else { 0.0 };

    let report = SimulationReport {
        game_type: strategy.game_type(),
        seed: rng.seed_hex().to_string(),
        rounds,
        wins,
        win_rate,
        wagered,
        paid_out,
        rtp,
        house_edge,
        execution_time: start_time.elapsed(),
    };

    tracing::info!(
        game = %report.game_type,
        rounds,
        win_rate,
        rtp,
        house_edge,
        "Simulation finished"
    );
    Ok(report)
}

fn play_round(
    strategy: &Strategy,
    config: &CasinoConfig,
    rng: &mut dyn RandomSource,
) -> CasinoResult<Settlement> {
    let settlement = match strategy {
        Strategy::Crash { stake, cash_at } => {
            let mut session = CrashSession::start(*stake, f64::INFINITY, &config.crash, rng)?;
            while session.state() == CrashState::Running
                && session.multiplier() + 1e-9 < *cash_at
            {
                session.tick();
            }
            if session.state() == CrashState::Running {
                session.cash_out()?
            } else {
                Settlement::loss(*stake)
            }
        }
        Strategy::Mines { stake, reveals } => {
            if *reveals == 0 {
                return Err(ConfigurationError::InvalidValue {
                    field: "reveals".to_string(),
                    value: "0".to_string(),
                    reason: "Mines strategy must reveal at least one cell".to_string(),
                }
                .into());
            }

            let mut session = MinesSession::start(*stake, f64::INFINITY, &config.mines, rng)?;
            for _ in 0..*reveals {
                let hidden: Vec<usize> = (0..session.grid_size())
                    .filter(|i| !session.revealed().contains(i))
                    .collect();
                let index = hidden[rng.draw_index(hidden.len())];
                match session.reveal(index)? {
                    Reveal::Safe { .. } => continue,
                    Reveal::Cleared(_) | Reveal::Mine | Reveal::Ignored => break,
                }
            }

            match session.state() {
                MinesState::Active => session.cash_out()?,
                _ => session.settlement().unwrap_or_else(|| Settlement::loss(*stake)),
            }
        }
        Strategy::CoinFlip { stake } => {
            let unlimited = f64::INFINITY;
            coinflip::play(CoinSide::Heads, *stake, unlimited, &config.coinflip, rng)?.settlement
        }
        Strategy::Case { name } => {
            let case = config
                .case(name)
                .ok_or_else(|| GameError::UnknownCase(name.clone()))?;
            open_case(case, f64::INFINITY, rng)?.settlement()
        }
    };
    Ok(settlement)
}
