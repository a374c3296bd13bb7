//! Crash: a multiplier climbs one step per tick until it reaches a hidden
//! crash point. Cashing out before that pays `stake * multiplier`.

use crate::config::CrashConfig;
use crate::errors::GameError;
use crate::games::types::{check_stake, Settlement};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CrashState {
    Running,
    CashedOut,
    Crashed,
}

impl CrashState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrashState::Running => "running",
            CrashState::CashedOut => "cashed out",
            CrashState::Crashed => "crashed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CrashState::Running)
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tick {
    /// Multiplier advanced to the contained value
    Rose(f64),
    /// Crash point reached; multiplier frozen at the contained value
    Crashed(f64),
    /// Session already finished, nothing changed
    Idle,
}

/// A Crash round. Not serializable: the crash point must stay server-side
/// while the round runs. Use `view` for anything shown to a player.
#[derive(Clone)]
pub struct CrashSession {
    stake: f64,
    step: f64,
    ticks: u32,
    crash_point: f64,
    state: CrashState,
}

/// Player-facing snapshot of a Crash round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashView {
    pub stake: f64,
    pub state: CrashState,
    pub multiplier: f64,
    /// Only set once the round is over
    pub crash_point: Option<f64>,
}

impl fmt::Debug for CrashSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrashSession")
            .field("stake", &self.stake)
            .field("state", &self.state)
            .field("multiplier", &self.multiplier())
            .field("crash_point", &self.crash_point())
            .finish()
    }
}

impl CrashSession {
    /// Validate the stake and sample a hidden crash point.
    ///
    /// With `high_roll_probability` the point is uniform over (1, high_roll_max),
    /// otherwise over (1, low_roll_max).
    pub fn start(
        stake: f64,
        available_balance: f64,
        config: &CrashConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, GameError> {
        check_stake(stake, config.min_stake, available_balance)?;

        let crash_point = if rng.chance(config.high_roll_probability) {
            rng.draw_range(1.0, config.high_roll_max)
        } else {
            rng.draw_range(1.0, config.low_roll_max)
        };

        Ok(Self::with_crash_point(stake, crash_point, config))
    }

    /// Session with a known crash point, for replays and tests
    pub fn with_crash_point(stake: f64, crash_point: f64, config: &CrashConfig) -> Self {
        Self {
            stake,
            step: config.step,
            ticks: 0,
            crash_point,
            state: CrashState::Running,
        }
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn state(&self) -> CrashState {
        self.state
    }

    /// Derived from the tick count so repeated steps don't accumulate error
    pub fn multiplier(&self) -> f64 {
        1.0 + self.ticks as f64 * self.step
    }

    /// The crash point, hidden until the session ends
    pub fn crash_point(&self) -> Option<f64> {
        self.state.is_terminal().then_some(self.crash_point)
    }

    pub fn view(&self) -> CrashView {
        CrashView {
            stake: self.stake,
            state: self.state,
            multiplier: self.multiplier(),
            crash_point: self.crash_point(),
        }
    }

    /// Advance one step. Reaching the crash point ends the round and keeps
    /// the last multiplier that was shown.
    pub fn tick(&mut self) -> Tick {
        if self.state != CrashState::Running {
            return Tick::Idle;
        }

        let next = 1.0 + (self.ticks + 1) as f64 * self.step;
        if next >= self.crash_point {
            self.state = CrashState::Crashed;
            tracing::debug!(
                stake = self.stake,
                multiplier = self.multiplier(),
                crash_point = self.crash_point,
                "Crash session crashed"
            );
            return Tick::Crashed(self.multiplier());
        }

        self.ticks += 1;
        Tick::Rose(next)
    }

    /// Take `stake * multiplier` at the last completed tick
    pub fn cash_out(&mut self) -> Result<Settlement, GameError> {
        if self.state != CrashState::Running {
            return Err(GameError::InvalidTransition {
                state: self.state.as_str(),
                action: "cash out",
            });
        }

        self.state = CrashState::CashedOut;
        let settlement = Settlement::win(self.stake, self.stake * self.multiplier());
        tracing::debug!(
            stake = self.stake,
            multiplier = self.multiplier(),
            payout = settlement.payout,
            "Crash session cashed out"
        );
        Ok(settlement)
    }

    /// Final settlement once the session is terminal
    pub fn settlement(&self) -> Option<Settlement> {
        match self.state {
            CrashState::Running => None,
            CrashState::CashedOut => {
                Some(Settlement::win(self.stake, self.stake * self.multiplier()))
            }
            CrashState::Crashed => Some(Settlement::loss(self.stake)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ScriptedDraws;

    fn config() -> CrashConfig {
        CrashConfig::default()
    }

    #[test]
    fn test_start_rejects_small_stake_and_missing_funds() {
        let mut rng = ScriptedDraws::default();
        assert_eq!(
            CrashSession::start(29.0, 1000.0, &config(), &mut rng).unwrap_err(),
            GameError::InvalidStake { stake: 29.0, minimum: 30.0 }
        );
        assert_eq!(
            CrashSession::start(30.0, 29.0, &config(), &mut rng).unwrap_err(),
            GameError::InsufficientFunds { required: 30.0, available: 29.0 }
        );
        assert_eq!(rng.remaining(), 0);
    }

    #[test]
    fn test_crash_point_sampling_ranges() {
        // Gate passes: wide range, 1 + 0.5 * 4
        let mut rng = ScriptedDraws::new([0.1, 0.5]);
        let mut session = CrashSession::start(30.0, 100.0, &config(), &mut rng).unwrap();
        session.cash_out().unwrap();
        assert!((session.crash_point().unwrap() - 3.0).abs() < 1e-9);

        // Gate fails: narrow range, 1 + 0.5 * 2
        let mut rng = ScriptedDraws::new([0.29, 0.5]);
        let mut session = CrashSession::start(30.0, 100.0, &config(), &mut rng).unwrap();
        session.cash_out().unwrap();
        assert!((session.crash_point().unwrap() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_crash_point_hidden_while_running() {
        let mut session = CrashSession::with_crash_point(30.0, 2.5, &config());
        session.tick();
        assert_eq!(session.crash_point(), None);

        let view = serde_json::to_value(session.view()).unwrap();
        assert_eq!(view["state"], "running");
        assert!(view["crash_point"].is_null());
        assert!(!format!("{session:?}").contains("2.5"));

        session.cash_out().unwrap();
        let view = serde_json::to_value(session.view()).unwrap();
        assert_eq!(view["crash_point"], 2.5);
    }

    #[test]
    fn test_cash_out_at_one_point_two() {
        let mut session = CrashSession::with_crash_point(30.0, 4.0, &config());
        assert_eq!(session.multiplier(), 1.0);
        assert!(matches!(session.tick(), Tick::Rose(m) if (m - 1.1).abs() < 1e-9));
        assert!(matches!(session.tick(), Tick::Rose(m) if (m - 1.2).abs() < 1e-9));

        let settlement = session.cash_out().unwrap();
        assert!((settlement.payout - 36.0).abs() < 1e-9);
        assert_eq!(session.state(), CrashState::CashedOut);

        // Late ticks cannot crash a cashed out session
        assert_eq!(session.tick(), Tick::Idle);
        assert_eq!(session.state(), CrashState::CashedOut);
    }

    #[test]
    fn test_crash_freezes_pre_increment_multiplier() {
        let mut session = CrashSession::with_crash_point(30.0, 1.25, &config());
        assert!(matches!(session.tick(), Tick::Rose(_)));
        assert!(matches!(session.tick(), Tick::Rose(_)));
        match session.tick() {
            Tick::Crashed(m) => assert!((m - 1.2).abs() < 1e-9),
            other => panic!("expected crash, got {other:?}"),
        }
        assert_eq!(session.state(), CrashState::Crashed);
        assert!((session.multiplier() - 1.2).abs() < 1e-9);
        assert_eq!(session.settlement(), Some(Settlement::loss(30.0)));
        assert!(session.cash_out().is_err());
    }

    #[test]
    fn test_multiplier_never_decreases() {
        let mut session = CrashSession::with_crash_point(50.0, 4.73, &config());
        let mut last = session.multiplier();
        for _ in 0..100 {
            session.tick();
            assert!(session.multiplier() >= last);
            last = session.multiplier();
        }
        assert_eq!(session.state(), CrashState::Crashed);
        assert!(session.multiplier() < 4.73);
    }

    #[test]
    fn test_crash_before_first_tick_completes() {
        let mut session = CrashSession::with_crash_point(30.0, 1.05, &config());
        assert_eq!(session.tick(), Tick::Crashed(1.0));
    }
}
