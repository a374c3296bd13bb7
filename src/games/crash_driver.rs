//! Real-time driver for a Crash session.
//!
//! One tokio task owns the session and is the only thing that mutates it. Ticks
//! come from an interval, cash-out requests from a channel, and both are
//! consumed by a single `select!` that polls commands first: a cash-out that is
//! already waiting when a tick fires is settled at the multiplier of the last
//! completed tick, and once recorded no later tick can crash the round.

use crate::errors::GameError;
use crate::games::crash::{CrashSession, CrashState, Tick};
use crate::games::types::Settlement;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

enum CrashCommand {
    CashOut(oneshot::Sender<Result<Settlement, GameError>>),
}

/// Handle to a running Crash round
pub struct CrashHandle {
    commands: mpsc::Sender<CrashCommand>,
    multiplier: watch::Receiver<f64>,
    state: watch::Receiver<CrashState>,
    task: JoinHandle<CrashSession>,
}

impl CrashHandle {
    /// Start ticking `session` every `tick_interval`
    pub fn spawn(session: CrashSession, tick_interval: Duration) -> Self {
        let (commands, rx) = mpsc::channel(4);
        let (multiplier_tx, multiplier) = watch::channel(session.multiplier());
        let (state_tx, state) = watch::channel(session.state());
        let task = tokio::spawn(run(session, tick_interval, rx, multiplier_tx, state_tx));

        Self {
            commands,
            multiplier,
            state,
            task,
        }
    }

    /// Most recently published multiplier
    pub fn multiplier(&self) -> f64 {
        *self.multiplier.borrow()
    }

    /// Subscribe to multiplier updates
    pub fn watch(&self) -> watch::Receiver<f64> {
        self.multiplier.clone()
    }

    /// Last state published by the driver
    pub fn state(&self) -> CrashState {
        *self.state.borrow()
    }

    /// Request a cash-out. Fails once the round has ended.
    pub async fn cash_out(&self) -> Result<Settlement, GameError> {
        let (reply, response) = oneshot::channel();
        if self.commands.send(CrashCommand::CashOut(reply)).await.is_err() {
            return Err(self.ended());
        }
        // Reply dropped means the task ended with the request still queued
        match response.await {
            Ok(result) => result,
            Err(_) => Err(self.ended()),
        }
    }

    /// Error for a request that arrived after the driver stopped. The
    /// terminal state is published before the command channel closes.
    fn ended(&self) -> GameError {
        let state = match self.state() {
            CrashState::Running => "aborted",
            state => state.as_str(),
        };
        GameError::InvalidTransition {
            state,
            action: "cash out",
        }
    }

    /// Wait for the round to end and return the terminal session
    pub async fn finish(self) -> Result<CrashSession, GameError> {
        let CrashHandle { commands, task, .. } = self;
        // Keep the sender alive so the driver doesn't treat this as abandonment
        let session = task.await;
        drop(commands);
        session.map_err(|e| {
            tracing::error!("Crash driver task failed: {}", e);
            GameError::InvalidTransition {
                state: "aborted",
                action: "finish",
            }
        })
    }

    /// Abandon the round. The stake stays forfeit.
    pub fn abort(self) {
        self.task.abort();
    }
}

async fn run(
    mut session: CrashSession,
    tick_interval: Duration,
    mut commands: mpsc::Receiver<CrashCommand>,
    multiplier: watch::Sender<f64>,
    state: watch::Sender<CrashState>,
) -> CrashSession {
    let mut ticker = interval_at(Instant::now() + tick_interval, tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => match command {
                Some(CrashCommand::CashOut(reply)) => {
                    let result = session.cash_out();
                    let _ = reply.send(result);
                    break;
                }
                None => {
                    tracing::debug!("Crash handle dropped, discarding session");
                    break;
                }
            },

            _ = ticker.tick() => match session.tick() {
                Tick::Rose(value) => {
                    let _ = multiplier.send(value);
                }
                Tick::Crashed(_) | Tick::Idle => break,
            },
        }
    }

    let _ = state.send(session.state());
    session
}
