//! Mines: reveal cells on a grid hiding a fixed number of mines. Every safe
//! reveal raises the multiplier by one step; a mine forfeits the stake.

use crate::config::MinesConfig;
use crate::errors::GameError;
use crate::games::types::{check_stake, Settlement};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Cell {
    Safe,
    Mine,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinesState {
    Active,
    Busted,
    Cleared,
    CashedOut,
}

impl MinesState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinesState::Active => "active",
            MinesState::Busted => "busted",
            MinesState::Cleared => "cleared",
            MinesState::CashedOut => "cashed out",
        }
    }
}

/// Result of one reveal
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reveal {
    Safe { multiplier: f64 },
    /// Last safe cell found; the round settled automatically
    Cleared(Settlement),
    Mine,
    /// Cell already open or round over
    Ignored,
}

/// A Mines round. Not serializable: the mine layout stays server-side while
/// the round is active. Use `view` for anything shown to a player.
#[derive(Clone)]
pub struct MinesSession {
    stake: f64,
    step: f64,
    grid: Vec<Cell>,
    revealed: Vec<usize>,
    safe_revealed: usize,
    state: MinesState,
}

/// Player-facing snapshot of a Mines round
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinesView {
    pub stake: f64,
    pub state: MinesState,
    pub multiplier: f64,
    pub revealed: Vec<usize>,
    /// One entry per cell; `None` while the cell is still hidden
    pub cells: Vec<Option<Cell>>,
}

impl MinesView {
    /// Indices of cells not yet revealed
    pub fn hidden(&self) -> Vec<usize> {
        (0..self.cells.len())
            .filter(|i| !self.revealed.contains(i))
            .collect()
    }
}

impl fmt::Debug for MinesSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MinesSession")
            .field("stake", &self.stake)
            .field("state", &self.state)
            .field("multiplier", &self.multiplier())
            .field("revealed", &self.revealed)
            .finish_non_exhaustive()
    }
}

/// Choose `count` distinct cells out of `grid_size` with a partial
/// Fisher-Yates shuffle, one draw per mine.
pub fn place_mines(grid_size: usize, count: usize, rng: &mut dyn RandomSource) -> Vec<usize> {
    let mut cells: Vec<usize> = (0..grid_size).collect();
    let count = count.min(grid_size);
    for i in 0..count {
        let j = i + rng.draw_index(grid_size - i);
        cells.swap(i, j);
    }
    cells.truncate(count);
    cells
}

impl MinesSession {
    /// Validate the stake and lay out a fresh grid
    pub fn start(
        stake: f64,
        available_balance: f64,
        config: &MinesConfig,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, GameError> {
        check_stake(stake, config.min_stake, available_balance)?;
        let mines = place_mines(config.grid_size, config.mine_count, rng);
        Self::with_mines(stake, &mines, config)
    }

    /// Session with mines at known positions, for replays and tests
    pub fn with_mines(
        stake: f64,
        mines: &[usize],
        config: &MinesConfig,
    ) -> Result<Self, GameError> {
        let mut grid = vec![Cell::Safe; config.grid_size];
        for &index in mines {
            let cell = grid.get_mut(index).ok_or(GameError::InvalidCell {
                index,
                size: config.grid_size,
            })?;
            *cell = Cell::Mine;
        }

        Ok(Self {
            stake,
            step: config.step,
            grid,
            revealed: Vec::new(),
            safe_revealed: 0,
            state: MinesState::Active,
        })
    }

    pub fn stake(&self) -> f64 {
        self.stake
    }

    pub fn state(&self) -> MinesState {
        self.state
    }

    pub fn multiplier(&self) -> f64 {
        1.0 + self.safe_revealed as f64 * self.step
    }

    /// Revealed cells in reveal order
    pub fn revealed(&self) -> &[usize] {
        &self.revealed
    }

    pub fn grid_size(&self) -> usize {
        self.grid.len()
    }

    pub fn safe_cells(&self) -> usize {
        self.grid.iter().filter(|c| **c == Cell::Safe).count()
    }

    /// Cell contents, visible only for revealed cells or after the round ends
    pub fn cell(&self, index: usize) -> Option<Cell> {
        let visible = self.state != MinesState::Active || self.revealed.contains(&index);
        visible.then(|| self.grid.get(index).copied()).flatten()
    }

    pub fn view(&self) -> MinesView {
        MinesView {
            stake: self.stake,
            state: self.state,
            multiplier: self.multiplier(),
            revealed: self.revealed.clone(),
            cells: (0..self.grid.len()).map(|i| self.cell(i)).collect(),
        }
    }

    pub fn reveal(&mut self, index: usize) -> Result<Reveal, GameError> {
        let cell = *self.grid.get(index).ok_or(GameError::InvalidCell {
            index,
            size: self.grid.len(),
        })?;

        if self.state != MinesState::Active || self.revealed.contains(&index) {
            return Ok(Reveal::Ignored);
        }

        self.revealed.push(index);

        if cell == Cell::Mine {
            self.state = MinesState::Busted;
            tracing::debug!(stake = self.stake, index, "Mines session busted");
            return Ok(Reveal::Mine);
        }

        self.safe_revealed += 1;
        let multiplier = self.multiplier();

        if self.safe_revealed == self.safe_cells() {
            self.state = MinesState::Cleared;
            let settlement = Settlement::win(self.stake, self.stake * multiplier);
            tracing::debug!(
                stake = self.stake,
                multiplier,
                payout = settlement.payout,
                "Mines session cleared"
            );
            return Ok(Reveal::Cleared(settlement));
        }

        Ok(Reveal::Safe { multiplier })
    }

    /// Take `stake * multiplier`. Needs at least one safe reveal.
    pub fn cash_out(&mut self) -> Result<Settlement, GameError> {
        if self.state != MinesState::Active {
            return Err(GameError::InvalidTransition {
                state: self.state.as_str(),
                action: "cash out",
            });
        }
        if self.revealed.is_empty() {
            return Err(GameError::InvalidTransition {
                state: "untouched",
                action: "cash out",
            });
        }

        self.state = MinesState::CashedOut;
        let settlement = Settlement::win(self.stake, self.stake * self.multiplier());
        tracing::debug!(
            stake = self.stake,
            multiplier = self.multiplier(),
            payout = settlement.payout,
            "Mines session cashed out"
        );
        Ok(settlement)
    }

    /// Final settlement once the session is terminal
    pub fn settlement(&self) -> Option<Settlement> {
        match self.state {
            MinesState::Active => None,
            MinesState::Busted => Some(Settlement::loss(self.stake)),
            MinesState::Cleared | MinesState::CashedOut => {
                Some(Settlement::win(self.stake, self.stake * self.multiplier()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{ScriptedDraws, SeededRandom};
    use std::collections::HashSet;

    const MINES: [usize; 5] = [0, 6, 12, 18, 24];

    fn session(stake: f64) -> MinesSession {
        MinesSession::with_mines(stake, &MINES, &MinesConfig::default()).unwrap()
    }

    #[test]
    fn test_start_validation() {
        let config = MinesConfig::default();
        let mut rng = ScriptedDraws::default();
        assert!(matches!(
            MinesSession::start(9.0, 100.0, &config, &mut rng),
            Err(GameError::InvalidStake { .. })
        ));
        assert!(matches!(
            MinesSession::start(10.0, 5.0, &config, &mut rng),
            Err(GameError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn test_placement_is_distinct() {
        let mut rng = SeededRandom::from_seed_str("mines");
        for _ in 0..200 {
            let mines = place_mines(25, 5, &mut rng);
            let unique: HashSet<_> = mines.iter().collect();
            assert_eq!(unique.len(), 5);
            assert!(mines.iter().all(|&m| m < 25));
        }
    }

    #[test]
    fn test_placement_consumes_one_draw_per_mine() {
        let mut rng = ScriptedDraws::new([0.0, 0.0, 0.0, 0.0, 0.0]);
        let session = MinesSession::start(10.0, 10.0, &MinesConfig::default(), &mut rng).unwrap();
        assert_eq!(rng.remaining(), 0);
        assert_eq!(session.safe_cells(), 20);
        assert_eq!(session.cell(0), None);
    }

    #[test]
    fn test_three_reveals_then_cash_out() {
        let mut game = session(10.0);
        game.reveal(1).unwrap();
        game.reveal(2).unwrap();
        match game.reveal(3).unwrap() {
            Reveal::Safe { multiplier } => assert!((multiplier - 1.9).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }

        let settlement = game.cash_out().unwrap();
        assert!((settlement.payout - 19.0).abs() < 1e-9);
        assert_eq!(game.state(), MinesState::CashedOut);
        assert_eq!(game.reveal(4).unwrap(), Reveal::Ignored);
    }

    #[test]
    fn test_mine_busts_and_forfeits() {
        let mut game = session(10.0);
        game.reveal(1).unwrap();
        assert_eq!(game.reveal(12).unwrap(), Reveal::Mine);
        assert_eq!(game.state(), MinesState::Busted);
        assert_eq!(game.revealed(), &[1, 12]);
        assert_eq!(game.settlement(), Some(Settlement::loss(10.0)));
        assert!(game.cash_out().is_err());
        assert_eq!(game.cell(24), Some(Cell::Mine));
    }

    #[test]
    fn test_clearing_board_pays_seven_times() {
        let mut game = session(10.0);
        let safe: Vec<usize> = (0..25).filter(|i| !MINES.contains(i)).collect();
        let (last, rest) = safe.split_last().unwrap();
        for &i in rest {
            assert!(matches!(game.reveal(i).unwrap(), Reveal::Safe { .. }));
        }
        match game.reveal(*last).unwrap() {
            Reveal::Cleared(settlement) => assert!((settlement.payout - 70.0).abs() < 1e-9),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(game.state(), MinesState::Cleared);
        assert!((game.multiplier() - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeat_reveal_is_ignored() {
        let mut game = session(10.0);
        game.reveal(7).unwrap();
        assert_eq!(game.reveal(7).unwrap(), Reveal::Ignored);
        assert!((game.multiplier() - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_cash_out_requires_a_reveal() {
        let mut game = session(10.0);
        assert!(matches!(
            game.cash_out(),
            Err(GameError::InvalidTransition { .. })
        ));
        assert_eq!(game.state(), MinesState::Active);
    }

    #[test]
    fn test_active_view_hides_mines() {
        let mut game = session(10.0);
        game.reveal(1).unwrap();

        let view = game.view();
        assert_eq!(view.cells[1], Some(Cell::Safe));
        assert_eq!(view.cells.iter().flatten().count(), 1);
        assert_eq!(view.hidden().len(), 24);

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("mine"), "{json}");
        assert!(!format!("{game:?}").contains("Safe"));

        game.reveal(0).unwrap();
        let json = serde_json::to_string(&game.view()).unwrap();
        assert_eq!(json.matches("\"mine\"").count(), 5);
    }

    #[test]
    fn test_out_of_range_cell() {
        let mut game = session(10.0);
        assert_eq!(
            game.reveal(25).unwrap_err(),
            GameError::InvalidCell { index: 25, size: 25 }
        );
    }
}
