//! Case opening: pay the price, draw once, credit the selected prize.

use crate::errors::{ConfigurationError, GameError};
use crate::games::types::Settlement;
use crate::odds::{self, OddsEntry};
use crate::random::RandomSource;
use serde::{Deserialize, Serialize};

/// A purchasable case and its prize table. Row order is the scan order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseConfig {
    pub name: String,
    pub price: f64,
    pub outcomes: Vec<OddsEntry>,
}

impl CaseConfig {
    pub fn new(name: impl Into<String>, price: f64, outcomes: Vec<OddsEntry>) -> Self {
        Self {
            name: name.into(),
            price,
            outcomes,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let field = format!("cases.{}", self.name);
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::ValidationFailed(
                "Case name cannot be empty".to_string(),
            ));
        }
        if !(self.price > 0.0) {
            return Err(ConfigurationError::InvalidValue {
                field: format!("{}.price", field),
                value: self.price.to_string(),
                reason: "Price must be positive".to_string(),
            });
        }
        if self.outcomes.is_empty() {
            return Err(ConfigurationError::InvalidValue {
                field: format!("{}.outcomes", field),
                value: "[]".to_string(),
                reason: "Case needs at least one outcome".to_string(),
            });
        }
        for entry in &self.outcomes {
            if !(entry.weight > 0.0) || entry.payout < 0.0 {
                return Err(ConfigurationError::InvalidValue {
                    field: format!("{}.outcomes", field),
                    value: format!("{:?}", entry),
                    reason: "Weights must be positive and payouts non-negative".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Expected prize of one opening
    pub fn expected_payout(&self) -> f64 {
        odds::expected_payout(&self.outcomes)
    }

    /// Whether some draws fall past the table and land on the first row
    pub fn has_fallback_gap(&self) -> bool {
        odds::total_weight(&self.outcomes) < 100.0
    }
}

/// Result of a successful opening: debit now, credit `payout` after the reveal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseOpening {
    pub case_name: String,
    pub price: f64,
    pub payout: f64,
    pub draw: f64,
    pub entry_index: usize,
    pub fallback: bool,
}

impl CaseOpening {
    pub fn settlement(&self) -> Settlement {
        Settlement::win(self.price, self.payout)
    }
}

/// Open `case` with a fresh draw from `rng`
pub fn open_case(
    case: &CaseConfig,
    available_balance: f64,
    rng: &mut dyn RandomSource,
) -> Result<CaseOpening, GameError> {
    if available_balance < case.price {
        return Err(GameError::InsufficientFunds {
            required: case.price,
            available: available_balance,
        });
    }
    let draw = rng.draw_percent();
    open_case_with_draw(case, available_balance, draw)
}

/// Open `case` against an explicit draw in [0, 100)
pub fn open_case_with_draw(
    case: &CaseConfig,
    available_balance: f64,
    draw: f64,
) -> Result<CaseOpening, GameError> {
    if available_balance < case.price {
        return Err(GameError::InsufficientFunds {
            required: case.price,
            available: available_balance,
        });
    }

    let resolution = odds::resolve_entry(&case.outcomes, draw)
        .ok_or_else(|| GameError::UnknownCase(format!("{} has no outcomes", case.name)))?;

    tracing::debug!(
        case = %case.name,
        draw,
        payout = resolution.payout,
        index = resolution.index,
        "Case resolved"
    );

    Ok(CaseOpening {
        case_name: case.name.clone(),
        price: case.price,
        payout: resolution.payout,
        draw,
        entry_index: resolution.index,
        fallback: resolution.fallback,
    })
}
