//! Weighted outcome tables and the cumulative-scan resolver.

use serde::{Deserialize, Serialize};

/// One row of a weighted outcome table. `weight` is in percentage points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OddsEntry {
    pub payout: f64,
    pub weight: f64,
}

impl OddsEntry {
    pub const fn new(payout: f64, weight: f64) -> Self {
        Self { payout, weight }
    }
}

/// Which row a draw selected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub index: usize,
    pub payout: f64,
    /// The draw fell past the last cumulative bound and the first row was used
    pub fallback: bool,
}

/// Resolve a draw in [0, 100) against `outcomes`.
///
/// Scans rows in order, accumulating weights; the first row whose cumulative
/// bound is `>= draw` wins. When the weights sum to less than the draw, the
/// first row is returned. Tables with weights under 100 therefore give their
/// first row the leftover gap. Returns `None` only for an empty table.
pub fn resolve_entry(outcomes: &[OddsEntry], draw: f64) -> Option<Resolution> {
    let first = outcomes.first()?;

    let mut cumulative = 0.0;
    for (index, entry) in outcomes.iter().enumerate() {
        cumulative += entry.weight;
        if draw <= cumulative {
            return Some(Resolution {
                index,
                payout: entry.payout,
                fallback: false,
            });
        }
    }

    tracing::warn!(
        draw,
        total_weight = cumulative,
        payout = first.payout,
        "Draw fell outside odds table, using first entry"
    );
    Some(Resolution {
        index: 0,
        payout: first.payout,
        fallback: true,
    })
}

/// Payout for `draw`, or `None` for an empty table
pub fn resolve(outcomes: &[OddsEntry], draw: f64) -> Option<f64> {
    resolve_entry(outcomes, draw).map(|r| r.payout)
}

/// Sum of all weights in the table
pub fn total_weight(outcomes: &[OddsEntry]) -> f64 {
    outcomes.iter().map(|e| e.weight).sum()
}

/// Expected payout of one draw uniform over [0, 100), including the fallback gap
pub fn expected_payout(outcomes: &[OddsEntry]) -> f64 {
    let Some(first) = outcomes.first() else {
        return 0.0;
    };

    let mut expected = 0.0;
    let mut lower = 0.0_f64;
    for entry in outcomes {
        let upper = (lower + entry.weight).min(100.0);
        if upper > lower {
            expected += entry.payout * (upper - lower) / 100.0;
        }
        lower = lower.max(upper);
    }
    if lower < 100.0 {
        expected += first.payout * (100.0 - lower) / 100.0;
    }
    expected
}
