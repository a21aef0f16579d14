//! Exhaustive triangular cycle evaluation.
//!
//! Every ordered triple of distinct instruments `(a, b, c)` describes the loop
//! `a → b → c → a`. The three rotations of a loop are the same trade started
//! from a different instrument, so each loop is reported once, rotated so its
//! smallest identifier comes first. The reverse loop `a → c → b → a` is a
//! different trade and is reported separately.
//!
//! For N instruments this yields N·(N−1)·(N−2) ordered triples and a third as
//! many canonical cycles.

use arb_data::Instrument;
use serde::Serialize;
use tracing::debug;

use crate::rate_table::RateTable;

/// One directed conversion step with the rate used.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Leg {
    pub from: Instrument,
    pub to: Instrument,
    pub rate: f64,
}

/// Outcome of trading once around a three-instrument loop.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CycleResult {
    /// Canonical loop order; the first instrument is the smallest identifier.
    pub instruments: [Instrument; 3],
    /// The three legs in traversal order, closing back on the first instrument.
    pub legs: [Leg; 3],
    /// Product of the three leg rates.
    pub product: f64,
    /// `product - 1`; positive means the loop returns more than it started with.
    pub profit_fraction: f64,
}

impl CycleResult {
    /// Strictly positive profit. A product of exactly 1.0 is the
    /// no-arbitrage condition and is not an opportunity.
    pub fn is_opportunity(&self) -> bool {
        self.profit_fraction > 0.0
    }

    /// Profit in units of the first instrument for a starting `amount`.
    pub fn absolute_profit(&self, amount: f64) -> f64 {
        amount * self.profit_fraction
    }

    /// Amount held after converting `amount` through every leg in turn.
    pub fn ending_amount(&self, amount: f64) -> f64 {
        self.legs.iter().fold(amount, |held, leg| held * leg.rate)
    }

    /// Human-readable path, e.g. `EUR -> GBP -> USD -> EUR`.
    pub fn path(&self) -> String {
        let [a, b, c] = &self.instruments;
        format!("{a} -> {b} -> {c} -> {a}")
    }
}

/// Rotates a cycle so its smallest element comes first.
///
/// Ties keep the earliest occurrence. The result is idempotent and equal for
/// every rotation of the same cycle.
pub fn canonical_rotation<T: Ord + Clone>(cycle: &[T]) -> Vec<T> {
    let Some(start) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, lhs), (_, rhs)| lhs.cmp(rhs))
        .map(|(ix, _)| ix)
    else {
        return Vec::new();
    };

    cycle[start..]
        .iter()
        .chain(cycle[..start].iter())
        .cloned()
        .collect()
}

/// Canonical representative of a three-instrument loop.
pub fn canonicalize(cycle: &[Instrument; 3]) -> [Instrument; 3] {
    let rotated = canonical_rotation(cycle);
    [rotated[0].clone(), rotated[1].clone(), rotated[2].clone()]
}

/// Evaluates every canonical three-instrument cycle in `table`.
///
/// All N·(N−1)·(N−2) ordered triples are visited; the canonical rotation of
/// each loop supplies the reported product so results do not depend on
/// enumeration order. Output is sorted by canonical instrument order.
/// Fewer than three instruments yields an empty result.
pub fn evaluate_cycles(table: &RateTable) -> Vec<CycleResult> {
    let n = table.len();
    let mut results = Vec::new();
    let mut visited = 0usize;

    for i in 0..n {
        for j in 0..n {
            if j == i {
                continue;
            }
            for k in 0..n {
                if k == i || k == j {
                    continue;
                }
                visited += 1;

                let first = table.instrument(i);
                if first > table.instrument(j) || first > table.instrument(k) {
                    // Another rotation of this loop starts on its smallest instrument.
                    continue;
                }

                results.push(evaluate_positions(table, [i, j, k]));
            }
        }
    }

    results.sort_by(|lhs, rhs| lhs.instruments.cmp(&rhs.instruments));

    debug!(
        ordered_triples = visited,
        cycles = results.len(),
        opportunities = results.iter().filter(|r| r.is_opportunity()).count(),
        "triangular cycles evaluated"
    );

    results
}

/// Canonical cycles with strictly positive profit, most profitable first.
pub fn profitable_cycles(results: &[CycleResult]) -> Vec<CycleResult> {
    let mut profitable: Vec<CycleResult> = results
        .iter()
        .filter(|result| result.is_opportunity())
        .cloned()
        .collect();
    profitable.sort_by(|lhs, rhs| {
        rhs.profit_fraction
            .total_cmp(&lhs.profit_fraction)
            .then_with(|| lhs.instruments.cmp(&rhs.instruments))
    });
    profitable
}

fn evaluate_positions(table: &RateTable, positions: [usize; 3]) -> CycleResult {
    let [i, j, k] = positions;
    let leg = |from: usize, to: usize| Leg {
        from: table.instrument(from).clone(),
        to: table.instrument(to).clone(),
        rate: table.rate_at(from, to),
    };

    let legs = [leg(i, j), leg(j, k), leg(k, i)];
    let product = legs[0].rate * legs[1].rate * legs[2].rate;

    CycleResult {
        instruments: [
            table.instrument(i).clone(),
            table.instrument(j).clone(),
            table.instrument(k).clone(),
        ],
        legs,
        product,
        profit_fraction: product - 1.0,
    }
}
