//! Single-leg mispricing against implied cross-rates.
//!
//! For each ordered pair `(a, b)` the direct quote is compared with every
//! synthetic route `a → c → b`. The intermediary with the largest relative
//! gap is the most actionable: trading just the direct leg corrects it with
//! one transaction instead of the three a full triangular loop needs.

use arb_data::Instrument;
use serde::Serialize;
use tracing::debug;

use crate::rate_table::RateTable;

/// Side to take on the direct `from → to` leg.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    /// Direct quote is at or below the synthetic one: buy `to` directly.
    Buy,
    /// Direct quote is above the synthetic one: sell `to` back directly.
    Sell,
}

/// Deviation of one direct quote from its implied cross-rates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LegDeviation {
    pub from: Instrument,
    pub to: Instrument,
    /// Quoted `from → to` rate.
    pub direct_rate: f64,
    /// Intermediary whose synthetic rate deviates most from the direct one.
    pub via: Instrument,
    /// `rate(from, via) * rate(via, to)` for [`Self::via`].
    pub implied_rate: f64,
    /// `(implied - direct) / direct` for [`Self::via`].
    pub deviation: f64,
    /// Mean synthetic rate over every intermediary.
    pub average_implied_rate: f64,
    /// `(average_implied - direct) / direct`.
    pub average_deviation: f64,
    pub direction: TradeDirection,
    /// `|deviation|` exceeds the configured threshold.
    pub is_opportunity: bool,
}

impl LegDeviation {
    /// Gross profit from trading `amount` on the direct leg, before spread.
    pub fn gross_profit(&self, amount: f64) -> f64 {
        amount * self.deviation.abs()
    }

    /// Spread (as a fraction) that would consume the whole deviation.
    pub fn break_even_spread(&self) -> f64 {
        self.deviation.abs()
    }

    /// Pair label, e.g. `USD/EUR`.
    pub fn pair(&self) -> String {
        format!("{}/{}", self.from, self.to)
    }
}

/// Computes one [`LegDeviation`] per ordered pair of distinct instruments.
///
/// Pairs are emitted in instrument order. Ties on `|deviation|` keep the
/// earliest intermediary. With fewer than three instruments no intermediary
/// exists and the result is empty.
pub fn analyze_single_leg(table: &RateTable, threshold: f64) -> Vec<LegDeviation> {
    let n = table.len();
    if n < 3 {
        return Vec::new();
    }

    let mut deviations = Vec::with_capacity(n * (n - 1));

    for a in 0..n {
        for b in 0..n {
            if a == b {
                continue;
            }
            let direct = table.rate_at(a, b);

            let mut best: Option<(usize, f64, f64)> = None;
            let mut implied_sum = 0.0;
            let mut routes = 0usize;

            for c in 0..n {
                if c == a || c == b {
                    continue;
                }
                let implied = table.rate_at(a, c) * table.rate_at(c, b);
                let deviation = (implied - direct) / direct;
                implied_sum += implied;
                routes += 1;

                if best.map_or(true, |(_, _, current)| deviation.abs() > current.abs()) {
                    best = Some((c, implied, deviation));
                }
            }

            let Some((via, implied_rate, deviation)) = best else {
                continue;
            };
            let average_implied_rate = implied_sum / routes as f64;

            deviations.push(LegDeviation {
                from: table.instrument(a).clone(),
                to: table.instrument(b).clone(),
                direct_rate: direct,
                via: table.instrument(via).clone(),
                implied_rate,
                deviation,
                average_implied_rate,
                average_deviation: (average_implied_rate - direct) / direct,
                direction: if deviation >= 0.0 {
                    TradeDirection::Buy
                } else {
                    TradeDirection::Sell
                },
                is_opportunity: deviation.abs() > threshold,
            });
        }
    }

    debug!(
        pairs = deviations.len(),
        above_threshold = deviations.iter().filter(|d| d.is_opportunity).count(),
        threshold,
        "single-leg deviations computed"
    );

    deviations
}
