//! Shared rate-table fixtures.
//!
//! Every fixture builds a complete directed table. Consistent tables derive
//! each quote as `value(to) / value(from)`; skewed tables then scale
//! individual directions.

#![allow(dead_code)]

use arb_analysis::RateTable;
use arb_data::{parse_instrument_list, Instrument, RateSnapshot};

/// Directed quotes `value[to] / value[from]` with per-direction factors applied.
pub fn quotes_from_values(
    instruments: &[Instrument],
    values: &[f64],
    edits: &[(&str, &str, f64)],
) -> Vec<(Instrument, Instrument, f64)> {
    let mut quotes = Vec::with_capacity(instruments.len() * instruments.len());
    for (i, from) in instruments.iter().enumerate() {
        for (j, to) in instruments.iter().enumerate() {
            if i == j {
                continue;
            }
            let factor = edits
                .iter()
                .find(|(f, t, _)| from.code() == *f && to.code() == *t)
                .map_or(1.0, |(_, _, factor)| *factor);
            quotes.push((from.clone(), to.clone(), values[j] / values[i] * factor));
        }
    }
    quotes
}

/// Arbitrage-free table whose instrument values are powers of two, so every
/// cycle product is exactly 1.0 in floating point.
///
/// # Panics
/// Panics if `codes` names fewer than two distinct instruments.
pub fn arbitrage_free_table(codes: &str) -> RateTable {
    skewed_table(codes, &[])
}

/// Power-of-two table with `(from, to, factor)` edits.
pub fn skewed_table(codes: &str, edits: &[(&str, &str, f64)]) -> RateTable {
    let instruments = parse_instrument_list(codes);
    let values: Vec<f64> = (0..instruments.len())
        .map(|ix| 2f64.powi(ix as i32 - 2))
        .collect();
    let quotes = quotes_from_values(&instruments, &values, edits);
    RateTable::new(instruments, quotes).expect("fixture table should be complete")
}

/// USD/EUR/GBP where EUR → GBP → USD → EUR returns exactly 10% and no
/// other loop, of any length, is profitable.
pub fn ten_percent_table() -> RateTable {
    skewed_table("USD,EUR,GBP", &[("EUR", "GBP", 1.1), ("GBP", "EUR", 1.0 / 1.2)])
}

/// Deterministic linear congruential generator for noisy fixtures.
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed.wrapping_mul(6364136223846793005).wrapping_add(1))
    }

    /// Uniform sample in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Realistic-looking table: values in `[0.5, 2)` and every direction
/// perturbed independently by up to `±noise`.
pub fn noisy_table(n: usize, seed: u64, noise: f64) -> RateTable {
    let instruments: Vec<Instrument> = (0..n)
        .map(|ix| Instrument::new(format!("C{ix:02}")))
        .collect();
    let mut rng = Lcg::new(seed);
    let values: Vec<f64> = (0..n).map(|_| 0.5 + 1.5 * rng.next_f64()).collect();

    let mut quotes = Vec::with_capacity(n * n);
    for (i, from) in instruments.iter().enumerate() {
        for (j, to) in instruments.iter().enumerate() {
            if i != j {
                let factor = 1.0 + noise * (2.0 * rng.next_f64() - 1.0);
                quotes.push((from.clone(), to.clone(), values[j] / values[i] * factor));
            }
        }
    }
    RateTable::new(instruments, quotes).expect("noisy table should be complete")
}

/// Snapshot mirroring [`ten_percent_table`].
pub fn ten_percent_snapshot() -> RateSnapshot {
    let table = ten_percent_table();
    let mut snapshot = RateSnapshot::new("fixture", table.instruments().to_vec());
    for (i, from) in table.instruments().iter().enumerate() {
        for (j, to) in table.instruments().iter().enumerate() {
            if i != j {
                snapshot.insert(from.clone(), to.clone(), table.rate_at(i, j));
            }
        }
    }
    snapshot
}
