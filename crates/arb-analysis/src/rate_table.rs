//! Dense, read-only snapshot of directed exchange rates.
//!
//! Every configured instrument gets a stable position at construction; rates
//! live in a row-major N×N array so `rate_at(i, j)` is a single index. The
//! table is only ever built complete: every downstream algorithm assumes a
//! fully connected directed graph.

use std::collections::HashMap;

use arb_data::{Instrument, RateSnapshot};
use tracing::debug;

use crate::error::RateTableError;

/// Complete directed rate matrix over a fixed instrument set.
#[derive(Clone, Debug, PartialEq)]
pub struct RateTable {
    instruments: Vec<Instrument>,
    positions: HashMap<Instrument, usize>,
    /// Row-major `rates[from * n + to]`; the diagonal is 1.0.
    rates: Vec<f64>,
}

impl RateTable {
    /// Builds a table from `(from, to, rate)` quotes for `instruments`.
    ///
    /// Quotes touching unconfigured instruments and self-pairs are ignored.
    /// When a pair is quoted twice the later quote wins.
    ///
    /// # Errors
    ///
    /// - [`RateTableError::DuplicateInstrument`] if an instrument is listed twice.
    /// - [`RateTableError::TooFewInstruments`] if fewer than two instruments are configured.
    /// - [`RateTableError::MissingPair`] for the first directed pair (in
    ///   instrument order) without a quote.
    /// - [`RateTableError::InvalidRate`] for the first non-positive or non-finite quote.
    pub fn new(
        instruments: Vec<Instrument>,
        quotes: impl IntoIterator<Item = (Instrument, Instrument, f64)>,
    ) -> Result<Self, RateTableError> {
        let mut positions = HashMap::with_capacity(instruments.len());
        for (ix, instrument) in instruments.iter().enumerate() {
            if positions.insert(instrument.clone(), ix).is_some() {
                return Err(RateTableError::DuplicateInstrument {
                    instrument: instrument.clone(),
                });
            }
        }

        let n = instruments.len();
        if n < 2 {
            return Err(RateTableError::TooFewInstruments { count: n });
        }

        let mut supplied: Vec<Option<f64>> = vec![None; n * n];
        for (from, to, rate) in quotes {
            match (positions.get(&from), positions.get(&to)) {
                (Some(&i), Some(&j)) if i != j => supplied[i * n + j] = Some(rate),
                (Some(_), Some(_)) => {}
                _ => debug!(from = %from, to = %to, "ignoring quote outside instrument set"),
            }
        }

        let mut rates = vec![1.0; n * n];
        for i in 0..n {
            for j in 0..n {
                if i == j {
                    continue;
                }
                let rate = supplied[i * n + j].ok_or_else(|| RateTableError::MissingPair {
                    from: instruments[i].clone(),
                    to: instruments[j].clone(),
                })?;
                if !(rate.is_finite() && rate > 0.0) {
                    return Err(RateTableError::InvalidRate {
                        from: instruments[i].clone(),
                        to: instruments[j].clone(),
                        rate,
                    });
                }
                rates[i * n + j] = rate;
            }
        }

        debug!(instruments = n, pairs = n * (n - 1), "rate table built");

        Ok(Self {
            instruments,
            positions,
            rates,
        })
    }

    /// Builds a table from a [`RateSnapshot`], using its instrument order.
    ///
    /// # Errors
    ///
    /// Same as [`RateTable::new`].
    pub fn from_snapshot(snapshot: &RateSnapshot) -> Result<Self, RateTableError> {
        Self::new(
            snapshot.instruments.clone(),
            snapshot
                .quotes()
                .map(|(from, to, rate)| (from.clone(), to.clone(), rate)),
        )
    }

    /// Configured instruments in construction order.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Number of configured instruments.
    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    /// Always false for a constructed table; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Position of `instrument`, if configured.
    pub fn position(&self, instrument: &Instrument) -> Option<usize> {
        self.positions.get(instrument).copied()
    }

    /// Instrument at position `ix`.
    ///
    /// # Panics
    ///
    /// Panics if `ix >= self.len()`.
    pub fn instrument(&self, ix: usize) -> &Instrument {
        &self.instruments[ix]
    }

    /// Directed rate between two positions; 1.0 on the diagonal.
    ///
    /// # Panics
    ///
    /// Panics if either position is out of range.
    pub fn rate_at(&self, from: usize, to: usize) -> f64 {
        let n = self.len();
        assert!(from < n && to < n, "rate position ({from}, {to}) outside {n}x{n} table");
        self.rates[from * n + to]
    }

    /// Units of `to` received per unit of `from`.
    ///
    /// # Errors
    ///
    /// [`RateTableError::NoSuchPair`] if either instrument is not configured.
    pub fn rate(&self, from: &Instrument, to: &Instrument) -> Result<f64, RateTableError> {
        let i = self.require(from, from, to)?;
        let j = self.require(to, from, to)?;
        Ok(self.rate_at(i, j))
    }

    /// Synthetic `from → to` rate obtained by converting through `via`.
    ///
    /// # Errors
    ///
    /// [`RateTableError::NoSuchPair`] if any instrument is not configured.
    pub fn implied_rate(
        &self,
        from: &Instrument,
        to: &Instrument,
        via: &Instrument,
    ) -> Result<f64, RateTableError> {
        Ok(self.rate(from, via)? * self.rate(via, to)?)
    }

    fn require(
        &self,
        instrument: &Instrument,
        from: &Instrument,
        to: &Instrument,
    ) -> Result<usize, RateTableError> {
        self.position(instrument)
            .ok_or_else(|| RateTableError::NoSuchPair {
                from: from.clone(),
                to: to.clone(),
                missing: instrument.clone(),
            })
    }
}
