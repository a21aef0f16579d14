//! Type definitions shared by rate sources and the analysis core.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Tradable instrument identifier (currency or token code).
///
/// Identifiers are trimmed and upper-cased on construction, so `"usd"` and
/// `"USD"` name the same instrument. Ordering is lexicographic on the code.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Instrument(String);

impl Instrument {
    /// Creates an instrument from any code, normalizing case and whitespace.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    /// The normalized code, e.g. `"EUR"`.
    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Instrument {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Instrument> for String {
    fn from(instrument: Instrument) -> Self {
        instrument.0
    }
}

/// Parses a comma-separated instrument list such as `"USD,EUR,GBP"`.
///
/// Empty segments are skipped; order is preserved.
pub fn parse_instrument_list(list: &str) -> Vec<Instrument> {
    list.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(Instrument::new)
        .collect()
}

/// Point-in-time snapshot of directed exchange rates.
///
/// `rates[from][to]` is the number of units of `to` received for one unit of
/// `from`. Both directions are stored independently; nothing here assumes
/// `rates[a][b] * rates[b][a] == 1`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// Quote date reported by the source, if any.
    pub date: Option<NaiveDate>,
    /// Human-readable source label, e.g. `"frankfurter"`.
    pub source: String,
    /// Instruments in the order the run was configured with.
    pub instruments: Vec<Instrument>,
    /// Directed rate matrix keyed by base then quote instrument.
    pub rates: BTreeMap<Instrument, BTreeMap<Instrument, f64>>,
}

impl RateSnapshot {
    /// Creates an empty snapshot for the given instruments.
    pub fn new(source: impl Into<String>, instruments: Vec<Instrument>) -> Self {
        Self {
            date: None,
            source: source.into(),
            instruments,
            rates: BTreeMap::new(),
        }
    }

    /// Records one directed quote, replacing any previous value.
    pub fn insert(&mut self, from: Instrument, to: Instrument, rate: f64) {
        self.rates.entry(from).or_default().insert(to, rate);
    }

    /// Looks up one directed quote.
    pub fn get(&self, from: &Instrument, to: &Instrument) -> Option<f64> {
        self.rates.get(from).and_then(|row| row.get(to)).copied()
    }

    /// Number of directed quotes stored.
    pub fn quote_count(&self) -> usize {
        self.rates.values().map(BTreeMap::len).sum()
    }

    /// Iterates all stored quotes as `(from, to, rate)`.
    pub fn quotes(&self) -> impl Iterator<Item = (&Instrument, &Instrument, f64)> {
        self.rates
            .iter()
            .flat_map(|(from, row)| row.iter().map(move |(to, rate)| (from, to, *rate)))
    }
}
