//! Errors raised while building or querying a [`crate::rate_table::RateTable`].

use arb_data::Instrument;
use thiserror::Error;

/// Broad category of a [`RateTableError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required directed pair is missing, or too few instruments exist for any pair.
    IncompleteData,
    /// A supplied rate is non-positive, infinite or NaN.
    InvalidRate,
    /// A query referenced an instrument outside the configured set.
    NoSuchPair,
    /// The configured instrument list itself is unusable.
    InvalidConfig,
}

/// Construction and lookup failures for a rate table.
///
/// All variants are fatal for the run: no partial analysis is produced.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum RateTableError {
    #[error("incomplete rate data: missing directed pair {from}->{to}")]
    MissingPair { from: Instrument, to: Instrument },

    #[error("incomplete rate data: {count} instrument(s) configured, at least 2 are required")]
    TooFewInstruments { count: usize },

    #[error("invalid rate {rate} for {from}->{to}: rates must be positive and finite")]
    InvalidRate {
        from: Instrument,
        to: Instrument,
        rate: f64,
    },

    #[error("no such pair {from}->{to}: {missing} is not a configured instrument")]
    NoSuchPair {
        from: Instrument,
        to: Instrument,
        missing: Instrument,
    },

    #[error("instrument {instrument} is configured more than once")]
    DuplicateInstrument { instrument: Instrument },
}

impl RateTableError {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPair { .. } | Self::TooFewInstruments { .. } => ErrorKind::IncompleteData,
            Self::InvalidRate { .. } => ErrorKind::InvalidRate,
            Self::NoSuchPair { .. } => ErrorKind::NoSuchPair,
            Self::DuplicateInstrument { .. } => ErrorKind::InvalidConfig,
        }
    }
}
