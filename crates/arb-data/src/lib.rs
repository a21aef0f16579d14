//! arb-data crate
//!
//! Rate-source side of the toolkit: instrument and snapshot types, the
//! Frankfurter quote fetcher, and snapshot files for offline replay.

pub mod frankfurter;
pub mod snapshot;
pub mod types;

pub use types::{parse_instrument_list, Instrument, RateSnapshot};
