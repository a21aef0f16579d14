//! arb-analysis crate
//!
//! Point-in-time arbitrage detection over a complete directed rate table:
//! exhaustive triangular cycle evaluation, a Bellman-Ford negative-cycle
//! cross-check, single-leg deviation against implied cross-rates, and a
//! ranker that merges them into one report. Also carries the deployment
//! ROI model used to judge whether a detected spread is worth pursuing.

pub mod cycles;
pub mod error;
pub mod negative_cycle;
pub mod ranker;
pub mod rate_table;
pub mod roi;
pub mod single_leg;

pub use cycles::{canonicalize, evaluate_cycles, CycleResult, Leg};
pub use error::{ErrorKind, RateTableError};
pub use negative_cycle::{detect_negative_cycles, NegativeCycleFinding, NegativeCycleScan};
pub use ranker::{analyze, AnalysisConfig, OpportunityKind, OpportunityReport, ReportEntry};
pub use rate_table::RateTable;
pub use single_leg::{analyze_single_leg, LegDeviation, TradeDirection};
