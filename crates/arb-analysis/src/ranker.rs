//! Merges detector outputs into one ranked opportunity report.
//!
//! The ranker performs no analysis of its own: it takes the evaluated cycles,
//! the negative-cycle scan and the single-leg deviations, keeps the ones that
//! represent opportunities, and orders them by magnitude.

use std::cmp::Ordering;

use arb_data::Instrument;
use serde::Serialize;
use tracing::info;

use crate::cycles::{evaluate_cycles, CycleResult, Leg};
use crate::negative_cycle::{corroborate, detect_negative_cycles, Corroboration, NegativeCycleScan};
use crate::rate_table::RateTable;
use crate::single_leg::{analyze_single_leg, LegDeviation, TradeDirection};

/// Default notional used for absolute profit figures.
pub const DEFAULT_NOTIONAL: f64 = 10_000.0;

/// Default single-leg threshold (0.005%).
pub const DEFAULT_LEG_THRESHOLD: f64 = 0.00005;

/// Parameters consumed by [`analyze`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisConfig {
    /// Starting amount for absolute profit figures, in units of the first instrument.
    pub notional: f64,
    /// Minimum `|deviation|` for a single-leg opportunity.
    pub leg_threshold: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            notional: DEFAULT_NOTIONAL,
            leg_threshold: DEFAULT_LEG_THRESHOLD,
        }
    }
}

/// Which detector produced a [`ReportEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpportunityKind {
    TriangularCycle,
    NegativeCycleIndicator,
    SingleLeg,
}

impl OpportunityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TriangularCycle => "triangular-cycle",
            Self::NegativeCycleIndicator => "negative-cycle-indicator",
            Self::SingleLeg => "single-leg",
        }
    }
}

/// One ranked opportunity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportEntry {
    pub kind: OpportunityKind,
    /// Loop order for cycle kinds, `[from, to]` for single-leg entries.
    pub instruments: Vec<Instrument>,
    /// Profit fraction for cycle kinds, signed deviation for single-leg entries.
    pub magnitude: f64,
    /// Profit at the configured notional.
    pub absolute_profit: f64,
    /// Itemized rates for cycle kinds; the direct quote for single-leg entries.
    pub legs: Vec<Leg>,
    /// Intermediary of a single-leg entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via: Option<Instrument>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<TradeDirection>,
}

impl ReportEntry {
    /// `A -> B -> C -> A` for cycles, `A -> B (via C)` for single legs.
    pub fn route(&self) -> String {
        let joined = self
            .instruments
            .iter()
            .map(Instrument::code)
            .collect::<Vec<_>>()
            .join(" -> ");
        match (&self.via, self.instruments.first()) {
            (Some(via), _) => format!("{joined} (via {via})"),
            (None, Some(first)) => format!("{joined} -> {first}"),
            (None, None) => joined,
        }
    }

    fn from_cycle(cycle: &CycleResult, notional: f64) -> Self {
        Self {
            kind: OpportunityKind::TriangularCycle,
            instruments: cycle.instruments.to_vec(),
            magnitude: cycle.profit_fraction,
            absolute_profit: cycle.absolute_profit(notional),
            legs: cycle.legs.to_vec(),
            via: None,
            direction: None,
        }
    }

    fn from_deviation(deviation: &LegDeviation, notional: f64) -> Self {
        Self {
            kind: OpportunityKind::SingleLeg,
            instruments: vec![deviation.from.clone(), deviation.to.clone()],
            magnitude: deviation.deviation,
            absolute_profit: deviation.gross_profit(notional),
            legs: vec![Leg {
                from: deviation.from.clone(),
                to: deviation.to.clone(),
                rate: deviation.direct_rate,
            }],
            via: Some(deviation.via.clone()),
            direction: Some(deviation.direction),
        }
    }
}

/// Run-level counts that accompany the ranked entries.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ReportSummary {
    pub instrument_count: usize,
    pub notional: f64,
    pub leg_threshold: f64,
    /// Canonical three-instrument cycles evaluated.
    pub evaluated_cycles: usize,
    /// Evaluated cycles with strictly positive profit.
    pub cycle_opportunities: usize,
    /// Raw Bellman-Ford indicators across all sources; not deduplicated.
    pub indicator_count: usize,
    /// Distinct loops recovered from the indicators.
    pub unique_negative_cycles: usize,
    pub sources_scanned: usize,
    /// Ordered pairs analysed for single-leg deviation.
    pub single_leg_pairs: usize,
    pub single_leg_opportunities: usize,
    pub corroboration: Corroboration,
}

/// Ranked union of every detector's opportunities.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OpportunityReport {
    pub summary: ReportSummary,
    /// Sorted by `|magnitude|` descending.
    pub entries: Vec<ReportEntry>,
}

impl OpportunityReport {
    /// The `n` largest entries.
    pub fn top(&self, n: usize) -> &[ReportEntry] {
        &self.entries[..n.min(self.entries.len())]
    }

    /// Entries of one kind, in rank order.
    pub fn entries_of(&self, kind: OpportunityKind) -> impl Iterator<Item = &ReportEntry> {
        self.entries.iter().filter(move |entry| entry.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds a report from already-computed detector outputs.
pub fn rank(
    instrument_count: usize,
    cycles: &[CycleResult],
    scan: &NegativeCycleScan,
    deviations: &[LegDeviation],
    config: &AnalysisConfig,
) -> OpportunityReport {
    let mut entries: Vec<ReportEntry> = cycles
        .iter()
        .filter(|cycle| cycle.is_opportunity())
        .map(|cycle| ReportEntry::from_cycle(cycle, config.notional))
        .collect();

    entries.extend(scan.cycles.iter().map(|finding| ReportEntry {
        kind: OpportunityKind::NegativeCycleIndicator,
        instruments: finding.instruments.clone(),
        magnitude: finding.profit_fraction,
        absolute_profit: config.notional * finding.profit_fraction,
        legs: finding.legs.clone(),
        via: None,
        direction: None,
    }));

    entries.extend(
        deviations
            .iter()
            .filter(|deviation| deviation.is_opportunity)
            .map(|deviation| ReportEntry::from_deviation(deviation, config.notional)),
    );

    entries.sort_by(compare_entries);

    let summary = ReportSummary {
        instrument_count,
        notional: config.notional,
        leg_threshold: config.leg_threshold,
        evaluated_cycles: cycles.len(),
        cycle_opportunities: cycles.iter().filter(|c| c.is_opportunity()).count(),
        indicator_count: scan.indicator_count(),
        unique_negative_cycles: scan.cycles.len(),
        sources_scanned: scan.sources_scanned,
        single_leg_pairs: deviations.len(),
        single_leg_opportunities: deviations.iter().filter(|d| d.is_opportunity).count(),
        corroboration: corroborate(cycles, &scan.triangles),
    };

    OpportunityReport { summary, entries }
}

/// Runs every detector over `table` and ranks the result.
pub fn analyze(table: &RateTable, config: &AnalysisConfig) -> OpportunityReport {
    let cycles = evaluate_cycles(table);
    let scan = detect_negative_cycles(table);
    let deviations = analyze_single_leg(table, config.leg_threshold);

    let report = rank(table.len(), &cycles, &scan, &deviations, config);

    info!(
        instruments = report.summary.instrument_count,
        cycles = report.summary.evaluated_cycles,
        cycle_opportunities = report.summary.cycle_opportunities,
        indicators = report.summary.indicator_count,
        negative_cycles = report.summary.unique_negative_cycles,
        single_leg = report.summary.single_leg_opportunities,
        within_tolerance = report.summary.corroboration.within_tolerance.len(),
        consistent = report.summary.corroboration.is_consistent(),
        "analysis complete"
    );

    report
}

fn compare_entries(lhs: &ReportEntry, rhs: &ReportEntry) -> Ordering {
    rhs.magnitude
        .abs()
        .total_cmp(&lhs.magnitude.abs())
        .then_with(|| lhs.kind.cmp(&rhs.kind))
        .then_with(|| lhs.instruments.cmp(&rhs.instruments))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negative_cycle::NegativeCycleFinding;
    use arb_data::parse_instrument_list;

    fn inst(code: &str) -> Instrument {
        Instrument::new(code)
    }

    fn table(codes: &str, edits: &[(&str, &str, f64)]) -> RateTable {
        let instruments = parse_instrument_list(codes);
        let mut quotes = Vec::new();
        for (i, from) in instruments.iter().enumerate() {
            for (j, to) in instruments.iter().enumerate() {
                if i == j {
                    continue;
                }
                let factor = edits
                    .iter()
                    .find(|(f, t, _)| from.code() == *f && to.code() == *t)
                    .map_or(1.0, |(_, _, factor)| *factor);
                let rate = 2f64.powi(j as i32 - i as i32) * factor;
                quotes.push((from.clone(), to.clone(), rate));
            }
        }
        RateTable::new(instruments, quotes).expect("complete")
    }

    fn deviation(from: &str, to: &str, value: f64, is_opportunity: bool) -> LegDeviation {
        LegDeviation {
            from: inst(from),
            to: inst(to),
            direct_rate: 1.0,
            via: inst("USD"),
            implied_rate: 1.0 + value,
            deviation: value,
            average_implied_rate: 1.0 + value,
            average_deviation: value,
            direction: if value > 0.0 {
                TradeDirection::Buy
            } else {
                TradeDirection::Sell
            },
            is_opportunity,
        }
    }

    #[test]
    fn arbitrage_free_table_has_empty_report() {
        let report = analyze(&table("USD,EUR,GBP,JPY", &[]), &AnalysisConfig::default());

        assert!(report.is_empty());
        assert_eq!(report.summary.evaluated_cycles, 8);
        assert_eq!(report.summary.cycle_opportunities, 0);
        assert_eq!(report.summary.indicator_count, 0);
        assert_eq!(report.summary.single_leg_pairs, 12);
        assert!(report.summary.corroboration.is_consistent());
    }

    #[test]
    fn every_detector_contributes() {
        let edits = [("EUR", "GBP", 1.1), ("GBP", "EUR", 1.0 / 1.2)];
        let report = analyze(&table("USD,EUR,GBP", &edits), &AnalysisConfig::default());

        let cycle = report
            .entries_of(OpportunityKind::TriangularCycle)
            .next()
            .expect("cycle entry");
        assert_eq!(cycle.instruments, vec![inst("EUR"), inst("GBP"), inst("USD")]);
        assert!((cycle.absolute_profit - 1_000.0).abs() < 1e-6);
        assert_eq!(cycle.route(), "EUR -> GBP -> USD -> EUR");

        assert!(report.entries_of(OpportunityKind::NegativeCycleIndicator).count() >= 1);
        assert!(report.entries_of(OpportunityKind::SingleLeg).count() >= 1);
        assert!(report.summary.indicator_count >= report.summary.unique_negative_cycles);
        assert_eq!(report.summary.corroboration.agreed.len(), 1);
    }

    #[test]
    fn entries_sorted_by_absolute_magnitude() {
        let deviations = vec![
            deviation("EUR", "GBP", 0.02, true),
            deviation("GBP", "EUR", -0.05, true),
            deviation("USD", "EUR", 0.001, false),
        ];
        let scan = NegativeCycleScan {
            cycles: vec![NegativeCycleFinding {
                instruments: vec![inst("EUR"), inst("GBP")],
                legs: Vec::new(),
                total_weight: -0.03,
                product: 1.03,
                profit_fraction: 0.03,
                sources: vec![inst("USD")],
            }],
            ..NegativeCycleScan::default()
        };

        let report = rank(3, &[], &scan, &deviations, &AnalysisConfig::default());
        let magnitudes: Vec<f64> = report.entries.iter().map(|e| e.magnitude).collect();

        assert_eq!(magnitudes, vec![-0.05, 0.03, 0.02]);
        assert_eq!(report.entries[0].direction, Some(TradeDirection::Sell));
        assert_eq!(report.entries[0].route(), "GBP -> EUR (via USD)");
        assert_eq!(report.summary.single_leg_opportunities, 2);
        assert_eq!(report.top(1).len(), 1);
        assert_eq!(report.top(10).len(), 3);
    }

    #[test]
    fn equal_magnitudes_break_ties_by_kind_then_instruments() {
        let deviations = vec![
            deviation("GBP", "USD", 0.01, true),
            deviation("EUR", "USD", -0.01, true),
        ];
        let scan = NegativeCycleScan {
            cycles: vec![NegativeCycleFinding {
                instruments: vec![inst("USD"), inst("ZAR")],
                legs: Vec::new(),
                total_weight: -0.00995,
                product: 1.01,
                profit_fraction: 0.01,
                sources: Vec::new(),
            }],
            ..NegativeCycleScan::default()
        };

        let report = rank(3, &[], &scan, &deviations, &AnalysisConfig::default());
        let order: Vec<(OpportunityKind, &str)> = report
            .entries
            .iter()
            .map(|e| (e.kind, e.instruments[0].code()))
            .collect();

        assert_eq!(
            order,
            vec![
                (OpportunityKind::NegativeCycleIndicator, "USD"),
                (OpportunityKind::SingleLeg, "EUR"),
                (OpportunityKind::SingleLeg, "GBP"),
            ]
        );
    }

    #[test]
    fn kinds_serialize_kebab_case() {
        let json = serde_json::to_string(&OpportunityKind::NegativeCycleIndicator).expect("json");
        assert_eq!(json, "\"negative-cycle-indicator\"");
        assert_eq!(OpportunityKind::SingleLeg.as_str(), "single-leg");
    }

    #[test]
    fn default_config_matches_documented_values() {
        let config = AnalysisConfig::default();
        assert_eq!(config.notional, 10_000.0);
        assert_eq!(config.leg_threshold, 0.00005);
    }
}
