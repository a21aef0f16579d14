//! End-to-end report tests from snapshot to ranked output.
//!
//! Tests verify:
//! - Frankfurter responses merge into a snapshot that builds a complete table
//! - Saved snapshots replay to the same report
//! - Report ranking, summary counts and JSON shape

mod common;

#[cfg(test)]
mod report {
    use arb_analysis::ranker::{analyze, AnalysisConfig, OpportunityKind};
    use arb_analysis::{ErrorKind, RateTable, RateTableError};
    use arb_data::frankfurter::{merge_latest, parse_latest};
    use arb_data::snapshot::{load_snapshot, save_snapshot};
    use arb_data::{parse_instrument_list, Instrument, RateSnapshot};

    use arb_analysis::negative_cycle::RELAXATION_TOLERANCE;

    use crate::common::{arbitrage_free_table, quotes_from_values, ten_percent_snapshot};

    const USD: &str = r#"{"amount":1.0,"base":"USD","date":"2024-05-17","rates":{"EUR":0.92,"GBP":0.79,"JPY":155.6}}"#;
    const EUR: &str = r#"{"amount":1.0,"base":"EUR","date":"2024-05-17","rates":{"USD":1.087,"GBP":0.859,"JPY":169.1}}"#;
    const GBP: &str = r#"{"amount":1.0,"base":"GBP","date":"2024-05-17","rates":{"USD":1.266,"EUR":1.164,"JPY":196.9}}"#;

    fn frankfurter_snapshot() -> eyre::Result<RateSnapshot> {
        let instruments = parse_instrument_list("USD,EUR,GBP");
        let mut snapshot = RateSnapshot::new("frankfurter", instruments.clone());
        for body in [USD, EUR, GBP] {
            let latest = parse_latest(body)?;
            snapshot.date = Some(latest.date);
            merge_latest(&mut snapshot, &latest, &instruments);
        }
        Ok(snapshot)
    }

    #[test]
    fn frankfurter_responses_build_complete_table() -> eyre::Result<()> {
        let snapshot = frankfurter_snapshot()?;
        // JPY is outside the configured set and is dropped.
        assert_eq!(snapshot.quote_count(), 6);

        let table = RateTable::from_snapshot(&snapshot)?;
        assert_eq!(table.rate(&Instrument::new("EUR"), &Instrument::new("GBP"))?, 0.859);

        let report = analyze(&table, &AnalysisConfig::default());
        assert_eq!(report.summary.instrument_count, 3);
        assert_eq!(report.summary.evaluated_cycles, 2);
        assert!(report.summary.corroboration.is_consistent());
        Ok(())
    }

    #[test]
    fn partial_snapshot_fails_with_incomplete_data() -> eyre::Result<()> {
        let instruments = parse_instrument_list("USD,EUR,GBP");
        let mut snapshot = RateSnapshot::new("frankfurter", instruments.clone());
        for body in [USD, EUR] {
            merge_latest(&mut snapshot, &parse_latest(body)?, &instruments);
        }

        let err = RateTable::from_snapshot(&snapshot).expect_err("GBP base never fetched");
        assert_eq!(err.kind(), ErrorKind::IncompleteData);
        assert!(matches!(err, RateTableError::MissingPair { ref from, .. } if from.code() == "GBP"));
        Ok(())
    }

    #[test]
    fn saved_snapshot_replays_identically() -> eyre::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("rates").join("snapshot.json");
        let snapshot = ten_percent_snapshot();

        save_snapshot(&snapshot, &path)?;
        let replayed = load_snapshot(&path)?;
        assert_eq!(replayed, snapshot);

        let config = AnalysisConfig::default();
        let original = analyze(&RateTable::from_snapshot(&snapshot)?, &config);
        let again = analyze(&RateTable::from_snapshot(&replayed)?, &config);
        assert_eq!(original, again);
        Ok(())
    }

    #[test]
    fn ten_percent_report_ranks_every_kind() -> eyre::Result<()> {
        let table = RateTable::from_snapshot(&ten_percent_snapshot())?;
        let config = AnalysisConfig {
            notional: 5_000.0,
            leg_threshold: 0.01,
        };
        let report = analyze(&table, &config);

        let magnitudes: Vec<f64> = report.entries.iter().map(|e| e.magnitude.abs()).collect();
        assert!(magnitudes.windows(2).all(|pair| pair[0] >= pair[1]));

        let cycle = report
            .entries_of(OpportunityKind::TriangularCycle)
            .next()
            .expect("triangular entry");
        assert!((cycle.absolute_profit - 500.0).abs() < 1e-6);
        assert_eq!(cycle.legs.len(), 3);

        assert_eq!(report.entries_of(OpportunityKind::NegativeCycleIndicator).count(), 1);
        assert!(report
            .entries_of(OpportunityKind::SingleLeg)
            .all(|e| e.magnitude.abs() > 0.01 && e.via.is_some()));
        assert_eq!(report.summary.cycle_opportunities, 1);
        assert_eq!(report.summary.corroboration.agreed.len(), 1);
        Ok(())
    }

    #[test]
    fn report_serializes_kinds_and_summary() -> eyre::Result<()> {
        let table = RateTable::from_snapshot(&ten_percent_snapshot())?;
        let report = analyze(&table, &AnalysisConfig::default());
        let json = serde_json::to_value(&report)?;

        assert_eq!(json["summary"]["instrument_count"], 3);
        assert!(json["summary"]["indicator_count"].as_u64().unwrap_or(0) > 0);
        let kinds: Vec<&str> = json["entries"]
            .as_array()
            .map(|entries| entries.iter().filter_map(|e| e["kind"].as_str()).collect())
            .unwrap_or_default();
        assert!(kinds.contains(&"triangular-cycle"));
        assert!(kinds.contains(&"negative-cycle-indicator"));
        Ok(())
    }

    #[test]
    fn arbitrage_free_report_is_empty() {
        let report = analyze(
            &arbitrage_free_table("USD,EUR,GBP,MXN,JPY,CHF,CAD,AUD"),
            &AnalysisConfig::default(),
        );
        assert!(report.is_empty());
        assert_eq!(report.summary.evaluated_cycles, 112);
        assert_eq!(report.summary.single_leg_pairs, 56);
        assert_eq!(report.summary.unique_negative_cycles, 0);
    }

    #[test]
    fn market_valued_arbitrage_free_table_is_consistent() -> eyre::Result<()> {
        // Ordinary quote values: products land a few ulps either side of 1.0.
        let instruments = parse_instrument_list("USD,EUR,GBP,JPY,CHF,CAD");
        let quotes =
            quotes_from_values(&instruments, &[1.0, 0.92, 0.79, 155.6, 0.91, 1.37], &[]);
        let table = RateTable::new(instruments, quotes)?;
        let report = analyze(&table, &AnalysisConfig::default());
        let check = &report.summary.corroboration;

        assert!(check.is_consistent());
        assert!(check.evaluator_only.is_empty());
        assert!(check.detector_only.is_empty());
        assert!(check.agreed.is_empty());
        assert_eq!(report.summary.indicator_count, 0);
        assert_eq!(report.summary.unique_negative_cycles, 0);
        assert_eq!(report.summary.single_leg_opportunities, 0);
        assert_eq!(check.within_tolerance.len(), report.summary.cycle_opportunities);

        // Whatever the strict evaluator still reports is rounding noise.
        for entry in report.entries_of(OpportunityKind::TriangularCycle) {
            assert!(entry.magnitude.abs() <= RELAXATION_TOLERANCE, "{}", entry.route());
            let key = [
                entry.instruments[0].clone(),
                entry.instruments[1].clone(),
                entry.instruments[2].clone(),
            ];
            assert!(check.within_tolerance.contains(&key));
        }
        assert_eq!(report.entries.len(), report.summary.cycle_opportunities);
        Ok(())
    }
}
