//! Integration tests for the six concrete scenarios and the quantified
//! invariants documented for the analysis engine.
//!
//! Grounded on the teacher's own integration-style `#[cfg(test)]`
//! modules (each a self-contained scenario construction + assertion)
//! and on `examples/original_source/backend/main.py`'s `/sample-csv`
//! fixture data, which exercises the same cycle/smurf/shell shapes.

use launder_scan::{AccountType, AnalysisEngine, RawTransaction};
use proptest::prelude::*;

fn row(source: &str, target: &str, amount: &str) -> RawTransaction {
    RawTransaction {
        source: source.to_string(),
        target: target.to_string(),
        amount: amount.to_string(),
        timestamp: None,
    }
}

fn account<'a>(doc: &'a launder_scan::ResultDocument, id: &str) -> &'a launder_scan::result::FlaggedAccount {
    doc.flagged_accounts
        .iter()
        .find(|a| a.id == id)
        .unwrap_or_else(|| panic!("{id} was not flagged"))
}

#[test]
fn scenario_1_simple_three_cycle() {
    let engine = AnalysisEngine::new();
    let rows = vec![
        row("A", "B", "1000"),
        row("B", "C", "1000"),
        row("C", "A", "1000"),
    ];
    let doc = engine.analyze(&rows).unwrap();

    assert_eq!(doc.fraud_rings.len(), 1);
    let ring = &doc.fraud_rings[0];
    assert_eq!(ring.ring_id, "RING_001");
    let mut members = ring.member_accounts.clone();
    members.sort();
    assert_eq!(members, vec!["A".to_string(), "B".to_string(), "C".to_string()]);
    assert_eq!(ring.cycle_volume, 3000.0);

    for id in ["A", "B", "C"] {
        let acc = account(&doc, id);
        assert_eq!(acc.risk_score, 100);
        assert_eq!(acc.account_type, AccountType::RingMember);
    }
}

#[test]
fn scenario_2_smurfing_aggregator() {
    let engine = AnalysisEngine::new();
    let mut rows: Vec<RawTransaction> = (0..11)
        .map(|i| row(&format!("S{i}"), "M", "500"))
        .collect();
    rows.push(row("M", "Sink", "5000"));
    let doc = engine.analyze(&rows).unwrap();

    let m = account(&doc, "M");
    assert!(m.flags.iter().any(|f| f == "smurfing aggregator"));
    assert_eq!(m.account_type, AccountType::Aggregator);
    assert!(doc.fraud_rings.is_empty());
}

#[test]
fn scenario_3_structuring() {
    let engine = AnalysisEngine::new();
    let rows: Vec<RawTransaction> = (0..5).map(|i| row(&format!("S{i}"), "R", "9500")).collect();
    let doc = engine.analyze(&rows).unwrap();

    let r = account(&doc, "R");
    assert!(r
        .flags
        .iter()
        .any(|f| f == "structuring (5 near-threshold txns)"));
    assert!(r.risk_score >= 35);
    assert_eq!(doc.metrics["structuring_pct"], 100.0);
}

#[test]
fn scenario_4_complex_network_clique() {
    let engine = AnalysisEngine::new();
    let n = 150;
    let mut rows = Vec::with_capacity(n * (n - 1));
    for i in 0..n {
        for j in 0..n {
            if i != j {
                rows.push(row(&format!("N{i}"), &format!("N{j}"), "100"));
            }
        }
    }
    let doc = engine.analyze(&rows).unwrap();

    assert_eq!(doc.fraud_rings.len(), 1);
    let ring = &doc.fraud_rings[0];
    assert!(ring.ring_id.starts_with("COMPLEX_NET_"));
    assert_eq!(ring.member_accounts.len(), 10);
    assert_eq!(doc.metrics["total_nodes"], n);

    for i in 0..n {
        let acc = account(&doc, &format!("N{i}"));
        assert_eq!(acc.risk_score, 100);
        assert_eq!(acc.account_type, AccountType::RingMember);
    }
}

#[test]
fn scenario_5_pass_through_mule() {
    let engine = AnalysisEngine::new();
    let rows = vec![row("X", "M", "10000"), row("M", "Y", "9500")];
    let doc = engine.analyze(&rows).unwrap();

    let m = account(&doc, "M");
    assert_eq!(m.account_type, AccountType::Mule);
    assert!(m.risk_score >= 45);
}

#[test]
fn scenario_6_benford_trigger() {
    let engine = AnalysisEngine::new();
    // 200 transactions with amounts spread uniformly across
    // [10000, 99999], so leading digits 1-9 occur roughly equally often
    // -- far from Benford's skew toward 1.
    let mut rows = Vec::with_capacity(200);
    for i in 0..200u32 {
        let amount = 10_000 + (i as u64 * 449) % 90_000;
        rows.push(row(&format!("S{i}"), &format!("T{i}"), &amount.to_string()));
    }
    let doc = engine.analyze(&rows).unwrap();

    assert_eq!(doc.metrics["benford_status"], "Suspicious");
    assert!(doc.metrics["benford_deviation"].as_f64().unwrap() > 0.05);
}

#[test]
fn two_node_cycle_is_below_the_ring_length_floor() {
    let engine = AnalysisEngine::new();
    let rows = vec![row("A", "B", "500"), row("B", "A", "500")];
    let doc = engine.analyze(&rows).unwrap();
    assert!(doc.fraud_rings.is_empty());
}

#[test]
fn permuting_input_rows_leaves_folded_topology_unchanged() {
    let engine = AnalysisEngine::new();
    let forward = vec![
        row("A", "B", "1000"),
        row("B", "C", "1000"),
        row("C", "A", "1000"),
        row("A", "B", "500"),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();

    let doc_a = engine.analyze(&forward).unwrap();
    let doc_b = engine.analyze(&reversed).unwrap();

    assert_eq!(doc_a.metrics["total_nodes"], doc_b.metrics["total_nodes"]);
    assert_eq!(doc_a.metrics["total_edges"], doc_b.metrics["total_edges"]);
    assert_eq!(
        doc_a.metrics["total_transactions"],
        doc_b.metrics["total_transactions"]
    );
    assert_eq!(doc_a.metrics["total_volume"], doc_b.metrics["total_volume"]);

    let mut flags_a: Vec<(String, u32, Vec<String>)> = doc_a
        .flagged_accounts
        .iter()
        .map(|a| (a.id.clone(), a.risk_score, a.flags.clone()))
        .collect();
    let mut flags_b: Vec<(String, u32, Vec<String>)> = doc_b
        .flagged_accounts
        .iter()
        .map(|a| (a.id.clone(), a.risk_score, a.flags.clone()))
        .collect();
    flags_a.sort();
    flags_b.sort();
    assert_eq!(flags_a, flags_b);
}

#[test]
fn running_the_engine_twice_is_byte_identical() {
    let engine = AnalysisEngine::new();
    let rows = vec![
        row("A", "B", "1000"),
        row("B", "C", "1000"),
        row("C", "A", "1000"),
    ];
    let first = serde_json::to_string(&engine.analyze(&rows).unwrap()).unwrap();
    let second = serde_json::to_string(&engine.analyze(&rows).unwrap()).unwrap();
    assert_eq!(first, second);
}

proptest! {
    #[test]
    fn risk_score_always_in_bounds(
        pairs in prop::collection::vec(
            ("[A-F]", "[A-F]", 1u32..20_000u32),
            1..60,
        )
    ) {
        let rows: Vec<RawTransaction> = pairs
            .into_iter()
            .filter(|(s, t, _)| s != t)
            .map(|(s, t, amount)| row(&s, &t, &amount.to_string()))
            .collect();
        let engine = AnalysisEngine::new();
        let doc = engine.analyze(&rows).unwrap();
        for account in &doc.flagged_accounts {
            prop_assert!(account.risk_score <= 100);
        }
    }

    #[test]
    fn suspicious_iff_score_or_flags(
        pairs in prop::collection::vec(
            ("[A-J]", "[A-J]", 1u32..15_000u32),
            1..80,
        )
    ) {
        let rows: Vec<RawTransaction> = pairs
            .into_iter()
            .filter(|(s, t, _)| s != t)
            .map(|(s, t, amount)| row(&s, &t, &amount.to_string()))
            .collect();
        let engine = AnalysisEngine::new();
        let doc = engine.analyze(&rows).unwrap();
        for element in &doc.elements {
            if let launder_scan::result::Element::Node { data } = element {
                let expected = data.risk_score > 10 || !data.flags.is_empty();
                prop_assert_eq!(data.suspicious, expected);
            }
        }
    }

    #[test]
    fn simple_ring_length_stays_within_the_documented_bounds(
        pairs in prop::collection::vec(
            ("[A-J]", "[A-J]", 1u32..5_000u32),
            1..40,
        )
    ) {
        let rows: Vec<RawTransaction> = pairs
            .into_iter()
            .filter(|(s, t, _)| s != t)
            .map(|(s, t, amount)| row(&s, &t, &amount.to_string()))
            .collect();
        let cleaned = launder_scan::normalizer::normalize(&rows);
        let mut graph = launder_scan::graph::Graph::build(&cleaned);
        let config = launder_scan::PipelineConfig::default();
        let rings = launder_scan::rings::detect(&mut graph, &config);
        for ring in &rings {
            // Only simple cycles carry the 3..=8 bound; a complex
            // network (note = Some(_)) reports its top-N members instead.
            if ring.note.is_none() {
                prop_assert!(ring.nodes.len() >= 3 && ring.nodes.len() <= 8);
            }
        }
    }

    #[test]
    fn every_edge_is_well_formed(
        pairs in prop::collection::vec(
            ("[A-E]", "[A-E]", 1u32..10_000u32),
            1..40,
        )
    ) {
        let rows: Vec<RawTransaction> = pairs
            .into_iter()
            .filter(|(s, t, _)| s != t)
            .map(|(s, t, amount)| row(&s, &t, &amount.to_string()))
            .collect();
        let engine = AnalysisEngine::new();
        let doc = engine.analyze(&rows).unwrap();
        for element in &doc.elements {
            if let launder_scan::result::Element::Edge { data } = element {
                prop_assert_ne!(&data.source, &data.target);
                prop_assert!(data.amount > 0.0);
            }
        }
    }
}
