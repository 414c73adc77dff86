//! # launder-scan
//!
//! A batch forensic analysis engine for money-laundering detection over
//! a transaction graph: weighted PageRank and Louvain centrality, seven
//! independent heuristic detectors, strongly-connected-component ring
//! detection, and dataset-wide Benford/structuring statistics.
//!
//! The engine is a pure batch function: [`AnalysisEngine::analyze`]
//! takes one input batch and returns one [`ResultDocument`] — no I/O,
//! no shared mutable state across calls, so independent batches may run
//! on separate threads with no synchronization between them.

pub mod centrality;
pub mod config;
pub mod error;
pub mod features;
pub mod graph;
pub mod normalizer;
pub mod result;
pub mod rings;
pub mod scoring;
pub mod stats;

pub use config::PipelineConfig;
pub use error::AnalysisError;
pub use graph::{Account, AccountType, Edge, Graph};
pub use normalizer::RawTransaction;
pub use result::ResultDocument;
pub use rings::Ring;

use tracing::info;

/// One batch analysis run, holding only its configuration — grounded on
/// the teacher's `TransactionValidator` (a struct wrapping a config,
/// `validate`'d one transaction at a time), generalized here to one
/// whole batch at a time since this pipeline's stages (centrality,
/// rings, dataset statistics) are inherently batch-level, not
/// per-transaction.
#[derive(Debug, Clone, Default)]
pub struct AnalysisEngine {
    config: PipelineConfig,
}

impl AnalysisEngine {
    /// An engine using the documented default configuration (spec §6's
    /// "Configuration constants" — the external contract).
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the full eight-stage pipeline over one input batch and
    /// return its Result Document. Never fails on malformed input rows
    /// — those are silently dropped by the normalizer (spec §4.1) — the
    /// only error path is an internal invariant violation.
    pub fn analyze(&self, rows: &[RawTransaction]) -> Result<ResultDocument, AnalysisError> {
        info!(rows = rows.len(), "starting batch analysis");

        // 1. Normalizer.
        let transactions = normalizer::normalize(rows);
        info!(clean_transactions = transactions.len(), "normalized batch");
        if transactions.is_empty() {
            info!("empty cleaned batch, returning empty result document");
            return Ok(ResultDocument::empty());
        }

        // 2. Graph Builder.
        let mut graph = Graph::build(&transactions);
        info!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built transaction graph"
        );

        // 3. Centrality Stage.
        let centrality_result = centrality::compute(&graph, &self.config);
        centrality::apply(&mut graph, centrality_result);

        // 4. Feature Aggregator.
        features::aggregate(&mut graph, &transactions);

        // 5. Heuristic Scorer.
        let all_amounts: Vec<f64> = transactions.iter().map(|t| t.amount).collect();
        scoring::score_accounts(&mut graph, &all_amounts);

        // 6. Ring Detector.
        let rings = rings::detect(&mut graph, &self.config);
        info!(rings_found = rings.len(), "ring detection complete");

        for account in graph.accounts() {
            if account.risk_score > 100 {
                return Err(AnalysisError::InvariantViolation(format!(
                    "account {} has risk_score {} above the documented maximum of 100",
                    account.id, account.risk_score
                )));
            }
        }

        // 7. Dataset Statistics.
        let stats = stats::compute(&transactions);

        // 8. Result Assembler.
        let document = result::assemble(&graph, &rings, &stats);
        info!("batch analysis complete");
        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(source: &str, target: &str, amount: &str) -> RawTransaction {
        RawTransaction {
            source: source.to_string(),
            target: target.to_string(),
            amount: amount.to_string(),
            timestamp: None,
        }
    }

    #[test]
    fn empty_batch_yields_empty_document() {
        let engine = AnalysisEngine::new();
        let doc = engine.analyze(&[]).unwrap();
        assert!(doc.elements.is_empty());
        assert!(doc.summary.is_none());
    }

    #[test]
    fn fully_invalid_batch_yields_empty_document() {
        let engine = AnalysisEngine::new();
        let rows = vec![raw("A", "A", "100"), raw("B", "C", "-0")];
        let doc = engine.analyze(&rows).unwrap();
        assert!(doc.elements.is_empty());
    }

    #[test]
    fn simple_cycle_is_flagged_as_a_ring() {
        let engine = AnalysisEngine::new();
        let rows = vec![
            raw("A", "B", "1000"),
            raw("B", "C", "1000"),
            raw("C", "A", "1000"),
        ];
        let doc = engine.analyze(&rows).unwrap();
        assert_eq!(doc.fraud_rings.len(), 1);
        assert_eq!(doc.flagged_accounts.len(), 3);
        assert_eq!(doc.metrics["total_nodes"], 3);
        assert_eq!(doc.metrics["rings_count"], 1);
    }
}
