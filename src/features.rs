//! Per-node feature aggregation (spec §4.4).
//!
//! Generalizes the teacher's `TransactionNode` aggregate fields
//! (`total_inflow`, `incoming_accounts`, ...) onto the petgraph-backed
//! [`crate::graph::Graph`]. Per spec §5, this is an embarrassingly
//! parallel per-node pass (each node reads only its own incident
//! edges), so it runs over `rayon`'s `par_iter` the way the
//! `josongsong-semantica-codegraph` sibling pack member uses `rayon`
//! for its per-node graph passes.

use chrono::{DateTime, Utc};
use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rayon::prelude::*;
use std::collections::HashMap;

use crate::graph::Graph;
use crate::normalizer::CleanTransaction;

struct NodeFeatures {
    idx: NodeIndex,
    in_volume: f64,
    out_volume: f64,
    in_degree: usize,
    out_degree: usize,
    incoming_timestamps: Vec<DateTime<Utc>>,
}

/// Fill in `in_volume`, `out_volume`, `in_degree`, `out_degree`,
/// `incoming_amounts`, and `incoming_timestamps` on every account.
///
/// `incoming_amounts` is the one field not derivable from the folded
/// graph alone — per spec §9's Open Question it must carry
/// per-transaction granularity, so it is built directly from the
/// normalized (pre-fold) transaction stream.
pub fn aggregate(graph: &mut Graph, transactions: &[CleanTransaction]) {
    let mut incoming_amounts_by_target: HashMap<&str, Vec<f64>> = HashMap::new();
    for txn in transactions {
        incoming_amounts_by_target
            .entry(txn.target.as_str())
            .or_default()
            .push(txn.amount);
    }

    let node_indices: Vec<NodeIndex> = graph.inner.node_indices().collect();

    let computed: Vec<NodeFeatures> = node_indices
        .par_iter()
        .map(|&idx| {
            let in_volume: f64 = graph
                .inner
                .edges_directed(idx, Direction::Incoming)
                .map(|e| e.weight().amount)
                .sum();
            let out_volume: f64 = graph
                .inner
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.weight().amount)
                .sum();
            let in_degree = graph.inner.edges_directed(idx, Direction::Incoming).count();
            let out_degree = graph.inner.edges_directed(idx, Direction::Outgoing).count();
            let mut incoming_timestamps: Vec<DateTime<Utc>> = graph
                .inner
                .edges_directed(idx, Direction::Incoming)
                .flat_map(|e| e.weight().timestamps.iter().filter_map(|ts| *ts))
                .collect();
            incoming_timestamps.sort();

            NodeFeatures {
                idx,
                in_volume,
                out_volume,
                in_degree,
                out_degree,
                incoming_timestamps,
            }
        })
        .collect();

    for features in computed {
        let id = graph.inner[features.idx].id.clone();
        let incoming_amounts = incoming_amounts_by_target
            .get(id.as_str())
            .cloned()
            .unwrap_or_default();

        let account = &mut graph.inner[features.idx];
        account.in_volume = features.in_volume;
        account.out_volume = features.out_volume;
        account.in_degree = features.in_degree;
        account.out_degree = features.out_degree;
        account.incoming_amounts = incoming_amounts;
        account.incoming_timestamps = features.incoming_timestamps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;

    fn txn(source: &str, target: &str, amount: f64) -> CleanTransaction {
        CleanTransaction {
            source: source.to_string(),
            target: target.to_string(),
            amount,
            timestamp: None,
        }
    }

    #[test]
    fn aggregates_volume_and_degree() {
        let transactions = vec![
            txn("S1", "M", 500.0),
            txn("S2", "M", 500.0),
            txn("M", "Sink", 900.0),
        ];
        let mut graph = Graph::build(&transactions);
        aggregate(&mut graph, &transactions);

        let m = graph.account("M").unwrap();
        assert_eq!(m.in_volume, 1000.0);
        assert_eq!(m.out_volume, 900.0);
        assert_eq!(m.in_degree, 2);
        assert_eq!(m.out_degree, 1);
        assert_eq!(m.incoming_amounts, vec![500.0, 500.0]);
    }

    #[test]
    fn per_transaction_amounts_survive_folding() {
        // Three separate transactions folded into one edge must still
        // leave three entries in incoming_amounts.
        let transactions = vec![
            txn("A", "R", 9500.0),
            txn("A", "R", 9200.0),
            txn("A", "R", 9800.0),
        ];
        let mut graph = Graph::build(&transactions);
        aggregate(&mut graph, &transactions);
        let r = graph.account("R").unwrap();
        assert_eq!(r.incoming_amounts.len(), 3);
    }
}
