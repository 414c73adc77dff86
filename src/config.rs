//! Engine-mechanics configuration.
//!
//! Bundles the parameters spec.md documents as fixed algorithm
//! mechanics — PageRank damping/iteration bounds, the Louvain seed and
//! its node-count gate, and the ring-enumeration SCC size gate — so a
//! batch is analyzed with one `PipelineConfig` the way the teacher
//! crate constructs one `ValidatorConfig` per validator. Unlike
//! `ValidatorConfig`, the defaults here are the external contract
//! (spec.md §6, "Configuration constants"): production code should
//! always use [`PipelineConfig::default`]. The fields stay public
//! (rather than becoming bare constants) so a test can shrink
//! `scc_enumeration_limit` to exercise the complex-network path
//! without constructing a 101-node fixture.

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// PageRank damping factor.
    pub pagerank_damping: f64,
    /// Maximum PageRank power-iteration steps.
    pub pagerank_max_iterations: usize,
    /// PageRank convergence tolerance (max per-node delta between iterations).
    pub pagerank_tolerance: f64,

    /// Fixed seed for the Louvain modularity optimizer.
    pub louvain_seed: u64,
    /// Above this node count, Louvain is skipped in favor of
    /// weakly-connected-component labeling.
    pub louvain_max_nodes: usize,

    /// Strongly connected components at or below this size are fully
    /// enumerated for simple cycles; larger ones are reported as a
    /// single complex network.
    pub scc_enumeration_limit: usize,
    /// Simple cycles with length in `(2, 8]` (3..=8) are retained.
    pub simple_cycle_min_len: usize,
    pub simple_cycle_max_len: usize,
    /// Members reported for a complex network.
    pub complex_network_top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pagerank_damping: 0.85,
            pagerank_max_iterations: 200,
            pagerank_tolerance: 1e-6,

            louvain_seed: 42,
            louvain_max_nodes: 50_000,

            scc_enumeration_limit: 100,
            simple_cycle_min_len: 3,
            simple_cycle_max_len: 8,
            complex_network_top_n: 10,
        }
    }
}
