//! Weighted PageRank and Louvain community labels (spec §4.3).
//!
//! PageRank follows the adjacency-list-optimized shape of
//! `codegraph-ir`'s `PageRankEngine::compute_pagerank` (build an
//! incoming-adjacency list once, then each iteration is `O(E)` instead
//! of `O(N*E)`), generalized to weight by edge `amount` instead of
//! unweighted link count and to fall back to a uniform distribution on
//! non-convergence or an empty graph, per spec.
//!
//! Louvain has no crate anywhere in this codebase's dependency corpus,
//! so it is hand-rolled here as a standard two-phase (local-moving +
//! aggregation) modularity optimizer with a deterministic node-visit
//! order seeded by [`crate::config::PipelineConfig::louvain_seed`].

use petgraph::graph::NodeIndex;
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::PipelineConfig;
use crate::graph::Graph;

/// `node -> (pagerank, community label)`.
pub struct CentralityResult {
    pub pagerank: HashMap<NodeIndex, f64>,
    pub community: HashMap<NodeIndex, i64>,
}

pub fn compute(graph: &Graph, config: &PipelineConfig) -> CentralityResult {
    let pagerank = compute_pagerank(graph, config);
    let community = compute_community_labels(graph, config);
    CentralityResult { pagerank, community }
}

/// Write a [`CentralityResult`] back onto the graph's accounts.
/// Separate from [`compute`] because PageRank/Louvain only ever read
/// the graph's topology, never an account's existing fields — keeping
/// them `&Graph`-only makes that borrow-safety visible at the type
/// level instead of by convention.
pub fn apply(graph: &mut Graph, result: CentralityResult) {
    for idx in graph.inner.node_indices().collect::<Vec<_>>() {
        let account = &mut graph.inner[idx];
        account.pagerank = result.pagerank.get(&idx).copied().unwrap_or(0.0);
        account.community = result.community.get(&idx).copied().unwrap_or(0);
    }
}

fn compute_pagerank(graph: &Graph, config: &PipelineConfig) -> HashMap<NodeIndex, f64> {
    let n = graph.node_count();
    if n == 0 {
        return HashMap::new();
    }
    let uniform = || graph.inner.node_indices().map(|idx| (idx, 1.0 / n as f64)).collect();

    let damping = config.pagerank_damping;
    let base_score = (1.0 - damping) / n as f64;

    // Weighted out-degree per node (sum of outgoing edge amounts).
    let out_weight: HashMap<NodeIndex, f64> = graph
        .inner
        .node_indices()
        .map(|idx| {
            let w: f64 = graph
                .inner
                .edges_directed(idx, Direction::Outgoing)
                .map(|e| e.weight().amount)
                .sum();
            (idx, w)
        })
        .collect();

    let mut scores: HashMap<NodeIndex, f64> =
        graph.inner.node_indices().map(|idx| (idx, 1.0 / n as f64)).collect();

    let mut converged = false;
    for iteration in 0..config.pagerank_max_iterations {
        let dangling_mass: f64 = graph
            .inner
            .node_indices()
            .filter(|idx| out_weight.get(idx).copied().unwrap_or(0.0) <= 0.0)
            .map(|idx| scores[&idx])
            .sum();

        let mut new_scores = HashMap::with_capacity(n);
        let mut max_delta: f64 = 0.0;

        for idx in graph.inner.node_indices() {
            let incoming_sum: f64 = graph
                .inner
                .edges_directed(idx, Direction::Incoming)
                .map(|e| {
                    let source = e.source();
                    let weight = e.weight().amount;
                    let source_out = out_weight.get(&source).copied().unwrap_or(0.0);
                    if source_out > 0.0 {
                        scores[&source] * (weight / source_out)
                    } else {
                        0.0
                    }
                })
                .sum();

            let new_score = base_score + damping * (incoming_sum + dangling_mass / n as f64);
            max_delta = max_delta.max((new_score - scores[&idx]).abs());
            new_scores.insert(idx, new_score);
        }

        scores = new_scores;
        if max_delta < config.pagerank_tolerance {
            debug!(iterations = iteration + 1, "pagerank converged");
            converged = true;
            break;
        }
    }

    if !converged {
        warn!(nodes = n, "pagerank did not converge, falling back to uniform");
        return uniform();
    }

    scores
}

/// Weighted undirected projection: (a, b) with a < b as a local index
/// pair, summed from both directions of the directed graph.
struct Projection {
    /// adjacency[i] = Vec<(neighbor, weight)>, deduplicated, no self-loops.
    adjacency: Vec<Vec<(usize, f64)>>,
    /// weighted degree per node (sum of incident edge weights).
    degree: Vec<f64>,
    total_weight: f64,
    index_of: Vec<NodeIndex>,
}

fn build_projection(graph: &Graph) -> Projection {
    let indices: Vec<NodeIndex> = graph.inner.node_indices().collect();
    let mut local_of: HashMap<NodeIndex, usize> = HashMap::new();
    for (i, idx) in indices.iter().enumerate() {
        local_of.insert(*idx, i);
    }

    let mut pair_weight: HashMap<(usize, usize), f64> = HashMap::new();
    for edge in graph.inner.edge_references() {
        let a = local_of[&edge.source()];
        let b = local_of[&edge.target()];
        if a == b {
            continue;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        *pair_weight.entry(key).or_insert(0.0) += edge.weight().amount;
    }

    let mut adjacency = vec![Vec::new(); indices.len()];
    let mut degree = vec![0.0; indices.len()];
    let mut total_weight = 0.0;
    for (&(a, b), &w) in &pair_weight {
        adjacency[a].push((b, w));
        adjacency[b].push((a, w));
        degree[a] += w;
        degree[b] += w;
        total_weight += w;
    }

    Projection {
        adjacency,
        degree,
        total_weight,
        index_of: indices,
    }
}

/// Small deterministic LCG so the Louvain node-visit order is
/// reproducible given a fixed seed, without pulling in a `rand` crate
/// dependency solely for this.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = (self.next() as usize) % (i + 1);
            items.swap(i, j);
        }
    }
}

/// One level of local-moving modularity optimization. Returns the
/// community assignment (local node index -> community id) and
/// whether any move improved modularity.
fn local_moving(proj: &Projection, seed: u64) -> (Vec<usize>, bool) {
    let n = proj.adjacency.len();
    let mut community: Vec<usize> = (0..n).collect();
    let mut sigma_tot: Vec<f64> = proj.degree.clone();
    let two_m = (proj.total_weight * 2.0).max(f64::MIN_POSITIVE);

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = Lcg(seed);
    rng.shuffle(&mut order);

    let mut improved_any = false;
    let mut moved = true;
    let mut safety = 0;
    while moved && safety < 50 {
        moved = false;
        safety += 1;
        for &node in &order {
            let k_i = proj.degree[node];
            let current_comm = community[node];

            // Weight from `node` into each neighboring community.
            let mut weight_to_comm: HashMap<usize, f64> = HashMap::new();
            for &(neighbor, w) in &proj.adjacency[node] {
                if neighbor == node {
                    continue;
                }
                *weight_to_comm.entry(community[neighbor]).or_insert(0.0) += w;
            }

            // Remove node from its current community before evaluating gains.
            sigma_tot[current_comm] -= k_i;

            let mut best_comm = current_comm;
            let mut best_gain = weight_to_comm.get(&current_comm).copied().unwrap_or(0.0)
                - sigma_tot[current_comm] * k_i / two_m;

            let mut candidates: Vec<usize> = weight_to_comm.keys().copied().collect();
            candidates.sort_unstable();
            for comm in candidates {
                let gain = weight_to_comm[&comm] - sigma_tot[comm] * k_i / two_m;
                if gain > best_gain + 1e-12 {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            sigma_tot[best_comm] += k_i;
            if best_comm != current_comm {
                community[node] = best_comm;
                moved = true;
                improved_any = true;
            }
        }
    }

    (community, improved_any)
}

/// Collapse communities from one level into super-nodes and build the
/// weighted graph of communities for the next level.
fn aggregate(proj: &Projection, community: &[usize]) -> (Projection, Vec<usize>) {
    let mut relabel: HashMap<usize, usize> = HashMap::new();
    for &c in community {
        let next_id = relabel.len();
        relabel.entry(c).or_insert(next_id);
    }
    let n_super = relabel.len();

    let mut pair_weight: HashMap<(usize, usize), f64> = HashMap::new();
    for (node, adj) in proj.adjacency.iter().enumerate() {
        let a = relabel[&community[node]];
        for &(neighbor, w) in adj {
            let b = relabel[&community[neighbor]];
            let key = if a <= b { (a, b) } else { (b, a) };
            *pair_weight.entry(key).or_insert(0.0) += w / 2.0;
        }
    }

    let mut adjacency = vec![Vec::new(); n_super];
    let mut degree = vec![0.0; n_super];
    let mut total_weight = 0.0;
    for (&(a, b), &w) in &pair_weight {
        if a == b {
            degree[a] += 2.0 * w;
            total_weight += w;
            continue;
        }
        adjacency[a].push((b, w));
        adjacency[b].push((a, w));
        degree[a] += w;
        degree[b] += w;
        total_weight += w;
    }

    let next = Projection {
        adjacency,
        degree,
        total_weight,
        index_of: Vec::new(),
    };
    let mapping: Vec<usize> = community.iter().map(|&c| relabel[&c]).collect();
    (next, mapping)
}

fn louvain_labels(graph: &Graph, config: &PipelineConfig) -> Option<HashMap<NodeIndex, i64>> {
    let proj = build_projection(graph);
    let n = proj.adjacency.len();
    if n == 0 {
        return Some(HashMap::new());
    }
    if proj.total_weight <= 0.0 {
        // No edges survive the undirected projection (shouldn't happen
        // given every node comes from an edge) — one singleton community each.
        let labels = proj
            .index_of
            .iter()
            .enumerate()
            .map(|(i, &idx)| (idx, i as i64))
            .collect();
        return Some(labels);
    }

    // final_community[original local id] tracks the current level's assignment.
    let mut final_community: Vec<usize> = (0..n).collect();
    let mut level = proj;
    let mut seed = config.louvain_seed;
    let max_levels = 20;

    for _ in 0..max_levels {
        let (community, improved) = local_moving(&level, seed);
        seed = seed.wrapping_add(1);
        // Remap final_community through this level's assignment.
        for slot in final_community.iter_mut() {
            *slot = community[*slot];
        }
        if !improved {
            break;
        }
        let (next_level, _mapping) = aggregate(&level, &community);
        if next_level.adjacency.len() == level.adjacency.len() {
            break;
        }
        level = next_level;
    }

    Some(proj_index_of_community(graph, &final_community))
}

fn proj_index_of_community(graph: &Graph, final_community: &[usize]) -> HashMap<NodeIndex, i64> {
    graph
        .inner
        .node_indices()
        .enumerate()
        .map(|(i, idx)| (idx, final_community[i] as i64))
        .collect()
}

/// Weakly-connected-component fallback: one unique integer label per
/// component, via plain BFS over the undirected projection.
fn weakly_connected_components(graph: &Graph) -> HashMap<NodeIndex, i64> {
    let mut labels = HashMap::new();
    let mut next_label: i64 = 0;
    for start in graph.inner.node_indices() {
        if labels.contains_key(&start) {
            continue;
        }
        let mut queue = std::collections::VecDeque::new();
        queue.push_back(start);
        labels.insert(start, next_label);
        while let Some(node) = queue.pop_front() {
            let neighbors = graph
                .inner
                .edges_directed(node, Direction::Outgoing)
                .map(|e| e.target())
                .chain(graph.inner.edges_directed(node, Direction::Incoming).map(|e| e.source()));
            for neighbor in neighbors {
                if !labels.contains_key(&neighbor) {
                    labels.insert(neighbor, next_label);
                    queue.push_back(neighbor);
                }
            }
        }
        next_label += 1;
    }
    labels
}

fn compute_community_labels(graph: &Graph, config: &PipelineConfig) -> HashMap<NodeIndex, i64> {
    if graph.node_count() == 0 {
        return HashMap::new();
    }
    if graph.node_count() >= config.louvain_max_nodes {
        warn!(
            nodes = graph.node_count(),
            "graph too large for louvain, falling back to weakly connected components"
        );
        return weakly_connected_components(graph);
    }
    match louvain_labels(graph, config) {
        Some(labels) => labels,
        None => weakly_connected_components(graph),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::CleanTransaction;

    fn txn(source: &str, target: &str, amount: f64) -> CleanTransaction {
        CleanTransaction {
            source: source.to_string(),
            target: target.to_string(),
            amount,
            timestamp: None,
        }
    }

    #[test]
    fn empty_graph_yields_empty_pagerank() {
        let graph = Graph::build(&[]);
        let config = PipelineConfig::default();
        let result = compute(&graph, &config);
        assert!(result.pagerank.is_empty());
    }

    #[test]
    fn pagerank_sums_close_to_one() {
        let graph = Graph::build(&[
            txn("A", "B", 1000.0),
            txn("B", "C", 1000.0),
            txn("C", "A", 1000.0),
        ]);
        let config = PipelineConfig::default();
        let result = compute(&graph, &config);
        let total: f64 = result.pagerank.values().sum();
        assert!((total - 1.0).abs() < 1e-3, "total = {total}");
    }

    #[test]
    fn two_disjoint_pairs_get_different_community_labels() {
        let graph = Graph::build(&[txn("A", "B", 100.0), txn("C", "D", 100.0)]);
        let config = PipelineConfig::default();
        let result = compute(&graph, &config);
        let a = graph.node_index("A").unwrap();
        let c = graph.node_index("C").unwrap();
        assert_ne!(result.community[&a], result.community[&c]);
    }

    #[test]
    fn large_graph_falls_back_to_weakly_connected_components() {
        let mut config = PipelineConfig::default();
        config.louvain_max_nodes = 2;
        let graph = Graph::build(&[txn("A", "B", 1.0), txn("C", "D", 1.0), txn("D", "E", 1.0)]);
        let labels = compute_community_labels(&graph, &config);
        let a = graph.node_index("A").unwrap();
        let b = graph.node_index("B").unwrap();
        assert_eq!(labels[&a], labels[&b]);
    }
}
