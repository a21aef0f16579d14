//! Bellman-Ford negative-cycle detection over log-rates.
//!
//! Independent cross-check for [`crate::cycles`]: each edge `a → b` is
//! weighted `-ln(rate(a, b))`, so a loop whose rate product exceeds one has a
//! negative total weight:
//!
//! ```text
//! Σ -ln(r_i) < 0  ⇔  ln(Π r_i) > 0  ⇔  Π r_i > 1
//! ```
//!
//! ## Two passes
//!
//! 1. **Full graph.** Bellman-Ford from every instrument in turn over the
//!    complete directed graph. Every edge that still relaxes in the extra
//!    round is an *indicator*; the same loop is normally seen from several
//!    sources, so the indicator count corroborates but does not deduplicate.
//!    Loops recovered by predecessor chasing are deduplicated separately and
//!    may have any length.
//! 2. **Triangle rings.** The same routine on each directed three-node ring in
//!    isolation gives one verdict per triangular loop, which is what
//!    [`corroborate`] compares against the cycle evaluator.
//!
//! Relaxation in the extra round must beat [`RELAXATION_TOLERANCE`] so that
//! rounding noise in the log domain does not flag an arbitrage-free table.

use std::collections::{BTreeMap, BTreeSet};

use arb_data::Instrument;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::debug;

use crate::cycles::{canonical_rotation, CycleResult, Leg};
use crate::rate_table::RateTable;

/// Minimum distance improvement in the extra round that counts as a negative cycle.
pub const RELAXATION_TOLERANCE: f64 = 1e-10;

/// Log-rate graph; node weights are [`RateTable`] positions.
pub type LogRateGraph = DiGraph<usize, f64>;

/// One edge that still relaxed in the extra round from one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NegativeCycleIndicator {
    /// Source instrument of the Bellman-Ford run.
    pub source: Instrument,
    pub from: Instrument,
    pub to: Instrument,
    /// How much the edge would still shorten the distance to `to`.
    pub improvement: f64,
}

/// A recovered loop with negative total log weight.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NegativeCycleFinding {
    /// Loop order, rotated so the smallest identifier comes first.
    pub instruments: Vec<Instrument>,
    /// Legs in traversal order, closing back on the first instrument.
    pub legs: Vec<Leg>,
    /// Sum of `-ln(rate)` around the loop; always negative.
    pub total_weight: f64,
    /// Rate product around the loop, recomputed from the legs.
    pub product: f64,
    /// `product - 1`.
    pub profit_fraction: f64,
    /// Source instruments whose runs recovered this loop.
    pub sources: Vec<Instrument>,
}

/// Everything the detector found over one table.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NegativeCycleScan {
    /// Raw extra-round relaxations, one per (source, edge); not deduplicated.
    pub indicators: Vec<NegativeCycleIndicator>,
    /// Distinct loops recovered from the full graph.
    pub cycles: Vec<NegativeCycleFinding>,
    /// Directed triangles whose isolated ring has a negative cycle.
    pub triangles: Vec<NegativeCycleFinding>,
    /// Number of Bellman-Ford sources run on the full graph.
    pub sources_scanned: usize,
}

impl NegativeCycleScan {
    /// Corroborating count of indicators across all sources.
    pub fn indicator_count(&self) -> usize {
        self.indicators.len()
    }
}

/// Agreement between the cycle evaluator and the triangle-ring detector.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Corroboration {
    /// Profitable triangles both sides report.
    pub agreed: Vec<[Instrument; 3]>,
    /// Profitable for the evaluator, not flagged by the detector.
    pub evaluator_only: Vec<[Instrument; 3]>,
    /// Flagged by the detector, not profitable for the evaluator.
    pub detector_only: Vec<[Instrument; 3]>,
    /// Profitable for the evaluator only by rounding noise:
    /// `|ln product| <= RELAXATION_TOLERANCE`. The detector cannot see these
    /// loops, so they do not count as disagreement.
    pub within_tolerance: Vec<[Instrument; 3]>,
}

impl Corroboration {
    /// True when both sides report the same triangles outside the tolerance band.
    pub fn is_consistent(&self) -> bool {
        self.evaluator_only.is_empty() && self.detector_only.is_empty()
    }
}

/// Outcome of one Bellman-Ford run.
struct Relaxation {
    /// Predecessor per node after the extra round's relaxations were applied.
    pred: Vec<Option<usize>>,
    /// `(from, to, improvement)` for edges still relaxing in the extra round.
    still_relaxing: Vec<(usize, usize, f64)>,
}

/// Builds the complete log-rate graph; node `i` is table position `i`.
pub fn build_log_graph(table: &RateTable) -> LogRateGraph {
    let n = table.len();
    let mut graph = DiGraph::with_capacity(n, n * n.saturating_sub(1));
    let nodes: Vec<NodeIndex> = (0..n).map(|ix| graph.add_node(ix)).collect();

    for from in 0..n {
        for to in 0..n {
            if from != to {
                graph.add_edge(nodes[from], nodes[to], -table.rate_at(from, to).ln());
            }
        }
    }

    graph
}

/// Runs the full-graph and triangle-ring passes over `table`.
///
/// Fewer than three instruments yields an empty scan.
pub fn detect_negative_cycles(table: &RateTable) -> NegativeCycleScan {
    let n = table.len();
    if n < 3 {
        debug!(instruments = n, "too few instruments for a triangular cycle");
        return NegativeCycleScan::default();
    }

    let graph = build_log_graph(table);
    let mut indicators = Vec::new();
    let mut found: BTreeMap<Vec<Instrument>, NegativeCycleFinding> = BTreeMap::new();

    for source in 0..n {
        let source_instrument = table.instrument(source);
        let relaxation = bellman_ford(&graph, NodeIndex::new(source));

        for &(from, to, improvement) in &relaxation.still_relaxing {
            indicators.push(NegativeCycleIndicator {
                source: source_instrument.clone(),
                from: table.instrument(graph[NodeIndex::new(from)]).clone(),
                to: table.instrument(graph[NodeIndex::new(to)]).clone(),
                improvement,
            });
        }

        let targets: BTreeSet<usize> = relaxation
            .still_relaxing
            .iter()
            .map(|&(_, to, _)| to)
            .collect();
        for target in targets {
            let Some(nodes) = trace_cycle(&relaxation.pred, target) else {
                continue;
            };
            let positions: Vec<usize> = nodes
                .iter()
                .map(|&node| graph[NodeIndex::new(node)])
                .collect();
            let Some(finding) = finding_from_positions(table, &positions) else {
                debug!(?positions, "traced loop is not negative beyond tolerance");
                continue;
            };

            let entry = found
                .entry(finding.instruments.clone())
                .or_insert(finding);
            if !entry.sources.contains(source_instrument) {
                entry.sources.push(source_instrument.clone());
            }
        }

        debug!(
            source = %source_instrument,
            indicators = relaxation.still_relaxing.len(),
            "bellman-ford source scanned"
        );
    }

    let triangles = profitable_triangles(table);
    let scan = NegativeCycleScan {
        indicators,
        cycles: found.into_values().collect(),
        triangles,
        sources_scanned: n,
    };

    debug!(
        indicators = scan.indicator_count(),
        cycles = scan.cycles.len(),
        triangles = scan.triangles.len(),
        "negative cycle scan complete"
    );

    scan
}

/// Directed triangles whose isolated three-node ring contains a negative cycle.
///
/// Enumerates the same canonical loops as [`crate::cycles::evaluate_cycles`]
/// and runs Bellman-Ford on each ring on its own, sorted by canonical order.
pub fn profitable_triangles(table: &RateTable) -> Vec<NegativeCycleFinding> {
    let n = table.len();
    let mut triangles = Vec::new();

    for i in 0..n {
        for j in 0..n {
            for k in 0..n {
                if i == j || j == k || k == i {
                    continue;
                }
                let first = table.instrument(i);
                if first > table.instrument(j) || first > table.instrument(k) {
                    continue;
                }

                let mut ring = DiGraph::with_capacity(3, 3);
                let a = ring.add_node(i);
                let b = ring.add_node(j);
                let c = ring.add_node(k);
                ring.add_edge(a, b, -table.rate_at(i, j).ln());
                ring.add_edge(b, c, -table.rate_at(j, k).ln());
                ring.add_edge(c, a, -table.rate_at(k, i).ln());

                let relaxation = bellman_ford(&ring, a);
                let Some(&(_, target, _)) = relaxation.still_relaxing.first() else {
                    continue;
                };
                let Some(nodes) = trace_cycle(&relaxation.pred, target) else {
                    continue;
                };
                let positions: Vec<usize> = nodes
                    .iter()
                    .map(|&node| ring[NodeIndex::new(node)])
                    .collect();
                if let Some(mut finding) = finding_from_positions(table, &positions) {
                    finding.sources.push(first.clone());
                    triangles.push(finding);
                }
            }
        }
    }

    triangles.sort_by(|lhs, rhs| lhs.instruments.cmp(&rhs.instruments));
    triangles
}

/// Compares evaluator opportunities with detector triangles.
pub fn corroborate(cycles: &[CycleResult], triangles: &[NegativeCycleFinding]) -> Corroboration {
    let evaluator: BTreeMap<[Instrument; 3], f64> = cycles
        .iter()
        .filter(|cycle| cycle.is_opportunity())
        .map(|cycle| (cycle.instruments.clone(), cycle.product))
        .collect();
    let detector: BTreeSet<[Instrument; 3]> = triangles
        .iter()
        .filter_map(|finding| match finding.instruments.as_slice() {
            [a, b, c] => Some([a.clone(), b.clone(), c.clone()]),
            _ => None,
        })
        .collect();

    let mut check = Corroboration::default();
    for (instruments, product) in &evaluator {
        if detector.contains(instruments) {
            check.agreed.push(instruments.clone());
        } else if product.ln().abs() <= RELAXATION_TOLERANCE {
            check.within_tolerance.push(instruments.clone());
        } else {
            check.evaluator_only.push(instruments.clone());
        }
    }
    check.detector_only = detector
        .into_iter()
        .filter(|instruments| !evaluator.contains_key(instruments))
        .collect();
    check
}

/// Bellman-Ford from `source`: `|V| - 1` relaxation rounds plus one check round.
fn bellman_ford(graph: &LogRateGraph, source: NodeIndex) -> Relaxation {
    let n = graph.node_count();
    let mut dist = vec![f64::INFINITY; n];
    let mut pred: Vec<Option<usize>> = vec![None; n];
    dist[source.index()] = 0.0;

    for _ in 1..n {
        let mut changed = false;
        for edge in graph.edge_references() {
            let (u, v) = (edge.source().index(), edge.target().index());
            let candidate = dist[u] + *edge.weight();
            if candidate < dist[v] {
                dist[v] = candidate;
                pred[v] = Some(u);
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    // Check round against frozen distances; the best relaxing edge per
    // target becomes its predecessor for cycle recovery.
    let mut still_relaxing = Vec::new();
    let mut best: Vec<Option<(usize, f64)>> = vec![None; n];
    for edge in graph.edge_references() {
        let (u, v) = (edge.source().index(), edge.target().index());
        let candidate = dist[u] + *edge.weight();
        if candidate < dist[v] - RELAXATION_TOLERANCE {
            still_relaxing.push((u, v, dist[v] - candidate));
            if best[v].map_or(true, |(_, current)| candidate < current) {
                best[v] = Some((u, candidate));
            }
        }
    }
    for (v, entry) in best.into_iter().enumerate() {
        if let Some((u, _)) = entry {
            pred[v] = Some(u);
        }
    }

    Relaxation {
        pred,
        still_relaxing,
    }
}

/// Follows predecessors back from `start` until a node repeats.
///
/// Returns the repeated segment in forward traversal order, or `None` if the
/// chain reaches a node without a predecessor first.
fn trace_cycle(pred: &[Option<usize>], start: usize) -> Option<Vec<usize>> {
    let mut trail_position: Vec<Option<usize>> = vec![None; pred.len()];
    let mut trail = Vec::with_capacity(pred.len());
    let mut node = start;

    loop {
        if let Some(position) = trail_position[node] {
            let mut cycle = trail[position..].to_vec();
            cycle.reverse();
            return Some(cycle);
        }
        trail_position[node] = Some(trail.len());
        trail.push(node);
        node = pred[node]?;
    }
}

/// Builds a canonical finding from table positions, if the loop is negative.
fn finding_from_positions(table: &RateTable, positions: &[usize]) -> Option<NegativeCycleFinding> {
    if positions.len() < 2 {
        return None;
    }

    let keyed: Vec<(Instrument, usize)> = positions
        .iter()
        .map(|&ix| (table.instrument(ix).clone(), ix))
        .collect();
    let canonical = canonical_rotation(&keyed);

    let legs: Vec<Leg> = canonical
        .iter()
        .zip(canonical.iter().cycle().skip(1))
        .map(|((from, i), (to, j))| Leg {
            from: from.clone(),
            to: to.clone(),
            rate: table.rate_at(*i, *j),
        })
        .collect();

    let total_weight: f64 = legs.iter().map(|leg| -leg.rate.ln()).sum();
    if total_weight >= -RELAXATION_TOLERANCE {
        return None;
    }
    let product: f64 = legs.iter().map(|leg| leg.rate).product();

    Some(NegativeCycleFinding {
        instruments: canonical.into_iter().map(|(instrument, _)| instrument).collect(),
        legs,
        total_weight,
        product,
        profit_fraction: product - 1.0,
        sources: Vec::new(),
    })
}
