use std::collections::BTreeSet;

use log::{debug, warn};
use serde::Serialize;

use crate::config::RoutingConfig;

use super::error::LayoutError;
use super::geometry::Point;
use super::graph::{Chain, GraphWeights, RoutingGraph, Segment};
use super::proximity::{Proximity, check_proximity};
use super::relax::{RelaxParams, relax};
use super::types::RoutingSnapshot;

/// Proximity threshold in units of the canvas node size.
const LIMIT_DIST_NODE_RATIO: f64 = 1.5;

/// Concrete parameters of one routing computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoutingParams {
    /// Cap on scan/relax cycles.
    pub max_segments: usize,
    pub attractor: f64,
    pub path_attractor: f64,
    pub avg_dist: f64,
    pub iterations: usize,
    /// Absolute proximity threshold in layout coordinates.
    pub limit_dist: f64,
    pub minimal_control: bool,
    pub canvas_scale: f64,
}

impl RoutingParams {
    pub fn from_config(config: &RoutingConfig, node_size: f64) -> Self {
        Self {
            max_segments: config.max_segments,
            attractor: config.attractor,
            path_attractor: config.path_attractor,
            avg_dist: config.avg_dist,
            iterations: config.iterations,
            limit_dist: config.limit_dist_scale * LIMIT_DIST_NODE_RATIO * node_size,
            minimal_control: config.minimal_control,
            canvas_scale: config.canvas_scale,
        }
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let positive = [
            ("avg_dist", self.avg_dist),
            ("canvas_scale", self.canvas_scale),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(LayoutError::InvalidParameter { name, value });
            }
        }
        let non_negative = [
            ("attractor", self.attractor),
            ("path_attractor", self.path_attractor),
            ("limit_dist", self.limit_dist),
        ];
        for (name, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(LayoutError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }
}

impl Default for RoutingParams {
    fn default() -> Self {
        Self::from_config(&RoutingConfig::default(), 0.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RoutingState {
    Scanning,
    Relaxing,
    Subdividing,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingReport {
    /// Completed proximity scans that were allowed to insert waypoints.
    pub scans: usize,
    pub relaxations: usize,
    pub cycles: usize,
    pub waypoints: usize,
    /// The cycle cap stopped routing while segments were still too close to
    /// unrelated nodes.
    pub budget_exhausted: bool,
    /// Per completed scan, the edges that received a waypoint.
    pub insertions: Vec<Vec<usize>>,
}

#[derive(Debug, Clone)]
pub struct RoutedEdges {
    pub segments: Vec<Vec<Segment>>,
    pub report: RoutingReport,
    pub snapshot: RoutingSnapshot,
}

/// Iterative detour router: scan, insert waypoints, relax, subdivide.
#[derive(Debug, Clone)]
pub struct EdgeRouter {
    params: RoutingParams,
    graph: RoutingGraph,
    chains: Vec<Chain>,
    state: RoutingState,
    report: RoutingReport,
}

impl EdgeRouter {
    pub fn new(nodes: &[Point], edges: &[(usize, usize)], params: RoutingParams) -> Result<Self, LayoutError> {
        params.validate()?;
        if nodes.is_empty() {
            return Err(LayoutError::EmptyNetwork);
        }
        let non_finite = nodes
            .iter()
            .enumerate()
            .find(|(_, point)| !(point.x.is_finite() && point.y.is_finite()));
        if let Some((idx, point)) = non_finite {
            return Err(LayoutError::NonFiniteCoordinate {
                node: idx as i64,
                x: point.x,
                y: point.y,
            });
        }
        let mut chains = Vec::with_capacity(edges.len());
        for (idx, &(start, end)) in edges.iter().enumerate() {
            for node in [start, end] {
                if node >= nodes.len() {
                    return Err(LayoutError::UnknownNode {
                        edge: idx,
                        node: node as i64,
                    });
                }
            }
            let (from, to) = (nodes[start], nodes[end]);
            if from == to {
                return Err(LayoutError::ZeroLengthEdge {
                    edge: idx,
                    start: start as i64,
                    end: end as i64,
                    x: from.x,
                    y: from.y,
                });
            }
            chains.push(Chain::straight(start, end, from, to));
        }

        let mut graph = RoutingGraph::new(GraphWeights {
            attractor: params.attractor,
            path_attractor: params.path_attractor,
            minimal_control: params.minimal_control,
        });
        graph.add_fixed_nodes(nodes);

        Ok(Self {
            params,
            graph,
            chains,
            state: RoutingState::Scanning,
            report: RoutingReport::default(),
        })
    }

    pub fn state(&self) -> RoutingState {
        self.state
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn graph(&self) -> &RoutingGraph {
        &self.graph
    }

    pub fn report(&self) -> &RoutingReport {
        &self.report
    }

    /// Performs the work of the current state and returns the next one.
    pub fn step(&mut self) -> RoutingState {
        self.state = match self.state {
            RoutingState::Scanning => {
                if self.report.cycles >= self.params.max_segments {
                    self.report.budget_exhausted = self.has_violations();
                    if self.report.budget_exhausted {
                        warn!(
                            "edge routing stopped after {} cycles with segments still crossing nodes",
                            self.report.cycles
                        );
                    }
                    RoutingState::Done
                } else {
                    let hits = self.scan();
                    self.report.scans += 1;
                    if hits.is_empty() {
                        RoutingState::Done
                    } else {
                        self.report.waypoints += hits.len();
                        self.report.insertions.push(hits);
                        RoutingState::Relaxing
                    }
                }
            }
            RoutingState::Relaxing => {
                self.relax();
                RoutingState::Subdividing
            }
            RoutingState::Subdividing => {
                self.subdivide();
                self.report.cycles += 1;
                RoutingState::Scanning
            }
            RoutingState::Done => RoutingState::Done,
        };
        self.state
    }

    pub fn run(mut self) -> RoutedEdges {
        while self.step() != RoutingState::Done {}
        let snapshot = RoutingSnapshot {
            fixed_count: self.graph.fixed_count(),
            positions: self.graph.positions().to_vec(),
            edges: self.graph.edges().collect(),
        };
        RoutedEdges {
            segments: self.chains.iter().map(Chain::segments).collect(),
            report: self.report,
            snapshot,
        }
    }

    /// Inserts at most one waypoint per edge. Returns the edges that got one.
    fn scan(&mut self) -> Vec<usize> {
        let mut hits = Vec::new();
        for edge in 0..self.chains.len() {
            let Some((link, hit, blocking)) = find_hit(&self.chains[edge], &self.graph, self.params.limit_dist)
            else {
                continue;
            };
            let id = self.graph.insert_waypoint(&mut self.chains[edge], link, hit.waypoint, blocking);
            debug!(
                "cycle {}: edge {edge} segment {link} passes node {blocking} at {:.5}, waypoint {id} at ({}, {})",
                self.report.cycles, hit.ortho, hit.waypoint.x, hit.waypoint.y
            );
            hits.push(edge);
        }
        hits
    }

    fn has_violations(&self) -> bool {
        self.chains
            .iter()
            .any(|chain| find_hit(chain, &self.graph, self.params.limit_dist).is_some())
    }

    fn relax(&mut self) {
        let pinned: BTreeSet<usize> = (0..self.graph.fixed_count()).collect();
        let params = RelaxParams {
            avg_dist: self.params.avg_dist,
            iterations: self.params.iterations,
            canvas_scale: self.params.canvas_scale,
        };
        let moved = relax(&self.graph, &pinned, &params);
        debug!(
            "cycle {}: relaxed {} waypoints over {} graph edges",
            self.report.cycles,
            moved.len(),
            self.graph.edge_count()
        );
        for (id, point) in moved {
            self.graph.set_position(id, point);
        }
        self.report.relaxations += 1;
    }

    /// Rewrites every link from the relaxed positions. Links were already
    /// split at insertion time, so one pass settles the pending waypoints.
    fn subdivide(&mut self) {
        for chain in &mut self.chains {
            for link in &mut chain.links {
                link.pending_waypoint = None;
                let (from, to) = link.endpoints;
                link.segment = Segment::new(self.graph.position(from), self.graph.position(to));
            }
        }
    }
}

/// First link of `chain` that passes too close to an unrelated fixed node.
/// Among several nodes near the same link the one with the smallest
/// perpendicular distance wins, then the lowest id.
fn find_hit(chain: &Chain, graph: &RoutingGraph, limit_dist: f64) -> Option<(usize, Proximity, usize)> {
    for (idx, link) in chain.links.iter().enumerate() {
        let (from, to) = link.endpoints;
        let mut best: Option<(Proximity, usize)> = None;
        for node in 0..graph.fixed_count() {
            if node == from || node == to {
                continue;
            }
            let Some(hit) = check_proximity(link.segment.start, link.segment.end, graph.position(node), limit_dist)
            else {
                continue;
            };
            if best.is_none_or(|(current, _)| hit.ortho < current.ortho) {
                best = Some((hit, node));
            }
        }
        if let Some((hit, node)) = best {
            return Some((idx, hit, node));
        }
    }
    None
}

/// Routes every edge around the fixed nodes it passes too closely.
pub fn route_edges(
    nodes: &[Point],
    edges: &[(usize, usize)],
    params: RoutingParams,
) -> Result<RoutedEdges, LayoutError> {
    Ok(EdgeRouter::new(nodes, edges, params)?.run())
}
