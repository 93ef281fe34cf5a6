use std::collections::BTreeMap;

use serde::Serialize;

use super::geometry::Point;

/// One straight piece of a routed edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }
}

/// A segment together with the routing-graph nodes bounding it.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub segment: Segment,
    pub endpoints: (usize, usize),
    /// Waypoint inserted into this link during the current cycle and not yet
    /// materialised from relaxed coordinates.
    pub pending_waypoint: Option<usize>,
}

/// The ordered links of one logical edge. Consecutive links share an
/// endpoint; the first starts at `start`, the last ends at `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub start: usize,
    pub end: usize,
    pub links: Vec<Link>,
}

impl Chain {
    pub fn straight(start: usize, end: usize, from: Point, to: Point) -> Self {
        Self {
            start,
            end,
            links: vec![Link {
                segment: Segment::new(from, to),
                endpoints: (start, end),
                pending_waypoint: None,
            }],
        }
    }

    pub fn segments(&self) -> Vec<Segment> {
        self.links.iter().map(|link| link.segment).collect()
    }

    #[cfg(test)]
    pub(crate) fn assert_contiguous(&self) {
        let first = self.links.first().expect("chain without links");
        let last = self.links.last().expect("chain without links");
        assert_eq!(first.endpoints.0, self.start);
        assert_eq!(last.endpoints.1, self.end);
        for pair in self.links.windows(2) {
            assert_eq!(pair[0].endpoints.1, pair[1].endpoints.0);
            assert_eq!(pair[0].segment.end, pair[1].segment.start);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphWeights {
    pub attractor: f64,
    pub path_attractor: f64,
    pub minimal_control: bool,
}

/// Weighted undirected graph over fixed nodes and waypoints.
///
/// Nodes live in an arena indexed by their stable id: ids below
/// `fixed_count` are fixed network nodes, the rest are waypoints allocated in
/// insertion order. Edges are stored once per unordered pair.
#[derive(Debug, Clone)]
pub struct RoutingGraph {
    positions: Vec<Point>,
    fixed_count: usize,
    edges: BTreeMap<(usize, usize), f64>,
    weights: GraphWeights,
}

fn pair(a: usize, b: usize) -> (usize, usize) {
    if a <= b { (a, b) } else { (b, a) }
}

impl RoutingGraph {
    pub fn new(weights: GraphWeights) -> Self {
        Self {
            positions: Vec::new(),
            fixed_count: 0,
            edges: BTreeMap::new(),
            weights,
        }
    }

    /// Seeds the graph with the fixed nodes. Without minimal control every
    /// pair of fixed nodes is joined by an attraction edge.
    pub fn add_fixed_nodes(&mut self, points: &[Point]) {
        debug_assert!(self.positions.len() == self.fixed_count, "fixed nodes after waypoints");
        let first = self.positions.len();
        self.positions.extend_from_slice(points);
        self.fixed_count = self.positions.len();
        if self.weights.minimal_control {
            return;
        }
        for k in first..self.fixed_count {
            for j in 0..k {
                self.edges.insert((j, k), self.weights.attractor);
            }
        }
    }

    /// Splits `chain.links[link_index]` at a new waypoint placed at `point`
    /// and returns the waypoint id.
    pub fn insert_waypoint(&mut self, chain: &mut Chain, link_index: usize, point: Point, blocking: usize) -> usize {
        let id = self.positions.len();
        self.positions.push(point);

        let old = chain.links[link_index].clone();
        let (from, to) = old.endpoints;
        self.edges.remove(&pair(from, to));

        chain.links[link_index] = Link {
            segment: Segment::new(old.segment.start, point),
            endpoints: (from, id),
            pending_waypoint: Some(id),
        };
        chain.links.insert(
            link_index + 1,
            Link {
                segment: Segment::new(point, old.segment.end),
                endpoints: (id, to),
                pending_waypoint: None,
            },
        );

        self.edges.insert(pair(blocking, id), self.weights.attractor);
        if !self.weights.minimal_control {
            for fixed in 0..self.fixed_count {
                if fixed != blocking {
                    self.edges.insert(pair(fixed, id), self.weights.attractor);
                }
            }
        }
        self.reweight_chain(chain);
        id
    }

    /// Sets every link of `chain` to `path_attractor / max(1, links - 1)`.
    pub fn reweight_chain(&mut self, chain: &Chain) {
        let divisor = chain.links.len().saturating_sub(1).max(1) as f64;
        let weight = self.weights.path_attractor / divisor;
        for link in &chain.links {
            let (a, b) = link.endpoints;
            self.edges.insert(pair(a, b), weight);
        }
    }

    pub fn position(&self, id: usize) -> Point {
        self.positions[id]
    }

    pub fn positions(&self) -> &[Point] {
        &self.positions
    }

    pub fn set_position(&mut self, id: usize, point: Point) {
        self.positions[id] = point;
    }

    pub fn fixed_count(&self) -> usize {
        self.fixed_count
    }

    pub fn node_count(&self) -> usize {
        self.positions.len()
    }

    pub fn waypoint_count(&self) -> usize {
        self.positions.len() - self.fixed_count
    }

    pub fn weight(&self, a: usize, b: usize) -> Option<f64> {
        self.edges.get(&pair(a, b)).copied()
    }

    /// Edges as `(a, b, weight)` with `a < b`, in ascending order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.edges.iter().map(|(&(a, b), &w)| (a, b, w))
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(minimal_control: bool) -> GraphWeights {
        GraphWeights {
            attractor: 16.0,
            path_attractor: 100.0,
            minimal_control,
        }
    }

    fn line() -> (RoutingGraph, Chain) {
        let mut graph = RoutingGraph::new(weights(true));
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0)];
        graph.add_fixed_nodes(&points);
        let chain = Chain::straight(0, 2, points[0], points[2]);
        (graph, chain)
    }

    #[test]
    fn minimal_control_seeds_no_edges() {
        let (graph, _) = line();
        assert_eq!(graph.fixed_count(), 3);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn broad_control_connects_all_fixed_pairs() {
        let mut graph = RoutingGraph::new(weights(false));
        graph.add_fixed_nodes(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.0, 1.0), Point::new(1.0, 1.0)]);
        assert_eq!(graph.edge_count(), 6);
        assert_eq!(graph.weight(3, 0), Some(16.0));
    }

    #[test]
    fn insert_splits_link_and_keeps_lists_aligned() {
        let (mut graph, mut chain) = line();
        let id = graph.insert_waypoint(&mut chain, 0, Point::new(5.0, 0.0), 1);
        assert_eq!(id, 3);
        assert_eq!(chain.links.len(), 2);
        assert_eq!(chain.links[0].endpoints, (0, 3));
        assert_eq!(chain.links[1].endpoints, (3, 2));
        assert_eq!(chain.links[0].pending_waypoint, Some(3));
        chain.assert_contiguous();
        assert_eq!(graph.weight(1, 3), Some(16.0));
        assert_eq!(graph.weight(0, 3), Some(100.0));
        assert_eq!(graph.weight(3, 2), Some(100.0));
        assert_eq!(graph.weight(0, 2), None);
        assert_eq!(graph.waypoint_count(), 1);
    }

    #[test]
    fn longer_chains_get_softer_links() {
        let (mut graph, mut chain) = line();
        graph.insert_waypoint(&mut chain, 0, Point::new(5.0, 0.0), 1);
        let second = graph.insert_waypoint(&mut chain, 1, Point::new(7.0, 1.0), 1);
        assert_eq!(chain.links.len(), 3);
        chain.assert_contiguous();
        assert_eq!(graph.weight(3, second), Some(50.0));
        assert_eq!(graph.weight(second, 2), Some(50.0));
        assert_eq!(graph.weight(0, 3), Some(50.0));
        // the split link (3, 2) was replaced
        assert_eq!(graph.edges().filter(|&(_, _, w)| w == 50.0).count(), 3);
    }

    #[test]
    fn broad_control_attracts_waypoint_to_every_fixed_node() {
        let mut graph = RoutingGraph::new(weights(false));
        let points = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 5.0)];
        graph.add_fixed_nodes(&points);
        let mut chain = Chain::straight(0, 2, points[0], points[2]);
        let id = graph.insert_waypoint(&mut chain, 0, Point::new(5.0, 0.0), 1);
        assert_eq!(graph.weight(id, 3), Some(16.0));
        assert_eq!(graph.weight(id, 1), Some(16.0));
        // chain links override the plain attraction to the chain's own terminals
        assert_eq!(graph.weight(id, 0), Some(100.0));
        assert_eq!(graph.weight(0, 2), None);
    }
}
