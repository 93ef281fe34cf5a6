use serde::Serialize;

use crate::ir::NodeRole;

use super::geometry::Point;
use super::graph::Segment;
use super::routing::RoutingReport;

#[derive(Debug, Clone, Serialize)]
pub struct NodeLayout {
    pub id: i64,
    /// Centre on the unit canvas.
    pub center: Point,
    pub radius: f64,
    pub role: NodeRole,
    pub need: f64,
    pub penalty: Option<f64>,
    pub coverage: Option<f64>,
    pub total_costs: Option<f64>,
    pub functional: bool,
}

impl NodeLayout {
    /// Radius actually drawn: transit nodes are shrunk.
    pub fn drawn_radius(&self, transit_fraction: f64) -> f64 {
        if self.role == NodeRole::Transit {
            self.radius / transit_fraction
        } else {
            self.radius
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgeLayout {
    pub id: usize,
    pub start: i64,
    pub end: i64,
    /// Contiguous polyline from the start node to the end node.
    pub segments: Vec<Segment>,
    pub label_anchor: Point,
    pub capacity: Option<f64>,
    pub flux: Option<f64>,
    pub functional: bool,
}

impl EdgeLayout {
    pub fn points(&self) -> Vec<Point> {
        let mut points = Vec::with_capacity(self.segments.len() + 1);
        if let Some(first) = self.segments.first() {
            points.push(first.start);
        }
        points.extend(self.segments.iter().map(|segment| segment.end));
        points
    }
}

/// Final state of the auxiliary routing graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RoutingSnapshot {
    pub fixed_count: usize,
    pub positions: Vec<Point>,
    pub edges: Vec<(usize, usize, f64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    /// Reference node radius on the unit canvas.
    pub node_size: f64,
    /// Proximity threshold used by the router.
    pub limit_dist: f64,
    pub nodes: Vec<NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    /// `None` when routing was switched off.
    pub routing: Option<RoutingReport>,
    #[serde(skip)]
    pub snapshot: Option<RoutingSnapshot>,
}
