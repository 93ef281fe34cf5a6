use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeRole {
    Producer,
    User,
    Transit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: i64,
    pub coords: (f64, f64),
    /// Negative for producers, positive for users, zero for transit nodes.
    pub need: f64,
    pub penalty: Option<f64>,
    pub strength: Option<f64>,
    pub functional: bool,
    /// Covered part of the need; `None` in layout mode.
    pub coverage: Option<f64>,
    pub total_costs: Option<f64>,
    pub attributes: BTreeMap<String, String>,
}

impl Node {
    pub fn new(id: i64, x: f64, y: f64, need: f64) -> Self {
        Self {
            id,
            coords: (x, y),
            need,
            penalty: None,
            strength: None,
            functional: true,
            coverage: None,
            total_costs: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn role(&self) -> NodeRole {
        if self.need < 0.0 {
            NodeRole::Producer
        } else if self.need > 0.0 {
            NodeRole::User
        } else {
            NodeRole::Transit
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: usize,
    pub start: i64,
    pub end: i64,
    pub capacity: Option<f64>,
    pub unitcost: Option<f64>,
    pub strength: Option<f64>,
    /// Flow through the edge; `None` in layout mode.
    pub flux: Option<f64>,
    pub functional: bool,
    pub attributes: BTreeMap<String, String>,
}

impl Edge {
    pub fn new(id: usize, start: i64, end: i64) -> Self {
        Self {
            id,
            start,
            end,
            capacity: None,
            unitcost: None,
            strength: None,
            flux: None,
            functional: true,
            attributes: BTreeMap::new(),
        }
    }
}

/// Disabled elements of an attack. Edges are addressed by `(start, end)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attack {
    pub nodes: Vec<i64>,
    pub edges: Vec<(i64, i64)>,
}

/// One flow state: uncovered need and cost per node, flow per edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowConfig {
    pub uncovered: BTreeMap<i64, (f64, f64)>,
    pub flows: BTreeMap<(i64, i64), f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolutionSummary {
    pub attack_loss: f64,
    pub normal_costs: f64,
    pub attack_costs: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Solution {
    pub summary: Option<SolutionSummary>,
    pub before: FlowConfig,
    pub after: FlowConfig,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("unknown node {0}")]
    UnknownNode(i64),
    #[error("unknown edge {start} -> {end}")]
    UnknownEdge { start: i64, end: i64 },
    #[error("duplicate node id {0}")]
    DuplicateNode(i64),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Network {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Network {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>) -> Result<Self, NetworkError> {
        let mut seen = std::collections::BTreeSet::new();
        for node in &nodes {
            if !seen.insert(node.id) {
                return Err(NetworkError::DuplicateNode(node.id));
            }
        }
        Ok(Self { nodes, edges })
    }

    pub fn node_index(&self, id: i64) -> Option<usize> {
        self.nodes.iter().position(|node| node.id == id)
    }

    fn node_mut(&mut self, id: i64) -> Result<&mut Node, NetworkError> {
        self.nodes
            .iter_mut()
            .find(|node| node.id == id)
            .ok_or(NetworkError::UnknownNode(id))
    }

    /// First edge running from `start` to `end`.
    fn edge_mut(&mut self, start: i64, end: i64) -> Result<&mut Edge, NetworkError> {
        self.edges
            .iter_mut()
            .find(|edge| edge.start == start && edge.end == end)
            .ok_or(NetworkError::UnknownEdge { start, end })
    }

    pub fn load_attack(&mut self, attack: &Attack) -> Result<(), NetworkError> {
        for &id in &attack.nodes {
            self.node_mut(id)?.functional = false;
        }
        for &(start, end) in &attack.edges {
            self.edge_mut(start, end)?.functional = false;
        }
        Ok(())
    }

    pub fn reset_functionality(&mut self) {
        self.nodes.iter_mut().for_each(|node| node.functional = true);
        self.edges.iter_mut().for_each(|edge| edge.functional = true);
    }

    /// Switches to solution mode: every need is covered and every edge idle
    /// unless `config` says otherwise.
    pub fn load_config(&mut self, config: &FlowConfig) -> Result<(), NetworkError> {
        for node in &mut self.nodes {
            node.coverage = Some(node.need);
            node.total_costs = None;
        }
        for (&id, &(uncovered, cost)) in &config.uncovered {
            let node = self.node_mut(id)?;
            node.coverage = Some(node.need - uncovered);
            node.total_costs = Some(cost);
        }
        for edge in &mut self.edges {
            edge.flux = Some(0.0);
        }
        for (&(start, end), &flow) in &config.flows {
            self.edge_mut(start, end)?.flux = Some(flow);
        }
        Ok(())
    }

    /// Back to layout mode.
    pub fn clear_flows(&mut self) {
        for node in &mut self.nodes {
            node.coverage = None;
            node.total_costs = None;
        }
        for edge in &mut self.edges {
            edge.flux = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn network() -> Network {
        let nodes = vec![
            Node::new(1, 0.0, 0.0, -10.0),
            Node::new(2, 1.0, 0.0, 4.0),
            Node::new(3, 2.0, 0.0, 0.0),
        ];
        let edges = vec![Edge::new(0, 1, 2), Edge::new(1, 2, 3)];
        Network::new(nodes, edges).unwrap()
    }

    #[test]
    fn roles_follow_need_sign() {
        let net = network();
        assert_eq!(net.nodes[0].role(), NodeRole::Producer);
        assert_eq!(net.nodes[1].role(), NodeRole::User);
        assert_eq!(net.nodes[2].role(), NodeRole::Transit);
    }

    #[test]
    fn attack_and_reset() {
        let mut net = network();
        net.load_attack(&Attack {
            nodes: vec![3],
            edges: vec![(1, 2)],
        })
        .unwrap();
        assert!(!net.nodes[2].functional);
        assert!(!net.edges[0].functional);
        assert!(net.edges[1].functional);
        net.reset_functionality();
        assert!(net.nodes.iter().all(|n| n.functional));
        assert!(net.edges.iter().all(|e| e.functional));
    }

    #[test]
    fn unknown_attack_target_is_an_error() {
        let mut net = network();
        let err = net
            .load_attack(&Attack {
                nodes: vec![],
                edges: vec![(3, 1)],
            })
            .unwrap_err();
        assert_eq!(err, NetworkError::UnknownEdge { start: 3, end: 1 });
    }

    #[test]
    fn config_sets_coverage_and_flux() {
        let mut net = network();
        let mut config = FlowConfig::default();
        config.uncovered.insert(2, (1.5, 30.0));
        config.flows.insert((1, 2), 2.5);
        net.load_config(&config).unwrap();
        assert_eq!(net.nodes[0].coverage, Some(-10.0));
        assert_eq!(net.nodes[1].coverage, Some(2.5));
        assert_eq!(net.nodes[1].total_costs, Some(30.0));
        assert_eq!(net.edges[0].flux, Some(2.5));
        assert_eq!(net.edges[1].flux, Some(0.0));
        net.clear_flows();
        assert_eq!(net.nodes[1].coverage, None);
        assert_eq!(net.edges[0].flux, None);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = Network::new(vec![Node::new(1, 0.0, 0.0, 1.0), Node::new(1, 1.0, 1.0, 1.0)], vec![]).unwrap_err();
        assert_eq!(err, NetworkError::DuplicateNode(1));
    }
}
