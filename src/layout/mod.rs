mod canvas;
mod error;
pub mod geometry;
pub mod graph;
pub mod proximity;
pub mod relax;
pub mod routing;
pub(crate) mod types;
pub use canvas::{Canvas, node_size_for};
pub use error::LayoutError;
pub use geometry::Point;
pub use graph::Segment;
pub use routing::{EdgeRouter, RoutedEdges, RoutingParams, RoutingReport, RoutingState, route_edges};
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::Network;
use log::info;

/// Places the nodes of `network` on the unit canvas and routes its edges
/// around unrelated nodes.
pub fn compute_layout(network: &Network, config: &LayoutConfig) -> Result<Layout, LayoutError> {
    let coords: Vec<(f64, f64)> = network.nodes.iter().map(|node| node.coords).collect();
    if let Some(node) = network
        .nodes
        .iter()
        .find(|node| !(node.coords.0.is_finite() && node.coords.1.is_finite()))
    {
        return Err(LayoutError::NonFiniteCoordinate {
            node: node.id,
            x: node.coords.0,
            y: node.coords.1,
        });
    }
    let canvas = Canvas::fit(&coords, config.bottom_left_border, config.top_right_border)
        .ok_or(LayoutError::EmptyNetwork)?;
    let points: Vec<Point> = coords.iter().map(|&c| canvas.project(c)).collect();

    let mut endpoints = Vec::with_capacity(network.edges.len());
    for (idx, edge) in network.edges.iter().enumerate() {
        let index_of = |id: i64| {
            network
                .node_index(id)
                .ok_or(LayoutError::UnknownNode { edge: idx, node: id })
        };
        endpoints.push((index_of(edge.start)?, index_of(edge.end)?));
    }

    let mut params = RoutingParams::from_config(&config.routing, canvas.node_size);
    if !config.routing.optimize_layout {
        params.max_segments = 0;
    }
    let router = EdgeRouter::new(&points, &endpoints, params).map_err(|err| with_node_ids(err, network))?;

    let (segments, routing, snapshot) = if config.routing.optimize_layout {
        let routed = router.run();
        info!(
            "routed {} edges around {} nodes: {} waypoints in {} cycles",
            endpoints.len(),
            points.len(),
            routed.report.waypoints,
            routed.report.cycles
        );
        (routed.segments, Some(routed.report), Some(routed.snapshot))
    } else {
        let straight = router.chains().iter().map(|chain| chain.segments()).collect();
        (straight, None, None)
    };

    let radius = canvas.node_size * config.node_scale;
    let nodes = network
        .nodes
        .iter()
        .zip(&points)
        .map(|(node, &center)| NodeLayout {
            id: node.id,
            center,
            radius,
            role: node.role(),
            need: node.need,
            penalty: node.penalty,
            coverage: node.coverage,
            total_costs: node.total_costs,
            functional: node.functional,
        })
        .collect();

    let edges = network
        .edges
        .iter()
        .zip(segments)
        .map(|(edge, segments)| EdgeLayout {
            id: edge.id,
            start: edge.start,
            end: edge.end,
            label_anchor: label_anchor(&segments, config.edge_label_position),
            segments,
            capacity: edge.capacity,
            flux: edge.flux,
            functional: edge.functional,
        })
        .collect();

    Ok(Layout {
        node_size: canvas.node_size,
        limit_dist: params.limit_dist,
        nodes,
        edges,
        routing,
        snapshot,
    })
}

/// Part-way along a straight edge, or at the first bend of a routed one.
fn label_anchor(segments: &[Segment], position: f64) -> Point {
    match segments {
        [] => Point::new(0.0, 0.0),
        [single] => single.start.lerp(single.end, position),
        [first, ..] => first.end,
    }
}

/// The router reports node indices; callers know nodes by id.
fn with_node_ids(err: LayoutError, network: &Network) -> LayoutError {
    let id = |index: i64| network.nodes.get(index as usize).map_or(index, |node| node.id);
    match err {
        LayoutError::ZeroLengthEdge { edge, start, end, x, y } => LayoutError::ZeroLengthEdge {
            edge,
            start: id(start),
            end: id(end),
            x,
            y,
        },
        LayoutError::NonFiniteCoordinate { node, x, y } => LayoutError::NonFiniteCoordinate { node: id(node), x, y },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Edge, Node};

    fn triangle() -> Network {
        let nodes = vec![
            Node::new(10, 0.0, 0.0, -5.0),
            Node::new(20, 10.0, 0.0, 5.0),
            Node::new(30, 5.0, 8.0, 0.0),
        ];
        let edges = vec![Edge::new(0, 10, 20), Edge::new(1, 20, 30)];
        Network::new(nodes, edges).unwrap()
    }

    #[test]
    fn clear_network_keeps_straight_edges() {
        let layout = compute_layout(&triangle(), &LayoutConfig::default()).unwrap();
        assert_eq!(layout.nodes.len(), 3);
        assert!(layout.edges.iter().all(|edge| edge.segments.len() == 1));
        let report = layout.routing.unwrap();
        assert_eq!(report.scans, 1);
        assert_eq!(report.relaxations, 0);
        let first = &layout.edges[0];
        assert_eq!(first.segments[0].start, layout.nodes[0].center);
        assert_eq!(first.segments[0].end, layout.nodes[1].center);
        assert_eq!(first.label_anchor, first.segments[0].start.lerp(first.segments[0].end, 0.5));
    }

    #[test]
    fn node_ids_are_mapped_to_indices() {
        let mut network = triangle();
        network.edges.push(Edge::new(2, 30, 99));
        let err = compute_layout(&network, &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, LayoutError::UnknownNode { edge: 2, node: 99 });
    }

    #[test]
    fn zero_length_edges_are_reported_with_ids() {
        let mut network = triangle();
        network.nodes.push(Node::new(40, 5.0, 8.0, 1.0));
        network.edges.push(Edge::new(2, 30, 40));
        let err = compute_layout(&network, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, LayoutError::ZeroLengthEdge { start: 30, end: 40, .. }));
    }

    #[test]
    fn non_finite_positions_are_rejected() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let mut network = triangle();
            network.nodes[1].coords = (bad, 0.0);
            let err = compute_layout(&network, &LayoutConfig::default()).unwrap_err();
            assert!(matches!(err, LayoutError::NonFiniteCoordinate { node: 20, .. }));

            let mut config = LayoutConfig::default();
            config.routing.optimize_layout = false;
            assert!(compute_layout(&network, &config).is_err());
        }
    }

    #[test]
    fn routing_can_be_switched_off() {
        let nodes = vec![
            Node::new(1, 0.0, 0.0, 1.0),
            Node::new(2, 5.0, 0.0, 1.0),
            Node::new(3, 10.0, 0.0, 1.0),
        ];
        let network = Network::new(nodes, vec![Edge::new(0, 1, 3)]).unwrap();
        let mut config = LayoutConfig::default();
        config.routing.optimize_layout = false;
        let layout = compute_layout(&network, &config).unwrap();
        assert!(layout.routing.is_none());
        assert_eq!(layout.edges[0].segments.len(), 1);

        config.routing.optimize_layout = true;
        let layout = compute_layout(&network, &config).unwrap();
        assert!(layout.edges[0].segments.len() > 1);
        assert_eq!(layout.edges[0].label_anchor, layout.edges[0].segments[0].end);
    }

    #[test]
    fn empty_network_is_rejected() {
        let err = compute_layout(&Network::default(), &LayoutConfig::default()).unwrap_err();
        assert_eq!(err, LayoutError::EmptyNetwork);
    }
}
