use crate::layout::{Layout, RoutingReport};
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Flat JSON view of a computed layout, for inspection and regression
/// comparisons.
#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub figure: String,
    pub node_size: f64,
    pub limit_dist: f64,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub routing: Option<RoutingReport>,
    pub routing_graph: Option<RoutingGraphDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: i64,
    pub role: String,
    pub x: f64,
    pub y: f64,
    pub radius: f64,
    pub functional: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: usize,
    pub from: i64,
    pub to: i64,
    pub functional: bool,
    pub points: Vec<[f64; 2]>,
    pub label_anchor: [f64; 2],
}

#[derive(Debug, Serialize)]
pub struct RoutingGraphDump {
    pub fixed_nodes: usize,
    pub waypoints: Vec<[f64; 2]>,
    pub springs: Vec<(usize, usize, f64)>,
}

impl LayoutDump {
    pub fn from_layout(figure: &str, layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id,
                role: format!("{:?}", node.role),
                x: node.center.x,
                y: node.center.y,
                radius: node.radius,
                functional: node.functional,
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id,
                from: edge.start,
                to: edge.end,
                functional: edge.functional,
                points: edge.points().iter().map(|p| [p.x, p.y]).collect(),
                label_anchor: [edge.label_anchor.x, edge.label_anchor.y],
            })
            .collect();

        let routing_graph = layout.snapshot.as_ref().map(|snapshot| RoutingGraphDump {
            fixed_nodes: snapshot.fixed_count,
            waypoints: snapshot
                .positions
                .iter()
                .skip(snapshot.fixed_count)
                .map(|p| [p.x, p.y])
                .collect(),
            springs: snapshot.edges.clone(),
        });

        LayoutDump {
            figure: figure.to_string(),
            node_size: layout.node_size,
            limit_dist: layout.limit_dist,
            nodes,
            edges,
            routing: layout.routing.clone(),
            routing_graph,
        }
    }
}

pub fn write_layout_dump(path: &Path, dumps: &[LayoutDump]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, dumps)?;
    Ok(())
}
