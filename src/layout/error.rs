use thiserror::Error;

/// Input rejected before routing starts. No partial layout is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayoutError {
    #[error("network has no nodes")]
    EmptyNetwork,
    #[error("edge {edge} references unknown node {node}")]
    UnknownNode { edge: usize, node: i64 },
    #[error("edge {edge} has zero length: nodes {start} and {end} share the position ({x}, {y})")]
    ZeroLengthEdge {
        edge: usize,
        start: i64,
        end: i64,
        x: f64,
        y: f64,
    },
    #[error("node {node} has a non-finite position ({x}, {y})")]
    NonFiniteCoordinate { node: i64, x: f64, y: f64 },
    #[error("invalid routing parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}
