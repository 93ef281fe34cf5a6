use std::collections::{BTreeMap, BTreeSet};

use super::geometry::{Point, length, vector};
use super::graph::RoutingGraph;

/// Distances below this are clipped before computing forces.
const MIN_DISTANCE: f64 = 0.01;
/// Displacements shorter than this are treated as this long (damped move).
const MIN_DISPLACEMENT: f64 = 0.01;
const DAMPED_DISPLACEMENT: f64 = 0.1;
/// Initial temperature as a fraction of the layout extent.
const INITIAL_TEMPERATURE_RATIO: f64 = 0.1;
/// Separation angle step for coincident nodes.
const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaxParams {
    /// Ideal edge length `k`.
    pub avg_dist: f64,
    pub iterations: usize,
    /// Fraction of the free-node bounding square occupied by the fixed nodes.
    pub canvas_scale: f64,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn of(points: impl Iterator<Item = Point>) -> Option<Self> {
        let mut bounds: Option<Bounds> = None;
        for p in points {
            bounds = Some(match bounds {
                None => Bounds {
                    min_x: p.x,
                    max_x: p.x,
                    min_y: p.y,
                    max_y: p.y,
                },
                Some(b) => Bounds {
                    min_x: b.min_x.min(p.x),
                    max_x: b.max_x.max(p.x),
                    min_y: b.min_y.min(p.y),
                    max_y: b.max_y.max(p.y),
                },
            });
        }
        bounds
    }

    fn extent(&self) -> f64 {
        (self.max_x - self.min_x).max(self.max_y - self.min_y)
    }

    /// Square around the centre, enlarged so these bounds fill `scale` of it.
    fn canvas(&self, scale: f64, fallback_half: f64) -> Bounds {
        let cx = (self.min_x + self.max_x) / 2.0;
        let cy = (self.min_y + self.max_y) / 2.0;
        let mut half = self.extent() / 2.0 / scale.max(f64::EPSILON);
        if half <= 0.0 {
            half = fallback_half;
        }
        Bounds {
            min_x: cx - half,
            max_x: cx + half,
            min_y: cy - half,
            max_y: cy + half,
        }
    }

    fn clamp(&self, p: Point) -> Point {
        Point::new(p.x.clamp(self.min_x, self.max_x), p.y.clamp(self.min_y, self.max_y))
    }
}

/// Direction used to push apart two nodes sitting on the same spot. Depends
/// only on the ids and flips sign with their order.
fn separation(i: usize, j: usize) -> Point {
    let (lo, hi) = if i < j { (i, j) } else { (j, i) };
    let angle = GOLDEN_ANGLE * (hi - lo) as f64;
    let dir = Point::new(angle.cos(), angle.sin());
    if i == lo { dir } else { Point::new(-dir.x, -dir.y) }
}

/// Runs `params.iterations` Fruchterman-Reingold steps over `graph`, seeded
/// from the graph's current positions. Nodes in `pinned` never move.
///
/// Returns the new, rounded position of every node that is not pinned.
pub fn relax(graph: &RoutingGraph, pinned: &BTreeSet<usize>, params: &RelaxParams) -> BTreeMap<usize, Point> {
    let n = graph.node_count();
    let mut pos = graph.positions().to_vec();
    let free: Vec<usize> = (0..n).filter(|id| !pinned.contains(id)).collect();
    if free.is_empty() {
        return BTreeMap::new();
    }

    let mut adjacency: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
    for (a, b, w) in graph.edges() {
        adjacency[a].push((b, w));
        adjacency[b].push((a, w));
    }

    let k = params.avg_dist;
    let canvas = Bounds::of(pinned.iter().map(|&id| pos[id]))
        .or_else(|| Bounds::of(pos.iter().copied()))
        .map(|b| b.canvas(params.canvas_scale, k));

    let mut temperature = Bounds::of(pos.iter().copied())
        .map(|b| b.extent() * INITIAL_TEMPERATURE_RATIO)
        .filter(|t| *t > 0.0)
        .unwrap_or(INITIAL_TEMPERATURE_RATIO);
    let cooling = temperature / (params.iterations as f64 + 1.0);

    let mut weights = vec![0.0; n];
    let mut displacement = vec![Point::new(0.0, 0.0); free.len()];
    for _ in 0..params.iterations {
        for (slot, &i) in free.iter().enumerate() {
            weights.iter_mut().for_each(|w| *w = 0.0);
            for &(j, w) in &adjacency[i] {
                weights[j] = w;
            }
            let mut disp = Point::new(0.0, 0.0);
            for j in 0..n {
                if j == i {
                    continue;
                }
                let mut delta = vector(pos[j], pos[i]);
                let mut dist = length(delta);
                if dist == 0.0 {
                    delta = separation(i, j);
                    delta = Point::new(delta.x * MIN_DISTANCE, delta.y * MIN_DISTANCE);
                    dist = MIN_DISTANCE;
                }
                let dist = dist.max(MIN_DISTANCE);
                let coefficient = k * k / (dist * dist) - weights[j] * dist / k;
                disp = disp.offset(delta, coefficient);
            }
            displacement[slot] = disp;
        }
        for (slot, &i) in free.iter().enumerate() {
            let disp = displacement[slot];
            let mut len = length(disp);
            if len < MIN_DISPLACEMENT {
                len = DAMPED_DISPLACEMENT;
            }
            let moved = pos[i].offset(disp, temperature / len);
            pos[i] = match canvas {
                Some(canvas) => canvas.clamp(moved),
                None => moved,
            };
        }
        temperature -= cooling;
    }

    free.into_iter().map(|id| (id, pos[id].rounded())).collect()
}
