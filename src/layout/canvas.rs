use super::geometry::{Point, round5};

/// Reference node size for a single node; shrinks with the square root of
/// the node count.
const BASE_NODE_SIZE: f64 = 0.1;
/// Default canvas margin in node sizes.
const BORDER_NODE_RATIO: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct AxisScale {
    factor: f64,
    offset: f64,
    min: f64,
}

impl AxisScale {
    fn fit(min: f64, max: f64, low: f64, high: f64) -> Self {
        let diff = max - min;
        if diff > 0.0 {
            Self {
                factor: (high - low) / diff,
                offset: low,
                min,
            }
        } else {
            Self {
                factor: 0.0,
                offset: (low + high) / 2.0,
                min,
            }
        }
    }

    fn apply(&self, value: f64) -> f64 {
        self.offset + self.factor * (value - self.min)
    }
}

/// Maps raw node coordinates onto the unit canvas, each axis stretched
/// between the two borders.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub node_size: f64,
    pub bottom_left: f64,
    pub top_right: f64,
    x: AxisScale,
    y: AxisScale,
}

pub fn node_size_for(count: usize) -> f64 {
    BASE_NODE_SIZE / (count.max(1) as f64).sqrt().round()
}

impl Canvas {
    /// Returns `None` for an empty coordinate set.
    pub fn fit(coords: &[(f64, f64)], bottom_left: Option<f64>, top_right: Option<f64>) -> Option<Self> {
        let first = coords.first()?;
        let node_size = node_size_for(coords.len());
        let bottom_left = bottom_left.unwrap_or(BORDER_NODE_RATIO * node_size);
        let top_right = top_right.unwrap_or(1.0 - BORDER_NODE_RATIO * node_size);
        let (mut min_x, mut max_x, mut min_y, mut max_y) = (first.0, first.0, first.1, first.1);
        for &(x, y) in coords {
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);
        }
        Some(Self {
            node_size,
            bottom_left,
            top_right,
            x: AxisScale::fit(min_x, max_x, bottom_left, top_right),
            y: AxisScale::fit(min_y, max_y, bottom_left, top_right),
        })
    }

    pub fn project(&self, (x, y): (f64, f64)) -> Point {
        Point::new(round5(self.x.apply(x)), round5(self.y.apply(y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_size_shrinks_with_count() {
        assert_eq!(node_size_for(1), 0.1);
        assert_eq!(node_size_for(4), 0.05);
        // sqrt(6) rounds to 2
        assert_eq!(node_size_for(6), 0.05);
        assert_eq!(node_size_for(0), 0.1);
    }

    #[test]
    fn corners_land_on_the_borders() {
        let coords = [(10.0, 100.0), (20.0, 300.0), (15.0, 200.0), (12.0, 150.0)];
        let canvas = Canvas::fit(&coords, None, None).unwrap();
        assert_eq!(canvas.node_size, 0.05);
        assert_eq!(canvas.project((10.0, 100.0)), Point::new(0.1, 0.1));
        assert_eq!(canvas.project((20.0, 300.0)), Point::new(0.9, 0.9));
        assert_eq!(canvas.project((15.0, 200.0)), Point::new(0.5, 0.5));
    }

    #[test]
    fn flat_axis_is_centred() {
        let coords = [(0.0, 3.0), (5.0, 3.0), (10.0, 3.0)];
        let canvas = Canvas::fit(&coords, None, None).unwrap();
        assert_eq!(canvas.project((5.0, 3.0)).y, 0.5);
        assert_eq!(canvas.project((0.0, 3.0)).x, 0.1);
    }

    #[test]
    fn empty_input_has_no_canvas() {
        assert!(Canvas::fit(&[], None, None).is_none());
    }
}
