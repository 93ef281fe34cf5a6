use serde::Serialize;

/// Number of decimals kept for every coordinate the router writes.
pub const COORD_DECIMALS: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, v: Point, factor: f64) -> Point {
        Point::new(self.x + factor * v.x, self.y + factor * v.y)
    }

    pub fn rounded(self) -> Point {
        Point::new(round5(self.x), round5(self.y))
    }

    pub fn lerp(self, other: Point, t: f64) -> Point {
        self.offset(vector(self, other), t)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point::new(x, y)
    }
}

pub fn round5(value: f64) -> f64 {
    let factor = 10f64.powi(COORD_DECIMALS);
    let rounded = (value * factor).round() / factor;
    // keep -0.0 out of dumps and comparisons
    if rounded == 0.0 { 0.0 } else { rounded }
}

/// Displacement from `a` to `b`.
pub fn vector(a: Point, b: Point) -> Point {
    Point::new(b.x - a.x, b.y - a.y)
}

pub fn length(v: Point) -> f64 {
    v.x.hypot(v.y)
}

fn dot(a: Point, b: Point) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Signed length of the projection of `v` onto `onto`, in units of `onto`'s
/// length. Not clamped: points before the start give values below 0, points
/// past the end values above 1.
///
/// `onto` must not be the zero vector.
pub fn scalar_projection(v: Point, onto: Point) -> f64 {
    dot(v, onto) / dot(onto, onto)
}

pub fn vector_projection(v: Point, onto: Point) -> Point {
    let t = scalar_projection(v, onto);
    Point::new(onto.x * t, onto.y * t)
}
