use super::geometry::{Point, length, scalar_projection, vector, vector_projection};

/// Segments shorter than this are treated as degenerate and never tested.
const DEGENERATE_SEGMENT: f64 = 1e-12;

/// A fixed node found too close to a segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    /// Perpendicular distance from the node to the segment's supporting line.
    pub ortho: f64,
    /// Position of the projected point along the segment (0 at start, 1 at end).
    pub t: f64,
    /// Projected point on the segment, rounded to 5 decimals.
    pub waypoint: Point,
}

/// Tests whether `candidate` lies within `limit_dist` of the segment
/// `(start, end)`.
///
/// The perpendicular distance is measured to the infinite line through the
/// segment; the projection must additionally fall inside the segment
/// extended by `limit_dist` on both ends. Both bounds are inclusive.
pub fn check_proximity(start: Point, end: Point, candidate: Point, limit_dist: f64) -> Option<Proximity> {
    let seg = vector(start, end);
    let seg_len = length(seg);
    if seg_len <= DEGENERATE_SEGMENT {
        return None;
    }
    let from_start = vector(start, candidate);
    let projected = vector_projection(from_start, seg);
    let ortho = length(vector(from_start, projected));
    if ortho.is_nan() || ortho > limit_dist {
        return None;
    }
    let t = scalar_projection(from_start, seg);
    let overshoot = limit_dist / seg_len;
    if !(-overshoot..=1.0 + overshoot).contains(&t) {
        return None;
    }
    Some(Proximity {
        ortho,
        t,
        waypoint: start.offset(seg, t).rounded(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_on_segment_is_close() {
        let hit = check_proximity(Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 0.0), 1.0)
            .expect("hit");
        assert_eq!(hit.ortho, 0.0);
        assert_eq!(hit.t, 0.5);
        assert_eq!(hit.waypoint, Point::new(5.0, 0.0));
    }

    #[test]
    fn threshold_is_inclusive() {
        let hit = check_proximity(Point::new(0.0, 0.0), Point::new(8.0, 0.0), Point::new(4.0, 0.5), 0.5);
        assert!(hit.is_some());
        let miss = check_proximity(Point::new(0.0, 0.0), Point::new(8.0, 0.0), Point::new(4.0, 0.5), 0.49);
        assert!(miss.is_none());
    }

    #[test]
    fn overshoot_beyond_endpoints_is_tolerated() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        // t = 1.05, tolerance 1 / 10 = 0.1
        let hit = check_proximity(start, end, Point::new(10.5, 0.2), 1.0).expect("hit");
        assert!(hit.t > 1.0);
        assert_eq!(hit.waypoint, Point::new(10.5, 0.0));
        assert!(check_proximity(start, end, Point::new(11.5, 0.0), 1.0).is_none());
        assert!(check_proximity(start, end, Point::new(-1.5, 0.0), 1.0).is_none());
    }

    #[test]
    fn waypoint_is_rounded() {
        let hit = check_proximity(Point::new(0.0, 0.0), Point::new(3.0, 0.0), Point::new(1.0, 0.1), 0.2)
            .expect("hit");
        assert_eq!(hit.waypoint, Point::new(1.0, 0.0));
        let hit = check_proximity(Point::new(0.0, 0.0), Point::new(3.0, 3.0), Point::new(1.0, 0.0), 1.0)
            .expect("hit");
        assert_eq!(hit.waypoint, Point::new(0.5, 0.5));
    }

    #[test]
    fn non_finite_candidate_is_never_close() {
        let start = Point::new(0.0, 0.0);
        let end = Point::new(10.0, 0.0);
        assert!(check_proximity(start, end, Point::new(f64::NAN, 0.0), 0.5).is_none());
        assert!(check_proximity(start, end, Point::new(5.0, f64::NAN), 0.5).is_none());
        assert!(check_proximity(start, end, Point::new(f64::INFINITY, 0.0), 0.5).is_none());
    }

    #[test]
    fn degenerate_segment_is_skipped() {
        let p = Point::new(1.0, 1.0);
        assert!(check_proximity(p, p, p, 10.0).is_none());
    }
}
