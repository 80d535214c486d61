use crate::math::{project_local, rot90, try_normalize, Point2d, Vector2d};
use crate::util::Interval;
use crate::vehicle::VEHICLE_WIDTH;
use crate::{BuildError, EdgeId};
use smallvec::SmallVec;
use std::fmt;

/// The width of a single lane in m.
pub const LANE_WIDTH: f64 = 3.0 * VEHICLE_WIDTH;

/// Identifies a single lane of a road edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LaneId {
    /// The edge the lane belongs to.
    pub edge: EdgeId,
    /// The index of the lane, counted from the right-hand side of the edge.
    pub index: u8,
}

impl LaneId {
    pub const fn new(edge: EdgeId, index: u8) -> Self {
        Self { edge, index }
    }
}

impl fmt::Display for LaneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "road {} lane {}", self.edge, self.index)
    }
}

/// The sensor volume of a lane: a convex quadrilateral with
/// counter-clockwise corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneQuad {
    id: LaneId,
    corners: [Point2d; 4],
}

impl LaneQuad {
    /// The lane this quad belongs to.
    pub fn id(&self) -> LaneId {
        self.id
    }

    /// The corners of the quad in counter-clockwise order.
    pub fn corners(&self) -> &[Point2d; 4] {
        &self.corners
    }

    /// Returns true if the point lies inside or on the boundary of the quad.
    pub fn contains(&self, point: Point2d) -> bool {
        (0..4).all(|i| {
            let a = self.corners[i];
            let b = self.corners[(i + 1) % 4];
            let edge = b - a;
            let to_point = point - a;
            edge.x * to_point.y - edge.y * to_point.x >= -1e-9
        })
    }

    /// The extent of the quad along `axis`, measured from `origin`.
    pub fn extent_along(&self, origin: Point2d, axis: Vector2d) -> Interval<f64> {
        let perp = rot90(axis);
        Interval::enclosing(
            self.corners
                .iter()
                .map(|c| project_local(*c, origin, axis, perp).x),
        )
        .unwrap_or_default()
    }
}

/// The lateral offset of the centre of lane `index` from the edge's centre line,
/// for an edge with `lanes` lanes.
pub fn lane_centre_offset(lanes: u8, index: u8) -> f64 {
    (index as f64 + 0.5 - 0.5 * lanes as f64) * LANE_WIDTH
}

/// Computes the sensor quads of every lane of an edge.
///
/// # Parameters
/// * `edge` - The edge the lanes belong to
/// * `src` - The start point of the edge's centre line
/// * `dst` - The end point of the edge's centre line
/// * `lanes` - The number of lanes on the edge
pub fn lane_quads(
    edge: EdgeId,
    src: Point2d,
    dst: Point2d,
    lanes: u8,
) -> Result<SmallVec<[LaneQuad; 4]>, BuildError> {
    let frame = LaneFrame::new(edge, src, dst)?;
    Ok((0..lanes).map(|index| frame.quad(lanes, index)).collect())
}

/// Computes the sensor quad of a single lane of an edge.
pub fn lane_quad(
    edge: EdgeId,
    src: Point2d,
    dst: Point2d,
    lanes: u8,
    index: u8,
) -> Result<LaneQuad, BuildError> {
    if index >= lanes {
        return Err(BuildError::NoSuchLane {
            lane: LaneId::new(edge, index),
            lanes,
        });
    }
    Ok(LaneFrame::new(edge, src, dst)?.quad(lanes, index))
}

/// The local coordinate frame of an edge.
struct LaneFrame {
    edge: EdgeId,
    src: Point2d,
    dst: Point2d,
    /// Unit vector from `src` to `dst`.
    dir: Vector2d,
    /// Unit vector perpendicular to `dir`.
    perp: Vector2d,
}

impl LaneFrame {
    fn new(edge: EdgeId, src: Point2d, dst: Point2d) -> Result<Self, BuildError> {
        let dir = try_normalize(dst - src).ok_or(BuildError::DegenerateEdge { edge })?;
        Ok(Self {
            edge,
            src,
            dst,
            dir,
            perp: rot90(dir),
        })
    }

    fn quad(&self, lanes: u8, index: u8) -> LaneQuad {
        let half = 0.5 * LANE_WIDTH;
        let centre = lane_centre_offset(lanes, index);
        let right = self.perp * (centre - half);
        let left = self.perp * (centre + half);
        // Both ends are extended by half a lane so neighbouring edges overlap at junctions
        let back = self.dir * half;
        LaneQuad {
            id: LaneId::new(self.edge, index),
            corners: [
                self.src + right - back,
                self.dst + right + back,
                self.dst + left + back,
                self.src + left - back,
            ],
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use cgmath::InnerSpace;

    fn diagonal() -> (Point2d, Point2d) {
        (Point2d::new(10.0, 4.0), Point2d::new(40.0, 44.0))
    }

    #[test]
    fn one_quad_per_lane() {
        let (src, dst) = diagonal();
        for lanes in 1..=5 {
            let quads = lane_quads(EdgeId(3), src, dst, lanes).unwrap();
            assert_eq!(quads.len(), lanes as usize);
            for (i, quad) in quads.iter().enumerate() {
                assert_eq!(quad.id(), LaneId::new(EdgeId(3), i as u8));
            }
        }
    }

    #[test]
    fn lanes_are_contiguous_across_the_edge() {
        let (src, dst) = diagonal();
        let perp = rot90((dst - src).normalize());
        let quads = lane_quads(EdgeId(0), src, dst, 4).unwrap();
        let extents: Vec<_> = quads.iter().map(|q| q.extent_along(src, perp)).collect();

        for extent in &extents {
            assert_approx_eq!(extent.length(), LANE_WIDTH);
        }
        for pair in extents.windows(2) {
            assert_approx_eq!(pair[0].max, pair[1].min);
            assert!(pair[0].max <= pair[1].min + 1e-9);
        }
        // Centred on the centre line
        assert_approx_eq!(extents[0].min, -2.0 * LANE_WIDTH);
        assert_approx_eq!(extents[3].max, 2.0 * LANE_WIDTH);
    }

    #[test]
    fn ends_extend_past_the_endpoints() {
        let (src, dst) = diagonal();
        let dir = (dst - src).normalize();
        let quad = lane_quad(EdgeId(0), src, dst, 2, 1).unwrap();
        let along = quad.extent_along(src, dir);
        assert_approx_eq!(along.min, -0.5 * LANE_WIDTH);
        assert_approx_eq!(along.max, 50.0 + 0.5 * LANE_WIDTH);
    }

    #[test]
    fn two_lanes_meet_on_the_centre_line() {
        let src = Point2d::new(0.0, 0.0);
        let dst = Point2d::new(20.0, 0.0);
        let quads = lane_quads(EdgeId(0), src, dst, 2).unwrap();
        let mid = Point2d::new(10.0, 0.0);
        assert!(quads[0].contains(mid));
        assert!(quads[1].contains(mid));
        assert!(quads[0].contains(Point2d::new(10.0, -1.0)));
        assert!(!quads[1].contains(Point2d::new(10.0, -1.0)));
        assert!(quads[0].contains(Point2d::new(-1.0, -1.0)));
        assert!(!quads[0].contains(Point2d::new(-LANE_WIDTH, -1.0)));
    }

    #[test]
    fn zero_length_edge_is_rejected() {
        let p = Point2d::new(5.0, 5.0);
        assert_eq!(
            lane_quads(EdgeId(7), p, p, 2).unwrap_err(),
            BuildError::DegenerateEdge { edge: EdgeId(7) }
        );
    }

    #[test]
    fn lane_index_out_of_range() {
        let (src, dst) = diagonal();
        let err = lane_quad(EdgeId(1), src, dst, 2, 2).unwrap_err();
        assert_eq!(
            err,
            BuildError::NoSuchLane {
                lane: LaneId::new(EdgeId(1), 2),
                lanes: 2
            }
        );
    }
}
