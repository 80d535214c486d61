use super::{Point2d, Vector2d};
use cgmath::prelude::*;

/// Projects a point onto a local coordinate system.
///
/// # Parameters
/// * `point` - The point to project
/// * `origin` - The origin of the coordinate system
/// * `x_axis` - The basis vector pointing in the positive x-axis.
/// * `y_axis` - The basis vector pointing in the positive y-axis.
pub fn project_local(
    point: Point2d,
    origin: Point2d,
    x_axis: Vector2d,
    y_axis: Vector2d,
) -> Point2d {
    let point = point - origin;
    Point2d::new(point.dot(x_axis), point.dot(y_axis))
}

/// Rotates a vector 90 degrees anti-clockwise.
pub fn rot90(vec: Vector2d) -> Vector2d {
    Vector2d::new(-vec.y, vec.x)
}

/// Normalises a vector, returning `None` if it has zero or non-finite length.
pub fn try_normalize(vec: Vector2d) -> Option<Vector2d> {
    let mag = vec.magnitude();
    if mag > 0.0 && mag.is_finite() {
        Some(vec / mag)
    } else {
        None
    }
}

/// The rotation in radians that turns the local +y axis onto `dir`.
pub fn heading_angle(dir: Vector2d) -> f64 {
    dir.y.atan2(dir.x) - std::f64::consts::FRAC_PI_2
}

/// Finds where two line segments cross, if they do.
/// Parallel segments never cross.
pub fn segment_intersection(
    (a0, a1): (Point2d, Point2d),
    (b0, b1): (Point2d, Point2d),
) -> Option<Point2d> {
    let r = a1 - a0;
    let s = b1 - b0;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-12 {
        return None;
    }
    let offset = b0 - a0;
    let t = offset.perp_dot(s) / denom;
    let u = offset.perp_dot(r) / denom;
    ((0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u)).then(|| a0 + r * t)
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn rot90_is_anticlockwise() {
        let v = rot90(Vector2d::new(1.0, 0.0));
        assert_approx_eq!(v.x, 0.0);
        assert_approx_eq!(v.y, 1.0);
    }

    #[test]
    fn zero_vector_does_not_normalize() {
        assert!(try_normalize(Vector2d::new(0.0, 0.0)).is_none());
        assert!(try_normalize(Vector2d::new(f64::NAN, 1.0)).is_none());
        let v = try_normalize(Vector2d::new(3.0, 4.0)).unwrap();
        assert_approx_eq!(v.x, 0.6);
        assert_approx_eq!(v.y, 0.8);
    }

    #[test]
    fn heading_faces_local_y_along_direction() {
        // A body rotated by `angle` maps local +y to (-sin, cos).
        let angle = heading_angle(Vector2d::new(1.0, 0.0));
        assert_approx_eq!(-angle.sin(), 1.0);
        assert_approx_eq!(angle.cos(), 0.0);
    }

    #[test]
    fn project_onto_rotated_axes() {
        let p = project_local(
            Point2d::new(2.0, 3.0),
            Point2d::new(1.0, 1.0),
            Vector2d::new(0.0, 1.0),
            Vector2d::new(-1.0, 0.0),
        );
        assert_approx_eq!(p.x, 2.0);
        assert_approx_eq!(p.y, -1.0);
    }

    #[test]
    fn segments_cross() {
        let p = segment_intersection(
            (Point2d::new(0.0, 5.0), Point2d::new(10.0, 5.0)),
            (Point2d::new(4.0, 0.0), Point2d::new(4.0, 10.0)),
        )
        .unwrap();
        assert_approx_eq!(p.x, 4.0);
        assert_approx_eq!(p.y, 5.0);
    }

    #[test]
    fn disjoint_and_parallel_segments_do_not_cross() {
        let a = (Point2d::new(0.0, 0.0), Point2d::new(10.0, 0.0));
        assert!(segment_intersection(a, (Point2d::new(11.0, -1.0), Point2d::new(11.0, 1.0))).is_none());
        assert!(segment_intersection(a, (Point2d::new(0.0, 1.0), Point2d::new(10.0, 1.0))).is_none());
    }
}
