//! Geometry helpers layered on top of `glam` for the tiling math.

use glam::{Vec2, Vec3};

const DEGENERATE: f32 = 1.0e-9;

/// Solves `a·cos θ + b·sin θ = c`, returning both roots.
///
/// `None` when the equation has no solution or its coefficients vanish.
pub fn solve_trig(a: f32, b: f32, c: f32) -> Option<[f32; 2]> {
    let magnitude = (a * a + b * b).sqrt();
    if !(magnitude > DEGENERATE) || !c.is_finite() {
        return None;
    }
    let ratio = c / magnitude;
    if ratio.abs() > 1.0 {
        return None;
    }
    let phase = b.atan2(a);
    let spread = ratio.acos();
    Some([phase + spread, phase - spread])
}

/// Points of a circle in 2-D `(lateral, depth)` space that bound it angularly as
/// seen from the origin, once the part with `depth < near` is removed.
///
/// Candidates are the two tangent points (when the origin lies outside the
/// circle and the tangent point is not clipped) and the two ends of the chord
/// cut by the near line. Every returned point lies on the clipped boundary.
pub fn clipped_circle_horizon(center: Vec2, radius: f32, near: f32) -> [Option<Vec2>; 4] {
    let mut points = [None; 4];
    let distance_sq = center.length_squared();
    let radius_sq = radius * radius;

    if distance_sq > radius_sq {
        let distance = distance_sq.sqrt();
        let direction = center / distance;
        // Right triangle origin / tangent point / center.
        let tangent_sq = distance_sq - radius_sq;
        let height = tangent_sq.sqrt() * radius / distance;
        let foot = direction * (tangent_sq / distance);
        let perp = direction.perp();
        for (slot, point) in points
            .iter_mut()
            .zip([foot + perp * height, foot - perp * height])
        {
            if point.y >= near && point.is_finite() {
                *slot = Some(point);
            }
        }
    }

    // Second right triangle center / chord midpoint / chord end.
    let offset = near - center.y;
    if offset.abs() <= radius {
        let half_chord = (radius_sq - offset * offset).max(0.0).sqrt();
        points[2] = Some(Vec2::new(center.x - half_chord, near));
        points[3] = Some(Vec2::new(center.x + half_chord, near));
    }

    points
}

/// Intersects the circle `center + radius·(cos θ·u + sin θ·v)` with the plane
/// `normal · p = offset`. `u` and `v` must be orthonormal.
pub fn circle_plane_intersection(
    center: Vec3,
    u: Vec3,
    v: Vec3,
    radius: f32,
    normal: Vec3,
    offset: f32,
) -> Option<[Vec3; 2]> {
    let roots = solve_trig(
        radius * normal.dot(u),
        radius * normal.dot(v),
        offset - normal.dot(center),
    )?;
    Some(roots.map(|theta| {
        let (sin, cos) = theta.sin_cos();
        center + (u * cos + v * sin) * radius
    }))
}

/// Tangent points, seen from the origin, of the 2-D ellipse
/// `center + cos t·axis_u + sin t·axis_v` with perpendicular semi-axes.
///
/// The origin is expressed in the ellipse's normalized basis, where the ellipse
/// is the unit circle; the polar line of that point meets the circle at the
/// tangent points. Returned as unit-circle coordinates `(cos t, sin t)`.
/// `None` when the origin is inside the ellipse or an axis vanishes.
pub fn ellipse_tangent_points(center: Vec2, axis_u: Vec2, axis_v: Vec2) -> Option<[Vec2; 2]> {
    let len_u = axis_u.length_squared();
    let len_v = axis_v.length_squared();
    if !(len_u > DEGENERATE) || !(len_v > DEGENERATE) {
        return None;
    }
    let origin = Vec2::new(-center.dot(axis_u) / len_u, -center.dot(axis_v) / len_v);
    let dist_sq = origin.length_squared();
    if !(dist_sq > 1.0) {
        return None;
    }
    let spread = (dist_sq - 1.0).sqrt();
    let perp = origin.perp();
    Some([
        (origin + perp * spread) / dist_sq,
        (origin - perp * spread) / dist_sq,
    ])
}
