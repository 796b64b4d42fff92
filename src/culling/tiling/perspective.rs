//! Perspective tiling. Screen coordinates are `x / z` and `y / z`, so extremes
//! are tangency points of rays from the camera; the volume is clipped by the
//! near plane first, which adds the near-face outline as a source of extremes.

use glam::Vec3;

use super::{
    rim_basis, rim_plane_points, segment_plane_point, silhouette_generators, Axis, LightRanges,
};
use crate::{
    core::{InclusiveRange, SpotCone, ViewLight},
    culling::bounds::LightBoundsExtractor,
    utils::math::{clipped_circle_horizon, ellipse_tangent_points, solve_trig},
};

/// Relative slack of the near-plane test.
const NEAR_TOLERANCE: f32 = 1.0e-4;
/// Squared length below which a projected disk axis counts as collapsed.
const EDGE_ON: f32 = 1.0e-6;

pub(super) fn tile_light(ranges: &mut LightRanges, light: &ViewLight) {
    let grid = ranges.grid;
    let near = grid.near;
    // Whole volume behind the near plane: the light is skipped.
    if LightBoundsExtractor::view_depth_range(light).max < near {
        return;
    }

    let center = light.position;
    let radius = light.range;
    // From inside a spot the cone outline wraps around the camera; use the sphere.
    let cone = light.cone.filter(|cone| !contains_camera(cone));
    let cone = cone.as_ref();
    let clipping = cone.is_some_and(|cone| straddles_near(cone, near));
    let conic_basis = cone.map(|cone| cone.direction.any_orthonormal_pair());

    let front = near * (1.0 - NEAR_TOLERANCE);
    let in_front = |point: Vec3| point.z >= front;
    let on_volume =
        |point: Vec3| in_front(point) && cone.map_or(true, |cone| cone.covers_direction(point));

    // Global extremes: center or apex, sphere horizon, rim outline, near face.
    if in_front(center) {
        ranges.expand_point(center);
    }
    for axis in [Axis::Y, Axis::X] {
        for point in clipped_circle_horizon(axis.project(center), radius, near)
            .into_iter()
            .flatten()
        {
            let point = axis.lift(point, center);
            if on_volume(point) {
                ranges.expand_point(point);
            }
        }
    }
    if let (Some(cone), Some((u, v))) = (cone, conic_basis) {
        for axis in [Axis::Y, Axis::X] {
            for point in rim_horizon(cone, axis).into_iter().flatten() {
                if in_front(point) {
                    ranges.expand_point(point);
                }
            }
            if clipping {
                for point in near_conic_extremes(cone, u, v, near, axis).into_iter().flatten() {
                    ranges.expand_point(point);
                }
            }
        }
        for point in rim_plane_points(cone, Vec3::Z, near).into_iter().flatten() {
            ranges.expand_point(point);
        }
    }

    let Some((first, last)) = ranges.clamp_rows() else {
        return;
    };

    // Row boundaries: planes through the camera containing the X axis.
    let sides = cone.and_then(|cone| silhouette_generators(cone, -cone.apex));
    for plane in first..=last + 1 {
        let slope = grid.row_plane(plane);
        let normal = Vec3::new(0.0, 1.0, -slope);
        let mut row = InclusiveRange::EMPTY;

        for point in plane_sphere_horizon(center, radius, near, slope)
            .into_iter()
            .flatten()
        {
            if on_volume(point) {
                ranges.expand_column(&mut row, point);
            }
        }

        if let (Some(cone), Some((u, v))) = (cone, conic_basis) {
            for side in sides.into_iter().flatten() {
                if let Some(point) = segment_plane_point(cone.apex, side, normal, 0.0) {
                    if in_front(point) {
                        ranges.expand_column(&mut row, point);
                    }
                }
            }
            for point in rim_plane_points(cone, normal, 0.0).into_iter().flatten() {
                if in_front(point) {
                    ranges.expand_column(&mut row, point);
                }
            }
            if clipping {
                for point in near_conic_row_points(cone, u, v, near, slope)
                    .into_iter()
                    .flatten()
                {
                    ranges.expand_column(&mut row, point);
                }
            }
            let apex_slack = 1.0e-5 * cone.apex.length().max(1.0);
            if normal.dot(cone.apex).abs() <= apex_slack && in_front(cone.apex) {
                ranges.expand_column(&mut row, cone.apex);
            }
        }

        ranges.merge_plane(plane, row);
    }
}

/// True if the camera sits inside (or right at the surface of) the spot volume.
fn contains_camera(cone: &SpotCone) -> bool {
    let to_camera = -cone.apex;
    let distance = to_camera.length();
    distance <= cone.range * 1.001
        && to_camera.dot(cone.direction)
            >= distance * cone.cos_half_angle - 1.0e-3 * cone.range
}

/// True if the lateral surface of the cone crosses the near plane.
fn straddles_near(cone: &SpotCone, near: f32) -> bool {
    let axis = cone.direction;
    let extent = cone.base_radius * (1.0 - axis.z * axis.z).max(0.0).sqrt();
    let lowest = cone.apex.z.min(cone.base_center.z - extent);
    let highest = cone.apex.z.max(cone.base_center.z + extent);
    lowest <= near && near <= highest
}

/// Extremes along `axis` of the end-disk rim, from its projected ellipse.
fn rim_horizon(cone: &SpotCone, axis: Axis) -> [Option<Vec3>; 2] {
    let (u, v) = rim_basis(cone, axis);
    let radius = cone.base_radius;
    let axis_u = axis.project(u);
    let axis_v = axis.project(v);
    if axis_v.length_squared() <= EDGE_ON {
        // Edge-on disk: the outline is the segment spanned by `u`.
        return [
            Some(cone.base_center + u * radius),
            Some(cone.base_center - u * radius),
        ];
    }
    match ellipse_tangent_points(axis.project(cone.base_center) / radius, axis_u, axis_v) {
        Some(points) => points.map(|p| Some(cone.base_center + (u * p.x + v * p.y) * radius)),
        None => [None, None],
    }
}

/// Circle cut from the sphere by the row plane `y = slope·z`, reduced to its
/// in-plane horizon. Coordinates inside the plane are `x` and depth along
/// `(0, slope, 1)`, so the near plane sits at `near·|(0, slope, 1)|`.
fn plane_sphere_horizon(center: Vec3, radius: f32, near: f32, slope: f32) -> [Option<Vec3>; 4] {
    let norm = (1.0 + slope * slope).sqrt();
    let distance = (center.y - slope * center.z) / norm;
    if distance.abs() > radius {
        return [None; 4];
    }
    let depth_axis = Vec3::new(0.0, slope, 1.0) / norm;
    let circle_radius = (radius * radius - distance * distance).max(0.0).sqrt();
    let circle_center = glam::Vec2::new(center.x, center.dot(depth_axis));
    clipped_circle_horizon(circle_center, circle_radius, near * norm)
        .map(|point| point.map(|p| Vec3::X * p.x + depth_axis * p.y))
}

/// `(lateral, z)` components of the generator terms `cos α·d`, `sin α·u`, `sin α·v`.
fn conic_terms(cone: &SpotCone, u: Vec3, v: Vec3, axis: Axis) -> [(f32, f32); 3] {
    [
        cone.direction * cone.cos_half_angle,
        u * cone.sin_half_angle,
        v * cone.sin_half_angle,
    ]
    .map(|term| (axis.lateral(term), term.z))
}

/// Extremes along `axis` of the conic the near plane cuts from the lateral surface.
///
/// On the near plane the screen coordinate is proportional to
/// `lateral(g) / z(g)` of the generator `g(θ)`; its derivative vanishes where
/// `A·cos θ + B·sin θ + K = 0`.
fn near_conic_extremes(
    cone: &SpotCone,
    u: Vec3,
    v: Vec3,
    near: f32,
    axis: Axis,
) -> [Option<Vec3>; 2] {
    let [(y0, z0), (y1, z1), (y2, z2)] = conic_terms(cone, u, v, axis);
    match solve_trig(
        y2 * z0 - y0 * z2,
        y0 * z1 - y1 * z0,
        -(y2 * z1 - y1 * z2),
    ) {
        Some(roots) => roots.map(|theta| near_conic_point(cone, u, v, theta, near)),
        None => [None, None],
    }
}

/// Points where the row plane `y = slope·z` meets the near-plane conic.
fn near_conic_row_points(
    cone: &SpotCone,
    u: Vec3,
    v: Vec3,
    near: f32,
    slope: f32,
) -> [Option<Vec3>; 2] {
    let [(y0, z0), (y1, z1), (y2, z2)] = conic_terms(cone, u, v, Axis::Y);
    // The generator reaches the plane at `y = slope·near` when `k·g.y = w·g.z`.
    let k = near - cone.apex.z;
    let w = slope * near - cone.apex.y;
    match solve_trig(k * y1 - w * z1, k * y2 - w * z2, w * z0 - k * y0) {
        Some(roots) => roots.map(|theta| near_conic_point(cone, u, v, theta, near)),
        None => [None, None],
    }
}

/// Point where generator `θ` crosses the near plane, if that happens on the
/// forward nappe within the light range.
fn near_conic_point(cone: &SpotCone, u: Vec3, v: Vec3, theta: f32, near: f32) -> Option<Vec3> {
    let generator = cone.generator(u, v, theta);
    if !(generator.z.abs() > 1.0e-6) {
        return None;
    }
    let distance = (near - cone.apex.z) / generator.z;
    let slack = cone.range * 1.0e-4;
    if distance < -slack || distance > cone.range + slack {
        return None;
    }
    let mut point = cone.apex + generator * distance;
    point.z = near;
    Some(point)
}
