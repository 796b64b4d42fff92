//! Orthographic tiling. Screen coordinates are affine in view-space `x` and
//! `y`, so extremes are plain coordinate extremes. Volumes are not clipped;
//! lights lying wholly behind the near plane are skipped.

use glam::Vec3;

use super::{rim_plane_points, segment_plane_point, silhouette_generators, Axis, LightRanges};
use crate::{
    core::{InclusiveRange, SpotCone, ViewLight},
    culling::bounds::LightBoundsExtractor,
};

pub(super) fn tile_light(ranges: &mut LightRanges, light: &ViewLight) {
    let grid = ranges.grid;
    // Whole volume behind the near plane: the light is skipped.
    if LightBoundsExtractor::view_depth_range(light).max < grid.near {
        return;
    }

    let center = light.position;
    let radius = light.range;
    let cone = light.cone.as_ref();
    let on_volume = |point: Vec3| cone.map_or(true, |cone| cone.covers_direction(point));

    for offset in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y] {
        let point = center + offset * radius;
        if on_volume(point) {
            ranges.expand_point(point);
        }
    }
    if let Some(cone) = cone {
        ranges.expand_point(cone.apex);
        for axis in [Axis::X, Axis::Y] {
            for point in rim_extremes(cone, axis) {
                ranges.expand_point(point);
            }
        }
    }

    let Some((first, last)) = ranges.clamp_rows() else {
        return;
    };

    // Silhouette generators: tangent planes parallel to the view direction.
    let sides = cone.and_then(|cone| silhouette_generators(cone, Vec3::Z));
    for plane in first..=last + 1 {
        let y = grid.row_plane(plane);
        let mut row = InclusiveRange::EMPTY;

        let offset = y - center.y;
        if offset.abs() <= radius {
            let half_width = (radius * radius - offset * offset).max(0.0).sqrt();
            for x in [center.x - half_width, center.x + half_width] {
                let point = Vec3::new(x, y, center.z);
                if on_volume(point) {
                    ranges.expand_column(&mut row, point);
                }
            }
        }

        if let Some(cone) = cone {
            for side in sides.into_iter().flatten() {
                if let Some(point) = segment_plane_point(cone.apex, side, Vec3::Y, y) {
                    ranges.expand_column(&mut row, point);
                }
            }
            for point in rim_plane_points(cone, Vec3::Y, y).into_iter().flatten() {
                ranges.expand_column(&mut row, point);
            }
            if (cone.apex.y - y).abs() <= 1.0e-5 * y.abs().max(1.0) {
                ranges.expand_column(&mut row, cone.apex);
            }
        }

        ranges.merge_plane(plane, row);
    }
}

/// Rim points furthest along `±axis`.
fn rim_extremes(cone: &SpotCone, axis: Axis) -> [Vec3; 2] {
    let unit = axis.unit();
    let lateral = unit - cone.direction * cone.direction.dot(unit);
    // Disk normal along `unit`: every rim point is an extreme.
    let lateral = lateral
        .try_normalize()
        .unwrap_or_else(|| cone.direction.any_orthonormal_vector());
    [
        cone.base_center + lateral * cone.base_radius,
        cone.base_center - lateral * cone.base_radius,
    ]
}
