//! Per-light view-space depth intervals.

use glam::Mat4;

use crate::{
    core::{DepthRange, LightDescriptor, ViewLight},
    utils::parallel,
};

/// Computes the depth interval each light volume occupies in front of the camera.
pub struct LightBoundsExtractor;

impl LightBoundsExtractor {
    /// Depth interval of one world-space light; empty for lights that are skipped.
    pub fn depth_range(light: &LightDescriptor, view: &Mat4) -> DepthRange {
        match light.to_view(view) {
            Some(view_light) => Self::view_depth_range(&view_light),
            None => DepthRange::EMPTY,
        }
    }

    /// Depth interval of a light already in view space.
    ///
    /// Spots are bounded exactly: the sphere extreme along ±Z only belongs to
    /// the volume when that direction lies inside the cone; otherwise the extreme
    /// sits on the end-disk rim or at the apex.
    pub fn view_depth_range(light: &ViewLight) -> DepthRange {
        let center_z = light.position.z;
        let mut min = center_z - light.range;
        let mut max = center_z + light.range;

        if let Some(cone) = &light.cone {
            let axis = cone.direction;
            // Half-extent along Z of a disk whose normal is `axis`.
            let disk_extent = cone.base_radius * (1.0 - axis.z * axis.z).max(0.0).sqrt();
            if -axis.z < cone.cos_half_angle {
                min = center_z.min(cone.base_center.z - disk_extent);
            }
            if axis.z < cone.cos_half_angle {
                max = center_z.max(cone.base_center.z + disk_extent);
            }
        }

        DepthRange::new(min, max)
    }

    /// Fills `out[i]` with the depth interval of `lights[i]`, one task per light.
    pub fn extract(
        lights: &[LightDescriptor],
        view: &Mat4,
        out: &mut [DepthRange],
        parallel: bool,
    ) {
        let count = lights.len().min(out.len());
        parallel::for_each_mut(&mut out[..count], parallel, |index, range| {
            *range = Self::depth_range(&lights[index], view);
        });
    }
}
