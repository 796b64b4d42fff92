//! Screen tiling: per light, the covered tile rows and, for each row, the covered columns.
//!
//! Each light owns `1 + rows` consecutive [`InclusiveRange`]s of the range
//! buffer: its Y range, then one X range per tile row. Ranges are built from
//! candidate points of the light volume's silhouette. Points that are global
//! extremes of the projected volume expand the Y range and the X range of the
//! row they fall in. Afterwards every row boundary plane inside the Y range is
//! intersected with the volume, and the X extremes of that cross-section are
//! merged into the two rows sharing the boundary. The projection of a light
//! volume is convex, so the X extent of a row is attained either on one of its
//! boundaries or at a global X extreme; both are covered.

mod orthographic;
mod perspective;

use glam::{Vec2, Vec3};

use crate::{
    core::{tile_index, InclusiveRange, LightDescriptor, SpotCone, TileGrid},
    utils::{math::solve_trig, parallel},
};

/// Computes conservative tile ranges for point and spot lights.
pub struct ScreenTiler;

impl ScreenTiler {
    /// Fills the range buffer for `lights`, one task per light. Each task only
    /// writes the `grid.ranges_per_light()` ranges owned by its light.
    pub fn tile(
        grid: &TileGrid,
        lights: &[LightDescriptor],
        ranges: &mut [InclusiveRange],
        parallel: bool,
    ) {
        let per_light = grid.ranges_per_light();
        let used = (lights.len() * per_light).min(ranges.len());
        parallel::for_each_chunk_mut(&mut ranges[..used], per_light, parallel, |index, out| {
            Self::tile_light(grid, &lights[index], out);
        });
    }

    /// Writes the Y range to `out[0]` and the per-row X ranges to `out[1..]`.
    /// Lights that fail the validity tests leave every range empty.
    pub fn tile_light(grid: &TileGrid, light: &LightDescriptor, out: &mut [InclusiveRange]) {
        out.fill(InclusiveRange::EMPTY);
        let Some((y_range, rows)) = out.split_first_mut() else {
            return;
        };
        // Zero range or non-finite position: nothing to light.
        let Some(view_light) = light.to_view(&grid.view) else {
            return;
        };

        let mut ranges = LightRanges::new(grid, rows);
        if grid.orthographic {
            orthographic::tile_light(&mut ranges, &view_light);
        } else {
            perspective::tile_light(&mut ranges, &view_light);
        }
        *y_range = ranges.finish();
    }
}

/// Range accumulator of one light.
pub(crate) struct LightRanges<'a> {
    grid: &'a TileGrid,
    y: InclusiveRange,
    rows: &'a mut [InclusiveRange],
}

impl<'a> LightRanges<'a> {
    fn new(grid: &'a TileGrid, rows: &'a mut [InclusiveRange]) -> Self {
        Self {
            grid,
            y: InclusiveRange::EMPTY,
            rows,
        }
    }

    /// Adds a point of the volume to the Y range and to the X range of its row.
    fn expand_point(&mut self, point: Vec3) {
        let tile = self.grid.to_tile(point);
        if !tile.is_finite() {
            return;
        }
        let row = tile_index(tile.y);
        self.y.expand(row);
        if let Some(range) = usize::try_from(row).ok().and_then(|row| self.rows.get_mut(row)) {
            range.expand(tile_index(tile.x));
        }
    }

    /// Adds the column of a cross-section point to a plane range.
    fn expand_column(&self, range: &mut InclusiveRange, point: Vec3) {
        let tile = self.grid.to_tile(point);
        if tile.x.is_finite() {
            range.expand(tile_index(tile.x));
        }
    }

    /// Clamps the Y range to the grid; `None` if the light misses every row.
    fn clamp_rows(&mut self) -> Option<(i32, i32)> {
        self.y.clamp(0, self.grid.max_row());
        if self.y.is_empty() {
            None
        } else {
            Some((self.y.start as i32, self.y.end as i32))
        }
    }

    /// Merges a boundary-plane range into the rows below and above plane `index`.
    fn merge_plane(&mut self, index: i32, range: InclusiveRange) {
        if range.is_empty() {
            return;
        }
        for row in [index - 1, index] {
            if row >= self.y.start as i32 && row <= self.y.end as i32 {
                let slot = &mut self.rows[row as usize];
                *slot = InclusiveRange::merge(*slot, range);
            }
        }
    }

    /// Clamps every row to the grid and returns the Y range.
    fn finish(self) -> InclusiveRange {
        let mut y = self.y;
        y.clamp(0, self.grid.max_row());
        let max_col = self.grid.max_col();
        for (row, range) in self.rows.iter_mut().enumerate() {
            if y.contains(row as i16) {
                range.clamp(0, max_col);
            } else {
                *range = InclusiveRange::EMPTY;
            }
        }
        y
    }
}

/// Screen axis whose extremes a silhouette computation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Axis {
    X,
    Y,
}

impl Axis {
    fn lateral(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    fn unit(self) -> Vec3 {
        match self {
            Axis::X => Vec3::X,
            Axis::Y => Vec3::Y,
        }
    }

    /// Axis dropped when projecting onto the `(lateral, z)` plane.
    fn dropped(self) -> Vec3 {
        match self {
            Axis::X => Vec3::Y,
            Axis::Y => Vec3::X,
        }
    }

    /// `(lateral, z)` coordinates.
    fn project(self, v: Vec3) -> Vec2 {
        Vec2::new(self.lateral(v), v.z)
    }

    /// Rebuilds a 3-D point from `(lateral, z)`, taking the dropped coordinate from `anchor`.
    fn lift(self, p: Vec2, anchor: Vec3) -> Vec3 {
        match self {
            Axis::X => Vec3::new(p.x, anchor.y, p.y),
            Axis::Y => Vec3::new(anchor.x, p.x, p.y),
        }
    }
}

/// Orthonormal basis of the spot's end disk whose first vector has no
/// component along `axis.dropped()`, so projecting the disk onto the
/// `(lateral, z)` plane yields an ellipse with perpendicular semi-axes.
fn rim_basis(cone: &SpotCone, axis: Axis) -> (Vec3, Vec3) {
    let cross = cone.direction.cross(axis.dropped());
    let u = if cross.length_squared() > 1.0e-12 {
        cross.normalize()
    } else {
        axis.unit()
    };
    (u, cone.direction.cross(u))
}

/// Generators along which the cone's tangent plane contains `eye`: the
/// camera offset `-apex` for perspective views, the view direction for
/// orthographic ones. Returned as apex-to-rim vectors.
///
/// `None` when no such plane exists, i.e. the eye direction lies inside the
/// cone or its mirror; the cone then has no side silhouette.
fn silhouette_generators(cone: &SpotCone, eye: Vec3) -> Option<[Vec3; 2]> {
    let (u, v) = cone.direction.any_orthonormal_pair();
    let roots = solve_trig(
        cone.cos_half_angle * u.dot(eye),
        cone.cos_half_angle * v.dot(eye),
        cone.sin_half_angle * cone.direction.dot(eye),
    )?;
    Some(roots.map(|theta| cone.generator(u, v, theta) * cone.range))
}

/// Rim points of the spot's end disk cut by the plane `normal · p = offset`.
fn rim_plane_points(cone: &SpotCone, normal: Vec3, offset: f32) -> Option<[Vec3; 2]> {
    let (u, v) = cone.direction.any_orthonormal_pair();
    crate::utils::math::circle_plane_intersection(
        cone.base_center,
        u,
        v,
        cone.base_radius,
        normal,
        offset,
    )
}

/// Point where the segment `origin + t·segment`, `t ∈ [0, 1]`, crosses the
/// plane `normal · p = offset`.
fn segment_plane_point(origin: Vec3, segment: Vec3, normal: Vec3, offset: f32) -> Option<Vec3> {
    let denom = normal.dot(segment);
    if !(denom.abs() > 1.0e-9) {
        return None;
    }
    let t = (offset - normal.dot(origin)) / denom;
    (0.0..=1.0).contains(&t).then(|| origin + segment * t)
}
