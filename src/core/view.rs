use glam::{Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::MIN_PERSPECTIVE_NEAR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectionKind {
    Perspective,
    Orthographic,
}

/// Camera parameters consumed by one culling pass.
///
/// The view-plane bounds describe the visible rectangle: at depth 1 for
/// perspective cameras, in view-space units for orthographic ones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewContext {
    /// Right-handed world-to-view matrix (camera looks down −Z).
    pub view: Mat4,
    pub projection: ProjectionKind,
    pub near: f32,
    pub far: f32,
    pub viewport: [u32; 2],
    /// Requested tile width in pixels; widened if the grid overflows the word budget.
    pub tile_width: u32,
    pub view_plane_bottom: Vec2,
    pub view_plane_top: Vec2,
}

impl ViewContext {
    /// # Panics
    /// Panics on an empty viewport, a zero tile width, `far <= near` or an empty view rectangle.
    pub fn new(
        view: Mat4,
        projection: ProjectionKind,
        near: f32,
        far: f32,
        viewport: [u32; 2],
        tile_width: u32,
        view_plane_bottom: Vec2,
        view_plane_top: Vec2,
    ) -> Self {
        assert!(viewport[0] > 0 && viewport[1] > 0, "viewport must not be empty");
        assert!(tile_width > 0, "tile width must be positive");
        assert!(far > near, "far plane {far} must lie beyond near plane {near}");
        assert!(
            view_plane_top.x > view_plane_bottom.x && view_plane_top.y > view_plane_bottom.y,
            "view rectangle must not be empty"
        );
        Self {
            view,
            projection,
            near,
            far,
            viewport,
            tile_width,
            view_plane_bottom,
            view_plane_top,
        }
    }

    /// Symmetric perspective camera with vertical field of view `fov_y` (radians).
    pub fn perspective(
        view: Mat4,
        fov_y: f32,
        near: f32,
        far: f32,
        viewport: [u32; 2],
        tile_width: u32,
    ) -> Self {
        let half_height = (fov_y * 0.5).tan();
        let top = Vec2::new(half_height * aspect(viewport), half_height);
        Self::new(
            view,
            ProjectionKind::Perspective,
            near,
            far,
            viewport,
            tile_width,
            -top,
            top,
        )
    }

    /// Symmetric orthographic camera `2 * half_height` view units tall.
    pub fn orthographic(
        view: Mat4,
        half_height: f32,
        near: f32,
        far: f32,
        viewport: [u32; 2],
        tile_width: u32,
    ) -> Self {
        let top = Vec2::new(half_height * aspect(viewport), half_height);
        Self::new(
            view,
            ProjectionKind::Orthographic,
            near,
            far,
            viewport,
            tile_width,
            -top,
            top,
        )
    }

    /// Derives the view rectangle from a right-handed glam projection matrix
    /// (`Mat4::perspective_rh`, `Mat4::orthographic_rh` or off-center variants).
    pub fn from_projection(
        view: Mat4,
        projection: Mat4,
        near: f32,
        far: f32,
        viewport: [u32; 2],
        tile_width: u32,
    ) -> Self {
        let scale = Vec2::new(projection.x_axis.x, projection.y_axis.y);
        if projection.w_axis.w == 1.0 {
            let bias = Vec2::new(projection.w_axis.x, projection.w_axis.y);
            Self::new(
                view,
                ProjectionKind::Orthographic,
                near,
                far,
                viewport,
                tile_width,
                (Vec2::NEG_ONE - bias) / scale,
                (Vec2::ONE - bias) / scale,
            )
        } else {
            let skew = Vec2::new(projection.z_axis.x, projection.z_axis.y);
            Self::new(
                view,
                ProjectionKind::Perspective,
                near,
                far,
                viewport,
                tile_width,
                (skew - Vec2::ONE) / scale,
                (skew + Vec2::ONE) / scale,
            )
        }
    }

    pub fn is_orthographic(&self) -> bool {
        self.projection == ProjectionKind::Orthographic
    }

    /// Near distance used by the culling math; a zero perspective near plane is
    /// replaced by [`MIN_PERSPECTIVE_NEAR`].
    pub fn culling_near(&self) -> f32 {
        if self.is_orthographic() {
            self.near
        } else {
            self.near.max(MIN_PERSPECTIVE_NEAR)
        }
    }
}

fn aspect(viewport: [u32; 2]) -> f32 {
    viewport[0] as f32 / viewport[1] as f32
}

/// Tile-space transform for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileGrid {
    pub view: Mat4,
    pub orthographic: bool,
    pub near: f32,
    pub tile_width: u32,
    pub cols: usize,
    pub rows: usize,
    /// Viewport size in tiles, fractional for partial edge tiles.
    pub tile_scale: Vec2,
    pub view_plane_bottom: Vec2,
    pub view_plane_top: Vec2,
}

impl TileGrid {
    /// # Panics
    /// Panics if the grid has more rows or columns than a tile range can index.
    pub fn new(view: &ViewContext, tile_width: u32) -> Self {
        assert!(tile_width > 0, "tile width must be positive");
        let cols = view.viewport[0].div_ceil(tile_width) as usize;
        let rows = view.viewport[1].div_ceil(tile_width) as usize;
        assert!(
            cols <= i16::MAX as usize && rows <= i16::MAX as usize,
            "tile grid {cols}x{rows} exceeds 16-bit tile ranges"
        );
        Self {
            view: view.view,
            orthographic: view.is_orthographic(),
            near: view.culling_near(),
            tile_width,
            cols,
            rows,
            tile_scale: Vec2::new(view.viewport[0] as f32, view.viewport[1] as f32)
                / tile_width as f32,
            view_plane_bottom: view.view_plane_bottom,
            view_plane_top: view.view_plane_top,
        }
    }

    pub fn tile_count(&self) -> usize {
        self.cols * self.rows
    }

    /// Ranges stored per light: one Y range, then one X range per row.
    pub fn ranges_per_light(&self) -> usize {
        1 + self.rows
    }

    pub fn max_col(&self) -> i16 {
        self.cols as i16 - 1
    }

    pub fn max_row(&self) -> i16 {
        self.rows as i16 - 1
    }

    /// Continuous tile-space coordinate of a view-space point; integer parts are tile indices.
    pub fn to_tile(&self, point: Vec3) -> Vec2 {
        let plane = if self.orthographic {
            point.truncate()
        } else {
            point.truncate() / point.z
        };
        (plane - self.view_plane_bottom) / (self.view_plane_top - self.view_plane_bottom)
            * self.tile_scale
    }

    /// View-plane y of the boundary below row `index` (at depth 1 for perspective).
    pub fn row_plane(&self, index: i32) -> f32 {
        let bottom = self.view_plane_bottom.y;
        let top = self.view_plane_top.y;
        bottom + (top - bottom) * (index as f32 / self.tile_scale.y)
    }
}

/// Integer tile index of a continuous tile coordinate, saturated to the `i16` range.
pub fn tile_index(coordinate: f32) -> i16 {
    coordinate.floor().clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_matrix_bounds_match_symmetric_constructors() {
        let fov = 1.0f32;
        let viewport = [1280, 720];
        let aspect = 1280.0 / 720.0;
        let from_matrix = ViewContext::from_projection(
            Mat4::IDENTITY,
            Mat4::perspective_rh(fov, aspect, 0.1, 100.0),
            0.1,
            100.0,
            viewport,
            16,
        );
        let direct = ViewContext::perspective(Mat4::IDENTITY, fov, 0.1, 100.0, viewport, 16);
        assert_eq!(from_matrix.projection, ProjectionKind::Perspective);
        assert_relative_eq!(from_matrix.view_plane_top.x, direct.view_plane_top.x, epsilon = 1e-5);
        assert_relative_eq!(from_matrix.view_plane_top.y, direct.view_plane_top.y, epsilon = 1e-5);
        assert_relative_eq!(
            from_matrix.view_plane_bottom.y,
            direct.view_plane_bottom.y,
            epsilon = 1e-5
        );

        let ortho = ViewContext::from_projection(
            Mat4::IDENTITY,
            Mat4::orthographic_rh(-8.0, 8.0, -4.5, 4.5, 0.0, 50.0),
            0.0,
            50.0,
            [256, 144],
            16,
        );
        assert!(ortho.is_orthographic());
        assert_relative_eq!(ortho.view_plane_bottom.x, -8.0, epsilon = 1e-5);
        assert_relative_eq!(ortho.view_plane_top.y, 4.5, epsilon = 1e-5);
    }

    #[test]
    fn tile_space_maps_view_rectangle_onto_grid() {
        let view = ViewContext::orthographic(Mat4::IDENTITY, 4.5, 0.0, 10.0, [256, 144], 16);
        let grid = TileGrid::new(&view, 16);
        assert_eq!((grid.cols, grid.rows), (16, 9));
        let center = grid.to_tile(Vec3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(center.x, 8.0, epsilon = 1e-5);
        assert_relative_eq!(center.y, 4.5, epsilon = 1e-5);
        assert_relative_eq!(grid.row_plane(0), -4.5, epsilon = 1e-5);
        assert_relative_eq!(grid.row_plane(9), 4.5, epsilon = 1e-5);
        assert_eq!(tile_index(-0.25), -1);
        assert_eq!(tile_index(1.0e9), i16::MAX);
    }

    #[test]
    #[should_panic]
    fn zero_tile_width_is_rejected() {
        ViewContext::perspective(Mat4::IDENTITY, 1.0, 0.1, 10.0, [64, 64], 0);
    }
}
