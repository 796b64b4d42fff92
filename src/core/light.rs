use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

/// Spot half-angles outside this margin of `(0, π/2)` are bounded by their sphere.
const HALF_ANGLE_MARGIN: f32 = 1.0e-4;

/// Light shapes handled by the clusterer. Directional lights are global and never binned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Point,
    Spot,
}

/// Per-frame description of a visible light in world space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightDescriptor {
    pub kind: LightKind,
    pub position: Vec3,
    /// Spot axis; ignored for point lights.
    pub direction: Vec3,
    pub range: f32,
    /// Outer half-angle of the spot cone in radians; ignored for point lights.
    pub spot_half_angle: f32,
}

impl LightDescriptor {
    pub fn point(position: Vec3, range: f32) -> Self {
        Self {
            kind: LightKind::Point,
            position,
            direction: Vec3::NEG_Z,
            range,
            spot_half_angle: 0.0,
        }
    }

    pub fn spot(position: Vec3, direction: Vec3, range: f32, half_angle: f32) -> Self {
        Self {
            kind: LightKind::Spot,
            position,
            direction,
            range,
            spot_half_angle: half_angle,
        }
    }

    /// Transforms the light into clustering view space: x right, y up, z = depth
    /// in front of the camera. `view` is a right-handed world-to-view matrix.
    ///
    /// Returns `None` for lights that cannot light anything (non-finite position,
    /// zero or non-finite range); callers skip them.
    pub fn to_view(&self, view: &Mat4) -> Option<ViewLight> {
        if !self.position.is_finite() || !self.range.is_finite() || self.range <= 0.0 {
            return None;
        }

        let mut position = view.transform_point3(self.position);
        position.z = -position.z;
        if !position.is_finite() {
            return None;
        }

        let cone = match self.kind {
            LightKind::Point => None,
            LightKind::Spot => {
                let mut direction = view.transform_vector3(self.direction).normalize_or_zero();
                direction.z = -direction.z;
                SpotCone::new(position, direction, self.range, self.spot_half_angle)
            }
        };

        Some(ViewLight {
            position,
            range: self.range,
            cone,
        })
    }
}

/// Light volume in clustering view space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewLight {
    pub position: Vec3,
    pub range: f32,
    /// `None` for point lights and for spots bounded by their sphere.
    pub cone: Option<SpotCone>,
}

impl ViewLight {
    pub fn sphere(position: Vec3, range: f32) -> Self {
        Self {
            position,
            range,
            cone: None,
        }
    }
}

/// Finite cone of a spot light, capped by the sphere of radius `range` around the apex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotCone {
    pub apex: Vec3,
    /// Unit axis.
    pub direction: Vec3,
    pub range: f32,
    pub cos_half_angle: f32,
    pub sin_half_angle: f32,
    /// Distance from the apex to the end-disk center along the axis.
    pub height: f32,
    pub base_center: Vec3,
    pub base_radius: f32,
}

impl SpotCone {
    /// Returns `None` when the cone degenerates (zero-length axis, half-angle not
    /// strictly inside `(0, π/2)`); the light is then bounded by its sphere, which
    /// contains every spot volume.
    pub fn new(apex: Vec3, direction: Vec3, range: f32, half_angle: f32) -> Option<Self> {
        if direction == Vec3::ZERO
            || !half_angle.is_finite()
            || half_angle <= HALF_ANGLE_MARGIN
            || half_angle >= std::f32::consts::FRAC_PI_2 - HALF_ANGLE_MARGIN
        {
            return None;
        }

        let (sin_half_angle, cos_half_angle) = half_angle.sin_cos();
        let height = range * cos_half_angle;
        Some(Self {
            apex,
            direction,
            range,
            cos_half_angle,
            sin_half_angle,
            height,
            base_center: apex + direction * height,
            base_radius: range * sin_half_angle,
        })
    }

    /// Direction of the generator at angle `theta` around the axis, for the basis `(u, v)`.
    pub fn generator(&self, u: Vec3, v: Vec3, theta: f32) -> Vec3 {
        let (sin, cos) = theta.sin_cos();
        self.direction * self.cos_half_angle + (u * cos + v * sin) * self.sin_half_angle
    }

    /// True if `point` lies inside the cone's solid angle. Points on the cap sphere
    /// use this to decide whether they belong to the spot volume.
    pub fn covers_direction(&self, point: Vec3) -> bool {
        let offset = point - self.apex;
        offset.dot(self.direction) >= offset.length() * self.cos_half_angle - 1.0e-4 * self.range
    }

    /// True if `point` lies inside the capped cone.
    pub fn contains(&self, point: Vec3) -> bool {
        let offset = point - self.apex;
        let distance = offset.length();
        distance <= self.range && offset.dot(self.direction) >= distance * self.cos_half_angle
    }
}
