use light_cluster::{
    core::ViewLight, LightClusterConfig, LightClusterer, LightDescriptor, Mat4, ProjectionKind,
    Vec2, Vec3, ViewContext,
};

/// Samples per tile edge when casting reference rays.
const TILE_SAMPLES: u32 = 4;
/// Depth samples along the covered part of each ray.
const DEPTH_SAMPLES: u32 = 24;

/// Small deterministic generator so scenes are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> f32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 40) as f32 / (1u64 << 24) as f32
    }

    fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next()
    }

    fn direction(&mut self) -> Vec3 {
        loop {
            let v = Vec3::new(
                self.range(-1.0, 1.0),
                self.range(-1.0, 1.0),
                self.range(-1.0, 1.0),
            );
            if v.length_squared() > 0.05 && v.length_squared() <= 1.0 {
                return v.normalize();
            }
        }
    }
}

fn random_lights(seed: u64, count: usize, camera: Vec3) -> Vec<LightDescriptor> {
    let mut rng = Lcg(seed);
    (0..count)
        .map(|index| {
            let position = camera
                + Vec3::new(
                    rng.range(-9.0, 9.0),
                    rng.range(-5.0, 5.0),
                    rng.range(-22.0, 3.0),
                );
            let range = rng.range(0.5, 5.0);
            if index % 2 == 0 {
                LightDescriptor::point(position, range)
            } else {
                LightDescriptor::spot(position, rng.direction(), range, rng.range(0.15, 1.3))
            }
        })
        .collect()
}

/// Lights placed to cut the near plane in various ways.
fn near_plane_lights(camera: Vec3, near: f32) -> Vec<LightDescriptor> {
    let forward = Vec3::NEG_Z;
    vec![
        // Sphere around the camera.
        LightDescriptor::point(camera + Vec3::new(0.3, -0.2, 0.5), 2.0),
        // Sphere cut by the near plane off to the side.
        LightDescriptor::point(camera + Vec3::new(2.0, 1.0, -near), 2.5),
        // Apex behind the camera, pointing forward and sideways.
        LightDescriptor::spot(
            camera + Vec3::new(1.0, 0.5, 1.5),
            (forward + Vec3::new(0.4, -0.2, 0.0)).normalize(),
            6.0,
            0.5,
        ),
        // Sideways spot sweeping across the near plane.
        LightDescriptor::spot(camera + Vec3::new(-3.0, -0.5, -near * 0.5), Vec3::X, 5.0, 0.7),
        // Spot pointing back at the camera from in front.
        LightDescriptor::spot(camera + Vec3::new(0.5, 0.5, -4.0), Vec3::Z, 5.0, 0.4),
        // Spot behind the camera, mostly pointing up but grazing the near plane.
        LightDescriptor::spot(
            camera + Vec3::new(0.0, -2.0, 0.3),
            Vec3::new(0.0, 1.0, -0.3).normalize(),
            4.0,
            0.9,
        ),
    ]
}

/// True if `point` lies in a slightly shrunken light volume, so points on the
/// exact boundary do not depend on rounding.
fn inside_eroded(light: &ViewLight, point: Vec3) -> bool {
    let offset = point - light.position;
    let distance = offset.length();
    if distance > light.range * 0.995 {
        return false;
    }
    match &light.cone {
        None => true,
        Some(cone) => {
            let half_angle = cone.sin_half_angle.atan2(cone.cos_half_angle);
            offset.dot(cone.direction) >= distance * (half_angle * 0.98).cos()
        }
    }
}

/// Depth interval along a ray `origin + z·dir` where the eroded sphere lies.
fn sphere_interval(light: &ViewLight, origin: Vec3, dir: Vec3) -> Option<(f32, f32)> {
    let radius = light.range * 0.995;
    let to_origin = origin - light.position;
    let a = dir.length_squared();
    let b = 2.0 * dir.dot(to_origin);
    let c = to_origin.length_squared() - radius * radius;
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let root = disc.sqrt();
    Some(((-b - root) / (2.0 * a), (-b + root) / (2.0 * a)))
}

/// Casts a grid of rays per tile and checks that every sampled fragment inside
/// a light volume lists that light.
fn assert_sound(view: &ViewContext, lights: &[LightDescriptor]) -> usize {
    let config = LightClusterConfig::default();
    let mut clusterer = LightClusterer::new(config);
    let output = clusterer.cull(lights, view);
    let params = output.params;
    let view_lights: Vec<Option<ViewLight>> =
        lights.iter().map(|light| light.to_view(&view.view)).collect();

    let near = view.culling_near().max(1.0e-3) * 1.01;
    let far = view.far * 0.99;
    let viewport = Vec2::new(view.viewport[0] as f32, view.viewport[1] as f32);
    let tile_width = params.tile_width as f32;
    let mut hits = 0;

    for row in 0..params.tile_resolution[1] {
        for col in 0..params.tile_resolution[0] {
            for sy in 0..TILE_SAMPLES {
                for sx in 0..TILE_SAMPLES {
                    let pixel = Vec2::new(
                        (col as f32 + (sx as f32 + 0.5) / TILE_SAMPLES as f32) * tile_width,
                        (row as f32 + (sy as f32 + 0.5) / TILE_SAMPLES as f32) * tile_width,
                    );
                    if pixel.x >= viewport.x || pixel.y >= viewport.y {
                        continue;
                    }
                    let plane = view.view_plane_bottom
                        + (view.view_plane_top - view.view_plane_bottom) * (pixel / viewport);
                    // Ray as `origin + z·dir`, parameterized by view depth.
                    let (origin, dir) = if view.is_orthographic() {
                        (plane.extend(0.0), Vec3::Z)
                    } else {
                        (Vec3::ZERO, plane.extend(1.0))
                    };

                    for (index, light) in view_lights.iter().enumerate() {
                        let Some(light) = light else { continue };
                        let Some((enter, exit)) = sphere_interval(light, origin, dir) else {
                            continue;
                        };
                        let (enter, exit) = (enter.max(near), exit.min(far));
                        if enter > exit {
                            continue;
                        }
                        for step in 0..=DEPTH_SAMPLES {
                            let depth = enter + (exit - enter) * step as f32 / DEPTH_SAMPLES as f32;
                            let point = origin + dir * depth;
                            if !inside_eroded(light, point) {
                                continue;
                            }
                            hits += 1;
                            let listed = output.lights_for_fragment(pixel, depth);
                            assert!(
                                listed.contains(&index),
                                "light {index} ({:?}) missing at pixel {pixel:?} depth {depth}",
                                lights[index]
                            );
                        }
                    }
                }
            }
        }
    }
    hits
}

#[test]
fn test_perspective_random_scene_is_sound() {
    let camera = Vec3::new(0.0, 1.0, 6.0);
    let view = ViewContext::perspective(
        Mat4::look_at_rh(camera, Vec3::new(0.0, 0.0, -4.0), Vec3::Y),
        1.0,
        0.5,
        60.0,
        [320, 180],
        16,
    );
    let lights = random_lights(7, 48, camera);
    assert!(assert_sound(&view, &lights) > 0);
}

#[test]
fn test_perspective_near_plane_lights_are_sound() {
    let camera = Vec3::ZERO;
    for near in [0.05, 0.5, 1.5] {
        let view = ViewContext::perspective(Mat4::IDENTITY, 1.2, near, 40.0, [256, 160], 16);
        let lights = near_plane_lights(camera, near);
        assert!(assert_sound(&view, &lights) > 0);
    }
}

#[test]
fn test_wide_tiles_and_rotated_camera_are_sound() {
    let camera = Vec3::new(4.0, -2.0, 3.0);
    let view = ViewContext::perspective(
        Mat4::look_at_rh(camera, Vec3::new(-3.0, 1.0, -10.0), Vec3::new(0.2, 1.0, 0.0).normalize()),
        1.4,
        0.2,
        80.0,
        [300, 200],
        64,
    );
    let mut lights = random_lights(99, 40, camera);
    lights.extend(near_plane_lights(camera, 0.2));
    assert!(assert_sound(&view, &lights) > 0);
}

#[test]
fn test_off_center_frustum_is_sound() {
    let camera = Vec3::new(0.0, 0.0, 4.0);
    let view = ViewContext::new(
        Mat4::look_at_rh(camera, Vec3::ZERO, Vec3::Y),
        ProjectionKind::Perspective,
        0.3,
        50.0,
        [240, 160],
        16,
        Vec2::new(-0.5, -0.45),
        Vec2::new(0.9, 0.35),
    );
    let lights = random_lights(1234, 40, camera);
    assert!(assert_sound(&view, &lights) > 0);
}

#[test]
fn test_orthographic_random_scene_is_sound() {
    let camera = Vec3::new(0.0, 0.0, 8.0);
    let view = ViewContext::orthographic(
        Mat4::look_at_rh(camera, Vec3::new(1.0, -1.0, 0.0), Vec3::Y),
        6.0,
        0.1,
        40.0,
        [320, 200],
        16,
    );
    let mut lights = random_lights(42, 48, camera);
    lights.extend(near_plane_lights(camera, 0.1));
    assert!(assert_sound(&view, &lights) > 0);
}
