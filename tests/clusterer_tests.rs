use light_cluster::{
    core::TileGrid, ClusteringMode, FrameParams, InclusiveRange, LightClusterConfig,
    LightClusterer, LightDescriptor, Mat4, ScreenTiler, Vec2, Vec3, ViewContext, EMPTY_HEADER,
};

fn perspective_view(viewport: [u32; 2]) -> ViewContext {
    ViewContext::perspective(
        Mat4::look_at_rh(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 0.0, -5.0), Vec3::Y),
        1.1,
        0.1,
        80.0,
        viewport,
        16,
    )
}

fn scene(count: usize) -> Vec<LightDescriptor> {
    (0..count)
        .map(|index| {
            let t = index as f32;
            let position = Vec3::new((t * 1.7).sin() * 6.0, (t * 0.9).cos() * 3.0, -2.0 - t * 0.8);
            if index % 3 == 0 {
                let direction = Vec3::new((t * 0.3).cos(), -0.4, (t * 0.5).sin()).normalize();
                LightDescriptor::spot(position, direction, 3.0 + (t * 0.7).sin(), 0.6)
            } else {
                LightDescriptor::point(position, 1.5 + (t * 1.3).cos())
            }
        })
        .collect()
}

/// Owned copy of one frame's output.
fn snapshot(
    clusterer: &mut LightClusterer,
    lights: &[LightDescriptor],
    view: &ViewContext,
) -> (FrameParams, Vec<u32>, Vec<u32>) {
    let output = clusterer.cull(lights, view);
    (output.params, output.zbins.to_vec(), output.tile_masks.to_vec())
}

#[test]
fn test_origin_light_covers_centered_tiles() {
    // 256x144 viewport with 16 px tiles: a 16x9 grid, one view unit per tile.
    let view = ViewContext::orthographic(Mat4::IDENTITY, 4.5, 0.0, 10.0, [256, 144], 16);
    let grid = TileGrid::new(&view, 16);
    assert_eq!((grid.cols, grid.rows), (16, 9));

    let radius = 2.25;
    let light = LightDescriptor::point(Vec3::ZERO, radius);
    let mut ranges = vec![InclusiveRange::EMPTY; grid.ranges_per_light()];
    ScreenTiler::tile_light(&grid, &light, &mut ranges);

    let center = Vec2::new(8.0, 4.5);
    let y_range = ranges[0];
    assert_eq!(y_range, InclusiveRange::new(2, 6));
    for row in 0..grid.rows as i16 {
        let center_dy = (row as f32 + 0.5 - center.y).abs();
        assert_eq!(y_range.contains(row), center_dy <= radius, "row {row}");
    }

    let middle = ranges[1 + 4];
    for col in 0..grid.cols as i16 {
        let center_dx = (col as f32 + 0.5 - center.x).abs();
        if center_dx <= radius {
            assert!(middle.contains(col), "column {col} missing from middle row");
        }
    }
    // Tiles 5 and 10 are only grazed by the light, not at their centers; the
    // range is a superset of the center-covered columns so they stay lit.
    assert_eq!(middle, InclusiveRange::new(5, 10));

    // Rows outside the Y range stay empty.
    assert!(ranges[1].is_empty());
    assert!(ranges[1 + 8].is_empty());
}

#[test]
fn test_spot_behind_near_plane_sets_no_bits() {
    let view = ViewContext::perspective(Mat4::IDENTITY, 1.0, 0.5, 50.0, [320, 180], 16);
    let behind = LightDescriptor::spot(Vec3::new(0.0, 0.0, 3.0), Vec3::Z, 2.0, 0.5);
    let grazing = LightDescriptor::spot(Vec3::new(0.0, 0.0, 2.6), Vec3::NEG_Z, 2.0, 0.5);

    let grid = TileGrid::new(&view, 16);
    for light in [behind, grazing] {
        let mut ranges = vec![InclusiveRange::new(0, 0); grid.ranges_per_light()];
        ScreenTiler::tile_light(&grid, &light, &mut ranges);
        assert!(ranges.iter().all(InclusiveRange::is_empty));
    }

    let mut clusterer = LightClusterer::new(LightClusterConfig::default());
    let output = clusterer.cull(&[behind, grazing], &view);
    assert!(output.tile_masks.iter().all(|&word| word == 0));
    let stride = 1 + output.params.words_per_tile as usize;
    for bin in output.zbins.chunks_exact(stride) {
        assert_eq!(bin[0], EMPTY_HEADER);
        assert!(bin[1..].iter().all(|&word| word == 0));
    }
}

#[test]
fn test_excess_lights_are_truncated() {
    let config = LightClusterConfig {
        max_lights: 32,
        ..Default::default()
    };
    let view = perspective_view([320, 180]);
    let lights = scene(40);

    let mut reference = LightClusterer::new(config.clone());
    let expected = snapshot(&mut reference, &lights[..32], &view);

    let mut clusterer = LightClusterer::new(config);
    let (params, zbins, masks) = snapshot(&mut clusterer, &lights, &view);
    assert_eq!(params.light_count, 32);
    assert_eq!(clusterer.profiler().dropped_light_count, 8);
    assert_eq!((params, zbins, masks), expected);
}

#[test]
fn test_buffers_are_recycled_between_frames() {
    let view = perspective_view([320, 180]);
    let dense = scene(60);
    let sparse = scene(5);

    let mut clusterer = LightClusterer::new(LightClusterConfig::default());
    let first = snapshot(&mut clusterer, &dense, &view);
    let _ = snapshot(&mut clusterer, &sparse, &view);
    let again = snapshot(&mut clusterer, &dense, &view);
    assert_eq!(first, again);

    // Stale bits from the dense frame must not leak into the sparse one.
    let sparse_frame = snapshot(&mut clusterer, &sparse, &view);
    let mut fresh = LightClusterer::new(LightClusterConfig::default());
    assert_eq!(sparse_frame, snapshot(&mut fresh, &sparse, &view));
}

#[test]
fn test_viewport_and_capacity_changes() {
    let lights = scene(30);
    let small = perspective_view([320, 180]);
    let large = perspective_view([1280, 720]);

    let mut clusterer = LightClusterer::new(LightClusterConfig::default());
    let _ = snapshot(&mut clusterer, &lights, &large);
    let small_frame = snapshot(&mut clusterer, &lights, &small);
    let mut fresh = LightClusterer::new(LightClusterConfig::default());
    assert_eq!(small_frame, snapshot(&mut fresh, &lights, &small));

    let bigger = LightClusterConfig {
        max_lights: 512,
        max_zbin_words: 8192,
        max_tile_words: 65536,
        ..Default::default()
    };
    clusterer.set_config(bigger.clone());
    let resized = snapshot(&mut clusterer, &lights, &large);
    assert_eq!(resized.0.words_per_tile, 16);
    let mut fresh = LightClusterer::new(bigger);
    assert_eq!(resized, snapshot(&mut fresh, &lights, &large));
}

#[test]
fn test_tile_width_widens_to_fit_word_budget() {
    let config = LightClusterConfig {
        max_tile_words: 2048,
        ..Default::default()
    };
    let mut clusterer = LightClusterer::new(config);
    let view = perspective_view([1920, 1080]);
    let output = clusterer.cull(&scene(10), &view);
    let params = output.params;
    assert!(params.tile_width > 16);
    let tiles = (params.tile_resolution[0] * params.tile_resolution[1]) as usize;
    assert!(tiles * params.words_per_tile as usize <= 2048);
    assert_eq!(output.tile_masks.len(), tiles * params.words_per_tile as usize);
}

#[test]
fn test_parallel_matches_sequential() {
    let view = perspective_view([640, 360]);
    let lights = scene(120);

    let mut clusterer = LightClusterer::new(LightClusterConfig::default());
    clusterer.set_parallel_enabled(false);
    let sequential = snapshot(&mut clusterer, &lights, &view);
    clusterer.set_parallel_enabled(true);
    let parallel = snapshot(&mut clusterer, &lights, &view);
    assert_eq!(sequential, parallel);

    let pooled_config = LightClusterConfig {
        worker_threads: 3,
        ..Default::default()
    };
    let mut pooled = LightClusterer::new(pooled_config);
    assert_eq!(snapshot(&mut pooled, &lights, &view), sequential);
}

#[test]
fn test_brute_force_mode_skips_buffers() {
    let config = LightClusterConfig {
        mode: ClusteringMode::BruteForce,
        max_lights: 16,
        ..Default::default()
    };
    let mut clusterer = LightClusterer::new(config);
    let output = clusterer.cull(&scene(20), &perspective_view([320, 180]));
    assert!(output.params.is_brute_force());
    assert_eq!(output.params.light_count, 16);
    assert!(output.zbins.is_empty());
    assert!(output.tile_masks.is_empty());
    assert_eq!(output.lights_for_fragment(Vec2::new(10.0, 10.0), 3.0).len(), 16);
}

#[test]
fn test_profiler_records_last_frame() {
    let mut clusterer = LightClusterer::new(LightClusterConfig::default());
    let _ = clusterer.cull(&scene(12), &perspective_view([320, 180]));
    let profiler = clusterer.profiler();
    assert_eq!(profiler.light_count, 12);
    assert_eq!(profiler.dropped_light_count, 0);
    assert_eq!(profiler.tile_count, 20 * 12);
    assert_eq!(profiler.tile_width, 16);
    assert!(profiler.total_frame_time >= profiler.expansion_time);
}

#[test]
fn test_clusterer_is_send_and_sync() {
    fn assert_sync_send<T: Sync + Send>() {}
    assert_sync_send::<LightClusterer>();
    assert_sync_send::<LightClusterConfig>();
    assert_sync_send::<FrameParams>();
}
