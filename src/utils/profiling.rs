use std::time::Duration;

/// Timing and size counters of the most recent culling pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct CullingProfiler {
    pub bounds_time: Duration,
    pub binning_time: Duration,
    pub tiling_time: Duration,
    pub expansion_time: Duration,
    pub total_frame_time: Duration,

    pub light_count: usize,
    pub dropped_light_count: usize,
    pub tile_count: usize,
    pub bin_count: usize,
    pub tile_width: u32,
}

impl CullingProfiler {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn report(&self) {
        let total_us = self.total_frame_time.as_micros() as f32;
        if total_us < 1.0 {
            return;
        }

        log::info!(
            "--- Light culling: {} lights ({} dropped), {} tiles @ {} px, {} bins ---",
            self.light_count,
            self.dropped_light_count,
            self.tile_count,
            self.tile_width,
            self.bin_count
        );
        log::info!(
            "Total: {:.3} ms",
            self.total_frame_time.as_secs_f32() * 1000.0
        );
        for (label, time) in [
            ("Bounds", self.bounds_time),
            ("Binning", self.binning_time),
            ("Tiling", self.tiling_time),
            ("Expansion", self.expansion_time),
        ] {
            log::info!(
                "  {:<10} {:.3} ms ({:.1}%)",
                label,
                time.as_secs_f32() * 1000.0,
                (time.as_micros() as f32 / total_us) * 100.0
            );
        }
    }
}
