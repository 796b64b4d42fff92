use log::{Level, debug, log_enabled, trace, warn};
use std::time::{Duration, Instant};

/// Times one culling phase: traces its duration and optionally adds it to a
/// profiler counter.
pub struct ScopedTimer<'a> {
    phase: &'static str,
    start: Instant,
    total: Option<&'a mut Duration>,
}

impl ScopedTimer<'static> {
    pub fn new(phase: &'static str) -> Self {
        Self {
            phase,
            start: Instant::now(),
            total: None,
        }
    }
}

impl<'a> ScopedTimer<'a> {
    /// Like [`ScopedTimer::new`], and adds the elapsed time to `total` on drop.
    pub fn accumulating(phase: &'static str, total: &'a mut Duration) -> Self {
        Self {
            phase,
            start: Instant::now(),
            total: Some(total),
        }
    }
}

impl Drop for ScopedTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        if let Some(total) = self.total.as_deref_mut() {
            *total += elapsed;
        }
        if log_enabled!(Level::Trace) {
            trace!("{} took {} µs", self.phase, elapsed.as_micros());
        }
    }
}

/// Reports light-capacity truncation once per change instead of once per frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct TruncationLog {
    last_dropped: usize,
}

impl TruncationLog {
    pub fn record(&mut self, visible: usize, capacity: usize) {
        let dropped = visible.saturating_sub(capacity);
        if dropped == self.last_dropped {
            return;
        }
        if dropped > 0 {
            warn!(
                "{visible} visible lights exceed capacity {capacity}; dropping {dropped} lights"
            );
        } else {
            debug!("visible light count {visible} back within capacity {capacity}");
        }
        self.last_dropped = dropped;
    }

    pub fn dropped(&self) -> usize {
        self.last_dropped
    }
}
