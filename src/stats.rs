use crossbeam::atomic::AtomicCell;
use std::time::Duration;

/// Counters the audio thread updates once per buffer and
/// the control side can read at any time without locking.
#[derive(Default)]
pub struct RenderStats {
    buffers: AtomicCell<u64>,
    lock_misses: AtomicCell<u64>,
    overruns: AtomicCell<u64>,
    retunes: AtomicCell<u64>,
    last_render_micros: AtomicCell<u64>,
    peak_render_micros: AtomicCell<u64>,
}

/// plain copy of the counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStatsSnapshot {
    pub buffers: u64,
    pub lock_misses: u64,
    pub overruns: u64,
    /// times the audio thread picked up changed effect settings
    pub retunes: u64,
    pub last_render_micros: u64,
    pub peak_render_micros: u64,
}

impl RenderStats {
    /// Returns true if rendering took longer than the buffer lasts.
    pub(crate) fn record_render(&self, elapsed: Duration, budget: Duration) -> bool {
        let micros = elapsed.as_micros() as u64;

        self.buffers.fetch_add(1);
        self.last_render_micros.store(micros);
        // only the audio thread writes, so load/store is enough
        if micros > self.peak_render_micros.load() {
            self.peak_render_micros.store(micros);
        }

        if elapsed > budget {
            self.overruns.fetch_add(1);
            true
        } else {
            false
        }
    }

    pub(crate) fn record_lock_miss(&self) {
        self.lock_misses.fetch_add(1);
    }

    pub(crate) fn record_retune(&self) {
        self.retunes.fetch_add(1);
    }

    pub fn snapshot(&self) -> RenderStatsSnapshot {
        RenderStatsSnapshot {
            buffers: self.buffers.load(),
            lock_misses: self.lock_misses.load(),
            overruns: self.overruns.load(),
            retunes: self.retunes.load(),
            last_render_micros: self.last_render_micros.load(),
            peak_render_micros: self.peak_render_micros.load(),
        }
    }
}
