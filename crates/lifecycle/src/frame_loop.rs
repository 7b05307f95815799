use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use render_abi::StateBlock;
use tracing::{debug, trace};

use crate::library::RenderLibrary;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostConfig {
    /// Passed to `gfx_render` every frame.
    pub animate: bool,
    /// Passed to `gfx_sleep` every frame. Zero only yields the CPU.
    pub sleep_ms: i32,
    pub stats_interval: Duration,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            animate: true,
            sleep_ms: 0,
            stats_interval: Duration::from_secs(1),
        }
    }
}

/// Cooperative stop request for the frame loop. Clones share one flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only performs an atomic store, so it is safe to call from a signal handler.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopSummary {
    pub frames: u64,
    pub fps: f32,
}

#[derive(Debug)]
pub struct FrameClock {
    stats_interval: Duration,
    frame_index: u64,
    window_elapsed: Duration,
    frames_this_window: u32,
    fps: f32,
}

impl FrameClock {
    pub fn new(stats_interval: Duration) -> Self {
        Self {
            stats_interval: stats_interval.max(Duration::from_millis(1)),
            frame_index: 0,
            window_elapsed: Duration::ZERO,
            frames_this_window: 0,
            fps: 0.0,
        }
    }

    /// Counts one presented frame. Returns the fresh rate whenever a stats
    /// window closes.
    pub fn advance(&mut self, dt: Duration) -> Option<f32> {
        self.frame_index = self.frame_index.wrapping_add(1);
        self.frames_this_window = self.frames_this_window.saturating_add(1);
        self.window_elapsed = self.window_elapsed.saturating_add(dt);

        if self.window_elapsed < self.stats_interval {
            return None;
        }

        let secs = self.window_elapsed.as_secs_f32();
        if secs > 0.0 {
            self.fps = self.frames_this_window as f32 / secs;
        }
        self.frames_this_window = 0;
        self.window_elapsed = Duration::ZERO;
        Some(self.fps)
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}

/// Poll, render, yield until `cancel` is set. With the real renderer the
/// process usually ends inside `poll` instead.
///
/// # Safety
/// `block` must be initialized with `init_context`, hold a live frame
/// buffer, and outlive the call.
pub(crate) unsafe fn run_frames<L: RenderLibrary>(
    library: &L,
    block: NonNull<StateBlock>,
    config: &HostConfig,
    cancel: &CancelToken,
) -> LoopSummary {
    let mut clock = FrameClock::new(config.stats_interval);
    let mut last = Instant::now();

    while !cancel.is_cancelled() {
        // SAFETY: upheld by the caller.
        let status = unsafe { library.poll(block) };
        if status != 0 {
            trace!(status, "gfx_loop returned non-zero status");
        }
        // A close request usually lands during the poll.
        if cancel.is_cancelled() {
            break;
        }

        // SAFETY: upheld by the caller.
        unsafe { library.render(block, config.animate) };
        library.sleep(config.sleep_ms);

        let now = Instant::now();
        if let Some(fps) = clock.advance(now.duration_since(last)) {
            debug!(frames = clock.frame_index(), fps, "frame rate");
        }
        last = now;
    }

    LoopSummary {
        frames: clock.frame_index(),
        fps: clock.fps(),
    }
}
