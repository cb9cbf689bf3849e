//! Cooperative frame loop.
//!
//! One [`FrameScheduler::pump`] runs a fixed sequence: deferred callbacks,
//! tickers, rebuilds, layout, paint. Nothing here spawns threads or sleeps;
//! the host decides when to pump and the injected [`Clock`] decides what
//! time it is.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use strata_ui_graphics::{DisplayList, Point, Size};

use crate::build_owner::BuildOwner;
use crate::pipeline::PipelineOwner;
use crate::platform::{Clock, RuntimeScheduler};
use crate::render::{HitTestResult, RenderBox};
use crate::runtime::Runtime;

/// Logical duration of one frame at 60Hz, rounded down.
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_millis(16);
pub const DEFAULT_SURFACE_SIZE: Size = Size::new(800.0, 600.0);
pub const DEFAULT_SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedulerConfig {
    /// Clock advance between frames while settling.
    pub frame_interval: Duration,
    /// Size the root box is laid out at.
    pub surface_size: Size,
}

impl SchedulerConfig {
    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn with_surface_size(mut self, surface_size: Size) -> Self {
        self.surface_size = surface_size;
        self
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval: DEFAULT_FRAME_INTERVAL,
            surface_size: DEFAULT_SURFACE_SIZE,
        }
    }
}

/// What a single pump step did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub frame: u64,
    pub tasks_run: usize,
    pub tickers_stepped: usize,
    pub elements_rebuilt: usize,
    pub laid_out: bool,
    pub painted: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettleError {
    /// Work was still pending when the logical time budget ran out.
    Timeout { timeout: Duration, frames: u32 },
}

impl fmt::Display for SettleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettleError::Timeout { timeout, frames } => write!(
                f,
                "frame loop did not settle within {timeout:?} ({frames} frames pumped)"
            ),
        }
    }
}

impl std::error::Error for SettleError {}

pub struct FrameScheduler {
    runtime: Runtime,
    build_owner: BuildOwner,
    pipeline: PipelineOwner,
    clock: Rc<dyn Clock>,
    config: SchedulerConfig,
    frames: u64,
    last_stats: FrameStats,
}

impl FrameScheduler {
    pub fn new(
        scheduler: Arc<dyn RuntimeScheduler>,
        clock: Rc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self::with_runtime(Runtime::new(scheduler), clock, config)
    }

    pub fn with_runtime(runtime: Runtime, clock: Rc<dyn Clock>, config: SchedulerConfig) -> Self {
        let build_owner = BuildOwner::new(runtime.handle());
        Self {
            runtime,
            build_owner,
            pipeline: PipelineOwner::new(config.surface_size),
            clock,
            config,
            frames: 0,
            last_stats: FrameStats::default(),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn build_owner(&self) -> &BuildOwner {
        &self.build_owner
    }

    pub fn clock(&self) -> Rc<dyn Clock> {
        Rc::clone(&self.clock)
    }

    pub fn config(&self) -> SchedulerConfig {
        self.config
    }

    pub fn set_root(&mut self, root: Rc<RefCell<dyn RenderBox>>) {
        self.pipeline.set_root(root);
        self.runtime.request_frame();
    }

    pub fn set_surface_size(&mut self, size: Size) {
        self.config.surface_size = size;
        self.pipeline.set_surface_size(size);
        self.runtime.request_frame();
    }

    pub fn surface_size(&self) -> Size {
        self.pipeline.surface_size()
    }

    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn last_stats(&self) -> FrameStats {
        self.last_stats
    }

    /// Whether another pump would do anything: dirty elements, active
    /// tickers or queued deferred callbacks.
    pub fn needs_work(&self) -> bool {
        self.build_owner.has_dirty()
            || self.runtime.has_active_tickers()
            || self.runtime.has_pending_tasks()
    }

    /// Runs one frame.
    pub fn pump(&mut self) -> FrameStats {
        self.frames += 1;
        let frame = self.frames;
        self.runtime.set_needs_frame(false);

        let tasks_run = self.runtime.drain_tasks();
        let tickers_stepped = self.runtime.step_tickers(self.clock.now());
        let elements_rebuilt = self.build_owner.flush_build();
        if elements_rebuilt > 0 {
            self.pipeline.mark_needs_layout();
        }
        let laid_out = self.pipeline.flush_layout();
        let painted = self.pipeline.flush_paint();

        if self.needs_work() {
            self.runtime.set_needs_frame(true);
        }

        let stats = FrameStats {
            frame,
            tasks_run,
            tickers_stepped,
            elements_rebuilt,
            laid_out,
            painted,
        };
        log::trace!("frame {frame}: {stats:?}");
        self.last_stats = stats;
        stats
    }

    /// Pumps `count` frames, advancing the clock by the frame interval
    /// after each one.
    pub fn pump_frames(&mut self, count: u32) {
        for _ in 0..count {
            self.pump();
            self.clock.advance(self.config.frame_interval);
        }
    }

    /// Pumps until no work remains or `timeout` of logical time has passed.
    /// Returns the number of frames pumped.
    pub fn pump_and_settle(&mut self, timeout: Duration) -> Result<u32, SettleError> {
        let interval = self.config.frame_interval;
        let mut elapsed = Duration::ZERO;
        let mut frames = 0u32;
        while elapsed < timeout {
            self.pump();
            frames += 1;
            if !self.needs_work() {
                log::trace!("settled after {frames} frame(s)");
                return Ok(frames);
            }
            self.clock.advance(interval);
            elapsed += interval;
        }
        log::warn!("frame loop failed to settle within {timeout:?} after {frames} frame(s)");
        Err(SettleError::Timeout { timeout, frames })
    }

    pub fn hit_test(&self, position: Point) -> Option<HitTestResult> {
        self.pipeline.hit_test(position)
    }

    pub fn last_frame(&self) -> &DisplayList {
        self.pipeline.last_frame()
    }

    pub fn pipeline(&self) -> &PipelineOwner {
        &self.pipeline
    }
}

impl fmt::Debug for FrameScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("frames", &self.frames)
            .field("config", &self.config)
            .field("pipeline", &self.pipeline)
            .field("build_owner", &self.build_owner)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/frame_scheduler_tests.rs"]
mod tests;
