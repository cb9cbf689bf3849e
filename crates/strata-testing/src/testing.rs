use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use strata_core::{
    BuildOwner, Clock, DefaultScheduler, FrameScheduler, FrameStats, HitTestResult, Runtime,
    SchedulerConfig, SettleError, DEFAULT_SETTLE_TIMEOUT,
};
use strata_overlay::{OverlayConfig, OverlayStack};
use strata_ui_graphics::{DisplayList, Point, Size};

use crate::clock::FakeClock;

/// Headless harness for exercising overlays in tests.
///
/// `OverlayTestRule` owns a [`FrameScheduler`] driven by a [`FakeClock`], so
/// frames only advance when the test pumps them. The surface defaults to
/// 800x600.
pub struct OverlayTestRule {
    scheduler: FrameScheduler,
    clock: Rc<FakeClock>,
    stack: Option<OverlayStack>,
}

impl OverlayTestRule {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_size(width: f32, height: f32) -> Self {
        Self::with_config(SchedulerConfig::default().with_surface_size(Size::new(width, height)))
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let clock = Rc::new(FakeClock::new());
        let scheduler_clock: Rc<dyn Clock> = clock.clone();
        Self {
            scheduler: FrameScheduler::new(Arc::new(DefaultScheduler), scheduler_clock, config),
            clock,
            stack: None,
        }
    }

    /// Installs an overlay as the root and pumps one frame.
    pub fn set_overlay(&mut self, config: OverlayConfig) -> OverlayStack {
        if let Some(previous) = self.stack.take() {
            previous.dispose();
        }
        let stack = OverlayStack::new(self.scheduler.build_owner(), config);
        self.scheduler.set_root(stack.render_box());
        self.stack = Some(stack.clone());
        self.pump();
        stack
    }

    /// The installed overlay, if any.
    pub fn stack(&self) -> Option<&OverlayStack> {
        self.stack.as_ref()
    }

    pub fn pump(&mut self) -> FrameStats {
        self.scheduler.pump()
    }

    /// Pumps `count` frames, advancing the clock one frame interval after
    /// each.
    pub fn pump_frames(&mut self, count: u32) {
        self.scheduler.pump_frames(count);
    }

    pub fn pump_and_settle(&mut self) -> Result<u32, SettleError> {
        self.scheduler.pump_and_settle(DEFAULT_SETTLE_TIMEOUT)
    }

    pub fn pump_and_settle_with_timeout(&mut self, timeout: Duration) -> Result<u32, SettleError> {
        self.scheduler.pump_and_settle(timeout)
    }

    pub fn needs_work(&self) -> bool {
        self.scheduler.needs_work()
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Option<HitTestResult> {
        self.scheduler.hit_test(Point::new(x, y))
    }

    /// Labels along the hit path, innermost first. Empty when nothing
    /// absorbed the hit.
    pub fn hit_labels(&self, x: f32, y: f32) -> Vec<String> {
        self.hit_test(x, y)
            .map(|result| result.labels().into_iter().map(String::from).collect())
            .unwrap_or_default()
    }

    /// Hit tests and runs the first tap handler on the path. Does not pump.
    pub fn tap(&self, x: f32, y: f32) -> bool {
        self.hit_test(x, y)
            .map(|result| result.dispatch_tap())
            .unwrap_or(false)
    }

    pub fn last_frame(&self) -> &DisplayList {
        self.scheduler.last_frame()
    }

    pub fn clock(&self) -> Rc<FakeClock> {
        Rc::clone(&self.clock)
    }

    pub fn advance_time(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn runtime(&self) -> &Runtime {
        self.scheduler.runtime()
    }

    pub fn build_owner(&self) -> &BuildOwner {
        self.scheduler.build_owner()
    }

    pub fn scheduler(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }
}

impl Default for OverlayTestRule {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `test` against a fresh rule with `config` installed.
pub fn run_overlay_test(
    config: OverlayConfig,
    test: impl FnOnce(&mut OverlayTestRule, &OverlayStack),
) {
    let mut rule = OverlayTestRule::new();
    let stack = rule.set_overlay(config);
    test(&mut rule, &stack);
}

#[cfg(test)]
#[path = "tests/testing_tests.rs"]
mod tests;
