//! Core runtime for Strata: a single-threaded cooperative frame loop.
//!
//! The [`FrameScheduler`] pumps frames in a fixed order (deferred
//! callbacks, tickers, rebuilds, layout, paint). Elements register with a
//! [`BuildOwner`] and are rebuilt when marked dirty; render boxes implement
//! [`RenderBox`] and are laid out and painted by the [`PipelineOwner`].

pub mod build_owner;
pub mod collections;
pub mod frame_scheduler;
pub mod pipeline;
pub mod platform;
pub mod render;
pub mod runtime;

pub use build_owner::{BuildContext, BuildOwner, Element, ElementHandle, ElementId};
pub use frame_scheduler::{
    FrameScheduler, FrameStats, SchedulerConfig, SettleError, DEFAULT_FRAME_INTERVAL,
    DEFAULT_SETTLE_TIMEOUT, DEFAULT_SURFACE_SIZE,
};
pub use pipeline::PipelineOwner;
pub use platform::{Clock, DefaultScheduler, RuntimeScheduler};
pub use render::{
    Content, HitTestEntry, HitTestResult, PaintContext, RenderBox, RenderSlot, TapHandler,
};
pub use runtime::{current_runtime_handle, dispatch, Runtime, RuntimeHandle, TickerHandle};

pub use strata_ui_graphics as graphics;
pub use strata_ui_layout as layout;
