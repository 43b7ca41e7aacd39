//! Camera control: the idle auto-rotation and bounds fitting.
//!
//! The controller is a two-state machine. It starts out `Rotating`, spinning
//! the globe by a fixed longitude step on a fixed cadence, and drops to `Idle`
//! on the first user interaction or when a transform result is applied.
//! `Idle` is terminal for the session.

use std::time::Duration;

use crate::feature::{Bounds, Feature, FeatureCollection, LngLat};

pub const ROTATION_INTERVAL: Duration = Duration::from_millis(100);
pub const ROTATION_STEP_DEGREES: f64 = 0.5;

pub const FIT_PADDING: f32 = 50.0;
pub const FIT_MAX_ZOOM: f64 = 15.0;
pub const FIT_DURATION: Duration = Duration::from_millis(5000);

pub const INITIAL_CENTER: LngLat = LngLat::new(-74.5, 40.0);
pub const INITIAL_ZOOM: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseInOut,
}

impl Easing {
    /// Maps linear progress `t` in [0, 1] onto the eased curve.
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseInOut => t * t * (3.0 - 2.0 * t),
        }
    }
}

/// A single eased move of the camera centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraTransition {
    pub center: LngLat,
    pub duration: Duration,
    pub easing: Easing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitBoundsOptions {
    /// Screen-space padding around the bounds, in points.
    pub padding: f32,
    pub max_zoom: f64,
    pub duration: Duration,
}

impl Default for FitBoundsOptions {
    fn default() -> Self {
        Self {
            padding: FIT_PADDING,
            max_zoom: FIT_MAX_ZOOM,
            duration: FIT_DURATION,
        }
    }
}

/// The map rendering surface, as seen by the orchestration code.
pub trait MapSurface {
    /// False until the surface can accept camera and source updates.
    fn is_ready(&self) -> bool;

    fn center(&self) -> LngLat;

    fn ease_to(&mut self, transition: CameraTransition);

    fn fit_bounds(&mut self, bounds: Bounds, options: FitBoundsOptions);

    /// Replaces the data of the vector source named `source_id`.
    fn set_source_data(&mut self, source_id: &str, data: &FeatureCollection);
}

/// Handle to a periodic background task driven by elapsed frame time.
///
/// Cancelling is permanent; a cancelled task never reports another tick.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    interval: Duration,
    elapsed: Duration,
    cancelled: bool,
}

impl ScheduledTask {
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            elapsed: Duration::ZERO,
            cancelled: false,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn cancel(&mut self) {
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Accumulates `dt` and returns how many ticks fell due.
    pub fn advance(&mut self, dt: Duration) -> u32 {
        if self.cancelled || self.interval.is_zero() {
            return 0;
        }
        self.elapsed += dt;
        let mut ticks = 0;
        while self.elapsed >= self.interval {
            self.elapsed -= self.interval;
            ticks += 1;
        }
        ticks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraState {
    Rotating,
    Idle,
}

#[derive(Debug)]
pub struct CameraController {
    state: CameraState,
    rotation: Option<ScheduledTask>,
    center: LngLat,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            state: CameraState::Rotating,
            rotation: Some(ScheduledTask::every(ROTATION_INTERVAL)),
            center: INITIAL_CENTER,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_rotating(&self) -> bool {
        self.state == CameraState::Rotating
    }

    /// Last centre reported by the map.
    pub fn center(&self) -> LngLat {
        self.center
    }

    /// Records the map centre after any camera movement.
    pub fn on_camera_moved(&mut self, center: LngLat) {
        self.center = center;
    }

    /// Pointer-down or touch-start on the map.
    pub fn on_user_interaction(&mut self) -> bool {
        self.stop()
    }

    /// Cancels the rotation task and moves to `Idle`. Returns whether the
    /// state changed; calling it again is a no-op.
    pub fn stop(&mut self) -> bool {
        if let Some(mut task) = self.rotation.take() {
            task.cancel();
        }
        if self.state == CameraState::Idle {
            return false;
        }
        self.state = CameraState::Idle;
        log::info!("Camera rotation stopped");
        true
    }

    /// Drives the rotation task by `dt`. Due ticks are folded into a single
    /// eased move. Returns the number of ticks that fell due.
    pub fn advance(&mut self, dt: Duration, map: &mut dyn MapSurface) -> u32 {
        let Some(task) = self.rotation.as_mut() else {
            return 0;
        };
        let ticks = task.advance(dt);
        if ticks == 0 || !map.is_ready() {
            return ticks;
        }

        let current = map.center();
        let target = LngLat::new(
            current.lng + ROTATION_STEP_DEGREES * f64::from(ticks),
            current.lat,
        )
        .wrapped();
        map.ease_to(CameraTransition {
            center: target,
            duration: task.interval(),
            easing: Easing::Linear,
        });
        ticks
    }

    /// Frames `features` with a single eased transition. Does nothing, and
    /// returns false, when there are no positions to frame.
    pub fn fit_to_bounds<'a>(
        &self,
        features: impl IntoIterator<Item = &'a Feature>,
        map: &mut dyn MapSurface,
    ) -> bool {
        let Some(bounds) = Bounds::of(features) else {
            return false;
        };
        log::debug!("Fitting camera to {:?}", bounds);
        map.fit_bounds(bounds, FitBoundsOptions::default());
        true
    }
}
