//! Cooperative frame loop. Each frame applies the latest resize, updates the orbit
//! controls, advances the stage, then renders exactly once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::ConstructionError;
use crate::renderer::Renderer;
use crate::stage::Stage;

/// Shared stop flag. Cancelling never interrupts a frame already in progress.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
}

impl ViewportState {
    pub fn new(width: u32, height: u32) -> Result<Self, ConstructionError> {
        if width == 0 || height == 0 {
            return Err(ConstructionError::InvalidViewport { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

/// Resize mailbox. Producers may post from any thread; the newest size wins.
#[derive(Debug, Clone, Default)]
pub struct ResizeSignal(Arc<Mutex<Option<ViewportState>>>);

impl ResizeSignal {
    pub fn notify(&self, width: u32, height: u32) {
        match ViewportState::new(width, height) {
            Ok(size) => *self.0.lock().unwrap_or_else(|e| e.into_inner()) = Some(size),
            Err(err) => log::debug!("ignoring resize: {err}"),
        }
    }

    pub fn take(&self) -> Option<ViewportState> {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).take()
    }
}

pub trait FrameClock {
    /// Seconds since the previous frame, or `None` once the clock has run out.
    fn next_frame(&mut self) -> Option<f64>;
}

/// Deterministic clock: `frames` ticks of exactly `1 / fps` seconds.
#[derive(Debug, Clone)]
pub struct FixedStepClock {
    dt: f64,
    remaining: u64,
}

impl FixedStepClock {
    pub fn new(fps: f64, frames: u64) -> Self {
        let dt = if fps.is_finite() && fps > 0.0 { 1.0 / fps } else { 1.0 / 60.0 };
        Self { dt, remaining: frames }
    }

    pub fn dt(&self) -> f64 {
        self.dt
    }
}

impl FrameClock for FixedStepClock {
    fn next_frame(&mut self) -> Option<f64> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.dt)
    }
}

/// Wall clock paced to a target frame rate. Runs until cancelled or out of frames.
#[derive(Debug)]
pub struct RealtimeClock {
    frame_time: Duration,
    last: Instant,
    remaining: Option<u64>,
}

impl RealtimeClock {
    // Longest step handed to animations after a stall.
    const MAX_DT: f64 = 0.25;

    pub fn new(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self { frame_time: Duration::from_secs_f64(1.0 / fps), last: Instant::now(), remaining: None }
    }

    pub fn limit(mut self, frames: u64) -> Self {
        self.remaining = Some(frames);
        self
    }
}

impl FrameClock for RealtimeClock {
    fn next_frame(&mut self) -> Option<f64> {
        if let Some(left) = self.remaining.as_mut() {
            if *left == 0 {
                return None;
            }
            *left -= 1;
        }
        let due = self.last + self.frame_time;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        }
        let now = Instant::now();
        let dt = (now - self.last).as_secs_f64().min(Self::MAX_DT);
        self.last = now;
        Some(dt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub frames: u64,
    pub simulated_secs: f64,
    pub resizes: u64,
    /// Frames in which at least one animation could not update its target.
    pub failed_ticks: u64,
    pub render_errors: u64,
    pub cancelled: bool,
}

#[derive(Debug)]
pub struct FrameScheduler {
    viewport: ViewportState,
    resize: ResizeSignal,
    cancel: CancellationToken,
}

impl FrameScheduler {
    pub fn new(viewport: ViewportState) -> Self {
        Self { viewport, resize: ResizeSignal::default(), cancel: CancellationToken::new() }
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    /// Handle for posting resize events from outside the loop.
    pub fn resize_signal(&self) -> ResizeSignal {
        self.resize.clone()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Push the current viewport to the camera and the renderer.
    pub fn sync_viewport<R: Renderer + ?Sized>(&self, stage: &mut Stage, renderer: &mut R) {
        stage.camera.set_aspect(self.viewport.aspect());
        renderer.set_size(self.viewport.width, self.viewport.height);
    }

    /// One tick: resize, controls, animations, render. Nothing in here aborts the loop.
    pub fn frame<R: Renderer + ?Sized>(&mut self, stage: &mut Stage, renderer: &mut R, dt: f64, report: &mut RunReport) {
        if let Some(size) = self.resize.take() {
            if size != self.viewport {
                log::debug!("viewport {}x{} -> {}x{}", self.viewport.width, self.viewport.height, size.width, size.height);
                self.viewport = size;
                self.sync_viewport(stage, renderer);
                report.resizes += 1;
            }
        }
        stage.controls.update(&mut stage.camera, dt);
        let tick = stage.update(dt);
        if !tick.is_clean() {
            report.failed_ticks += 1;
        }
        if let Err(err) = renderer.render(&stage.scene, &stage.camera) {
            log::warn!("frame {} failed to render: {err:#}", report.frames);
            report.render_errors += 1;
        }
        report.frames += 1;
        report.simulated_secs += dt;
    }

    /// Drive frames until the clock runs out or the token is cancelled.
    pub fn run<C, R>(&mut self, stage: &mut Stage, renderer: &mut R, clock: &mut C) -> RunReport
    where
        C: FrameClock + ?Sized,
        R: Renderer + ?Sized,
    {
        let mut report = RunReport::default();
        self.sync_viewport(stage, renderer);
        log::debug!("frame loop started for `{}`", stage.name);
        loop {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let Some(dt) = clock.next_frame() else { break };
            self.frame(stage, renderer, dt, &mut report);
        }
        log::debug!("frame loop stopped after {} frames", report.frames);
        report
    }
}
