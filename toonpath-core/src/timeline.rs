//! Time-to-progress mapping shared by every animator: easing curves, loop modes and
//! the per-tick state machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConstructionError;

/// Easing curves, named the way tween libraries usually spell them.
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
pub enum Easing {
    #[default]
    #[serde(rename = "none", alias = "linear")]
    Linear,
    #[serde(rename = "power1.in")]
    QuadIn,
    #[serde(rename = "power1.out")]
    QuadOut,
    #[serde(rename = "power1.inOut")]
    QuadInOut,
    #[serde(rename = "power2.in")]
    CubicIn,
    #[serde(rename = "power2.out")]
    CubicOut,
    #[serde(rename = "power2.inOut")]
    CubicInOut,
    #[serde(rename = "power3.in")]
    QuartIn,
    #[serde(rename = "power3.out")]
    QuartOut,
    #[serde(rename = "power3.inOut")]
    QuartInOut,
    #[serde(rename = "sine.in")]
    SineIn,
    #[serde(rename = "sine.out")]
    SineOut,
    #[serde(rename = "sine.inOut")]
    SineInOut,
    /// Caller supplied. Expected to map 0 to 0 and 1 to 1.
    #[serde(skip)]
    Custom(fn(f64) -> f64),
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        use std::f64::consts::FRAC_PI_2;
        let t = t.clamp(0.0, 1.0);
        let eased = match self {
            Easing::Linear => t,
            Easing::QuadIn => power_in(t, 2),
            Easing::QuadOut => power_out(t, 2),
            Easing::QuadInOut => power_in_out(t, 2),
            Easing::CubicIn => power_in(t, 3),
            Easing::CubicOut => power_out(t, 3),
            Easing::CubicInOut => power_in_out(t, 3),
            Easing::QuartIn => power_in(t, 4),
            Easing::QuartOut => power_out(t, 4),
            Easing::QuartInOut => power_in_out(t, 4),
            Easing::SineIn => 1.0 - (t * FRAC_PI_2).cos(),
            Easing::SineOut => (t * FRAC_PI_2).sin(),
            Easing::SineInOut => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Easing::Custom(f) => f(t),
        };
        // pin the ends so boundary samples land exactly on the path ends
        if t <= 0.0 {
            0.0
        } else if t >= 1.0 {
            1.0
        } else if eased.is_finite() {
            eased
        } else {
            t
        }
    }
}

fn power_in(t: f64, power: i32) -> f64 {
    t.powi(power)
}

fn power_out(t: f64, power: i32) -> f64 {
    1.0 - (1.0 - t).powi(power)
}

fn power_in_out(t: f64, power: i32) -> f64 {
    if t < 0.5 {
        power_in(t * 2.0, power) / 2.0
    } else {
        1.0 - power_in((1.0 - t) * 2.0, power) / 2.0
    }
}

impl fmt::Debug for Easing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Easing::Linear => "none",
            Easing::QuadIn => "power1.in",
            Easing::QuadOut => "power1.out",
            Easing::QuadInOut => "power1.inOut",
            Easing::CubicIn => "power2.in",
            Easing::CubicOut => "power2.out",
            Easing::CubicInOut => "power2.inOut",
            Easing::QuartIn => "power3.in",
            Easing::QuartOut => "power3.out",
            Easing::QuartInOut => "power3.inOut",
            Easing::SineIn => "sine.in",
            Easing::SineOut => "sine.out",
            Easing::SineInOut => "sine.inOut",
            Easing::Custom(_) => "custom",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    /// Play forward once, then stop at the end.
    Once,
    /// Jump back to the start after each pass.
    #[default]
    Repeat,
    /// Alternate forward and backward passes.
    PingPong,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Playback {
    Forward,
    Backward,
    Stopped,
}

/// Validated timing parameters.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    duration: f64,
    loop_mode: LoopMode,
    easing: Easing,
}

impl Timing {
    /// `duration` is one full cycle: forward and back for ping-pong, a single pass otherwise.
    pub fn new(duration: f64, loop_mode: LoopMode, easing: Easing) -> Result<Self, ConstructionError> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(ConstructionError::InvalidDuration(duration));
        }
        Ok(Self { duration, loop_mode, easing })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn loop_mode(&self) -> LoopMode {
        self.loop_mode
    }

    pub fn easing(&self) -> Easing {
        self.easing
    }

    /// Length of one directed pass.
    pub fn leg(&self) -> f64 {
        match self.loop_mode {
            LoopMode::PingPong => self.duration / 2.0,
            LoopMode::Once | LoopMode::Repeat => self.duration,
        }
    }
}

/// Mutable half of an animation: where in the current pass we are and which way we go.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    /// Seconds into the current pass.
    pub elapsed: f64,
    pub playback: Playback,
    /// Eased progress in `[0, 1]` produced by the last step.
    pub progress: f64,
}

impl AnimationState {
    pub fn running() -> Self {
        Self { elapsed: 0.0, playback: Playback::Forward, progress: 0.0 }
    }

    pub fn stopped() -> Self {
        Self { elapsed: 0.0, playback: Playback::Stopped, progress: 0.0 }
    }

    pub fn is_running(&self) -> bool {
        self.playback != Playback::Stopped
    }

    /// One tick. Pure: the new state depends only on `self`, `dt` and `timing`.
    ///
    /// Progress is computed from the advanced clock first; crossing the end of a pass
    /// then flips direction (ping-pong), rewinds (repeat) or stops (once). Time past the
    /// boundary carries into the next pass.
    pub fn step(self, dt: f64, timing: &Timing) -> Self {
        if self.playback == Playback::Stopped {
            return self;
        }
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let leg = timing.leg();
        let elapsed = self.elapsed + dt;
        let raw = (elapsed / leg).clamp(0.0, 1.0);
        let local = match self.playback {
            Playback::Backward => 1.0 - raw,
            _ => raw,
        };
        let progress = timing.easing.apply(local);

        if elapsed < leg {
            return Self { elapsed, playback: self.playback, progress };
        }

        let overshoot = elapsed - leg;
        let extra_passes = (overshoot / leg).floor();
        let carried = overshoot - extra_passes * leg;
        match timing.loop_mode {
            LoopMode::Once => Self { elapsed: leg, playback: Playback::Stopped, progress },
            LoopMode::Repeat => Self { elapsed: carried, playback: Playback::Forward, progress },
            LoopMode::PingPong => {
                // one flip for the boundary just crossed, plus one per whole pass skipped
                let flips = 1 + extra_passes as u64;
                let playback = if flips % 2 == 1 { self.playback.reversed() } else { self.playback };
                Self { elapsed: carried, playback, progress }
            }
        }
    }
}

impl Playback {
    fn reversed(self) -> Self {
        match self {
            Playback::Forward => Playback::Backward,
            Playback::Backward => Playback::Forward,
            Playback::Stopped => Playback::Stopped,
        }
    }
}
