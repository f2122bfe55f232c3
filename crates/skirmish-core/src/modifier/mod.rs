//! Interactive modifiers: real-time timing challenges that gate an action.
//!
//! Two challenges plug into the action pipeline:
//!
//! - [`PrecisionStrike`]: offensive. A marker sweeps a track; pressing while it
//!   is inside the success window grants a critical bonus.
//! - [`ParryWindow`]: defensive. An indicator shrinks toward a target size;
//!   pressing when the sizes match negates the incoming attack.
//!
//! # Contract
//!
//! Both implement [`TimingChallenge`]:
//! 1. `start(params)` arms the challenge and resets its clock
//! 2. `advance(dt)` moves the clock and may resolve on timeout
//! 3. `submit_input()` resolves on the first press; later presses are ignored
//!
//! A challenge resolves exactly once. Both time out as a failure, reported as
//! [`ModifierOutcome::TimedOut`].

mod parry;
mod precision;

pub use parry::{ParryParams, ParryWindow};
pub use precision::{PrecisionParams, PrecisionStrike};

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Lifecycle flags shared by every timing challenge.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct ModifierFlags: u8 {
        /// The challenge is armed and its clock is moving.
        const RUNNING        = 1 << 0;
        /// The single permitted input has been consumed.
        const INPUT_RECORDED = 1 << 1;
    }
}

/// Which challenge is involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKind {
    /// Offensive precision strike
    Precision,
    /// Defensive parry
    Parry,
}

impl fmt::Display for ModifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Precision => write!(f, "precision"),
            Self::Parry => write!(f, "parry"),
        }
    }
}

/// How a challenge resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierOutcome {
    /// Input landed inside the success zone.
    Success,
    /// Input landed outside the success zone.
    Failure,
    /// No input arrived before the deadline.
    TimedOut,
}

impl ModifierOutcome {
    /// True only for [`ModifierOutcome::Success`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Snapshot of a challenge's geometry for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModifierView {
    /// Marker on a track with a success window.
    Precision {
        /// Current marker position along the track
        marker: f32,
        /// Track length
        track_length: f32,
        /// Lower edge of the success window
        window_start: f32,
        /// Upper edge of the success window
        window_end: f32,
        /// Seconds since start
        elapsed: f32,
        /// Deadline in seconds
        timeout: f32,
    },
    /// Shrinking indicator and its target.
    Parry {
        /// Current indicator size
        size: f32,
        /// Size to match
        target_size: f32,
        /// Allowed absolute difference
        tolerance: f32,
        /// Seconds since start
        elapsed: f32,
        /// Deadline in seconds
        duration: f32,
    },
}

impl ModifierView {
    /// True if an input submitted now would succeed.
    #[must_use]
    pub fn in_success_zone(&self) -> bool {
        match *self {
            Self::Precision {
                marker,
                window_start,
                window_end,
                ..
            } => (window_start..=window_end).contains(&marker),
            Self::Parry {
                size,
                target_size,
                tolerance,
                ..
            } => (size - target_size).abs() <= tolerance,
        }
    }

    /// Which challenge this view describes.
    #[must_use]
    pub const fn kind(&self) -> ModifierKind {
        match self {
            Self::Precision { .. } => ModifierKind::Precision,
            Self::Parry { .. } => ModifierKind::Parry,
        }
    }
}

/// A single-input real-time challenge.
pub trait TimingChallenge: Send {
    /// Challenge-specific start parameters.
    type Params;

    /// Identifies the challenge.
    fn kind(&self) -> ModifierKind;

    /// Arms the challenge, discarding any previous state.
    fn start(&mut self, params: Self::Params);

    /// Advances the clock by `dt` seconds.
    ///
    /// Returns the outcome if the challenge resolved during this step.
    fn advance(&mut self, dt: f32) -> Option<ModifierOutcome>;

    /// Records the player's input.
    ///
    /// Returns the outcome on the first input while running, `None` if the
    /// input was ignored.
    fn submit_input(&mut self) -> Option<ModifierOutcome>;

    /// Outcome of the last run, if it resolved.
    fn outcome(&self) -> Option<ModifierOutcome>;

    /// True while armed and unresolved.
    fn is_running(&self) -> bool;

    /// Current geometry for rendering.
    fn view(&self) -> ModifierView;
}

/// Bookkeeping shared by both challenges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChallengeState {
    pub flags: ModifierFlags,
    pub elapsed: f32,
    pub outcome: Option<ModifierOutcome>,
}

impl ChallengeState {
    pub fn begin(&mut self) {
        *self = Self {
            flags: ModifierFlags::RUNNING,
            elapsed: 0.0,
            outcome: None,
        };
    }

    pub fn is_running(&self) -> bool {
        self.flags.contains(ModifierFlags::RUNNING)
    }

    /// True if this is the first input of a running challenge. Consumes the input.
    pub fn accept_input(&mut self) -> bool {
        if !self.is_running() || self.flags.contains(ModifierFlags::INPUT_RECORDED) {
            return false;
        }
        self.flags.insert(ModifierFlags::INPUT_RECORDED);
        true
    }

    pub fn resolve(&mut self, outcome: ModifierOutcome) -> ModifierOutcome {
        self.flags.remove(ModifierFlags::RUNNING);
        self.outcome = Some(outcome);
        outcome
    }
}
