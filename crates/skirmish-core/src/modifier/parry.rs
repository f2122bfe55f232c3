//! Defensive parry window.
//!
//! An indicator starts at `start_size` and shrinks linearly to zero over
//! `duration` seconds. The player presses once; the parry succeeds if the
//! indicator is within `tolerance` of `target_size` at that moment. The
//! window closes at `duration`, resolving as [`ModifierOutcome::TimedOut`].

use serde::{Deserialize, Serialize};

use crate::config::ParryConfig;

use super::{ChallengeState, ModifierKind, ModifierOutcome, ModifierView, TimingChallenge};

/// Start parameters for a [`ParryWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParryParams {
    /// Indicator size at start
    pub start_size: f32,
    /// Size to match
    pub target_size: f32,
    /// Shrink time and deadline in seconds
    pub duration: f32,
    /// Allowed absolute difference
    pub tolerance: f32,
}

impl From<&ParryConfig> for ParryParams {
    fn from(config: &ParryConfig) -> Self {
        Self {
            start_size: config.start_size,
            target_size: config.target_size,
            duration: config.duration,
            tolerance: config.tolerance,
        }
    }
}

impl Default for ParryParams {
    fn default() -> Self {
        Self::from(&ParryConfig::default())
    }
}

impl ParryParams {
    /// Seconds after start at which the indicator exactly matches the target.
    #[must_use]
    pub fn perfect_time(&self) -> f32 {
        if self.start_size <= 0.0 {
            return 0.0;
        }
        self.duration * (1.0 - self.target_size / self.start_size)
    }
}

/// Shrinking-indicator timing challenge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParryWindow {
    params: ParryParams,
    state: ChallengeState,
}

impl ParryWindow {
    /// Creates an idle challenge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current indicator size.
    #[must_use]
    pub fn size(&self) -> f32 {
        if self.params.duration <= 0.0 {
            return 0.0;
        }
        let progress = (self.state.elapsed / self.params.duration).min(1.0);
        (self.params.start_size * (1.0 - progress)).max(0.0)
    }

    /// Parameters of the current or last run.
    #[must_use]
    pub const fn params(&self) -> &ParryParams {
        &self.params
    }
}

impl TimingChallenge for ParryWindow {
    type Params = ParryParams;

    fn kind(&self) -> ModifierKind {
        ModifierKind::Parry
    }

    fn start(&mut self, params: ParryParams) {
        self.params = params;
        self.state.begin();
        tracing::trace!(duration = params.duration, "parry window opened");
    }

    fn advance(&mut self, dt: f32) -> Option<ModifierOutcome> {
        if !self.state.is_running() {
            return None;
        }
        self.state.elapsed += dt.max(0.0);

        if self.state.elapsed >= self.params.duration {
            tracing::debug!(elapsed = self.state.elapsed, "parry window closed without input");
            return Some(self.state.resolve(ModifierOutcome::TimedOut));
        }
        None
    }

    fn submit_input(&mut self) -> Option<ModifierOutcome> {
        if !self.state.accept_input() {
            return None;
        }
        let size = self.size();
        let outcome = if (size - self.params.target_size).abs() <= self.params.tolerance {
            ModifierOutcome::Success
        } else {
            ModifierOutcome::Failure
        };
        tracing::debug!(size, target = self.params.target_size, ?outcome, "parry input");
        Some(self.state.resolve(outcome))
    }

    fn outcome(&self) -> Option<ModifierOutcome> {
        self.state.outcome
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn view(&self) -> ModifierView {
        ModifierView::Parry {
            size: self.size(),
            target_size: self.params.target_size,
            tolerance: self.params.tolerance,
            elapsed: self.state.elapsed,
            duration: self.params.duration,
        }
    }
}
