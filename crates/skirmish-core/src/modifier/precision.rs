//! Offensive precision strike.
//!
//! A marker bounces across a track of fixed length at constant speed,
//! starting at 0 and heading right. The success window is centred at a fixed
//! point; its width comes from the target's difficulty tier. The player gets
//! one press. If no press arrives before the timeout the strike resolves as
//! [`ModifierOutcome::TimedOut`].
//!
//! The marker position is a triangle wave of elapsed time, so any `dt`
//! produces the same position as many small steps summing to it.

use serde::{Deserialize, Serialize};

use crate::combatant::DifficultyTier;
use crate::config::PrecisionConfig;

use super::{ChallengeState, ModifierKind, ModifierOutcome, ModifierView, TimingChallenge};

/// Start parameters for a [`PrecisionStrike`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionParams {
    /// Track length
    pub track_length: f32,
    /// Marker speed in track units per second
    pub marker_speed: f32,
    /// Centre of the success window
    pub window_center: f32,
    /// Width of the success window
    pub window_width: f32,
    /// Deadline in seconds
    pub timeout: f32,
}

impl PrecisionParams {
    /// Derives parameters for an attack against a target of `tier`.
    #[must_use]
    pub fn for_tier(config: &PrecisionConfig, tier: DifficultyTier) -> Self {
        Self {
            track_length: config.track_length,
            marker_speed: config.marker_speed,
            window_center: config.window_center,
            window_width: config.window_width(tier),
            timeout: config.timeout,
        }
    }

    /// Lower and upper window edges, clamped to the track.
    #[must_use]
    pub fn window(&self) -> (f32, f32) {
        let half = self.window_width / 2.0;
        (
            (self.window_center - half).max(0.0),
            (self.window_center + half).min(self.track_length),
        )
    }
}

impl Default for PrecisionParams {
    fn default() -> Self {
        Self::for_tier(&PrecisionConfig::default(), DifficultyTier::Normal)
    }
}

/// Marker-in-window timing challenge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecisionStrike {
    params: PrecisionParams,
    state: ChallengeState,
    marker: f32,
}

impl PrecisionStrike {
    /// Creates an idle challenge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current marker position.
    #[must_use]
    pub const fn marker(&self) -> f32 {
        self.marker
    }

    /// Parameters of the current or last run.
    #[must_use]
    pub const fn params(&self) -> &PrecisionParams {
        &self.params
    }

    fn marker_at(&self, elapsed: f32) -> f32 {
        let length = self.params.track_length;
        if length <= 0.0 {
            return 0.0;
        }
        let travelled = self.params.marker_speed * elapsed;
        let phase = travelled.rem_euclid(2.0 * length);
        if phase <= length {
            phase
        } else {
            2.0 * length - phase
        }
    }
}

impl TimingChallenge for PrecisionStrike {
    type Params = PrecisionParams;

    fn kind(&self) -> ModifierKind {
        ModifierKind::Precision
    }

    fn start(&mut self, params: PrecisionParams) {
        self.params = params;
        self.state.begin();
        self.marker = 0.0;
        tracing::trace!(width = params.window_width, "precision strike armed");
    }

    fn advance(&mut self, dt: f32) -> Option<ModifierOutcome> {
        if !self.state.is_running() {
            return None;
        }
        self.state.elapsed += dt.max(0.0);
        self.marker = self.marker_at(self.state.elapsed);

        if self.state.elapsed >= self.params.timeout {
            tracing::debug!(elapsed = self.state.elapsed, "precision strike timed out");
            return Some(self.state.resolve(ModifierOutcome::TimedOut));
        }
        None
    }

    fn submit_input(&mut self) -> Option<ModifierOutcome> {
        if !self.state.accept_input() {
            return None;
        }
        let (start, end) = self.params.window();
        let outcome = if (start..=end).contains(&self.marker) {
            ModifierOutcome::Success
        } else {
            ModifierOutcome::Failure
        };
        tracing::debug!(marker = self.marker, start, end, ?outcome, "precision input");
        Some(self.state.resolve(outcome))
    }

    fn outcome(&self) -> Option<ModifierOutcome> {
        self.state.outcome
    }

    fn is_running(&self) -> bool {
        self.state.is_running()
    }

    fn view(&self) -> ModifierView {
        let (window_start, window_end) = self.params.window();
        ModifierView::Precision {
            marker: self.marker,
            track_length: self.params.track_length,
            window_start,
            window_end,
            elapsed: self.state.elapsed,
            timeout: self.params.timeout,
        }
    }
}
