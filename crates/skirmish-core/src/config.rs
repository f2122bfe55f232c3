//! Tunable parameters for an encounter.
//!
//! Every constant the session, the timing challenges and the reward roll use
//! lives in [`CombatConfig`]. Configurations are plain serde structs: missing
//! JSON fields fall back to the defaults, and [`CombatConfig::validate`]
//! rejects values that would break a state machine (zero durations, empty
//! ranges, windows outside the track).
//!
//! # Example
//!
//! ```
//! use skirmish_core::config::CombatConfig;
//!
//! let config = CombatConfig::from_json_str(r#"{ "parry": { "tolerance": 0.2 } }"#).unwrap();
//! assert!((config.parry.tolerance - 0.2).abs() < f32::EPSILON);
//! assert!((config.parry.duration - 1.2).abs() < f32::EPSILON);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combatant::DifficultyTier;
use crate::error::ConfigError;

/// Top-level encounter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Critical chance (percent) before dexterity scaling.
    pub base_crit_chance: f32,
    /// Bonus critical chance (percent) granted by a successful precision strike.
    pub precision_crit_bonus: f32,
    /// Pauses between pipeline stages.
    pub pacing: PacingConfig,
    /// Offensive timing challenge.
    pub precision: PrecisionConfig,
    /// Defensive timing challenge.
    pub parry: ParryConfig,
    /// Victory rewards.
    pub rewards: RewardConfig,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            base_crit_chance: 5.0,
            precision_crit_bonus: 100.0,
            pacing: PacingConfig::default(),
            precision: PrecisionConfig::default(),
            parry: ParryConfig::default(),
            rewards: RewardConfig::default(),
        }
    }
}

impl CombatConfig {
    /// A configuration with every pacing delay set to zero.
    ///
    /// Useful for headless simulation where no animation has to play.
    #[must_use]
    pub fn instant() -> Self {
        Self {
            pacing: PacingConfig {
                turn_start_delay: 0.0,
                ai_windup: 0.0,
                turn_end_delay: 0.0,
            },
            ..Self::default()
        }
    }

    /// Parses and validates a JSON configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`CombatConfig::from_json_str`].
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        non_negative("base_crit_chance", self.base_crit_chance)?;
        non_negative("precision_crit_bonus", self.precision_crit_bonus)?;
        self.pacing.validate()?;
        self.precision.validate()?;
        self.parry.validate()?;
        self.rewards.validate()
    }
}

/// Fixed pauses inserted between pipeline stages, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after a turn starts, before the actor is asked to act.
    pub turn_start_delay: f32,
    /// Pause between an AI choosing its attack and the parry challenge.
    pub ai_windup: f32,
    /// Pause after an action resolves, before the turn ends.
    pub turn_end_delay: f32,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            turn_start_delay: 0.0,
            ai_windup: 0.5,
            turn_end_delay: 0.5,
        }
    }
}

impl PacingConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        non_negative("pacing.turn_start_delay", self.turn_start_delay)?;
        non_negative("pacing.ai_windup", self.ai_windup)?;
        non_negative("pacing.turn_end_delay", self.turn_end_delay)
    }
}

/// Window widths of the precision challenge per difficulty tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierWidths {
    /// Width against easy targets
    pub easy: f32,
    /// Width against normal targets
    pub normal: f32,
    /// Width against hard targets
    pub hard: f32,
}

impl Default for TierWidths {
    fn default() -> Self {
        Self {
            easy: 0.3,
            normal: 0.2,
            hard: 0.1,
        }
    }
}

/// Offensive timing challenge: a marker sweeping a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecisionConfig {
    /// Length of the track the marker sweeps.
    pub track_length: f32,
    /// Marker speed in track units per second.
    pub marker_speed: f32,
    /// Fixed centre of the success window.
    pub window_center: f32,
    /// Window width per tier.
    pub window_widths: TierWidths,
    /// Seconds without input before the strike resolves as a miss.
    pub timeout: f32,
}

impl Default for PrecisionConfig {
    fn default() -> Self {
        Self {
            track_length: 1.0,
            marker_speed: 1.2,
            window_center: 0.5,
            window_widths: TierWidths::default(),
            timeout: 3.0,
        }
    }
}

impl PrecisionConfig {
    /// Width of the success window against a target of `tier`.
    #[must_use]
    pub fn window_width(&self, tier: DifficultyTier) -> f32 {
        match tier {
            DifficultyTier::Easy => self.window_widths.easy,
            DifficultyTier::Normal => self.window_widths.normal,
            DifficultyTier::Hard => self.window_widths.hard,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        positive("precision.track_length", self.track_length)?;
        positive("precision.marker_speed", self.marker_speed)?;
        positive("precision.timeout", self.timeout)?;
        if !(0.0..=self.track_length).contains(&self.window_center) {
            return Err(ConfigError::Invalid {
                field: "precision.window_center",
                reason: format!("{} lies outside the track", self.window_center),
            });
        }
        for (field, width) in [
            ("precision.window_widths.easy", self.window_widths.easy),
            ("precision.window_widths.normal", self.window_widths.normal),
            ("precision.window_widths.hard", self.window_widths.hard),
        ] {
            positive(field, width)?;
            if width > self.track_length {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{width} is wider than the track"),
                });
            }
        }
        Ok(())
    }
}

/// Defensive timing challenge: an indicator shrinking toward a target size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParryConfig {
    /// Indicator size when the challenge starts.
    pub start_size: f32,
    /// Size the player tries to match.
    pub target_size: f32,
    /// Seconds for the indicator to shrink to zero; also the deadline.
    pub duration: f32,
    /// Maximum absolute size difference that still counts as a parry.
    pub tolerance: f32,
}

impl Default for ParryConfig {
    fn default() -> Self {
        Self {
            start_size: 2.0,
            target_size: 0.6,
            duration: 1.2,
            tolerance: 0.12,
        }
    }
}

impl ParryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        positive("parry.start_size", self.start_size)?;
        positive("parry.duration", self.duration)?;
        non_negative("parry.target_size", self.target_size)?;
        non_negative("parry.tolerance", self.tolerance)?;
        if self.target_size >= self.start_size {
            return Err(ConfigError::Invalid {
                field: "parry.target_size",
                reason: "must be smaller than start_size".to_string(),
            });
        }
        Ok(())
    }
}

/// Victory reward ranges. Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Minimum gold per monster
    pub gold_min: u32,
    /// Maximum gold per monster
    pub gold_max: u32,
    /// Minimum experience per monster
    pub xp_min: u32,
    /// Maximum experience per monster
    pub xp_max: u32,
    /// Multiplier applied to both totals for boss encounters
    pub boss_multiplier: u32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            gold_min: 10,
            gold_max: 50,
            xp_min: 20,
            xp_max: 100,
            boss_multiplier: 2,
        }
    }
}

impl RewardConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.gold_min > self.gold_max {
            return Err(ConfigError::Invalid {
                field: "rewards.gold_min",
                reason: "exceeds gold_max".to_string(),
            });
        }
        if self.xp_min > self.xp_max {
            return Err(ConfigError::Invalid {
                field: "rewards.xp_min",
                reason: "exceeds xp_max".to_string(),
            });
        }
        if self.boss_multiplier == 0 {
            return Err(ConfigError::Invalid {
                field: "rewards.boss_multiplier",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must be positive"),
        })
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: format!("{value} must not be negative"),
        })
    }
}
