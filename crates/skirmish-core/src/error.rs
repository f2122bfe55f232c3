//! Error types for the encounter engine.
//!
//! Errors are split by who can fix them:
//!
//! - [`ActionError`]: the host submitted input the session cannot accept right
//!   now. The turn does not advance; the host re-prompts and resubmits.
//! - [`RosterError`]: encounter data is malformed and no session can be built
//!   from it.
//! - [`ConfigError`]: configuration failed to load or validate.
//! - [`CombatError`]: umbrella for session entry points, including
//!   internal-consistency faults that leave the session unusable.

use std::path::PathBuf;

use thiserror::Error;

use crate::combatant::CombatantId;
use crate::skill::SkillId;

/// A rejected player or timing input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    /// The skill is not part of the acting combatant's kit.
    #[error("skill `{skill}` is not in the kit of {actor}")]
    UnknownSkill {
        /// Acting combatant
        actor: CombatantId,
        /// Requested skill
        skill: SkillId,
    },

    /// The actor cannot pay the mana cost of a non-basic skill.
    #[error("{actor} needs {required} MP for `{skill}` but has {available}")]
    InsufficientMana {
        /// Acting combatant
        actor: CombatantId,
        /// Requested skill
        skill: SkillId,
        /// Mana cost of the skill
        required: u32,
        /// Mana the actor currently has
        available: u32,
    },

    /// The target is missing, dead, or on the actor's own side.
    #[error("invalid target {target:?}")]
    InvalidTarget {
        /// Requested target, if one was given
        target: Option<CombatantId>,
    },

    /// No player actor is waiting for a command.
    #[error("the session is not awaiting a player action")]
    NotAwaitingAction,

    /// Timing input arrived while no interactive modifier is running.
    #[error("no timing challenge is running")]
    NoActiveModifier,

    /// The encounter has already ended.
    #[error("the encounter is over")]
    EncounterOver,
}

/// Malformed encounter data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RosterError {
    /// A roster entry references a skill the library does not know.
    #[error("{combatant} references unknown skill `{skill}`")]
    UnknownSkill {
        /// Name of the roster entry
        combatant: String,
        /// Missing skill id
        skill: SkillId,
    },

    /// A roster entry has no skills at all.
    #[error("{0} has an empty skill kit")]
    EmptyKit(String),

    /// Slot 0 of a kit must be a basic attack so AI fallback always works.
    #[error("{combatant}: first skill `{skill}` is not a basic attack")]
    MissingBasicAttack {
        /// Name of the roster entry
        combatant: String,
        /// Skill found in slot 0
        skill: SkillId,
    },

    /// A skill in a kit has a scaling factor that is negative or not finite.
    #[error("{combatant}: skill `{skill}` has invalid stat scaling {scaling}")]
    InvalidScaling {
        /// Name of the roster entry
        combatant: String,
        /// Offending skill
        skill: SkillId,
        /// Rejected scaling factor
        scaling: f32,
    },

    /// One side of the encounter has no members.
    #[error("the {0} roster is empty")]
    EmptySide(&'static str),
}

/// Configuration loading or validation failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a configuration file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A value is outside its allowed range.
    #[error("invalid config value `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

/// Umbrella error for [`CombatSession`](crate::session::CombatSession) entry points.
#[derive(Debug, Error)]
pub enum CombatError {
    /// Rejected input; the turn did not advance.
    #[error(transparent)]
    Action(#[from] ActionError),

    /// Encounter data could not be materialized.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// Configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `start_encounter` was called on a session that already started.
    #[error("an encounter is already in progress")]
    AlreadyStarted,

    /// The session reached a state that should be unreachable.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, CombatError>;
