//! # Skirmish Core
//!
//! Turn-based encounter engine for a party-vs-monsters RPG.
//!
//! The crate orders combatants by speed, cycles their turns and resolves each
//! action through a skill damage formula. Two real-time timing challenges can
//! change an action's outcome before it is committed: a precision strike on
//! party attacks and a parry on monster attacks.
//!
//! ## Architecture
//!
//! - **Stats** ([`stats`]): primary attributes, derived pools, critical rolls
//! - **Skills** ([`skill`]): immutable descriptors shared through a library
//! - **Combatants** ([`combatant`]): party members and monsters
//! - **Scheduler** ([`scheduler`]): cyclic speed-ordered turn queue
//! - **Modifiers** ([`modifier`]): precision strike and parry challenges
//! - **Session** ([`session`]): the encounter state machine driven by `tick(dt)`
//! - **Events** ([`event`]): typed notifications with subscribe/unsubscribe
//! - **AI** ([`ai`]): action selection for automated combatants
//! - **Autopilot** ([`autopilot`]): headless party control and batch runs
//!
//! ## Usage
//!
//! ```
//! use skirmish_core::combatant::{DifficultyTier, MonsterData, PartyMemberData};
//! use skirmish_core::config::CombatConfig;
//! use skirmish_core::session::{CombatSession, CombatState};
//! use skirmish_core::skill::SkillLibrary;
//! use skirmish_core::stats::PrimaryStats;
//!
//! let library = SkillLibrary::with_defaults();
//! let party = [PartyMemberData::new("Ayla", PrimaryStats::new(12, 8, 4, 6, 10), &["strike"])];
//! let monsters = [MonsterData::new(
//!     "Wolf",
//!     PrimaryStats::new(6, 4, 0, 0, 7),
//!     &["bite"],
//!     DifficultyTier::Easy,
//! )];
//!
//! let mut session = CombatSession::new(CombatConfig::instant(), 42).unwrap();
//! session.start_encounter(&library, &party, &monsters, false).unwrap();
//! assert!(matches!(session.state(), CombatState::AwaitingPlayerAction { .. }));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod ai;
pub mod autopilot;
pub mod combatant;
pub mod config;
pub mod encounter;
pub mod error;
pub mod event;
pub mod modifier;
pub mod scheduler;
pub mod session;
pub mod skill;
pub mod stats;

pub use autopilot::{run_batch, Autopilot, AutopilotConfig, BatchSummary, EncounterReport};
pub use combatant::{Combatant, CombatantId, DifficultyTier, MonsterData, PartyMemberData, Side};
pub use config::CombatConfig;
pub use encounter::EncounterSpec;
pub use error::{ActionError, CombatError, ConfigError, RosterError};
pub use event::{CombatEvent, SubscriptionId};
pub use modifier::{ModifierKind, ModifierOutcome, ModifierView};
pub use session::{CombatSession, CombatState, PartyStatus, Rewards};
pub use skill::{SkillDescriptor, SkillId, SkillLibrary};
pub use stats::{PrimaryStats, StatBlock};

#[cfg(test)]
mod tests;
