//! Combat events and the subscriber bus that delivers them.
//!
//! The session never calls into its collaborators directly. Every observable
//! change is a [`CombatEvent`] published on the [`EventBus`]:
//!
//! - Subscribers registered with [`EventBus::subscribe`] are called
//!   synchronously, in registration order, as each event is emitted.
//! - Every event is also appended to an internal log that a polling host
//!   drains with [`EventBus::take_events`].
//!
//! # Ordering
//!
//! For one actor the bus always sees `TurnStarted`, then the resolution
//! events (`ActionDeclared`, modifier events, `DamageApplied`, pool changes,
//! `CombatantDefeated`), then `TurnEnded`. Turns never interleave.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::CombatantId;
use crate::modifier::{ModifierKind, ModifierOutcome};
use crate::skill::SkillId;
use crate::stats::PoolChange;

// =============================================================================
// Events
// =============================================================================

/// Something observable that happened during an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// Rosters were materialized and the first turn order built.
    EncounterStarted {
        /// Number of party members
        party: usize,
        /// Number of monsters
        monsters: usize,
        /// Boss encounters multiply rewards
        is_boss: bool,
        /// Seed of the session RNG, for replay
        seed: u64,
    },
    /// A combatant's turn began.
    TurnStarted {
        /// Acting combatant
        actor: CombatantId,
    },
    /// An actor committed to a skill and its targets.
    ActionDeclared {
        /// Acting combatant
        actor: CombatantId,
        /// Chosen skill
        skill: SkillId,
        /// Every combatant the skill will hit
        targets: Vec<CombatantId>,
    },
    /// A timing challenge was armed.
    ModifierStarted {
        /// Which challenge
        kind: ModifierKind,
        /// Combatant whose action is being modified
        actor: CombatantId,
    },
    /// A timing challenge resolved.
    ModifierResolved {
        /// Which challenge
        kind: ModifierKind,
        /// How it resolved
        outcome: ModifierOutcome,
    },
    /// A successful parry negated an incoming attack.
    AttackParried {
        /// Attacking monster
        attacker: CombatantId,
        /// Party member that parried
        defender: CombatantId,
        /// Total damage that was discarded
        negated: u32,
    },
    /// Damage was applied to a combatant.
    DamageApplied {
        /// Attacking combatant
        source: CombatantId,
        /// Combatant that took the hit
        target: CombatantId,
        /// Damage rolled for this target
        amount: u32,
        /// Whether the action was a critical hit
        critical: bool,
    },
    /// A combatant's HP or MP pool changed.
    PoolChanged {
        /// Owner of the pool
        combatant: CombatantId,
        /// New value and maximum
        change: PoolChange,
    },
    /// A combatant dropped to zero HP.
    CombatantDefeated {
        /// Defeated combatant
        combatant: CombatantId,
    },
    /// A combatant's turn finished.
    TurnEnded {
        /// Acting combatant
        actor: CombatantId,
    },
    /// One side was wiped out.
    EncounterEnded {
        /// True if the party won
        victory: bool,
        /// Gold awarded (zero on defeat)
        gold: u32,
        /// Experience awarded (zero on defeat)
        experience: u32,
    },
    /// The host ended the encounter early. No rewards are granted.
    EncounterAborted,
}

impl CombatEvent {
    /// Returns the combatant this event is primarily about, if any.
    #[must_use]
    pub fn primary_combatant(&self) -> Option<CombatantId> {
        match self {
            Self::TurnStarted { actor }
            | Self::TurnEnded { actor }
            | Self::ActionDeclared { actor, .. }
            | Self::ModifierStarted { actor, .. } => Some(*actor),
            Self::AttackParried { defender, .. } => Some(*defender),
            Self::DamageApplied { target, .. } => Some(*target),
            Self::PoolChanged { combatant, .. } | Self::CombatantDefeated { combatant } => {
                Some(*combatant)
            }
            Self::EncounterStarted { .. }
            | Self::ModifierResolved { .. }
            | Self::EncounterEnded { .. }
            | Self::EncounterAborted => None,
        }
    }

    /// True for events that end the encounter.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::EncounterEnded { .. } | Self::EncounterAborted)
    }
}

// =============================================================================
// Event Bus
// =============================================================================

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

type Callback = Box<dyn FnMut(&CombatEvent) + Send>;

/// Publishes events to subscribers and records them for polling.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriptionId, Callback)>,
    next_id: u64,
    log: Vec<CombatEvent>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &format!("[{} subscribers]", self.subscribers.len()))
            .field("log", &self.log)
            .finish()
    }
}

impl EventBus {
    /// Creates a bus with no subscribers and an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback invoked for every subsequent event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscriber. Returns false if the id was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        before != self.subscribers.len()
    }

    /// Delivers an event to every subscriber and appends it to the log.
    pub fn emit(&mut self, event: CombatEvent) {
        tracing::trace!(?event, "emit");
        for (_, callback) in &mut self.subscribers {
            callback(&event);
        }
        self.log.push(event);
    }

    /// Drains and returns the logged events in emission order.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.log)
    }

    /// Logged events not yet drained.
    #[must_use]
    pub fn pending(&self) -> &[CombatEvent] {
        &self.log
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
