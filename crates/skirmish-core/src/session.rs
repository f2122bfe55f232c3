//! The combat session: one encounter's top-level state machine.
//!
//! A [`CombatSession`] owns the combatants, the turn scheduler, the two timing
//! challenges, the session RNG and the event bus. The host drives it with
//! three inputs and a clock:
//!
//! - [`CombatSession::submit_player_action`] while a party member awaits a command
//! - [`CombatSession::submit_timing_input`] while a timing challenge runs
//! - [`CombatSession::tick`] to advance pacing delays and challenge clocks
//!
//! # States
//!
//! ```text
//! Idle -> Initializing -> TurnStarting -> AwaitingPlayerAction -> ModifierRunning(precision) -+
//!                              |                                                            |
//!                              +-> AiWindup -> ModifierRunning(parry) ---------------------+
//!                                                                                          v
//!               TurnStarting <- TurnEnding <- Resolving <-----------------------------------+
//!                     |
//!                     +-> Ended { victory } | Aborted | Faulted
//! ```
//!
//! `TurnStarting`, `AwaitingPlayerAction`, `AiWindup` and `ModifierRunning`
//! together form the active part of a turn. Each state that waits on time or
//! input is explicit, so the session never blocks.
//!
//! # Turn Pipeline
//!
//! A pump loop runs every state that can progress without waiting. Ending a
//! turn and starting the next happen inside that loop, never by recursion.
//! While a turn is in flight the `processing` flag makes
//! [`CombatSession::advance_turn`] a no-op.
//!
//! The battle-end condition is checked before every turn starts. When it
//! holds, rewards are rolled (victory only) and `EncounterEnded` is emitted
//! exactly once.

use std::fmt;
use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{living_opponents, ActionPolicy, RandomPolicy};
use crate::combatant::{
    Combatant, CombatantId, DifficultyTier, MonsterData, PartyMemberData, Side,
};
use crate::config::CombatConfig;
use crate::error::{ActionError, CombatError, Result, RosterError};
use crate::event::{CombatEvent, EventBus, SubscriptionId};
use crate::modifier::{
    ModifierKind, ModifierOutcome, ModifierView, ParryParams, ParryWindow, PrecisionParams,
    PrecisionStrike, TimingChallenge,
};
use crate::scheduler::TurnScheduler;
use crate::skill::{SkillDescriptor, SkillId, SkillLibrary, TargetCardinality};

// =============================================================================
// Public State
// =============================================================================

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatState {
    /// No encounter has been started.
    Idle,
    /// Rosters are being materialized.
    Initializing,
    /// A turn began; waiting out the turn-start delay.
    TurnStarting {
        /// Acting combatant
        actor: CombatantId,
    },
    /// A party member waits for [`CombatSession::submit_player_action`].
    AwaitingPlayerAction {
        /// Acting combatant
        actor: CombatantId,
    },
    /// A monster chose its attack; waiting out the wind-up delay.
    AiWindup {
        /// Acting combatant
        actor: CombatantId,
    },
    /// A timing challenge is running.
    ModifierRunning {
        /// Acting combatant
        actor: CombatantId,
        /// Which challenge
        kind: ModifierKind,
    },
    /// The pending action is being committed.
    Resolving {
        /// Acting combatant
        actor: CombatantId,
    },
    /// The action resolved; waiting out the turn-end delay.
    TurnEnding {
        /// Acting combatant
        actor: CombatantId,
    },
    /// One side was wiped out.
    Ended {
        /// True if the party won
        victory: bool,
    },
    /// The host aborted the encounter.
    Aborted,
    /// An internal-consistency fault stopped the encounter.
    Faulted,
}

impl CombatState {
    /// Returns the acting combatant during a turn.
    #[must_use]
    pub const fn actor(&self) -> Option<CombatantId> {
        match *self {
            Self::TurnStarting { actor }
            | Self::AwaitingPlayerAction { actor }
            | Self::AiWindup { actor }
            | Self::ModifierRunning { actor, .. }
            | Self::Resolving { actor }
            | Self::TurnEnding { actor } => Some(actor),
            Self::Idle
            | Self::Initializing
            | Self::Ended { .. }
            | Self::Aborted
            | Self::Faulted => None,
        }
    }

    /// True once no further turns can run.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended { .. } | Self::Aborted | Self::Faulted)
    }
}

impl fmt::Display for CombatState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::TurnStarting { actor } => write!(f, "turn starting ({actor})"),
            Self::AwaitingPlayerAction { actor } => write!(f, "awaiting action ({actor})"),
            Self::AiWindup { actor } => write!(f, "ai wind-up ({actor})"),
            Self::ModifierRunning { actor, kind } => write!(f, "{kind} running ({actor})"),
            Self::Resolving { actor } => write!(f, "resolving ({actor})"),
            Self::TurnEnding { actor } => write!(f, "turn ending ({actor})"),
            Self::Ended { victory: true } => write!(f, "victory"),
            Self::Ended { victory: false } => write!(f, "defeat"),
            Self::Aborted => write!(f, "aborted"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

/// Gold and experience earned by the party.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    /// Gold total
    pub gold: u32,
    /// Experience total
    pub experience: u32,
}

/// Final pools of one party member, for writing back to persistent data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyStatus {
    /// Session id
    pub id: CombatantId,
    /// Display name
    pub name: String,
    /// HP at the time of the report
    pub current_hp: u32,
    /// Maximum HP
    pub max_hp: u32,
    /// MP at the time of the report
    pub current_mp: u32,
    /// Maximum MP
    pub max_mp: u32,
}

impl PartyStatus {
    /// Copies the pools into a roster entry for the next encounter.
    pub fn write_back(&self, data: &mut PartyMemberData) {
        data.current_hp = Some(self.current_hp);
        data.current_mp = Some(self.current_mp);
    }
}

// =============================================================================
// Pending Actions
// =============================================================================

/// A player attack waiting on the precision challenge.
#[derive(Debug, Clone)]
struct PlayerAttack {
    skill: Arc<SkillDescriptor>,
    targets: Vec<CombatantId>,
}

/// A monster attack, damage already rolled, waiting on the parry challenge.
#[derive(Debug, Clone)]
struct MonsterVolley {
    skill: Arc<SkillDescriptor>,
    defender: CombatantId,
    hits: Vec<(CombatantId, u32)>,
    critical: bool,
}

#[derive(Debug, Clone)]
enum PendingAction {
    Player(PlayerAttack),
    Monster(MonsterVolley),
}

// =============================================================================
// Combat Session
// =============================================================================

/// State machine for one encounter.
pub struct CombatSession {
    config: CombatConfig,
    seed: u64,
    rng: ChaCha8Rng,
    policy: Box<dyn ActionPolicy>,
    combatants: Vec<Combatant>,
    scheduler: TurnScheduler,
    state: CombatState,
    /// Set from turn start until turn end.
    processing: bool,
    /// Remaining pacing delay of the current waiting state.
    delay: f32,
    pending: Option<PendingAction>,
    modifier_outcome: Option<ModifierOutcome>,
    precision: PrecisionStrike,
    parry: ParryWindow,
    is_boss: bool,
    rewards: Rewards,
    turns: u32,
    fault: Option<String>,
    events: EventBus,
}

impl fmt::Debug for CombatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombatSession")
            .field("seed", &self.seed)
            .field("state", &self.state)
            .field("processing", &self.processing)
            .field("combatants", &self.combatants.len())
            .field("turns", &self.turns)
            .field("rewards", &self.rewards)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl CombatSession {
    /// Creates an idle session that uses [`RandomPolicy`] for monsters.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::Config`] if the configuration fails validation.
    pub fn new(config: CombatConfig, seed: u64) -> Result<Self> {
        Self::with_policy(config, seed, RandomPolicy::new())
    }

    /// Creates an idle session with a custom monster policy.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::Config`] if the configuration fails validation.
    pub fn with_policy(
        config: CombatConfig,
        seed: u64,
        policy: impl ActionPolicy + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            policy: Box::new(policy),
            combatants: Vec::new(),
            scheduler: TurnScheduler::new(),
            state: CombatState::Idle,
            processing: false,
            delay: 0.0,
            pending: None,
            modifier_outcome: None,
            precision: PrecisionStrike::new(),
            parry: ParryWindow::new(),
            is_boss: false,
            rewards: Rewards::default(),
            turns: 0,
            fault: None,
            events: EventBus::new(),
        })
    }

    // =========================================================================
    // Inputs
    // =========================================================================

    /// Materializes the rosters, builds the turn order and starts the first turn.
    ///
    /// Party members receive ids `0..party.len()`, monsters the ids after them.
    ///
    /// # Errors
    ///
    /// - [`CombatError::AlreadyStarted`] if this session was started before
    /// - [`CombatError::Roster`] if a side is empty or a kit is malformed; the
    ///   session stays idle and can be started again
    pub fn start_encounter(
        &mut self,
        library: &SkillLibrary,
        party: &[PartyMemberData],
        monsters: &[MonsterData],
        is_boss: bool,
    ) -> Result<()> {
        if self.state != CombatState::Idle {
            return Err(CombatError::AlreadyStarted);
        }
        self.state = CombatState::Initializing;

        self.combatants = match self.materialize(library, party, monsters) {
            Ok(combatants) => combatants,
            Err(err) => {
                tracing::warn!(%err, "encounter rejected");
                self.state = CombatState::Idle;
                return Err(err.into());
            }
        };
        self.is_boss = is_boss;
        self.scheduler
            .build_initial_order(&self.combatants, &mut self.rng);

        tracing::info!(
            seed = self.seed,
            party = party.len(),
            monsters = monsters.len(),
            is_boss,
            "encounter started"
        );
        self.events.emit(CombatEvent::EncounterStarted {
            party: party.len(),
            monsters: monsters.len(),
            is_boss,
            seed: self.seed,
        });

        self.advance_turn();
        self.check_fault()
    }

    /// Starts the next turn if none is in flight.
    ///
    /// Does nothing while `processing` is set, before the encounter starts or
    /// after it ends.
    pub fn advance_turn(&mut self) {
        if self.processing {
            tracing::trace!("advance_turn ignored while a turn is in flight");
            return;
        }
        if self.state == CombatState::Idle || self.state.is_terminal() {
            return;
        }
        self.start_next_turn();
        self.pump();
    }

    /// Commits the waiting party member to a skill and target.
    ///
    /// `target` is required for single-target skills and ignored for area
    /// skills, which hit every living monster. On success the precision
    /// challenge starts.
    ///
    /// # Errors
    ///
    /// Returns an [`ActionError`] and leaves the turn untouched if no player
    /// is waiting, the skill is not in the kit, mana is short, or the target
    /// is missing, dead or friendly.
    pub fn submit_player_action(
        &mut self,
        skill: &SkillId,
        target: Option<CombatantId>,
    ) -> std::result::Result<(), ActionError> {
        let actor = match self.state {
            CombatState::AwaitingPlayerAction { actor } => actor,
            state if state.is_terminal() => return Err(ActionError::EncounterOver),
            _ => return Err(ActionError::NotAwaitingAction),
        };

        let attack = match self.validate_player_action(actor, skill, target) {
            Ok(attack) => attack,
            Err(err) => {
                tracing::warn!(actor = %actor, %err, "player action rejected");
                return Err(err);
            }
        };

        tracing::debug!(
            actor = %actor,
            skill = %attack.skill.id,
            targets = ?attack.targets,
            "player action declared"
        );
        self.events.emit(CombatEvent::ActionDeclared {
            actor,
            skill: attack.skill.id.clone(),
            targets: attack.targets.clone(),
        });
        let tier = self.precision_tier(&attack.targets);
        self.pending = Some(PendingAction::Player(attack));
        self.precision
            .start(PrecisionParams::for_tier(&self.config.precision, tier));
        self.enter_modifier(actor, ModifierKind::Precision);
        Ok(())
    }

    /// Routes a timing input to the running challenge.
    ///
    /// Returns the challenge outcome if this input resolved it.
    ///
    /// # Errors
    ///
    /// [`ActionError::NoActiveModifier`] if no challenge is running and
    /// [`ActionError::EncounterOver`] after the encounter ended.
    pub fn submit_timing_input(
        &mut self,
    ) -> std::result::Result<Option<ModifierOutcome>, ActionError> {
        let (actor, kind) = match self.state {
            CombatState::ModifierRunning { actor, kind } => (actor, kind),
            state if state.is_terminal() => return Err(ActionError::EncounterOver),
            _ => return Err(ActionError::NoActiveModifier),
        };

        let outcome = match kind {
            ModifierKind::Precision => self.precision.submit_input(),
            ModifierKind::Parry => self.parry.submit_input(),
        };
        if let Some(outcome) = outcome {
            self.finish_modifier(actor, kind, outcome);
            self.pump();
        }
        Ok(outcome)
    }

    /// Advances pacing delays and the running challenge by `dt` seconds.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::InternalConsistency`] once the session has
    /// faulted. A faulted session runs no further turns.
    pub fn tick(&mut self, dt: f32) -> Result<()> {
        let dt = dt.max(0.0);
        match self.state {
            CombatState::TurnStarting { .. }
            | CombatState::AiWindup { .. }
            | CombatState::TurnEnding { .. } => self.delay -= dt,
            CombatState::ModifierRunning { actor, kind } => {
                let resolved = match kind {
                    ModifierKind::Precision => self.precision.advance(dt),
                    ModifierKind::Parry => self.parry.advance(dt),
                };
                if let Some(outcome) = resolved {
                    self.finish_modifier(actor, kind, outcome);
                }
            }
            _ => {}
        }
        self.pump();
        self.check_fault()
    }

    /// Ends the encounter immediately without rewards.
    ///
    /// Returns false if there was nothing to abort.
    pub fn abort(&mut self) -> bool {
        if self.state == CombatState::Idle || self.state.is_terminal() {
            return false;
        }
        tracing::info!(turns = self.turns, "encounter aborted");
        self.state = CombatState::Aborted;
        self.processing = false;
        self.pending = None;
        self.modifier_outcome = None;
        self.events.emit(CombatEvent::EncounterAborted);
        true
    }

    // =========================================================================
    // Events
    // =========================================================================

    /// Registers a callback for every subsequent event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CombatEvent) + Send + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Removes a subscriber. Returns false if the id was unknown.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Drains the events emitted since the last call.
    pub fn take_events(&mut self) -> Vec<CombatEvent> {
        self.events.take_events()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> CombatState {
        self.state
    }

    /// Combatant whose turn is in flight.
    #[must_use]
    pub const fn current_actor(&self) -> Option<CombatantId> {
        self.state.actor()
    }

    /// Looks up a combatant by id.
    #[must_use]
    pub fn combatant(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(id.index())
    }

    /// All combatants, party first, indexed by id.
    #[must_use]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    /// Living members of `side` in id order.
    pub fn living(&self, side: Side) -> impl Iterator<Item = &Combatant> + '_ {
        self.combatants
            .iter()
            .filter(move |c| c.side() == side && c.is_alive())
    }

    /// Geometry of the running challenge, if any.
    #[must_use]
    pub fn active_modifier(&self) -> Option<ModifierView> {
        match self.state {
            CombatState::ModifierRunning {
                kind: ModifierKind::Precision,
                ..
            } => Some(self.precision.view()),
            CombatState::ModifierRunning {
                kind: ModifierKind::Parry,
                ..
            } => Some(self.parry.view()),
            _ => None,
        }
    }

    /// Living combatants queued after the current actor, in turn order.
    #[must_use]
    pub fn upcoming_turns(&self) -> Vec<CombatantId> {
        self.scheduler
            .upcoming()
            .filter(|id| self.combatant(*id).is_some_and(Combatant::is_alive))
            .collect()
    }

    /// Rewards granted so far. Non-zero only after a victory.
    #[must_use]
    pub const fn rewards(&self) -> Rewards {
        self.rewards
    }

    /// Final pools of every party member.
    #[must_use]
    pub fn party_report(&self) -> Vec<PartyStatus> {
        self.combatants
            .iter()
            .filter(|c| c.is_player())
            .map(|c| PartyStatus {
                id: c.id(),
                name: c.name().to_string(),
                current_hp: c.stats().current_hp(),
                max_hp: c.stats().max_hp(),
                current_mp: c.stats().current_mp(),
                max_mp: c.stats().max_mp(),
            })
            .collect()
    }

    /// True while a turn is in flight.
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        self.processing
    }

    /// Number of turns started so far.
    #[must_use]
    pub const fn turns_taken(&self) -> u32 {
        self.turns
    }

    /// Seed of the session RNG.
    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// True for boss encounters.
    #[must_use]
    pub const fn is_boss(&self) -> bool {
        self.is_boss
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CombatConfig {
        &self.config
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn materialize(
        &self,
        library: &SkillLibrary,
        party: &[PartyMemberData],
        monsters: &[MonsterData],
    ) -> std::result::Result<Vec<Combatant>, RosterError> {
        if party.is_empty() {
            return Err(RosterError::EmptySide("party"));
        }
        if monsters.is_empty() {
            return Err(RosterError::EmptySide("monster"));
        }

        let crit = self.config.base_crit_chance;
        let mut combatants = Vec::with_capacity(party.len() + monsters.len());
        for data in party {
            let id = next_id(&combatants);
            combatants.push(Combatant::party_member(id, data, library, crit)?);
        }
        for data in monsters {
            let id = next_id(&combatants);
            combatants.push(Combatant::monster(id, data, library, crit)?);
        }
        Ok(combatants)
    }

    /// Runs every state that can progress without waiting for time or input.
    fn pump(&mut self) {
        loop {
            match self.state {
                CombatState::TurnStarting { actor } if self.delay <= 0.0 => {
                    self.begin_action(actor);
                }
                CombatState::AiWindup { actor } if self.delay <= 0.0 => {
                    self.parry.start(ParryParams::from(&self.config.parry));
                    self.enter_modifier(actor, ModifierKind::Parry);
                }
                CombatState::Resolving { actor } => self.resolve(actor),
                CombatState::TurnEnding { actor } if self.delay <= 0.0 => {
                    self.end_turn(actor);
                    self.start_next_turn();
                }
                _ => break,
            }
        }
    }

    fn start_next_turn(&mut self) {
        if self.check_battle_end() {
            return;
        }
        let Some(actor) = self.scheduler.next_actor(&self.combatants, &mut self.rng) else {
            self.raise_fault("turn scheduler is empty while both sides are alive".to_string());
            return;
        };

        self.processing = true;
        self.turns += 1;
        tracing::debug!(
            actor = %actor,
            name = self.name(actor),
            turn = self.turns,
            "turn started"
        );
        self.events.emit(CombatEvent::TurnStarted { actor });
        self.state = CombatState::TurnStarting { actor };
        self.delay = self.config.pacing.turn_start_delay;
    }

    fn begin_action(&mut self, actor: CombatantId) {
        let Some(combatant) = self.combatants.get(actor.index()) else {
            self.raise_fault(format!("scheduler returned unknown combatant {actor}"));
            return;
        };
        if combatant.is_player() {
            tracing::debug!(actor = %actor, "awaiting player action");
            self.state = CombatState::AwaitingPlayerAction { actor };
        } else {
            self.declare_monster_attack(actor);
        }
    }

    fn declare_monster_attack(&mut self, actor: CombatantId) {
        let attacker = &self.combatants[actor.index()];
        let Some(skill) = self.policy.select_skill(attacker, &mut self.rng) else {
            self.raise_fault(format!("{actor} has no skill to use"));
            return;
        };
        let Some(defender) = self
            .policy
            .select_target(attacker, &self.combatants, &mut self.rng)
        else {
            self.raise_fault(format!("{actor} has no living target"));
            return;
        };

        let targets: Vec<CombatantId> = match skill.target {
            TargetCardinality::Single => vec![defender],
            TargetCardinality::All => living_opponents(attacker, &self.combatants).collect(),
        };
        let critical = attacker.stats().roll_critical(&mut self.rng, 0.0);
        let primaries = *attacker.stats().primaries();
        let hits: Vec<(CombatantId, u32)> = targets
            .iter()
            .map(|&target| (target, skill.damage(&primaries, critical, &mut self.rng)))
            .collect();

        if !skill.is_basic_attack {
            let paid = self.combatants[actor.index()]
                .stats_mut()
                .consume_mana(skill.mana_cost);
            if !paid {
                tracing::debug!(
                    actor = %actor,
                    skill = %skill.id,
                    "fallback skill used without mana"
                );
            }
            self.flush_pool_changes(actor);
        }

        tracing::debug!(
            actor = %actor,
            skill = %skill.id,
            ?hits,
            critical,
            "monster attack declared"
        );
        self.events.emit(CombatEvent::ActionDeclared {
            actor,
            skill: skill.id.clone(),
            targets,
        });
        self.pending = Some(PendingAction::Monster(MonsterVolley {
            skill,
            defender,
            hits,
            critical,
        }));
        self.state = CombatState::AiWindup { actor };
        self.delay = self.config.pacing.ai_windup;
    }

    fn validate_player_action(
        &self,
        actor: CombatantId,
        skill_id: &SkillId,
        target: Option<CombatantId>,
    ) -> std::result::Result<PlayerAttack, ActionError> {
        let combatant = self
            .combatant(actor)
            .ok_or(ActionError::NotAwaitingAction)?;
        let skill = combatant
            .skill(skill_id)
            .cloned()
            .ok_or_else(|| ActionError::UnknownSkill {
                actor,
                skill: skill_id.clone(),
            })?;

        let available = combatant.stats().current_mp();
        if !skill.is_affordable(available) {
            return Err(ActionError::InsufficientMana {
                actor,
                skill: skill.id.clone(),
                required: skill.mana_cost,
                available,
            });
        }

        let targets = match skill.target {
            TargetCardinality::Single => match target.and_then(|id| self.combatant(id)) {
                Some(t) if t.is_alive() && t.side() != combatant.side() => vec![t.id()],
                _ => return Err(ActionError::InvalidTarget { target }),
            },
            TargetCardinality::All => living_opponents(combatant, &self.combatants).collect(),
        };

        Ok(PlayerAttack { skill, targets })
    }

    /// Hardest tier among the targets; area attacks face the strictest window.
    fn precision_tier(&self, targets: &[CombatantId]) -> DifficultyTier {
        targets
            .iter()
            .filter_map(|id| self.combatant(*id).and_then(Combatant::tier))
            .max()
            .unwrap_or_default()
    }

    fn enter_modifier(&mut self, actor: CombatantId, kind: ModifierKind) {
        tracing::debug!(actor = %actor, %kind, "timing challenge started");
        self.state = CombatState::ModifierRunning { actor, kind };
        self.events.emit(CombatEvent::ModifierStarted { kind, actor });
    }

    fn finish_modifier(
        &mut self,
        actor: CombatantId,
        kind: ModifierKind,
        outcome: ModifierOutcome,
    ) {
        tracing::debug!(actor = %actor, %kind, ?outcome, "timing challenge resolved");
        self.events
            .emit(CombatEvent::ModifierResolved { kind, outcome });
        self.modifier_outcome = Some(outcome);
        self.state = CombatState::Resolving { actor };
    }

    fn resolve(&mut self, actor: CombatantId) {
        let Some(outcome) = self.modifier_outcome.take() else {
            self.raise_fault(format!("resolving {actor} without a modifier outcome"));
            return;
        };
        match self.pending.take() {
            Some(PendingAction::Player(attack)) => {
                self.resolve_player_attack(actor, &attack, outcome);
            }
            Some(PendingAction::Monster(volley)) => {
                self.resolve_monster_volley(actor, volley, outcome);
            }
            None => {
                self.raise_fault(format!("modifier outcome for {actor} with no pending action"));
                return;
            }
        }
        if self.fault.is_some() {
            return;
        }
        self.state = CombatState::TurnEnding { actor };
        self.delay = self.config.pacing.turn_end_delay;
    }

    fn resolve_player_attack(
        &mut self,
        actor: CombatantId,
        attack: &PlayerAttack,
        outcome: ModifierOutcome,
    ) {
        let bonus = if outcome.is_success() {
            self.config.precision_crit_bonus
        } else {
            0.0
        };
        let attacker = &self.combatants[actor.index()];
        let critical = attacker.stats().roll_critical(&mut self.rng, bonus);
        let primaries = *attacker.stats().primaries();

        if !attack.skill.is_basic_attack {
            let paid = self.combatants[actor.index()]
                .stats_mut()
                .consume_mana(attack.skill.mana_cost);
            if !paid {
                self.raise_fault(format!(
                    "{actor} lost the mana for `{}` mid-turn",
                    attack.skill.id
                ));
                return;
            }
            self.flush_pool_changes(actor);
        }

        for &target in &attack.targets {
            let amount = attack.skill.damage(&primaries, critical, &mut self.rng);
            self.apply_damage(actor, target, amount, critical);
        }
    }

    fn resolve_monster_volley(
        &mut self,
        actor: CombatantId,
        volley: MonsterVolley,
        outcome: ModifierOutcome,
    ) {
        if outcome.is_success() {
            let negated = volley.hits.iter().map(|(_, amount)| amount).sum();
            tracing::debug!(
                attacker = %actor,
                defender = %volley.defender,
                skill = %volley.skill.id,
                negated,
                "attack parried"
            );
            self.events.emit(CombatEvent::AttackParried {
                attacker: actor,
                defender: volley.defender,
                negated,
            });
            return;
        }
        for (target, amount) in volley.hits {
            self.apply_damage(actor, target, amount, volley.critical);
        }
    }

    fn apply_damage(
        &mut self,
        source: CombatantId,
        target: CombatantId,
        amount: u32,
        critical: bool,
    ) {
        let Some(victim) = self.combatants.get_mut(target.index()) else {
            return;
        };
        if !victim.is_alive() {
            return;
        }
        victim.take_damage(amount);
        let defeated = !victim.is_alive();

        tracing::debug!(source = %source, target = %target, amount, critical, "damage applied");
        self.events.emit(CombatEvent::DamageApplied {
            source,
            target,
            amount,
            critical,
        });
        self.flush_pool_changes(target);

        if defeated {
            tracing::debug!(target = %target, name = self.name(target), "combatant defeated");
            self.events
                .emit(CombatEvent::CombatantDefeated { combatant: target });
        }
    }

    fn end_turn(&mut self, actor: CombatantId) {
        tracing::debug!(actor = %actor, "turn ended");
        self.events.emit(CombatEvent::TurnEnded { actor });
        self.scheduler.requeue(actor, &self.combatants);
        self.processing = false;
    }

    /// Ends the encounter if a side is wiped out. Returns true if it did.
    fn check_battle_end(&mut self) -> bool {
        let party_alive = self.living(Side::Party).next().is_some();
        let monsters_alive = self.living(Side::Monsters).next().is_some();
        if party_alive && monsters_alive {
            return false;
        }

        let victory = !monsters_alive;
        if victory {
            self.rewards = self.roll_rewards();
        }
        self.state = CombatState::Ended { victory };
        self.processing = false;
        self.pending = None;

        tracing::info!(
            victory,
            gold = self.rewards.gold,
            experience = self.rewards.experience,
            turns = self.turns,
            "encounter ended"
        );
        self.events.emit(CombatEvent::EncounterEnded {
            victory,
            gold: self.rewards.gold,
            experience: self.rewards.experience,
        });
        true
    }

    fn roll_rewards(&mut self) -> Rewards {
        let ranges = &self.config.rewards;
        let monsters = self
            .combatants
            .iter()
            .filter(|c| c.side() == Side::Monsters)
            .count();

        let mut rewards = Rewards::default();
        for _ in 0..monsters {
            rewards.gold = rewards
                .gold
                .saturating_add(self.rng.gen_range(ranges.gold_min..=ranges.gold_max));
            rewards.experience = rewards
                .experience
                .saturating_add(self.rng.gen_range(ranges.xp_min..=ranges.xp_max));
        }
        if self.is_boss {
            rewards.gold = rewards.gold.saturating_mul(ranges.boss_multiplier);
            rewards.experience = rewards.experience.saturating_mul(ranges.boss_multiplier);
        }
        rewards
    }

    fn flush_pool_changes(&mut self, id: CombatantId) {
        let Some(combatant) = self.combatants.get_mut(id.index()) else {
            return;
        };
        for change in combatant.stats_mut().take_changes() {
            self.events.emit(CombatEvent::PoolChanged {
                combatant: id,
                change,
            });
        }
    }

    fn raise_fault(&mut self, reason: String) {
        tracing::error!(%reason, state = %self.state, "internal consistency fault");
        self.state = CombatState::Faulted;
        self.processing = false;
        self.pending = None;
        self.fault = Some(reason);
    }

    fn check_fault(&self) -> Result<()> {
        match &self.fault {
            Some(reason) => Err(CombatError::InternalConsistency(reason.clone())),
            None => Ok(()),
        }
    }

    fn name(&self, id: CombatantId) -> &str {
        self.combatant(id).map_or("?", Combatant::name)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn next_id(combatants: &[Combatant]) -> CombatantId {
    CombatantId::new(combatants.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PrimaryStats;

    fn duel(party_speed: u32, monster_speed: u32) -> CombatSession {
        let library = SkillLibrary::with_defaults();
        let party = [PartyMemberData::new(
            "Ayla",
            PrimaryStats::new(10, 0, 10, 10, party_speed),
            &["strike", "fireball", "cleave"],
        )];
        let monsters = [MonsterData::new(
            "Slime",
            PrimaryStats::new(0, 0, 0, 0, monster_speed),
            &["bite"],
            DifficultyTier::Easy,
        )];
        let mut session = CombatSession::new(CombatConfig::instant(), 7).unwrap();
        session
            .start_encounter(&library, &party, &monsters, false)
            .unwrap();
        session
    }

    mod lifecycle_tests {
        use super::*;

        #[test]
        fn new_session_is_idle() {
            let mut session = CombatSession::new(CombatConfig::default(), 1).unwrap();
            assert_eq!(session.state(), CombatState::Idle);
            assert_eq!(session.current_actor(), None);
            session.advance_turn();
            assert_eq!(session.state(), CombatState::Idle);
            assert!(session.take_events().is_empty());
        }

        #[test]
        fn invalid_config_is_rejected() {
            let mut config = CombatConfig::default();
            config.parry.duration = 0.0;
            assert!(matches!(
                CombatSession::new(config, 0),
                Err(CombatError::Config(_))
            ));
        }

        #[test]
        fn cannot_start_twice() {
            let mut session = duel(10, 5);
            let err = session
                .start_encounter(&SkillLibrary::with_defaults(), &[], &[], false)
                .unwrap_err();
            assert!(matches!(err, CombatError::AlreadyStarted));
        }

        #[test]
        fn empty_side_keeps_session_idle() {
            let library = SkillLibrary::with_defaults();
            let party = [PartyMemberData::new("Solo", PrimaryStats::default(), &["strike"])];
            let mut session = CombatSession::new(CombatConfig::instant(), 0).unwrap();

            let err = session
                .start_encounter(&library, &party, &[], false)
                .unwrap_err();
            assert!(matches!(err, CombatError::Roster(RosterError::EmptySide("monster"))));
            assert_eq!(session.state(), CombatState::Idle);
        }

        #[test]
        fn ids_follow_roster_order() {
            let session = duel(10, 5);
            assert!(session.combatant(CombatantId::new(0)).unwrap().is_player());
            assert!(!session.combatant(CombatantId::new(1)).unwrap().is_player());
            assert!(session.combatant(CombatantId::new(2)).is_none());
        }
    }

    mod turn_flow_tests {
        use super::*;

        #[test]
        fn faster_party_member_waits_for_a_command() {
            let session = duel(10, 5);
            assert_eq!(
                session.state(),
                CombatState::AwaitingPlayerAction {
                    actor: CombatantId::new(0)
                }
            );
            assert!(session.is_processing());
            assert_eq!(session.turns_taken(), 1);
        }

        #[test]
        fn advance_turn_is_ignored_while_processing() {
            let mut session = duel(10, 5);
            session.take_events();
            session.advance_turn();
            assert!(session.take_events().is_empty());
            assert_eq!(session.turns_taken(), 1);
        }

        #[test]
        fn faster_monster_opens_a_parry() {
            let session = duel(5, 10);
            assert_eq!(
                session.state(),
                CombatState::ModifierRunning {
                    actor: CombatantId::new(1),
                    kind: ModifierKind::Parry
                }
            );
            assert!(matches!(
                session.active_modifier(),
                Some(ModifierView::Parry { .. })
            ));
        }

        #[test]
        fn valid_action_starts_precision_challenge() {
            let mut session = duel(10, 5);
            session
                .submit_player_action(&"strike".into(), Some(CombatantId::new(1)))
                .unwrap();
            assert_eq!(
                session.state(),
                CombatState::ModifierRunning {
                    actor: CombatantId::new(0),
                    kind: ModifierKind::Precision
                }
            );
        }

        #[test]
        fn timeout_resolves_and_passes_the_turn() {
            let mut session = duel(10, 5);
            session
                .submit_player_action(&"strike".into(), Some(CombatantId::new(1)))
                .unwrap();
            session.tick(10.0).unwrap();

            let events = session.take_events();
            assert!(events.contains(&CombatEvent::ModifierResolved {
                kind: ModifierKind::Precision,
                outcome: ModifierOutcome::TimedOut,
            }));
            assert!(events.contains(&CombatEvent::TurnEnded {
                actor: CombatantId::new(0)
            }));
        }
    }

    mod rejection_tests {
        use super::*;

        #[test]
        fn unknown_skill_is_rejected() {
            let mut session = duel(10, 5);
            let err = session
                .submit_player_action(&"frost_nova".into(), Some(CombatantId::new(1)))
                .unwrap_err();
            assert!(matches!(err, ActionError::UnknownSkill { .. }));
            assert!(matches!(
                session.state(),
                CombatState::AwaitingPlayerAction { .. }
            ));
        }

        #[test]
        fn friendly_target_is_rejected() {
            let mut session = duel(10, 5);
            let err = session
                .submit_player_action(&"strike".into(), Some(CombatantId::new(0)))
                .unwrap_err();
            assert_eq!(
                err,
                ActionError::InvalidTarget {
                    target: Some(CombatantId::new(0))
                }
            );
        }

        #[test]
        fn missing_target_is_rejected_for_single_target_skills() {
            let mut session = duel(10, 5);
            let err = session
                .submit_player_action(&"strike".into(), None)
                .unwrap_err();
            assert_eq!(err, ActionError::InvalidTarget { target: None });
        }

        #[test]
        fn area_skill_needs_no_target() {
            let mut session = duel(10, 5);
            session.submit_player_action(&"cleave".into(), None).unwrap();
            let declared = session
                .take_events()
                .into_iter()
                .find_map(|e| match e {
                    CombatEvent::ActionDeclared { targets, .. } => Some(targets),
                    _ => None,
                })
                .unwrap();
            assert_eq!(declared, vec![CombatantId::new(1)]);
        }

        #[test]
        fn timing_input_without_challenge_is_rejected() {
            let mut session = duel(10, 5);
            assert_eq!(
                session.submit_timing_input(),
                Err(ActionError::NoActiveModifier)
            );
        }

        #[test]
        fn action_during_monster_turn_is_rejected() {
            let mut session = duel(5, 10);
            assert_eq!(
                session.submit_player_action(&"strike".into(), Some(CombatantId::new(1))),
                Err(ActionError::NotAwaitingAction)
            );
        }
    }

    mod abort_tests {
        use super::*;

        #[test]
        fn abort_ends_without_rewards() {
            let mut session = duel(10, 5);
            assert!(session.abort());
            assert_eq!(session.state(), CombatState::Aborted);
            assert_eq!(session.rewards(), Rewards::default());
            assert!(!session.abort());
            assert_eq!(
                session.submit_player_action(&"strike".into(), Some(CombatantId::new(1))),
                Err(ActionError::EncounterOver)
            );
            assert_eq!(
                session.take_events().last(),
                Some(&CombatEvent::EncounterAborted)
            );
        }

        #[test]
        fn idle_session_cannot_abort() {
            let mut session = CombatSession::new(CombatConfig::default(), 0).unwrap();
            assert!(!session.abort());
        }
    }

    mod fault_tests {
        use super::*;

        #[test]
        fn outcome_without_pending_action_faults() {
            let mut session = duel(10, 5);
            session.state = CombatState::Resolving {
                actor: CombatantId::new(0),
            };
            session.modifier_outcome = Some(ModifierOutcome::Success);

            let err = session.tick(0.0).unwrap_err();
            assert!(matches!(err, CombatError::InternalConsistency(_)));
            assert_eq!(session.state(), CombatState::Faulted);

            // faulted sessions stay faulted
            assert!(session.tick(1.0).is_err());
            session.advance_turn();
            assert_eq!(session.state(), CombatState::Faulted);
        }
    }

    mod report_tests {
        use super::*;

        #[test]
        fn party_report_writes_back_pools() {
            let session = duel(10, 5);
            let report = session.party_report();
            assert_eq!(report.len(), 1);
            assert_eq!(report[0].name, "Ayla");

            let mut data = PartyMemberData::new("Ayla", PrimaryStats::default(), &["strike"]);
            report[0].write_back(&mut data);
            assert_eq!(data.current_hp, Some(report[0].current_hp));
            assert_eq!(data.current_mp, Some(report[0].current_mp));
        }

        #[test]
        fn states_display_readably() {
            assert_eq!(CombatState::Ended { victory: true }.to_string(), "victory");
            assert_eq!(
                CombatState::ModifierRunning {
                    actor: CombatantId::new(2),
                    kind: ModifierKind::Parry
                }
                .to_string(),
                "parry running (#2)"
            );
        }
    }
}
