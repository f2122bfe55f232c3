//! Test helper functions for building encounters and driving sessions.
//!
//! Sessions built here use [`CombatConfig::instant`] unless a config is
//! passed explicitly, so only the timing challenges consume time.

use crate::combatant::{CombatantId, DifficultyTier, MonsterData, PartyMemberData};
use crate::config::CombatConfig;
use crate::event::CombatEvent;
use crate::modifier::ModifierOutcome;
use crate::session::{CombatSession, CombatState};
use crate::skill::SkillLibrary;
use crate::stats::PrimaryStats;

/// Frame length used when stepping a challenge toward its success zone.
pub const FRAME: f32 = 1.0 / 120.0;

// =============================================================================
// Roster Builders
// =============================================================================

/// A party member with the given strength and speed and a full kit.
pub fn hero(name: &str, strength: u32, speed: u32) -> PartyMemberData {
    PartyMemberData::new(
        name,
        PrimaryStats::new(strength, 0, 10, 10, speed),
        &["strike", "fireball", "cleave"],
    )
}

/// A monster with only a basic attack.
pub fn monster(name: &str, speed: u32, tier: DifficultyTier) -> MonsterData {
    MonsterData::new(name, PrimaryStats::new(4, 0, 0, 0, speed), &["bite"], tier)
}

/// A monster that starts with `hp` hit points.
pub fn weakened_monster(name: &str, speed: u32, hp: u32) -> MonsterData {
    let mut data = monster(name, speed, DifficultyTier::Normal);
    data.current_hp = Some(hp);
    data
}

/// A config with no pacing delays and no base critical chance.
pub fn no_crit_config() -> CombatConfig {
    CombatConfig {
        base_crit_chance: 0.0,
        ..CombatConfig::instant()
    }
}

// =============================================================================
// Session Setup
// =============================================================================

/// Starts an encounter with the instant config.
pub fn start(
    party: &[PartyMemberData],
    monsters: &[MonsterData],
    is_boss: bool,
    seed: u64,
) -> CombatSession {
    start_with(CombatConfig::instant(), party, monsters, is_boss, seed)
}

/// Starts an encounter with an explicit config.
pub fn start_with(
    config: CombatConfig,
    party: &[PartyMemberData],
    monsters: &[MonsterData],
    is_boss: bool,
    seed: u64,
) -> CombatSession {
    let mut session = CombatSession::new(config, seed).expect("valid config");
    session
        .start_encounter(&SkillLibrary::with_defaults(), party, monsters, is_boss)
        .expect("valid rosters");
    session
}

// =============================================================================
// Driving
// =============================================================================

/// Steps the running challenge until an input would succeed, then submits it.
pub fn hit_timing(session: &mut CombatSession) -> ModifierOutcome {
    for _ in 0..10_000 {
        let view = session.active_modifier().expect("a challenge is running");
        if view.in_success_zone() {
            return session
                .submit_timing_input()
                .expect("input accepted")
                .expect("first input resolves");
        }
        session.tick(FRAME).expect("no fault");
    }
    panic!("success zone never reached");
}

/// Presses immediately; the challenge starts outside its success zone.
pub fn miss_timing(session: &mut CombatSession) -> ModifierOutcome {
    session
        .submit_timing_input()
        .expect("input accepted")
        .expect("first input resolves")
}

/// Lets the running challenge time out.
pub fn let_timing_expire(session: &mut CombatSession) {
    session.tick(60.0).expect("no fault");
}

/// Actor currently waiting for a command.
pub fn awaiting_actor(session: &CombatSession) -> Option<CombatantId> {
    match session.state() {
        CombatState::AwaitingPlayerAction { actor } => Some(actor),
        _ => None,
    }
}

// =============================================================================
// Event Queries
// =============================================================================

/// Actors of every `TurnStarted` event, in order.
pub fn turn_starts(events: &[CombatEvent]) -> Vec<CombatantId> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::TurnStarted { actor } => Some(*actor),
            _ => None,
        })
        .collect()
}

/// `(target, amount, critical)` of every `DamageApplied` event.
pub fn damage_dealt(events: &[CombatEvent]) -> Vec<(CombatantId, u32, bool)> {
    events
        .iter()
        .filter_map(|e| match e {
            CombatEvent::DamageApplied {
                target,
                amount,
                critical,
                ..
            } => Some((*target, *amount, *critical)),
            _ => None,
        })
        .collect()
}

/// Number of `EncounterEnded` events.
pub fn end_count(events: &[CombatEvent]) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, CombatEvent::EncounterEnded { .. }))
        .count()
}
