//! Action selection for AI-controlled combatants.
//!
//! [`ActionPolicy`] is the seam the session calls when a monster acts. The
//! stock [`RandomPolicy`] picks uniformly among usable skills and living
//! opponents; the autopilot reuses it for the party side.
//!
//! Selection never fails for a valid roster: when nothing is affordable the
//! policy falls back to kit slot 0, which roster validation guarantees is a
//! basic attack.

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::RngCore;

use crate::combatant::{Combatant, CombatantId};
use crate::skill::SkillDescriptor;

/// Chooses what an automated combatant does on its turn.
pub trait ActionPolicy: Send {
    /// Picks a skill from the actor's kit.
    ///
    /// Returns `None` only if the kit is empty.
    fn select_skill(
        &mut self,
        actor: &Combatant,
        rng: &mut dyn RngCore,
    ) -> Option<Arc<SkillDescriptor>>;

    /// Picks a target among the actor's living opponents.
    ///
    /// Returns `None` if no opponent is alive.
    fn select_target(
        &mut self,
        actor: &Combatant,
        combatants: &[Combatant],
        rng: &mut dyn RngCore,
    ) -> Option<CombatantId>;
}

/// Uniform random choice of skill and target.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomPolicy;

impl RandomPolicy {
    /// Creates the policy.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ActionPolicy for RandomPolicy {
    fn select_skill(
        &mut self,
        actor: &Combatant,
        rng: &mut dyn RngCore,
    ) -> Option<Arc<SkillDescriptor>> {
        let mp = actor.stats().current_mp();
        let usable: Vec<&Arc<SkillDescriptor>> = actor
            .skills()
            .iter()
            .filter(|skill| skill.is_affordable(mp))
            .collect();

        usable
            .choose(rng)
            .map(|skill| Arc::clone(skill))
            .or_else(|| actor.skills().first().cloned())
    }

    fn select_target(
        &mut self,
        actor: &Combatant,
        combatants: &[Combatant],
        rng: &mut dyn RngCore,
    ) -> Option<CombatantId> {
        let opponents: Vec<CombatantId> = living_opponents(actor, combatants).collect();
        opponents.choose(rng).copied()
    }
}

/// Living combatants on the other side from `actor`, in id order.
pub fn living_opponents<'a>(
    actor: &Combatant,
    combatants: &'a [Combatant],
) -> impl Iterator<Item = CombatantId> + 'a {
    let side = actor.side().opponent();
    combatants
        .iter()
        .filter(move |c| c.side() == side && c.is_alive())
        .map(Combatant::id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{DifficultyTier, MonsterData, PartyMemberData};
    use crate::skill::{SkillId, SkillLibrary};
    use crate::stats::PrimaryStats;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn setup() -> Vec<Combatant> {
        let library = SkillLibrary::with_defaults();
        let stats = PrimaryStats::new(10, 5, 5, 5, 5);
        let hero = PartyMemberData::new("Hero", stats, &["strike", "fireball"]);
        let sage = PartyMemberData::new("Sage", stats, &["arcane_bolt"]);
        let rat = MonsterData::new("Rat", stats, &["bite", "frost_nova"], DifficultyTier::Easy);
        let bat = MonsterData::new("Bat", stats, &["bite"], DifficultyTier::Easy);
        vec![
            Combatant::party_member(CombatantId::new(0), &hero, &library, 5.0).unwrap(),
            Combatant::party_member(CombatantId::new(1), &sage, &library, 5.0).unwrap(),
            Combatant::monster(CombatantId::new(2), &rat, &library, 5.0).unwrap(),
            Combatant::monster(CombatantId::new(3), &bat, &library, 5.0).unwrap(),
        ]
    }

    mod skill_tests {
        use super::*;

        #[test]
        fn picks_every_usable_skill_eventually() {
            let combatants = setup();
            let mut rng = ChaCha8Rng::seed_from_u64(1);
            let mut policy = RandomPolicy::new();

            let picked: HashSet<SkillId> = (0..100)
                .filter_map(|_| policy.select_skill(&combatants[2], &mut rng))
                .map(|s| s.id.clone())
                .collect();
            assert_eq!(picked.len(), 2);
        }

        #[test]
        fn never_picks_unaffordable_skill() {
            let mut combatants = setup();
            let mp = combatants[2].stats().current_mp();
            assert!(combatants[2].stats_mut().consume_mana(mp));

            let mut rng = ChaCha8Rng::seed_from_u64(2);
            let mut policy = RandomPolicy::new();
            for _ in 0..50 {
                let skill = policy.select_skill(&combatants[2], &mut rng).unwrap();
                assert!(skill.is_basic_attack, "picked {} with no mana", skill.id);
            }
        }
    }

    mod target_tests {
        use super::*;

        #[test]
        fn targets_only_living_opponents() {
            let mut combatants = setup();
            combatants[0].take_damage(u32::MAX);

            let mut rng = ChaCha8Rng::seed_from_u64(3);
            let mut policy = RandomPolicy::new();
            for _ in 0..50 {
                let target = policy.select_target(&combatants[3], &combatants, &mut rng);
                assert_eq!(target, Some(CombatantId::new(1)));
            }
        }

        #[test]
        fn no_target_when_opponents_are_dead() {
            let mut combatants = setup();
            combatants[2].take_damage(u32::MAX);
            combatants[3].take_damage(u32::MAX);

            let mut policy = RandomPolicy::new();
            let target = policy.select_target(
                &combatants[0],
                &combatants,
                &mut ChaCha8Rng::seed_from_u64(0),
            );
            assert_eq!(target, None);
        }

        #[test]
        fn living_opponents_are_in_id_order() {
            let combatants = setup();
            let ids: Vec<u32> = living_opponents(&combatants[0], &combatants)
                .map(CombatantId::as_u32)
                .collect();
            assert_eq!(ids, vec![2, 3]);
        }
    }
}
