//! Combatants: party members and monsters.
//!
//! This module provides:
//! - [`CombatantId`]: session-unique identifier
//! - [`Side`]: which roster a combatant belongs to
//! - [`CombatantKind`]: variant-specific data (party member or monster)
//! - [`Combatant`]: the complete combatant with its stat block and kit
//! - [`PartyMemberData`] / [`MonsterData`]: roster entries supplied by the host
//!
//! # Architecture
//!
//! Capabilities common to both variants (name, speed, liveness, side,
//! damage and healing) live on [`Combatant`]. The [`CombatantKind`] enum holds
//! what differs, the same way an entity pairs a tag with typed component
//! storage. The stat block is owned; skills are shared `Arc`s from the
//! [`SkillLibrary`].
//!
//! # Example
//!
//! ```
//! use skirmish_core::combatant::{Combatant, CombatantId, PartyMemberData};
//! use skirmish_core::skill::SkillLibrary;
//! use skirmish_core::stats::PrimaryStats;
//!
//! let library = SkillLibrary::with_defaults();
//! let data = PartyMemberData::new("Ayla", PrimaryStats::new(12, 8, 4, 6, 10), &["strike"]);
//! let ayla = Combatant::party_member(CombatantId::new(0), &data, &library, 5.0).unwrap();
//!
//! assert!(ayla.is_player());
//! assert!(ayla.is_alive());
//! assert_eq!(ayla.speed(), 10);
//! ```

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RosterError;
use crate::skill::{SkillDescriptor, SkillId, SkillLibrary};
use crate::stats::{PrimaryStats, StatBlock};

/// Session-unique identifier for a combatant.
///
/// Ids are assigned in roster order: party members first, then monsters.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CombatantId(u32);

impl CombatantId {
    /// Creates a new `CombatantId`.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Returns the id as an index into the session's combatant list.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CombatantId({})", self.0)
    }
}

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which roster a combatant fights for.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// Player-controlled party
    Party,
    /// AI-controlled monsters
    Monsters,
}

impl Side {
    /// Returns the opposing side.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Party => Self::Monsters,
            Self::Monsters => Self::Party,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Party => write!(f, "party"),
            Self::Monsters => write!(f, "monster"),
        }
    }
}

/// Monster difficulty tier; sizes the precision window of attacks against it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DifficultyTier {
    /// Wide precision window
    Easy,
    /// Medium precision window
    #[default]
    Normal,
    /// Narrow precision window
    Hard,
}

// =============================================================================
// Roster Data
// =============================================================================

/// Roster entry for a party member, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyMemberData {
    /// Display name
    pub name: String,
    /// Primary attributes
    pub stats: PrimaryStats,
    /// Skill ids; slot 0 must be a basic attack
    pub skills: Vec<SkillId>,
    /// HP carried over from earlier encounters (full if absent)
    #[serde(default)]
    pub current_hp: Option<u32>,
    /// MP carried over from earlier encounters (full if absent)
    #[serde(default)]
    pub current_mp: Option<u32>,
}

impl PartyMemberData {
    /// Creates an entry with full pools.
    #[must_use]
    pub fn new(name: &str, stats: PrimaryStats, skills: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            stats,
            skills: skills.iter().map(|s| SkillId::new(s)).collect(),
            current_hp: None,
            current_mp: None,
        }
    }
}

/// Roster entry for a monster, as supplied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterData {
    /// Display name
    pub name: String,
    /// Primary attributes
    pub stats: PrimaryStats,
    /// Skill ids; slot 0 must be a basic attack
    pub skills: Vec<SkillId>,
    /// Difficulty tier
    #[serde(default)]
    pub tier: DifficultyTier,
    /// Starting HP (full if absent)
    #[serde(default)]
    pub current_hp: Option<u32>,
    /// Starting MP (full if absent)
    #[serde(default)]
    pub current_mp: Option<u32>,
}

impl MonsterData {
    /// Creates an entry with full pools.
    #[must_use]
    pub fn new(name: &str, stats: PrimaryStats, skills: &[&str], tier: DifficultyTier) -> Self {
        Self {
            name: name.to_string(),
            stats,
            skills: skills.iter().map(|s| SkillId::new(s)).collect(),
            tier,
            current_hp: None,
            current_mp: None,
        }
    }
}

// =============================================================================
// Combatant
// =============================================================================

/// Party-member specific state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyMember;

/// Monster specific state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Monster {
    /// Difficulty tier
    pub tier: DifficultyTier,
}

/// Variant storage for a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatantKind {
    /// Player-controlled party member
    PartyMember(PartyMember),
    /// AI-controlled monster
    Monster(Monster),
}

impl CombatantKind {
    /// Returns the side this variant fights for.
    #[must_use]
    pub const fn side(&self) -> Side {
        match self {
            Self::PartyMember(_) => Side::Party,
            Self::Monster(_) => Side::Monsters,
        }
    }

    /// Returns the monster data, if this is a monster.
    #[must_use]
    pub const fn as_monster(&self) -> Option<&Monster> {
        match self {
            Self::Monster(monster) => Some(monster),
            Self::PartyMember(_) => None,
        }
    }
}

/// A participant in an encounter.
#[derive(Debug, Clone)]
pub struct Combatant {
    id: CombatantId,
    name: String,
    kind: CombatantKind,
    stats: StatBlock,
    skills: Vec<Arc<SkillDescriptor>>,
}

impl Combatant {
    /// Materializes a party member from roster data.
    ///
    /// # Errors
    ///
    /// Returns a [`RosterError`] if the kit is empty, references an unknown
    /// skill, or does not start with a basic attack.
    pub fn party_member(
        id: CombatantId,
        data: &PartyMemberData,
        library: &SkillLibrary,
        base_crit_chance: f32,
    ) -> Result<Self, RosterError> {
        let skills = resolve_kit(&data.name, &data.skills, library)?;
        let stats = StatBlock::new(data.stats, base_crit_chance)
            .with_pools(data.current_hp, data.current_mp);
        Ok(Self {
            id,
            name: data.name.clone(),
            kind: CombatantKind::PartyMember(PartyMember),
            stats,
            skills,
        })
    }

    /// Materializes a monster from roster data.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Combatant::party_member`].
    pub fn monster(
        id: CombatantId,
        data: &MonsterData,
        library: &SkillLibrary,
        base_crit_chance: f32,
    ) -> Result<Self, RosterError> {
        let skills = resolve_kit(&data.name, &data.skills, library)?;
        let stats = StatBlock::new(data.stats, base_crit_chance)
            .with_pools(data.current_hp, data.current_mp);
        Ok(Self {
            id,
            name: data.name.clone(),
            kind: CombatantKind::Monster(Monster { tier: data.tier }),
            stats,
            skills,
        })
    }

    /// Returns the id.
    #[must_use]
    pub const fn id(&self) -> CombatantId {
        self.id
    }

    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the variant storage.
    #[must_use]
    pub const fn kind(&self) -> &CombatantKind {
        &self.kind
    }

    /// Returns the side.
    #[must_use]
    pub const fn side(&self) -> Side {
        self.kind.side()
    }

    /// True for party members.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.kind, CombatantKind::PartyMember(_))
    }

    /// Returns the current speed.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.stats.speed()
    }

    /// True while HP is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.stats.is_alive()
    }

    /// Returns the difficulty tier for monsters.
    #[must_use]
    pub fn tier(&self) -> Option<DifficultyTier> {
        self.kind.as_monster().map(|m| m.tier)
    }

    /// Applies damage and returns the HP actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        self.stats.take_damage(amount)
    }

    /// Heals and returns the HP actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        self.stats.heal(amount)
    }

    /// Returns the stat block.
    #[must_use]
    pub const fn stats(&self) -> &StatBlock {
        &self.stats
    }

    /// Returns the stat block mutably, for buffs and out-of-combat healing.
    pub fn stats_mut(&mut self) -> &mut StatBlock {
        &mut self.stats
    }

    /// Returns the kit in slot order.
    #[must_use]
    pub fn skills(&self) -> &[Arc<SkillDescriptor>] {
        &self.skills
    }

    /// Looks up a skill in this combatant's kit.
    #[must_use]
    pub fn skill(&self, id: &SkillId) -> Option<&Arc<SkillDescriptor>> {
        self.skills.iter().find(|s| &s.id == id)
    }
}

fn resolve_kit(
    name: &str,
    ids: &[SkillId],
    library: &SkillLibrary,
) -> Result<Vec<Arc<SkillDescriptor>>, RosterError> {
    let skills = ids
        .iter()
        .map(|id| {
            library.get(id).ok_or_else(|| RosterError::UnknownSkill {
                combatant: name.to_string(),
                skill: id.clone(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(bad) = skills
        .iter()
        .find(|s| !s.stat_scaling.is_finite() || s.stat_scaling < 0.0)
    {
        return Err(RosterError::InvalidScaling {
            combatant: name.to_string(),
            skill: bad.id.clone(),
            scaling: bad.stat_scaling,
        });
    }

    match skills.first() {
        None => Err(RosterError::EmptyKit(name.to_string())),
        Some(first) if !first.is_basic_attack => Err(RosterError::MissingBasicAttack {
            combatant: name.to_string(),
            skill: first.id.clone(),
        }),
        Some(_) => Ok(skills),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> SkillLibrary {
        SkillLibrary::with_defaults()
    }

    mod construction_tests {
        use super::*;

        #[test]
        fn party_member_carries_pools_over() {
            let mut data =
                PartyMemberData::new("Bram", PrimaryStats::new(10, 0, 0, 0, 4), &["strike"]);
            data.current_hp = Some(42);

            let bram = Combatant::party_member(CombatantId::new(0), &data, &library(), 5.0)
                .unwrap();
            assert_eq!(bram.stats().current_hp(), 42);
            assert_eq!(bram.stats().current_mp(), bram.stats().max_mp());
            assert_eq!(bram.side(), Side::Party);
            assert!(bram.tier().is_none());
        }

        #[test]
        fn monster_keeps_its_tier() {
            let data = MonsterData::new(
                "Ogre",
                PrimaryStats::new(20, 0, 0, 0, 2),
                &["bite", "cleave"],
                DifficultyTier::Hard,
            );
            let ogre = Combatant::monster(CombatantId::new(1), &data, &library(), 0.0).unwrap();
            assert!(!ogre.is_player());
            assert_eq!(ogre.tier(), Some(DifficultyTier::Hard));
            assert_eq!(ogre.skills().len(), 2);
            assert!(ogre.skill(&"cleave".into()).is_some());
            assert!(ogre.skill(&"fireball".into()).is_none());
        }

        #[test]
        fn zero_carried_hp_is_dead_on_arrival() {
            let mut data = PartyMemberData::new("Ghost", PrimaryStats::default(), &["strike"]);
            data.current_hp = Some(0);
            let ghost = Combatant::party_member(CombatantId::new(0), &data, &library(), 0.0)
                .unwrap();
            assert!(!ghost.is_alive());
        }
    }

    mod kit_validation_tests {
        use super::*;

        #[test]
        fn unknown_skill_is_rejected() {
            let data = PartyMemberData::new("Cid", PrimaryStats::default(), &["strike", "nope"]);
            let err = Combatant::party_member(CombatantId::new(0), &data, &library(), 0.0)
                .unwrap_err();
            assert_eq!(
                err,
                RosterError::UnknownSkill {
                    combatant: "Cid".to_string(),
                    skill: SkillId::new("nope"),
                }
            );
        }

        #[test]
        fn empty_kit_is_rejected() {
            let data = PartyMemberData::new("Dee", PrimaryStats::default(), &[]);
            let err = Combatant::party_member(CombatantId::new(0), &data, &library(), 0.0)
                .unwrap_err();
            assert_eq!(err, RosterError::EmptyKit("Dee".to_string()));
        }

        #[test]
        fn slot_zero_must_be_basic_attack() {
            let data = MonsterData::new(
                "Imp",
                PrimaryStats::default(),
                &["fireball", "bite"],
                DifficultyTier::Easy,
            );
            let err = Combatant::monster(CombatantId::new(0), &data, &library(), 0.0).unwrap_err();
            assert!(matches!(err, RosterError::MissingBasicAttack { .. }));
        }

        #[test]
        fn negative_scaling_is_rejected() {
            use crate::skill::DamageType;

            let mut library = library();
            let mut curse =
                SkillDescriptor::basic("curse", "Curse", DamageType::Magical, (1, 2), 0.5);
            curse.stat_scaling = -0.5;
            library.register(curse);

            let data = MonsterData::new(
                "Hex",
                PrimaryStats::default(),
                &["curse"],
                DifficultyTier::Easy,
            );
            let err = Combatant::monster(CombatantId::new(0), &data, &library, 0.0).unwrap_err();
            assert!(matches!(err, RosterError::InvalidScaling { scaling, .. } if scaling < 0.0));
        }
    }

    mod capability_tests {
        use super::*;

        #[test]
        fn damage_and_heal_go_through_the_stat_block() {
            let data = PartyMemberData::new("Eve", PrimaryStats::default(), &["strike"]);
            let mut eve = Combatant::party_member(CombatantId::new(0), &data, &library(), 0.0)
                .unwrap();

            assert_eq!(eve.take_damage(30), 30);
            assert_eq!(eve.heal(50), 30);
            assert_eq!(eve.take_damage(500), 100);
            assert!(!eve.is_alive());
        }

        #[test]
        fn sides_oppose_each_other() {
            assert_eq!(Side::Party.opponent(), Side::Monsters);
            assert_eq!(Side::Monsters.opponent(), Side::Party);
        }

        #[test]
        fn ids_display_compactly() {
            assert_eq!(CombatantId::new(7).to_string(), "#7");
            assert_eq!(format!("{:?}", CombatantId::new(7)), "CombatantId(7)");
        }
    }
}
