//! Skill descriptors and the shared skill library.
//!
//! A [`SkillDescriptor`] is an immutable template: many combatants share the
//! same `Arc<SkillDescriptor>` through their kits. The damage formula is a
//! pure function of the attacker's stats, the critical flag and one random
//! draw from the base damage range.
//!
//! # Damage Formula
//!
//! ```text
//! raw    = round(uniform(min, max) + scaling_stat * stat_scaling)
//! damage = critical ? round(raw * 1.5) : raw
//! ```
//!
//! The scaling stat is strength for [`DamageType::Physical`] and intelligence
//! for [`DamageType::Magical`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::stats::PrimaryStats;

/// Damage multiplier applied to critical hits.
pub const CRITICAL_MULTIPLIER: f32 = 1.5;

/// Identifier of a skill in a [`SkillLibrary`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SkillId(String);

impl SkillId {
    /// Creates a new `SkillId`.
    #[must_use]
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SkillId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SkillId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Which attribute a skill scales with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    /// Scales with strength
    Physical,
    /// Scales with intelligence
    Magical,
}

/// How many combatants a skill hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetCardinality {
    /// One chosen opponent
    #[default]
    Single,
    /// Every living opponent
    All,
}

/// Static rules for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillDescriptor {
    /// Library key
    pub id: SkillId,
    /// Display name
    pub name: String,
    /// Scaling attribute
    pub damage_type: DamageType,
    /// Target cardinality
    #[serde(default)]
    pub target: TargetCardinality,
    /// Lower bound of the base damage roll (inclusive)
    pub min_damage: u32,
    /// Upper bound of the base damage roll (inclusive)
    pub max_damage: u32,
    /// Multiplier applied to the scaling attribute
    pub stat_scaling: f32,
    /// Mana spent on use
    #[serde(default)]
    pub mana_cost: u32,
    /// Basic attacks are always usable regardless of mana
    #[serde(default)]
    pub is_basic_attack: bool,
}

impl SkillDescriptor {
    /// Creates a zero-cost single-target basic attack.
    #[must_use]
    pub fn basic(
        id: &str,
        name: &str,
        damage_type: DamageType,
        range: (u32, u32),
        scaling: f32,
    ) -> Self {
        Self {
            id: SkillId::new(id),
            name: name.to_string(),
            damage_type,
            target: TargetCardinality::Single,
            min_damage: range.0,
            max_damage: range.1,
            stat_scaling: scaling,
            mana_cost: 0,
            is_basic_attack: true,
        }
    }

    /// Creates a mana-costing skill.
    #[must_use]
    pub fn spell(
        id: &str,
        name: &str,
        damage_type: DamageType,
        target: TargetCardinality,
        range: (u32, u32),
        scaling: f32,
        mana_cost: u32,
    ) -> Self {
        Self {
            id: SkillId::new(id),
            name: name.to_string(),
            damage_type,
            target,
            min_damage: range.0,
            max_damage: range.1,
            stat_scaling: scaling,
            mana_cost,
            is_basic_attack: false,
        }
    }

    /// Returns the attribute value this skill scales with.
    #[must_use]
    pub const fn scaling_stat(&self, primaries: &PrimaryStats) -> u32 {
        match self.damage_type {
            DamageType::Physical => primaries.strength,
            DamageType::Magical => primaries.intelligence,
        }
    }

    /// True if `available_mp` covers the cost. Basic attacks are always affordable.
    #[must_use]
    pub const fn is_affordable(&self, available_mp: u32) -> bool {
        self.is_basic_attack || self.mana_cost <= available_mp
    }

    /// Rolls damage for one target.
    #[must_use]
    pub fn damage<R: Rng + ?Sized>(
        &self,
        attacker: &PrimaryStats,
        is_critical: bool,
        rng: &mut R,
    ) -> u32 {
        let lo = self.min_damage.min(self.max_damage);
        let hi = self.min_damage.max(self.max_damage);
        let base = rng.gen_range(lo..=hi);
        Self::apply_formula(self.scaling_stat(attacker), base, self.stat_scaling, is_critical)
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn apply_formula(stat: u32, base: u32, scaling: f32, is_critical: bool) -> u32 {
        let raw = (base as f32 + stat as f32 * scaling).round().max(0.0);
        let total = if is_critical {
            (raw * CRITICAL_MULTIPLIER).round()
        } else {
            raw
        };
        total as u32
    }
}

// =============================================================================
// Skill Library
// =============================================================================

/// Registry of shared skill descriptors keyed by id.
///
/// Rosters reference skills by id; the session resolves them here when it
/// materializes combatants so every kit shares the same `Arc`.
#[derive(Debug, Clone, Default)]
pub struct SkillLibrary {
    skills: HashMap<SkillId, Arc<SkillDescriptor>>,
}

impl SkillLibrary {
    /// Creates an empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a library from a list of descriptors. Later duplicates win.
    #[must_use]
    pub fn from_skills(skills: impl IntoIterator<Item = SkillDescriptor>) -> Self {
        let mut library = Self::new();
        for skill in skills {
            library.register(skill);
        }
        library
    }

    /// Library with the stock skill set.
    #[must_use]
    pub fn with_defaults() -> Self {
        use DamageType::{Magical, Physical};
        use TargetCardinality::{All, Single};

        Self::from_skills([
            SkillDescriptor::basic("strike", "Strike", Physical, (5, 10), 0.5),
            SkillDescriptor::basic("bite", "Bite", Physical, (3, 8), 0.4),
            SkillDescriptor::basic("arcane_bolt", "Arcane Bolt", Magical, (4, 8), 0.5),
            SkillDescriptor::spell(
                "power_strike",
                "Power Strike",
                Physical,
                Single,
                (10, 16),
                0.7,
                10,
            ),
            SkillDescriptor::spell("cleave", "Cleave", Physical, All, (4, 8), 0.3, 15),
            SkillDescriptor::spell("fireball", "Fireball", Magical, Single, (12, 20), 0.8, 20),
            SkillDescriptor::spell("frost_nova", "Frost Nova", Magical, All, (6, 10), 0.5, 25),
        ])
    }

    /// Registers a skill, replacing any previous entry with the same id.
    pub fn register(&mut self, skill: SkillDescriptor) -> Arc<SkillDescriptor> {
        let skill = Arc::new(skill);
        self.skills.insert(skill.id.clone(), Arc::clone(&skill));
        skill
    }

    /// Looks up a skill by id.
    #[must_use]
    pub fn get(&self, id: &SkillId) -> Option<Arc<SkillDescriptor>> {
        self.skills.get(id).cloned()
    }

    /// Number of registered skills.
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// True if no skills are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }
}
