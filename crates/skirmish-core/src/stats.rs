//! Stat blocks: primary attributes, derived pools and their mutation rules.
//!
//! A [`StatBlock`] is owned by exactly one combatant. Derived values are
//! recomputed eagerly whenever a primary attribute changes, so a read never
//! observes a stale maximum. Every HP/MP mutation is recorded as a
//! [`PoolChange`] which the session drains and forwards to subscribers.
//!
//! # Formulas
//!
//! - `max_hp = 100 + 5 * strength`
//! - `max_mp = 50 + 3 * wisdom`
//! - `critical_chance = base + 0.5 * dexterity` (percent)
//!
//! # Example
//!
//! ```
//! use skirmish_core::stats::{PrimaryStats, StatBlock};
//!
//! let mut stats = StatBlock::new(PrimaryStats::new(10, 4, 2, 5, 7), 5.0);
//! assert_eq!(stats.max_hp(), 150);
//! assert_eq!(stats.max_mp(), 65);
//!
//! stats.take_damage(200);
//! assert_eq!(stats.current_hp(), 0);
//! assert!(!stats.is_alive());
//! ```

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Base HP before strength scaling.
pub const BASE_HP: u32 = 100;
/// HP gained per point of strength.
pub const HP_PER_STRENGTH: u32 = 5;
/// Base MP before wisdom scaling.
pub const BASE_MP: u32 = 50;
/// MP gained per point of wisdom.
pub const MP_PER_WISDOM: u32 = 3;
/// Critical chance (percent) gained per point of dexterity.
pub const CRIT_PER_DEXTERITY: f32 = 0.5;

// =============================================================================
// Primary Attributes
// =============================================================================

/// The five primary attributes of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PrimaryStats {
    /// Physical power; scales physical skills and max HP.
    pub strength: u32,
    /// Precision; scales critical chance.
    pub dexterity: u32,
    /// Arcane power; scales magical skills.
    pub intelligence: u32,
    /// Willpower; scales max MP.
    pub wisdom: u32,
    /// Initiative; higher acts earlier in each cycle.
    pub speed: u32,
}

impl PrimaryStats {
    /// Creates primaries in (str, dex, int, wis, spd) order.
    #[must_use]
    pub const fn new(
        strength: u32,
        dexterity: u32,
        intelligence: u32,
        wisdom: u32,
        speed: u32,
    ) -> Self {
        Self {
            strength,
            dexterity,
            intelligence,
            wisdom,
            speed,
        }
    }
}

/// Signed adjustments applied to [`PrimaryStats`] by buffs and equipment.
///
/// Results saturate at zero; an attribute can never go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatModifiers {
    /// Strength delta
    pub strength: i32,
    /// Dexterity delta
    pub dexterity: i32,
    /// Intelligence delta
    pub intelligence: i32,
    /// Wisdom delta
    pub wisdom: i32,
    /// Speed delta
    pub speed: i32,
}

// =============================================================================
// Pool Notifications
// =============================================================================

/// Which resource pool changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pool {
    /// Hit points
    Hp,
    /// Mana points
    Mp,
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hp => write!(f, "HP"),
            Self::Mp => write!(f, "MP"),
        }
    }
}

/// A recorded pool mutation carrying the new value and the pool maximum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolChange {
    /// Pool that changed
    pub pool: Pool,
    /// Value after the mutation
    pub value: u32,
    /// Maximum of the pool at the time of the mutation
    pub max: u32,
}

// =============================================================================
// Stat Block
// =============================================================================

/// Primary attributes, derived maxima and the current HP/MP pools.
///
/// # Invariants
///
/// - `current_hp <= max_hp` and `current_mp <= max_mp` at all times
/// - Derived values always reflect the current primaries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatBlock {
    primaries: PrimaryStats,
    base_crit_chance: f32,
    max_hp: u32,
    max_mp: u32,
    crit_chance: f32,
    current_hp: u32,
    current_mp: u32,
    /// Pending notifications, drained by the owner.
    #[serde(skip)]
    changes: Vec<PoolChange>,
}

impl StatBlock {
    /// Creates a stat block with full pools.
    #[must_use]
    pub fn new(primaries: PrimaryStats, base_crit_chance: f32) -> Self {
        let mut block = Self {
            primaries,
            base_crit_chance,
            max_hp: 0,
            max_mp: 0,
            crit_chance: 0.0,
            current_hp: 0,
            current_mp: 0,
            changes: Vec::new(),
        };
        block.initialize(primaries, base_crit_chance);
        block.changes.clear();
        block
    }

    /// Resets primaries, recomputes derived values and fills both pools.
    pub fn initialize(&mut self, primaries: PrimaryStats, base_crit_chance: f32) {
        self.primaries = primaries;
        self.base_crit_chance = base_crit_chance;
        self.recalculate_derived();
        self.set_pool(Pool::Hp, self.max_hp);
        self.set_pool(Pool::Mp, self.max_mp);
    }

    /// Overrides the current pools, clamping each into its range.
    ///
    /// Used when a roster carries HP/MP over from a previous encounter.
    #[must_use]
    pub fn with_pools(mut self, hp: Option<u32>, mp: Option<u32>) -> Self {
        if let Some(hp) = hp {
            self.set_pool(Pool::Hp, hp.min(self.max_hp));
        }
        if let Some(mp) = mp {
            self.set_pool(Pool::Mp, mp.min(self.max_mp));
        }
        self.changes.clear();
        self
    }

    /// Recomputes maxima and crit chance from the primaries, then clamps pools.
    pub fn recalculate_derived(&mut self) {
        self.max_hp = HP_PER_STRENGTH
            .saturating_mul(self.primaries.strength)
            .saturating_add(BASE_HP);
        self.max_mp = MP_PER_WISDOM
            .saturating_mul(self.primaries.wisdom)
            .saturating_add(BASE_MP);
        #[allow(clippy::cast_precision_loss)]
        let dex = self.primaries.dexterity as f32;
        self.crit_chance = self.base_crit_chance + CRIT_PER_DEXTERITY * dex;

        if self.current_hp > self.max_hp {
            self.set_pool(Pool::Hp, self.max_hp);
        }
        if self.current_mp > self.max_mp {
            self.set_pool(Pool::Mp, self.max_mp);
        }
    }

    /// Applies signed deltas to the primaries and recomputes derived values.
    pub fn apply_primary_modifiers(&mut self, delta: StatModifiers) {
        let p = &mut self.primaries;
        p.strength = p.strength.saturating_add_signed(delta.strength);
        p.dexterity = p.dexterity.saturating_add_signed(delta.dexterity);
        p.intelligence = p.intelligence.saturating_add_signed(delta.intelligence);
        p.wisdom = p.wisdom.saturating_add_signed(delta.wisdom);
        p.speed = p.speed.saturating_add_signed(delta.speed);
        self.recalculate_derived();
    }

    /// Removes up to `amount` HP and returns how much was actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.current_hp);
        self.set_pool(Pool::Hp, self.current_hp - lost);
        lost
    }

    /// Restores up to `amount` HP, capped at max, and returns the amount healed.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let healed = amount.min(self.max_hp - self.current_hp);
        self.set_pool(Pool::Hp, self.current_hp + healed);
        healed
    }

    /// Spends `amount` MP. Fails without mutation if the pool is too small.
    pub fn consume_mana(&mut self, amount: u32) -> bool {
        if amount > self.current_mp {
            return false;
        }
        self.set_pool(Pool::Mp, self.current_mp - amount);
        true
    }

    /// Restores up to `amount` MP, capped at max.
    pub fn restore_mana(&mut self, amount: u32) {
        let restored = amount.min(self.max_mp - self.current_mp);
        self.set_pool(Pool::Mp, self.current_mp + restored);
    }

    /// Rolls for a critical hit.
    ///
    /// Draws one sample in `[0, 100)` and succeeds if it is below the
    /// critical chance plus `bonus_percent`.
    pub fn roll_critical<R: Rng + ?Sized>(&self, rng: &mut R, bonus_percent: f32) -> bool {
        let sample: f32 = rng.gen_range(0.0..100.0);
        sample < self.crit_chance + bonus_percent
    }

    /// Drains pending pool notifications in mutation order.
    pub fn take_changes(&mut self) -> Vec<PoolChange> {
        std::mem::take(&mut self.changes)
    }

    fn set_pool(&mut self, pool: Pool, value: u32) {
        let max = match pool {
            Pool::Hp => {
                self.current_hp = value;
                self.max_hp
            }
            Pool::Mp => {
                self.current_mp = value;
                self.max_mp
            }
        };
        self.changes.push(PoolChange { pool, value, max });
    }

    /// Returns the primary attributes.
    #[must_use]
    pub const fn primaries(&self) -> &PrimaryStats {
        &self.primaries
    }

    /// Returns the maximum HP.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.max_hp
    }

    /// Returns the maximum MP.
    #[must_use]
    pub const fn max_mp(&self) -> u32 {
        self.max_mp
    }

    /// Returns the current HP.
    #[must_use]
    pub const fn current_hp(&self) -> u32 {
        self.current_hp
    }

    /// Returns the current MP.
    #[must_use]
    pub const fn current_mp(&self) -> u32 {
        self.current_mp
    }

    /// Returns the critical chance in percent.
    #[must_use]
    pub const fn critical_chance(&self) -> f32 {
        self.crit_chance
    }

    /// Returns the speed attribute.
    #[must_use]
    pub const fn speed(&self) -> u32 {
        self.primaries.speed
    }

    /// True while HP is above zero.
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.current_hp > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn block() -> StatBlock {
        StatBlock::new(PrimaryStats::new(10, 10, 8, 10, 5), 5.0)
    }

    mod derived_tests {
        use super::*;

        #[test]
        fn derived_values_follow_formulas() {
            let stats = block();
            assert_eq!(stats.max_hp(), 150);
            assert_eq!(stats.max_mp(), 80);
            assert!((stats.critical_chance() - 10.0).abs() < f32::EPSILON);
            assert_eq!(stats.current_hp(), 150);
            assert_eq!(stats.current_mp(), 80);
        }

        #[test]
        fn modifiers_recompute_derived_values() {
            let mut stats = block();
            stats.apply_primary_modifiers(StatModifiers {
                strength: 4,
                dexterity: -10,
                ..StatModifiers::default()
            });
            assert_eq!(stats.max_hp(), 170);
            assert!((stats.critical_chance() - 5.0).abs() < f32::EPSILON);
            // Raising max does not refill the pool
            assert_eq!(stats.current_hp(), 150);
        }

        #[test]
        fn lowering_max_clamps_current_pool() {
            let mut stats = block();
            stats.apply_primary_modifiers(StatModifiers {
                strength: -10,
                wisdom: -10,
                ..StatModifiers::default()
            });
            assert_eq!(stats.max_hp(), 100);
            assert_eq!(stats.current_hp(), 100);
            assert_eq!(stats.current_mp(), 50);
        }

        #[test]
        fn modifiers_saturate_at_zero() {
            let mut stats = block();
            stats.apply_primary_modifiers(StatModifiers {
                speed: -100,
                ..StatModifiers::default()
            });
            assert_eq!(stats.speed(), 0);
        }

        #[test]
        fn huge_primaries_saturate_maxima() {
            let stats = StatBlock::new(PrimaryStats::new(1_000_000_000, 0, 0, u32::MAX, 1), 5.0);
            assert_eq!(stats.max_hp(), u32::MAX);
            assert_eq!(stats.max_mp(), u32::MAX);
            assert_eq!(stats.current_hp(), u32::MAX);

            let mut stats = block();
            stats.apply_primary_modifiers(StatModifiers {
                strength: i32::MAX,
                ..StatModifiers::default()
            });
            stats.apply_primary_modifiers(StatModifiers {
                strength: i32::MAX,
                ..StatModifiers::default()
            });
            assert_eq!(stats.max_hp(), u32::MAX);
            assert_eq!(stats.current_hp(), 150);
        }
    }

    mod pool_tests {
        use super::*;

        #[test]
        fn damage_clamps_at_zero() {
            let mut stats = block();
            assert_eq!(stats.take_damage(400), 150);
            assert_eq!(stats.current_hp(), 0);
            assert!(!stats.is_alive());
        }

        #[test]
        fn heal_clamps_at_max() {
            let mut stats = block();
            stats.take_damage(20);
            assert_eq!(stats.heal(50), 20);
            assert_eq!(stats.current_hp(), 150);
        }

        #[test]
        fn consume_mana_rejects_overspend_without_mutation() {
            let mut stats = block();
            stats.take_changes();
            assert!(!stats.consume_mana(81));
            assert_eq!(stats.current_mp(), 80);
            assert!(stats.take_changes().is_empty());
        }

        #[test]
        fn consume_and_restore_mana() {
            let mut stats = block();
            assert!(stats.consume_mana(30));
            assert_eq!(stats.current_mp(), 50);
            stats.restore_mana(100);
            assert_eq!(stats.current_mp(), 80);
        }

        #[test]
        fn with_pools_clamps_carried_values() {
            let stats = block().with_pools(Some(999), Some(12));
            assert_eq!(stats.current_hp(), 150);
            assert_eq!(stats.current_mp(), 12);
        }
    }

    mod notification_tests {
        use super::*;

        #[test]
        fn mutations_record_value_and_max() {
            let mut stats = block();
            stats.take_changes();

            stats.take_damage(30);
            stats.consume_mana(10);

            let changes = stats.take_changes();
            assert_eq!(
                changes,
                vec![
                    PoolChange {
                        pool: Pool::Hp,
                        value: 120,
                        max: 150
                    },
                    PoolChange {
                        pool: Pool::Mp,
                        value: 70,
                        max: 80
                    },
                ]
            );
            assert!(stats.take_changes().is_empty());
        }
    }

    mod critical_tests {
        use super::*;

        #[test]
        fn bonus_of_one_hundred_always_crits() {
            let stats = block();
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            assert!((0..200).all(|_| stats.roll_critical(&mut rng, 100.0)));
        }

        #[test]
        fn zero_chance_never_crits() {
            let stats = StatBlock::new(PrimaryStats::default(), 0.0);
            let mut rng = ChaCha8Rng::seed_from_u64(7);
            assert!((0..200).all(|_| !stats.roll_critical(&mut rng, 0.0)));
        }
    }
}
