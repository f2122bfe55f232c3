//! Headless play: an automated party controller and parallel batch runs.
//!
//! [`Autopilot`] stands in for the human player. It picks party actions with
//! an [`ActionPolicy`] and plays both timing challenges with a fixed hit rate:
//! for each challenge it decides up front whether this attempt lands, then
//! either waits for the success zone or presses immediately outside it.
//!
//! [`run_batch`] plays one encounter per seed across the rayon thread pool.
//! Each encounter owns its session, RNG and autopilot, so results depend on
//! the seed only and never on scheduling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::ai::{ActionPolicy, RandomPolicy};
use crate::combatant::CombatantId;
use crate::config::CombatConfig;
use crate::encounter::EncounterSpec;
use crate::error::{CombatError, ConfigError, Result};
use crate::session::{CombatSession, CombatState};

/// Tuning for an [`Autopilot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    /// Probability in `[0, 1]` that a timing challenge is played to succeed.
    pub hit_rate: f64,
    /// Simulated frame length in seconds.
    pub frame: f32,
    /// Safety cap on frames per encounter.
    pub max_frames: u64,
}

impl Default for AutopilotConfig {
    fn default() -> Self {
        Self {
            hit_rate: 0.5,
            frame: 1.0 / 60.0,
            max_frames: 1_000_000,
        }
    }
}

impl AutopilotConfig {
    /// Checks that the hit rate is a probability and the frame length is positive.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the offending field.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.hit_rate) {
            return Err(ConfigError::Invalid {
                field: "autopilot.hit_rate",
                reason: format!("{} is not within [0, 1]", self.hit_rate),
            });
        }
        if !self.frame.is_finite() || self.frame <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "autopilot.frame",
                reason: format!("{} is not a positive frame length", self.frame),
            });
        }
        Ok(())
    }
}

/// Result of one automated encounter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterReport {
    /// Session seed
    pub seed: u64,
    /// True if the party won
    pub victory: bool,
    /// Turns started
    pub turns: u32,
    /// Gold earned
    pub gold: u32,
    /// Experience earned
    pub experience: u32,
}

/// Aggregate over a batch of encounters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Encounters played
    pub encounters: usize,
    /// Encounters won by the party
    pub victories: usize,
    /// `victories / encounters`
    pub win_rate: f64,
    /// Mean turns per encounter
    pub mean_turns: f64,
    /// Mean gold per encounter
    pub mean_gold: f64,
    /// Mean experience per encounter
    pub mean_experience: f64,
}

impl BatchSummary {
    /// Summarizes a set of reports.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_reports(reports: &[EncounterReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }
        let n = reports.len() as f64;
        let victories = reports.iter().filter(|r| r.victory).count();
        let total = |f: fn(&EncounterReport) -> u32| {
            reports.iter().map(|r| f64::from(f(r))).sum::<f64>()
        };

        Self {
            encounters: reports.len(),
            victories,
            win_rate: victories as f64 / n,
            mean_turns: total(|r| r.turns) / n,
            mean_gold: total(|r| r.gold) / n,
            mean_experience: total(|r| r.experience) / n,
        }
    }
}

/// Automated controller for the party side.
pub struct Autopilot {
    config: AutopilotConfig,
    policy: Box<dyn ActionPolicy>,
    rng: ChaCha8Rng,
    /// Decision for the challenge currently running.
    aim_for_success: Option<bool>,
}

impl std::fmt::Debug for Autopilot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autopilot")
            .field("config", &self.config)
            .field("aim_for_success", &self.aim_for_success)
            .finish_non_exhaustive()
    }
}

impl Autopilot {
    /// Creates an autopilot with the random policy.
    #[must_use]
    pub fn new(config: AutopilotConfig, seed: u64) -> Self {
        Self::with_policy(config, seed, RandomPolicy::new())
    }

    /// Creates an autopilot with a custom party policy.
    #[must_use]
    pub fn with_policy(
        config: AutopilotConfig,
        seed: u64,
        policy: impl ActionPolicy + 'static,
    ) -> Self {
        Self {
            config,
            policy: Box::new(policy),
            rng: ChaCha8Rng::seed_from_u64(seed),
            aim_for_success: None,
        }
    }

    /// Plays the session until it reaches a terminal state.
    ///
    /// # Errors
    ///
    /// Returns [`CombatError::Config`] if the autopilot configuration is
    /// invalid. Propagates session faults, and returns
    /// [`CombatError::InternalConsistency`] if the frame cap is reached or the
    /// policy cannot find a legal action.
    pub fn run(&mut self, session: &mut CombatSession) -> Result<CombatState> {
        self.config.validate()?;
        for _ in 0..self.config.max_frames {
            let state = session.state();
            if state.is_terminal() {
                return Ok(state);
            }
            match state {
                CombatState::Idle => {
                    return Err(CombatError::InternalConsistency(
                        "autopilot needs a started encounter".to_string(),
                    ));
                }
                CombatState::AwaitingPlayerAction { actor } => self.command(session, actor)?,
                CombatState::ModifierRunning { .. } => self.play_challenge(session)?,
                _ => session.tick(self.config.frame)?,
            }
        }
        Err(CombatError::InternalConsistency(format!(
            "encounter did not finish within {} frames",
            self.config.max_frames
        )))
    }

    fn command(&mut self, session: &mut CombatSession, actor: CombatantId) -> Result<()> {
        let combatant = session
            .combatant(actor)
            .ok_or_else(|| CombatError::InternalConsistency(format!("unknown actor {actor}")))?;
        let skill = self
            .policy
            .select_skill(combatant, &mut self.rng)
            .ok_or_else(|| CombatError::InternalConsistency(format!("{actor} has no skills")))?;
        let target = self
            .policy
            .select_target(combatant, session.combatants(), &mut self.rng);

        tracing::trace!(actor = %actor, skill = %skill.id, ?target, "autopilot command");
        session.submit_player_action(&skill.id, target)?;
        self.aim_for_success = None;
        Ok(())
    }

    fn play_challenge(&mut self, session: &mut CombatSession) -> Result<()> {
        let hit_rate = self.config.hit_rate;
        let aim = *self
            .aim_for_success
            .get_or_insert_with(|| self.rng.gen_bool(hit_rate));

        let in_zone = session
            .active_modifier()
            .is_some_and(|view| view.in_success_zone());

        if in_zone == aim {
            session.submit_timing_input()?;
            self.aim_for_success = None;
            Ok(())
        } else {
            session.tick(self.config.frame)?;
            if !matches!(session.state(), CombatState::ModifierRunning { .. }) {
                self.aim_for_success = None;
            }
            Ok(())
        }
    }
}

/// Plays `spec` once per seed in parallel.
///
/// Each encounter uses `config` (or the encounter's own configuration when
/// `None`) and an autopilot seeded from the encounter seed.
///
/// # Errors
///
/// Returns the first error any encounter produced.
pub fn run_batch(
    spec: &EncounterSpec,
    config: Option<&CombatConfig>,
    autopilot: &AutopilotConfig,
    seeds: &[u64],
) -> Result<Vec<EncounterReport>> {
    let config = config.cloned().unwrap_or_else(|| spec.config());
    config.validate()?;
    autopilot.validate()?;

    seeds
        .par_iter()
        .map(|&seed| run_one(spec, &config, autopilot, seed))
        .collect()
}

/// Plays a single encounter with the autopilot.
///
/// # Errors
///
/// Propagates roster, configuration and consistency errors.
pub fn run_one(
    spec: &EncounterSpec,
    config: &CombatConfig,
    autopilot: &AutopilotConfig,
    seed: u64,
) -> Result<EncounterReport> {
    let mut session = spec.start_with(config.clone(), seed)?;
    let mut pilot = Autopilot::new(autopilot.clone(), seed ^ AUTOPILOT_SEED_SALT);
    let state = pilot.run(&mut session)?;
    let rewards = session.rewards();

    Ok(EncounterReport {
        seed,
        victory: matches!(state, CombatState::Ended { victory: true }),
        turns: session.turns_taken(),
        gold: rewards.gold,
        experience: rewards.experience,
    })
}

/// Keeps the autopilot stream independent of the session stream for one seed.
const AUTOPILOT_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{DifficultyTier, MonsterData, PartyMemberData};
    use crate::stats::PrimaryStats;

    fn spec() -> EncounterSpec {
        EncounterSpec {
            skills: Vec::new(),
            party: vec![
                PartyMemberData::new(
                    "Ayla",
                    PrimaryStats::new(14, 10, 6, 8, 9),
                    &["strike", "power_strike"],
                ),
                PartyMemberData::new(
                    "Bram",
                    PrimaryStats::new(6, 4, 14, 12, 6),
                    &["arcane_bolt", "fireball"],
                ),
            ],
            monsters: vec![
                MonsterData::new(
                    "Wolf",
                    PrimaryStats::new(6, 6, 0, 0, 8),
                    &["bite"],
                    DifficultyTier::Easy,
                ),
                MonsterData::new(
                    "Ogre",
                    PrimaryStats::new(12, 2, 0, 4, 3),
                    &["bite", "cleave"],
                    DifficultyTier::Hard,
                ),
            ],
            is_boss: false,
            config: None,
        }
    }

    #[test]
    fn autopilot_finishes_an_encounter() {
        let spec = spec();
        let report =
            run_one(&spec, &CombatConfig::instant(), &AutopilotConfig::default(), 5).unwrap();
        assert!(report.turns > 0);
        if !report.victory {
            assert_eq!(report.gold, 0);
        }
    }

    #[test]
    fn perfect_play_never_takes_damage() {
        let spec = spec();
        let pilot = AutopilotConfig {
            hit_rate: 1.0,
            ..AutopilotConfig::default()
        };
        let mut session = spec.start_with(CombatConfig::instant(), 11).unwrap();
        Autopilot::new(pilot, 11).run(&mut session).unwrap();

        for status in session.party_report() {
            assert_eq!(status.current_hp, status.max_hp, "{} was hit", status.name);
        }
        assert_eq!(session.state(), CombatState::Ended { victory: true });
    }

    #[test]
    fn batch_is_deterministic_per_seed() {
        let spec = spec();
        let seeds: Vec<u64> = (0..8).collect();
        let pilot = AutopilotConfig::default();
        let config = CombatConfig::instant();

        let a = run_batch(&spec, Some(&config), &pilot, &seeds).unwrap();
        let b = run_batch(&spec, Some(&config), &pilot, &seeds).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.iter().map(|r| r.seed).collect::<Vec<_>>(), seeds);
    }

    #[test]
    fn summary_averages_reports() {
        let reports = [
            EncounterReport {
                seed: 0,
                victory: true,
                turns: 10,
                gold: 40,
                experience: 100,
            },
            EncounterReport {
                seed: 1,
                victory: false,
                turns: 6,
                gold: 0,
                experience: 0,
            },
        ];
        let summary = BatchSummary::from_reports(&reports);
        assert_eq!(summary.encounters, 2);
        assert_eq!(summary.victories, 1);
        assert!((summary.win_rate - 0.5).abs() < 1e-9);
        assert!((summary.mean_turns - 8.0).abs() < 1e-9);
        assert!((summary.mean_gold - 20.0).abs() < 1e-9);
    }

    #[test]
    fn hit_rate_must_be_a_probability() {
        for hit_rate in [f64::NAN, -0.1, 1.5, f64::INFINITY] {
            let pilot = AutopilotConfig {
                hit_rate,
                ..AutopilotConfig::default()
            };
            let err = pilot.validate().unwrap_err();
            assert!(err.to_string().contains("autopilot.hit_rate"), "{err}");
        }
        assert!(AutopilotConfig::default().validate().is_ok());
    }

    #[test]
    fn nan_hit_rate_is_rejected_by_batches() {
        let pilot = AutopilotConfig {
            hit_rate: f64::NAN,
            ..AutopilotConfig::default()
        };
        let err =
            run_batch(&spec(), Some(&CombatConfig::instant()), &pilot, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, CombatError::Config(ConfigError::Invalid { .. })));

        let err = run_one(&spec(), &CombatConfig::instant(), &pilot, 1).unwrap_err();
        assert!(matches!(err, CombatError::Config(_)));
    }

    #[test]
    fn zero_frame_is_rejected_before_play() {
        let pilot = AutopilotConfig {
            frame: 0.0,
            ..AutopilotConfig::default()
        };
        let mut session = spec().start_with(CombatConfig::instant(), 2).unwrap();
        let err = Autopilot::new(pilot, 2).run(&mut session).unwrap_err();
        assert!(matches!(err, CombatError::Config(_)));
        assert_eq!(session.turns_taken(), 1);
    }

    #[test]
    fn empty_batch_summarizes_to_zero() {
        assert_eq!(BatchSummary::from_reports(&[]), BatchSummary::default());
    }
}
