//! # Skirmish Python Bindings
//!
//! PyO3 bindings exposing the Skirmish encounter engine to Python.
//!
//! ## Usage
//!
//! ```python
//! import skirmish
//!
//! session = skirmish.PyCombatSession(open("goblin_camp.json").read(), seed=7)
//!
//! while not session.is_terminal:
//!     if session.awaiting_player:
//!         session.submit_action("strike", target=session.living_monsters()[0])
//!     elif session.challenge_in_zone():
//!         session.timing_input()
//!     else:
//!         session.tick(1 / 60)
//!
//! pools = session.observe()  # float32[4 * n]: hp, mp, alive, is_player
//! print(session.state, session.rewards)
//! ```

use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use skirmish_core::{
    run_batch, AutopilotConfig, CombatError, CombatSession, CombatState, CombatantId, ConfigError,
    EncounterSpec, ModifierOutcome, Side,
};

/// Values per combatant in [`PyCombatSession::observe`].
const OBSERVATION_WIDTH: usize = 4;

fn combat_err(e: CombatError) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

fn config_err(e: ConfigError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

fn json_err(e: serde_json::Error) -> PyErr {
    PyRuntimeError::new_err(e.to_string())
}

fn outcome_name(outcome: ModifierOutcome) -> &'static str {
    match outcome {
        ModifierOutcome::Success => "success",
        ModifierOutcome::Failure => "failure",
        ModifierOutcome::TimedOut => "timed_out",
    }
}

/// Combat session wrapper for Python.
///
/// Holds one encounter. Combatants are addressed by their integer id,
/// party members first in roster order, then monsters.
#[pyclass(unsendable)]
pub struct PyCombatSession {
    inner: CombatSession,
}

#[pymethods]
impl PyCombatSession {
    /// Start an encounter described by a JSON document.
    #[new]
    #[pyo3(signature = (encounter_json, seed=0))]
    fn new(encounter_json: &str, seed: u64) -> PyResult<Self> {
        let spec = EncounterSpec::from_json_str(encounter_json).map_err(config_err)?;
        let inner = spec.start(seed).map_err(combat_err)?;
        Ok(Self { inner })
    }

    /// Start an encounter from a JSON file.
    #[staticmethod]
    #[pyo3(signature = (path, seed=0))]
    fn from_file(path: std::path::PathBuf, seed: u64) -> PyResult<Self> {
        let spec = EncounterSpec::from_json_file(&path).map_err(config_err)?;
        let inner = spec.start(seed).map_err(combat_err)?;
        Ok(Self { inner })
    }

    /// Current state as a readable string, e.g. `"awaiting action (#0)"`.
    #[getter]
    fn state(&self) -> String {
        self.inner.state().to_string()
    }

    /// True once the encounter has ended, been aborted, or faulted.
    #[getter]
    fn is_terminal(&self) -> bool {
        self.inner.state().is_terminal()
    }

    /// True if a party member is waiting for a command.
    #[getter]
    fn awaiting_player(&self) -> bool {
        matches!(self.inner.state(), CombatState::AwaitingPlayerAction { .. })
    }

    /// `True` for victory, `False` for defeat, `None` while undecided.
    #[getter]
    fn victory(&self) -> Option<bool> {
        match self.inner.state() {
            CombatState::Ended { victory } => Some(victory),
            _ => None,
        }
    }

    /// Id of the acting combatant, if a turn is in progress.
    #[getter]
    fn current_actor(&self) -> Option<u32> {
        self.inner.current_actor().map(CombatantId::as_u32)
    }

    /// Seed the session was created with.
    #[getter]
    fn seed(&self) -> u64 {
        self.inner.seed()
    }

    /// Completed turns so far.
    #[getter]
    fn turns_taken(&self) -> u32 {
        self.inner.turns_taken()
    }

    /// `(gold, experience)` awarded so far.
    #[getter]
    fn rewards(&self) -> (u32, u32) {
        let rewards = self.inner.rewards();
        (rewards.gold, rewards.experience)
    }

    /// Ids of living party members.
    fn living_party(&self) -> Vec<u32> {
        self.inner.living(Side::Party).map(|c| c.id().as_u32()).collect()
    }

    /// Ids of living monsters.
    fn living_monsters(&self) -> Vec<u32> {
        self.inner.living(Side::Monsters).map(|c| c.id().as_u32()).collect()
    }

    /// Skill ids in the kit of a combatant.
    fn skills(&self, combatant: u32) -> PyResult<Vec<String>> {
        let c = self
            .inner
            .combatant(CombatantId::new(combatant))
            .ok_or_else(|| PyValueError::new_err(format!("unknown combatant {combatant}")))?;
        Ok(c.skills().iter().map(|s| s.id.to_string()).collect())
    }

    /// Upcoming actors in queue order.
    fn upcoming_turns(&self) -> Vec<u32> {
        self.inner.upcoming_turns().into_iter().map(CombatantId::as_u32).collect()
    }

    /// Start the next turn if the session is between turns.
    fn advance_turn(&mut self) {
        self.inner.advance_turn();
    }

    /// Command the waiting party member.
    #[pyo3(signature = (skill, target=None))]
    fn submit_action(&mut self, skill: &str, target: Option<u32>) -> PyResult<()> {
        self.inner
            .submit_player_action(&skill.into(), target.map(CombatantId::new))
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Press the button for the running challenge.
    ///
    /// Returns `"success"` or `"failure"` if this press resolved it.
    fn timing_input(&mut self) -> PyResult<Option<&'static str>> {
        self.inner
            .submit_timing_input()
            .map(|outcome| outcome.map(outcome_name))
            .map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// True if a press right now would succeed.
    fn challenge_in_zone(&self) -> bool {
        self.inner.active_modifier().is_some_and(|view| view.in_success_zone())
    }

    /// Geometry of the running challenge as JSON, or `None`.
    fn challenge_json(&self) -> PyResult<Option<String>> {
        self.inner
            .active_modifier()
            .map(|view| serde_json::to_string(&view).map_err(json_err))
            .transpose()
    }

    /// Advance pacing timers and challenges by dt seconds.
    ///
    /// Releases the GIL during computation.
    fn tick(&mut self, py: Python, dt: f32) -> PyResult<()> {
        let inner = &mut self.inner;
        py.allow_threads(|| inner.tick(dt)).map_err(combat_err)
    }

    /// Abort the encounter. Returns `False` if it had already finished.
    fn abort(&mut self) -> bool {
        self.inner.abort()
    }

    /// Flat float32 observation of every combatant's pools.
    ///
    /// Four values per combatant in id order: HP fraction, MP fraction,
    /// alive flag, and party flag.
    fn observe<'py>(&self, py: Python<'py>) -> Bound<'py, PyArray1<f32>> {
        let combatants = self.inner.combatants();
        let mut flat = Vec::with_capacity(combatants.len() * OBSERVATION_WIDTH);
        for c in combatants {
            let stats = c.stats();
            flat.push(fraction(stats.current_hp(), stats.max_hp()));
            flat.push(fraction(stats.current_mp(), stats.max_mp()));
            flat.push(if c.is_alive() { 1.0 } else { 0.0 });
            flat.push(if c.is_player() { 1.0 } else { 0.0 });
        }
        flat.to_pyarray(py)
    }

    /// Drain the event log as JSON strings.
    fn take_events(&mut self) -> PyResult<Vec<String>> {
        self.inner
            .take_events()
            .iter()
            .map(|e| serde_json::to_string(e).map_err(json_err))
            .collect()
    }

    /// Final party pools as a JSON array, for writing back to the host.
    fn party_report_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.party_report()).map_err(json_err)
    }

    fn __repr__(&self) -> String {
        format!(
            "CombatSession(seed={}, state='{}', turns={})",
            self.inner.seed(),
            self.inner.state(),
            self.inner.turns_taken()
        )
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(current: u32, max: u32) -> f32 {
    if max == 0 {
        0.0
    } else {
        current as f32 / max as f32
    }
}

/// Play an encounter once per seed with the autopilot.
///
/// Returns `(seed, victory, turns, gold, experience)` tuples in seed order.
/// Encounters run in parallel with the GIL released.
#[pyfunction]
#[pyo3(signature = (encounter_json, seeds, hit_rate=0.5))]
fn autoplay_batch(
    py: Python,
    encounter_json: &str,
    seeds: Vec<u64>,
    hit_rate: f64,
) -> PyResult<Vec<(u64, bool, u32, u32, u32)>> {
    let spec = EncounterSpec::from_json_str(encounter_json).map_err(config_err)?;
    let pilot = AutopilotConfig {
        hit_rate,
        ..AutopilotConfig::default()
    };
    let reports = py
        .allow_threads(|| run_batch(&spec, None, &pilot, &seeds))
        .map_err(combat_err)?;
    Ok(reports
        .into_iter()
        .map(|r| (r.seed, r.victory, r.turns, r.gold, r.experience))
        .collect())
}

/// Python module definition.
#[pymodule]
fn _skirmish(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCombatSession>()?;
    m.add_function(wrap_pyfunction!(autoplay_batch, m)?)?;
    Ok(())
}
