//! Encounter files: rosters, extra skills and configuration in one JSON document.
//!
//! ```json
//! {
//!   "skills": [ { "id": "venom", "name": "Venom", "damage_type": "Magical",
//!                 "min_damage": 6, "max_damage": 9, "stat_scaling": 0.4, "mana_cost": 8 } ],
//!   "party": [ { "name": "Ayla", "stats": { "strength": 12, "dexterity": 8,
//!                "intelligence": 4, "wisdom": 6, "speed": 10 }, "skills": ["strike"] } ],
//!   "monsters": [ { "name": "Wolf", "stats": { "strength": 6, "dexterity": 4,
//!                   "intelligence": 0, "wisdom": 0, "speed": 7 },
//!                   "skills": ["bite", "venom"], "tier": "Easy" } ],
//!   "is_boss": false
//! }
//! ```
//!
//! Skills listed in the file are registered on top of the stock library, so
//! a file only has to describe what it adds or overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combatant::{MonsterData, PartyMemberData};
use crate::config::CombatConfig;
use crate::error::{ConfigError, Result};
use crate::session::CombatSession;
use crate::skill::{SkillDescriptor, SkillLibrary};

/// A complete, serializable encounter description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncounterSpec {
    /// Skills added to the stock library
    #[serde(default)]
    pub skills: Vec<SkillDescriptor>,
    /// Party roster
    pub party: Vec<PartyMemberData>,
    /// Monster roster
    pub monsters: Vec<MonsterData>,
    /// Boss encounters multiply rewards
    #[serde(default)]
    pub is_boss: bool,
    /// Configuration override (defaults if absent)
    #[serde(default)]
    pub config: Option<CombatConfig>,
}

impl EncounterSpec {
    /// Parses an encounter and validates its configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Json`] on malformed input and
    /// [`ConfigError::Invalid`] if the embedded configuration is invalid.
    pub fn from_json_str(json: &str) -> std::result::Result<Self, ConfigError> {
        let spec: Self = serde_json::from_str(json)?;
        if let Some(config) = &spec.config {
            config.validate()?;
        }
        Ok(spec)
    }

    /// Reads and parses an encounter file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// same errors as [`EncounterSpec::from_json_str`].
    pub fn from_json_file(path: &Path) -> std::result::Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Stock library plus the skills declared in this encounter.
    #[must_use]
    pub fn library(&self) -> SkillLibrary {
        let mut library = SkillLibrary::with_defaults();
        for skill in &self.skills {
            library.register(skill.clone());
        }
        library
    }

    /// Configuration to use: the embedded one or the defaults.
    #[must_use]
    pub fn config(&self) -> CombatConfig {
        self.config.clone().unwrap_or_default()
    }

    /// Creates a session with `config` and starts this encounter in it.
    ///
    /// # Errors
    ///
    /// Propagates configuration and roster errors from the session.
    pub fn start_with(&self, config: CombatConfig, seed: u64) -> Result<CombatSession> {
        let mut session = CombatSession::new(config, seed)?;
        session.start_encounter(&self.library(), &self.party, &self.monsters, self.is_boss)?;
        Ok(session)
    }

    /// Creates a session with this encounter's configuration and starts it.
    ///
    /// # Errors
    ///
    /// Propagates configuration and roster errors from the session.
    pub fn start(&self, seed: u64) -> Result<CombatSession> {
        self.start_with(self.config(), seed)
    }
}
