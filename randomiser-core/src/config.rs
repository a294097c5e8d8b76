use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::level::Level;
use crate::seed_finder::SeedCriteria;
use crate::{RandomiserSettings, Result};

/// Progress of a randomised adventure, so a later run can pick it up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub seed: u32,
    /// Level the player last entered.
    #[serde(alias = "next_level")]
    pub level: Level,
    pub finished: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub settings: RandomiserSettings,
    pub criteria: SeedCriteria,
    pub session: Option<SavedSession>,
}

impl ConfigFile {
    /// Seed of an unfinished session, if there is one to resume.
    pub fn resumable_seed(&self) -> Option<u32> {
        self.session
            .as_ref()
            .filter(|s| !s.finished)
            .map(|s| s.seed)
    }

    /// Start tracking `seed`, keeping the saved level when the stored
    /// session is an unfinished run of the same seed.
    pub fn start_session(&mut self, seed: u32) -> Level {
        let level = self
            .session
            .as_ref()
            .filter(|s| s.seed == seed && !s.finished)
            .map_or(Level::FIRST, |s| s.level);
        self.record_level(seed, level);
        level
    }

    /// Entering a level never ends the session. Losing the final level
    /// must leave it resumable.
    pub fn record_level(&mut self, seed: u32, level: Level) {
        self.session = Some(SavedSession {
            seed,
            level,
            finished: false,
        });
    }

    pub fn record_finished(&mut self, seed: u32) {
        if let Some(session) = self.session.as_mut().filter(|s| s.seed == seed) {
            session.finished = true;
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    let mut base = dirs::config_dir().or_else(dirs::data_dir)?;
    base.push("PvZRandomiser");
    base.push("settings.json");
    Some(base)
}

/// Load the config at `path`. A missing or broken file yields the defaults.
pub fn load_config(path: &Path) -> ConfigFile {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(err) => {
            if path.exists() {
                warn!(path = %path.display(), error = %err, "could not read config, using defaults");
            } else {
                debug!(path = %path.display(), "no config file yet");
            }
            return ConfigFile::default();
        }
    };

    match serde_json::from_str(&data) {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "malformed config, using defaults");
            ConfigFile::default()
        }
    }
}

pub fn save_config(path: &Path, cfg: &ConfigFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(cfg)?;
    fs::write(path, data)?;
    debug!(path = %path.display(), "saved config");
    Ok(())
}
