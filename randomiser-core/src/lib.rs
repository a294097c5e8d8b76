use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

pub mod config;
pub mod data;
pub mod game;
pub mod level;
pub mod memory;
pub mod plan;
pub mod seed_finder;
pub mod waves;

pub use level::{Level, LevelFormatError, World};
pub use memory::{MemoryError, ProcessMemory};
pub use game::SessionEvent;
pub use plan::Plan;

/// How far a numeric option strays from vanilla.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    #[default]
    Off,
    On,
    Extreme,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomiserSettings {
    pub seed: u32,
    pub randomize_plants: bool,
    pub random_cost: bool,
    pub random_cooldowns: bool,
    pub random_zombies: bool,
    pub random_weights: bool,
    pub random_wave_points: Intensity,
    pub random_wave_count: Intensity,
    pub random_world: bool,
    /// Percent chance that a level moves to a random world.
    pub random_world_chance: u8,
    pub no_restrictions: bool,
    /// Delay between polls of the game, in centiseconds.
    pub poll_interval_cs: u32,
}

impl Default for RandomiserSettings {
    fn default() -> Self {
        Self {
            seed: rand::thread_rng().gen_range(1..=u32::MAX),
            randomize_plants: true,
            ..Self::vanilla()
        }
    }
}

impl RandomiserSettings {
    /// Settings that leave the game unchanged.
    pub fn vanilla() -> Self {
        Self {
            seed: 0,
            randomize_plants: false,
            random_cost: false,
            random_cooldowns: false,
            random_zombies: false,
            random_weights: false,
            random_wave_points: Intensity::Off,
            random_wave_count: Intensity::Off,
            random_world: false,
            random_world_chance: 33,
            no_restrictions: false,
            poll_interval_cs: 10,
        }
    }

    /// Turn every randomisation on and drop the fairness restrictions.
    pub fn apply_no_restrictions(&mut self) {
        self.randomize_plants = true;
        self.random_cost = true;
        self.random_cooldowns = true;
        self.random_zombies = true;
        self.random_weights = true;
        self.random_wave_points = Intensity::On;
        self.random_wave_count = Intensity::On;
        self.random_world = true;
        self.random_world_chance = 100;
        self.no_restrictions = true;
    }
}

#[derive(Debug, Error)]
pub enum RandomiserError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Memory(#[from] MemoryError),
    #[error(transparent)]
    Level(#[from] LevelFormatError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RandomiserError>;

/// Install the global `tracing` subscriber. `RUST_LOG` overrides the
/// default `info` level.
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

/// Attach to the running game and randomise it until it exits.
///
/// `on_event` sees every level written and the end of the adventure.
#[cfg(unix)]
pub fn run(settings: &RandomiserSettings, mut on_event: impl FnMut(SessionEvent)) -> Result<()> {
    use game::{Game, Session};
    use std::path::Path;
    use std::thread;
    use std::time::Duration;

    let memory = memory::ProcMemory::attach_game()?;
    let pid = memory.pid();
    let plan = Plan::generate(settings);
    let mut session = Session::new(Game::new(memory), plan)?;
    info!(pid, seed = settings.seed, "randomiser running");

    let interval = Duration::from_millis(u64::from(settings.poll_interval_cs.max(1)) * 10);
    loop {
        match session.tick() {
            Ok(Some(event)) => {
                match event {
                    SessionEvent::LevelApplied(level) => info!(%level, "level randomised"),
                    SessionEvent::AdventureComplete => info!("adventure complete"),
                }
                on_event(event);
            }
            Ok(None) => {}
            Err(MemoryError::Read { .. } | MemoryError::Write { .. })
                if !Path::new(&format!("/proc/{pid}")).exists() =>
            {
                info!(pid, "game exited");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        }
        thread::sleep(interval);
    }
}

#[cfg(not(unix))]
pub fn run(_settings: &RandomiserSettings, _on_event: impl FnMut(SessionEvent)) -> Result<()> {
    Err(MemoryError::GameNotFound {
        reason: "process memory access needs /proc".to_string(),
    }
    .into())
}
