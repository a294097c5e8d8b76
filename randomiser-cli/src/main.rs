use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use pvz_randomiser_core::config::{config_path, load_config, save_config, ConfigFile};
use pvz_randomiser_core::data::{plant_name, zombie_name};
use pvz_randomiser_core::game::Game;
use pvz_randomiser_core::memory::{ProcessMemory, ScalarType, Value};
use pvz_randomiser_core::plan::Plan;
use pvz_randomiser_core::seed_finder::{classify_plan, search, Outcome, SeedCriteria};
use pvz_randomiser_core::waves::simulate_level;
use pvz_randomiser_core::{
    init_logging, run, Intensity, Level, RandomiserError, RandomiserSettings, Result, SessionEvent,
};

#[derive(Debug, Parser)]
#[command(name = "pvz-randomiser", version, about = "Plants vs. Zombies adventure randomiser")]
struct Cli {
    /// Settings file. Defaults to the per-user config directory.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Attach to the running game and randomise it live.
    Run {
        #[command(flatten)]
        options: SettingsArgs,

        /// Store these settings as the new defaults.
        #[arg(long)]
        save_config: bool,

        /// Start a new session instead of resuming the saved one.
        #[arg(long)]
        fresh: bool,
    },
    /// Generate a plan and apply it to a simulated game.
    Plan {
        #[command(flatten)]
        options: SettingsArgs,

        /// Also print the waves of this level (`x-y`).
        #[arg(long)]
        level: Option<Level>,
    },
    /// Search a seed range for plans that pass the criteria.
    FindSeeds {
        #[command(flatten)]
        options: SettingsArgs,

        #[command(flatten)]
        criteria: CriteriaArgs,

        #[arg(long, default_value_t = 1)]
        from: u32,

        #[arg(long, default_value_t = 100_000)]
        to: u32,

        /// Worker threads. Defaults to the number of CPUs.
        #[arg(long)]
        workers: Option<usize>,

        /// Stop after this many passing seeds; 0 finds all of them.
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Convert between `x-y` level strings and level numbers.
    Level { value: String },
    /// Read typed values through a pointer chain.
    Peek {
        /// C type name, e.g. `int` or `unsigned short`.
        ty: String,

        /// Pointer-offset chain, hex with or without `0x`.
        #[arg(required = true, value_parser = parse_address)]
        chain: Vec<u32>,

        #[arg(long, default_value_t = 1)]
        count: usize,

        #[arg(long)]
        pid: Option<u32>,
    },
    /// Write typed values through a pointer chain.
    Poke {
        ty: String,

        #[arg(required = true, value_parser = parse_address)]
        chain: Vec<u32>,

        /// Values to write back to back.
        #[arg(long = "value", required = true, allow_hyphen_values = true)]
        values: Vec<String>,

        #[arg(long)]
        pid: Option<u32>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IntensityArg {
    Off,
    On,
    Extreme,
}

impl From<IntensityArg> for Intensity {
    fn from(value: IntensityArg) -> Self {
        match value {
            IntensityArg::Off => Intensity::Off,
            IntensityArg::On => Intensity::On,
            IntensityArg::Extreme => Intensity::Extreme,
        }
    }
}

/// Overrides on top of the saved settings.
#[derive(Debug, Args)]
struct SettingsArgs {
    #[arg(long)]
    seed: Option<u32>,

    /// Start from unmodified settings instead of the saved ones.
    #[arg(long)]
    vanilla: bool,

    #[arg(long)]
    randomize_plants: bool,

    #[arg(long)]
    random_cost: bool,

    #[arg(long)]
    random_cooldowns: bool,

    #[arg(long)]
    random_zombies: bool,

    #[arg(long)]
    random_weights: bool,

    #[arg(long, value_enum)]
    random_wave_points: Option<IntensityArg>,

    #[arg(long, value_enum)]
    random_wave_count: Option<IntensityArg>,

    #[arg(long)]
    random_world: bool,

    /// Percent chance for each level to move world.
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    random_world_chance: Option<u8>,

    /// Turn everything on and drop the fairness restrictions.
    #[arg(long)]
    no_restrictions: bool,
}

impl SettingsArgs {
    fn resolve(&self, saved: &RandomiserSettings) -> RandomiserSettings {
        let mut settings = if self.vanilla {
            RandomiserSettings {
                seed: saved.seed,
                ..RandomiserSettings::vanilla()
            }
        } else {
            saved.clone()
        };

        if self.no_restrictions {
            settings.apply_no_restrictions();
        }
        if let Some(seed) = self.seed {
            settings.seed = seed;
        }
        settings.randomize_plants |= self.randomize_plants;
        settings.random_cost |= self.random_cost;
        settings.random_cooldowns |= self.random_cooldowns;
        settings.random_zombies |= self.random_zombies;
        settings.random_weights |= self.random_weights;
        settings.random_world |= self.random_world;
        if let Some(points) = self.random_wave_points {
            settings.random_wave_points = points.into();
        }
        if let Some(count) = self.random_wave_count {
            settings.random_wave_count = count.into();
        }
        if let Some(chance) = self.random_world_chance {
            settings.random_world_chance = chance;
        }
        settings
    }
}

#[derive(Debug, Args)]
struct CriteriaArgs {
    #[arg(long)]
    no_good_plants: bool,

    #[arg(long)]
    min_good_plants: Option<u32>,

    #[arg(long)]
    no_pool: bool,

    /// Plants needed for the first four pool levels.
    #[arg(long, num_args = 4, value_name = "N")]
    pool_thresholds: Option<Vec<u32>>,

    #[arg(long)]
    no_roof: bool,

    #[arg(long)]
    no_gargs: bool,

    #[arg(long)]
    garg_insta_kills: Option<u32>,

    #[arg(long)]
    no_balloons: bool,

    #[arg(long)]
    no_shrooms: bool,

    #[arg(long)]
    no_insta: bool,
}

impl CriteriaArgs {
    fn resolve(&self, saved: &SeedCriteria) -> SeedCriteria {
        let mut criteria = saved.clone();
        criteria.good_plants &= !self.no_good_plants;
        criteria.pool &= !self.no_pool;
        criteria.roof &= !self.no_roof;
        criteria.gargs &= !self.no_gargs;
        criteria.balloons &= !self.no_balloons;
        criteria.shrooms &= !self.no_shrooms;
        criteria.insta &= !self.no_insta;
        if let Some(n) = self.min_good_plants {
            criteria.min_good_plants = n;
        }
        if let Some(n) = self.garg_insta_kills {
            criteria.garg_insta_kills = n;
        }
        if let Some(thresholds) = &self.pool_thresholds {
            for (slot, n) in criteria.pool_thresholds.iter_mut().zip(thresholds) {
                *slot = *n;
            }
        }
        criteria
    }
}

fn parse_address(text: &str) -> std::result::Result<u32, String> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    u32::from_str_radix(hex, 16).map_err(|e| format!("invalid address '{text}': {e}"))
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(err) = dispatch(cli) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let path = cli.config.or_else(config_path);
    let cfg = path.as_deref().map(load_config).unwrap_or_default();

    match cli.command {
        Command::Run {
            options,
            save_config,
            fresh,
        } => run_live(path.as_deref(), cfg, &options, save_config, fresh),
        Command::Plan { options, level } => {
            print_plan(&options.resolve(&cfg.settings), &cfg.criteria, level)
        }
        Command::FindSeeds {
            options,
            criteria,
            from,
            to,
            workers,
            limit,
        } => {
            let settings = options.resolve(&cfg.settings);
            let criteria = criteria.resolve(&cfg.criteria);
            let limit = (limit > 0).then_some(limit);
            let report = search(&settings, &criteria, from..=to, workers, limit);

            println!(
                "Tried {} seeds in {:.2}s",
                report.tried,
                report.elapsed.as_secs_f64()
            );
            for outcome in Outcome::ALL {
                println!(
                    "  0x{:02X} {:<44} {}",
                    outcome.code(),
                    outcome.description(),
                    report.count(outcome)
                );
            }
            if report.found.is_empty() {
                println!("No seeds found.");
            } else {
                println!("Seeds:");
                for seed in &report.found {
                    println!("  {seed}");
                }
            }
            Ok(())
        }
        Command::Level { value } => {
            match value.parse::<u8>() {
                Ok(n) => {
                    let level = Level::new(n).ok_or_else(|| {
                        RandomiserError::Config(format!("level number must be 1-50, got {n}"))
                    })?;
                    println!("{level}");
                }
                Err(_) => println!("{}", value.parse::<Level>()?.number()),
            }
            Ok(())
        }
        Command::Peek {
            ty,
            chain,
            count,
            pid,
        } => {
            let ty = ScalarType::from_c_name(&ty)?;
            let memory = attach(pid)?;
            let values = memory.read_typed(ty, count, &chain)?;
            let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
            println!("{}", rendered.join(" "));
            Ok(())
        }
        Command::Poke {
            ty,
            chain,
            values,
            pid,
        } => {
            let ty = ScalarType::from_c_name(&ty)?;
            let values = values
                .iter()
                .map(|v| Value::parse(ty, v))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let mut memory = attach(pid)?;
            memory.write_typed(&values, &chain)?;
            info!(count = values.len(), %ty, "values written");
            Ok(())
        }
    }
}

#[cfg(unix)]
fn attach(pid: Option<u32>) -> Result<pvz_randomiser_core::memory::ProcMemory> {
    use pvz_randomiser_core::memory::ProcMemory;

    let memory = match pid {
        Some(pid) => ProcMemory::attach(pid)?,
        None => ProcMemory::attach_game()?,
    };
    Ok(memory)
}

#[cfg(not(unix))]
fn attach(_pid: Option<u32>) -> Result<pvz_randomiser_core::memory::MockMemory> {
    Err(pvz_randomiser_core::MemoryError::GameNotFound {
        reason: "process memory access needs /proc".to_string(),
    }
    .into())
}

fn store(path: Option<&Path>, cfg: &ConfigFile) {
    match path {
        Some(path) => {
            if let Err(err) = save_config(path, cfg) {
                warn!(error = %err, "could not save config");
            }
        }
        None => warn!("no config directory, progress is not saved"),
    }
}

fn run_live(
    path: Option<&Path>,
    mut cfg: ConfigFile,
    options: &SettingsArgs,
    save_settings: bool,
    fresh: bool,
) -> Result<()> {
    let mut settings = options.resolve(&cfg.settings);
    if options.seed.is_none() && !fresh {
        if let Some(seed) = cfg.resumable_seed() {
            info!(seed, "resuming saved session");
            settings.seed = seed;
        }
    }
    if save_settings {
        cfg.settings = settings.clone();
    }

    let seed = settings.seed;
    let level = cfg.start_session(seed);
    store(path, &cfg);

    println!("Seed: {seed}");
    if level != Level::FIRST {
        println!("Resuming at {level}");
    }
    run(&settings, |event| {
        match event {
            SessionEvent::LevelApplied(level) => cfg.record_level(seed, level),
            SessionEvent::AdventureComplete => cfg.record_finished(seed),
        }
        store(path, &cfg);
    })
}

fn print_plan(settings: &RandomiserSettings, criteria: &SeedCriteria, show: Option<Level>) -> Result<()> {
    let plan = Plan::generate(settings);
    let mut game = Game::simulated();
    let globals = game.apply_globals(&plan)?;
    for level in Level::all() {
        game.apply_level(&plan, level)?;
    }

    println!("Seed: {}", plan.seed);
    println!("Starting plant: {}", plant_name(plan.starting_plant()));
    println!(
        "Globals changed: {globals}, bytes written in total: {}",
        game.memory().bytes_written()
    );
    for lp in &plan.levels {
        let reward = plan
            .reward_for(lp.level)
            .map(plant_name)
            .unwrap_or("-");
        let zombies: Vec<&str> = lp.zombies.iter().map(|z| zombie_name(*z)).collect();
        println!(
            "{:>4}  {:<5} {:>3} waves  reward {:<16} {}",
            lp.level.to_string(),
            format!("{:?}", lp.world),
            lp.wave_count,
            reward,
            zombies.join(", ")
        );
    }

    let outcome = classify_plan(&plan, criteria);
    println!(
        "Seed check: 0x{:02X} {}",
        outcome.code(),
        outcome.description()
    );

    if let Some(level) = show {
        println!("Waves of {level}:");
        for (i, wave) in simulate_level(&plan, level).iter().enumerate() {
            let names: Vec<&str> = wave.iter().map(|z| zombie_name(*z)).collect();
            println!("  {:>3}: {}", i + 1, names.join(", "));
        }
    }
    Ok(())
}
