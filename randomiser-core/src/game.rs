//! Fixed memory layout of the GOTY 1.2.0.1073 build and the writes that
//! turn a [`Plan`] into game state.

use tracing::{debug, info};

use crate::data::{ZombieId, MAX_WAVES, MAX_ZOMBIES_PER_WAVE, PLANTS, ZOMBIES};
use crate::level::Level;
use crate::memory::{MemoryError, MockMemory, ProcessMemory};
use crate::plan::Plan;
use crate::waves::simulate_level;

pub const APP_BASE: u32 = 0x6A_9EC0;
pub const GAME_UI: u32 = 0x7FC;
pub const BOARD: u32 = 0x768;
pub const PLAYER_INFO: u32 = 0x82C;
pub const PLAYER_LEVEL: u32 = 0x24;

pub const PLANT_DEFINITIONS: u32 = 0x69_F2B0;
pub const PLANT_DEFINITION_STRIDE: u32 = 0x24;
pub const PLANT_COST: u32 = 0x10;
pub const PLANT_REFRESH: u32 = 0x14;

pub const ZOMBIE_DEFINITIONS: u32 = 0x69_DA80;
pub const ZOMBIE_DEFINITION_STRIDE: u32 = 0x1C;
pub const ZOMBIE_VALUE: u32 = 0x08;
pub const ZOMBIE_PICK_WEIGHT: u32 = 0x14;

pub const BOARD_ZOMBIES_IN_WAVE: u32 = 0x6B4;
pub const BOARD_BACKGROUND: u32 = 0x554C;
pub const BOARD_SUN: u32 = 0x5560;
pub const BOARD_NUM_WAVES: u32 = 0x5564;

const NO_ZOMBIE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameScene {
    Loading,
    MainMenu,
    LevelIntro,
    Playing,
    ZombiesWon,
    Award,
    Credits,
    Challenge,
    Unknown(i32),
}

impl From<i32> for GameScene {
    fn from(value: i32) -> Self {
        match value {
            0 => GameScene::Loading,
            1 => GameScene::MainMenu,
            2 => GameScene::LevelIntro,
            3 => GameScene::Playing,
            4 => GameScene::ZombiesWon,
            5 => GameScene::Award,
            6 => GameScene::Credits,
            7 => GameScene::Challenge,
            other => GameScene::Unknown(other),
        }
    }
}

fn plant_field(id: usize, field: u32) -> [u32; 1] {
    [PLANT_DEFINITIONS + id as u32 * PLANT_DEFINITION_STRIDE + field]
}

fn zombie_field(id: usize, field: u32) -> [u32; 1] {
    [ZOMBIE_DEFINITIONS + id as u32 * ZOMBIE_DEFINITION_STRIDE + field]
}

fn board_field(field: u32) -> [u32; 3] {
    [APP_BASE, BOARD, field]
}

/// Typed view over the game's memory.
pub struct Game<M> {
    memory: M,
}

impl<M: ProcessMemory> Game<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn into_inner(self) -> M {
        self.memory
    }

    pub fn game_ui(&self) -> Result<i32, MemoryError> {
        self.memory.read(&[APP_BASE, GAME_UI])
    }

    pub fn scene(&self) -> Result<GameScene, MemoryError> {
        self.game_ui().map(GameScene::from)
    }

    /// Adventure level the profile is on, `None` once adventure is beaten
    /// or before a profile is loaded.
    pub fn adventure_level(&self) -> Result<Option<Level>, MemoryError> {
        let raw: i32 = self.memory.read(&[APP_BASE, PLAYER_INFO, PLAYER_LEVEL])?;
        Ok(u8::try_from(raw).ok().and_then(Level::new))
    }

    pub fn sun(&self) -> Result<i32, MemoryError> {
        self.memory.read(&board_field(BOARD_SUN))
    }

    pub fn set_sun(&mut self, sun: i32) -> Result<(), MemoryError> {
        self.memory.write(sun, &board_field(BOARD_SUN))
    }

    pub fn set_plant_cost(&mut self, plant: usize, cost: u32) -> Result<(), MemoryError> {
        self.memory.write(cost as i32, &plant_field(plant, PLANT_COST))
    }

    pub fn set_plant_cooldown(&mut self, plant: usize, refresh: u32) -> Result<(), MemoryError> {
        self.memory.write(refresh as i32, &plant_field(plant, PLANT_REFRESH))
    }

    pub fn set_zombie_points(&mut self, zombie: usize, points: u32) -> Result<(), MemoryError> {
        self.memory.write(points as i32, &zombie_field(zombie, ZOMBIE_VALUE))
    }

    pub fn set_zombie_weight(&mut self, zombie: usize, weight: u32) -> Result<(), MemoryError> {
        self.memory.write(weight as i32, &zombie_field(zombie, ZOMBIE_PICK_WEIGHT))
    }

    pub fn set_background(&mut self, background: u32) -> Result<(), MemoryError> {
        self.memory.write(background as i32, &board_field(BOARD_BACKGROUND))
    }

    /// Replace the board's wave table. Each row holds up to 50 zombie ids
    /// and is terminated by -1 when shorter.
    pub fn write_waves(&mut self, waves: &[Vec<ZombieId>]) -> Result<(), MemoryError> {
        if waves.len() > MAX_WAVES {
            return Err(MemoryError::Allocation {
                needed: waves.len(),
                available: MAX_WAVES,
            });
        }
        if let Some(wave) = waves.iter().find(|w| w.len() > MAX_ZOMBIES_PER_WAVE) {
            return Err(MemoryError::Allocation {
                needed: wave.len(),
                available: MAX_ZOMBIES_PER_WAVE,
            });
        }

        let mut table = vec![NO_ZOMBIE; waves.len() * MAX_ZOMBIES_PER_WAVE];
        for (row, wave) in table.chunks_exact_mut(MAX_ZOMBIES_PER_WAVE).zip(waves) {
            for (slot, zombie) in row.iter_mut().zip(wave) {
                *slot = i32::from(*zombie);
            }
        }

        if !table.is_empty() {
            self.memory
                .write_slice(&table, &board_field(BOARD_ZOMBIES_IN_WAVE))?;
        }
        self.memory
            .write(waves.len() as i32, &board_field(BOARD_NUM_WAVES))
    }

    /// Write plant and zombie definitions that differ from vanilla.
    /// Returns how many values were written.
    pub fn apply_globals(&mut self, plan: &Plan) -> Result<usize, MemoryError> {
        let mut written = 0;

        for (id, info) in PLANTS.iter().enumerate() {
            if plan.costs[id] != info.cost {
                self.set_plant_cost(id, plan.costs[id])?;
                written += 1;
            }
            if plan.cooldowns[id] != info.refresh {
                self.set_plant_cooldown(id, plan.cooldowns[id])?;
                written += 1;
            }
        }

        for (id, info) in ZOMBIES.iter().enumerate() {
            if plan.wave_points[id] != info.points {
                self.set_zombie_points(id, plan.wave_points[id])?;
                written += 1;
            }
            if plan.weights[id] != info.weight {
                self.set_zombie_weight(id, plan.weights[id])?;
                written += 1;
            }
        }

        info!(seed = plan.seed, written, "applied global plan values");
        Ok(written)
    }

    /// Write the background and waves planned for `level` onto the board.
    pub fn apply_level(&mut self, plan: &Plan, level: Level) -> Result<(), MemoryError> {
        let lp = plan.level(level);
        self.set_background(lp.world.background_id())?;
        if plan.rewrites_waves(level) {
            let waves = simulate_level(plan, level);
            self.write_waves(&waves)?;
        }
        debug!(%level, world = ?lp.world, waves = lp.wave_count, "applied level plan");
        Ok(())
    }
}

impl Game<MockMemory> {
    /// A mapped stand-in for the game with vanilla definition tables, for
    /// dry runs and tests.
    pub fn simulated() -> Self {
        const APP: u32 = 0x0100_0000;
        const BOARD_ADDR: u32 = 0x0200_0000;
        const PLAYER: u32 = 0x0300_0000;

        let mut app = vec![0u8; 0x1000];
        app[BOARD as usize..BOARD as usize + 4].copy_from_slice(&BOARD_ADDR.to_le_bytes());
        app[PLAYER_INFO as usize..PLAYER_INFO as usize + 4].copy_from_slice(&PLAYER.to_le_bytes());

        let mut memory = MockMemory::new();
        memory.map_with(APP_BASE, &APP.to_le_bytes());
        memory.map_with(APP, &app);
        memory.map(BOARD_ADDR, 0x6000);
        memory.map(PLAYER, 0x100);

        let mut plants = vec![0u8; PLANTS.len() * PLANT_DEFINITION_STRIDE as usize];
        for (def, info) in plants
            .chunks_exact_mut(PLANT_DEFINITION_STRIDE as usize)
            .zip(PLANTS.iter())
        {
            let cost = PLANT_COST as usize;
            let refresh = PLANT_REFRESH as usize;
            def[cost..cost + 4].copy_from_slice(&info.cost.to_le_bytes());
            def[refresh..refresh + 4].copy_from_slice(&info.refresh.to_le_bytes());
        }
        memory.map_with(PLANT_DEFINITIONS, &plants);

        let mut zombies = vec![0u8; ZOMBIES.len() * ZOMBIE_DEFINITION_STRIDE as usize];
        for (def, info) in zombies
            .chunks_exact_mut(ZOMBIE_DEFINITION_STRIDE as usize)
            .zip(ZOMBIES.iter())
        {
            let value = ZOMBIE_VALUE as usize;
            let weight = ZOMBIE_PICK_WEIGHT as usize;
            def[value..value + 4].copy_from_slice(&info.points.to_le_bytes());
            def[weight..weight + 4].copy_from_slice(&info.weight.to_le_bytes());
        }
        memory.map_with(ZOMBIE_DEFINITIONS, &zombies);

        Game::new(memory)
    }

    pub fn memory_mut(&mut self) -> &mut MockMemory {
        &mut self.memory
    }
}

/// What a poll of the game changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The plan for this level was just written.
    LevelApplied(Level),
    /// The player won the final level.
    AdventureComplete,
}

/// Live randomiser state: globals are applied once, then each level is
/// rewritten as the player enters it.
pub struct Session<M> {
    game: Game<M>,
    plan: Plan,
    last_applied: Option<Level>,
    final_entered: bool,
    completed: bool,
}

impl<M: ProcessMemory> Session<M> {
    pub fn new(mut game: Game<M>, plan: Plan) -> Result<Self, MemoryError> {
        game.apply_globals(&plan)?;
        Ok(Self {
            game,
            plan,
            last_applied: None,
            final_entered: false,
            completed: false,
        })
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn game(&self) -> &Game<M> {
        &self.game
    }

    /// Poll the game once.
    ///
    /// The game rebuilds its waves whenever a board is created, so leaving
    /// a level re-arms it. The adventure counts as complete once the
    /// player's level moves off the final one after it was entered.
    pub fn tick(&mut self) -> Result<Option<SessionEvent>, MemoryError> {
        match self.game.scene()? {
            GameScene::LevelIntro => {}
            GameScene::Playing => return Ok(None),
            _ => {
                self.last_applied = None;
                if self.final_entered
                    && !self.completed
                    && self.game.adventure_level()? != Some(Level::LAST)
                {
                    self.completed = true;
                    return Ok(Some(SessionEvent::AdventureComplete));
                }
                return Ok(None);
            }
        }

        let Some(level) = self.game.adventure_level()? else {
            return Ok(None);
        };
        if self.last_applied == Some(level) {
            return Ok(None);
        }

        self.game.apply_level(&self.plan, level)?;
        self.last_applied = Some(level);
        self.final_entered |= level == Level::LAST;
        Ok(Some(SessionEvent::LevelApplied(level)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ZOMBIE_FLAG;
    use crate::level::World;
    use crate::{Intensity, RandomiserSettings};

    fn set_scene(game: &mut Game<MockMemory>, scene: i32) {
        game.memory_mut().write(scene, &[APP_BASE, GAME_UI]).unwrap();
    }

    fn set_level(game: &mut Game<MockMemory>, level: i32) {
        game.memory_mut()
            .write(level, &[APP_BASE, PLAYER_INFO, PLAYER_LEVEL])
            .unwrap();
    }

    #[test]
    fn scenes_decode() {
        assert_eq!(GameScene::from(2), GameScene::LevelIntro);
        assert_eq!(GameScene::from(42), GameScene::Unknown(42));
    }

    #[test]
    fn reads_through_the_simulated_layout() {
        let mut game = Game::simulated();
        set_scene(&mut game, 3);
        set_level(&mut game, 23);
        game.set_sun(150).unwrap();

        assert_eq!(game.scene().unwrap(), GameScene::Playing);
        assert_eq!(game.adventure_level().unwrap(), Level::new(23));
        assert_eq!(game.sun().unwrap(), 150);

        set_level(&mut game, 51);
        assert_eq!(game.adventure_level().unwrap(), None);
    }

    #[test]
    fn vanilla_plan_writes_no_globals() {
        let mut game = Game::simulated();
        let before = game.memory().write_count();
        let plan = Plan::generate(&RandomiserSettings::vanilla());
        assert_eq!(game.apply_globals(&plan).unwrap(), 0);
        assert_eq!(game.memory().write_count(), before);
    }

    #[test]
    fn random_costs_land_in_plant_definitions() {
        let mut game = Game::simulated();
        let settings = RandomiserSettings {
            seed: 8,
            random_cost: true,
            random_wave_points: Intensity::Extreme,
            ..RandomiserSettings::vanilla()
        };
        let plan = Plan::generate(&settings);
        game.apply_globals(&plan).unwrap();

        for id in [0usize, 17, 48] {
            let cost: i32 = game.memory().read(&plant_field(id, PLANT_COST)).unwrap();
            assert_eq!(cost as u32, plan.costs[id]);
        }
        let points: i32 = game.memory().read(&zombie_field(23, ZOMBIE_VALUE)).unwrap();
        assert_eq!(points as u32, plan.wave_points[23]);
    }

    #[test]
    fn waves_are_terminated_rows() {
        let mut game = Game::simulated();
        game.write_waves(&[vec![ZOMBIE_FLAG, 0, 0], vec![2]]).unwrap();

        let rows: Vec<i32> = game
            .memory()
            .read_array(2 * MAX_ZOMBIES_PER_WAVE, &board_field(BOARD_ZOMBIES_IN_WAVE))
            .unwrap();
        assert_eq!(&rows[..4], &[1, 0, 0, -1]);
        assert_eq!(rows[MAX_ZOMBIES_PER_WAVE], 2);
        assert_eq!(rows[MAX_ZOMBIES_PER_WAVE + 1], -1);
        let count: i32 = game.memory().read(&board_field(BOARD_NUM_WAVES)).unwrap();
        assert_eq!(count, 2);
    }

    #[test]
    fn oversized_wave_tables_are_rejected() {
        let mut game = Game::simulated();
        let too_many = vec![vec![0]; MAX_WAVES + 1];
        assert!(matches!(
            game.write_waves(&too_many),
            Err(MemoryError::Allocation { needed: 101, available: 100 })
        ));
        let too_wide = vec![vec![0; MAX_ZOMBIES_PER_WAVE + 1]];
        assert!(matches!(
            game.write_waves(&too_wide),
            Err(MemoryError::Allocation { needed: 51, available: 50 })
        ));
    }

    #[test]
    fn session_applies_each_level_once() {
        let settings = RandomiserSettings {
            seed: 77,
            random_zombies: true,
            random_world: true,
            random_world_chance: 100,
            ..RandomiserSettings::vanilla()
        };
        let plan = Plan::generate(&settings);
        let mut game = Game::simulated();
        set_scene(&mut game, 1);
        set_level(&mut game, 12);
        let mut session = Session::new(game, plan).unwrap();

        assert_eq!(session.tick().unwrap(), None);

        let applied = Some(SessionEvent::LevelApplied(Level::new(12).unwrap()));
        set_scene(&mut session.game, 2);
        assert_eq!(session.tick().unwrap(), applied);
        assert_eq!(session.tick().unwrap(), None);

        let level = Level::new(12).unwrap();
        let background: i32 = session.game().memory().read(&board_field(BOARD_BACKGROUND)).unwrap();
        assert_eq!(background as u32, session.plan().level(level).world.background_id());
        let waves: i32 = session.game().memory().read(&board_field(BOARD_NUM_WAVES)).unwrap();
        assert_eq!(waves as u32, session.plan().level(level).wave_count);

        // Losing sends the player back; the next intro is rewritten.
        set_scene(&mut session.game, 4);
        assert_eq!(session.tick().unwrap(), None);
        set_scene(&mut session.game, 2);
        assert_eq!(session.tick().unwrap(), applied);
    }

    #[test]
    fn only_winning_the_final_level_completes_the_adventure() {
        let plan = Plan::generate(&RandomiserSettings::vanilla());
        let mut game = Game::simulated();
        set_scene(&mut game, 2);
        set_level(&mut game, 50);
        let mut session = Session::new(game, plan).unwrap();
        let entered = Some(SessionEvent::LevelApplied(Level::LAST));
        assert_eq!(session.tick().unwrap(), entered);

        // Losing leaves the player on 5-10.
        set_scene(&mut session.game, 4);
        assert_eq!(session.tick().unwrap(), None);
        set_scene(&mut session.game, 2);
        assert_eq!(session.tick().unwrap(), entered);

        // Winning moves the profile back to the start.
        set_scene(&mut session.game, 5);
        set_level(&mut session.game, 1);
        assert_eq!(session.tick().unwrap(), Some(SessionEvent::AdventureComplete));
        set_scene(&mut session.game, 1);
        assert_eq!(session.tick().unwrap(), None);
    }

    #[test]
    fn level_fifty_keeps_the_roof() {
        let plan = Plan::generate(&RandomiserSettings::vanilla());
        let mut game = Game::simulated();
        game.apply_level(&plan, Level::new(50).unwrap()).unwrap();
        let background: i32 = game.memory().read(&board_field(BOARD_BACKGROUND)).unwrap();
        assert_eq!(background as u32, World::Roof.background_id());
    }
}
