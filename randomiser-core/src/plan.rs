use rand::seq::SliceRandom;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::data::{
    default_wave_count, PlantId, ZombieId, ADVENTURE_PLANT_COUNT, DAY_ATTACKERS, DEFAULT_FLAGS,
    FAST_REFRESH, PLANTS, RANDOM_POOL_CANDIDATES, SLOW_REFRESH, STRONG_ZOMBIES, VANILLA_POOLS,
    VERY_SLOW_REFRESH, WATER_ZOMBIES, WAVES_PER_FLAG, ZOMBIES, ZOMBIE_DIGGER, ZOMBIE_NORMAL,
};
use crate::level::{Level, World, LEVEL_COUNT};
use crate::{Intensity, RandomiserSettings};

// Every aspect draws from its own stream so toggling one option leaves
// the others unchanged for the same seed.
const PLANT_SALT: u64 = 0x504C_414E_5453;
const COST_SALT: u64 = 0x434F_5354;
const COOLDOWN_SALT: u64 = 0x434F_4F4C;
const POINTS_SALT: u64 = 0x504F_494E_5453;
const WEIGHT_SALT: u64 = 0x5745_4947_4854;
const WORLD_SALT: u64 = 0x574F_524C_44;
const POOL_SALT: u64 = 0x504F_4F4C;
const WAVE_COUNT_SALT: u64 = 0x5741_5645_53;

/// Strong zombies stay out of the first levels unless restrictions are off.
const FIRST_STRONG_LEVEL: u8 = 5;
const MAX_EXTRA_POOL_TYPES: usize = 7;

fn rng_for(seed: u32, salt: u64) -> StdRng {
    StdRng::seed_from_u64(u64::from(seed) ^ salt)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelPlan {
    pub level: Level,
    pub world: World,
    pub flags: u32,
    pub wave_count: u32,
    pub zombies: Vec<ZombieId>,
}

/// Everything a seed decides, computed without touching the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plan {
    pub seed: u32,
    pub random_zombies: bool,
    /// Adventure plants in unlock order; the first is owned from the start.
    pub plant_order: Vec<PlantId>,
    pub costs: Vec<u32>,
    pub cooldowns: Vec<u32>,
    pub wave_points: Vec<u32>,
    pub weights: Vec<u32>,
    pub levels: Vec<LevelPlan>,
}

/// Levels that hand out a new plant when completed.
pub fn reward_levels() -> impl Iterator<Item = Level> {
    Level::all().filter(|l| l.stage() != 5 && l.stage() != 10)
}

impl Plan {
    pub fn generate(settings: &RandomiserSettings) -> Plan {
        let seed = settings.seed;
        let levels = generate_levels(settings);

        Plan {
            seed,
            random_zombies: settings.random_zombies,
            plant_order: generate_plant_order(settings),
            costs: generate_costs(settings),
            cooldowns: generate_cooldowns(settings),
            wave_points: generate_wave_points(settings),
            weights: generate_weights(settings),
            levels,
        }
    }

    pub fn level(&self, level: Level) -> &LevelPlan {
        &self.levels[level.index()]
    }

    /// Whether the board's waves are replaced with simulated ones for
    /// `level`. Otherwise the game rolls them itself from the vanilla pool.
    pub fn rewrites_waves(&self, level: Level) -> bool {
        let lp = self.level(level);
        self.random_zombies
            || lp.world != level.world()
            || lp.wave_count != default_wave_count(level)
    }

    pub fn starting_plant(&self) -> PlantId {
        self.plant_order[0]
    }

    /// Plant rewarded for completing `level`, if any.
    pub fn reward_for(&self, level: Level) -> Option<PlantId> {
        reward_levels()
            .zip(self.plant_order.iter().skip(1))
            .find(|(l, _)| *l == level)
            .map(|(_, p)| *p)
    }

    /// Plants owned when `level` starts.
    pub fn owned_plants(&self, level: Level) -> Vec<PlantId> {
        let mut owned = vec![self.starting_plant()];
        owned.extend(
            reward_levels()
                .zip(self.plant_order.iter().skip(1))
                .take_while(|(l, _)| *l < level)
                .map(|(_, p)| *p),
        );
        owned
    }
}

fn generate_plant_order(settings: &RandomiserSettings) -> Vec<PlantId> {
    let mut order: Vec<PlantId> = (0..ADVENTURE_PLANT_COUNT as PlantId).collect();
    if !settings.randomize_plants {
        return order;
    }

    let mut rng = rng_for(settings.seed, PLANT_SALT);
    order.shuffle(&mut rng);

    // Level 1-1 is unwinnable without something that shoots.
    if !settings.no_restrictions {
        if let Some(pos) = order.iter().position(|p| DAY_ATTACKERS.contains(p)) {
            order.swap(0, pos);
        }
    }

    order
}

fn generate_costs(settings: &RandomiserSettings) -> Vec<u32> {
    if !settings.random_cost {
        return PLANTS.iter().map(|p| p.cost).collect();
    }

    let mut rng = rng_for(settings.seed, COST_SALT);
    PLANTS
        .iter()
        .map(|p| {
            let factor: f64 = rng.gen_range(0.5..=1.5);
            ((f64::from(p.cost) * factor / 25.0).round() as u32) * 25
        })
        .collect()
}

fn generate_cooldowns(settings: &RandomiserSettings) -> Vec<u32> {
    if !settings.random_cooldowns {
        return PLANTS.iter().map(|p| p.refresh).collect();
    }

    const TIERS: [u32; 3] = [FAST_REFRESH, SLOW_REFRESH, VERY_SLOW_REFRESH];
    let mut rng = rng_for(settings.seed, COOLDOWN_SALT);
    PLANTS
        .iter()
        .map(|_| TIERS[rng.gen_range(0..TIERS.len())])
        .collect()
}

fn generate_wave_points(settings: &RandomiserSettings) -> Vec<u32> {
    let mut rng = rng_for(settings.seed, POINTS_SALT);
    ZOMBIES
        .iter()
        .map(|z| match settings.random_wave_points {
            _ if z.points == 0 => 0,
            Intensity::Off => z.points,
            Intensity::On => (i64::from(z.points) + rng.gen_range(-1..=1)).max(1) as u32,
            Intensity::Extreme => rng.gen_range(1..=10),
        })
        .collect()
}

fn generate_weights(settings: &RandomiserSettings) -> Vec<u32> {
    let mut rng = rng_for(settings.seed, WEIGHT_SALT);
    ZOMBIES
        .iter()
        .map(|z| {
            if settings.random_weights && z.weight > 0 {
                rng.gen_range(1000..=4000)
            } else {
                z.weight
            }
        })
        .collect()
}

fn generate_worlds(settings: &RandomiserSettings) -> Vec<World> {
    let mut rng = rng_for(settings.seed, WORLD_SALT);
    Level::all()
        .map(|level| {
            if !settings.random_world || level.number() == LEVEL_COUNT {
                return level.world();
            }
            if rng.gen_range(0..100u8) < settings.random_world_chance {
                World::ALL[rng.gen_range(0..World::ALL.len())]
            } else {
                level.world()
            }
        })
        .collect()
}

fn zombie_allowed(zombie: ZombieId, level: Level, world: World, settings: &RandomiserSettings) -> bool {
    if WATER_ZOMBIES.contains(&zombie) && !world.has_water() {
        return false;
    }
    if zombie == ZOMBIE_DIGGER && world == World::Roof {
        return false;
    }
    if STRONG_ZOMBIES.contains(&zombie)
        && level.number() < FIRST_STRONG_LEVEL
        && !settings.no_restrictions
    {
        return false;
    }
    true
}

fn generate_pool(level: Level, world: World, settings: &RandomiserSettings, rng: &mut StdRng) -> Vec<ZombieId> {
    if !settings.random_zombies {
        return VANILLA_POOLS[level.index()]
            .iter()
            .copied()
            .filter(|z| !WATER_ZOMBIES.contains(z) || world.has_water())
            .collect();
    }

    let extra = (1 + level.index() / 8).min(MAX_EXTRA_POOL_TYPES);
    let mut candidates: Vec<ZombieId> = RANDOM_POOL_CANDIDATES
        .iter()
        .copied()
        .filter(|z| zombie_allowed(*z, level, world, settings))
        .collect();
    candidates.shuffle(rng);

    let mut pool = vec![ZOMBIE_NORMAL];
    pool.extend(candidates.into_iter().take(extra));
    pool.sort_unstable();
    pool
}

fn generate_levels(settings: &RandomiserSettings) -> Vec<LevelPlan> {
    let worlds = generate_worlds(settings);
    let mut pool_rng = rng_for(settings.seed, POOL_SALT);
    let mut wave_rng = rng_for(settings.seed, WAVE_COUNT_SALT);

    Level::all()
        .zip(worlds)
        .map(|(level, world)| {
            let max_flags = match settings.random_wave_count {
                Intensity::Off => None,
                Intensity::On => Some(3),
                Intensity::Extreme => Some(5),
            };
            let (flags, wave_count) = match max_flags {
                Some(max) if (5..LEVEL_COUNT).contains(&level.number()) => {
                    let flags = wave_rng.gen_range(1..=max);
                    (flags, flags * WAVES_PER_FLAG)
                }
                _ => (DEFAULT_FLAGS[level.index()], default_wave_count(level)),
            };

            LevelPlan {
                level,
                world,
                flags,
                wave_count,
                zombies: generate_pool(level, world, settings, &mut pool_rng),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(seed: u32) -> RandomiserSettings {
        RandomiserSettings {
            seed,
            ..RandomiserSettings::vanilla()
        }
    }

    #[test]
    fn vanilla_settings_change_nothing() {
        let plan = Plan::generate(&settings(1234));
        assert_eq!(plan.plant_order, (0..40).collect::<Vec<u8>>());
        assert_eq!(plan.costs[0], 100);
        assert_eq!(plan.cooldowns[2], VERY_SLOW_REFRESH);
        assert_eq!(plan.wave_points[23], 10);
        assert_eq!(plan.level(Level::new(44).unwrap()).zombies, VANILLA_POOLS[43].to_vec());
        assert_eq!(plan.level(Level::new(7).unwrap()).wave_count, 20);
    }

    #[test]
    fn generation_is_deterministic() {
        let mut s = settings(99);
        s.apply_no_restrictions();
        assert_eq!(Plan::generate(&s), Plan::generate(&s));
    }

    #[test]
    fn start_plant_is_an_attacker() {
        for seed in 1..50 {
            let mut s = settings(seed);
            s.randomize_plants = true;
            let plan = Plan::generate(&s);
            assert!(DAY_ATTACKERS.contains(&plan.starting_plant()), "seed {seed}");
            let mut sorted = plan.plant_order.clone();
            sorted.sort_unstable();
            assert_eq!(sorted, (0..40).collect::<Vec<u8>>());
        }
    }

    #[test]
    fn toggling_costs_keeps_plant_order() {
        let mut a = settings(7);
        a.randomize_plants = true;
        let mut b = a.clone();
        b.random_cost = true;
        assert_eq!(Plan::generate(&a).plant_order, Plan::generate(&b).plant_order);
    }

    #[test]
    fn random_costs_stay_on_the_25_grid() {
        let mut s = settings(5);
        s.random_cost = true;
        let plan = Plan::generate(&s);
        for (cost, info) in plan.costs.iter().zip(PLANTS.iter()) {
            assert_eq!(cost % 25, 0);
            assert!(*cost <= info.cost * 3 / 2 + 25);
        }
    }

    #[test]
    fn owned_plants_grow_by_reward_levels() {
        let plan = Plan::generate(&settings(1));
        assert_eq!(plan.owned_plants(Level::new(1).unwrap()), vec![0]);
        assert_eq!(plan.owned_plants(Level::new(5).unwrap()).len(), 5);
        // 1-5 gives nothing, so 1-6 starts with the same plants.
        assert_eq!(plan.owned_plants(Level::new(6).unwrap()).len(), 5);
        assert_eq!(plan.reward_for(Level::new(5).unwrap()), None);
        assert_eq!(plan.reward_for(Level::new(1).unwrap()), Some(1));
        assert_eq!(plan.owned_plants(Level::new(50).unwrap()).len(), 40);
    }

    #[test]
    fn random_pools_respect_world_rules() {
        for seed in 1..30 {
            let mut s = settings(seed);
            s.random_zombies = true;
            s.random_world = true;
            s.random_world_chance = 50;
            let plan = Plan::generate(&s);
            for lp in &plan.levels {
                assert_eq!(lp.zombies[0], ZOMBIE_NORMAL);
                for z in &lp.zombies {
                    if WATER_ZOMBIES.contains(z) {
                        assert!(lp.world.has_water(), "seed {seed} {}", lp.level);
                    }
                    if lp.level.number() < FIRST_STRONG_LEVEL {
                        assert!(!STRONG_ZOMBIES.contains(z));
                    }
                }
                assert!(lp.zombies.len() <= 1 + MAX_EXTRA_POOL_TYPES);
            }
            assert_eq!(plan.levels[49].world, World::Roof);
        }
    }

    #[test]
    fn random_wave_counts_are_whole_flags() {
        let mut s = settings(3);
        s.random_wave_count = Intensity::Extreme;
        let plan = Plan::generate(&s);
        for lp in &plan.levels[4..49] {
            assert!((1..=5).contains(&lp.flags));
            assert_eq!(lp.wave_count, lp.flags * WAVES_PER_FLAG);
        }
        assert_eq!(plan.levels[0].wave_count, 4);
    }

    #[test]
    fn only_changed_levels_get_new_waves() {
        let plan = Plan::generate(&settings(4));
        assert!(Level::all().all(|l| !plan.rewrites_waves(l)));

        let mut s = settings(4);
        s.random_wave_count = Intensity::On;
        let plan = Plan::generate(&s);
        assert!(!plan.rewrites_waves(Level::new(1).unwrap()));

        s.random_zombies = true;
        let plan = Plan::generate(&s);
        assert!(Level::all().all(|l| plan.rewrites_waves(l)));
    }

    #[test]
    fn zero_point_zombies_stay_free() {
        let mut s = settings(11);
        s.random_wave_points = Intensity::Extreme;
        let plan = Plan::generate(&s);
        assert_eq!(plan.wave_points[9], 0);
        assert_eq!(plan.wave_points[25], 0);
        assert!(plan.wave_points.iter().enumerate().all(|(i, p)| *p > 0 || ZOMBIES[i].points == 0));
    }
}
