use crate::level::Level;

pub type PlantId = u8;
pub type ZombieId = u8;

#[derive(Copy, Clone, Debug)]
pub struct PlantInfo {
    pub name: &'static str,
    pub cost: u32,
    /// Recharge time in centiseconds.
    pub refresh: u32,
}

#[derive(Copy, Clone, Debug)]
pub struct ZombieInfo {
    pub name: &'static str,
    pub points: u32,
    pub weight: u32,
}

pub const FAST_REFRESH: u32 = 750;
pub const SLOW_REFRESH: u32 = 3000;
pub const VERY_SLOW_REFRESH: u32 = 5000;

const fn plant(name: &'static str, cost: u32, refresh: u32) -> PlantInfo {
    PlantInfo { name, cost, refresh }
}

const fn zombie(name: &'static str, points: u32, weight: u32) -> ZombieInfo {
    ZombieInfo { name, points, weight }
}

/// Seed types in game order. Ids 0..=39 are unlocked in adventure mode.
pub const PLANTS: [PlantInfo; 49] = [
    plant("Peashooter", 100, FAST_REFRESH),
    plant("Sunflower", 50, FAST_REFRESH),
    plant("Cherry Bomb", 150, VERY_SLOW_REFRESH),
    plant("Wall-nut", 50, SLOW_REFRESH),
    plant("Potato Mine", 25, SLOW_REFRESH),
    plant("Snow Pea", 175, FAST_REFRESH),
    plant("Chomper", 150, FAST_REFRESH),
    plant("Repeater", 200, FAST_REFRESH),
    plant("Puff-shroom", 0, FAST_REFRESH),
    plant("Sun-shroom", 25, FAST_REFRESH),
    plant("Fume-shroom", 75, FAST_REFRESH),
    plant("Grave Buster", 75, FAST_REFRESH),
    plant("Hypno-shroom", 75, SLOW_REFRESH),
    plant("Scaredy-shroom", 25, FAST_REFRESH),
    plant("Ice-shroom", 75, VERY_SLOW_REFRESH),
    plant("Doom-shroom", 125, VERY_SLOW_REFRESH),
    plant("Lily Pad", 25, FAST_REFRESH),
    plant("Squash", 50, SLOW_REFRESH),
    plant("Threepeater", 325, FAST_REFRESH),
    plant("Tangle Kelp", 25, SLOW_REFRESH),
    plant("Jalapeno", 125, VERY_SLOW_REFRESH),
    plant("Spikeweed", 100, FAST_REFRESH),
    plant("Torchwood", 175, FAST_REFRESH),
    plant("Tall-nut", 125, SLOW_REFRESH),
    plant("Sea-shroom", 0, SLOW_REFRESH),
    plant("Plantern", 25, SLOW_REFRESH),
    plant("Cactus", 125, FAST_REFRESH),
    plant("Blover", 100, FAST_REFRESH),
    plant("Split Pea", 125, FAST_REFRESH),
    plant("Starfruit", 125, FAST_REFRESH),
    plant("Pumpkin", 125, SLOW_REFRESH),
    plant("Magnet-shroom", 100, FAST_REFRESH),
    plant("Cabbage-pult", 100, FAST_REFRESH),
    plant("Flower Pot", 25, FAST_REFRESH),
    plant("Kernel-pult", 100, FAST_REFRESH),
    plant("Coffee Bean", 75, FAST_REFRESH),
    plant("Garlic", 50, FAST_REFRESH),
    plant("Umbrella Leaf", 100, FAST_REFRESH),
    plant("Marigold", 50, SLOW_REFRESH),
    plant("Melon-pult", 300, FAST_REFRESH),
    plant("Gatling Pea", 250, VERY_SLOW_REFRESH),
    plant("Twin Sunflower", 150, VERY_SLOW_REFRESH),
    plant("Gloom-shroom", 150, VERY_SLOW_REFRESH),
    plant("Cattail", 225, VERY_SLOW_REFRESH),
    plant("Winter Melon", 200, VERY_SLOW_REFRESH),
    plant("Gold Magnet", 50, VERY_SLOW_REFRESH),
    plant("Spikerock", 125, VERY_SLOW_REFRESH),
    plant("Cob Cannon", 500, VERY_SLOW_REFRESH),
    plant("Imitater", 0, FAST_REFRESH),
];

pub const ADVENTURE_PLANT_COUNT: usize = 40;

/// Zombie types in game order. `points` is the wave point array the
/// spawner spends per wave; `weight` is the vanilla pick weight.
pub const ZOMBIES: [ZombieInfo; 33] = [
    zombie("Zombie", 1, 4000),
    zombie("Flag Zombie", 1, 0),
    zombie("Conehead Zombie", 2, 4000),
    zombie("Pole Vaulting Zombie", 2, 2000),
    zombie("Buckethead Zombie", 4, 3000),
    zombie("Newspaper Zombie", 2, 1000),
    zombie("Screen Door Zombie", 4, 3500),
    zombie("Football Zombie", 7, 2000),
    zombie("Dancing Zombie", 5, 1000),
    zombie("Backup Dancer", 0, 0),
    zombie("Ducky Tube Zombie", 1, 0),
    zombie("Snorkel Zombie", 3, 2000),
    zombie("Zomboni", 7, 2000),
    zombie("Zombie Bobsled Team", 3, 1500),
    zombie("Dolphin Rider Zombie", 3, 1500),
    zombie("Jack-in-the-Box Zombie", 3, 1000),
    zombie("Balloon Zombie", 2, 2000),
    zombie("Digger Zombie", 4, 1000),
    zombie("Pogo Zombie", 4, 1000),
    zombie("Zombie Yeti", 4, 1),
    zombie("Bungee Zombie", 3, 1000),
    zombie("Ladder Zombie", 4, 1000),
    zombie("Catapult Zombie", 5, 1500),
    zombie("Gargantuar", 10, 1500),
    zombie("Imp", 10, 0),
    zombie("Dr. Zomboss", 0, 0),
    zombie("Peashooter Zombie", 1, 4000),
    zombie("Wall-nut Zombie", 4, 3000),
    zombie("Jalapeno Zombie", 3, 1000),
    zombie("Gatling Pea Zombie", 3, 2000),
    zombie("Squash Zombie", 3, 2000),
    zombie("Tall-nut Zombie", 7, 2000),
    zombie("GigaGargantuar", 10, 6000),
];

pub const ZOMBIE_NORMAL: ZombieId = 0x00;
pub const ZOMBIE_FLAG: ZombieId = 0x01;
pub const ZOMBIE_FOOTBALL: ZombieId = 0x07;
pub const ZOMBIE_ZOMBONI: ZombieId = 0x0C;
pub const ZOMBIE_BALLOON: ZombieId = 0x10;
pub const ZOMBIE_DIGGER: ZombieId = 0x11;
pub const ZOMBIE_GARGANTUAR: ZombieId = 0x17;
pub const ZOMBIE_GIGA_GARGANTUAR: ZombieId = 0x20;

pub const STRONG_ZOMBIES: &[ZombieId] = &[0x04, 0x06, 0x07, 0x0C, 0x15, 0x17, 0x1F, 0x20];

/// Zombies that only make sense with water lanes (ducky, snorkel, bobsled, dolphin).
pub const WATER_ZOMBIES: &[ZombieId] = &[0x0A, 0x0B, 0x0D, 0x0E];

/// Zombies a randomised level pool may draw from. Normal zombies are
/// always added on top.
pub const RANDOM_POOL_CANDIDATES: &[ZombieId] = &[
    0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x10, 0x11, 0x12,
    0x13, 0x14, 0x15, 0x16, 0x17,
];

// Level numbers (1-based) taken from the vanilla adventure.
pub const BUCKETHEADS_PRESENT: &[u8] = &[
    0x08, 0x09, 0x0C, 0x0D, 0x0E, 0x11, 0x13, 0x16, 0x18, 0x1B, 0x1D, 0x25, 0x26, 0x27, 0x2A,
    0x2B, 0x2C, 0x2E, 0x2F, 0x31,
];
pub const PLAYABLE_NON_POT: &[u8] = &[
    0x02, 0x03, 0x04, 0x06, 0x07, 0x0B, 0x0D, 0x12, 0x13, 0x15, 0x17, 0x1C, 0x1F, 0x21, 0x22,
    0x29, 0x2B, 0x2E, 0x2F,
];
pub const FOOTBALLERS_PRESENT: &[u8] = &[
    0x10, 0x11, 0x16, 0x1A, 0x1B, 0x1D, 0x20, 0x2C, 0x2E, 0x2F, 0x30, 0x31,
];

pub const DEFAULT_FLAGS: [u32; 50] = [
    1, 1, 1, 1, 1, 1, 2, 1, 2, 2, //
    1, 2, 1, 2, 1, 1, 2, 1, 2, 2, //
    1, 2, 2, 3, 2, 2, 3, 2, 3, 3, //
    1, 2, 1, 2, 2, 1, 2, 1, 2, 2, //
    1, 2, 2, 3, 2, 2, 3, 2, 3, 3,
];

pub const WAVES_PER_FLAG: u32 = 10;
pub const MAX_WAVES: usize = 100;
pub const MAX_ZOMBIES_PER_WAVE: usize = 50;

const SHORT_LEVEL_WAVES: [u32; 5] = [4, 6, 8, 10, 8];

pub fn default_wave_count(level: Level) -> u32 {
    SHORT_LEVEL_WAVES
        .get(level.index())
        .copied()
        .unwrap_or(DEFAULT_FLAGS[level.index()] * WAVES_PER_FLAG)
}

/// Zombie pools of the unmodified adventure, indexed by level - 1.
pub const VANILLA_POOLS: [&[ZombieId]; 50] = [
    &[0x00],
    &[0x00, 0x02],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x04],
    &[0x00, 0x02, 0x03, 0x04],
    &[0x00, 0x02, 0x03],
    &[0x00, 0x02, 0x05],
    &[0x00, 0x02, 0x04, 0x05],
    &[0x00, 0x02, 0x04, 0x06],
    &[0x00, 0x02, 0x04, 0x05, 0x06],
    &[0x00, 0x02, 0x05],
    &[0x00, 0x02, 0x05, 0x07],
    &[0x00, 0x02, 0x04, 0x07, 0x08],
    &[0x00, 0x02, 0x05, 0x08],
    &[0x00, 0x02, 0x04, 0x06, 0x08],
    &[0x00, 0x02, 0x05, 0x06],
    &[0x00, 0x02, 0x0A],
    &[0x00, 0x02, 0x04, 0x07, 0x0A],
    &[0x00, 0x02, 0x0A, 0x0B],
    &[0x00, 0x02, 0x04, 0x0B, 0x0C],
    &[0x00, 0x02, 0x0A],
    &[0x00, 0x02, 0x07, 0x0C, 0x0D],
    &[0x00, 0x02, 0x04, 0x07, 0x0B, 0x0D],
    &[0x00, 0x02, 0x0A, 0x0E],
    &[0x00, 0x02, 0x04, 0x07, 0x0E],
    &[0x00, 0x02, 0x0A, 0x0B, 0x0C],
    &[0x00, 0x02, 0x0F],
    &[0x00, 0x02, 0x07, 0x0F, 0x10],
    &[0x00, 0x02, 0x10, 0x11],
    &[0x00, 0x02, 0x11, 0x12],
    &[0x00, 0x02, 0x10],
    &[0x00, 0x02, 0x12, 0x14],
    &[0x00, 0x02, 0x04, 0x10, 0x14],
    &[0x00, 0x02, 0x04, 0x11, 0x15],
    &[0x00, 0x02, 0x04, 0x0F, 0x12, 0x15],
    &[0x00, 0x02, 0x10, 0x11, 0x14],
    &[0x00, 0x02, 0x14],
    &[0x00, 0x02, 0x04, 0x14, 0x16],
    &[0x00, 0x02, 0x04, 0x15, 0x16],
    &[0x00, 0x02, 0x04, 0x07, 0x17],
    &[0x00, 0x02, 0x14, 0x16],
    &[0x00, 0x02, 0x04, 0x07, 0x10, 0x17],
    &[0x00, 0x02, 0x04, 0x07, 0x15, 0x16, 0x17],
    &[0x00, 0x02, 0x07, 0x14, 0x17],
    &[0x00, 0x02, 0x04, 0x07, 0x10, 0x16, 0x17],
    &[0x00, 0x02, 0x14, 0x17],
];

// Plant classes used when judging whether a seed is playable.
pub const PLANT_LILY_PAD: PlantId = 0x10;
pub const PLANT_FLOWER_POT: PlantId = 0x21;
pub const PLANT_COFFEE_BEAN: PlantId = 0x23;

pub const DAY_ATTACKERS: &[PlantId] = &[0x00, 0x05, 0x07, 0x12, 0x1A, 0x1C, 0x1D, 0x20, 0x22, 0x27];
pub const MUSHROOM_ATTACKERS: &[PlantId] = &[0x08, 0x0A, 0x0D, 0x18];
pub const MUSHROOMS: &[PlantId] = &[0x08, 0x09, 0x0A, 0x0C, 0x0D, 0x0E, 0x0F, 0x18, 0x1F, 0x2A];
pub const INSTANT_KILLS: &[PlantId] = &[0x02, 0x04, 0x0F, 0x11, 0x14];
pub const LOBBERS: &[PlantId] = &[0x20, 0x22, 0x27];
pub const ANTI_AIR: &[PlantId] = &[0x1A, 0x1B];

pub fn plant_name(id: PlantId) -> &'static str {
    PLANTS.get(usize::from(id)).map_or("Unknown plant", |p| p.name)
}

pub fn zombie_name(id: ZombieId) -> &'static str {
    ZOMBIES.get(usize::from(id)).map_or("Unknown zombie", |z| z.name)
}

pub fn is_mushroom(id: PlantId) -> bool {
    MUSHROOMS.contains(&id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wave_counts_match_flags() {
        let counts: Vec<u32> = Level::all().map(default_wave_count).collect();
        assert_eq!(&counts[..5], &[4, 6, 8, 10, 8]);
        assert_eq!(counts[6], 20); // 1-7
        assert_eq!(counts[10], 10); // 2-1
        assert_eq!(counts[49], 30); // 5-10
    }

    #[test]
    fn vanilla_pools_agree_with_presence_tables() {
        for level in Level::all() {
            let pool = VANILLA_POOLS[level.index()];
            assert_eq!(
                pool.contains(&0x04),
                BUCKETHEADS_PRESENT.contains(&level.number()),
                "buckethead mismatch on {level}"
            );
            assert_eq!(
                pool.contains(&ZOMBIE_FOOTBALL),
                FOOTBALLERS_PRESENT.contains(&level.number()),
                "football mismatch on {level}"
            );
        }
    }

    #[test]
    fn water_zombies_stay_in_water_worlds() {
        for level in Level::all() {
            if !level.world().has_water() {
                let pool = VANILLA_POOLS[level.index()];
                assert!(pool.iter().all(|z| !WATER_ZOMBIES.contains(z)), "{level}");
            }
        }
    }

    #[test]
    fn mushrooms_are_the_sleeping_plants() {
        for id in MUSHROOMS {
            assert!(plant_name(*id).ends_with("shroom"), "{}", plant_name(*id));
        }
        assert!(!is_mushroom(0x0B)); // Grave Buster
        assert!(is_mushroom(0x0F));
    }

    #[test]
    fn names_fall_back_for_unknown_ids() {
        assert_eq!(plant_name(0), "Peashooter");
        assert_eq!(zombie_name(ZOMBIE_GARGANTUAR), "Gargantuar");
        assert_eq!(plant_name(200), "Unknown plant");
    }
}
