use rand::distributions::{Distribution, WeightedIndex};
use rand::{rngs::StdRng, SeedableRng};

use crate::data::{ZombieId, MAX_ZOMBIES_PER_WAVE, WAVES_PER_FLAG, ZOMBIE_FLAG};
use crate::level::Level;
use crate::plan::Plan;

const WAVE_SALT: u64 = 0x5741_5645;

pub fn is_flag_wave(wave: usize, wave_count: usize) -> bool {
    (wave + 1) % WAVES_PER_FLAG as usize == 0 || wave + 1 == wave_count
}

/// Points the spawner may spend on wave `wave` (0-based).
pub fn wave_budget(wave: usize, flag: bool) -> u32 {
    let base = wave as u32 * 4 / 5 + 1;
    if flag {
        base * 5 / 2
    } else {
        base
    }
}

fn pick_wave(rng: &mut StdRng, plan: &Plan, pool: &[ZombieId], budget: u32, flag: bool) -> Vec<ZombieId> {
    let mut wave = Vec::new();
    if flag {
        wave.push(ZOMBIE_FLAG);
    }

    let mut remaining = budget;
    while remaining > 0 && wave.len() < MAX_ZOMBIES_PER_WAVE {
        let candidates: Vec<(ZombieId, u32, u32)> = pool
            .iter()
            .map(|&z| (z, plan.wave_points[usize::from(z)], plan.weights[usize::from(z)]))
            .filter(|&(_, points, weight)| points > 0 && points <= remaining && weight > 0)
            .collect();

        let Ok(dist) = WeightedIndex::new(candidates.iter().map(|c| c.2)) else {
            break;
        };
        let (zombie, points, _) = candidates[dist.sample(rng)];
        remaining -= points;
        wave.push(zombie);
    }

    wave
}

/// Replay the spawner for one level. The result only depends on the
/// plan's seed and the level, so the live game and the seed finder see
/// the same waves.
pub fn simulate_level(plan: &Plan, level: Level) -> Vec<Vec<ZombieId>> {
    let lp = plan.level(level);
    let mut rng =
        StdRng::seed_from_u64(u64::from(plan.seed) ^ WAVE_SALT ^ (u64::from(level.number()) << 32));
    let wave_count = lp.wave_count as usize;

    (0..wave_count)
        .map(|wave| {
            let flag = is_flag_wave(wave, wave_count);
            pick_wave(&mut rng, plan, &lp.zombies, wave_budget(wave, flag), flag)
        })
        .collect()
}
