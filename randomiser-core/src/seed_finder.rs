//! Offline brute-force search for seeds whose plan is beatable.
//!
//! Each candidate seed is regenerated with [`Plan::generate`] and checked
//! against a fixed list of predicates. The first failing predicate decides
//! the seed's [`Outcome`]; codes are stable so histograms stay comparable
//! between runs.

use std::ops::RangeInclusive;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::{
    is_mushroom, PlantId, ZombieId, ANTI_AIR, BUCKETHEADS_PRESENT, DAY_ATTACKERS, FOOTBALLERS_PRESENT, INSTANT_KILLS,
    LOBBERS, MUSHROOMS, MUSHROOM_ATTACKERS, PLANT_COFFEE_BEAN, PLANT_FLOWER_POT, PLAYABLE_NON_POT,
    STRONG_ZOMBIES, ZOMBIE_BALLOON, ZOMBIE_FOOTBALL, ZOMBIE_GARGANTUAR, ZOMBIE_GIGA_GARGANTUAR,
    ZOMBIE_ZOMBONI,
};
use crate::level::{Level, World};
use crate::plan::{LevelPlan, Plan};
use crate::waves::simulate_level;
use crate::RandomiserSettings;

pub const FAILURES_COUNT: usize = 0x0D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Outcome {
    Success = 0x00,
    GoodPlants = 0x01,
    PoolOne = 0x02,
    PoolTwo = 0x03,
    PoolThree = 0x04,
    PoolFour = 0x05,
    RoofOne = 0x06,
    PotTwo = 0x07,
    Gargs = 0x08,
    BalloonOne = 0x09,
    BalloonTwo = 0x0A,
    Shrooms = 0x0B,
    Insta = 0x0C,
}

impl Outcome {
    pub const ALL: [Outcome; FAILURES_COUNT] = [
        Outcome::Success,
        Outcome::GoodPlants,
        Outcome::PoolOne,
        Outcome::PoolTwo,
        Outcome::PoolThree,
        Outcome::PoolFour,
        Outcome::RoofOne,
        Outcome::PotTwo,
        Outcome::Gargs,
        Outcome::BalloonOne,
        Outcome::BalloonTwo,
        Outcome::Shrooms,
        Outcome::Insta,
    ];

    const POOL: [Outcome; 4] = [
        Outcome::PoolOne,
        Outcome::PoolTwo,
        Outcome::PoolThree,
        Outcome::PoolFour,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn description(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::GoodPlants => "too few attackers for strong zombies",
            Outcome::PoolOne => "too few plants for the first pool level",
            Outcome::PoolTwo => "too few plants for the second pool level",
            Outcome::PoolThree => "too few plants for the third pool level",
            Outcome::PoolFour => "too few plants for the fourth pool level",
            Outcome::RoofOne => "no lobber for the first roof level",
            Outcome::PotTwo => "no flower pot for later roof levels",
            Outcome::Gargs => "too few instant kills for gargantuars",
            Outcome::BalloonOne => "no anti-air for balloons",
            Outcome::BalloonTwo => "no anti-air and pot for roof balloons",
            Outcome::Shrooms => "no usable attacker in daytime",
            Outcome::Insta => "no instant kill for footballs or zombonis",
        }
    }
}

/// Which checks run and how strict they are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedCriteria {
    pub good_plants: bool,
    pub min_good_plants: u32,
    pub pool: bool,
    pub pool_thresholds: [u32; 4],
    pub roof: bool,
    pub gargs: bool,
    pub garg_insta_kills: u32,
    pub balloons: bool,
    pub shrooms: bool,
    pub insta: bool,
}

impl Default for SeedCriteria {
    fn default() -> Self {
        Self {
            good_plants: true,
            min_good_plants: 2,
            pool: true,
            pool_thresholds: [3, 4, 5, 6],
            roof: true,
            gargs: true,
            garg_insta_kills: 2,
            balloons: true,
            shrooms: true,
            insta: true,
        }
    }
}

impl SeedCriteria {
    /// Criteria every seed passes.
    pub fn none() -> Self {
        Self {
            good_plants: false,
            pool: false,
            roof: false,
            gargs: false,
            balloons: false,
            shrooms: false,
            insta: false,
            ..Self::default()
        }
    }
}

/// Plants owned, one bit per plant id.
#[derive(Clone, Copy)]
struct Owned(u64);

impl Owned {
    fn new(plants: &[PlantId]) -> Self {
        Owned(plants.iter().fold(0, |mask, p| mask | 1u64 << p))
    }

    fn has(self, plant: PlantId) -> bool {
        self.0 & (1u64 << plant) != 0
    }

    fn count(self, plants: &[PlantId]) -> u32 {
        plants.iter().filter(|p| self.has(**p)).count() as u32
    }

    fn any(self, plants: &[PlantId]) -> bool {
        plants.iter().any(|p| self.has(*p))
    }

    /// Mushrooms sleep in daylight unless coffee is at hand.
    fn shrooms_awake(self, world: World) -> bool {
        !world.is_daytime() || self.has(PLANT_COFFEE_BEAN)
    }

    /// Attackers that work in `world`.
    fn attackers(self, world: World) -> u32 {
        let shrooms = self.count(MUSHROOM_ATTACKERS);
        self.count(DAY_ATTACKERS) + if self.shrooms_awake(world) { shrooms } else { 0 }
    }

    /// Instant kills that work in `world`.
    fn instant_kills(self, world: World) -> u32 {
        let awake = self.shrooms_awake(world);
        INSTANT_KILLS
            .iter()
            .filter(|p| self.has(**p) && (awake || !is_mushroom(**p)))
            .count() as u32
    }

    /// Plants usable at all in daylight.
    fn daytime_usable(self) -> u32 {
        let all = self.0.count_ones();
        if self.has(PLANT_COFFEE_BEAN) {
            all
        } else {
            all - self.count(MUSHROOMS)
        }
    }
}

fn is_gargantuar(zombie: &ZombieId) -> bool {
    *zombie == ZOMBIE_GARGANTUAR || *zombie == ZOMBIE_GIGA_GARGANTUAR
}

/// Whether gargantuars can show up in the live game. Levels the plan leaves
/// alone are spawned by the game from their pool, the rest from the
/// simulated waves that get written.
fn spawns_gargantuars(plan: &Plan, lp: &LevelPlan) -> bool {
    if plan.rewrites_waves(lp.level) {
        simulate_level(plan, lp.level).iter().flatten().any(is_gargantuar)
    } else {
        lp.zombies.iter().any(is_gargantuar)
    }
}

fn has_strong_zombies(plan: &Plan, lp: &LevelPlan) -> bool {
    if plan.random_zombies {
        lp.zombies.iter().any(|z| STRONG_ZOMBIES.contains(z))
    } else {
        let n = lp.level.number();
        BUCKETHEADS_PRESENT.contains(&n) || FOOTBALLERS_PRESENT.contains(&n)
    }
}

/// Check an already generated plan.
pub fn classify_plan(plan: &Plan, criteria: &SeedCriteria) -> Outcome {
    let owned: Vec<Owned> = Level::all()
        .map(|level| Owned::new(&plan.owned_plants(level)))
        .collect();
    let at = |lp: &LevelPlan| owned[lp.level.index()];

    if criteria.good_plants
        && plan
            .levels
            .iter()
            .filter(|lp| has_strong_zombies(plan, lp))
            .any(|lp| at(lp).attackers(lp.world) < criteria.min_good_plants)
    {
        return Outcome::GoodPlants;
    }

    if criteria.pool {
        let pools = plan.levels.iter().filter(|lp| lp.world == World::Pool);
        for ((lp, threshold), outcome) in pools.zip(criteria.pool_thresholds).zip(Outcome::POOL) {
            if at(lp).daytime_usable() < threshold {
                return outcome;
            }
        }
    }

    if criteria.roof {
        let mut roofs = plan.levels.iter().filter(|lp| lp.world == World::Roof);
        if let Some(first) = roofs.next() {
            if !at(first).any(LOBBERS) {
                return Outcome::RoofOne;
            }
        }
        if roofs
            .filter(|lp| !PLAYABLE_NON_POT.contains(&lp.level.number()))
            .any(|lp| !at(lp).has(PLANT_FLOWER_POT))
        {
            return Outcome::PotTwo;
        }
    }

    if criteria.gargs {
        let failed = plan.levels.iter().any(|lp| {
            at(lp).instant_kills(lp.world) < criteria.garg_insta_kills
                && spawns_gargantuars(plan, lp)
        });
        if failed {
            return Outcome::Gargs;
        }
    }

    if criteria.balloons {
        let balloon_levels = || {
            plan.levels
                .iter()
                .filter(|lp| lp.zombies.contains(&ZOMBIE_BALLOON))
        };
        if balloon_levels()
            .filter(|lp| lp.world != World::Roof)
            .any(|lp| !at(lp).any(ANTI_AIR))
        {
            return Outcome::BalloonOne;
        }
        if balloon_levels()
            .filter(|lp| lp.world == World::Roof)
            .any(|lp| !(at(lp).any(ANTI_AIR) && at(lp).has(PLANT_FLOWER_POT)))
        {
            return Outcome::BalloonTwo;
        }
    }

    if criteria.shrooms
        && plan.levels.iter().filter(|lp| lp.world.is_daytime()).any(|lp| {
            let o = at(lp);
            !(o.any(DAY_ATTACKERS) || (o.has(PLANT_COFFEE_BEAN) && o.any(MUSHROOM_ATTACKERS)))
        })
    {
        return Outcome::Shrooms;
    }

    if criteria.insta
        && plan
            .levels
            .iter()
            .filter(|lp| {
                lp.zombies
                    .iter()
                    .any(|z| *z == ZOMBIE_FOOTBALL || *z == ZOMBIE_ZOMBONI)
            })
            .any(|lp| at(lp).instant_kills(lp.world) == 0)
    {
        return Outcome::Insta;
    }

    Outcome::Success
}

/// Regenerate the plan for `seed` and check it.
pub fn classify(seed: u32, settings: &RandomiserSettings, criteria: &SeedCriteria) -> Outcome {
    let plan = Plan::generate(&RandomiserSettings {
        seed,
        ..settings.clone()
    });
    classify_plan(&plan, criteria)
}

#[derive(Debug, Clone)]
pub struct SearchReport {
    /// Passing seeds in ascending order.
    pub found: Vec<u32>,
    pub histogram: [u64; FAILURES_COUNT],
    pub tried: u64,
    pub elapsed: Duration,
}

impl SearchReport {
    pub fn count(&self, outcome: Outcome) -> u64 {
        self.histogram[usize::from(outcome.code())]
    }
}

struct WorkerResult {
    found: Vec<u32>,
    histogram: [u64; FAILURES_COUNT],
    tried: u64,
}

fn search_chunk(
    seeds: RangeInclusive<u32>,
    settings: &RandomiserSettings,
    criteria: &SeedCriteria,
    limit: Option<usize>,
) -> WorkerResult {
    let mut result = WorkerResult {
        found: Vec::new(),
        histogram: [0; FAILURES_COUNT],
        tried: 0,
    };

    for seed in seeds {
        let outcome = classify(seed, settings, criteria);
        result.histogram[usize::from(outcome.code())] += 1;
        result.tried += 1;
        if outcome == Outcome::Success {
            result.found.push(seed);
            if limit.is_some_and(|l| result.found.len() >= l) {
                break;
            }
        }
    }

    result
}

/// Split `seeds` into one contiguous chunk per worker and classify them in
/// parallel. Each worker stops after `limit` passing seeds, so the report
/// holds the lowest passing seeds of the range.
pub fn search(
    settings: &RandomiserSettings,
    criteria: &SeedCriteria,
    seeds: RangeInclusive<u32>,
    workers: Option<usize>,
    limit: Option<usize>,
) -> SearchReport {
    let start = Instant::now();
    let mut report = SearchReport {
        found: Vec::new(),
        histogram: [0; FAILURES_COUNT],
        tried: 0,
        elapsed: Duration::ZERO,
    };
    if seeds.is_empty() {
        return report;
    }

    let workers = workers
        .or_else(|| thread::available_parallelism().ok().map(|n| n.get()))
        .unwrap_or(1)
        .max(1) as u64;
    let (first, last) = (u64::from(*seeds.start()), u64::from(*seeds.end()));
    let chunk = (last - first + 1).div_ceil(workers);
    info!(first, last, workers, "searching seeds");

    let results: Vec<WorkerResult> = thread::scope(|scope| {
        let (tx, rx) = mpsc::channel();
        for worker in 0..workers {
            let lo = first + worker * chunk;
            if lo > last {
                break;
            }
            let hi = (lo + chunk - 1).min(last);
            let tx = tx.clone();
            scope.spawn(move || {
                let result = search_chunk(lo as u32..=hi as u32, settings, criteria, limit);
                debug!(worker, lo, hi, found = result.found.len(), "worker finished");
                let _ = tx.send(result);
            });
        }
        drop(tx);
        rx.iter().collect()
    });

    for result in results {
        report.found.extend(result.found);
        report.tried += result.tried;
        for (total, n) in report.histogram.iter_mut().zip(result.histogram) {
            *total += n;
        }
    }
    report.found.sort_unstable();
    if let Some(limit) = limit {
        report.found.truncate(limit);
    }
    report.elapsed = start.elapsed();

    info!(
        tried = report.tried,
        found = report.found.len(),
        elapsed_ms = report.elapsed.as_millis() as u64,
        "seed search finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_codes_are_stable() {
        for (i, outcome) in Outcome::ALL.iter().enumerate() {
            assert_eq!(usize::from(outcome.code()), i);
        }
        assert_eq!(Outcome::Insta.code(), 0x0C);
        assert_eq!(FAILURES_COUNT, 0x0D);
    }

    #[test]
    fn disabled_checks_always_pass() {
        let mut settings = RandomiserSettings::vanilla();
        settings.apply_no_restrictions();
        for seed in 1..20 {
            assert_eq!(classify(seed, &settings, &SeedCriteria::none()), Outcome::Success);
        }
    }

    #[test]
    fn good_plants_is_checked_first() {
        let criteria = SeedCriteria {
            min_good_plants: 100,
            pool_thresholds: [100; 4],
            ..SeedCriteria::default()
        };
        assert_eq!(
            classify(1, &RandomiserSettings::vanilla(), &criteria),
            Outcome::GoodPlants
        );
    }

    #[test]
    fn pool_thresholds_map_to_pool_codes() {
        let criteria = SeedCriteria {
            pool: true,
            pool_thresholds: [0, 0, 100, 0],
            ..SeedCriteria::none()
        };
        assert_eq!(
            classify(1, &RandomiserSettings::vanilla(), &criteria),
            Outcome::PoolThree
        );
    }

    #[test]
    fn first_roof_level_needs_a_lobber() {
        let mut plan = Plan::generate(&RandomiserSettings::vanilla());
        let roof_only = SeedCriteria {
            roof: true,
            ..SeedCriteria::none()
        };
        assert_eq!(classify_plan(&plan, &roof_only), Outcome::Success);

        let (mut order, lobbers): (Vec<PlantId>, Vec<PlantId>) =
            plan.plant_order.iter().copied().partition(|p| !LOBBERS.contains(p));
        order.extend(lobbers);
        plan.plant_order = order;
        assert_eq!(classify_plan(&plan, &roof_only), Outcome::RoofOne);
    }

    #[test]
    fn later_roof_levels_need_a_pot() {
        let mut plan = Plan::generate(&RandomiserSettings::vanilla());
        plan.plant_order.retain(|p| *p != PLANT_FLOWER_POT);
        plan.plant_order.push(PLANT_FLOWER_POT);
        let roof_only = SeedCriteria {
            roof: true,
            ..SeedCriteria::none()
        };
        assert_eq!(classify_plan(&plan, &roof_only), Outcome::PotTwo);
    }

    #[test]
    fn daytime_needs_something_awake() {
        let mut plan = Plan::generate(&RandomiserSettings::vanilla());
        // Start with a puff-shroom on a day level.
        plan.plant_order.retain(|p| *p != 8);
        plan.plant_order.insert(0, 8);
        let shrooms_only = SeedCriteria {
            shrooms: true,
            ..SeedCriteria::none()
        };
        assert_eq!(classify_plan(&plan, &shrooms_only), Outcome::Shrooms);
    }

    fn vanilla_plan_without(zombies: &[ZombieId]) -> Plan {
        let mut plan = Plan::generate(&RandomiserSettings::vanilla());
        for lp in &mut plan.levels {
            lp.zombies.retain(|z| !zombies.contains(z));
        }
        plan
    }

    fn only(check: impl FnOnce(&mut SeedCriteria)) -> SeedCriteria {
        let mut criteria = SeedCriteria::none();
        check(&mut criteria);
        criteria
    }

    #[test]
    fn grave_buster_counts_in_daylight() {
        // Peashooter and Grave Buster, no coffee.
        assert_eq!(Owned::new(&[0x00, 0x0B]).daytime_usable(), 2);
        // Puff-shroom sleeps without coffee.
        assert_eq!(Owned::new(&[0x00, 0x08]).daytime_usable(), 1);
        assert_eq!(Owned::new(&[0x00, 0x08, PLANT_COFFEE_BEAN]).daytime_usable(), 3);
    }

    #[test]
    fn doom_shroom_needs_night_or_coffee() {
        let doom = Owned::new(&[0x0F, 0x02]);
        assert_eq!(doom.instant_kills(World::Day), 1);
        assert_eq!(doom.instant_kills(World::Fog), 2);
        assert_eq!(Owned::new(&[0x0F, 0x02, PLANT_COFFEE_BEAN]).instant_kills(World::Roof), 2);
    }

    #[test]
    fn untouched_levels_use_their_pool_for_gargantuars() {
        let plan = Plan::generate(&RandomiserSettings::vanilla());
        for lp in &plan.levels {
            if lp.zombies.contains(&ZOMBIE_GARGANTUAR) {
                assert!(spawns_gargantuars(&plan, lp), "{}", lp.level);
            }
        }
    }

    #[test]
    fn gargantuars_need_instant_kills() {
        let gargs = only(|c| c.gargs = true);
        let mut plan = vanilla_plan_without(&[ZOMBIE_GARGANTUAR, ZOMBIE_GIGA_GARGANTUAR]);
        assert_eq!(classify_plan(&plan, &gargs), Outcome::Success);

        // 1-2 owns Peashooter and Sunflower only.
        plan.levels[1].zombies.push(ZOMBIE_GARGANTUAR);
        assert_eq!(classify_plan(&plan, &gargs), Outcome::Gargs);
    }

    #[test]
    fn balloons_off_the_roof_need_anti_air() {
        let balloons = only(|c| c.balloons = true);
        let mut plan = vanilla_plan_without(&[ZOMBIE_BALLOON]);
        assert_eq!(classify_plan(&plan, &balloons), Outcome::Success);

        plan.levels[1].zombies.push(ZOMBIE_BALLOON);
        assert_eq!(classify_plan(&plan, &balloons), Outcome::BalloonOne);
    }

    #[test]
    fn roof_balloons_need_anti_air_and_a_pot() {
        let balloons = only(|c| c.balloons = true);
        let mut plan = vanilla_plan_without(&[ZOMBIE_BALLOON]);
        let level = Level::new(45).unwrap();
        assert_eq!(plan.level(level).world, World::Roof);
        plan.levels[level.index()].zombies.push(ZOMBIE_BALLOON);
        assert_eq!(classify_plan(&plan, &balloons), Outcome::Success);

        plan.plant_order.retain(|p| *p != PLANT_FLOWER_POT);
        plan.plant_order.push(PLANT_FLOWER_POT);
        assert_eq!(classify_plan(&plan, &balloons), Outcome::BalloonTwo);
    }

    #[test]
    fn footballs_need_an_instant_kill() {
        let insta = only(|c| c.insta = true);
        let mut plan = vanilla_plan_without(&[ZOMBIE_FOOTBALL, ZOMBIE_ZOMBONI]);
        assert_eq!(classify_plan(&plan, &insta), Outcome::Success);

        plan.levels[1].zombies.push(ZOMBIE_FOOTBALL);
        assert_eq!(classify_plan(&plan, &insta), Outcome::Insta);
    }

    #[test]
    fn sleeping_doom_shroom_is_no_answer_to_zombonis() {
        let insta = only(|c| c.insta = true);
        let mut plan = vanilla_plan_without(&[ZOMBIE_FOOTBALL, ZOMBIE_ZOMBONI]);
        // Doom-shroom is the only instant kill, and 1-3 is a day level.
        plan.plant_order.retain(|p| !INSTANT_KILLS.contains(p));
        plan.plant_order.insert(1, 0x0F);
        plan.levels[2].zombies.push(ZOMBIE_ZOMBONI);
        assert_eq!(classify_plan(&plan, &insta), Outcome::Insta);

        plan.levels[2].world = World::Night;
        assert_eq!(classify_plan(&plan, &insta), Outcome::Success);
    }

    #[test]
    fn search_returns_lowest_seeds_first() {
        let settings = RandomiserSettings::vanilla();
        let report = search(&settings, &SeedCriteria::none(), 1..=200, Some(4), Some(10));
        assert_eq!(report.found, (1..=10).collect::<Vec<u32>>());
        // Every worker stops after its tenth hit.
        assert_eq!(report.tried, 40);
        assert_eq!(report.count(Outcome::Success), 40);
        assert_eq!(report.histogram.iter().sum::<u64>(), report.tried);
    }

    #[test]
    fn search_counts_every_failure() {
        let criteria = SeedCriteria {
            min_good_plants: 100,
            ..SeedCriteria::default()
        };
        let report = search(&RandomiserSettings::vanilla(), &criteria, 10..=59, Some(3), None);
        assert!(report.found.is_empty());
        assert_eq!(report.tried, 50);
        assert_eq!(report.count(Outcome::GoodPlants), 50);
    }

    #[test]
    fn empty_range_searches_nothing() {
        #[allow(clippy::reversed_empty_ranges)]
        let report = search(
            &RandomiserSettings::vanilla(),
            &SeedCriteria::default(),
            5..=4,
            Some(2),
            None,
        );
        assert_eq!(report.tried, 0);
    }
}
