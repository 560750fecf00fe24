//! Helpers shared by unit and integration tests.

use std::sync::Arc;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::catalog::{BuildingKind, Catalog, ResourceKind, WeaponKind};
use crate::model::{GameTime, Player, World};
use crate::sim::{GameSystem, TickContext};

// ---------------------------------------------------------------------------
// Randomness
// ---------------------------------------------------------------------------

/// An `RngCore` that returns the same word forever.
///
/// `FixedRng::low()` makes every percentage roll with a non-zero chance
/// succeed and every uniform draw return its lower bound. `FixedRng::high()`
/// makes every roll below 100% fail and uniform draws land on the upper bound.
#[derive(Debug, Clone, Copy)]
pub struct FixedRng(u64);

impl FixedRng {
    pub fn low() -> Self {
        Self(0)
    }

    pub fn high() -> Self {
        Self(u64::MAX)
    }
}

impl RngCore for FixedRng {
    fn next_u32(&mut self) -> u32 {
        self.0 as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.0
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        dst.fill(self.0 as u8);
    }
}

pub fn minutes(n: u64) -> GameTime {
    GameTime::from_minutes(n)
}

pub fn hours(n: u64) -> GameTime {
    GameTime::from_hours(n)
}

// ---------------------------------------------------------------------------
// World builders
// ---------------------------------------------------------------------------

/// A world over the builtin catalog with shortcuts for seeding ledgers.
///
/// Seeding writes rows directly and bypasses costs, so tests can start from
/// any position without replaying a build order.
pub struct TestWorld {
    pub world: World,
}

impl TestWorld {
    pub fn new() -> Self {
        let catalog = Catalog::builtin().expect("builtin catalog");
        Self {
            world: World::new(Arc::new(catalog)),
        }
    }

    /// Add a player holding `country` with the starting ledger; returns the id.
    pub fn player(&mut self, country: &str) -> u64 {
        let id = self.world.next_id();
        let player = Player::new(
            id,
            country.to_uppercase(),
            country.to_string(),
            self.world.catalog.starting(),
            GameTime::EPOCH,
        );
        self.world.players.insert(id, player);
        id
    }

    fn row(&mut self, id: u64) -> &mut Player {
        self.world.players.get_mut(&id).expect("seeded player")
    }

    pub fn set_money(&mut self, id: u64, money: u64) {
        self.row(id).money = money;
    }

    pub fn set_soldiers(&mut self, id: u64, soldiers: u64) {
        self.row(id).soldiers = soldiers;
    }

    pub fn give_resource(&mut self, id: u64, kind: ResourceKind, amount: u64) {
        self.row(id).resources.add(kind, amount).expect("seed resource");
    }

    pub fn give_building(&mut self, id: u64, kind: BuildingKind, count: u64) {
        self.row(id).buildings.add(kind, count).expect("seed building");
    }

    pub fn give_weapon(&mut self, id: u64, kind: WeaponKind, count: u64) {
        self.row(id).weapons.add(kind, count).expect("seed weapon");
    }

    pub fn player_row(&self, id: u64) -> &Player {
        self.world.player(id).expect("seeded player")
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tick execution helpers
// ---------------------------------------------------------------------------

/// Run a single system tick at `time` with a seeded RNG.
pub fn tick_system(world: &mut World, system: &mut dyn GameSystem, time: GameTime, seed: u64) {
    let mut rng = SmallRng::seed_from_u64(seed);
    tick_system_with(world, system, time, &mut rng);
}

/// Run a single system tick at `time` with a caller-supplied random source.
pub fn tick_system_with(
    world: &mut World,
    system: &mut dyn GameSystem,
    time: GameTime,
    rng: &mut dyn RngCore,
) {
    world.current_time = time;
    let mut ctx = TickContext {
        world,
        rng,
        now: time,
    };
    system.tick(&mut ctx);
}
