use std::io;
use std::path::PathBuf;

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use super::context::TickContext;
use super::system::{GameSystem, TickFrequency};
use crate::flush::flush_to_jsonl;
use crate::model::{GameTime, World};

/// Configuration for a simulated run of the periodic jobs.
pub struct RunConfig {
    pub start: GameTime,
    /// Exclusive.
    pub end: GameTime,
    pub seed: u64,
    /// If set, flush world state every N hours of game time.
    pub flush_interval_hours: Option<u64>,
    /// Directory to write flush checkpoints into.
    pub output_dir: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(start: GameTime, end: GameTime, seed: u64) -> Self {
        Self {
            start,
            end,
            seed,
            flush_interval_hours: None,
            output_dir: None,
        }
    }
}

/// Returns true if a system with the given frequency should fire at this time.
pub fn should_fire(freq: TickFrequency, time: GameTime) -> bool {
    time.minutes() % freq.interval_minutes() == 0
}

/// Set `world.current_time` and call each system whose frequency matches,
/// in registration order.
pub fn dispatch_systems(
    world: &mut World,
    systems: &mut [Box<dyn GameSystem>],
    rng: &mut dyn RngCore,
    time: GameTime,
) {
    world.current_time = time;
    for system in systems.iter_mut() {
        if should_fire(system.frequency(), time) {
            let mut ctx = TickContext {
                world,
                rng,
                now: time,
            };
            system.tick(&mut ctx);
        }
    }
}

/// Drive the systems over `[config.start, config.end)`.
///
/// Creates a deterministic RNG from `config.seed`, so the same seed always
/// produces the same run. The loop steps at the finest granularity needed by
/// any registered system, so a run of only six-hourly systems does not visit
/// every minute.
pub fn run(
    world: &mut World,
    systems: &mut [Box<dyn GameSystem>],
    config: RunConfig,
) -> io::Result<()> {
    let Some(finest) = systems.iter().map(|s| s.frequency()).max() else {
        return Ok(());
    };
    if config.end <= config.start {
        return Ok(());
    }

    let mut rng = SmallRng::seed_from_u64(config.seed);
    let step = finest.interval_minutes();
    let start = config.start.minutes();
    let end = config.end.minutes();
    let flush_every = config.flush_interval_hours.map(|h| h.max(1) * 60);

    let mut minute = start.div_ceil(step) * step;
    while minute < end {
        let time = GameTime::from_minutes(minute);
        dispatch_systems(world, systems, &mut rng, time);

        // Flush checkpoint at configured interval and after the last tick
        if let (Some(interval), Some(dir)) = (flush_every, &config.output_dir) {
            let elapsed = minute - start;
            let is_last = minute + step >= end;
            if is_last || (elapsed > 0 && elapsed % interval == 0) {
                flush_to_jsonl(world, &dir.join(format!("minute_{minute:08}")))?;
            }
        }
        minute += step;
    }
    Ok(())
}
