mod context;
mod runner;
mod system;
mod systems;

pub use context::TickContext;
pub use runner::{RunConfig, dispatch_systems, run, should_fire};
pub use system::{GameSystem, TickFrequency};
pub use systems::{IncomeSystem, SweepSystem, game_systems};
