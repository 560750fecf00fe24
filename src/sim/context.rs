use rand::RngCore;

use crate::model::{GameTime, World};

/// Context passed to each system on every tick.
///
/// Bundled so we can add fields later without changing the `GameSystem`
/// trait signature.
pub struct TickContext<'a> {
    pub world: &'a mut World,
    pub rng: &'a mut dyn RngCore,
    pub now: GameTime,
}
