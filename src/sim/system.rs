use super::context::TickContext;

/// How often a game system should tick.
///
/// Ordered coarsest-to-finest so `systems.iter().map(|s| s.frequency()).max()`
/// yields the finest granularity needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TickFrequency {
    SixHourly,   // 4 ticks/day
    EveryMinute, // 1,440 ticks/day
}

impl TickFrequency {
    /// Minutes between two ticks.
    pub fn interval_minutes(self) -> u64 {
        match self {
            TickFrequency::SixHourly => 6 * 60,
            TickFrequency::EveryMinute => 1,
        }
    }
}

/// A periodic job driven by the runner.
///
/// Object-safe so systems can be stored as `Box<dyn GameSystem>`.
pub trait GameSystem {
    fn name(&self) -> &str;
    fn frequency(&self) -> TickFrequency;
    fn tick(&mut self, ctx: &mut TickContext);
}
