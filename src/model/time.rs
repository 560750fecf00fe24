use std::fmt;

use serde::{Deserialize, Serialize};

pub const MINUTES_PER_HOUR: u64 = 60;
pub const HOURS_PER_DAY: u64 = 24;
pub const MINUTES_PER_DAY: u64 = MINUTES_PER_HOUR * HOURS_PER_DAY;

/// Game clock: whole minutes since the game epoch.
///
/// Natural `u64` ordering equals chronological ordering. Every delayed effect
/// (convoy arrival, scheduled attack, next income cycle) is stored as one of
/// these so a sweep can compare it against "now" without timers.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GameTime(u64);

impl GameTime {
    pub const EPOCH: GameTime = GameTime(0);

    pub const fn from_minutes(minutes: u64) -> Self {
        Self(minutes)
    }

    pub const fn from_hours(hours: u64) -> Self {
        Self(hours * MINUTES_PER_HOUR)
    }

    pub const fn minutes(self) -> u64 {
        self.0
    }

    pub fn plus_minutes(self, minutes: u64) -> Self {
        Self(self.0.saturating_add(minutes))
    }

    /// Minutes elapsed since `earlier`; zero if `earlier` is in the future.
    pub fn minutes_since(self, earlier: GameTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn day(self) -> u64 {
        self.0 / MINUTES_PER_DAY
    }

    pub fn hour(self) -> u64 {
        (self.0 % MINUTES_PER_DAY) / MINUTES_PER_HOUR
    }

    pub fn minute(self) -> u64 {
        self.0 % MINUTES_PER_HOUR
    }
}

impl fmt::Display for GameTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D{}.{:02}:{:02}", self.day(), self.hour(), self.minute())
    }
}
