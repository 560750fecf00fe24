use serde::{Deserialize, Serialize};

use super::time::GameTime;
use crate::catalog::AttackType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AttackStatus {
    Scheduled,
    Resolved,
    Cancelled,
}

string_enum!(AttackStatus, "attack status", {
    Scheduled => "scheduled",
    Resolved => "resolved",
    Cancelled => "cancelled",
});

/// An attack launched now that lands later; resolved by the periodic sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAttack {
    pub id: u64,
    pub attacker_id: u64,
    pub defender_id: u64,
    pub attack_type: AttackType,
    pub launched_at: GameTime,
    pub due_at: GameTime,
    pub status: AttackStatus,
    /// Summary of the battle or the reason it was called off.
    #[serde(default)]
    pub outcome: Option<String>,
}

impl PendingAttack {
    pub fn is_due(&self, now: GameTime) -> bool {
        self.status == AttackStatus::Scheduled && now >= self.due_at
    }
}
