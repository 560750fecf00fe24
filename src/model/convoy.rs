use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::ledger::Ledger;
use super::time::GameTime;
use crate::catalog::{ResourceKind, WeaponKind};

/// Goods carried by a convoy. Money travels as a pseudo-resource alongside
/// real resources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default)]
    pub money: u64,
    #[serde(default)]
    pub resources: Ledger<ResourceKind>,
}

impl Payload {
    pub fn money(amount: u64) -> Self {
        Self {
            money: amount,
            resources: Ledger::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.money == 0 && self.resources.is_empty()
    }

    /// Resource units that need cargo space (money needs none).
    pub fn cargo_units(&self) -> u64 {
        self.resources.total()
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.money > 0 {
            parts.push(format!("money: {}", self.money));
        }
        if !self.resources.is_empty() {
            parts.push(self.resources.describe());
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ConvoyStatus {
    InTransit,
    Stopped,
    Stolen,
    Delivered,
    Lost,
    Failed,
}

string_enum!(ConvoyStatus, "convoy status", {
    InTransit => "in_transit",
    Stopped => "stopped",
    Stolen => "stolen",
    Delivered => "delivered",
    Lost => "lost",
    Failed => "failed",
});

impl ConvoyStatus {
    /// Final states never transition again. `Stopped` can still be released.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            ConvoyStatus::Stolen
                | ConvoyStatus::Delivered
                | ConvoyStatus::Lost
                | ConvoyStatus::Failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum InterceptMode {
    /// Halt the convoy; the payload stays with the convoy record.
    Stop,
    /// Seize the payload for the interceptor.
    Steal,
}

string_enum!(InterceptMode, "intercept mode", {
    Stop => "stop",
    Steal => "steal",
});

/// An in-flight, time-delayed, interceptable transfer between two players.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Convoy {
    pub id: u64,
    pub sender_id: u64,
    pub receiver_id: u64,
    pub payload: Payload,
    pub transport: Option<WeaponKind>,
    pub created_at: GameTime,
    pub arrival_at: GameTime,
    /// 0–99; resistance to interception and loss.
    pub security: u8,
    pub escort_power: u64,
    /// Weapons each player has committed to guarding this convoy, the
    /// sender's creation escort included. Counted against holdings while
    /// the convoy is open.
    #[serde(default)]
    pub escorts: BTreeMap<u64, Ledger<WeaponKind>>,
    pub status: ConvoyStatus,
    #[serde(default)]
    pub intercepted_by: Option<u64>,
    #[serde(default)]
    pub resolved_at: Option<GameTime>,
}

impl Convoy {
    pub fn is_involved(&self, player_id: u64) -> bool {
        self.sender_id == player_id || self.receiver_id == player_id
    }

    pub fn is_due(&self, now: GameTime) -> bool {
        self.status == ConvoyStatus::InTransit && now >= self.arrival_at
    }
}
