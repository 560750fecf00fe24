use serde::{Deserialize, Serialize};

use super::time::GameTime;

/// Write-once audit record of an administrative action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminLogEntry {
    pub actor_id: u64,
    pub action: String,
    #[serde(default)]
    pub target_id: Option<u64>,
    pub detail: String,
    pub at: GameTime,
}
