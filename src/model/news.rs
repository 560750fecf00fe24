use serde::{Deserialize, Serialize};

use super::time::GameTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum NewsKind {
    PlayerJoined,
    StructureBuilt,
    WeaponProduced,
    IncomePaid,
    BattleResult,
    AttackLaunched,
    AttackCalledOff,
    ConvoyDispatched,
    ConvoyEscorted,
    ConvoyIntercepted,
    ConvoyReleased,
    ConvoyDelivered,
    ConvoyLost,
    ConvoyFailed,
    ListingCreated,
    MarketSale,
    ListingCancelled,
    AllianceRequested,
    AllianceFormed,
    AllianceBroken,
    AdminAction,
}

string_enum!(NewsKind, "news kind", {
    PlayerJoined => "player_joined",
    StructureBuilt => "structure_built",
    WeaponProduced => "weapon_produced",
    IncomePaid => "income_paid",
    BattleResult => "battle_result",
    AttackLaunched => "attack_launched",
    AttackCalledOff => "attack_called_off",
    ConvoyDispatched => "convoy_dispatched",
    ConvoyEscorted => "convoy_escorted",
    ConvoyIntercepted => "convoy_intercepted",
    ConvoyReleased => "convoy_released",
    ConvoyDelivered => "convoy_delivered",
    ConvoyLost => "convoy_lost",
    ConvoyFailed => "convoy_failed",
    ListingCreated => "listing_created",
    MarketSale => "market_sale",
    ListingCancelled => "listing_cancelled",
    AllianceRequested => "alliance_requested",
    AllianceFormed => "alliance_formed",
    AllianceBroken => "alliance_broken",
    AdminAction => "admin_action",
});

/// A side-effect event handed to the external broadcaster after commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct News {
    pub id: u64,
    pub kind: NewsKind,
    pub at: GameTime,
    pub message: String,
    /// Players the item is about (recipients for direct notification).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn news_round_trips_through_json() {
        let news = News {
            id: 3,
            kind: NewsKind::ConvoyIntercepted,
            at: GameTime::from_minutes(12),
            message: "Convoy 2 was stopped".to_string(),
            subjects: vec![1, 2],
        };
        let json = serde_json::to_string(&news).unwrap();
        assert!(json.contains("\"kind\":\"convoy_intercepted\""), "{json}");
        let back: News = serde_json::from_str(&json).unwrap();
        assert_eq!(back, news);
    }

    #[test]
    fn empty_subjects_skipped() {
        let news = News {
            id: 1,
            kind: NewsKind::IncomePaid,
            at: GameTime::EPOCH,
            message: String::new(),
            subjects: vec![],
        };
        let json = serde_json::to_string(&news).unwrap();
        assert!(!json.contains("subjects"), "{json}");
    }
}
