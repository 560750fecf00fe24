use std::fmt;

use serde::{Deserialize, Serialize};

use super::player::Player;
use super::time::GameTime;
use crate::catalog::{ResourceKind, WeaponKind};
use crate::error::GameError;

/// What a listing sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "category", content = "kind", rename_all = "snake_case")]
pub enum MarketItem {
    Resource(ResourceKind),
    Weapon(WeaponKind),
    Money,
}

impl MarketItem {
    pub fn category(self) -> &'static str {
        match self {
            MarketItem::Resource(_) => "resource",
            MarketItem::Weapon(_) => "weapon",
            MarketItem::Money => "money",
        }
    }

    pub fn held_by(self, player: &Player) -> u64 {
        match self {
            MarketItem::Resource(kind) => player.resources.get(kind),
            MarketItem::Weapon(kind) => player.weapons.get(kind),
            MarketItem::Money => player.money,
        }
    }

    /// Debit `qty` of this item from the player (escrow on listing).
    pub fn take_from(self, player: &mut Player, qty: u64) -> Result<(), GameError> {
        match self {
            MarketItem::Resource(kind) => player.resources.sub(kind, qty),
            MarketItem::Weapon(kind) => player.weapons.sub(kind, qty),
            MarketItem::Money => player.debit_money(qty),
        }
    }

    pub fn give_to(self, player: &mut Player, qty: u64) -> Result<(), GameError> {
        match self {
            MarketItem::Resource(kind) => player.resources.add(kind, qty),
            MarketItem::Weapon(kind) => player.weapons.add(kind, qty),
            MarketItem::Money => player.credit_money(qty),
        }
    }
}

impl fmt::Display for MarketItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketItem::Resource(kind) => write!(f, "{kind}"),
            MarketItem::Weapon(kind) => write!(f, "{kind}"),
            MarketItem::Money => f.write_str("money"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ListingStatus {
    Active,
    SoldOut,
    Cancelled,
}

string_enum!(ListingStatus, "listing status", {
    Active => "active",
    SoldOut => "sold_out",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketListing {
    pub id: u64,
    pub seller_id: u64,
    pub item: MarketItem,
    /// Remaining quantity held in escrow.
    pub quantity: u64,
    pub unit_price: u64,
    pub security: u8,
    pub status: ListingStatus,
    pub created_at: GameTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum DeliveryStatus {
    /// Paid for, delivery not yet rolled.
    Pending,
    Delivered,
    Failed,
}

string_enum!(DeliveryStatus, "delivery status", {
    Pending => "pending",
    Delivered => "delivered",
    Failed => "failed",
});

/// One purchase against a listing. Payment is settled when the row is
/// created as pending; only the delivery of goods is at risk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketTransaction {
    pub id: u64,
    pub listing_id: u64,
    pub buyer_id: u64,
    pub seller_id: u64,
    pub item: MarketItem,
    pub quantity: u64,
    pub paid: u64,
    pub status: DeliveryStatus,
    pub created_at: GameTime,
}
