pub mod admin;
pub mod attack;
pub mod convoy;
pub mod ledger;
pub mod market;
pub mod news;
pub mod player;
pub mod time;
pub mod world;

pub use admin::AdminLogEntry;
pub use attack::{AttackStatus, PendingAttack};
pub use convoy::{Convoy, ConvoyStatus, InterceptMode, Payload};
pub use ledger::Ledger;
pub use market::{DeliveryStatus, ListingStatus, MarketItem, MarketListing, MarketTransaction};
pub use news::{News, NewsKind};
pub use player::Player;
pub use time::GameTime;
pub use world::World;
