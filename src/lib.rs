#[macro_use]
mod macros;

pub mod catalog;
pub mod db;
pub mod engine;
pub mod error;
pub mod flush;
pub mod game;
pub mod id;
pub mod model;
pub mod sim;
pub mod testutil;

pub use catalog::{AttackType, BuildingKind, Catalog, CatalogError, ResourceKind, WeaponKind};
pub use error::GameError;
pub use game::{Game, GameConfig, Notifier, NotifyError, NullNotifier};
pub use id::IdGenerator;
pub use model::{GameTime, Ledger, News, NewsKind, Player, World};
