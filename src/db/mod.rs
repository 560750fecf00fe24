mod migrate;
mod restore;
mod save;

pub use migrate::migrate;
pub use restore::restore_world;
pub use save::save_world;
