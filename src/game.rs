//! Thread-safe facade over the engines.
//!
//! All state lives behind one mutex. An operation locks, mutates, and unlocks;
//! only then is the news it produced handed to the [`Notifier`], so a slow or
//! failing broadcaster never holds the lock or rolls anything back.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{AttackType, BuildingKind, Catalog, CatalogError, ResourceKind, WeaponKind};
use crate::engine::combat::{self, AttackResolution, BattleReport};
use crate::engine::convoy::{self, ConvoyOrder, ConvoyReceipt, EscortReceipt, InterceptReport};
use crate::engine::economy::{self, BuildOutcome, IncomeReport, ProductionOutcome};
use crate::engine::market::{self, ListingReceipt, PurchaseReceipt};
use crate::engine::{
    AuthorizationPolicy, StaticAdminPolicy, SweepReport, admin, diplomacy, players,
    sweep_convoys_and_attacks,
};
use crate::error::GameError;
use crate::model::{
    GameTime, InterceptMode, Ledger, MarketItem, MarketListing, News, PendingAttack, Player,
    World,
};

#[derive(Debug, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Receives news after the state change that produced it has been committed.
pub trait Notifier: Send + Sync {
    fn notify(&self, news: &News) -> Result<(), NotifyError>;
}

/// Drops every item.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _news: &News) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Startup settings for a [`Game`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Seed for the game's random source.
    pub seed: u64,
    /// Player ids allowed to run admin operations.
    pub admins: Vec<u64>,
    /// Catalog file to load instead of the built-in one.
    pub catalog_path: Option<PathBuf>,
}

pub struct GameState {
    pub world: World,
    pub rng: SmallRng,
}

pub struct Game {
    state: Mutex<GameState>,
    policy: Box<dyn AuthorizationPolicy>,
    notifier: Box<dyn Notifier>,
}

impl Game {
    pub fn new(
        world: World,
        seed: u64,
        policy: Box<dyn AuthorizationPolicy>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            state: Mutex::new(GameState {
                world,
                rng: SmallRng::seed_from_u64(seed),
            }),
            policy,
            notifier,
        }
    }

    /// Build an empty game from config, with a static admin allow-list.
    pub fn from_config(
        config: &GameConfig,
        notifier: Box<dyn Notifier>,
    ) -> Result<Self, CatalogError> {
        let catalog = match &config.catalog_path {
            Some(path) => Catalog::from_file(path)?,
            None => Catalog::builtin()?,
        };
        Ok(Self::new(
            World::new(Arc::new(catalog)),
            config.seed,
            Box::new(StaticAdminPolicy::new(config.admins.iter().copied())),
            notifier,
        ))
    }

    fn lock(&self) -> Result<MutexGuard<'_, GameState>, GameError> {
        self.state
            .lock()
            .map_err(|_| GameError::System("game state lock poisoned".to_string()))
    }

    /// Run `f` under the lock, then dispatch any news it recorded.
    fn transact<T>(
        &self,
        now: GameTime,
        f: impl FnOnce(&mut GameState, &dyn AuthorizationPolicy) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let (result, news) = {
            let mut state = self.lock()?;
            if now > state.world.current_time {
                state.world.current_time = now;
            }
            // news ids come from the shared sequence, so anything at or past
            // the mark was recorded by `f`
            let mark = state.world.id_gen.peek();
            let result = f(&mut *state, self.policy.as_ref());
            let news = &state.world.news;
            let news = news[news.partition_point(|n| n.id < mark)..].to_vec();
            (result, news)
        };
        for item in &news {
            if let Err(e) = self.notifier.notify(item) {
                tracing::warn!(news_id = item.id, error = %e, "notifier failed");
            }
        }
        result
    }

    /// Read-only access to the current world.
    pub fn read<T>(&self, f: impl FnOnce(&World) -> T) -> Result<T, GameError> {
        let state = self.lock()?;
        Ok(f(&state.world))
    }

    pub fn snapshot(&self) -> Result<World, GameError> {
        self.read(World::clone)
    }

    pub fn player(&self, id: u64) -> Result<Player, GameError> {
        self.read(|w| w.player(id).cloned())?
    }

    // -- Players --

    pub fn join(
        &self,
        player_id: u64,
        name: &str,
        country: &str,
        now: GameTime,
    ) -> Result<Player, GameError> {
        self.transact(now, |s, _| players::join(&mut s.world, player_id, name, country, now))
    }

    pub fn free_countries(&self) -> Result<Vec<String>, GameError> {
        self.read(players::free_countries)
    }

    // -- Economy --

    pub fn build_structure(
        &self,
        player_id: u64,
        kind: BuildingKind,
        now: GameTime,
    ) -> Result<BuildOutcome, GameError> {
        self.transact(now, |s, _| {
            economy::build_structure(&mut s.world, player_id, kind, now)
        })
    }

    pub fn produce_weapon(
        &self,
        player_id: u64,
        kind: WeaponKind,
        quantity: u64,
        now: GameTime,
    ) -> Result<ProductionOutcome, GameError> {
        self.transact(now, |s, _| {
            economy::produce_weapon(&mut s.world, player_id, kind, quantity, now)
        })
    }

    pub fn run_income_cycle(&self, now: GameTime) -> Result<IncomeReport, GameError> {
        self.transact(now, |s, _| Ok(economy::run_income_cycle(&mut s.world, now)))
    }

    // -- Combat --

    pub fn attempt_attack(
        &self,
        attacker_id: u64,
        defender_id: u64,
        attack_type: AttackType,
        now: GameTime,
    ) -> Result<BattleReport, GameError> {
        self.transact(now, |s, _| {
            combat::attempt_attack(
                &mut s.world,
                &mut s.rng,
                attacker_id,
                defender_id,
                attack_type,
                now,
            )
        })
    }

    pub fn schedule_attack(
        &self,
        attacker_id: u64,
        defender_id: u64,
        attack_type: AttackType,
        now: GameTime,
    ) -> Result<PendingAttack, GameError> {
        self.transact(now, |s, _| {
            combat::schedule_attack(&mut s.world, attacker_id, defender_id, attack_type, now)
        })
    }

    pub fn resolve_pending_attack(
        &self,
        attack_id: u64,
        now: GameTime,
    ) -> Result<AttackResolution, GameError> {
        self.transact(now, |s, _| {
            combat::resolve_pending_attack(&mut s.world, &mut s.rng, attack_id, now)
        })
    }

    // -- Convoys --

    pub fn create_convoy(
        &self,
        sender_id: u64,
        receiver_id: u64,
        order: ConvoyOrder,
        now: GameTime,
    ) -> Result<ConvoyReceipt, GameError> {
        self.transact(now, |s, _| {
            convoy::create_convoy(&mut s.world, sender_id, receiver_id, order, now)
        })
    }

    pub fn escort_convoy(
        &self,
        escort_id: u64,
        convoy_id: u64,
        weapons: &Ledger<WeaponKind>,
        now: GameTime,
    ) -> Result<EscortReceipt, GameError> {
        self.transact(now, |s, _| {
            convoy::escort_convoy(&mut s.world, escort_id, convoy_id, weapons, now)
        })
    }

    pub fn intercept_convoy(
        &self,
        actor_id: u64,
        convoy_id: u64,
        mode: InterceptMode,
        weapons: &Ledger<WeaponKind>,
        now: GameTime,
    ) -> Result<InterceptReport, GameError> {
        self.transact(now, |s, _| {
            convoy::intercept_convoy(
                &mut s.world,
                &mut s.rng,
                actor_id,
                convoy_id,
                mode,
                weapons,
                now,
            )
        })
    }

    pub fn release_convoy(
        &self,
        sender_id: u64,
        convoy_id: u64,
        now: GameTime,
    ) -> Result<ConvoyReceipt, GameError> {
        self.transact(now, |s, _| {
            convoy::release_convoy(&mut s.world, sender_id, convoy_id, now)
        })
    }

    // -- Marketplace --

    pub fn create_listing(
        &self,
        seller_id: u64,
        item: MarketItem,
        quantity: u64,
        unit_price: u64,
        now: GameTime,
    ) -> Result<ListingReceipt, GameError> {
        self.transact(now, |s, _| {
            market::create_listing(&mut s.world, seller_id, item, quantity, unit_price, now)
        })
    }

    pub fn purchase(
        &self,
        buyer_id: u64,
        listing_id: u64,
        quantity: u64,
        now: GameTime,
    ) -> Result<PurchaseReceipt, GameError> {
        self.transact(now, |s, _| {
            market::purchase(&mut s.world, &mut s.rng, buyer_id, listing_id, quantity, now)
        })
    }

    pub fn cancel_listing(
        &self,
        seller_id: u64,
        listing_id: u64,
        now: GameTime,
    ) -> Result<MarketListing, GameError> {
        self.transact(now, |s, _| {
            market::cancel_listing(&mut s.world, seller_id, listing_id, now)
        })
    }

    pub fn active_listings(&self) -> Result<Vec<MarketListing>, GameError> {
        self.read(|w| market::active_listings(w).into_iter().cloned().collect())
    }

    // -- Diplomacy --

    pub fn request_alliance(&self, from: u64, to: u64, now: GameTime) -> Result<(), GameError> {
        self.transact(now, |s, _| diplomacy::request_alliance(&mut s.world, from, to, now))
    }

    pub fn accept_alliance(&self, player: u64, from: u64, now: GameTime) -> Result<(), GameError> {
        self.transact(now, |s, _| {
            diplomacy::accept_alliance(&mut s.world, player, from, now)
        })
    }

    pub fn decline_alliance(
        &self,
        player: u64,
        from: u64,
        now: GameTime,
    ) -> Result<(), GameError> {
        self.transact(now, |s, _| diplomacy::decline_alliance(&mut s.world, player, from))
    }

    pub fn break_alliance(&self, player: u64, other: u64, now: GameTime) -> Result<(), GameError> {
        self.transact(now, |s, _| {
            diplomacy::break_alliance(&mut s.world, player, other, now)
        })
    }

    pub fn allies_of(&self, player: u64) -> Result<Vec<u64>, GameError> {
        self.read(|w| diplomacy::allies_of(w, player))
    }

    // -- Administration --

    pub fn reset_player(
        &self,
        actor_id: u64,
        target_id: u64,
        now: GameTime,
    ) -> Result<Player, GameError> {
        self.transact(now, |s, policy| {
            admin::reset_player(&mut s.world, policy, actor_id, target_id, now)
        })
    }

    pub fn grant_money(
        &self,
        actor_id: u64,
        target_id: u64,
        amount: u64,
        now: GameTime,
    ) -> Result<u64, GameError> {
        self.transact(now, |s, policy| {
            admin::grant_money(&mut s.world, policy, actor_id, target_id, amount, now)
        })
    }

    pub fn grant_resource(
        &self,
        actor_id: u64,
        target_id: u64,
        kind: ResourceKind,
        amount: u64,
        now: GameTime,
    ) -> Result<u64, GameError> {
        self.transact(now, |s, policy| {
            admin::grant_resource(&mut s.world, policy, actor_id, target_id, kind, amount, now)
        })
    }

    // -- Periodic jobs --

    pub fn sweep_convoys_and_attacks(&self, now: GameTime) -> Result<SweepReport, GameError> {
        self.transact(now, |s, _| {
            Ok(sweep_convoys_and_attacks(&mut s.world, &mut s.rng, now))
        })
    }

    /// Drop news older than `cutoff` once it has been dispatched and saved.
    /// Returns how many items were removed.
    pub fn prune_news(&self, cutoff: GameTime) -> Result<usize, GameError> {
        let removed = self.lock()?.world.prune_news_before(cutoff);
        tracing::debug!(removed, cutoff = cutoff.minutes(), "news pruned");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use super::*;
    use crate::model::NewsKind;
    use crate::testutil::hours;

    #[derive(Default)]
    struct Recorder {
        seen: StdMutex<Vec<NewsKind>>,
    }

    impl Notifier for Arc<Recorder> {
        fn notify(&self, news: &News) -> Result<(), NotifyError> {
            self.seen.lock().unwrap().push(news.kind);
            Ok(())
        }
    }

    struct Failing;

    impl Notifier for Failing {
        fn notify(&self, _news: &News) -> Result<(), NotifyError> {
            Err(NotifyError("broadcaster offline".to_string()))
        }
    }

    fn game(notifier: Box<dyn Notifier>) -> Game {
        let config = GameConfig {
            seed: 7,
            admins: vec![900],
            catalog_path: None,
        };
        Game::from_config(&config, notifier).unwrap()
    }

    #[test]
    fn news_is_dispatched_after_commit() {
        let recorder = Arc::new(Recorder::default());
        let game = game(Box::new(recorder.clone()));
        game.join(1, "Ada", "ir", hours(0)).unwrap();
        game.build_structure(1, BuildingKind::IronMine, hours(0)).unwrap();
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![NewsKind::PlayerJoined, NewsKind::StructureBuilt]
        );
    }

    #[test]
    fn rejected_operation_sends_nothing() {
        let recorder = Arc::new(Recorder::default());
        let game = game(Box::new(recorder.clone()));
        assert!(game.build_structure(1, BuildingKind::IronMine, hours(0)).is_err());
        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn failing_notifier_does_not_undo_state() {
        let game = game(Box::new(Failing));
        game.join(1, "Ada", "ir", hours(0)).unwrap();
        assert_eq!(game.player(1).unwrap().country, "ir");
    }

    #[test]
    fn admin_ops_use_configured_allow_list() {
        let game = game(Box::new(NullNotifier));
        game.join(1, "Ada", "ir", hours(0)).unwrap();
        assert!(matches!(
            game.grant_money(1, 1, 10, hours(0)),
            Err(GameError::Unauthorized { .. })
        ));
        assert_eq!(game.grant_money(900, 1, 10, hours(0)).unwrap(), 100_010);
    }

    #[test]
    fn clock_only_moves_forward() {
        let game = game(Box::new(NullNotifier));
        game.run_income_cycle(hours(6)).unwrap();
        game.run_income_cycle(hours(1)).unwrap();
        assert_eq!(game.read(|w| w.current_time).unwrap(), hours(6));
    }

    #[test]
    fn config_defaults_from_empty_json() {
        let config: GameConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.seed, 0);
        assert!(config.admins.is_empty());
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn pruned_news_does_not_confuse_dispatch() {
        let recorder = Arc::new(Recorder::default());
        let game = game(Box::new(recorder.clone()));
        game.join(1, "Ada", "ir", hours(0)).unwrap();
        game.join(2, "Bo", "iq", hours(1)).unwrap();
        assert_eq!(game.prune_news(hours(1)).unwrap(), 1);
        assert_eq!(game.snapshot().unwrap().news.len(), 1);

        game.build_structure(2, BuildingKind::IronMine, hours(2)).unwrap();
        assert_eq!(
            *recorder.seen.lock().unwrap(),
            vec![
                NewsKind::PlayerJoined,
                NewsKind::PlayerJoined,
                NewsKind::StructureBuilt
            ]
        );
        assert_eq!(game.snapshot().unwrap().news.len(), 2);
    }
}
