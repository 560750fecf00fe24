use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::admin::AdminLogEntry;
use super::attack::PendingAttack;
use super::convoy::Convoy;
use super::market::{MarketListing, MarketTransaction};
use super::news::{News, NewsKind};
use super::player::Player;
use super::time::GameTime;
use crate::catalog::Catalog;
use crate::error::GameError;
use crate::id::IdGenerator;

/// The complete mutable game state plus the catalog it is interpreted against.
///
/// Player rows are only written through [`World::update_player`] and
/// [`World::update_players`], which apply a closure to a copy and commit it
/// only if the closure succeeds. That gives every operation a single,
/// all-or-nothing write per player involved.
#[derive(Debug, Clone)]
pub struct World {
    pub catalog: Arc<Catalog>,
    pub players: BTreeMap<u64, Player>,
    pub convoys: BTreeMap<u64, Convoy>,
    pub listings: BTreeMap<u64, MarketListing>,
    pub transactions: BTreeMap<u64, MarketTransaction>,
    pub pending_attacks: BTreeMap<u64, PendingAttack>,
    /// Allied pairs stored as `(lower id, higher id)`.
    pub alliances: BTreeSet<(u64, u64)>,
    /// Outstanding alliance requests as `(from, to)`.
    pub alliance_requests: BTreeSet<(u64, u64)>,
    pub admin_log: Vec<AdminLogEntry>,
    pub news: Vec<News>,
    pub id_gen: IdGenerator,
    pub current_time: GameTime,
}

impl World {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self {
            catalog,
            players: BTreeMap::new(),
            convoys: BTreeMap::new(),
            listings: BTreeMap::new(),
            transactions: BTreeMap::new(),
            pending_attacks: BTreeMap::new(),
            alliances: BTreeSet::new(),
            alliance_requests: BTreeSet::new(),
            admin_log: Vec::new(),
            news: Vec::new(),
            id_gen: IdGenerator::new(),
            current_time: GameTime::EPOCH,
        }
    }

    pub fn next_id(&mut self) -> u64 {
        self.id_gen.next_id()
    }

    pub fn player(&self, id: u64) -> Result<&Player, GameError> {
        self.players
            .get(&id)
            .ok_or_else(|| GameError::player_not_found(id))
    }

    pub fn player_by_country(&self, code: &str) -> Option<&Player> {
        self.players.values().find(|p| p.country == code)
    }

    /// Apply `f` to a copy of the player and commit it only on success.
    pub fn update_player<T>(
        &mut self,
        id: u64,
        f: impl FnOnce(&mut Player) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let mut draft = self.player(id)?.clone();
        let out = f(&mut draft)?;
        draft.check_invariants().map_err(GameError::System)?;
        self.players.insert(id, draft);
        Ok(out)
    }

    /// Two-party variant of [`World::update_player`]: both rows commit or neither does.
    pub fn update_players<T>(
        &mut self,
        first: u64,
        second: u64,
        f: impl FnOnce(&mut Player, &mut Player) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        if first == second {
            return Err(GameError::validation(
                "a transfer needs two different players",
            ));
        }
        let mut a = self.player(first)?.clone();
        let mut b = self.player(second)?.clone();
        let out = f(&mut a, &mut b)?;
        a.check_invariants().map_err(GameError::System)?;
        b.check_invariants().map_err(GameError::System)?;
        self.players.insert(first, a);
        self.players.insert(second, b);
        Ok(out)
    }

    /// Record a news item and return its id.
    pub fn push_news(
        &mut self,
        kind: NewsKind,
        at: GameTime,
        message: String,
        subjects: Vec<u64>,
    ) -> u64 {
        let id = self.next_id();
        self.news.push(News {
            id,
            kind,
            at,
            message,
            subjects,
        });
        id
    }

    /// Remove news recorded before `cutoff` and return how many went.
    pub fn prune_news_before(&mut self, cutoff: GameTime) -> usize {
        let before = self.news.len();
        self.news.retain(|n| n.at >= cutoff);
        before - self.news.len()
    }

    pub fn are_allied(&self, a: u64, b: u64) -> bool {
        self.alliances.contains(&alliance_key(a, b))
    }

    /// Check the ledger invariants across all players.
    pub fn check_invariants(&self) -> Result<(), String> {
        for player in self.players.values() {
            player.check_invariants()?;
        }
        Ok(())
    }
}

/// Canonical ordering for an unordered alliance pair.
pub fn alliance_key(a: u64, b: u64) -> (u64, u64) {
    if a <= b { (a, b) } else { (b, a) }
}
