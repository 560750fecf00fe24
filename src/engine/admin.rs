//! Administrative operations gated by an injected authorization policy.
//! Every successful action appends to the admin log, which is never rewritten.

use std::collections::BTreeSet;

use crate::catalog::ResourceKind;
use crate::error::GameError;
use crate::model::{
    AdminLogEntry, AttackStatus, GameTime, ListingStatus, NewsKind, Player, World,
};

/// Decides who may run administrative operations.
pub trait AuthorizationPolicy: Send + Sync {
    fn is_admin(&self, player_id: u64) -> bool;
}

/// A fixed allow-list supplied at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticAdminPolicy {
    admins: BTreeSet<u64>,
}

impl StaticAdminPolicy {
    pub fn new(admins: impl IntoIterator<Item = u64>) -> Self {
        Self {
            admins: admins.into_iter().collect(),
        }
    }
}

impl AuthorizationPolicy for StaticAdminPolicy {
    fn is_admin(&self, player_id: u64) -> bool {
        self.admins.contains(&player_id)
    }
}

fn authorize(
    policy: &dyn AuthorizationPolicy,
    actor_id: u64,
    action: &'static str,
) -> Result<(), GameError> {
    if policy.is_admin(actor_id) {
        Ok(())
    } else {
        tracing::warn!(actor_id, action, "unauthorized admin attempt");
        Err(GameError::Unauthorized { action })
    }
}

fn record(
    world: &mut World,
    actor_id: u64,
    action: &str,
    target_id: u64,
    detail: String,
    now: GameTime,
) {
    world.admin_log.push(AdminLogEntry {
        actor_id,
        action: action.to_string(),
        target_id: Some(target_id),
        detail: detail.clone(),
        at: now,
    });
    world.push_news(NewsKind::AdminAction, now, detail, vec![target_id]);
    tracing::info!(actor_id, action, target_id, "admin action");
}

/// Delete a player and everything that only makes sense while they exist.
///
/// Active listings are cancelled with their escrow, scheduled attacks
/// involving the player are called off, and alliances and requests are
/// dropped. Convoys in flight are left for the sweep, which fails them and
/// refunds whichever side still exists.
pub fn reset_player(
    world: &mut World,
    policy: &dyn AuthorizationPolicy,
    actor_id: u64,
    target_id: u64,
    now: GameTime,
) -> Result<Player, GameError> {
    authorize(policy, actor_id, "reset players")?;
    let removed = world
        .players
        .remove(&target_id)
        .ok_or_else(|| GameError::player_not_found(target_id))?;

    for listing in world.listings.values_mut() {
        if listing.seller_id == target_id && listing.status == ListingStatus::Active {
            listing.status = ListingStatus::Cancelled;
        }
    }
    for attack in world.pending_attacks.values_mut() {
        let involved = attack.attacker_id == target_id || attack.defender_id == target_id;
        if involved && attack.status == AttackStatus::Scheduled {
            attack.status = AttackStatus::Cancelled;
            attack.outcome = Some(format!("player {target_id} was reset"));
        }
    }
    world.alliances.retain(|&(a, b)| a != target_id && b != target_id);
    world
        .alliance_requests
        .retain(|&(a, b)| a != target_id && b != target_id);

    let detail = format!("{} ({}) was reset", removed.name, removed.country);
    record(world, actor_id, "reset_player", target_id, detail, now);
    Ok(removed)
}

pub fn grant_money(
    world: &mut World,
    policy: &dyn AuthorizationPolicy,
    actor_id: u64,
    target_id: u64,
    amount: u64,
    now: GameTime,
) -> Result<u64, GameError> {
    authorize(policy, actor_id, "grant money")?;
    if amount == 0 {
        return Err(GameError::validation("amount must be at least 1"));
    }
    let (balance, country) = world.update_player(target_id, |p| {
        p.credit_money(amount)?;
        Ok((p.money, p.country.clone()))
    })?;
    record(
        world,
        actor_id,
        "grant_money",
        target_id,
        format!("{country} was granted {amount} money"),
        now,
    );
    Ok(balance)
}

pub fn grant_resource(
    world: &mut World,
    policy: &dyn AuthorizationPolicy,
    actor_id: u64,
    target_id: u64,
    kind: ResourceKind,
    amount: u64,
    now: GameTime,
) -> Result<u64, GameError> {
    authorize(policy, actor_id, "grant resources")?;
    if amount == 0 {
        return Err(GameError::validation("amount must be at least 1"));
    }
    let (balance, country) = world.update_player(target_id, |p| {
        p.resources.add(kind, amount)?;
        Ok((p.resources.get(kind), p.country.clone()))
    })?;
    record(
        world,
        actor_id,
        "grant_resource",
        target_id,
        format!("{country} was granted {amount} {kind}"),
        now,
    );
    Ok(balance)
}
