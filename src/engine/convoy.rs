//! Convoys: time-delayed transfers that can be escorted, intercepted and lost.
//!
//! The sender is debited when the convoy is created. From then on the payload
//! lives on the convoy record until exactly one terminal transition moves it to
//! the receiver, the interceptor, back to the sender, or nowhere (lost).

use std::collections::BTreeMap;

use rand::RngCore;

use super::chance::{portion, roll, uniform};
use super::combat::weapon_power;
use crate::catalog::{Catalog, WeaponKind};
use crate::error::GameError;
use crate::model::{
    Convoy, ConvoyStatus, GameTime, InterceptMode, Ledger, NewsKind, Payload, Player, World,
};

pub const BASE_SECURITY: u64 = 10;
/// Cap for security computed at creation.
pub const MAX_CREATION_SECURITY: u64 = 95;
/// Cap once escorts have joined.
pub const MAX_SECURITY: u8 = 99;
pub const DEFAULT_TRAVEL_MINUTES: u64 = 30;

pub const INTERCEPT_CHANCE_SCALE: f64 = 60.0;
pub const MAX_INTERCEPT_CHANCE: f64 = 85.0;
pub const MIN_INTERCEPT_LOSS: f64 = 0.10;
pub const MAX_INTERCEPT_LOSS: f64 = 0.30;

pub const DELIVERY_BONUS: u64 = 10;
pub const MAX_DELIVERY_CHANCE: u64 = 95;

/// A request to move goods between two players.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvoyOrder {
    pub payload: Payload,
    /// Transport equipment to use; the convoy falls back to the default
    /// travel time when the sender holds too few units.
    pub transport: Option<WeaponKind>,
    /// The sender's own weapons riding along. They are not consumed.
    pub escort: Ledger<WeaponKind>,
}

impl ConvoyOrder {
    pub fn new(payload: Payload) -> Self {
        Self {
            payload,
            ..Self::default()
        }
    }

    pub fn with_transport(mut self, kind: WeaponKind) -> Self {
        self.transport = Some(kind);
        self
    }

    pub fn with_escort(mut self, escort: Ledger<WeaponKind>) -> Self {
        self.escort = escort;
        self
    }
}

/// Travel time and security bonus granted by the chosen transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub transport: Option<WeaponKind>,
    pub travel_minutes: u64,
    pub security_bonus: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvoyReceipt {
    pub convoy: Convoy,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscortReceipt {
    pub convoy_id: u64,
    pub added_power: u64,
    pub security: u8,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptReport {
    pub convoy_id: u64,
    pub mode: InterceptMode,
    pub success: bool,
    /// Chance the attempt had, in percent.
    pub chance: u64,
    pub weapons_lost: Ledger<WeaponKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvoyResolution {
    pub convoy_id: u64,
    pub status: ConvoyStatus,
    pub message: String,
}

/// Resolve transport equipment for a payload. Unknown or insufficient
/// equipment yields the default route rather than an error.
pub fn plan_route(
    catalog: &Catalog,
    sender: &Player,
    transport: Option<WeaponKind>,
    payload: &Payload,
) -> Result<Route, GameError> {
    let default = Route {
        transport: None,
        travel_minutes: DEFAULT_TRAVEL_MINUTES,
        security_bonus: 0,
    };
    let Some(kind) = transport else {
        return Ok(default);
    };
    let spec = catalog
        .transport(kind)
        .ok_or_else(|| GameError::validation(format!("{kind} is not transport equipment")))?;
    let needed = payload
        .cargo_units()
        .div_ceil(spec.capacity_per_unit.max(1))
        .max(1);
    if sender.weapons.get(kind) < needed {
        return Ok(default);
    }
    Ok(Route {
        transport: Some(kind),
        travel_minutes: spec.travel_minutes,
        security_bonus: u64::from(spec.security_bonus),
    })
}

pub fn creation_security(escort_power: u64, security_bonus: u64) -> u8 {
    let raw = BASE_SECURITY
        .saturating_add(escort_power / 10)
        .saturating_add(security_bonus);
    raw.min(MAX_CREATION_SECURITY) as u8
}

/// Percent chance an interception with `power` succeeds against `security`.
pub fn intercept_chance(power: u64, security: u8) -> f64 {
    if security == 0 {
        return MAX_INTERCEPT_CHANCE;
    }
    let ratio = power as f64 / (2.0 * f64::from(security));
    (ratio * INTERCEPT_CHANCE_SCALE).clamp(0.0, MAX_INTERCEPT_CHANCE)
}

pub fn delivery_chance(security: u8) -> u64 {
    (u64::from(security) + DELIVERY_BONUS).min(MAX_DELIVERY_CHANCE)
}

fn load_convoy(world: &World, convoy_id: u64) -> Result<Convoy, GameError> {
    world
        .convoys
        .get(&convoy_id)
        .cloned()
        .ok_or_else(|| GameError::convoy_not_found(convoy_id))
}

fn check_in_transit(convoy: &Convoy, now: GameTime) -> Result<(), GameError> {
    if convoy.status != ConvoyStatus::InTransit {
        return Err(GameError::Conflict(format!(
            "convoy {} is already {}",
            convoy.id, convoy.status
        )));
    }
    if now >= convoy.arrival_at {
        return Err(GameError::Conflict(format!(
            "convoy {} has already reached its destination",
            convoy.id
        )));
    }
    Ok(())
}

/// Weapons `player_id` has riding with convoys that are not yet closed.
pub fn committed_escort(world: &World, player_id: u64) -> Result<Ledger<WeaponKind>, GameError> {
    let mut committed = Ledger::new();
    for convoy in world.convoys.values().filter(|c| !c.status.is_final()) {
        if let Some(pledged) = convoy.escorts.get(&player_id) {
            committed.add_all(pledged)?;
        }
    }
    Ok(committed)
}

/// A unit can guard one open convoy at a time.
fn check_escort_available(
    world: &World,
    player: &Player,
    weapons: &Ledger<WeaponKind>,
) -> Result<(), GameError> {
    if weapons.is_empty() {
        return Ok(());
    }
    let mut needed = committed_escort(world, player.id)?;
    needed.add_all(weapons)?;
    player.weapons.covers(&needed).map_err(|err| {
        GameError::validation(format!("{err} (including units already escorting)"))
    })
}

pub(crate) fn country_of(world: &World, id: u64) -> String {
    world
        .players
        .get(&id)
        .map(|p| p.country.clone())
        .unwrap_or_else(|| format!("player {id}"))
}

/// Debit the sender and put the payload on the road.
pub fn create_convoy(
    world: &mut World,
    sender_id: u64,
    receiver_id: u64,
    order: ConvoyOrder,
    now: GameTime,
) -> Result<ConvoyReceipt, GameError> {
    if sender_id == receiver_id {
        return Err(GameError::validation("you cannot send a convoy to yourself"));
    }
    if order.payload.is_empty() {
        return Err(GameError::validation("a convoy needs something to carry"));
    }
    world.player(receiver_id)?;

    let catalog = world.catalog.clone();
    let sender = world.player(sender_id)?;
    let route = plan_route(&catalog, sender, order.transport, &order.payload)?;
    check_escort_available(world, sender, &order.escort)?;
    let escort_power = weapon_power(&catalog, &order.escort, |_| true);
    let security = creation_security(escort_power, route.security_bonus);

    world.update_player(sender_id, |sender| sender.debit_payload(&order.payload))?;

    let id = world.next_id();
    let convoy = Convoy {
        id,
        sender_id,
        receiver_id,
        payload: order.payload,
        transport: route.transport,
        created_at: now,
        arrival_at: now.plus_minutes(route.travel_minutes),
        security,
        escort_power,
        escorts: if order.escort.is_empty() {
            BTreeMap::new()
        } else {
            BTreeMap::from([(sender_id, order.escort)])
        },
        status: ConvoyStatus::InTransit,
        intercepted_by: None,
        resolved_at: None,
    };
    world.convoys.insert(id, convoy.clone());

    let message = format!(
        "Convoy {id} from {} to {} carrying {}: arrives in {} minutes, security {security}%",
        country_of(world, sender_id),
        country_of(world, receiver_id),
        convoy.payload.describe(),
        route.travel_minutes
    );
    world.push_news(
        NewsKind::ConvoyDispatched,
        now,
        message.clone(),
        vec![sender_id, receiver_id],
    );
    tracing::debug!(convoy_id = id, sender_id, receiver_id, security, "convoy dispatched");
    Ok(ConvoyReceipt { convoy, message })
}

/// A third party lends weapons to raise a convoy's security.
pub fn escort_convoy(
    world: &mut World,
    escort_id: u64,
    convoy_id: u64,
    weapons: &Ledger<WeaponKind>,
    now: GameTime,
) -> Result<EscortReceipt, GameError> {
    let convoy = load_convoy(world, convoy_id)?;
    if convoy.is_involved(escort_id) {
        return Err(GameError::validation(
            "only a third party can escort this convoy",
        ));
    }
    let escort = world.player(escort_id)?;
    check_in_transit(&convoy, now)?;
    if convoy.security >= MAX_SECURITY {
        return Err(GameError::validation(format!(
            "convoy {convoy_id} is already at maximum security"
        )));
    }
    let power = weapon_power(&world.catalog, weapons, |_| true);
    if power == 0 {
        return Err(GameError::validation("an escort needs weapons with power"));
    }
    check_escort_available(world, escort, weapons)?;
    let escort_country = escort.country.clone();
    let mut pledged = convoy.escorts.get(&escort_id).cloned().unwrap_or_default();
    pledged.add_all(weapons)?;

    let gain = (power / 10).max(1);
    let security = u64::from(convoy.security)
        .saturating_add(gain)
        .min(u64::from(MAX_SECURITY)) as u8;
    let row = world
        .convoys
        .get_mut(&convoy_id)
        .ok_or_else(|| GameError::convoy_not_found(convoy_id))?;
    row.security = security;
    row.escort_power = row.escort_power.saturating_add(power);
    row.escorts.insert(escort_id, pledged);

    let message = format!("{escort_country} escorted convoy {convoy_id}; security is now {security}%");
    world.push_news(
        NewsKind::ConvoyEscorted,
        now,
        message.clone(),
        vec![escort_id, convoy.sender_id, convoy.receiver_id],
    );
    Ok(EscortReceipt {
        convoy_id,
        added_power: power,
        security,
        message,
    })
}

/// Try to stop or steal a convoy in transit.
pub fn intercept_convoy(
    world: &mut World,
    rng: &mut dyn RngCore,
    actor_id: u64,
    convoy_id: u64,
    mode: InterceptMode,
    weapons: &Ledger<WeaponKind>,
    now: GameTime,
) -> Result<InterceptReport, GameError> {
    let convoy = load_convoy(world, convoy_id)?;
    if convoy.is_involved(actor_id) {
        return Err(GameError::validation("you cannot intercept your own convoy"));
    }
    let actor = world.player(actor_id)?;
    if world.are_allied(actor_id, convoy.sender_id) || world.are_allied(actor_id, convoy.receiver_id)
    {
        return Err(GameError::validation(
            "you cannot intercept a convoy belonging to an ally",
        ));
    }
    check_in_transit(&convoy, now)?;

    let power = weapon_power(&world.catalog, weapons, |_| true);
    if power == 0 {
        return Err(GameError::validation("an interception needs weapons with power"));
    }
    actor.weapons.covers(weapons)?;
    let required = 2 * u64::from(convoy.security);
    if power < required {
        return Err(GameError::validation(format!(
            "intercepting convoy {convoy_id} needs at least {required} power, you brought {power}"
        )));
    }
    let actor_country = actor.country.clone();

    let chance = intercept_chance(power, convoy.security);
    let success = roll(rng, chance);
    let mut weapons_lost = Ledger::new();

    let message = if success {
        if mode == InterceptMode::Steal {
            world.update_player(actor_id, |actor| actor.credit_payload(&convoy.payload))?;
        }
        let row = world
            .convoys
            .get_mut(&convoy_id)
            .ok_or_else(|| GameError::convoy_not_found(convoy_id))?;
        row.intercepted_by = Some(actor_id);
        match mode {
            InterceptMode::Stop => {
                row.status = ConvoyStatus::Stopped;
                format!("{actor_country} stopped convoy {convoy_id}")
            }
            InterceptMode::Steal => {
                row.status = ConvoyStatus::Stolen;
                row.resolved_at = Some(now);
                format!(
                    "{actor_country} seized convoy {convoy_id} and took {}",
                    convoy.payload.describe()
                )
            }
        }
    } else {
        world.update_player(actor_id, |actor| {
            for (kind, count) in weapons.iter() {
                let fraction = uniform(rng, MIN_INTERCEPT_LOSS, MAX_INTERCEPT_LOSS);
                let lost = portion(count, fraction);
                actor.weapons.sub(kind, lost)?;
                weapons_lost.add(kind, lost)?;
            }
            Ok(())
        })?;
        let mut msg = format!("{actor_country} failed to intercept convoy {convoy_id}");
        if !weapons_lost.is_empty() {
            msg.push_str(&format!(" and lost {}", weapons_lost.describe()));
        }
        msg
    };

    world.push_news(
        NewsKind::ConvoyIntercepted,
        now,
        message.clone(),
        vec![actor_id, convoy.sender_id, convoy.receiver_id],
    );
    tracing::info!(convoy_id, actor_id, success, chance, "interception attempted");
    Ok(InterceptReport {
        convoy_id,
        mode,
        success,
        chance: chance.round() as u64,
        weapons_lost,
        message,
    })
}

/// The sender puts a stopped convoy back on the road with a fresh arrival time.
pub fn release_convoy(
    world: &mut World,
    sender_id: u64,
    convoy_id: u64,
    now: GameTime,
) -> Result<ConvoyReceipt, GameError> {
    let convoy = load_convoy(world, convoy_id)?;
    if convoy.sender_id != sender_id {
        return Err(GameError::validation("only the sender can release a convoy"));
    }
    if convoy.status != ConvoyStatus::Stopped {
        return Err(GameError::Conflict(format!(
            "convoy {convoy_id} is {}, not stopped",
            convoy.status
        )));
    }
    let sender = world.player(sender_id)?;
    let route = plan_route(&world.catalog, sender, convoy.transport, &convoy.payload)?;

    let row = world
        .convoys
        .get_mut(&convoy_id)
        .ok_or_else(|| GameError::convoy_not_found(convoy_id))?;
    row.status = ConvoyStatus::InTransit;
    row.intercepted_by = None;
    row.transport = route.transport;
    row.arrival_at = now.plus_minutes(route.travel_minutes);
    let convoy = row.clone();

    let message = format!(
        "Convoy {convoy_id} is moving again and arrives in {} minutes",
        route.travel_minutes
    );
    world.push_news(
        NewsKind::ConvoyReleased,
        now,
        message.clone(),
        vec![convoy.sender_id, convoy.receiver_id],
    );
    Ok(ConvoyReceipt { convoy, message })
}

/// Ids of convoys that have arrived and still await resolution, oldest first.
pub fn due_convoys(world: &World, now: GameTime) -> Vec<u64> {
    let mut due: Vec<&Convoy> = world.convoys.values().filter(|c| c.is_due(now)).collect();
    due.sort_by_key(|c| (c.arrival_at, c.id));
    due.into_iter().map(|c| c.id).collect()
}

/// Deliver or lose one arrived convoy. A convoy that is not both in transit
/// and due is a conflict, so each convoy resolves at most once.
pub fn resolve_convoy(
    world: &mut World,
    rng: &mut dyn RngCore,
    convoy_id: u64,
    now: GameTime,
) -> Result<ConvoyResolution, GameError> {
    let convoy = load_convoy(world, convoy_id)?;
    if !convoy.is_due(now) {
        return Err(GameError::Conflict(format!(
            "convoy {convoy_id} is {} and arrives at {}",
            convoy.status, convoy.arrival_at
        )));
    }

    let (status, message) = if !world.players.contains_key(&convoy.receiver_id) {
        fail_convoy(world, &convoy, "its receiver is gone")
    } else if roll(rng, delivery_chance(convoy.security) as f64) {
        match world.update_player(convoy.receiver_id, |r| r.credit_payload(&convoy.payload)) {
            Ok(()) => (
                ConvoyStatus::Delivered,
                format!(
                    "Convoy {convoy_id} delivered {} to {}",
                    convoy.payload.describe(),
                    country_of(world, convoy.receiver_id)
                ),
            ),
            Err(err) => {
                tracing::warn!(convoy_id, error = %err, "convoy could not be credited");
                fail_convoy(world, &convoy, "the receiver could not accept it")
            }
        }
    } else {
        (
            ConvoyStatus::Lost,
            format!(
                "Convoy {convoy_id} to {} was lost on the road with {}",
                country_of(world, convoy.receiver_id),
                convoy.payload.describe()
            ),
        )
    };

    if let Some(row) = world.convoys.get_mut(&convoy_id) {
        row.status = status;
        row.resolved_at = Some(now);
    }
    let kind = match status {
        ConvoyStatus::Delivered => NewsKind::ConvoyDelivered,
        ConvoyStatus::Lost => NewsKind::ConvoyLost,
        _ => NewsKind::ConvoyFailed,
    };
    world.push_news(
        kind,
        now,
        message.clone(),
        vec![convoy.sender_id, convoy.receiver_id],
    );
    tracing::debug!(convoy_id, status = %status, "convoy resolved");
    Ok(ConvoyResolution {
        convoy_id,
        status,
        message,
    })
}

/// Refund the payload to the sender when possible and report the convoy failed.
fn fail_convoy(world: &mut World, convoy: &Convoy, reason: &str) -> (ConvoyStatus, String) {
    let refunded = world.players.contains_key(&convoy.sender_id)
        && world
            .update_player(convoy.sender_id, |s| s.credit_payload(&convoy.payload))
            .is_ok();
    let tail = if refunded {
        "; the payload returned to the sender"
    } else {
        "; the payload was lost"
    };
    (
        ConvoyStatus::Failed,
        format!("Convoy {} failed because {reason}{tail}", convoy.id),
    )
}
