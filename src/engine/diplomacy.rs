//! Alliances. Allies cannot attack each other or intercept each other's convoys.

use crate::error::GameError;
use crate::model::world::alliance_key;
use crate::model::{GameTime, NewsKind, World};

fn countries(world: &World, a: u64, b: u64) -> Result<(String, String), GameError> {
    Ok((
        world.player(a)?.country.clone(),
        world.player(b)?.country.clone(),
    ))
}

pub fn request_alliance(
    world: &mut World,
    from: u64,
    to: u64,
    now: GameTime,
) -> Result<(), GameError> {
    if from == to {
        return Err(GameError::validation("you cannot ally with yourself"));
    }
    let (from_country, to_country) = countries(world, from, to)?;
    if world.are_allied(from, to) {
        return Err(GameError::validation(format!(
            "you are already allied with {to_country}"
        )));
    }
    if world.alliance_requests.contains(&(from, to)) {
        return Err(GameError::validation(format!(
            "an alliance request to {to_country} is already pending"
        )));
    }
    world.alliance_requests.insert((from, to));
    world.push_news(
        NewsKind::AllianceRequested,
        now,
        format!("{from_country} proposed an alliance to {to_country}"),
        vec![from, to],
    );
    Ok(())
}

/// Accept a pending request sent by `from` to `player`.
pub fn accept_alliance(
    world: &mut World,
    player: u64,
    from: u64,
    now: GameTime,
) -> Result<(), GameError> {
    let (player_country, from_country) = countries(world, player, from)?;
    if !world.alliance_requests.remove(&(from, player)) {
        return Err(GameError::NotFound {
            entity: "alliance request from player",
            id: from,
        });
    }
    world.alliance_requests.remove(&(player, from));
    world.alliances.insert(alliance_key(player, from));
    world.push_news(
        NewsKind::AllianceFormed,
        now,
        format!("{player_country} and {from_country} formed an alliance"),
        vec![player, from],
    );
    tracing::debug!(player, from, "alliance formed");
    Ok(())
}

pub fn decline_alliance(world: &mut World, player: u64, from: u64) -> Result<(), GameError> {
    if !world.alliance_requests.remove(&(from, player)) {
        return Err(GameError::NotFound {
            entity: "alliance request from player",
            id: from,
        });
    }
    Ok(())
}

pub fn break_alliance(
    world: &mut World,
    player: u64,
    other: u64,
    now: GameTime,
) -> Result<(), GameError> {
    let (player_country, other_country) = countries(world, player, other)?;
    if !world.alliances.remove(&alliance_key(player, other)) {
        return Err(GameError::validation(format!(
            "you are not allied with {other_country}"
        )));
    }
    world.push_news(
        NewsKind::AllianceBroken,
        now,
        format!("{player_country} broke its alliance with {other_country}"),
        vec![player, other],
    );
    Ok(())
}

/// Ids of everyone allied with `player`.
pub fn allies_of(world: &World, player: u64) -> Vec<u64> {
    world
        .alliances
        .iter()
        .filter_map(|&(a, b)| {
            if a == player {
                Some(b)
            } else if b == player {
                Some(a)
            } else {
                None
            }
        })
        .collect()
}
