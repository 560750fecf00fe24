use crate::error::GameError;
use crate::model::{GameTime, NewsKind, Player, World};

/// Register a player under `country` with the catalog's starting ledger.
///
/// `player_id` is the caller's identity (e.g. the chat user id), so it is
/// taken as given rather than generated.
pub fn join(
    world: &mut World,
    player_id: u64,
    name: &str,
    country: &str,
    now: GameTime,
) -> Result<Player, GameError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GameError::validation("name cannot be empty"));
    }
    let code = country.trim().to_lowercase();
    let spec = world
        .catalog
        .country(&code)
        .ok_or_else(|| GameError::validation(format!("unknown country: {country}")))?;
    let country_name = spec.name.clone();
    if world.players.contains_key(&player_id) {
        return Err(GameError::validation("you already rule a country"));
    }
    if world.player_by_country(&code).is_some() {
        return Err(GameError::validation(format!(
            "{country_name} is already taken"
        )));
    }

    let player = Player::new(
        player_id,
        name.to_string(),
        code,
        world.catalog.starting(),
        now,
    );
    world.players.insert(player_id, player.clone());
    world.push_news(
        NewsKind::PlayerJoined,
        now,
        format!("{name} now rules {country_name}"),
        vec![player_id],
    );
    tracing::info!(player_id, country = %player.country, "player joined");
    Ok(player)
}

/// Catalog countries nobody has claimed yet.
pub fn free_countries(world: &World) -> Vec<String> {
    world
        .catalog
        .countries()
        .filter(|c| world.player_by_country(&c.code).is_none())
        .map(|c| c.code.clone())
        .collect()
}
