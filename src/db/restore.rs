use std::str::FromStr;
use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use crate::catalog::Catalog;
use crate::id::IdGenerator;
use crate::model::{
    AdminLogEntry, Convoy, GameTime, MarketListing, MarketTransaction, News, PendingAttack,
    Player, World,
};

/// Rebuild a [`World`] from the snapshot written by [`super::save_world`].
///
/// Kind names, statuses and ledger keys are validated on the way in; an
/// unknown name fails the whole restore with a decode error.
pub async fn restore_world(pool: &PgPool, catalog: Arc<Catalog>) -> Result<World, sqlx::Error> {
    let mut world = World::new(catalog);

    let state = sqlx::query("SELECT next_id, clock_minutes FROM game_state WHERE id = 1")
        .fetch_optional(pool)
        .await?;
    if let Some(row) = state {
        world.id_gen = IdGenerator::starting_from(unsigned(&row, "next_id")?);
        world.current_time = time(&row, "clock_minutes")?;
    }

    for row in sqlx::query(
        "SELECT id, name, country, money, population, soldiers, resources, buildings, \
         weapons, joined_at, last_income_at FROM players ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    {
        let player = Player {
            id: unsigned(&row, "id")?,
            name: row.try_get("name")?,
            country: row.try_get("country")?,
            money: unsigned(&row, "money")?,
            population: unsigned(&row, "population")?,
            soldiers: unsigned(&row, "soldiers")?,
            resources: row.try_get::<Json<_>, _>("resources")?.0,
            buildings: row.try_get::<Json<_>, _>("buildings")?.0,
            weapons: row.try_get::<Json<_>, _>("weapons")?.0,
            joined_at: time(&row, "joined_at")?,
            last_income_at: opt_time(&row, "last_income_at")?,
        };
        world.players.insert(player.id, player);
    }

    for row in sqlx::query(
        "SELECT id, sender_id, receiver_id, payload, transport, created_at, arrival_at, \
         security, escort_power, escorts, status, intercepted_by, resolved_at FROM convoys ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    {
        let transport: Option<String> = row.try_get("transport")?;
        let convoy = Convoy {
            id: unsigned(&row, "id")?,
            sender_id: unsigned(&row, "sender_id")?,
            receiver_id: unsigned(&row, "receiver_id")?,
            payload: row.try_get::<Json<_>, _>("payload")?.0,
            transport: transport.as_deref().map(parse).transpose()?,
            created_at: time(&row, "created_at")?,
            arrival_at: time(&row, "arrival_at")?,
            security: security(&row)?,
            escort_power: unsigned(&row, "escort_power")?,
            escorts: row.try_get::<Json<_>, _>("escorts")?.0,
            status: parse_column(&row, "status")?,
            intercepted_by: opt_unsigned(&row, "intercepted_by")?,
            resolved_at: opt_time(&row, "resolved_at")?,
        };
        world.convoys.insert(convoy.id, convoy);
    }

    for row in sqlx::query(
        "SELECT id, seller_id, item, quantity, unit_price, security, status, created_at \
         FROM market_listings ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    {
        let listing = MarketListing {
            id: unsigned(&row, "id")?,
            seller_id: unsigned(&row, "seller_id")?,
            item: row.try_get::<Json<_>, _>("item")?.0,
            quantity: unsigned(&row, "quantity")?,
            unit_price: unsigned(&row, "unit_price")?,
            security: security(&row)?,
            status: parse_column(&row, "status")?,
            created_at: time(&row, "created_at")?,
        };
        world.listings.insert(listing.id, listing);
    }

    for row in sqlx::query(
        "SELECT id, listing_id, buyer_id, seller_id, item, quantity, paid, status, created_at \
         FROM market_transactions ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    {
        let tx = MarketTransaction {
            id: unsigned(&row, "id")?,
            listing_id: unsigned(&row, "listing_id")?,
            buyer_id: unsigned(&row, "buyer_id")?,
            seller_id: unsigned(&row, "seller_id")?,
            item: row.try_get::<Json<_>, _>("item")?.0,
            quantity: unsigned(&row, "quantity")?,
            paid: unsigned(&row, "paid")?,
            status: parse_column(&row, "status")?,
            created_at: time(&row, "created_at")?,
        };
        world.transactions.insert(tx.id, tx);
    }

    for row in sqlx::query(
        "SELECT id, attacker_id, defender_id, attack_type, launched_at, due_at, status, outcome \
         FROM pending_attacks ORDER BY id",
    )
    .fetch_all(pool)
    .await?
    {
        let attack = PendingAttack {
            id: unsigned(&row, "id")?,
            attacker_id: unsigned(&row, "attacker_id")?,
            defender_id: unsigned(&row, "defender_id")?,
            attack_type: parse_column(&row, "attack_type")?,
            launched_at: time(&row, "launched_at")?,
            due_at: time(&row, "due_at")?,
            status: parse_column(&row, "status")?,
            outcome: row.try_get("outcome")?,
        };
        world.pending_attacks.insert(attack.id, attack);
    }

    for row in sqlx::query("SELECT player_a, player_b FROM alliances")
        .fetch_all(pool)
        .await?
    {
        world
            .alliances
            .insert((unsigned(&row, "player_a")?, unsigned(&row, "player_b")?));
    }

    for row in sqlx::query("SELECT from_id, to_id FROM alliance_requests")
        .fetch_all(pool)
        .await?
    {
        world
            .alliance_requests
            .insert((unsigned(&row, "from_id")?, unsigned(&row, "to_id")?));
    }

    for row in sqlx::query(
        "SELECT actor_id, action, target_id, detail, at FROM admin_log ORDER BY seq",
    )
    .fetch_all(pool)
    .await?
    {
        world.admin_log.push(AdminLogEntry {
            actor_id: unsigned(&row, "actor_id")?,
            action: row.try_get("action")?,
            target_id: opt_unsigned(&row, "target_id")?,
            detail: row.try_get("detail")?,
            at: time(&row, "at")?,
        });
    }

    for row in sqlx::query("SELECT id, kind, at, message, subjects FROM news ORDER BY id")
        .fetch_all(pool)
        .await?
    {
        world.news.push(News {
            id: unsigned(&row, "id")?,
            kind: parse_column(&row, "kind")?,
            at: time(&row, "at")?,
            message: row.try_get("message")?,
            subjects: row.try_get::<Json<_>, _>("subjects")?.0,
        });
    }

    world
        .check_invariants()
        .map_err(|msg| sqlx::Error::Decode(msg.into()))?;
    tracing::info!(
        players = world.players.len(),
        convoys = world.convoys.len(),
        "world restored"
    );
    Ok(world)
}

fn unsigned(row: &PgRow, column: &str) -> Result<u64, sqlx::Error> {
    let v: i64 = row.try_get(column)?;
    u64::try_from(v).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn opt_unsigned(row: &PgRow, column: &str) -> Result<Option<u64>, sqlx::Error> {
    let v: Option<i64> = row.try_get(column)?;
    v.map(|v| u64::try_from(v).map_err(|e| sqlx::Error::Decode(Box::new(e))))
        .transpose()
}

fn time(row: &PgRow, column: &str) -> Result<GameTime, sqlx::Error> {
    unsigned(row, column).map(GameTime::from_minutes)
}

fn opt_time(row: &PgRow, column: &str) -> Result<Option<GameTime>, sqlx::Error> {
    Ok(opt_unsigned(row, column)?.map(GameTime::from_minutes))
}

fn security(row: &PgRow) -> Result<u8, sqlx::Error> {
    let v: i16 = row.try_get("security")?;
    u8::try_from(v).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

fn parse<T: FromStr<Err = String>>(s: &str) -> Result<T, sqlx::Error> {
    s.parse().map_err(|msg: String| sqlx::Error::Decode(msg.into()))
}

fn parse_column<T: FromStr<Err = String>>(row: &PgRow, column: &str) -> Result<T, sqlx::Error> {
    let s: String = row.try_get(column)?;
    parse(&s)
}
