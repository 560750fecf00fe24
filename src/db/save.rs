use std::fmt::Display;

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::model::World;

/// Replace the stored snapshot with `world` using COPY FROM STDIN (text format).
///
/// Runs in one transaction: readers see either the previous snapshot or
/// this one, never a mix.
pub async fn save_world(pool: &PgPool, world: &World) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        "TRUNCATE players, convoys, market_listings, market_transactions, \
         pending_attacks, alliances, alliance_requests, admin_log, news, game_state",
    )
    .execute(&mut *tx)
    .await?;

    // Players
    {
        let mut buf = String::new();
        for p in world.players.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                p.id,
                escape(&p.name),
                escape(&p.country),
                p.money,
                p.population,
                p.soldiers,
                json(&p.resources)?,
                json(&p.buildings)?,
                json(&p.weapons)?,
                p.joined_at.minutes(),
                opt(p.last_income_at.map(|t| t.minutes())),
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_players.sql"), &buf).await?;
    }

    // Convoys
    {
        let mut buf = String::new();
        for c in world.convoys.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                c.id,
                c.sender_id,
                c.receiver_id,
                json(&c.payload)?,
                opt(c.transport),
                c.created_at.minutes(),
                c.arrival_at.minutes(),
                c.security,
                c.escort_power,
                json(&c.escorts)?,
                c.status,
                opt(c.intercepted_by),
                opt(c.resolved_at.map(|t| t.minutes())),
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_convoys.sql"), &buf).await?;
    }

    // Listings
    {
        let mut buf = String::new();
        for l in world.listings.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                l.id,
                l.seller_id,
                json(&l.item)?,
                l.quantity,
                l.unit_price,
                l.security,
                l.status,
                l.created_at.minutes(),
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_market_listings.sql"), &buf).await?;
    }

    // Transactions
    {
        let mut buf = String::new();
        for t in world.transactions.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                t.id,
                t.listing_id,
                t.buyer_id,
                t.seller_id,
                json(&t.item)?,
                t.quantity,
                t.paid,
                t.status,
                t.created_at.minutes(),
            ));
        }
        copy_in(
            &mut tx,
            include_str!("../../sql/copy_market_transactions.sql"),
            &buf,
        )
        .await?;
    }

    // Scheduled attacks
    {
        let mut buf = String::new();
        for a in world.pending_attacks.values() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                a.id,
                a.attacker_id,
                a.defender_id,
                a.attack_type,
                a.launched_at.minutes(),
                a.due_at.minutes(),
                a.status,
                a.outcome.as_deref().map(escape).unwrap_or_else(null),
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_pending_attacks.sql"), &buf).await?;
    }

    // Admin log
    {
        let mut buf = String::new();
        for (seq, entry) in world.admin_log.iter().enumerate() {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\n",
                seq,
                entry.actor_id,
                escape(&entry.action),
                opt(entry.target_id),
                escape(&entry.detail),
                entry.at.minutes(),
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_admin_log.sql"), &buf).await?;
    }

    // News
    {
        let mut buf = String::new();
        for n in &world.news {
            buf.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                n.id,
                n.kind,
                n.at.minutes(),
                escape(&n.message),
                json(&n.subjects)?,
            ));
        }
        copy_in(&mut tx, include_str!("../../sql/copy_news.sql"), &buf).await?;
    }

    for &(a, b) in &world.alliances {
        sqlx::query("INSERT INTO alliances (player_a, player_b) VALUES ($1, $2)")
            .bind(to_i64(a)?)
            .bind(to_i64(b)?)
            .execute(&mut *tx)
            .await?;
    }
    for &(from, to) in &world.alliance_requests {
        sqlx::query("INSERT INTO alliance_requests (from_id, to_id) VALUES ($1, $2)")
            .bind(to_i64(from)?)
            .bind(to_i64(to)?)
            .execute(&mut *tx)
            .await?;
    }

    sqlx::query("INSERT INTO game_state (id, next_id, clock_minutes) VALUES (1, $1, $2)")
        .bind(to_i64(world.id_gen.peek())?)
        .bind(to_i64(world.current_time.minutes())?)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    tracing::info!(
        players = world.players.len(),
        convoys = world.convoys.len(),
        news = world.news.len(),
        "world saved"
    );
    Ok(())
}

/// Execute a COPY FROM STDIN with the given text-format payload.
async fn copy_in(conn: &mut PgConnection, statement: &str, data: &str) -> Result<(), sqlx::Error> {
    let mut copy = conn.copy_in_raw(statement).await?;
    copy.send(data.as_bytes()).await?;
    copy.finish().await?;
    Ok(())
}

/// Escape a string for Postgres COPY text format.
/// Backslash must be escaped first, then the special whitespace characters.
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

fn null() -> String {
    "\\N".to_string()
}

/// Render an optional value as a COPY text value (`\N` for NULL).
fn opt<T: Display>(v: Option<T>) -> String {
    match v {
        Some(v) => escape(&v.to_string()),
        None => null(),
    }
}

/// Serialize a value as an escaped JSON document for a JSONB column.
fn json<T: Serialize>(val: &T) -> Result<String, sqlx::Error> {
    let text = serde_json::to_string(val).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
    Ok(escape(&text))
}

fn to_i64(v: u64) -> Result<i64, sqlx::Error> {
    i64::try_from(v).map_err(|e| sqlx::Error::Encode(Box::new(e)))
}
