use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::model::World;

/// Write an iterator of serializable items to a JSONL file (one JSON object per line).
fn write_jsonl<T: Serialize>(path: &Path, items: impl Iterator<Item = T>) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for item in items {
        serde_json::to_writer(&mut writer, &item)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()
}

/// Flush the world state to JSONL files in the given output directory.
///
/// Creates the output directory if it does not exist. Writes one file per
/// table, each row as one JSON object:
/// - `players.jsonl` with ledgers inline
/// - `convoys.jsonl`
/// - `listings.jsonl`
/// - `transactions.jsonl`
/// - `attacks.jsonl`
/// - `news.jsonl`
/// - `admin_log.jsonl`
pub fn flush_to_jsonl(world: &World, output_dir: &Path) -> io::Result<()> {
    fs::create_dir_all(output_dir)?;

    write_jsonl(&output_dir.join("players.jsonl"), world.players.values())?;
    write_jsonl(&output_dir.join("convoys.jsonl"), world.convoys.values())?;
    write_jsonl(&output_dir.join("listings.jsonl"), world.listings.values())?;
    write_jsonl(
        &output_dir.join("transactions.jsonl"),
        world.transactions.values(),
    )?;
    write_jsonl(
        &output_dir.join("attacks.jsonl"),
        world.pending_attacks.values(),
    )?;
    write_jsonl(&output_dir.join("news.jsonl"), world.news.iter())?;
    write_jsonl(&output_dir.join("admin_log.jsonl"), world.admin_log.iter())?;

    Ok(())
}
