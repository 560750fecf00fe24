//! Game rules. Every operation takes the world by `&mut`, validates before it
//! mutates, and records news for whatever it committed.

pub mod admin;
pub mod chance;
pub mod combat;
pub mod convoy;
pub mod diplomacy;
pub mod economy;
pub mod market;
pub mod players;

use rand::RngCore;

pub use admin::{AuthorizationPolicy, StaticAdminPolicy};
pub use combat::{AttackResolution, BattleReport};
pub use convoy::{ConvoyOrder, ConvoyResolution};
pub use economy::{IncomeReport, run_income_cycle};

use crate::model::{GameTime, MarketTransaction, World};

/// What one sweep resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepReport {
    pub convoys: Vec<ConvoyResolution>,
    pub attacks: Vec<AttackResolution>,
    /// Paid purchases whose delivery was still pending.
    pub deliveries: Vec<MarketTransaction>,
    /// Items that errored and were left for the next sweep.
    pub failed: Vec<(u64, String)>,
}

/// Resolve every convoy that has arrived and every scheduled attack that is
/// due, and settle any purchase left pending.
///
/// Only items that are due and still open are picked up, and each resolution
/// closes its item, so calling this twice for the same `now` resolves nothing
/// the second time. One failing item is logged and does not stop the rest.
pub fn sweep_convoys_and_attacks(
    world: &mut World,
    rng: &mut dyn RngCore,
    now: GameTime,
) -> SweepReport {
    let mut report = SweepReport::default();

    for id in convoy::due_convoys(world, now) {
        match convoy::resolve_convoy(world, rng, id, now) {
            Ok(resolution) => report.convoys.push(resolution),
            Err(err) => {
                tracing::warn!(convoy_id = id, error = %err, "convoy resolution skipped");
                report.failed.push((id, err.to_string()));
            }
        }
    }

    for id in combat::due_attacks(world, now) {
        match combat::resolve_pending_attack(world, rng, id, now) {
            Ok(resolution) => report.attacks.push(resolution),
            Err(err) => {
                tracing::warn!(attack_id = id, error = %err, "attack resolution skipped");
                report.failed.push((id, err.to_string()));
            }
        }
    }

    for id in market::pending_transactions(world) {
        match market::settle_delivery(world, rng, id, now) {
            Ok((settled, _)) => report.deliveries.push(settled),
            Err(err) => {
                tracing::warn!(transaction_id = id, error = %err, "delivery skipped");
                report.failed.push((id, err.to_string()));
            }
        }
    }

    if !report.convoys.is_empty() || !report.attacks.is_empty() || !report.deliveries.is_empty()
    {
        tracing::info!(
            convoys = report.convoys.len(),
            attacks = report.attacks.len(),
            deliveries = report.deliveries.len(),
            failed = report.failed.len(),
            "sweep complete"
        );
    }
    report
}
