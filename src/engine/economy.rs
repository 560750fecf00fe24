use std::sync::Arc;

use crate::catalog::{BuildingKind, Catalog, ResourceKind, WeaponKind};
use crate::error::GameError;
use crate::model::time::MINUTES_PER_HOUR;
use crate::model::{GameTime, Ledger, NewsKind, Player, World};

/// Minimum spacing between two income payments to the same player.
pub const INCOME_INTERVAL_MINUTES: u64 = 6 * MINUTES_PER_HOUR;

/// Everything one income cycle adds to (or converts within) a player's ledger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomeDelta {
    pub money: u64,
    pub population: u64,
    pub soldiers: u64,
    /// Resources extracted by mines.
    pub extracted: Ledger<ResourceKind>,
    /// Inputs consumed by refining buildings.
    pub consumed: Ledger<ResourceKind>,
    /// Outputs produced by refining buildings.
    pub refined: Ledger<ResourceKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomeReport {
    pub paid: Vec<u64>,
    /// Players already paid within the current interval.
    pub skipped: Vec<u64>,
    pub failed: Vec<(u64, String)>,
    pub total_money: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub player_id: u64,
    pub building: BuildingKind,
    /// Count of this building after construction.
    pub count: u64,
    pub money_spent: u64,
    pub resources_spent: Ledger<ResourceKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionOutcome {
    pub player_id: u64,
    pub weapon: WeaponKind,
    pub quantity: u64,
    /// Count of this weapon after production.
    pub stock: u64,
    pub money_spent: u64,
    pub resources_spent: Ledger<ResourceKind>,
    pub message: String,
}

fn checked_mul(a: u64, b: u64, what: &str) -> Result<u64, GameError> {
    a.checked_mul(b).ok_or_else(|| GameError::overflow(what))
}

fn checked_add(a: u64, b: u64, what: &str) -> Result<u64, GameError> {
    a.checked_add(b).ok_or_else(|| GameError::overflow(what))
}

/// Compute one cycle of income, growth, extraction and refining for a player
/// without touching the ledger.
pub fn compute_income(catalog: &Catalog, player: &Player) -> Result<IncomeDelta, GameError> {
    let mut delta = IncomeDelta::default();
    let mut conversion = 0u64;

    for (kind, count) in player.buildings.iter() {
        let spec = catalog.building(kind);
        delta.money = checked_add(delta.money, checked_mul(count, spec.income, "income")?, "income")?;
        delta.population = checked_add(
            delta.population,
            checked_mul(count, spec.population_growth, "population growth")?,
            "population growth",
        )?;
        conversion = checked_add(
            conversion,
            checked_mul(count, spec.soldier_conversion, "soldier conversion")?,
            "soldier conversion",
        )?;
        if let Some(production) = &spec.produces {
            let amount = checked_mul(count, production.amount, "extraction")?;
            delta.extracted.add(production.resource, amount)?;
        }
    }

    let population = checked_add(player.population, delta.population, "population")?;
    delta.soldiers = conversion.min(population.saturating_sub(player.soldiers));

    // Refining sees this cycle's extraction, and earlier refiners drain the
    // shared input first.
    let mut stock = player.resources.clone();
    stock.add_all(&delta.extracted)?;
    for (kind, count) in player.buildings.iter() {
        let Some(refining) = &catalog.building(kind).refining else {
            continue;
        };
        let capacity = checked_mul(count, refining.capacity, "refining capacity")?;
        let usable = capacity.min(stock.get(refining.input));
        let batches = usable / refining.input_per_output;
        if batches == 0 {
            continue;
        }
        let used = batches * refining.input_per_output;
        stock.sub(refining.input, used)?;
        delta.consumed.add(refining.input, used)?;
        delta.refined.add(refining.output, batches)?;
    }

    Ok(delta)
}

/// Apply a computed delta to a player and stamp the income time.
pub fn apply_income(player: &mut Player, delta: &IncomeDelta, now: GameTime) -> Result<(), GameError> {
    player.credit_money(delta.money)?;
    player.population = checked_add(player.population, delta.population, "population")?;
    player.soldiers = checked_add(player.soldiers, delta.soldiers, "soldiers")?;
    player.resources.add_all(&delta.extracted)?;
    player.resources.sub_all(&delta.consumed)?;
    player.resources.add_all(&delta.refined)?;
    player.last_income_at = Some(now);
    Ok(())
}

fn income_due(player: &Player, now: GameTime) -> bool {
    match player.last_income_at {
        None => true,
        Some(last) => last <= now && now.minutes_since(last) >= INCOME_INTERVAL_MINUTES,
    }
}

/// Pay every player one income cycle.
///
/// Each player is computed and committed on its own; a failure is logged and
/// skipped without affecting anyone else. Players paid less than
/// [`INCOME_INTERVAL_MINUTES`] ago are left alone, so re-running the cycle in
/// the same period never credits twice.
pub fn run_income_cycle(world: &mut World, now: GameTime) -> IncomeReport {
    let catalog = Arc::clone(&world.catalog);
    let ids: Vec<u64> = world.players.keys().copied().collect();
    let mut report = IncomeReport::default();

    for id in ids {
        let due = world.players.get(&id).is_some_and(|p| income_due(p, now));
        if !due {
            report.skipped.push(id);
            continue;
        }
        let result = world.update_player(id, |player| {
            let delta = compute_income(&catalog, player)?;
            apply_income(player, &delta, now)?;
            Ok(delta)
        });
        match result {
            Ok(delta) => {
                tracing::debug!(player_id = id, money = delta.money, "income paid");
                report.total_money = report.total_money.saturating_add(delta.money);
                report.paid.push(id);
            }
            Err(err) => {
                tracing::warn!(player_id = id, error = %err, "income cycle skipped player");
                report.failed.push((id, err.to_string()));
            }
        }
    }

    if !report.paid.is_empty() {
        world.push_news(
            NewsKind::IncomePaid,
            now,
            format!(
                "Income cycle paid {} countries a total of {}",
                report.paid.len(),
                report.total_money
            ),
            Vec::new(),
        );
    }
    tracing::info!(
        paid = report.paid.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "income cycle complete"
    );
    report
}

/// Construct one building, paying its cost after checking prerequisites.
pub fn build_structure(
    world: &mut World,
    player_id: u64,
    kind: BuildingKind,
    now: GameTime,
) -> Result<BuildOutcome, GameError> {
    let catalog = Arc::clone(&world.catalog);
    let spec = catalog.building(kind);
    let cost = Ledger::from(&spec.cost_resources);

    let (count, country) = world.update_player(player_id, |player| {
        for required in &spec.requires {
            if player.buildings.get(*required) == 0 {
                return Err(GameError::validation(format!(
                    "{} requires a {} first",
                    spec.name,
                    catalog.building(*required).name
                )));
            }
        }
        if player.money < spec.cost_money {
            return Err(GameError::validation(format!(
                "{} costs {} but you have {}",
                spec.name, spec.cost_money, player.money
            )));
        }
        player.resources.covers(&cost)?;
        player.debit_money(spec.cost_money)?;
        player.resources.sub_all(&cost)?;
        player.buildings.add(kind, 1)?;
        Ok((player.buildings.get(kind), player.country.clone()))
    })?;

    let message = format!("{} built a {} ({} total)", country, spec.name, count);
    world.push_news(NewsKind::StructureBuilt, now, message.clone(), vec![player_id]);
    tracing::debug!(player_id, building = %kind, count, "structure built");

    Ok(BuildOutcome {
        player_id,
        building: kind,
        count,
        money_spent: spec.cost_money,
        resources_spent: cost,
        message,
    })
}

/// Produce `quantity` units of a weapon; requires the weapon's gating building.
pub fn produce_weapon(
    world: &mut World,
    player_id: u64,
    kind: WeaponKind,
    quantity: u64,
    now: GameTime,
) -> Result<ProductionOutcome, GameError> {
    if quantity == 0 {
        return Err(GameError::validation("quantity must be at least 1"));
    }
    let catalog = Arc::clone(&world.catalog);
    let spec = catalog.weapon(kind);
    let money = checked_mul(spec.cost_money, quantity, "weapon cost")?;
    let cost = Ledger::from(&spec.cost_resources).scaled(quantity)?;

    let (stock, country) = world.update_player(player_id, |player| {
        if let Some(required) = spec.requires {
            if player.buildings.get(required) == 0 {
                return Err(GameError::validation(format!(
                    "producing {} requires a {}",
                    spec.name,
                    catalog.building(required).name
                )));
            }
        }
        if player.money < money {
            return Err(GameError::validation(format!(
                "{quantity} x {} costs {money} but you have {}",
                spec.name, player.money
            )));
        }
        player.resources.covers(&cost)?;
        player.debit_money(money)?;
        player.resources.sub_all(&cost)?;
        player.weapons.add(kind, quantity)?;
        Ok((player.weapons.get(kind), player.country.clone()))
    })?;

    let message = format!("{country} produced {quantity} x {}", spec.name);
    world.push_news(NewsKind::WeaponProduced, now, message.clone(), vec![player_id]);
    tracing::debug!(player_id, weapon = %kind, quantity, "weapons produced");

    Ok(ProductionOutcome {
        player_id,
        weapon: kind,
        quantity,
        stock,
        money_spent: money,
        resources_spent: cost,
        message,
    })
}
