//! Battle resolution.
//!
//! An attack moves through four steps: the request is validated (existence,
//! alliances, power and reach), the battle is resolved with one random factor
//! per side, and the consequences are applied to both ledgers in one write.
//! Scheduled attacks run the same steps when their `due_at` passes.

use std::sync::Arc;

use rand::RngCore;

use super::chance::{portion, uniform};
use crate::catalog::{AttackType, Catalog, ResourceKind, WeaponCategory, WeaponKind};
use crate::error::GameError;
use crate::model::{AttackStatus, GameTime, Ledger, NewsKind, PendingAttack, World};

/// Share of the defender's total weapon power that counts toward defense.
pub const DEFENSE_SHARE: f64 = 0.3;
pub const AIR_DEFENSE_BONUS: u64 = 50;
pub const MISSILE_SHIELD_BONUS: u64 = 80;
pub const CYBER_SHIELD_BONUS: u64 = 20;

pub const MIN_ROLL: f64 = 0.8;
pub const MAX_ROLL: f64 = 1.2;

/// Damage never falls below this share of the winner's raw power.
pub const MIN_DAMAGE_SHARE: f64 = 0.1;

pub const DEFENDER_SOLDIER_LOSS: f64 = 0.5;
pub const ATTACKER_SOLDIER_LOSS: f64 = 0.3;
pub const DEFENDER_MAX_WEAPON_LOSS: f64 = 0.30;
pub const ATTACKER_MAX_WEAPON_LOSS: f64 = 0.15;
pub const MAX_PLUNDER_SHARE: f64 = 0.30;

/// Minutes before an attack on a neighbor lands.
pub const BORDER_ATTACK_DELAY_MINUTES: u64 = 10;
pub const MIN_ATTACK_DELAY_MINUTES: u64 = 5;
/// Distance covered per minute of delay for long-range attacks.
pub const KM_PER_DELAY_MINUTE: u64 = 200;

/// A validated attack request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackPlan {
    pub attacker_id: u64,
    pub defender_id: u64,
    pub attack_type: AttackType,
    /// Raw attack power over the weapons this attack type uses.
    pub attack_power: u64,
    pub adjacent: bool,
    pub distance_km: Option<u64>,
}

/// The randomized part of a battle. Holds no ledger changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    pub attack_raw: f64,
    pub defense_raw: f64,
    pub attack_roll: f64,
    pub defense_roll: f64,
    pub attacker_won: bool,
    pub damage: u64,
}

impl Battle {
    pub fn attack_effective(&self) -> f64 {
        self.attack_raw * self.attack_roll
    }

    pub fn defense_effective(&self) -> f64 {
        self.defense_raw * self.defense_roll
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Casualties {
    pub soldiers: u64,
    pub weapons: Ledger<WeaponKind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BattleReport {
    pub attacker_id: u64,
    pub defender_id: u64,
    pub attack_type: AttackType,
    pub battle: Battle,
    pub attacker_losses: Casualties,
    pub defender_losses: Casualties,
    pub plunder: Ledger<ResourceKind>,
    pub message: String,
}

/// How a scheduled attack ended.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackResolution {
    Fought(Box<BattleReport>),
    CalledOff { attack_id: u64, reason: String },
}

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

/// Sum of `count * power` over weapons whose category passes `filter`.
pub fn weapon_power(
    catalog: &Catalog,
    weapons: &Ledger<WeaponKind>,
    filter: impl Fn(WeaponCategory) -> bool,
) -> u64 {
    weapons
        .iter()
        .map(|(kind, count)| (catalog.weapon(kind), count))
        .filter(|(spec, _)| filter(spec.category))
        .fold(0u64, |acc, (spec, count)| {
            acc.saturating_add(count.saturating_mul(spec.power))
        })
}

pub fn attack_power(catalog: &Catalog, weapons: &Ledger<WeaponKind>, attack_type: AttackType) -> u64 {
    weapon_power(catalog, weapons, |cat| attack_type.uses(cat))
}

/// Passive defense against `attack_type`: a share of every weapon plus the
/// shields that counter it.
pub fn defense_power(
    catalog: &Catalog,
    weapons: &Ledger<WeaponKind>,
    attack_type: AttackType,
) -> f64 {
    let base = weapon_power(catalog, weapons, |_| true) as f64 * DEFENSE_SHARE;
    let mut bonus = weapons.get(WeaponKind::CyberShield) * CYBER_SHIELD_BONUS;
    if matches!(attack_type, AttackType::Air | AttackType::Mixed) {
        bonus += weapons.get(WeaponKind::AirDefense) * AIR_DEFENSE_BONUS;
    }
    if matches!(attack_type, AttackType::Missile | AttackType::Mixed) {
        bonus += weapons.get(WeaponKind::MissileShield) * MISSILE_SHIELD_BONUS;
    }
    base + bonus as f64
}

/// Longest range among owned weapons this attack type uses.
pub fn max_range_km(catalog: &Catalog, weapons: &Ledger<WeaponKind>, attack_type: AttackType) -> u64 {
    weapons
        .iter()
        .map(|(kind, _)| catalog.weapon(kind))
        .filter(|spec| attack_type.uses(spec.category))
        .map(|spec| spec.range_km)
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Validated
// ---------------------------------------------------------------------------

pub fn validate_attack(
    world: &World,
    attacker_id: u64,
    defender_id: u64,
    attack_type: AttackType,
) -> Result<AttackPlan, GameError> {
    if attacker_id == defender_id {
        return Err(GameError::validation("you cannot attack yourself"));
    }
    let attacker = world.player(attacker_id)?;
    let defender = world.player(defender_id)?;
    if world.are_allied(attacker_id, defender_id) {
        return Err(GameError::validation(format!(
            "{} is your ally; break the alliance before attacking",
            defender.country
        )));
    }

    let catalog = &world.catalog;
    let power = attack_power(catalog, &attacker.weapons, attack_type);
    if power == 0 {
        return Err(GameError::validation(format!(
            "you have no weapons for a {attack_type} attack"
        )));
    }

    let adjacent = catalog.are_adjacent(&attacker.country, &defender.country);
    let distance_km = catalog.distance_km(&attacker.country, &defender.country);
    if !adjacent {
        let range = max_range_km(catalog, &attacker.weapons, attack_type);
        match distance_km {
            Some(distance) if range >= distance => {}
            Some(distance) => {
                return Err(GameError::validation(format!(
                    "{} is {distance} km away but your {attack_type} weapons reach {range} km",
                    defender.country
                )));
            }
            None => {
                return Err(GameError::validation(format!(
                    "{} is out of reach",
                    defender.country
                )));
            }
        }
    }

    Ok(AttackPlan {
        attacker_id,
        defender_id,
        attack_type,
        attack_power: power,
        adjacent,
        distance_km,
    })
}

// ---------------------------------------------------------------------------
// Resolved
// ---------------------------------------------------------------------------

/// Roll both sides and decide the winner. The attacker must strictly exceed
/// the defender to win.
pub fn resolve_battle(plan: &AttackPlan, defense_raw: f64, rng: &mut dyn RngCore) -> Battle {
    let attack_raw = plan.attack_power as f64;
    let attack_roll = uniform(rng, MIN_ROLL, MAX_ROLL);
    let defense_roll = uniform(rng, MIN_ROLL, MAX_ROLL);
    let attack_eff = attack_raw * attack_roll;
    let defense_eff = defense_raw * defense_roll;
    let attacker_won = attack_eff > defense_eff;

    let winner_raw = if attacker_won { attack_raw } else { defense_raw };
    let damage = (attack_eff - defense_eff)
        .abs()
        .max(winner_raw * MIN_DAMAGE_SHARE)
        .round()
        .max(1.0) as u64;

    Battle {
        attack_raw,
        defense_raw,
        attack_roll,
        defense_roll,
        attacker_won,
        damage,
    }
}

// ---------------------------------------------------------------------------
// Applied
// ---------------------------------------------------------------------------

/// Write the battle's consequences to both players in one commit, computing
/// every loss from the balances held at this moment.
pub fn apply_battle(
    world: &mut World,
    plan: &AttackPlan,
    battle: Battle,
    rng: &mut dyn RngCore,
) -> Result<BattleReport, GameError> {
    let catalog = Arc::clone(&world.catalog);
    let mut attacker_losses = Casualties::default();
    let mut defender_losses = Casualties::default();
    let mut plunder = Ledger::new();

    let (attacker_country, defender_country) =
        world.update_players(plan.attacker_id, plan.defender_id, |attacker, defender| {
            if battle.attacker_won {
                let soldiers = (battle.damage as f64 * DEFENDER_SOLDIER_LOSS) as u64;
                defender_losses.soldiers = defender.lose_soldiers(soldiers);

                let held: Vec<(WeaponKind, u64)> = defender.weapons.iter().collect();
                for (kind, count) in held {
                    let lost = portion(count, uniform(rng, 0.0, DEFENDER_MAX_WEAPON_LOSS));
                    defender.weapons.sub(kind, lost)?;
                    defender_losses.weapons.add(kind, lost)?;
                }

                let share = (MAX_PLUNDER_SHARE * battle.damage as f64 / battle.attack_raw)
                    .min(MAX_PLUNDER_SHARE);
                let stock: Vec<(ResourceKind, u64)> = defender.resources.iter().collect();
                for (kind, amount) in stock {
                    let taken = portion(amount, share);
                    if taken == 0 {
                        continue;
                    }
                    defender.resources.sub(kind, taken)?;
                    attacker.resources.add(kind, taken)?;
                    plunder.add(kind, taken)?;
                }
            } else {
                let soldiers = (battle.damage as f64 * ATTACKER_SOLDIER_LOSS) as u64;
                attacker_losses.soldiers = attacker.lose_soldiers(soldiers);

                let used: Vec<(WeaponKind, u64)> = attacker
                    .weapons
                    .iter()
                    .filter(|(kind, _)| plan.attack_type.uses(catalog.weapon(*kind).category))
                    .collect();
                for (kind, count) in used {
                    let lost = portion(count, uniform(rng, 0.0, ATTACKER_MAX_WEAPON_LOSS));
                    attacker.weapons.sub(kind, lost)?;
                    attacker_losses.weapons.add(kind, lost)?;
                }
            }
            Ok((attacker.country.clone(), defender.country.clone()))
        })?;

    let message = if battle.attacker_won {
        let mut msg = format!(
            "{attacker_country} defeated {defender_country} in a {} attack: {} damage, {} soldiers lost",
            plan.attack_type, battle.damage, defender_losses.soldiers
        );
        if !plunder.is_empty() {
            msg.push_str(&format!(", plundered {}", plunder.describe()));
        }
        msg
    } else {
        format!(
            "{defender_country} repelled a {} attack from {attacker_country}: {} damage, {} attacking soldiers lost",
            plan.attack_type, battle.damage, attacker_losses.soldiers
        )
    };

    Ok(BattleReport {
        attacker_id: plan.attacker_id,
        defender_id: plan.defender_id,
        attack_type: plan.attack_type,
        battle,
        attacker_losses,
        defender_losses,
        plunder,
        message,
    })
}

/// Validate, resolve and apply an attack right now.
pub fn attempt_attack(
    world: &mut World,
    rng: &mut dyn RngCore,
    attacker_id: u64,
    defender_id: u64,
    attack_type: AttackType,
    now: GameTime,
) -> Result<BattleReport, GameError> {
    let plan = validate_attack(world, attacker_id, defender_id, attack_type)?;
    fight(world, rng, &plan, now)
}

fn fight(
    world: &mut World,
    rng: &mut dyn RngCore,
    plan: &AttackPlan,
    now: GameTime,
) -> Result<BattleReport, GameError> {
    let defender = world.player(plan.defender_id)?;
    let defense_raw = defense_power(&world.catalog, &defender.weapons, plan.attack_type);
    let battle = resolve_battle(plan, defense_raw, rng);
    let report = apply_battle(world, plan, battle, rng)?;

    world.push_news(
        NewsKind::BattleResult,
        now,
        report.message.clone(),
        vec![plan.attacker_id, plan.defender_id],
    );
    tracing::info!(
        attacker_id = plan.attacker_id,
        defender_id = plan.defender_id,
        attacker_won = report.battle.attacker_won,
        damage = report.battle.damage,
        "battle resolved"
    );
    Ok(report)
}

// ---------------------------------------------------------------------------
// Scheduled attacks
// ---------------------------------------------------------------------------

/// Travel time for an attack between two countries.
pub fn attack_delay_minutes(plan: &AttackPlan) -> u64 {
    if plan.adjacent {
        return BORDER_ATTACK_DELAY_MINUTES;
    }
    let distance = plan.distance_km.unwrap_or(0);
    (distance / KM_PER_DELAY_MINUTE).max(MIN_ATTACK_DELAY_MINUTES)
}

/// Validate now and queue the battle for when the forces arrive.
pub fn schedule_attack(
    world: &mut World,
    attacker_id: u64,
    defender_id: u64,
    attack_type: AttackType,
    now: GameTime,
) -> Result<PendingAttack, GameError> {
    let plan = validate_attack(world, attacker_id, defender_id, attack_type)?;
    let id = world.next_id();
    let attack = PendingAttack {
        id,
        attacker_id,
        defender_id,
        attack_type,
        launched_at: now,
        due_at: now.plus_minutes(attack_delay_minutes(&plan)),
        status: AttackStatus::Scheduled,
        outcome: None,
    };
    world.pending_attacks.insert(id, attack.clone());

    let attacker = world.player(attacker_id)?.country.clone();
    let defender = world.player(defender_id)?.country.clone();
    world.push_news(
        NewsKind::AttackLaunched,
        now,
        format!(
            "{attacker} launched a {attack_type} attack on {defender}, landing at {}",
            attack.due_at
        ),
        vec![attacker_id, defender_id],
    );
    tracing::debug!(attack_id = id, attacker_id, defender_id, due_at = %attack.due_at, "attack scheduled");
    Ok(attack)
}

/// Resolve one scheduled attack. The attack is re-validated against the
/// current world and is marked resolved or cancelled exactly once.
pub fn resolve_pending_attack(
    world: &mut World,
    rng: &mut dyn RngCore,
    attack_id: u64,
    now: GameTime,
) -> Result<AttackResolution, GameError> {
    let attack = world
        .pending_attacks
        .get(&attack_id)
        .cloned()
        .ok_or(GameError::NotFound {
            entity: "attack",
            id: attack_id,
        })?;
    if !attack.is_due(now) {
        return Err(GameError::Conflict(format!(
            "attack {attack_id} is {} and due at {}",
            attack.status, attack.due_at
        )));
    }

    let result = validate_attack(world, attack.attacker_id, attack.defender_id, attack.attack_type)
        .and_then(|plan| fight(world, rng, &plan, now));

    let (status, outcome, resolution) = match result {
        Ok(report) => (
            AttackStatus::Resolved,
            report.message.clone(),
            AttackResolution::Fought(Box::new(report)),
        ),
        Err(err) => {
            let reason = format!("attack called off: {err}");
            world.push_news(
                NewsKind::AttackCalledOff,
                now,
                reason.clone(),
                vec![attack.attacker_id, attack.defender_id],
            );
            (
                AttackStatus::Cancelled,
                reason.clone(),
                AttackResolution::CalledOff { attack_id, reason },
            )
        }
    };

    if let Some(row) = world.pending_attacks.get_mut(&attack_id) {
        row.status = status;
        row.outcome = Some(outcome);
    }
    Ok(resolution)
}

/// Ids of scheduled attacks whose time has come, oldest first.
pub fn due_attacks(world: &World, now: GameTime) -> Vec<u64> {
    let mut due: Vec<&PendingAttack> = world
        .pending_attacks
        .values()
        .filter(|a| a.is_due(now))
        .collect();
    due.sort_by_key(|a| (a.due_at, a.id));
    due.into_iter().map(|a| a.id).collect()
}
