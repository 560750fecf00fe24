use serde::{Deserialize, Serialize};

use super::convoy::Payload;
use super::ledger::Ledger;
use super::time::GameTime;
use crate::catalog::{BuildingKind, ResourceKind, StartingLedger, WeaponKind};
use crate::error::GameError;

/// A player who has claimed a country, with all of their persisted counters.
///
/// Invariant: `soldiers <= population`. Every counter is unsigned, so balances
/// can never go negative; debits that would overdraw are rejected instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub country: String,
    pub money: u64,
    pub population: u64,
    pub soldiers: u64,
    #[serde(default)]
    pub resources: Ledger<ResourceKind>,
    #[serde(default)]
    pub buildings: Ledger<BuildingKind>,
    #[serde(default)]
    pub weapons: Ledger<WeaponKind>,
    pub joined_at: GameTime,
    /// When this player last received an income cycle; guards against double credit.
    #[serde(default)]
    pub last_income_at: Option<GameTime>,
}

impl Player {
    pub fn new(
        id: u64,
        name: String,
        country: String,
        starting: &StartingLedger,
        now: GameTime,
    ) -> Self {
        Self {
            id,
            name,
            country,
            money: starting.money,
            population: starting.population,
            soldiers: starting.soldiers.min(starting.population),
            resources: Ledger::from(&starting.resources),
            buildings: Ledger::new(),
            weapons: Ledger::new(),
            joined_at: now,
            last_income_at: None,
        }
    }

    pub fn credit_money(&mut self, amount: u64) -> Result<(), GameError> {
        self.money = self
            .money
            .checked_add(amount)
            .ok_or_else(|| GameError::overflow("money balance"))?;
        Ok(())
    }

    pub fn debit_money(&mut self, amount: u64) -> Result<(), GameError> {
        if self.money < amount {
            return Err(GameError::validation(format!(
                "not enough money: have {}, need {amount}",
                self.money
            )));
        }
        self.money -= amount;
        Ok(())
    }

    /// Remove up to `count` soldiers; returns how many were actually lost.
    pub fn lose_soldiers(&mut self, count: u64) -> u64 {
        let lost = count.min(self.soldiers);
        self.soldiers -= lost;
        lost
    }

    /// Validate and debit a whole payload (money and resources) in one step.
    pub fn debit_payload(&mut self, payload: &Payload) -> Result<(), GameError> {
        if self.money < payload.money {
            return Err(GameError::validation(format!(
                "not enough money: have {}, need {}",
                self.money, payload.money
            )));
        }
        self.resources.covers(&payload.resources)?;
        self.money -= payload.money;
        self.resources.sub_all(&payload.resources)
    }

    pub fn credit_payload(&mut self, payload: &Payload) -> Result<(), GameError> {
        let money = self
            .money
            .checked_add(payload.money)
            .ok_or_else(|| GameError::overflow("money balance"))?;
        self.resources.add_all(&payload.resources)?;
        self.money = money;
        Ok(())
    }

    pub fn check_invariants(&self) -> Result<(), String> {
        if self.soldiers > self.population {
            return Err(format!(
                "player {} has {} soldiers but only {} population",
                self.id, self.soldiers, self.population
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn starting() -> StartingLedger {
        StartingLedger {
            money: 1000,
            population: 100,
            soldiers: 10,
            resources: BTreeMap::from([(ResourceKind::Iron, 5)]),
        }
    }

    fn player() -> Player {
        Player::new(1, "Ada".into(), "ir".into(), &starting(), GameTime::EPOCH)
    }

    #[test]
    fn new_player_gets_starting_ledger() {
        let p = player();
        assert_eq!(p.money, 1000);
        assert_eq!(p.resources.get(ResourceKind::Iron), 5);
        assert!(p.buildings.is_empty());
        assert!(p.check_invariants().is_ok());
    }

    #[test]
    fn debit_money_rejects_overdraft() {
        let mut p = player();
        assert!(p.debit_money(1001).is_err());
        assert_eq!(p.money, 1000);
        p.debit_money(400).unwrap();
        assert_eq!(p.money, 600);
    }

    #[test]
    fn lose_soldiers_never_below_zero() {
        let mut p = player();
        assert_eq!(p.lose_soldiers(25), 10);
        assert_eq!(p.soldiers, 0);
    }

    #[test]
    fn payload_debit_all_or_nothing() {
        let mut p = player();
        let payload = Payload {
            money: 500,
            resources: [(ResourceKind::Iron, 6)].into_iter().collect(),
        };
        assert!(p.debit_payload(&payload).is_err());
        assert_eq!(p.money, 1000);
        assert_eq!(p.resources.get(ResourceKind::Iron), 5);

        let payload = Payload {
            money: 500,
            resources: [(ResourceKind::Iron, 5)].into_iter().collect(),
        };
        p.debit_payload(&payload).unwrap();
        assert_eq!(p.money, 500);
        assert_eq!(p.resources.get(ResourceKind::Iron), 0);

        p.credit_payload(&payload).unwrap();
        assert_eq!(p.money, 1000);
        assert_eq!(p.resources.get(ResourceKind::Iron), 5);
    }
}
