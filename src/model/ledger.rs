use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Non-negative counters keyed by a catalog kind (resources, buildings, weapons).
///
/// Zero balances are not stored, so two ledgers holding the same amounts
/// compare equal. Debits are checked against the current balance and fail
/// without touching the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger<K: Ord>(BTreeMap<K, u64>);

impl<K: Ord> Default for Ledger<K> {
    fn default() -> Self {
        Self(BTreeMap::new())
    }
}

impl<K: Ord + Copy + fmt::Display> Ledger<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: K) -> u64 {
        self.0.get(&kind).copied().unwrap_or(0)
    }

    pub fn has(&self, kind: K, amount: u64) -> bool {
        self.get(kind) >= amount
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Non-zero entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (K, u64)> + '_ {
        self.0.iter().filter(|(_, v)| **v > 0).map(|(k, v)| (*k, *v))
    }

    pub fn total(&self) -> u64 {
        self.0.values().fold(0u64, |acc, v| acc.saturating_add(*v))
    }

    pub fn add(&mut self, kind: K, amount: u64) -> Result<(), GameError> {
        if amount == 0 {
            return Ok(());
        }
        let entry = self.0.entry(kind).or_insert(0);
        *entry = entry
            .checked_add(amount)
            .ok_or_else(|| GameError::overflow(&format!("{kind} balance")))?;
        Ok(())
    }

    pub fn sub(&mut self, kind: K, amount: u64) -> Result<(), GameError> {
        if amount == 0 {
            return Ok(());
        }
        let have = self.get(kind);
        if have < amount {
            return Err(GameError::validation(format!(
                "not enough {kind}: have {have}, need {amount}"
            )));
        }
        if have == amount {
            self.0.remove(&kind);
        } else {
            self.0.insert(kind, have - amount);
        }
        Ok(())
    }

    /// Check that every entry of `other` is available, reporting the first shortfall.
    pub fn covers(&self, other: &Ledger<K>) -> Result<(), GameError> {
        for (kind, amount) in other.iter() {
            let have = self.get(kind);
            if have < amount {
                return Err(GameError::validation(format!(
                    "not enough {kind}: have {have}, need {amount}"
                )));
            }
        }
        Ok(())
    }

    /// Debit every entry of `other`, or nothing at all.
    pub fn sub_all(&mut self, other: &Ledger<K>) -> Result<(), GameError> {
        self.covers(other)?;
        for (kind, amount) in other.iter() {
            self.sub(kind, amount)?;
        }
        Ok(())
    }

    pub fn add_all(&mut self, other: &Ledger<K>) -> Result<(), GameError> {
        let mut next = self.clone();
        for (kind, amount) in other.iter() {
            next.add(kind, amount)?;
        }
        *self = next;
        Ok(())
    }

    /// Every entry multiplied by `factor` (e.g. unit cost times quantity).
    pub fn scaled(&self, factor: u64) -> Result<Ledger<K>, GameError> {
        let mut out = Ledger::new();
        for (kind, amount) in self.iter() {
            let scaled = amount
                .checked_mul(factor)
                .ok_or_else(|| GameError::overflow(&format!("{kind} cost")))?;
            out.add(kind, scaled)?;
        }
        Ok(out)
    }

    /// Human-readable summary such as `iron: 50, oil: 10`.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k}: {v}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<K: Ord + Copy> FromIterator<(K, u64)> for Ledger<K> {
    fn from_iter<I: IntoIterator<Item = (K, u64)>>(iter: I) -> Self {
        let mut map = BTreeMap::new();
        for (k, v) in iter {
            if v > 0 {
                let entry = map.entry(k).or_insert(0u64);
                *entry = entry.saturating_add(v);
            }
        }
        Self(map)
    }
}

impl<K: Ord + Copy> From<&BTreeMap<K, u64>> for Ledger<K> {
    fn from(map: &BTreeMap<K, u64>) -> Self {
        map.iter().map(|(k, v)| (*k, *v)).collect()
    }
}
