//! Static, read-only game data: what buildings and weapons cost and produce,
//! how transports move convoys, and where countries sit on the map.
//!
//! The catalog is parsed once (normally from the embedded `catalog.json`) and
//! validated so that every [`BuildingKind`] and [`WeaponKind`] has a definition.
//! Engines can therefore look specs up without handling a missing entry.

mod kinds;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use kinds::{AttackType, BuildingKind, ResourceKind, WeaponCategory, WeaponKind};

const BUILTIN_CATALOG: &str = include_str!("catalog.json");
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Production {
    pub resource: ResourceKind,
    pub amount: u64,
}

/// Resource conversion performed by each building per income cycle
/// (refineries turn oil into fuel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refining {
    pub input: ResourceKind,
    pub output: ResourceKind,
    /// Input units one building can process per cycle.
    pub capacity: u64,
    /// Input units consumed per output unit.
    pub input_per_output: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSpec {
    pub name: String,
    pub cost_money: u64,
    #[serde(default)]
    pub cost_resources: BTreeMap<ResourceKind, u64>,
    /// Buildings that must already exist (count >= 1) before this one can be built.
    #[serde(default)]
    pub requires: Vec<BuildingKind>,
    /// Money credited per building per income cycle.
    #[serde(default)]
    pub income: u64,
    #[serde(default)]
    pub produces: Option<Production>,
    #[serde(default)]
    pub population_growth: u64,
    #[serde(default)]
    pub soldier_conversion: u64,
    #[serde(default)]
    pub refining: Option<Refining>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponSpec {
    pub name: String,
    pub category: WeaponCategory,
    pub power: u64,
    #[serde(default)]
    pub range_km: u64,
    pub cost_money: u64,
    #[serde(default)]
    pub cost_resources: BTreeMap<ResourceKind, u64>,
    /// Building that gates production of this weapon.
    #[serde(default)]
    pub requires: Option<BuildingKind>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSpec {
    pub travel_minutes: u64,
    pub security_bonus: u8,
    /// Resource units one piece of equipment can carry.
    pub capacity_per_unit: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountrySpec {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub neighbors: Vec<String>,
    pub lat: f64,
    pub lon: f64,
}

/// Ledger values a player starts with after claiming a country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartingLedger {
    pub money: u64,
    pub population: u64,
    pub soldiers: u64,
    #[serde(default)]
    pub resources: BTreeMap<ResourceKind, u64>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read catalog from {path:?}: {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("catalog has no definition for building `{0}`")]
    MissingBuilding(BuildingKind),
    #[error("catalog has no definition for weapon `{0}`")]
    MissingWeapon(WeaponKind),
    #[error("building `{0}` lists itself as a prerequisite")]
    SelfPrerequisite(BuildingKind),
    #[error("transport entry `{0}` is not a transport-category weapon")]
    NotATransport(WeaponKind),
    #[error("transport weapon `{0}` has no transport entry")]
    MissingTransport(WeaponKind),
    #[error("country `{0}` is defined more than once")]
    DuplicateCountry(String),
    #[error("country `{country}` lists unknown neighbor `{neighbor}`")]
    UnknownNeighbor { country: String, neighbor: String },
    #[error("border between `{0}` and `{1}` is only declared on one side")]
    AsymmetricBorder(String, String),
    #[error("starting soldiers exceed starting population")]
    StartingSoldiers,
    #[error("building `{0}` has a refining ratio of zero")]
    ZeroRefiningRatio(BuildingKind),
}

#[derive(Debug, Deserialize)]
struct CatalogData {
    starting: StartingLedger,
    buildings: BTreeMap<BuildingKind, BuildingSpec>,
    weapons: BTreeMap<WeaponKind, WeaponSpec>,
    transports: BTreeMap<WeaponKind, TransportSpec>,
    countries: Vec<CountrySpec>,
}

#[derive(Debug, Clone)]
pub struct Catalog {
    starting: StartingLedger,
    buildings: BTreeMap<BuildingKind, BuildingSpec>,
    weapons: BTreeMap<WeaponKind, WeaponSpec>,
    transports: BTreeMap<WeaponKind, TransportSpec>,
    countries: BTreeMap<String, CountrySpec>,
    distances: BTreeMap<(String, String), u64>,
}

impl Catalog {
    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json_str(BUILTIN_CATALOG)
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;
        Self::from_data(data)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    fn from_data(data: CatalogData) -> Result<Self, CatalogError> {
        if data.starting.soldiers > data.starting.population {
            return Err(CatalogError::StartingSoldiers);
        }
        for kind in BuildingKind::ALL {
            let spec = data
                .buildings
                .get(kind)
                .ok_or(CatalogError::MissingBuilding(*kind))?;
            if spec.requires.contains(kind) {
                return Err(CatalogError::SelfPrerequisite(*kind));
            }
            if spec.refining.as_ref().is_some_and(|r| r.input_per_output == 0) {
                return Err(CatalogError::ZeroRefiningRatio(*kind));
            }
        }
        for kind in WeaponKind::ALL {
            let spec = data
                .weapons
                .get(kind)
                .ok_or(CatalogError::MissingWeapon(*kind))?;
            if spec.category == WeaponCategory::Transport && !data.transports.contains_key(kind) {
                return Err(CatalogError::MissingTransport(*kind));
            }
        }
        for kind in data.transports.keys() {
            if data.weapons[kind].category != WeaponCategory::Transport {
                return Err(CatalogError::NotATransport(*kind));
            }
        }

        let mut countries = BTreeMap::new();
        for country in data.countries {
            if countries.contains_key(&country.code) {
                return Err(CatalogError::DuplicateCountry(country.code));
            }
            countries.insert(country.code.clone(), country);
        }
        for country in countries.values() {
            for neighbor in &country.neighbors {
                let other =
                    countries
                        .get(neighbor)
                        .ok_or_else(|| CatalogError::UnknownNeighbor {
                            country: country.code.clone(),
                            neighbor: neighbor.clone(),
                        })?;
                if !other.neighbors.contains(&country.code) {
                    return Err(CatalogError::AsymmetricBorder(
                        country.code.clone(),
                        neighbor.clone(),
                    ));
                }
            }
        }

        let mut distances = BTreeMap::new();
        for a in countries.values() {
            for b in countries.values() {
                distances.insert((a.code.clone(), b.code.clone()), great_circle_km(a, b));
            }
        }

        Ok(Self {
            starting: data.starting,
            buildings: data.buildings,
            weapons: data.weapons,
            transports: data.transports,
            countries,
            distances,
        })
    }

    pub fn starting(&self) -> &StartingLedger {
        &self.starting
    }

    pub fn building(&self, kind: BuildingKind) -> &BuildingSpec {
        // Every kind is present; checked in `from_data`.
        &self.buildings[&kind]
    }

    pub fn buildings(&self) -> impl Iterator<Item = (BuildingKind, &BuildingSpec)> {
        self.buildings.iter().map(|(k, v)| (*k, v))
    }

    pub fn weapon(&self, kind: WeaponKind) -> &WeaponSpec {
        &self.weapons[&kind]
    }

    pub fn weapons(&self) -> impl Iterator<Item = (WeaponKind, &WeaponSpec)> {
        self.weapons.iter().map(|(k, v)| (*k, v))
    }

    pub fn transport(&self, kind: WeaponKind) -> Option<&TransportSpec> {
        self.transports.get(&kind)
    }

    pub fn country(&self, code: &str) -> Option<&CountrySpec> {
        self.countries.get(code)
    }

    pub fn countries(&self) -> impl Iterator<Item = &CountrySpec> {
        self.countries.values()
    }

    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        self.countries
            .get(a)
            .is_some_and(|c| c.neighbors.iter().any(|n| n == b))
    }

    /// Great-circle distance between two countries' reference points, in km.
    pub fn distance_km(&self, a: &str, b: &str) -> Option<u64> {
        self.distances
            .get(&(a.to_string(), b.to_string()))
            .copied()
    }
}

fn great_circle_km(a: &CountrySpec, b: &CountrySpec) -> u64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.lon - a.lon).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    (2.0 * EARTH_RADIUS_KM * h.sqrt().asin()).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_loads() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.building(BuildingKind::IronMine).cost_money, 80_000);
        assert!(catalog.building(BuildingKind::IronMine).cost_resources.is_empty());
        assert_eq!(
            catalog.weapon(WeaponKind::Tank).requires,
            Some(BuildingKind::WeaponFactory)
        );
        assert!(catalog.transport(WeaponKind::CargoPlane).is_some());
        assert!(catalog.transport(WeaponKind::Tank).is_none());
        assert_eq!(catalog.starting().money, 100_000);
    }

    #[test]
    fn transport_travel_times_within_bounds() {
        let catalog = Catalog::builtin().unwrap();
        for (kind, spec) in catalog.weapons() {
            if spec.category == WeaponCategory::Transport {
                let t = catalog.transport(kind).unwrap();
                assert!((10..=35).contains(&t.travel_minutes), "{kind}");
            }
        }
    }

    #[test]
    fn adjacency_is_symmetric() {
        let catalog = Catalog::builtin().unwrap();
        assert!(catalog.are_adjacent("ir", "iq"));
        assert!(catalog.are_adjacent("iq", "ir"));
        assert!(!catalog.are_adjacent("ir", "eg"));
        assert!(!catalog.are_adjacent("ir", "zz"));
    }

    #[test]
    fn distances_are_plausible() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.distance_km("ir", "ir"), Some(0));
        let tehran_baghdad = catalog.distance_km("ir", "iq").unwrap();
        assert!((600..800).contains(&tehran_baghdad), "{tehran_baghdad}");
        assert_eq!(
            catalog.distance_km("ir", "eg"),
            catalog.distance_km("eg", "ir")
        );
        assert_eq!(catalog.distance_km("ir", "zz"), None);
    }

    #[test]
    fn missing_building_rejected() {
        let json = r#"{
            "starting": {"money": 1, "population": 1, "soldiers": 0},
            "buildings": {},
            "weapons": {},
            "transports": {},
            "countries": []
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::MissingBuilding(_)), "{err}");
    }

    #[test]
    fn unknown_kind_in_catalog_rejected() {
        let json = r#"{
            "starting": {"money": 1, "population": 1, "soldiers": 0},
            "buildings": {"moon_base": {"name": "Moon Base", "cost_money": 1}},
            "weapons": {},
            "transports": {},
            "countries": []
        }"#;
        let err = Catalog::from_json_str(json).unwrap_err();
        assert!(matches!(err, CatalogError::Parse(_)), "{err}");
        assert!(err.to_string().contains("moon_base"), "{err}");
    }

    #[test]
    fn asymmetric_border_rejected() {
        let builtin: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        let mut data = builtin.clone();
        data["countries"] = serde_json::json!([
            {"code": "aa", "name": "A", "neighbors": ["bb"], "lat": 0.0, "lon": 0.0},
            {"code": "bb", "name": "B", "neighbors": [], "lat": 1.0, "lon": 1.0}
        ]);
        let err = Catalog::from_json_str(&data.to_string()).unwrap_err();
        assert!(matches!(err, CatalogError::AsymmetricBorder(_, _)), "{err}");
    }

    #[test]
    fn duplicate_country_rejected() {
        let builtin: serde_json::Value = serde_json::from_str(BUILTIN_CATALOG).unwrap();
        let mut data = builtin.clone();
        data["countries"] = serde_json::json!([
            {"code": "aa", "name": "A", "lat": 0.0, "lon": 0.0},
            {"code": "aa", "name": "A again", "lat": 1.0, "lon": 1.0}
        ]);
        let err = Catalog::from_json_str(&data.to_string()).unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateCountry(_)), "{err}");
    }
}
