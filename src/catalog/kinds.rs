use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ResourceKind {
    Iron,
    Copper,
    Oil,
    Fuel,
    Aluminum,
    Gold,
    Uranium,
    Lithium,
    Coal,
}

string_enum!(ResourceKind, "resource kind", {
    Iron => "iron",
    Copper => "copper",
    Oil => "oil",
    Fuel => "fuel",
    Aluminum => "aluminum",
    Gold => "gold",
    Uranium => "uranium",
    Lithium => "lithium",
    Coal => "coal",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum BuildingKind {
    IronMine,
    CopperMine,
    OilRig,
    AluminumMine,
    GoldMine,
    UraniumMine,
    LithiumMine,
    CoalMine,
    Refinery,
    PowerPlant,
    Farm,
    MilitaryBase,
    WeaponFactory,
    Airbase,
    Shipyard,
}

string_enum!(BuildingKind, "building kind", {
    IronMine => "iron_mine",
    CopperMine => "copper_mine",
    OilRig => "oil_rig",
    AluminumMine => "aluminum_mine",
    GoldMine => "gold_mine",
    UraniumMine => "uranium_mine",
    LithiumMine => "lithium_mine",
    CoalMine => "coal_mine",
    Refinery => "refinery",
    PowerPlant => "power_plant",
    Farm => "farm",
    MilitaryBase => "military_base",
    WeaponFactory => "weapon_factory",
    Airbase => "airbase",
    Shipyard => "shipyard",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WeaponKind {
    Rifle,
    Tank,
    Artillery,
    FighterJet,
    Bomber,
    Drone,
    Destroyer,
    Submarine,
    AircraftCarrier,
    BallisticMissile,
    CruiseMissile,
    AirDefense,
    MissileShield,
    CyberShield,
    TransportTruck,
    CargoPlane,
    CargoShip,
}

string_enum!(WeaponKind, "weapon kind", {
    Rifle => "rifle",
    Tank => "tank",
    Artillery => "artillery",
    FighterJet => "fighter_jet",
    Bomber => "bomber",
    Drone => "drone",
    Destroyer => "destroyer",
    Submarine => "submarine",
    AircraftCarrier => "aircraft_carrier",
    BallisticMissile => "ballistic_missile",
    CruiseMissile => "cruise_missile",
    AirDefense => "air_defense",
    MissileShield => "missile_shield",
    CyberShield => "cyber_shield",
    TransportTruck => "transport_truck",
    CargoPlane => "cargo_plane",
    CargoShip => "cargo_ship",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum WeaponCategory {
    Ground,
    Air,
    Naval,
    Missile,
    Defense,
    Transport,
}

string_enum!(WeaponCategory, "weapon category", {
    Ground => "ground",
    Air => "air",
    Naval => "naval",
    Missile => "missile",
    Defense => "defense",
    Transport => "transport",
});

/// The declared kind of an attack; selects which weapons take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AttackType {
    Ground,
    Air,
    Naval,
    Missile,
    Mixed,
}

string_enum!(AttackType, "attack type", {
    Ground => "ground",
    Air => "air",
    Naval => "naval",
    Missile => "missile",
    Mixed => "mixed",
});

impl AttackType {
    /// Weapon categories that contribute attack power for this attack type.
    pub fn categories(self) -> &'static [WeaponCategory] {
        match self {
            AttackType::Ground => &[WeaponCategory::Ground],
            AttackType::Air => &[WeaponCategory::Air],
            AttackType::Naval => &[WeaponCategory::Naval],
            AttackType::Missile => &[WeaponCategory::Missile],
            AttackType::Mixed => &[
                WeaponCategory::Ground,
                WeaponCategory::Air,
                WeaponCategory::Naval,
                WeaponCategory::Missile,
            ],
        }
    }

    pub fn uses(self, category: WeaponCategory) -> bool {
        self.categories().contains(&category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_round_trip_through_strings() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>(), Ok(*kind));
        }
        for kind in BuildingKind::ALL {
            assert_eq!(kind.as_str().parse::<BuildingKind>(), Ok(*kind));
        }
        for kind in WeaponKind::ALL {
            assert_eq!(kind.as_str().parse::<WeaponKind>(), Ok(*kind));
        }
    }

    #[test]
    fn unknown_kind_rejected() {
        let err = "unobtainium".parse::<ResourceKind>().unwrap_err();
        assert!(err.contains("unknown resource kind"), "{err}");
        assert!("".parse::<BuildingKind>().is_err());
        assert!(serde_json::from_str::<WeaponKind>("\"death_ray\"").is_err());
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&BuildingKind::WeaponFactory).unwrap();
        assert_eq!(json, "\"weapon_factory\"");
        let kind: WeaponKind = serde_json::from_str("\"fighter_jet\"").unwrap();
        assert_eq!(kind, WeaponKind::FighterJet);
    }

    #[test]
    fn mixed_attack_uses_every_offensive_category() {
        assert!(AttackType::Mixed.uses(WeaponCategory::Naval));
        assert!(AttackType::Mixed.uses(WeaponCategory::Missile));
        assert!(!AttackType::Mixed.uses(WeaponCategory::Defense));
        assert!(!AttackType::Mixed.uses(WeaponCategory::Transport));
        assert_eq!(AttackType::Air.categories(), &[WeaponCategory::Air]);
    }
}
