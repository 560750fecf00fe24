use nations_engine::catalog::{AttackType, ResourceKind, WeaponKind};
use nations_engine::engine::{StaticAdminPolicy, admin, combat, convoy, diplomacy, market};
use nations_engine::model::{MarketItem, Payload, World};
use nations_engine::testutil::{FixedRng, TestWorld, minutes};

pub const ADMIN: u64 = 9_000;

/// Three players with one of everything: a convoy in flight, a listing with a
/// delivered sale, an alliance, a pending request, a scheduled attack and an
/// admin grant. Eight news items in total.
pub fn build_test_world() -> World {
    let mut t = TestWorld::new();
    let ir = t.player("ir");
    let iq = t.player("iq");
    let tr = t.player("tr");
    t.give_resource(ir, ResourceKind::Iron, 100);
    t.give_weapon(ir, WeaponKind::Tank, 4);

    convoy::create_convoy(
        &mut t.world,
        ir,
        iq,
        convoy::ConvoyOrder::new(Payload::money(10_000)),
        minutes(0),
    )
    .unwrap();

    let listing = market::create_listing(
        &mut t.world,
        ir,
        MarketItem::Resource(ResourceKind::Iron),
        50,
        10,
        minutes(1),
    )
    .unwrap();
    market::purchase(
        &mut t.world,
        &mut FixedRng::low(),
        iq,
        listing.listing.id,
        20,
        minutes(2),
    )
    .unwrap();

    diplomacy::request_alliance(&mut t.world, iq, tr, minutes(3)).unwrap();
    diplomacy::accept_alliance(&mut t.world, tr, iq, minutes(3)).unwrap();
    diplomacy::request_alliance(&mut t.world, ir, tr, minutes(4)).unwrap();

    combat::schedule_attack(&mut t.world, ir, iq, AttackType::Ground, minutes(5)).unwrap();

    let policy = StaticAdminPolicy::new([ADMIN]);
    admin::grant_money(&mut t.world, &policy, ADMIN, tr, 500, minutes(6)).unwrap();

    t.world.current_time = minutes(6);
    t.world
}

pub fn read_lines(path: &std::path::Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}
