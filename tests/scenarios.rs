mod common;

use common::ADMIN;
use nations_engine::catalog::{AttackType, BuildingKind, ResourceKind, WeaponKind};
use nations_engine::engine::convoy::{self, ConvoyOrder};
use nations_engine::engine::{combat, sweep_convoys_and_attacks};
use nations_engine::model::{
    AttackStatus, ConvoyStatus, ListingStatus, MarketItem, Payload,
};
use nations_engine::testutil::{FixedRng, TestWorld, hours, minutes};
use nations_engine::{Game, GameConfig, GameError, NullNotifier};

fn new_game(seed: u64) -> Game {
    let config = GameConfig {
        seed,
        admins: vec![ADMIN],
        catalog_path: None,
    };
    Game::from_config(&config, Box::new(NullNotifier)).unwrap()
}

#[test]
fn iron_mine_build_scenario() {
    let game = new_game(1);
    game.join(1, "Ada", "ir", hours(0)).unwrap();

    let outcome = game.build_structure(1, BuildingKind::IronMine, hours(0)).unwrap();
    assert_eq!(outcome.count, 1);
    assert_eq!(outcome.money_spent, 80_000);
    assert_eq!(game.player(1).unwrap().money, 20_000);

    let err = game
        .build_structure(1, BuildingKind::IronMine, hours(0))
        .unwrap_err();
    assert!(matches!(err, GameError::Validation(_)), "{err}");
    let player = game.player(1).unwrap();
    assert_eq!(player.money, 20_000);
    assert_eq!(player.buildings.get(BuildingKind::IronMine), 1);
}

#[test]
fn money_convoy_scenario() {
    for (mut rng, expected, receiver_money) in [
        (FixedRng::low(), ConvoyStatus::Delivered, 110_000),
        (FixedRng::high(), ConvoyStatus::Lost, 100_000),
    ] {
        let mut t = TestWorld::new();
        let a = t.player("ir");
        let b = t.player("iq");
        let receipt = convoy::create_convoy(
            &mut t.world,
            a,
            b,
            ConvoyOrder::new(Payload::money(10_000)),
            minutes(0),
        )
        .unwrap();
        assert_eq!(receipt.convoy.arrival_at, minutes(30));
        assert_eq!(receipt.convoy.security, 10);
        assert_eq!(convoy::delivery_chance(receipt.convoy.security), 20);

        let early = sweep_convoys_and_attacks(&mut t.world, &mut rng, minutes(29));
        assert!(early.convoys.is_empty());

        let report = sweep_convoys_and_attacks(&mut t.world, &mut rng, minutes(30));
        assert_eq!(report.convoys.len(), 1);
        assert_eq!(report.convoys[0].status, expected);
        assert_eq!(t.player_row(a).money, 90_000);
        assert_eq!(t.player_row(b).money, receiver_money);
    }
}

#[test]
fn market_listing_sells_out() {
    let game = new_game(2);
    game.join(1, "Ada", "ir", hours(0)).unwrap();
    game.join(2, "Bo", "iq", hours(0)).unwrap();
    assert_eq!(
        game.grant_resource(ADMIN, 1, ResourceKind::Iron, 100, hours(0))
            .unwrap(),
        100
    );

    let receipt = game
        .create_listing(1, MarketItem::Resource(ResourceKind::Iron), 50, 10, hours(0))
        .unwrap();
    let id = receipt.listing.id;
    assert_eq!(game.player(1).unwrap().resources.get(ResourceKind::Iron), 50);

    let first = game.purchase(2, id, 30, hours(0)).unwrap();
    assert_eq!(first.remaining, 20);
    assert_eq!(first.transaction.paid, 300);
    let second = game.purchase(2, id, 20, hours(0)).unwrap();
    assert_eq!(second.remaining, 0);

    let listing = game.read(|w| w.listings[&id].clone()).unwrap();
    assert_eq!(listing.status, ListingStatus::SoldOut);
    assert!(matches!(
        game.purchase(2, id, 1, hours(0)),
        Err(GameError::Conflict(_))
    ));

    // payment settles whether or not the goods arrive
    assert_eq!(game.player(1).unwrap().money, 100_500);
    assert_eq!(game.player(2).unwrap().money, 99_500);
    assert!(game.active_listings().unwrap().is_empty());
}

#[test]
fn attack_without_power_changes_nothing() {
    let game = new_game(3);
    game.join(1, "Ada", "ir", hours(0)).unwrap();
    game.join(2, "Bo", "iq", hours(0)).unwrap();
    let before = game.snapshot().unwrap();

    let err = game
        .attempt_attack(1, 2, AttackType::Ground, hours(1))
        .unwrap_err();
    assert!(matches!(err, GameError::Validation(_)), "{err}");

    let after = game.snapshot().unwrap();
    assert_eq!(after.players, before.players);
    assert_eq!(after.news, before.news);
}

#[test]
fn scheduled_attack_lands_once_when_due() {
    let mut t = TestWorld::new();
    let a = t.player("ir");
    let d = t.player("iq");
    t.give_weapon(a, WeaponKind::Tank, 10);

    let attack = combat::schedule_attack(&mut t.world, a, d, AttackType::Ground, minutes(0)).unwrap();
    assert!(attack.due_at > minutes(0));
    let mut rng = FixedRng::low();

    let early = sweep_convoys_and_attacks(&mut t.world, &mut rng, minutes(0));
    assert!(early.attacks.is_empty());

    let report = sweep_convoys_and_attacks(&mut t.world, &mut rng, attack.due_at);
    assert_eq!(report.attacks.len(), 1);
    assert_eq!(t.world.pending_attacks[&attack.id].status, AttackStatus::Resolved);
    assert!(t.player_row(d).soldiers < 1_000);

    let again = sweep_convoys_and_attacks(&mut t.world, &mut rng, attack.due_at);
    assert!(again.attacks.is_empty());
}

#[test]
fn ledgers_stay_valid_over_a_long_session() {
    let game = new_game(42);
    let countries = ["ir", "iq", "tr", "sa"];
    for (i, country) in countries.iter().enumerate() {
        game.join(i as u64 + 1, country, country, hours(0)).unwrap();
    }
    for id in 1..=4 {
        game.grant_resource(ADMIN, id, ResourceKind::Iron, 500, hours(0))
            .unwrap();
    }

    for step in 0..200u64 {
        let now = minutes(step * 7);
        let a = step % 4 + 1;
        let b = (step + 1) % 4 + 1;
        // rejections are expected; only the invariants matter here
        let _ = match step % 6 {
            0 => game.build_structure(a, BuildingKind::IronMine, now).map(|_| ()),
            1 => game
                .create_convoy(a, b, ConvoyOrder::new(Payload::money(1_000)), now)
                .map(|_| ()),
            2 => game
                .create_listing(a, MarketItem::Resource(ResourceKind::Iron), 10, 5, now)
                .map(|_| ()),
            3 => {
                let listing = game
                    .active_listings()
                    .unwrap()
                    .into_iter()
                    .find(|l| l.seller_id != a);
                match listing {
                    Some(l) => game.purchase(a, l.id, 1, now).map(|_| ()),
                    None => Ok(()),
                }
            }
            4 => game.attempt_attack(a, b, AttackType::Ground, now).map(|_| ()),
            _ => game.run_income_cycle(now).map(|_| ()),
        };
        game.sweep_convoys_and_attacks(now).unwrap();
    }

    let world = game.snapshot().unwrap();
    assert!(world.check_invariants().is_ok());
    assert_eq!(world.players.len(), 4);
    assert!(
        world
            .convoys
            .values()
            .all(|c| c.status != ConvoyStatus::InTransit || c.arrival_at > world.current_time)
    );
}
