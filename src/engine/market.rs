//! Marketplace: escrowed listings, immediate settlement, risky delivery.
//!
//! Unlike convoys, payment is never at risk. The buyer pays and the seller is
//! credited in the same commit; only the goods can fail to arrive.

use rand::RngCore;

use super::chance::roll;
use super::combat::weapon_power;
use super::convoy::country_of;
use crate::catalog::Catalog;
use crate::error::GameError;
use crate::model::{
    DeliveryStatus, GameTime, ListingStatus, MarketItem, MarketListing, MarketTransaction,
    NewsKind, Player, World,
};

pub const BASE_MILITARY_SECURITY: u64 = 30;
pub const MAX_MILITARY_SECURITY: u64 = 95;
pub const DELIVERY_BONUS: u64 = 20;
pub const MAX_DELIVERY_CHANCE: u64 = 90;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingReceipt {
    pub listing: MarketListing,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub transaction: MarketTransaction,
    /// Quantity left on the listing after this purchase.
    pub remaining: u64,
    pub message: String,
}

/// How well a seller can protect goods in transit: 30 plus a tenth of their
/// total weapon power, capped at 95.
pub fn military_security(catalog: &Catalog, player: &Player) -> u8 {
    let points = weapon_power(catalog, &player.weapons, |_| true);
    BASE_MILITARY_SECURITY
        .saturating_add(points / 10)
        .min(MAX_MILITARY_SECURITY) as u8
}

pub fn delivery_chance(security: u8) -> u64 {
    (u64::from(security) + DELIVERY_BONUS).min(MAX_DELIVERY_CHANCE)
}

/// Put goods up for sale, moving them out of the seller's ledger into escrow.
pub fn create_listing(
    world: &mut World,
    seller_id: u64,
    item: MarketItem,
    quantity: u64,
    unit_price: u64,
    now: GameTime,
) -> Result<ListingReceipt, GameError> {
    if quantity == 0 {
        return Err(GameError::validation("quantity must be at least 1"));
    }
    if unit_price == 0 {
        return Err(GameError::validation("price must be at least 1"));
    }
    if quantity.checked_mul(unit_price).is_none() {
        return Err(GameError::validation("listing value is too large"));
    }

    let catalog = world.catalog.clone();
    let (security, country) = world.update_player(seller_id, |seller| {
        item.take_from(seller, quantity)?;
        Ok((military_security(&catalog, seller), seller.country.clone()))
    })?;

    let id = world.next_id();
    let listing = MarketListing {
        id,
        seller_id,
        item,
        quantity,
        unit_price,
        security,
        status: ListingStatus::Active,
        created_at: now,
    };
    world.listings.insert(id, listing.clone());

    let message = format!("{country} listed {quantity} {item} at {unit_price} each (listing {id})");
    world.push_news(NewsKind::ListingCreated, now, message.clone(), vec![seller_id]);
    tracing::debug!(listing_id = id, seller_id, %item, quantity, "listing created");
    Ok(ListingReceipt { listing, message })
}

/// Buy `quantity` from a listing. Payment settles immediately and the
/// transaction is recorded as pending; delivery is then rolled once by
/// [`settle_delivery`].
pub fn purchase(
    world: &mut World,
    rng: &mut dyn RngCore,
    buyer_id: u64,
    listing_id: u64,
    quantity: u64,
    now: GameTime,
) -> Result<PurchaseReceipt, GameError> {
    let listing = world
        .listings
        .get(&listing_id)
        .cloned()
        .ok_or_else(|| GameError::listing_not_found(listing_id))?;
    if listing.seller_id == buyer_id {
        return Err(GameError::validation("you cannot buy your own listing"));
    }
    if listing.status != ListingStatus::Active {
        return Err(GameError::Conflict(format!(
            "listing {listing_id} is {}",
            listing.status
        )));
    }
    if quantity == 0 || quantity > listing.quantity {
        return Err(GameError::validation(format!(
            "quantity must be between 1 and {}",
            listing.quantity
        )));
    }
    let total = quantity
        .checked_mul(listing.unit_price)
        .ok_or_else(|| GameError::overflow("purchase total"))?;
    let buyer = world.player(buyer_id)?;
    if buyer.money < total {
        return Err(GameError::validation(format!(
            "{quantity} {} costs {total} but you have {}",
            listing.item, buyer.money
        )));
    }

    world.update_players(buyer_id, listing.seller_id, |buyer, seller| {
        buyer.debit_money(total)?;
        seller.credit_money(total)
    })?;

    let remaining = listing.quantity - quantity;
    if let Some(row) = world.listings.get_mut(&listing_id) {
        row.quantity = remaining;
        if remaining == 0 {
            row.status = ListingStatus::SoldOut;
        }
    }

    let id = world.next_id();
    world.transactions.insert(
        id,
        MarketTransaction {
            id,
            listing_id,
            buyer_id,
            seller_id: listing.seller_id,
            item: listing.item,
            quantity,
            paid: total,
            status: DeliveryStatus::Pending,
            created_at: now,
        },
    );

    let (transaction, message) = settle_delivery(world, rng, id, now)?;
    Ok(PurchaseReceipt {
        transaction,
        remaining,
        message,
    })
}

/// Roll delivery for a paid transaction and hand over the goods on success.
///
/// Only a pending transaction can be settled. A buyer who no longer exists
/// cannot receive anything, so the delivery fails without a roll.
pub fn settle_delivery(
    world: &mut World,
    rng: &mut dyn RngCore,
    transaction_id: u64,
    now: GameTime,
) -> Result<(MarketTransaction, String), GameError> {
    let tx = world
        .transactions
        .get(&transaction_id)
        .cloned()
        .ok_or(GameError::NotFound {
            entity: "transaction",
            id: transaction_id,
        })?;
    if tx.status != DeliveryStatus::Pending {
        return Err(GameError::Conflict(format!(
            "transaction {transaction_id} is already {}",
            tx.status
        )));
    }
    let security = world
        .listings
        .get(&tx.listing_id)
        .map(|l| l.security)
        .ok_or_else(|| GameError::listing_not_found(tx.listing_id))?;

    let delivered = world.players.contains_key(&tx.buyer_id)
        && roll(rng, delivery_chance(security) as f64);
    if delivered {
        world.update_player(tx.buyer_id, |buyer| tx.item.give_to(buyer, tx.quantity))?;
    }

    let status = if delivered {
        DeliveryStatus::Delivered
    } else {
        DeliveryStatus::Failed
    };
    let row = world
        .transactions
        .get_mut(&transaction_id)
        .ok_or(GameError::NotFound {
            entity: "transaction",
            id: transaction_id,
        })?;
    row.status = status;
    let settled = row.clone();

    let buyer_country = country_of(world, tx.buyer_id);
    let seller_country = country_of(world, tx.seller_id);
    let message = if delivered {
        format!(
            "{buyer_country} bought {} {} from {seller_country} for {}",
            tx.quantity, tx.item, tx.paid
        )
    } else {
        format!(
            "{buyer_country} paid {seller_country} {} for {} {} but the shipment never arrived",
            tx.paid, tx.quantity, tx.item
        )
    };
    world.push_news(
        NewsKind::MarketSale,
        now,
        message.clone(),
        vec![tx.buyer_id, tx.seller_id],
    );
    tracing::info!(
        transaction_id,
        listing_id = tx.listing_id,
        buyer_id = tx.buyer_id,
        quantity = tx.quantity,
        delivered,
        "market purchase"
    );
    Ok((settled, message))
}

/// Withdraw an active listing and return the unsold escrow to the seller.
pub fn cancel_listing(
    world: &mut World,
    seller_id: u64,
    listing_id: u64,
    now: GameTime,
) -> Result<MarketListing, GameError> {
    let listing = world
        .listings
        .get(&listing_id)
        .cloned()
        .ok_or_else(|| GameError::listing_not_found(listing_id))?;
    if listing.seller_id != seller_id {
        return Err(GameError::validation("only the seller can cancel a listing"));
    }
    if listing.status != ListingStatus::Active {
        return Err(GameError::Conflict(format!(
            "listing {listing_id} is {}",
            listing.status
        )));
    }
    let country = world.update_player(seller_id, |seller| {
        listing.item.give_to(seller, listing.quantity)?;
        Ok(seller.country.clone())
    })?;

    let row = world
        .listings
        .get_mut(&listing_id)
        .ok_or_else(|| GameError::listing_not_found(listing_id))?;
    row.status = ListingStatus::Cancelled;
    let cancelled = row.clone();

    world.push_news(
        NewsKind::ListingCancelled,
        now,
        format!("{country} withdrew listing {listing_id}"),
        vec![seller_id],
    );
    Ok(cancelled)
}

/// Transactions that were paid for but never had their delivery rolled.
pub fn pending_transactions(world: &World) -> Vec<u64> {
    world
        .transactions
        .values()
        .filter(|tx| tx.status == DeliveryStatus::Pending)
        .map(|tx| tx.id)
        .collect()
}

/// Active listings, newest first.
pub fn active_listings(world: &World) -> Vec<&MarketListing> {
    world
        .listings
        .values()
        .rev()
        .filter(|l| l.status == ListingStatus::Active)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ResourceKind, WeaponKind};
    use crate::testutil::{FixedRng, TestWorld, minutes};

    fn oil_listing(t: &mut TestWorld) -> (u64, u64, u64) {
        let s = t.player("ir");
        let b = t.player("iq");
        t.give_resource(s, ResourceKind::Oil, 100);
        let receipt = create_listing(
            &mut t.world,
            s,
            MarketItem::Resource(ResourceKind::Oil),
            40,
            50,
            minutes(0),
        )
        .unwrap();
        (s, b, receipt.listing.id)
    }

    #[test]
    fn listing_escrows_goods() {
        let mut t = TestWorld::new();
        let (s, _, id) = oil_listing(&mut t);
        assert_eq!(t.player_row(s).resources.get(ResourceKind::Oil), 60);
        let listing = &t.world.listings[&id];
        assert_eq!(listing.security, 30);
        assert_eq!(listing.status, ListingStatus::Active);
    }

    #[test]
    fn listing_rejects_bad_input() {
        let mut t = TestWorld::new();
        let s = t.player("ir");
        let oil = MarketItem::Resource(ResourceKind::Oil);
        assert!(create_listing(&mut t.world, s, oil, 0, 10, minutes(0)).is_err());
        assert!(create_listing(&mut t.world, s, oil, 1, 0, minutes(0)).is_err());
        assert!(create_listing(&mut t.world, s, oil, 1, 10, minutes(0)).is_err());
        assert!(t.world.listings.is_empty());
    }

    #[test]
    fn military_security_scales_and_caps() {
        let mut t = TestWorld::new();
        let s = t.player("ir");
        assert_eq!(military_security(&t.world.catalog, t.player_row(s)), 30);
        t.give_weapon(s, WeaponKind::Tank, 5);
        assert_eq!(military_security(&t.world.catalog, t.player_row(s)), 60);
        t.give_weapon(s, WeaponKind::AircraftCarrier, 10);
        assert_eq!(military_security(&t.world.catalog, t.player_row(s)), 95);
        assert_eq!(delivery_chance(95), 90);
        assert_eq!(delivery_chance(30), 50);
    }

    #[test]
    fn purchase_settles_and_decrements() {
        let mut t = TestWorld::new();
        let (s, b, id) = oil_listing(&mut t);
        let mut rng = FixedRng::low();

        let receipt = purchase(&mut t.world, &mut rng, b, id, 15, minutes(1)).unwrap();
        assert_eq!(receipt.remaining, 25);
        assert_eq!(receipt.transaction.status, DeliveryStatus::Delivered);
        assert_eq!(t.player_row(b).money, 100_000 - 750);
        assert_eq!(t.player_row(s).money, 100_000 + 750);
        assert_eq!(t.player_row(b).resources.get(ResourceKind::Oil), 15);
        assert_eq!(t.world.listings[&id].status, ListingStatus::Active);

        let receipt = purchase(&mut t.world, &mut rng, b, id, 25, minutes(2)).unwrap();
        assert_eq!(receipt.remaining, 0);
        assert_eq!(t.world.listings[&id].status, ListingStatus::SoldOut);

        let err = purchase(&mut t.world, &mut rng, b, id, 1, minutes(3)).unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)));
    }

    #[test]
    fn failed_delivery_keeps_payment() {
        let mut t = TestWorld::new();
        let (s, b, id) = oil_listing(&mut t);
        let mut rng = FixedRng::high();
        let receipt = purchase(&mut t.world, &mut rng, b, id, 10, minutes(1)).unwrap();
        assert_eq!(receipt.transaction.status, DeliveryStatus::Failed);
        assert_eq!(t.player_row(b).money, 99_500);
        assert_eq!(t.player_row(s).money, 100_500);
        assert_eq!(t.player_row(b).resources.get(ResourceKind::Oil), 0);
        assert_eq!(t.world.listings[&id].quantity, 30);
    }

    #[test]
    fn settled_transaction_cannot_be_settled_again() {
        let mut t = TestWorld::new();
        let (_, b, id) = oil_listing(&mut t);
        let mut rng = FixedRng::low();
        let receipt = purchase(&mut t.world, &mut rng, b, id, 10, minutes(1)).unwrap();
        let tx_id = receipt.transaction.id;

        let err = settle_delivery(&mut t.world, &mut rng, tx_id, minutes(2)).unwrap_err();
        assert!(matches!(err, GameError::Conflict(_)), "{err}");
        assert_eq!(t.player_row(b).resources.get(ResourceKind::Oil), 10);
        assert!(settle_delivery(&mut t.world, &mut rng, 999, minutes(2)).is_err());
    }

    #[test]
    fn pending_transaction_settles_once() {
        let mut t = TestWorld::new();
        let (_, b, id) = oil_listing(&mut t);
        let receipt = purchase(&mut t.world, &mut FixedRng::high(), b, id, 10, minutes(1)).unwrap();
        let tx_id = receipt.transaction.id;
        // left pending, as if the process stopped between payment and delivery
        t.world.transactions.get_mut(&tx_id).unwrap().status = DeliveryStatus::Pending;
        let news = t.world.news.len();

        let (settled, message) =
            settle_delivery(&mut t.world, &mut FixedRng::low(), tx_id, minutes(5)).unwrap();
        assert_eq!(settled.status, DeliveryStatus::Delivered);
        assert!(message.contains("bought 10 oil"), "{message}");
        assert_eq!(t.world.transactions[&tx_id].status, DeliveryStatus::Delivered);
        assert_eq!(t.player_row(b).resources.get(ResourceKind::Oil), 10);
        assert_eq!(t.world.news.len(), news + 1);
        // paid once, at purchase time
        assert_eq!(t.player_row(b).money, 99_500);
    }

    #[test]
    fn pending_delivery_to_missing_buyer_fails() {
        let mut t = TestWorld::new();
        let (s, b, id) = oil_listing(&mut t);
        let receipt = purchase(&mut t.world, &mut FixedRng::low(), b, id, 10, minutes(1)).unwrap();
        let tx_id = receipt.transaction.id;
        t.world.transactions.get_mut(&tx_id).unwrap().status = DeliveryStatus::Pending;
        t.world.players.remove(&b);

        let (settled, _) =
            settle_delivery(&mut t.world, &mut FixedRng::low(), tx_id, minutes(2)).unwrap();
        assert_eq!(settled.status, DeliveryStatus::Failed);
        assert_eq!(t.player_row(s).money, 100_500);
    }

    #[test]
    fn purchase_validates_before_touching_anything() {
        let mut t = TestWorld::new();
        let (s, b, id) = oil_listing(&mut t);
        let mut rng = FixedRng::low();
        assert!(purchase(&mut t.world, &mut rng, s, id, 1, minutes(1)).is_err());
        assert!(purchase(&mut t.world, &mut rng, b, id, 41, minutes(1)).is_err());
        assert!(purchase(&mut t.world, &mut rng, b, id, 0, minutes(1)).is_err());
        t.set_money(b, 10);
        assert!(purchase(&mut t.world, &mut rng, b, id, 1, minutes(1)).is_err());
        assert_eq!(t.world.listings[&id].quantity, 40);
        assert!(t.world.transactions.is_empty());
        assert_eq!(
            purchase(&mut t.world, &mut rng, b, 999, 1, minutes(1)).unwrap_err(),
            GameError::listing_not_found(999)
        );
    }

    #[test]
    fn cancel_returns_escrow() {
        let mut t = TestWorld::new();
        let (s, b, id) = oil_listing(&mut t);
        let mut rng = FixedRng::low();
        purchase(&mut t.world, &mut rng, b, id, 10, minutes(1)).unwrap();

        assert!(cancel_listing(&mut t.world, b, id, minutes(2)).is_err());
        let cancelled = cancel_listing(&mut t.world, s, id, minutes(2)).unwrap();
        assert_eq!(cancelled.status, ListingStatus::Cancelled);
        assert_eq!(t.player_row(s).resources.get(ResourceKind::Oil), 90);
        assert!(cancel_listing(&mut t.world, s, id, minutes(3)).is_err());
        assert!(active_listings(&t.world).is_empty());
    }

    #[test]
    fn weapons_and_money_can_be_listed() {
        let mut t = TestWorld::new();
        let s = t.player("ir");
        let b = t.player("iq");
        t.give_weapon(s, WeaponKind::Drone, 4);
        let drones =
            create_listing(&mut t.world, s, MarketItem::Weapon(WeaponKind::Drone), 2, 30_000, minutes(0))
                .unwrap();
        // measured after escrow: the two drones kept add 100 power
        assert_eq!(drones.listing.security, 40);
        let cash = create_listing(&mut t.world, s, MarketItem::Money, 1_000, 1, minutes(0)).unwrap();
        assert_eq!(t.player_row(s).money, 99_000);

        let mut rng = FixedRng::low();
        purchase(&mut t.world, &mut rng, b, drones.listing.id, 1, minutes(1)).unwrap();
        assert_eq!(t.player_row(b).weapons.get(WeaponKind::Drone), 1);
        purchase(&mut t.world, &mut rng, b, cash.listing.id, 1_000, minutes(1)).unwrap();
        assert_eq!(t.player_row(b).money, 100_000 - 30_000);
    }
}
