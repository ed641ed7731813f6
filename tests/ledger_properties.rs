mod common;

use common::*;
use giftharmony_orders::{
    ledger::{Actor, LedgerError, RejectReason, StatusChange},
    models::{DiscountKind, NotificationKind, OrderStatus, PaymentStatus},
};
use uuid::Uuid;

fn status(status: OrderStatus) -> StatusChange {
    StatusChange {
        status,
        tracking_number: None,
    }
}

#[tokio::test]
async fn single_unit_with_fixed_promotion() {
    let (ledger, store) = ledger();
    let orchid = add_product(&store, "Last Orchid", 100_000, 1).await;
    let mut save10 = promotion("SAVE10", DiscountKind::FixedAmount, 10_000);
    save10.min_order = 50_000;
    save10.usage_limit = Some(5);
    let promo_id = add_promotion(&store, save10).await;

    let user = Uuid::new_v4();
    let receipt = ledger
        .create_order(user, place(&[(orchid, 1)], Some("SAVE10")))
        .await
        .unwrap();
    let order = &receipt.record.order;

    assert_eq!(order.subtotal, 100_000);
    assert_eq!(order.discount, 10_000);
    assert_eq!(order.shipping_fee, 30_000);
    assert_eq!(order.total, 120_000);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.promotion_code.as_deref(), Some("SAVE10"));
    assert_eq!(receipt.record.items.len(), 1);
    assert_eq!(receipt.record.items[0].unit_price, 100_000);
    assert!(receipt.warnings.is_empty());

    assert_eq!(stock_of(&store, orchid).await, 0);
    assert_eq!(store.promotion(promo_id).await.unwrap().usage_count, 1);

    let second = ledger
        .create_order(Uuid::new_v4(), place(&[(orchid, 1)], None))
        .await;
    assert!(matches!(second, Err(LedgerError::OutOfStock(id)) if id == orchid));
    assert_eq!(store.order_count().await, 1);
}

#[tokio::test]
async fn total_is_discounted_subtotal_plus_shipping() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 100).await;
    let hamper = add_product(&store, "Hamper", 750_000, 10).await;

    let mut pct = promotion("GIFT15", DiscountKind::Percentage, 15);
    pct.max_discount = Some(75_000);
    add_promotion(&store, pct).await;
    add_promotion(&store, promotion("FREESHIP", DiscountKind::FreeShipping, 0)).await;
    add_promotion(&store, promotion("BIGCUT", DiscountKind::FixedAmount, 1_000_000)).await;

    let cases: [(&[(Uuid, i32)], Option<&str>); 5] = [
        (&[(mug, 1)], None),
        (&[(mug, 2)], Some("GIFT15")),
        (&[(hamper, 1)], Some("GIFT15")),
        (&[(mug, 1)], Some("FREESHIP")),
        (&[(mug, 1)], Some("BIGCUT")),
    ];

    for (lines, code) in cases {
        let receipt = ledger
            .create_order(Uuid::new_v4(), place(lines, code))
            .await
            .unwrap();
        let order = &receipt.record.order;
        let line_sum: i64 = receipt.record.items.iter().map(|i| i.line_total()).sum();

        assert_eq!(order.subtotal, line_sum);
        assert!(order.discount >= 0 && order.discount <= order.subtotal);
        assert!(order.total >= 0);
        assert_eq!(
            order.total,
            (order.subtotal - order.discount).max(0) + order.shipping_fee,
            "code {code:?}"
        );
    }
}

#[tokio::test]
async fn percentage_cap_and_free_shipping_values() {
    let (ledger, store) = ledger();
    let hamper = add_product(&store, "Hamper", 750_000, 10).await;
    let mug = add_product(&store, "Mug", 120_000, 10).await;
    let mut pct = promotion("GIFT15", DiscountKind::Percentage, 15);
    pct.max_discount = Some(75_000);
    add_promotion(&store, pct).await;
    add_promotion(&store, promotion("FREESHIP", DiscountKind::FreeShipping, 0)).await;

    let capped = ledger
        .create_order(Uuid::new_v4(), place(&[(hamper, 1)], Some("GIFT15")))
        .await
        .unwrap();
    // 15% of 750000 is 112500, capped at 75000; subtotal is over the free threshold.
    assert_eq!(capped.record.order.discount, 75_000);
    assert_eq!(capped.record.order.shipping_fee, 0);
    assert_eq!(capped.record.order.total, 675_000);

    let free = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], Some("FREESHIP")))
        .await
        .unwrap();
    assert_eq!(free.record.order.discount, 0);
    assert_eq!(free.record.order.shipping_fee, 0);
    assert_eq!(free.record.order.total, 120_000);
}

#[tokio::test]
async fn cancel_restores_exactly_the_reserved_stock() {
    let (ledger, store) = ledger();
    let candle = add_product(&store, "Candle", 180_000, 10).await;
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let user = Uuid::new_v4();

    let receipt = ledger
        .create_order(user, place(&[(candle, 3), (mug, 2)], None))
        .await
        .unwrap();
    assert_eq!(stock_of(&store, candle).await, 7);
    assert_eq!(stock_of(&store, mug).await, 3);

    let cancelled = ledger
        .cancel_order(Actor::customer(user), receipt.record.order.id)
        .await
        .unwrap();
    assert_eq!(cancelled.record.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&store, candle).await, 10);
    assert_eq!(stock_of(&store, mug).await, 5);

    let again = ledger
        .cancel_order(Actor::customer(user), receipt.record.order.id)
        .await;
    assert!(matches!(
        again,
        Err(LedgerError::NotCancellable(OrderStatus::Cancelled))
    ));
    assert_eq!(stock_of(&store, candle).await, 10);
}

#[tokio::test]
async fn cancellation_is_gated_on_status() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let user = Uuid::new_v4();
    let admin = Actor::admin(Uuid::new_v4());

    let confirmed = ledger
        .create_order(user, place(&[(mug, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;
    ledger
        .update_status(admin, confirmed, status(OrderStatus::Confirmed))
        .await
        .unwrap();
    assert!(ledger.cancel_order(Actor::customer(user), confirmed).await.is_ok());

    let delivered = ledger
        .create_order(user, place(&[(mug, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;
    ledger
        .update_status(admin, delivered, status(OrderStatus::Delivered))
        .await
        .unwrap();
    let stock_before = stock_of(&store, mug).await;
    let result = ledger.cancel_order(Actor::customer(user), delivered).await;
    assert!(matches!(
        result,
        Err(LedgerError::NotCancellable(OrderStatus::Delivered))
    ));
    assert_eq!(stock_of(&store, mug).await, stock_before);
}

#[tokio::test]
async fn promotion_gating_leaves_no_trace() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 40_000, 5).await;
    let mut save10 = promotion("SAVE10", DiscountKind::FixedAmount, 10_000);
    save10.min_order = 50_000;
    let promo_id = add_promotion(&store, save10).await;

    let unknown = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], Some("NOPE")))
        .await;
    assert!(matches!(
        unknown,
        Err(LedgerError::InvalidPromotion(RejectReason::NotFound))
    ));

    let below = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], Some("save10")))
        .await;
    assert!(matches!(
        below,
        Err(LedgerError::InvalidPromotion(RejectReason::BelowMinimum { min_order: 50_000 }))
    ));

    assert_eq!(stock_of(&store, mug).await, 5);
    assert_eq!(store.order_count().await, 0);
    assert_eq!(store.promotion(promo_id).await.unwrap().usage_count, 0);

    // Codes match regardless of case and surrounding space.
    let ok = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 2)], Some("  save10 ")))
        .await
        .unwrap();
    assert_eq!(ok.record.order.discount, 10_000);
    assert_eq!(ok.record.order.promotion_code.as_deref(), Some("SAVE10"));
}

#[tokio::test]
async fn exhausted_promotion_is_rejected() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let mut once = promotion("ONCE", DiscountKind::FixedAmount, 5_000);
    once.usage_limit = Some(1);
    let promo_id = add_promotion(&store, once).await;

    ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], Some("ONCE")))
        .await
        .unwrap();
    let second = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], Some("ONCE")))
        .await;
    assert!(matches!(
        second,
        Err(LedgerError::InvalidPromotion(RejectReason::UsageLimitReached))
    ));
    assert_eq!(store.promotion(promo_id).await.unwrap().usage_count, 1);
    assert_eq!(stock_of(&store, mug).await, 4);
}

#[tokio::test]
async fn failed_line_rolls_back_the_whole_order() {
    let (ledger, store) = ledger();
    let a = add_product(&store, "A", 10_000, 5).await;
    let b = add_product(&store, "B", 20_000, 5).await;
    let c = add_product(&store, "C", 30_000, 1).await;
    let mut promo = promotion("GIFT5", DiscountKind::FixedAmount, 5_000);
    promo.usage_limit = Some(10);
    let promo_id = add_promotion(&store, promo).await;

    let result = ledger
        .create_order(
            Uuid::new_v4(),
            place(&[(a, 2), (b, 1), (c, 3)], Some("GIFT5")),
        )
        .await;
    assert!(matches!(result, Err(LedgerError::OutOfStock(id)) if id == c));

    assert_eq!(stock_of(&store, a).await, 5);
    assert_eq!(stock_of(&store, b).await, 5);
    assert_eq!(stock_of(&store, c).await, 1);
    assert_eq!(store.order_count().await, 0);
    assert_eq!(store.promotion(promo_id).await.unwrap().usage_count, 0);
}

#[tokio::test]
async fn duplicate_lines_cannot_oversell() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 10_000, 3).await;

    let result = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 2), (mug, 2)], None))
        .await;
    assert!(matches!(result, Err(LedgerError::OutOfStock(_))));
    assert_eq!(stock_of(&store, mug).await, 3);
    assert_eq!(store.order_count().await, 0);
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 10_000, 3).await;

    let empty = ledger.create_order(Uuid::new_v4(), place(&[], None)).await;
    assert!(matches!(empty, Err(LedgerError::EmptyOrder)));

    let zero = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 0)], None))
        .await;
    assert!(matches!(zero, Err(LedgerError::InvalidQuantity { quantity: 0, .. })));

    let missing = Uuid::new_v4();
    let unknown = ledger
        .create_order(Uuid::new_v4(), place(&[(missing, 1)], None))
        .await;
    assert!(matches!(unknown, Err(LedgerError::ProductNotFound(id)) if id == missing));

    let mut request = place(&[(mug, 1)], None);
    request.details.shipping_address.city = "  ".into();
    let no_city = ledger.create_order(Uuid::new_v4(), request).await;
    assert!(matches!(no_city, Err(LedgerError::Validation(_))));

    assert_eq!(stock_of(&store, mug).await, 3);
}

#[tokio::test]
async fn inactive_products_are_not_purchasable() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 10_000, 3).await;
    let mut product = store.product(mug).await.unwrap();
    product.is_active = false;
    store.insert_product(product).await;

    let result = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], None))
        .await;
    assert!(matches!(result, Err(LedgerError::ProductNotFound(_))));
}

#[tokio::test]
async fn order_lines_keep_the_checkout_price() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let user = Uuid::new_v4();
    let id = ledger
        .create_order(user, place(&[(mug, 2)], None))
        .await
        .unwrap()
        .record
        .order
        .id;

    store.set_price(mug, 999_000).await;

    let record = ledger.get_order(Actor::customer(user), id).await.unwrap();
    assert_eq!(record.items[0].unit_price, 120_000);
    assert_eq!(record.order.subtotal, 240_000);
}

#[tokio::test]
async fn order_lines_come_back_in_a_stable_order() {
    let (ledger, store) = ledger();
    let card = add_product(&store, "Card", 15_000, 5).await;
    let candle = add_product(&store, "Candle", 60_000, 5).await;
    let tea = add_product(&store, "Tea Tin", 45_000, 5).await;
    let user = Uuid::new_v4();
    let id = ledger
        .create_order(user, place(&[(tea, 1), (card, 2), (candle, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;

    let first = ledger.get_order(Actor::customer(user), id).await.unwrap();
    let second = ledger.get_order(Actor::customer(user), id).await.unwrap();
    let first_ids: Vec<Uuid> = first.items.iter().map(|item| item.id).collect();
    let second_ids: Vec<Uuid> = second.items.iter().map(|item| item.id).collect();

    // Lines share a timestamp; the item id breaks the tie.
    let mut expected = first_ids.clone();
    expected.sort();
    assert_eq!(first_ids, expected);
    assert_eq!(second_ids, expected);
}

#[tokio::test]
async fn failed_side_effects_do_not_undo_the_order() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    store.fail_side_effects(true);

    let receipt = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 1)], None))
        .await
        .unwrap();

    assert_eq!(receipt.warnings.len(), 2);
    assert_eq!(store.order_count().await, 1);
    assert_eq!(stock_of(&store, mug).await, 4);
}

#[tokio::test]
async fn cart_checkout_clears_cart_and_notifies() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let candle = add_product(&store, "Candle", 180_000, 5).await;
    let user = Uuid::new_v4();
    store.add_to_cart(user, mug, 2).await;
    store.add_to_cart(user, candle, 1).await;

    let receipt = ledger.checkout_cart(user, details(None)).await.unwrap();
    assert_eq!(receipt.record.items.len(), 2);
    assert_eq!(receipt.record.order.subtotal, 420_000);
    assert!(store.cart(user).await.is_empty());

    let notes = store.notifications(user).await;
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].kind, NotificationKind::OrderCreated);
    assert_eq!(notes[0].order_id, Some(receipt.record.order.id));

    let empty = ledger.checkout_cart(user, details(None)).await;
    assert!(matches!(empty, Err(LedgerError::EmptyOrder)));
}

#[tokio::test]
async fn admin_walks_the_status_path() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let user = Uuid::new_v4();
    let admin = Actor::admin(Uuid::new_v4());
    let id = ledger
        .create_order(user, place(&[(mug, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;

    let denied = ledger
        .update_status(Actor::customer(user), id, status(OrderStatus::Confirmed))
        .await;
    assert!(matches!(denied, Err(LedgerError::Unauthorized)));

    ledger
        .update_status(admin, id, status(OrderStatus::Confirmed))
        .await
        .unwrap();
    let shipping = ledger
        .update_status(
            admin,
            id,
            StatusChange {
                status: OrderStatus::Shipping,
                tracking_number: Some("JNE-123".into()),
            },
        )
        .await
        .unwrap();
    assert_eq!(shipping.record.order.tracking_number.as_deref(), Some("JNE-123"));

    let back = ledger
        .update_status(admin, id, status(OrderStatus::Confirmed))
        .await;
    assert!(matches!(
        back,
        Err(LedgerError::InvalidTransition {
            from: OrderStatus::Shipping,
            to: OrderStatus::Confirmed
        })
    ));

    let delivered = ledger
        .update_status(admin, id, status(OrderStatus::Delivered))
        .await
        .unwrap();
    assert!(delivered.record.order.delivered_at.is_some());

    let kinds: Vec<_> = store
        .notifications(user)
        .await
        .into_iter()
        .map(|n| n.kind)
        .collect();
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == NotificationKind::OrderStatus)
            .count(),
        3
    );
}

#[tokio::test]
async fn admin_cancel_through_status_restores_stock() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let id = ledger
        .create_order(Uuid::new_v4(), place(&[(mug, 2)], None))
        .await
        .unwrap()
        .record
        .order
        .id;
    assert_eq!(stock_of(&store, mug).await, 3);

    let receipt = ledger
        .update_status(Actor::admin(Uuid::new_v4()), id, status(OrderStatus::Cancelled))
        .await
        .unwrap();
    assert_eq!(receipt.record.order.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&store, mug).await, 5);
}

#[tokio::test]
async fn payment_confirms_and_cancellation_refunds() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let user = Uuid::new_v4();
    let id = ledger
        .create_order(user, place(&[(mug, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;

    let paid = ledger.record_payment(Actor::customer(user), id).await.unwrap();
    assert_eq!(paid.record.order.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.record.order.status, OrderStatus::Confirmed);
    assert!(paid.record.order.paid_at.is_some());

    let twice = ledger.record_payment(Actor::customer(user), id).await;
    assert!(matches!(twice, Err(LedgerError::PaymentRejected(_))));

    let cancelled = ledger.cancel_order(Actor::customer(user), id).await.unwrap();
    assert_eq!(cancelled.record.order.payment_status, PaymentStatus::Refunded);

    let after_cancel = ledger.record_payment(Actor::customer(user), id).await;
    assert!(matches!(after_cancel, Err(LedgerError::PaymentRejected(_))));
}

#[tokio::test]
async fn other_customers_cannot_see_or_cancel() {
    let (ledger, store) = ledger();
    let mug = add_product(&store, "Mug", 120_000, 5).await;
    let owner = Uuid::new_v4();
    let stranger = Actor::customer(Uuid::new_v4());
    let id = ledger
        .create_order(owner, place(&[(mug, 1)], None))
        .await
        .unwrap()
        .record
        .order
        .id;

    assert!(matches!(
        ledger.get_order(stranger, id).await,
        Err(LedgerError::NotFound)
    ));
    assert!(matches!(
        ledger.cancel_order(stranger, id).await,
        Err(LedgerError::NotFound)
    ));
    assert_eq!(stock_of(&store, mug).await, 4);

    assert!(ledger.get_order(Actor::admin(Uuid::new_v4()), id).await.is_ok());
}

#[tokio::test]
async fn preview_does_not_consume_usage() {
    let (ledger, store) = ledger();
    let mut once = promotion("ONCE", DiscountKind::Percentage, 10);
    once.usage_limit = Some(1);
    let promo_id = add_promotion(&store, once).await;

    let outcome = ledger.preview_promotion("once", 100_000).await.unwrap();
    assert_eq!(outcome.map(|e| e.discount), Ok(10_000));
    let outcome = ledger.preview_promotion("missing", 100_000).await.unwrap();
    assert_eq!(outcome, Err(RejectReason::NotFound));
    assert_eq!(store.promotion(promo_id).await.unwrap().usage_count, 0);
}
