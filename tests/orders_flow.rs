use giftharmony_orders::{
    db::{create_orm_conn, run_migrations},
    dto::{
        cart::AddToCartRequest,
        orders::{CheckoutRequest, CreateOrderRequest, OrderLineInput, UpdateOrderStatusRequest},
    },
    entity::{
        products::{ActiveModel as ProductActive, Entity as Products},
        promotions::{ActiveModel as PromotionActive, Entity as Promotions},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    ledger::{CheckoutDetails, LedgerError, LineRequest, PlaceOrder, RejectReason, ShippingPolicy},
    middleware::auth::AuthUser,
    models::{DiscountKind, OrderStatus, PaymentMethod, ShippingAddress},
    routes::params::LowStockQuery,
    services::{admin_service, cart_service, order_service},
    state::AppState,
};
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use tokio::sync::Mutex;
use uuid::Uuid;

// Tests in this file truncate the same tables.
static DB_LOCK: Mutex<()> = Mutex::const_new(());

// Integration flow against Postgres: cart checkout with a promotion, a second
// buyer hitting empty stock, admin status changes and cancellation restock.
#[tokio::test]
async fn checkout_cancel_and_admin_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL to run integration flow tests.");
            return Ok(());
        }
    };

    let _guard = DB_LOCK.lock().await;
    let state = setup_state(&database_url).await?;

    let user_id = create_user(&state, "user", "user@example.com").await?;
    let other_id = create_user(&state, "user", "other@example.com").await?;
    let admin_id = create_user(&state, "admin", "admin@example.com").await?;

    let product_id = create_product(&state, "Last Orchid", 100_000, 1).await?;
    let promotion_id = create_promotion(&state, "SAVE10", 0).await?;

    let auth_user = AuthUser {
        user_id,
        role: "user".into(),
    };
    let auth_other = AuthUser {
        user_id: other_id,
        role: "user".into(),
    };
    let auth_admin = AuthUser {
        user_id: admin_id,
        role: "admin".into(),
    };

    cart_service::add_to_cart(
        &state,
        &auth_user,
        AddToCartRequest {
            product_id,
            quantity: 1,
        },
    )
    .await?;

    let checkout = order_service::checkout_cart(
        &state,
        &auth_user,
        CheckoutRequest {
            payment_method: PaymentMethod::Cod,
            shipping_address: address(),
            notes: None,
            promotion_code: Some("save10".into()),
        },
    )
    .await?;
    let order = checkout.data.unwrap().order;
    assert_eq!(order.subtotal, 100_000);
    assert_eq!(order.discount, 10_000);
    assert_eq!(order.shipping_fee, 30_000);
    assert_eq!(order.total, 120_000);

    assert_eq!(stock(&state, product_id).await?, 0);
    let promo = Promotions::find_by_id(promotion_id).one(&state.orm).await?.unwrap();
    assert_eq!(promo.usage_count, 1);

    let cart = cart_service::list_cart(&state, &auth_user).await?;
    assert!(cart.data.unwrap().items.is_empty());

    // Someone else tries to buy the same unit.
    let sold_out = order_service::create_order(
        &state,
        &auth_other,
        CreateOrderRequest {
            items: vec![OrderLineInput {
                product_id,
                quantity: 1,
            }],
            payment_method: PaymentMethod::Cod,
            shipping_address: address(),
            notes: None,
            promotion_code: None,
        },
    )
    .await;
    assert!(matches!(
        sold_out,
        Err(AppError::Ledger(LedgerError::OutOfStock(_)))
    ));

    // Customers cannot drive status changes.
    let denied = order_service::update_status(
        &state,
        &auth_user,
        order.id,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
            tracking_number: None,
        },
    )
    .await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let confirmed = order_service::update_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "confirmed".into(),
            tracking_number: None,
        },
    )
    .await?;
    assert_eq!(confirmed.data.unwrap().order.status, OrderStatus::Confirmed);

    let low = admin_service::list_low_stock(
        &state,
        &auth_admin,
        LowStockQuery {
            page: Some(1),
            per_page: Some(20),
            threshold: Some(0),
        },
    )
    .await?;
    assert!(low.data.unwrap().items.iter().any(|p| p.id == product_id));

    let cancelled = order_service::cancel_order(&state, &auth_user, order.id).await?;
    assert_eq!(cancelled.data.unwrap().order.status, OrderStatus::Cancelled);
    assert_eq!(stock(&state, product_id).await?, 1);

    let again = order_service::cancel_order(&state, &auth_user, order.id).await;
    assert!(matches!(
        again,
        Err(AppError::Ledger(LedgerError::NotCancellable(OrderStatus::Cancelled)))
    ));

    Ok(())
}

const BUYERS: usize = 8;

// Parallel checkouts on Postgres: the last unit and the last promotion use each
// go to exactly one buyer, and lines listed in opposite orders never fail.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_keep_stock_and_promotion_limits() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping test: set TEST_DATABASE_URL to run integration flow tests.");
            return Ok(());
        }
    };

    let _guard = DB_LOCK.lock().await;
    let state = setup_state(&database_url).await?;

    let mut buyers = Vec::with_capacity(BUYERS);
    for n in 0..BUYERS {
        buyers.push(create_user(&state, "user", &format!("buyer{n}@example.com")).await?);
    }

    // Last unit.
    let orchid = create_product(&state, "Last Orchid", 100_000, 1).await?;
    let handles: Vec<_> = buyers
        .iter()
        .map(|&buyer| {
            let ledger = state.ledger.clone();
            tokio::spawn(async move {
                ledger
                    .create_order(buyer, place(&[(orchid, 1)], None))
                    .await
            })
        })
        .collect();
    let mut sold = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => sold += 1,
            Err(LedgerError::OutOfStock(id)) => assert_eq!(id, orchid),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(sold, 1);
    assert_eq!(stock(&state, orchid).await?, 0);

    // Lines in opposite orders across two plentiful products.
    let mug = create_product(&state, "Mug", 80_000, 100).await?;
    let candle = create_product(&state, "Candle", 60_000, 100).await?;
    let handles: Vec<_> = buyers
        .iter()
        .enumerate()
        .map(|(n, &buyer)| {
            let ledger = state.ledger.clone();
            let lines = if n % 2 == 0 {
                [(mug, 1), (candle, 2)]
            } else {
                [(candle, 2), (mug, 1)]
            };
            tokio::spawn(async move { ledger.create_order(buyer, place(&lines, None)).await })
        })
        .collect();
    for handle in handles {
        handle.await??;
    }
    assert_eq!(stock(&state, mug).await?, 100 - BUYERS as i32);
    assert_eq!(stock(&state, candle).await?, 100 - 2 * BUYERS as i32);

    // One redemption left on the code.
    let promotion_id = create_promotion(&state, "LASTCALL", 4).await?;
    let handles: Vec<_> = buyers
        .iter()
        .enumerate()
        .map(|(n, &buyer)| {
            let ledger = state.ledger.clone();
            let lines = if n % 2 == 0 {
                [(mug, 1), (candle, 1)]
            } else {
                [(candle, 1), (mug, 1)]
            };
            tokio::spawn(async move {
                ledger
                    .create_order(buyer, place(&lines, Some("lastcall")))
                    .await
            })
        })
        .collect();
    let mut redeemed = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => redeemed += 1,
            Err(LedgerError::InvalidPromotion(RejectReason::UsageLimitReached)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(redeemed, 1);
    let promo = Promotions::find_by_id(promotion_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("promotion vanished"))?;
    assert_eq!(promo.usage_count, 5);
    assert_eq!(stock(&state, mug).await?, 100 - BUYERS as i32 - 1);

    // Item order is stable on reload even though lines share a timestamp.
    let order_id = state
        .ledger
        .create_order(buyers[0], place(&[(candle, 1), (mug, 1)], None))
        .await?
        .record
        .order
        .id;
    let owner = AuthUser {
        user_id: buyers[0],
        role: "user".into(),
    };
    let reloaded = order_service::get_order(&state, &owner, order_id).await?;
    let line_ids: Vec<Uuid> = reloaded
        .data
        .unwrap()
        .items
        .iter()
        .map(|item| item.id)
        .collect();
    let mut sorted = line_ids.clone();
    sorted.sort();
    assert_eq!(line_ids, sorted);

    Ok(())
}

fn place(lines: &[(Uuid, i32)], promotion_code: Option<&str>) -> PlaceOrder {
    PlaceOrder {
        lines: lines
            .iter()
            .map(|&(product_id, quantity)| LineRequest {
                product_id,
                quantity,
            })
            .collect(),
        details: CheckoutDetails {
            payment_method: PaymentMethod::Cod,
            shipping_address: address(),
            notes: None,
            promotion_code: promotion_code.map(str::to_string),
        },
    }
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE notifications, order_items, orders, cart_items, promotions, audit_logs, products, users CASCADE",
    ))
    .await?;

    Ok(AppState::new(orm, ShippingPolicy::default()))
}

async fn create_user(state: &AppState, role: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        role: Set(role.into()),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_product(
    state: &AppState,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        stock: Set(stock),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(product.id)
}

async fn create_promotion(state: &AppState, code: &str, usage_count: i32) -> anyhow::Result<Uuid> {
    let promotion = PromotionActive {
        id: Set(Uuid::new_v4()),
        code: Set(code.to_string()),
        description: Set(None),
        kind: Set(DiscountKind::FixedAmount),
        value: Set(10_000),
        max_discount: Set(None),
        min_order: Set(50_000),
        starts_at: Set(None),
        ends_at: Set(None),
        usage_limit: Set(Some(5)),
        usage_count: Set(usage_count),
        is_active: Set(true),
        created_at: Set(chrono::Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(promotion.id)
}

async fn stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("product vanished"))?;
    Ok(product.stock)
}

fn address() -> ShippingAddress {
    ShippingAddress {
        recipient_name: "Dewi Lestari".into(),
        phone: "+62 812 0000 0000".into(),
        address_line: "Jl. Melati 12".into(),
        city: "Bandung".into(),
        province: None,
        postal_code: None,
    }
}
