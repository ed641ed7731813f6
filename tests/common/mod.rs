#![allow(dead_code)]

use chrono::Utc;
use uuid::Uuid;

use giftharmony_orders::{
    ledger::{CheckoutDetails, Ledger, LineRequest, PlaceOrder, ShippingPolicy},
    models::{DiscountKind, PaymentMethod, Product, Promotion, ShippingAddress},
    store::MemoryStore,
};

pub fn ledger() -> (Ledger<MemoryStore>, MemoryStore) {
    let store = MemoryStore::new();
    (Ledger::new(store.clone(), ShippingPolicy::default()), store)
}

pub async fn add_product(store: &MemoryStore, name: &str, price: i64, stock: i32) -> Uuid {
    let id = Uuid::new_v4();
    store
        .insert_product(Product {
            id,
            name: name.to_string(),
            description: None,
            price,
            stock,
            is_active: true,
            created_at: Utc::now(),
        })
        .await;
    id
}

pub fn promotion(code: &str, kind: DiscountKind, value: i64) -> Promotion {
    Promotion {
        id: Uuid::new_v4(),
        code: code.to_string(),
        description: None,
        kind,
        value,
        max_discount: None,
        min_order: 0,
        starts_at: None,
        ends_at: None,
        usage_limit: None,
        usage_count: 0,
        is_active: true,
        created_at: Utc::now(),
    }
}

pub async fn add_promotion(store: &MemoryStore, promotion: Promotion) -> Uuid {
    let id = promotion.id;
    store.insert_promotion(promotion).await;
    id
}

pub fn address() -> ShippingAddress {
    ShippingAddress {
        recipient_name: "Dewi Lestari".into(),
        phone: "+62 812 0000 0000".into(),
        address_line: "Jl. Melati 12".into(),
        city: "Bandung".into(),
        province: Some("Jawa Barat".into()),
        postal_code: Some("40115".into()),
    }
}

pub fn details(promotion_code: Option<&str>) -> CheckoutDetails {
    CheckoutDetails {
        payment_method: PaymentMethod::BankTransfer,
        shipping_address: address(),
        notes: None,
        promotion_code: promotion_code.map(str::to_string),
    }
}

pub fn place(lines: &[(Uuid, i32)], promotion_code: Option<&str>) -> PlaceOrder {
    PlaceOrder {
        lines: lines
            .iter()
            .map(|&(product_id, quantity)| LineRequest {
                product_id,
                quantity,
            })
            .collect(),
        details: details(promotion_code),
    }
}

pub async fn stock_of(store: &MemoryStore, product_id: Uuid) -> i32 {
    store
        .product(product_id)
        .await
        .map(|p| p.stock)
        .unwrap_or_default()
}
