//! Checkout, cancellation and payments against a real database.
//!
//! Run with `DATABASE_URL` pointing at a Postgres server the test user may
//! create databases on: `cargo test --features postgres-tests --test postgres`.
#![cfg(feature = "postgres-tests")]

use chrono::Duration;
use mobile_store::auth::TokenIssuer;
use mobile_store::domain::aggregates::{
    AccessoryCategory, AccessoryDraft, BrandDraft, CheckoutRequest, OrderStatus, PaymentMethod, PaymentRequest,
    PaymentStatus, PhoneDraft, PhoneOs, Registration,
};
use mobile_store::domain::value_objects::ProductType;
use mobile_store::events::EventPublisher;
use mobile_store::services::cart::AddItem;
use mobile_store::services::{Actor, Services};
use mobile_store::storage::PgStorage;
use mobile_store::ShopError;
use rust_decimal::Decimal;
use sqlx::PgPool;
use std::sync::Arc;

const STAFF: Actor = Actor { customer_id: 0, is_staff: true };

fn services(pool: &PgPool) -> Services {
    let tokens = TokenIssuer::new(b"postgres-secret", Duration::minutes(5), Duration::minutes(60));
    Services::new(Arc::new(PgStorage::new(pool.clone())), EventPublisher::disabled(), tokens)
}

async fn customer(services: &Services, email: &str) -> Actor {
    let customer = services
        .customers
        .register(Registration {
            name: "Test Customer".into(),
            email: email.into(),
            phone: "+1234567890".into(),
            address: None,
            password: "Str0ng!pass".into(),
            password2: "Str0ng!pass".into(),
        })
        .await
        .unwrap();
    Actor { customer_id: customer.customer_id, is_staff: false }
}

fn accessory_draft(stock_quantity: i32) -> AccessoryDraft {
    AccessoryDraft {
        name: "USB-C Charger".into(),
        category: AccessoryCategory::Charger,
        price: Decimal::new(49900, 2),
        stock_quantity,
        description: None,
        image_url: None,
    }
}

/// Phone 999.99 and accessory 499.00 with the given stock.
async fn seed(services: &Services, phone_stock: i32, accessory_stock: i32) -> (i64, i64) {
    let brand = services
        .catalog
        .create_brand(&STAFF, BrandDraft { brand_name: "Apple".into(), country_of_origin: "USA".into() })
        .await
        .unwrap();
    let phone = services
        .catalog
        .create_phone(&STAFF, PhoneDraft {
            brand_id: brand.brand_id,
            model_name: "iPhone 15".into(),
            price: Decimal::new(99999, 2),
            stock_quantity: phone_stock,
            ram: "6GB".into(),
            storage: "128GB".into(),
            battery_capacity: "3349mAh".into(),
            processor: "A16 Bionic".into(),
            os: PhoneOs::Ios,
            description: None,
            image_url: None,
        })
        .await
        .unwrap();
    let accessory = services.catalog.create_accessory(&STAFF, accessory_draft(accessory_stock)).await.unwrap();
    (phone.phone_id, accessory.accessory_id)
}

async fn add(services: &Services, actor: &Actor, product_type: ProductType, product_id: i64, quantity: i32) {
    services.cart.add_item(actor, AddItem { product_type, product_id, quantity }).await.unwrap();
}

fn checkout() -> CheckoutRequest {
    CheckoutRequest { shipping_address: "221B Baker Street".into(), notes: None }
}

fn pay(order_id: i64) -> PaymentRequest {
    PaymentRequest { order_id, payment_method: PaymentMethod::CreditCard, transaction_id: None, notes: None }
}

async fn stock(services: &Services, phone_id: i64, accessory_id: i64) -> (i32, i32) {
    (
        services.catalog.get_phone(phone_id).await.unwrap().stock_quantity,
        services.catalog.get_accessory(accessory_id).await.unwrap().stock_quantity,
    )
}

#[sqlx::test(migrations = "./migrations")]
async fn checkout_snapshots_lines_and_decrements_stock(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, accessory_id) = seed(&services, 10, 5).await;
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone_id, 1).await;
    add(&services, &buyer, ProductType::Accessory, accessory_id, 2).await;

    let order = services.orders.create_from_cart(&buyer, checkout()).await.unwrap();
    assert_eq!(order.order.total_amount, Decimal::new(199799, 2));
    assert_eq!(order.order.status, OrderStatus::Pending);
    assert_eq!(order.total_items(), 3);
    assert_eq!(order.lines[0].product_name, "Apple iPhone 15");
    assert_eq!(stock(&services, phone_id, accessory_id).await, (9, 3));
    assert!(services.cart.my_cart(&buyer).await.unwrap().is_empty());

    let stored = services.orders.get(&buyer, order.order.order_id).await.unwrap();
    assert_eq!(stored.lines, order.lines);
    assert_eq!(stored.customer_email, "buyer@example.com");
}

#[sqlx::test(migrations = "./migrations")]
async fn short_stock_aborts_the_whole_checkout(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, accessory_id) = seed(&services, 10, 5).await;
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone_id, 1).await;
    add(&services, &buyer, ProductType::Accessory, accessory_id, 4).await;
    services.catalog.update_accessory(&STAFF, accessory_id, accessory_draft(3)).await.unwrap();

    let err = services.orders.create_from_cart(&buyer, checkout()).await.unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");
    assert!(services.orders.list(&STAFF).await.unwrap().is_empty());
    assert_eq!(stock(&services, phone_id, accessory_id).await, (10, 3));
    assert_eq!(services.cart.my_cart(&buyer).await.unwrap().lines.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_checkouts_of_one_cart_place_one_order(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, accessory_id) = seed(&services, 10, 5).await;
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone_id, 1).await;

    // Hold the phone row so both checkouts are in flight before either can finish.
    let mut blocker = pool.begin().await.unwrap();
    sqlx::query("SELECT phone_id FROM mobile_phones WHERE phone_id = $1 FOR UPDATE")
        .bind(phone_id)
        .execute(&mut *blocker)
        .await
        .unwrap();

    let spawn_checkout = move |services: Services| tokio::spawn(async move { services.orders.create_from_cart(&buyer, checkout()).await });
    let first = spawn_checkout(services.clone());
    let second = spawn_checkout(services.clone());
    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
    blocker.commit().await.unwrap();

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
    let failure = outcomes.into_iter().find_map(|r| r.err()).unwrap();
    assert!(matches!(failure, ShopError::InvalidState(_)), "{failure:?}");

    assert_eq!(services.orders.my_orders(&buyer).await.unwrap().len(), 1);
    assert_eq!(stock(&services, phone_id, accessory_id).await, (9, 5));
}

#[sqlx::test(migrations = "./migrations")]
async fn concurrent_checkouts_never_oversell(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, _) = seed(&services, 1, 5).await;
    let mut buyers = Vec::new();
    for email in ["a@example.com", "b@example.com", "c@example.com"] {
        let buyer = customer(&services, email).await;
        add(&services, &buyer, ProductType::Phone, phone_id, 1).await;
        buyers.push(buyer);
    }

    let tasks: Vec<_> = buyers
        .into_iter()
        .map(|buyer| {
            let services = services.clone();
            tokio::spawn(async move { services.orders.create_from_cart(&buyer, checkout()).await })
        })
        .collect();
    let mut placed = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => placed += 1,
            Err(err) => assert!(matches!(err, ShopError::Conflict(_)), "{err:?}"),
        }
    }
    assert_eq!(placed, 1);
    assert_eq!(services.catalog.get_phone(phone_id).await.unwrap().stock_quantity, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn cancel_restores_stock_and_skips_deleted_products(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, accessory_id) = seed(&services, 10, 5).await;
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone_id, 2).await;
    add(&services, &buyer, ProductType::Accessory, accessory_id, 1).await;
    let order = services.orders.create_from_cart(&buyer, checkout()).await.unwrap();
    services.catalog.delete_accessory(&STAFF, accessory_id).await.unwrap();

    let cancelled = services.orders.cancel(&buyer, order.order.order_id).await.unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(services.catalog.get_phone(phone_id).await.unwrap().stock_quantity, 10);

    let err = services.orders.cancel(&buyer, order.order.order_id).await.unwrap_err();
    assert!(matches!(err, ShopError::InvalidState(_)));
    assert_eq!(services.catalog.get_phone(phone_id).await.unwrap().stock_quantity, 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn payments_keep_one_completed_per_order(pool: PgPool) {
    let services = services(&pool);
    let (phone_id, _) = seed(&services, 10, 5).await;
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone_id, 2).await;
    let order_id = services.orders.create_from_cart(&buyer, checkout()).await.unwrap().order.order_id;

    let first = services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();
    assert_eq!(first.amount, Decimal::new(199998, 2));
    assert_eq!(services.orders.get(&buyer, order_id).await.unwrap().order.status, OrderStatus::Confirmed);
    assert!(matches!(services.payments.create_payment(&buyer, pay(order_id)).await, Err(ShopError::Conflict(_))));

    services.payments.update_status(&STAFF, first.payment_id, PaymentStatus::Failed).await.unwrap();
    assert_eq!(services.orders.get(&buyer, order_id).await.unwrap().order.status, OrderStatus::Pending);
    services.payments.create_payment(&buyer, pay(order_id)).await.unwrap();

    let err = services.payments.update_status(&STAFF, first.payment_id, PaymentStatus::Completed).await.unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
    let completed = services
        .payments
        .my_payments(&buyer)
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .count();
    assert_eq!(completed, 1);
}

#[sqlx::test(migrations = "./migrations")]
async fn unique_constraints_surface_as_conflicts(pool: PgPool) {
    let services = services(&pool);
    seed(&services, 1, 1).await;
    let err = services
        .catalog
        .create_brand(&STAFF, BrandDraft { brand_name: "Apple".into(), country_of_origin: "USA".into() })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)), "{err:?}");

    customer(&services, "buyer@example.com").await;
    let err = services
        .customers
        .register(Registration {
            name: "Someone Else".into(),
            email: "buyer@example.com".into(),
            phone: "+1987654321".into(),
            address: None,
            password: "Str0ng!pass".into(),
            password2: "Str0ng!pass".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ShopError::Conflict(_)));
}

#[sqlx::test(migrations = "./migrations")]
async fn large_orders_fit_the_total_column(pool: PgPool) {
    let services = services(&pool);
    let brand = services
        .catalog
        .create_brand(&STAFF, BrandDraft { brand_name: "Vertu".into(), country_of_origin: "UK".into() })
        .await
        .unwrap();
    let phone = services
        .catalog
        .create_phone(&STAFF, PhoneDraft {
            brand_id: brand.brand_id,
            model_name: "Signature".into(),
            price: Decimal::new(99999999, 2),
            stock_quantity: 999_999,
            ram: "4GB".into(),
            storage: "64GB".into(),
            battery_capacity: "2000mAh".into(),
            processor: "Snapdragon".into(),
            os: PhoneOs::Android,
            description: None,
            image_url: None,
        })
        .await
        .unwrap();
    let buyer = customer(&services, "buyer@example.com").await;
    add(&services, &buyer, ProductType::Phone, phone.phone_id, 999_999).await;

    let order = services.orders.create_from_cart(&buyer, checkout()).await.unwrap();
    assert_eq!(order.order.total_amount, Decimal::new(99999899000001, 2));
    let payment = services.payments.create_payment(&buyer, pay(order.order.order_id)).await.unwrap();
    assert_eq!(payment.amount, order.order.total_amount);
}
