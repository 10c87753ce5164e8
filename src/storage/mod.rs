//! Data access.
//!
//! Each entity has its own repository trait. A [`UnitOfWork`] implements all
//! of them over one transaction; nothing it writes is visible to other units
//! until [`UnitOfWork::commit`] succeeds, and dropping it uncommitted discards
//! every write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use crate::domain::aggregates::{
    Accessory, AccessoryDraft, Brand, BrandDraft, Cart, CartLine, Customer, MobilePhone, NewCustomer,
    NewOrder, NewOrderLine, NewPayment, Order, OrderLine, OrderStatus, Payment, PaymentStatus, PhoneDraft,
    ProductSummary, ProfileUpdate,
};
use crate::domain::value_objects::{Page, ProductRef};
use crate::Result;

pub use memory::MemoryStorage;
pub use postgres::PgStorage;

#[async_trait]
pub trait BrandRepository: Send {
    async fn list_brands(&mut self, page: Page) -> Result<(Vec<Brand>, i64)>;
    async fn find_brand(&mut self, brand_id: i64) -> Result<Option<Brand>>;
    async fn insert_brand(&mut self, draft: &BrandDraft) -> Result<Brand>;
    async fn update_brand(&mut self, brand_id: i64, draft: &BrandDraft) -> Result<Option<Brand>>;
    /// Removes the brand together with its phones.
    async fn delete_brand(&mut self, brand_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait PhoneRepository: Send {
    async fn list_phones(&mut self, page: Page) -> Result<(Vec<MobilePhone>, i64)>;
    async fn find_phone(&mut self, phone_id: i64) -> Result<Option<MobilePhone>>;
    async fn insert_phone(&mut self, draft: &PhoneDraft) -> Result<MobilePhone>;
    async fn update_phone(&mut self, phone_id: i64, draft: &PhoneDraft) -> Result<Option<MobilePhone>>;
    async fn delete_phone(&mut self, phone_id: i64) -> Result<bool>;
}

#[async_trait]
pub trait AccessoryRepository: Send {
    async fn list_accessories(&mut self, page: Page) -> Result<(Vec<Accessory>, i64)>;
    async fn find_accessory(&mut self, accessory_id: i64) -> Result<Option<Accessory>>;
    async fn insert_accessory(&mut self, draft: &AccessoryDraft) -> Result<Accessory>;
    async fn update_accessory(&mut self, accessory_id: i64, draft: &AccessoryDraft) -> Result<Option<Accessory>>;
    async fn delete_accessory(&mut self, accessory_id: i64) -> Result<bool>;
}

/// Resolves a [`ProductRef`] regardless of which catalog table it lives in.
#[async_trait]
pub trait ProductLookup: Send {
    async fn find_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>>;
    /// Like [`ProductLookup::find_product`], holding a row lock until the unit of work ends.
    async fn lock_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>>;
    /// Writes an absolute stock level. Returns `false` if the product is gone.
    async fn set_stock(&mut self, product: ProductRef, stock_quantity: i32) -> Result<bool>;
}

#[async_trait]
pub trait CustomerRepository: Send {
    async fn list_customers(&mut self) -> Result<Vec<Customer>>;
    async fn find_customer(&mut self, customer_id: i64) -> Result<Option<Customer>>;
    async fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>>;
    async fn insert_customer(&mut self, customer: &NewCustomer) -> Result<Customer>;
    async fn update_profile(&mut self, customer_id: i64, update: &ProfileUpdate) -> Result<Customer>;
    async fn update_password_hash(&mut self, customer_id: i64, password_hash: &str) -> Result<()>;
    async fn set_staff(&mut self, customer_id: i64, is_staff: bool) -> Result<()>;
}

#[async_trait]
pub trait CartRepository: Send {
    async fn find_cart(&mut self, customer_id: i64) -> Result<Option<Cart>>;
    /// Like [`CartRepository::find_cart`], holding a row lock until the unit of work ends.
    async fn lock_cart(&mut self, customer_id: i64) -> Result<Option<Cart>>;
    async fn get_or_create_cart(&mut self, customer_id: i64) -> Result<Cart>;
    async fn list_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>>;
    async fn find_cart_line(&mut self, cart_id: i64, cart_item_id: i64) -> Result<Option<CartLine>>;
    async fn find_cart_line_for(&mut self, cart_id: i64, product: ProductRef) -> Result<Option<CartLine>>;
    async fn insert_cart_line(&mut self, cart_id: i64, product: ProductRef, quantity: i32) -> Result<CartLine>;
    async fn set_cart_line_quantity(&mut self, cart_item_id: i64, quantity: i32) -> Result<CartLine>;
    async fn delete_cart_line(&mut self, cart_item_id: i64) -> Result<bool>;
    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64>;
}

#[async_trait]
pub trait OrderRepository: Send {
    /// Newest first; `None` lists every customer's orders.
    async fn list_orders(&mut self, customer_id: Option<i64>) -> Result<Vec<Order>>;
    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>>;
    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>>;
    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order>;
    async fn insert_order_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<OrderLine>;
    async fn list_order_lines(&mut self, order_id: i64) -> Result<Vec<OrderLine>>;
    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order>;
}

#[async_trait]
pub trait PaymentRepository: Send {
    /// Newest first; `Some(customer)` restricts to payments on that customer's orders.
    async fn list_payments(&mut self, customer_id: Option<i64>) -> Result<Vec<Payment>>;
    async fn find_payment(&mut self, payment_id: i64) -> Result<Option<Payment>>;
    async fn has_completed_payment(&mut self, order_id: i64) -> Result<bool>;
    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment>;
    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> Result<Payment>;
}

#[async_trait]
pub trait UnitOfWork:
    BrandRepository
    + PhoneRepository
    + AccessoryRepository
    + ProductLookup
    + CustomerRepository
    + CartRepository
    + OrderRepository
    + PaymentRepository
    + Send
{
    async fn commit(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Storage: Send + Sync + 'static {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
    async fn ping(&self) -> Result<()>;
}
