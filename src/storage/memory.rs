//! In-process storage backend.
//!
//! A unit of work holds the store-wide lock for its whole lifetime and edits a
//! private copy of the tables; `commit` swaps the copy in. Units are therefore
//! fully serialized, and an uncommitted unit leaves no trace.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use crate::domain::aggregates::{
    Accessory, AccessoryDraft, Brand, BrandDraft, Cart, CartLine, Customer, MobilePhone, NewCustomer,
    NewOrder, NewOrderLine, NewPayment, Order, OrderLine, OrderStatus, Payment, PaymentStatus, PhoneDraft,
    ProductSummary, ProfileUpdate,
};
use crate::domain::value_objects::{Page, ProductRef};
use crate::storage::{
    AccessoryRepository, BrandRepository, CartRepository, CustomerRepository, OrderRepository,
    PaymentRepository, PhoneRepository, ProductLookup, Storage, UnitOfWork,
};
use crate::{Result, ShopError};

#[derive(Clone, Debug, Default)]
struct Sequences {
    customer: i64,
    brand: i64,
    phone: i64,
    accessory: i64,
    cart: i64,
    cart_line: i64,
    order: i64,
    order_line: i64,
    payment: i64,
}

fn next_id(slot: &mut i64) -> i64 {
    *slot += 1;
    *slot
}

#[derive(Clone, Debug, Default)]
struct Tables {
    seq: Sequences,
    customers: BTreeMap<i64, Customer>,
    brands: BTreeMap<i64, Brand>,
    phones: BTreeMap<i64, MobilePhone>,
    accessories: BTreeMap<i64, Accessory>,
    carts: BTreeMap<i64, Cart>,
    cart_lines: BTreeMap<i64, CartLine>,
    orders: BTreeMap<i64, Order>,
    order_lines: BTreeMap<i64, OrderLine>,
    payments: BTreeMap<i64, Payment>,
}

impl Tables {
    fn brand_view(&self, brand: &Brand) -> Brand {
        let phone_count = self.phones.values().filter(|p| p.brand_id == brand.brand_id).count() as i64;
        Brand { phone_count, ..brand.clone() }
    }

    fn phone_view(&self, phone: &MobilePhone) -> MobilePhone {
        let brand_name = self.brands.get(&phone.brand_id).map(|b| b.brand_name.clone()).unwrap_or_default();
        MobilePhone { brand_name, ..phone.clone() }
    }

    fn check_brand_name(&self, name: &str, except: Option<i64>) -> Result<()> {
        if self.brands.values().any(|b| b.brand_name == name && Some(b.brand_id) != except) {
            return Err(ShopError::Conflict(format!("brand with brand_name {name:?} already exists")));
        }
        Ok(())
    }

    fn check_phone_model(&self, draft: &PhoneDraft, except: Option<i64>) -> Result<()> {
        if !self.brands.contains_key(&draft.brand_id) {
            return Err(ShopError::field("brand_id", "Brand does not exist"));
        }
        if self.phones.values().any(|p| p.brand_id == draft.brand_id && p.model_name == draft.model_name && Some(p.phone_id) != except) {
            return Err(ShopError::Conflict(format!("phone {:?} already exists for this brand", draft.model_name)));
        }
        Ok(())
    }

    fn customer_of_order(&self, order_id: i64) -> Option<i64> {
        self.orders.get(&order_id).map(|o| o.customer_id)
    }
}

fn paginate<T: Clone>(rows: Vec<T>, page: Page) -> (Vec<T>, i64) {
    let total = rows.len() as i64;
    let items = rows.into_iter().skip(page.offset() as usize).take(page.limit() as usize).collect();
    (items, total)
}

#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, working }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&mut self) -> Result<()> {
        *self.guard = self.working.clone();
        Ok(())
    }
}

#[async_trait]
impl BrandRepository for MemoryUnitOfWork {
    async fn list_brands(&mut self, page: Page) -> Result<(Vec<Brand>, i64)> {
        let t = &self.working;
        let mut rows: Vec<Brand> = t.brands.values().map(|b| t.brand_view(b)).collect();
        rows.sort_by(|a, b| a.brand_name.cmp(&b.brand_name));
        Ok(paginate(rows, page))
    }

    async fn find_brand(&mut self, brand_id: i64) -> Result<Option<Brand>> {
        let t = &self.working;
        Ok(t.brands.get(&brand_id).map(|b| t.brand_view(b)))
    }

    async fn insert_brand(&mut self, draft: &BrandDraft) -> Result<Brand> {
        let t = &mut self.working;
        t.check_brand_name(&draft.brand_name, None)?;
        let now = Utc::now();
        let brand = Brand {
            brand_id: next_id(&mut t.seq.brand),
            brand_name: draft.brand_name.clone(),
            country_of_origin: draft.country_of_origin.clone(),
            phone_count: 0,
            created_at: now,
            updated_at: now,
        };
        t.brands.insert(brand.brand_id, brand.clone());
        Ok(brand)
    }

    async fn update_brand(&mut self, brand_id: i64, draft: &BrandDraft) -> Result<Option<Brand>> {
        let t = &mut self.working;
        t.check_brand_name(&draft.brand_name, Some(brand_id))?;
        let Some(brand) = t.brands.get_mut(&brand_id) else { return Ok(None) };
        brand.brand_name = draft.brand_name.clone();
        brand.country_of_origin = draft.country_of_origin.clone();
        brand.updated_at = Utc::now();
        let brand = brand.clone();
        Ok(Some(t.brand_view(&brand)))
    }

    async fn delete_brand(&mut self, brand_id: i64) -> Result<bool> {
        let t = &mut self.working;
        if t.brands.remove(&brand_id).is_none() {
            return Ok(false);
        }
        t.phones.retain(|_, p| p.brand_id != brand_id);
        Ok(true)
    }
}

#[async_trait]
impl PhoneRepository for MemoryUnitOfWork {
    async fn list_phones(&mut self, page: Page) -> Result<(Vec<MobilePhone>, i64)> {
        let t = &self.working;
        let rows: Vec<MobilePhone> = t.phones.values().rev().map(|p| t.phone_view(p)).collect();
        Ok(paginate(rows, page))
    }

    async fn find_phone(&mut self, phone_id: i64) -> Result<Option<MobilePhone>> {
        let t = &self.working;
        Ok(t.phones.get(&phone_id).map(|p| t.phone_view(p)))
    }

    async fn insert_phone(&mut self, draft: &PhoneDraft) -> Result<MobilePhone> {
        let t = &mut self.working;
        t.check_phone_model(draft, None)?;
        let now = Utc::now();
        let phone = MobilePhone {
            phone_id: next_id(&mut t.seq.phone),
            brand_id: draft.brand_id,
            brand_name: String::new(),
            model_name: draft.model_name.clone(),
            price: draft.price,
            stock_quantity: draft.stock_quantity,
            ram: draft.ram.clone(),
            storage: draft.storage.clone(),
            battery_capacity: draft.battery_capacity.clone(),
            processor: draft.processor.clone(),
            os: draft.os,
            description: draft.description.clone(),
            image_url: draft.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        t.phones.insert(phone.phone_id, phone.clone());
        Ok(t.phone_view(&phone))
    }

    async fn update_phone(&mut self, phone_id: i64, draft: &PhoneDraft) -> Result<Option<MobilePhone>> {
        let t = &mut self.working;
        if !t.phones.contains_key(&phone_id) {
            return Ok(None);
        }
        t.check_phone_model(draft, Some(phone_id))?;
        let Some(phone) = t.phones.get_mut(&phone_id) else { return Ok(None) };
        phone.brand_id = draft.brand_id;
        phone.model_name = draft.model_name.clone();
        phone.price = draft.price;
        phone.stock_quantity = draft.stock_quantity;
        phone.ram = draft.ram.clone();
        phone.storage = draft.storage.clone();
        phone.battery_capacity = draft.battery_capacity.clone();
        phone.processor = draft.processor.clone();
        phone.os = draft.os;
        phone.description = draft.description.clone();
        phone.image_url = draft.image_url.clone();
        phone.updated_at = Utc::now();
        let phone = phone.clone();
        Ok(Some(t.phone_view(&phone)))
    }

    async fn delete_phone(&mut self, phone_id: i64) -> Result<bool> {
        Ok(self.working.phones.remove(&phone_id).is_some())
    }
}

#[async_trait]
impl AccessoryRepository for MemoryUnitOfWork {
    async fn list_accessories(&mut self, page: Page) -> Result<(Vec<Accessory>, i64)> {
        Ok(paginate(self.working.accessories.values().rev().cloned().collect(), page))
    }

    async fn find_accessory(&mut self, accessory_id: i64) -> Result<Option<Accessory>> {
        Ok(self.working.accessories.get(&accessory_id).cloned())
    }

    async fn insert_accessory(&mut self, draft: &AccessoryDraft) -> Result<Accessory> {
        let t = &mut self.working;
        let now = Utc::now();
        let accessory = Accessory {
            accessory_id: next_id(&mut t.seq.accessory),
            name: draft.name.clone(),
            category: draft.category,
            price: draft.price,
            stock_quantity: draft.stock_quantity,
            description: draft.description.clone(),
            image_url: draft.image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        t.accessories.insert(accessory.accessory_id, accessory.clone());
        Ok(accessory)
    }

    async fn update_accessory(&mut self, accessory_id: i64, draft: &AccessoryDraft) -> Result<Option<Accessory>> {
        let Some(accessory) = self.working.accessories.get_mut(&accessory_id) else { return Ok(None) };
        accessory.name = draft.name.clone();
        accessory.category = draft.category;
        accessory.price = draft.price;
        accessory.stock_quantity = draft.stock_quantity;
        accessory.description = draft.description.clone();
        accessory.image_url = draft.image_url.clone();
        accessory.updated_at = Utc::now();
        Ok(Some(accessory.clone()))
    }

    async fn delete_accessory(&mut self, accessory_id: i64) -> Result<bool> {
        Ok(self.working.accessories.remove(&accessory_id).is_some())
    }
}

#[async_trait]
impl ProductLookup for MemoryUnitOfWork {
    async fn find_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>> {
        let t = &self.working;
        Ok(match product {
            ProductRef::Phone(id) => t.phones.get(&id).map(|p| ProductSummary::from(&t.phone_view(p))),
            ProductRef::Accessory(id) => t.accessories.get(&id).map(ProductSummary::from),
        })
    }

    async fn lock_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>> {
        // The unit of work already owns the store-wide lock.
        self.find_product(product).await
    }

    async fn set_stock(&mut self, product: ProductRef, stock_quantity: i32) -> Result<bool> {
        if stock_quantity < 0 {
            return Err(ShopError::Conflict(format!("stock of {product} cannot go below zero")));
        }
        let t = &mut self.working;
        let now = Utc::now();
        let updated = match product {
            ProductRef::Phone(id) => t.phones.get_mut(&id).map(|p| {
                p.stock_quantity = stock_quantity;
                p.updated_at = now;
            }),
            ProductRef::Accessory(id) => t.accessories.get_mut(&id).map(|a| {
                a.stock_quantity = stock_quantity;
                a.updated_at = now;
            }),
        };
        Ok(updated.is_some())
    }
}

#[async_trait]
impl CustomerRepository for MemoryUnitOfWork {
    async fn list_customers(&mut self) -> Result<Vec<Customer>> {
        Ok(self.working.customers.values().rev().cloned().collect())
    }

    async fn find_customer(&mut self, customer_id: i64) -> Result<Option<Customer>> {
        Ok(self.working.customers.get(&customer_id).cloned())
    }

    async fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>> {
        Ok(self.working.customers.values().find(|c| c.email == email).cloned())
    }

    async fn insert_customer(&mut self, customer: &NewCustomer) -> Result<Customer> {
        let t = &mut self.working;
        if t.customers.values().any(|c| c.email == customer.email) {
            return Err(ShopError::Conflict("customer with this email already exists".into()));
        }
        let now = Utc::now();
        let record = Customer {
            customer_id: next_id(&mut t.seq.customer),
            name: customer.name.clone(),
            email: customer.email.clone(),
            phone: customer.phone.clone(),
            address: customer.address.clone(),
            is_active: true,
            is_staff: customer.is_staff,
            date_joined: now,
            updated_at: now,
            password_hash: customer.password_hash.clone(),
        };
        t.customers.insert(record.customer_id, record.clone());
        Ok(record)
    }

    async fn update_profile(&mut self, customer_id: i64, update: &ProfileUpdate) -> Result<Customer> {
        let customer = self.working.customers.get_mut(&customer_id).ok_or(ShopError::NotFound("Customer"))?;
        if let Some(name) = &update.name {
            customer.name = name.clone();
        }
        if let Some(phone) = &update.phone {
            customer.phone = phone.clone();
        }
        if let Some(address) = &update.address {
            customer.address = Some(address.clone());
        }
        customer.updated_at = Utc::now();
        Ok(customer.clone())
    }

    async fn update_password_hash(&mut self, customer_id: i64, password_hash: &str) -> Result<()> {
        let customer = self.working.customers.get_mut(&customer_id).ok_or(ShopError::NotFound("Customer"))?;
        customer.password_hash = password_hash.to_string();
        customer.updated_at = Utc::now();
        Ok(())
    }

    async fn set_staff(&mut self, customer_id: i64, is_staff: bool) -> Result<()> {
        let customer = self.working.customers.get_mut(&customer_id).ok_or(ShopError::NotFound("Customer"))?;
        customer.is_staff = is_staff;
        customer.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl CartRepository for MemoryUnitOfWork {
    async fn find_cart(&mut self, customer_id: i64) -> Result<Option<Cart>> {
        Ok(self.working.carts.values().find(|c| c.customer_id == customer_id).cloned())
    }

    async fn lock_cart(&mut self, customer_id: i64) -> Result<Option<Cart>> {
        self.find_cart(customer_id).await
    }

    async fn get_or_create_cart(&mut self, customer_id: i64) -> Result<Cart> {
        if let Some(cart) = self.find_cart(customer_id).await? {
            return Ok(cart);
        }
        let t = &mut self.working;
        let now = Utc::now();
        let cart = Cart { cart_id: next_id(&mut t.seq.cart), customer_id, created_at: now, updated_at: now };
        t.carts.insert(cart.cart_id, cart.clone());
        Ok(cart)
    }

    async fn list_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>> {
        Ok(self.working.cart_lines.values().filter(|l| l.cart_id == cart_id).cloned().collect())
    }

    async fn find_cart_line(&mut self, cart_id: i64, cart_item_id: i64) -> Result<Option<CartLine>> {
        Ok(self.working.cart_lines.get(&cart_item_id).filter(|l| l.cart_id == cart_id).cloned())
    }

    async fn find_cart_line_for(&mut self, cart_id: i64, product: ProductRef) -> Result<Option<CartLine>> {
        Ok(self.working.cart_lines.values().find(|l| l.cart_id == cart_id && l.product == product).cloned())
    }

    async fn insert_cart_line(&mut self, cart_id: i64, product: ProductRef, quantity: i32) -> Result<CartLine> {
        if self.find_cart_line_for(cart_id, product).await?.is_some() {
            return Err(ShopError::Conflict(format!("{product} is already in the cart")));
        }
        let t = &mut self.working;
        let now = Utc::now();
        let line = CartLine { cart_item_id: next_id(&mut t.seq.cart_line), cart_id, product, quantity, created_at: now, updated_at: now };
        t.cart_lines.insert(line.cart_item_id, line.clone());
        Ok(line)
    }

    async fn set_cart_line_quantity(&mut self, cart_item_id: i64, quantity: i32) -> Result<CartLine> {
        let line = self.working.cart_lines.get_mut(&cart_item_id).ok_or(ShopError::NotFound("Cart item"))?;
        line.quantity = quantity;
        line.updated_at = Utc::now();
        Ok(line.clone())
    }

    async fn delete_cart_line(&mut self, cart_item_id: i64) -> Result<bool> {
        Ok(self.working.cart_lines.remove(&cart_item_id).is_some())
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64> {
        let before = self.working.cart_lines.len();
        self.working.cart_lines.retain(|_, l| l.cart_id != cart_id);
        Ok((before - self.working.cart_lines.len()) as u64)
    }
}

#[async_trait]
impl OrderRepository for MemoryUnitOfWork {
    async fn list_orders(&mut self, customer_id: Option<i64>) -> Result<Vec<Order>> {
        Ok(self
            .working
            .orders
            .values()
            .rev()
            .filter(|o| customer_id.map_or(true, |c| o.customer_id == c))
            .cloned()
            .collect())
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        Ok(self.working.orders.get(&order_id).cloned())
    }

    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        self.find_order(order_id).await
    }

    async fn insert_order(&mut self, order: &NewOrder) -> Result<Order> {
        let t = &mut self.working;
        let now = Utc::now();
        let record = Order {
            order_id: next_id(&mut t.seq.order),
            customer_id: order.customer_id,
            order_date: now,
            status: OrderStatus::Pending,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address.clone(),
            notes: order.notes.clone(),
            updated_at: now,
        };
        t.orders.insert(record.order_id, record.clone());
        Ok(record)
    }

    async fn insert_order_line(&mut self, order_id: i64, line: &NewOrderLine) -> Result<OrderLine> {
        let t = &mut self.working;
        if !t.orders.contains_key(&order_id) {
            return Err(ShopError::NotFound("Order"));
        }
        let record = OrderLine {
            order_item_id: next_id(&mut t.seq.order_line),
            order_id,
            product: line.product,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            price_at_purchase: line.price_at_purchase,
            created_at: Utc::now(),
        };
        t.order_lines.insert(record.order_item_id, record.clone());
        Ok(record)
    }

    async fn list_order_lines(&mut self, order_id: i64) -> Result<Vec<OrderLine>> {
        Ok(self.working.order_lines.values().filter(|l| l.order_id == order_id).cloned().collect())
    }

    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order> {
        let order = self.working.orders.get_mut(&order_id).ok_or(ShopError::NotFound("Order"))?;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}

#[async_trait]
impl PaymentRepository for MemoryUnitOfWork {
    async fn list_payments(&mut self, customer_id: Option<i64>) -> Result<Vec<Payment>> {
        let t = &self.working;
        Ok(t.payments
            .values()
            .rev()
            .filter(|p| customer_id.map_or(true, |c| t.customer_of_order(p.order_id) == Some(c)))
            .cloned()
            .collect())
    }

    async fn find_payment(&mut self, payment_id: i64) -> Result<Option<Payment>> {
        Ok(self.working.payments.get(&payment_id).cloned())
    }

    async fn has_completed_payment(&mut self, order_id: i64) -> Result<bool> {
        Ok(self.working.payments.values().any(|p| p.order_id == order_id && p.status == PaymentStatus::Completed))
    }

    async fn insert_payment(&mut self, payment: &NewPayment) -> Result<Payment> {
        let t = &mut self.working;
        if !t.orders.contains_key(&payment.order_id) {
            return Err(ShopError::NotFound("Order"));
        }
        let now = Utc::now();
        let record = Payment {
            payment_id: next_id(&mut t.seq.payment),
            order_id: payment.order_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            payment_date: now,
            status: payment.status,
            transaction_id: payment.transaction_id.clone(),
            notes: payment.notes.clone(),
            updated_at: now,
        };
        t.payments.insert(record.payment_id, record.clone());
        Ok(record)
    }

    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> Result<Payment> {
        let payment = self.working.payments.get_mut(&payment_id).ok_or(ShopError::NotFound("Payment"))?;
        payment.status = status;
        payment.updated_at = Utc::now();
        Ok(payment.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn brand() -> BrandDraft {
        BrandDraft { brand_name: "Apple".into(), country_of_origin: "USA".into() }
    }

    #[tokio::test]
    async fn test_uncommitted_unit_leaves_no_trace() {
        let storage = MemoryStorage::new();
        {
            let mut uow = storage.begin().await.unwrap();
            uow.insert_brand(&brand()).await.unwrap();
        }
        let mut uow = storage.begin().await.unwrap();
        assert_eq!(uow.list_brands(Page::default()).await.unwrap().1, 0);
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let storage = MemoryStorage::new();
        let mut uow = storage.begin().await.unwrap();
        let b = uow.insert_brand(&brand()).await.unwrap();
        uow.commit().await.unwrap();
        drop(uow);
        let mut uow = storage.begin().await.unwrap();
        assert_eq!(uow.find_brand(b.brand_id).await.unwrap().map(|b| b.brand_name), Some("Apple".into()));
    }

    #[tokio::test]
    async fn test_unique_brand_name() {
        let storage = MemoryStorage::new();
        let mut uow = storage.begin().await.unwrap();
        uow.insert_brand(&brand()).await.unwrap();
        assert!(matches!(uow.insert_brand(&brand()).await, Err(ShopError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_stock_cannot_go_negative() {
        let storage = MemoryStorage::new();
        let mut uow = storage.begin().await.unwrap();
        let a = uow
            .insert_accessory(&AccessoryDraft {
                name: "Cable".into(), category: Default::default(), price: Decimal::new(999, 2),
                stock_quantity: 1, description: None, image_url: None,
            })
            .await
            .unwrap();
        let product = ProductRef::Accessory(a.accessory_id);
        assert!(uow.set_stock(product, -1).await.is_err());
        assert!(uow.set_stock(product, 0).await.unwrap());
        assert!(!uow.set_stock(ProductRef::Accessory(99), 1).await.unwrap());
    }
}
