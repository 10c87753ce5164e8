//! PostgreSQL storage backend.
//!
//! Each unit of work is one database transaction. Cart, product and order rows
//! read through the `lock_*` methods are taken `FOR UPDATE`, so concurrent
//! checkouts of the same cart or product queue behind each other instead of
//! both passing the stock check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{PgConnection, Postgres, Transaction};
use tracing::{info, instrument};
use crate::domain::aggregates::{
    Accessory, AccessoryDraft, Brand, BrandDraft, Cart, CartLine, Customer, MobilePhone, NewCustomer,
    NewOrder, NewOrderLine, NewPayment, Order, OrderLine, OrderStatus, Payment, PaymentStatus, PhoneDraft,
    ProductSummary, ProfileUpdate,
};
use crate::domain::value_objects::{Page, ProductRef, ProductType};
use crate::storage::{
    AccessoryRepository, BrandRepository, CartRepository, CustomerRepository, OrderRepository,
    PaymentRepository, PhoneRepository, ProductLookup, Storage, UnitOfWork,
};
use crate::{Result, ShopError};

const BRAND_SELECT: &str = r#"
    SELECT b.brand_id, b.brand_name, b.country_of_origin,
           (SELECT COUNT(*) FROM mobile_phones p WHERE p.brand_id = b.brand_id) AS phone_count,
           b.created_at, b.updated_at
    FROM brands b
"#;

const PHONE_SELECT: &str = r#"
    SELECT p.phone_id, p.brand_id, b.brand_name, p.model_name, p.price, p.stock_quantity,
           p.ram, p.storage, p.battery_capacity, p.processor, p.os, p.description, p.image_url,
           p.created_at, p.updated_at
    FROM mobile_phones p
    JOIN brands b ON b.brand_id = p.brand_id
"#;

#[derive(sqlx::FromRow)]
struct CartLineRow {
    cart_item_id: i64,
    cart_id: i64,
    product_type: ProductType,
    product_id: i64,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartLineRow> for CartLine {
    fn from(r: CartLineRow) -> Self {
        Self {
            cart_item_id: r.cart_item_id,
            cart_id: r.cart_id,
            product: ProductRef::new(r.product_type, r.product_id),
            quantity: r.quantity,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderLineRow {
    order_item_id: i64,
    order_id: i64,
    product_type: ProductType,
    product_id: i64,
    product_name: String,
    quantity: i32,
    price_at_purchase: Decimal,
    created_at: DateTime<Utc>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(r: OrderLineRow) -> Self {
        Self {
            order_item_id: r.order_item_id,
            order_id: r.order_id,
            product: ProductRef::new(r.product_type, r.product_id),
            product_name: r.product_name,
            quantity: r.quantity,
            price_at_purchase: r.price_at_purchase,
            created_at: r.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    name: String,
    price: Decimal,
    stock_quantity: i32,
}

/// Maps constraint violations to client-facing errors; everything else is a storage failure.
fn constraint_error(what: &'static str) -> impl FnOnce(sqlx::Error) -> ShopError {
    move |e| {
        let code = e.as_database_error().and_then(|d| d.code()).map(|c| c.into_owned());
        match code.as_deref() {
            Some("23505") => ShopError::Conflict(format!("{what} already exists")),
            Some("23503") => ShopError::validation(format!("{what} references a missing record")),
            Some("23514") => ShopError::Conflict(format!("{what} violates a constraint")),
            _ => e.into(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(max_connections).connect(url).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ShopError::Storage(e.to_string()))?;
        info!(max_connections, "postgres storage ready");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Rolls back on drop unless committed.
pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    fn conn(&mut self) -> Result<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| ShopError::Internal("unit of work used after commit".into()))
    }

    async fn product_row(&mut self, product: ProductRef, lock: bool) -> Result<Option<ProductSummary>> {
        let sql = match (product, lock) {
            (ProductRef::Phone(_), false) => "SELECT b.brand_name || ' ' || p.model_name AS name, p.price, p.stock_quantity FROM mobile_phones p JOIN brands b ON b.brand_id = p.brand_id WHERE p.phone_id = $1",
            (ProductRef::Phone(_), true) => "SELECT b.brand_name || ' ' || p.model_name AS name, p.price, p.stock_quantity FROM mobile_phones p JOIN brands b ON b.brand_id = p.brand_id WHERE p.phone_id = $1 FOR UPDATE OF p",
            (ProductRef::Accessory(_), false) => "SELECT name, price, stock_quantity FROM accessories WHERE accessory_id = $1",
            (ProductRef::Accessory(_), true) => "SELECT name, price, stock_quantity FROM accessories WHERE accessory_id = $1 FOR UPDATE",
        };
        let row = sqlx::query_as::<_, ProductRow>(sql)
            .bind(product.id())
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.map(|r| ProductSummary { product, name: r.name, price: r.price, stock_quantity: r.stock_quantity }))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&mut self) -> Result<()> {
        match self.tx.take() {
            Some(tx) => Ok(tx.commit().await?),
            None => Err(ShopError::Internal("unit of work committed twice".into())),
        }
    }
}

#[async_trait]
impl BrandRepository for PgUnitOfWork {
    #[instrument(skip_all, name = "SQL:ListBrands", err)]
    async fn list_brands(&mut self, page: Page) -> Result<(Vec<Brand>, i64)> {
        let rows = sqlx::query_as::<_, Brand>(&format!("{BRAND_SELECT} ORDER BY b.brand_name LIMIT $1 OFFSET $2"))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.conn()?)
            .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM brands").fetch_one(self.conn()?).await?;
        Ok((rows, total.0))
    }

    async fn find_brand(&mut self, brand_id: i64) -> Result<Option<Brand>> {
        Ok(sqlx::query_as::<_, Brand>(&format!("{BRAND_SELECT} WHERE b.brand_id = $1"))
            .bind(brand_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:InsertBrand", err)]
    async fn insert_brand(&mut self, draft: &BrandDraft) -> Result<Brand> {
        let (id,): (i64,) = sqlx::query_as("INSERT INTO brands (brand_name, country_of_origin) VALUES ($1, $2) RETURNING brand_id")
            .bind(&draft.brand_name)
            .bind(&draft.country_of_origin)
            .fetch_one(self.conn()?)
            .await
            .map_err(constraint_error("Brand"))?;
        self.find_brand(id).await?.ok_or(ShopError::NotFound("Brand"))
    }

    async fn update_brand(&mut self, brand_id: i64, draft: &BrandDraft) -> Result<Option<Brand>> {
        let updated = sqlx::query("UPDATE brands SET brand_name = $2, country_of_origin = $3, updated_at = NOW() WHERE brand_id = $1")
            .bind(brand_id)
            .bind(&draft.brand_name)
            .bind(&draft.country_of_origin)
            .execute(self.conn()?)
            .await
            .map_err(constraint_error("Brand"))?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_brand(brand_id).await
    }

    async fn delete_brand(&mut self, brand_id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM brands WHERE brand_id = $1").bind(brand_id).execute(self.conn()?).await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl PhoneRepository for PgUnitOfWork {
    #[instrument(skip_all, name = "SQL:ListPhones", err)]
    async fn list_phones(&mut self, page: Page) -> Result<(Vec<MobilePhone>, i64)> {
        let rows = sqlx::query_as::<_, MobilePhone>(&format!("{PHONE_SELECT} ORDER BY p.created_at DESC, p.phone_id DESC LIMIT $1 OFFSET $2"))
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.conn()?)
            .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM mobile_phones").fetch_one(self.conn()?).await?;
        Ok((rows, total.0))
    }

    async fn find_phone(&mut self, phone_id: i64) -> Result<Option<MobilePhone>> {
        Ok(sqlx::query_as::<_, MobilePhone>(&format!("{PHONE_SELECT} WHERE p.phone_id = $1"))
            .bind(phone_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:InsertPhone", err)]
    async fn insert_phone(&mut self, d: &PhoneDraft) -> Result<MobilePhone> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO mobile_phones (brand_id, model_name, price, stock_quantity, ram, storage, battery_capacity, processor, os, description, image_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING phone_id
            "#,
        )
        .bind(d.brand_id)
        .bind(&d.model_name)
        .bind(d.price)
        .bind(d.stock_quantity)
        .bind(&d.ram)
        .bind(&d.storage)
        .bind(&d.battery_capacity)
        .bind(&d.processor)
        .bind(d.os)
        .bind(&d.description)
        .bind(&d.image_url)
        .fetch_one(self.conn()?)
        .await
        .map_err(constraint_error("Phone"))?;
        self.find_phone(id).await?.ok_or(ShopError::NotFound("Phone"))
    }

    async fn update_phone(&mut self, phone_id: i64, d: &PhoneDraft) -> Result<Option<MobilePhone>> {
        let updated = sqlx::query(
            r#"
            UPDATE mobile_phones
            SET brand_id = $2, model_name = $3, price = $4, stock_quantity = $5, ram = $6, storage = $7,
                battery_capacity = $8, processor = $9, os = $10, description = $11, image_url = $12, updated_at = NOW()
            WHERE phone_id = $1
            "#,
        )
        .bind(phone_id)
        .bind(d.brand_id)
        .bind(&d.model_name)
        .bind(d.price)
        .bind(d.stock_quantity)
        .bind(&d.ram)
        .bind(&d.storage)
        .bind(&d.battery_capacity)
        .bind(&d.processor)
        .bind(d.os)
        .bind(&d.description)
        .bind(&d.image_url)
        .execute(self.conn()?)
        .await
        .map_err(constraint_error("Phone"))?;
        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        self.find_phone(phone_id).await
    }

    async fn delete_phone(&mut self, phone_id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM mobile_phones WHERE phone_id = $1").bind(phone_id).execute(self.conn()?).await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl AccessoryRepository for PgUnitOfWork {
    #[instrument(skip_all, name = "SQL:ListAccessories", err)]
    async fn list_accessories(&mut self, page: Page) -> Result<(Vec<Accessory>, i64)> {
        let rows = sqlx::query_as::<_, Accessory>("SELECT * FROM accessories ORDER BY created_at DESC, accessory_id DESC LIMIT $1 OFFSET $2")
            .bind(page.limit())
            .bind(page.offset())
            .fetch_all(self.conn()?)
            .await?;
        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM accessories").fetch_one(self.conn()?).await?;
        Ok((rows, total.0))
    }

    async fn find_accessory(&mut self, accessory_id: i64) -> Result<Option<Accessory>> {
        Ok(sqlx::query_as::<_, Accessory>("SELECT * FROM accessories WHERE accessory_id = $1")
            .bind(accessory_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:InsertAccessory", err)]
    async fn insert_accessory(&mut self, d: &AccessoryDraft) -> Result<Accessory> {
        sqlx::query_as::<_, Accessory>(
            r#"
            INSERT INTO accessories (name, category, price, stock_quantity, description, image_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&d.name)
        .bind(d.category)
        .bind(d.price)
        .bind(d.stock_quantity)
        .bind(&d.description)
        .bind(&d.image_url)
        .fetch_one(self.conn()?)
        .await
        .map_err(constraint_error("Accessory"))
    }

    async fn update_accessory(&mut self, accessory_id: i64, d: &AccessoryDraft) -> Result<Option<Accessory>> {
        sqlx::query_as::<_, Accessory>(
            r#"
            UPDATE accessories
            SET name = $2, category = $3, price = $4, stock_quantity = $5, description = $6, image_url = $7, updated_at = NOW()
            WHERE accessory_id = $1
            RETURNING *
            "#,
        )
        .bind(accessory_id)
        .bind(&d.name)
        .bind(d.category)
        .bind(d.price)
        .bind(d.stock_quantity)
        .bind(&d.description)
        .bind(&d.image_url)
        .fetch_optional(self.conn()?)
        .await
        .map_err(constraint_error("Accessory"))
    }

    async fn delete_accessory(&mut self, accessory_id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM accessories WHERE accessory_id = $1").bind(accessory_id).execute(self.conn()?).await?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl ProductLookup for PgUnitOfWork {
    async fn find_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>> {
        self.product_row(product, false).await
    }

    #[instrument(skip(self), name = "SQL:LockProduct", err)]
    async fn lock_product(&mut self, product: ProductRef) -> Result<Option<ProductSummary>> {
        self.product_row(product, true).await
    }

    async fn set_stock(&mut self, product: ProductRef, stock_quantity: i32) -> Result<bool> {
        let sql = match product {
            ProductRef::Phone(_) => "UPDATE mobile_phones SET stock_quantity = $2, updated_at = NOW() WHERE phone_id = $1",
            ProductRef::Accessory(_) => "UPDATE accessories SET stock_quantity = $2, updated_at = NOW() WHERE accessory_id = $1",
        };
        let updated = sqlx::query(sql)
            .bind(product.id())
            .bind(stock_quantity)
            .execute(self.conn()?)
            .await
            .map_err(constraint_error("Stock level"))?;
        Ok(updated.rows_affected() > 0)
    }
}

#[async_trait]
impl CustomerRepository for PgUnitOfWork {
    async fn list_customers(&mut self) -> Result<Vec<Customer>> {
        Ok(sqlx::query_as::<_, Customer>("SELECT * FROM customers ORDER BY date_joined DESC, customer_id DESC")
            .fetch_all(self.conn()?)
            .await?)
    }

    async fn find_customer(&mut self, customer_id: i64) -> Result<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:FindCustomerByEmail", err)]
    async fn find_customer_by_email(&mut self, email: &str) -> Result<Option<Customer>> {
        Ok(sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE email = $1")
            .bind(email)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:InsertCustomer", err)]
    async fn insert_customer(&mut self, c: &NewCustomer) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, email, phone, address, password_hash, is_staff)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&c.name)
        .bind(&c.email)
        .bind(&c.phone)
        .bind(&c.address)
        .bind(&c.password_hash)
        .bind(c.is_staff)
        .fetch_one(self.conn()?)
        .await
        .map_err(constraint_error("Customer with this email"))
    }

    async fn update_profile(&mut self, customer_id: i64, u: &ProfileUpdate) -> Result<Customer> {
        sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = COALESCE($2, name), phone = COALESCE($3, phone), address = COALESCE($4, address), updated_at = NOW()
            WHERE customer_id = $1
            RETURNING *
            "#,
        )
        .bind(customer_id)
        .bind(&u.name)
        .bind(&u.phone)
        .bind(&u.address)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or(ShopError::NotFound("Customer"))
    }

    async fn update_password_hash(&mut self, customer_id: i64, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE customers SET password_hash = $2, updated_at = NOW() WHERE customer_id = $1")
            .bind(customer_id)
            .bind(password_hash)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }

    async fn set_staff(&mut self, customer_id: i64, is_staff: bool) -> Result<()> {
        sqlx::query("UPDATE customers SET is_staff = $2, updated_at = NOW() WHERE customer_id = $1")
            .bind(customer_id)
            .bind(is_staff)
            .execute(self.conn()?)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgUnitOfWork {
    async fn find_cart(&mut self, customer_id: i64) -> Result<Option<Cart>> {
        Ok(sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE customer_id = $1")
            .bind(customer_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:lock_cart", err)]
    async fn lock_cart(&mut self, customer_id: i64) -> Result<Option<Cart>> {
        Ok(sqlx::query_as::<_, Cart>("SELECT * FROM carts WHERE customer_id = $1 FOR UPDATE")
            .bind(customer_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    async fn get_or_create_cart(&mut self, customer_id: i64) -> Result<Cart> {
        sqlx::query("INSERT INTO carts (customer_id) VALUES ($1) ON CONFLICT (customer_id) DO NOTHING")
            .bind(customer_id)
            .execute(self.conn()?)
            .await?;
        self.find_cart(customer_id).await?.ok_or(ShopError::NotFound("Cart"))
    }

    async fn list_cart_lines(&mut self, cart_id: i64) -> Result<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLineRow>("SELECT * FROM cart_items WHERE cart_id = $1 ORDER BY cart_item_id")
            .bind(cart_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows.into_iter().map(CartLine::from).collect())
    }

    async fn find_cart_line(&mut self, cart_id: i64, cart_item_id: i64) -> Result<Option<CartLine>> {
        let row = sqlx::query_as::<_, CartLineRow>("SELECT * FROM cart_items WHERE cart_id = $1 AND cart_item_id = $2")
            .bind(cart_id)
            .bind(cart_item_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.map(CartLine::from))
    }

    async fn find_cart_line_for(&mut self, cart_id: i64, product: ProductRef) -> Result<Option<CartLine>> {
        let row = sqlx::query_as::<_, CartLineRow>("SELECT * FROM cart_items WHERE cart_id = $1 AND product_type = $2 AND product_id = $3")
            .bind(cart_id)
            .bind(product.product_type())
            .bind(product.id())
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.map(CartLine::from))
    }

    async fn insert_cart_line(&mut self, cart_id: i64, product: ProductRef, quantity: i32) -> Result<CartLine> {
        let row = sqlx::query_as::<_, CartLineRow>(
            "INSERT INTO cart_items (cart_id, product_type, product_id, quantity) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(cart_id)
        .bind(product.product_type())
        .bind(product.id())
        .bind(quantity)
        .fetch_one(self.conn()?)
        .await
        .map_err(constraint_error("Cart item"))?;
        Ok(row.into())
    }

    async fn set_cart_line_quantity(&mut self, cart_item_id: i64, quantity: i32) -> Result<CartLine> {
        let row = sqlx::query_as::<_, CartLineRow>("UPDATE cart_items SET quantity = $2, updated_at = NOW() WHERE cart_item_id = $1 RETURNING *")
            .bind(cart_item_id)
            .bind(quantity)
            .fetch_optional(self.conn()?)
            .await
            .map_err(constraint_error("Cart item"))?;
        row.map(CartLine::from).ok_or(ShopError::NotFound("Cart item"))
    }

    async fn delete_cart_line(&mut self, cart_item_id: i64) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_item_id = $1").bind(cart_item_id).execute(self.conn()?).await?;
        Ok(deleted.rows_affected() > 0)
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64> {
        let deleted = sqlx::query("DELETE FROM cart_items WHERE cart_id = $1").bind(cart_id).execute(self.conn()?).await?;
        Ok(deleted.rows_affected())
    }
}

#[async_trait]
impl OrderRepository for PgUnitOfWork {
    async fn list_orders(&mut self, customer_id: Option<i64>) -> Result<Vec<Order>> {
        Ok(sqlx::query_as::<_, Order>(
            "SELECT * FROM orders WHERE ($1::BIGINT IS NULL OR customer_id = $1) ORDER BY order_date DESC, order_id DESC",
        )
        .bind(customer_id)
        .fetch_all(self.conn()?)
        .await?)
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1")
            .bind(order_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip(self), name = "SQL:LockOrder", err)]
    async fn lock_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        Ok(sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE order_id = $1 FOR UPDATE")
            .bind(order_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    #[instrument(skip_all, name = "SQL:InsertOrder", err)]
    async fn insert_order(&mut self, o: &NewOrder) -> Result<Order> {
        Ok(sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (customer_id, status, total_amount, shipping_address, notes)
            VALUES ($1, 'PENDING', $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(o.customer_id)
        .bind(o.total_amount)
        .bind(&o.shipping_address)
        .bind(&o.notes)
        .fetch_one(self.conn()?)
        .await?)
    }

    async fn insert_order_line(&mut self, order_id: i64, l: &NewOrderLine) -> Result<OrderLine> {
        let row = sqlx::query_as::<_, OrderLineRow>(
            r#"
            INSERT INTO order_items (order_id, product_type, product_id, product_name, quantity, price_at_purchase)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(order_id)
        .bind(l.product.product_type())
        .bind(l.product.id())
        .bind(&l.product_name)
        .bind(l.quantity)
        .bind(l.price_at_purchase)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row.into())
    }

    async fn list_order_lines(&mut self, order_id: i64) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>("SELECT * FROM order_items WHERE order_id = $1 ORDER BY order_item_id")
            .bind(order_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus) -> Result<Order> {
        sqlx::query_as::<_, Order>("UPDATE orders SET status = $2, updated_at = NOW() WHERE order_id = $1 RETURNING *")
            .bind(order_id)
            .bind(status)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(ShopError::NotFound("Order"))
    }
}

#[async_trait]
impl PaymentRepository for PgUnitOfWork {
    async fn list_payments(&mut self, customer_id: Option<i64>) -> Result<Vec<Payment>> {
        Ok(sqlx::query_as::<_, Payment>(
            r#"
            SELECT pay.* FROM payments pay
            JOIN orders o ON o.order_id = pay.order_id
            WHERE ($1::BIGINT IS NULL OR o.customer_id = $1)
            ORDER BY pay.payment_date DESC, pay.payment_id DESC
            "#,
        )
        .bind(customer_id)
        .fetch_all(self.conn()?)
        .await?)
    }

    async fn find_payment(&mut self, payment_id: i64) -> Result<Option<Payment>> {
        Ok(sqlx::query_as::<_, Payment>("SELECT * FROM payments WHERE payment_id = $1")
            .bind(payment_id)
            .fetch_optional(self.conn()?)
            .await?)
    }

    async fn has_completed_payment(&mut self, order_id: i64) -> Result<bool> {
        let (exists,): (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM payments WHERE order_id = $1 AND status = 'COMPLETED')")
            .bind(order_id)
            .fetch_one(self.conn()?)
            .await?;
        Ok(exists)
    }

    #[instrument(skip_all, name = "SQL:InsertPayment", err)]
    async fn insert_payment(&mut self, p: &NewPayment) -> Result<Payment> {
        Ok(sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO payments (order_id, amount, payment_method, status, transaction_id, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(p.order_id)
        .bind(p.amount)
        .bind(p.payment_method)
        .bind(p.status)
        .bind(&p.transaction_id)
        .bind(&p.notes)
        .fetch_one(self.conn()?)
        .await?)
    }

    async fn set_payment_status(&mut self, payment_id: i64, status: PaymentStatus) -> Result<Payment> {
        sqlx::query_as::<_, Payment>("UPDATE payments SET status = $2, updated_at = NOW() WHERE payment_id = $1 RETURNING *")
            .bind(payment_id)
            .bind(status)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(ShopError::NotFound("Payment"))
    }
}
