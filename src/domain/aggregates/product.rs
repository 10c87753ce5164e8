//! Catalog records: brands, phones and accessories

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::{validate_price, ProductRef};

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Brand {
    pub brand_id: i64,
    pub brand_name: String,
    pub country_of_origin: String,
    pub phone_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct BrandDraft {
    #[validate(length(min = 1, max = 100))]
    pub brand_name: String,
    #[validate(length(min = 1, max = 100))]
    pub country_of_origin: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "phone_os")]
pub enum PhoneOs {
    Android,
    #[serde(rename = "iOS")]
    #[sqlx(rename = "iOS")]
    Ios,
    HarmonyOS,
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct MobilePhone {
    pub phone_id: i64,
    pub brand_id: i64,
    pub brand_name: String,
    pub model_name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub ram: String,
    pub storage: String,
    pub battery_capacity: String,
    pub processor: String,
    pub os: PhoneOs,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MobilePhone {
    pub fn display_name(&self) -> String { format!("{} {}", self.brand_name, self.model_name) }
    pub fn is_in_stock(&self) -> bool { self.stock_quantity > 0 }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct PhoneDraft {
    pub brand_id: i64,
    #[validate(length(min = 1, max = 200))]
    pub model_name: String,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, max = 999999, message = "Stock quantity must be between 0 and 999,999"))]
    #[serde(default)]
    pub stock_quantity: i32,
    #[validate(length(min = 1, max = 50))]
    pub ram: String,
    #[validate(length(min = 1, max = 50))]
    pub storage: String,
    #[validate(length(min = 1, max = 50))]
    pub battery_capacity: String,
    #[validate(length(min = 1, max = 200))]
    pub processor: String,
    pub os: PhoneOs,
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "accessory_category")]
pub enum AccessoryCategory {
    Case,
    Charger,
    Earphones,
    #[serde(rename = "Screen Protector")]
    #[sqlx(rename = "Screen Protector")]
    ScreenProtector,
    #[serde(rename = "Power Bank")]
    #[sqlx(rename = "Power Bank")]
    PowerBank,
    Cable,
    #[default]
    Other,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Accessory {
    pub accessory_id: i64,
    pub name: String,
    pub category: AccessoryCategory,
    pub price: Decimal,
    pub stock_quantity: i32,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Accessory {
    pub fn is_in_stock(&self) -> bool { self.stock_quantity > 0 }
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AccessoryDraft {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub category: AccessoryCategory,
    #[validate(custom = "validate_price")]
    pub price: Decimal,
    #[validate(range(min = 0, max = 999999, message = "Stock quantity must be between 0 and 999,999"))]
    #[serde(default)]
    pub stock_quantity: i32,
    pub description: Option<String>,
    #[validate(url)]
    pub image_url: Option<String>,
}

/// What the cart and the order engine need to know about any product.
#[derive(Clone, Debug, PartialEq)]
pub struct ProductSummary {
    pub product: ProductRef,
    pub name: String,
    pub price: Decimal,
    pub stock_quantity: i32,
}

impl From<&MobilePhone> for ProductSummary {
    fn from(p: &MobilePhone) -> Self {
        Self { product: ProductRef::Phone(p.phone_id), name: p.display_name(), price: p.price, stock_quantity: p.stock_quantity }
    }
}

impl From<&Accessory> for ProductSummary {
    fn from(a: &Accessory) -> Self {
        Self { product: ProductRef::Accessory(a.accessory_id), name: a.name.clone(), price: a.price, stock_quantity: a.stock_quantity }
    }
}
