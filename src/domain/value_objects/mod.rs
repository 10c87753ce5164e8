//! Value Objects for the store

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use validator::ValidationError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Largest order total the `NUMERIC(14, 2)` columns can hold.
pub fn max_order_total() -> Decimal {
    Decimal::new(99_999_999_999_999, 2)
}

/// Discriminant of a [`ProductRef`], stored next to the numeric id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "product_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductType {
    Phone,
    Accessory,
}

impl ProductType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Phone => "PHONE",
            Self::Accessory => "ACCESSORY",
        }
    }
}

/// Reference to a sellable product. Shared by cart lines, order lines and the
/// stock bookkeeping in the order engine.
///
/// The derived ordering is the canonical row-lock order used by checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProductRef {
    Phone(i64),
    Accessory(i64),
}

impl ProductRef {
    pub fn new(product_type: ProductType, id: i64) -> Self {
        match product_type {
            ProductType::Phone => Self::Phone(id),
            ProductType::Accessory => Self::Accessory(id),
        }
    }

    pub fn product_type(&self) -> ProductType {
        match self {
            Self::Phone(_) => ProductType::Phone,
            Self::Accessory(_) => ProductType::Accessory,
        }
    }

    pub fn id(&self) -> i64 {
        match self {
            Self::Phone(id) | Self::Accessory(id) => *id,
        }
    }
}

impl fmt::Display for ProductRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.product_type().as_str(), self.id())
    }
}

/// Price of `quantity` units at `unit_price`.
pub fn line_total(unit_price: Decimal, quantity: i32) -> Decimal {
    unit_price * Decimal::from(quantity)
}

/// 1-based page selector for catalog listings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    page: u32,
    per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn page(&self) -> u32 { self.page }
    pub fn per_page(&self) -> u32 { self.per_page }
    pub fn limit(&self) -> i64 { i64::from(self.per_page) }
    pub fn offset(&self) -> i64 { i64::from(self.page - 1) * i64::from(self.per_page) }
}

impl Default for Page {
    fn default() -> Self { Self::new(None, None) }
}

/// Largest accepted price, 999999.99.
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999, 2)
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_price(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(invalid("price", "Price must be greater than 0"));
    }
    if *value > max_price() {
        return Err(invalid("price", "Price cannot exceed 999,999.99"));
    }
    if value.normalize().scale() > 2 {
        return Err(invalid("price", "Price cannot have more than 2 decimal places"));
    }
    Ok(())
}

/// Accepts `+1234567890`, `(123) 456-7890`, `123-456-7890` and similar.
pub fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    if (9..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid(
            "phone",
            "Invalid phone number format. Use format: +1234567890 or (123) 456-7890",
        ))
    }
}

pub fn validate_strong_password(value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(invalid("password", "Password must be at least 8 characters long."));
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(invalid("password", "Password cannot exceed 128 characters."));
    }
    if !value.chars().any(|c| c.is_uppercase()) {
        return Err(invalid("password", "Password must contain at least one uppercase letter."));
    }
    if !value.chars().any(|c| c.is_lowercase()) {
        return Err(invalid("password", "Password must contain at least one lowercase letter."));
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err(invalid("password", "Password must contain at least one digit."));
    }
    if !value.chars().any(|c| "!@#$%^&*(),.?\":{}|<>".contains(c)) {
        return Err(invalid("password", "Password must contain at least one special character."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_ref_round_trips_type_and_id() {
        let r = ProductRef::new(ProductType::Accessory, 7);
        assert_eq!(r, ProductRef::Accessory(7));
        assert_eq!(r.product_type(), ProductType::Accessory);
        assert_eq!(r.id(), 7);
        assert_eq!(r.to_string(), "ACCESSORY#7");
    }

    #[test]
    fn test_product_ref_lock_order_groups_by_type() {
        let mut refs = vec![ProductRef::Accessory(1), ProductRef::Phone(9), ProductRef::Phone(2)];
        refs.sort();
        assert_eq!(refs, vec![ProductRef::Phone(2), ProductRef::Phone(9), ProductRef::Accessory(1)]);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(Decimal::new(49900, 2), 2), Decimal::new(99800, 2));
    }

    #[test]
    fn test_page_bounds() {
        let p = Page::new(Some(0), Some(500));
        assert_eq!((p.page(), p.per_page()), (1, MAX_PAGE_SIZE));
        assert_eq!(Page::new(Some(3), Some(10)).offset(), 20);
    }

    #[test]
    fn test_price_rules() {
        assert!(validate_price(&Decimal::new(99999, 2)).is_ok());
        assert!(validate_price(&Decimal::ZERO).is_err());
        assert!(validate_price(&Decimal::new(100000000, 2)).is_err());
        assert!(validate_price(&Decimal::new(1005, 3)).is_err());
        assert!(validate_price(&Decimal::new(1000, 3)).is_ok());
    }

    #[test]
    fn test_phone_numbers() {
        assert!(validate_phone_number("+1234567890").is_ok());
        assert!(validate_phone_number("(123) 456-7890").is_ok());
        assert!(validate_phone_number("12345").is_err());
        assert!(validate_phone_number("12345abcde").is_err());
    }

    #[test]
    fn test_password_strength() {
        assert!(validate_strong_password("Str0ng!pass").is_ok());
        assert!(validate_strong_password("short1!").is_err());
        assert!(validate_strong_password("alllowercase1!").is_err());
        assert!(validate_strong_password("NoDigits!!").is_err());
        assert!(validate_strong_password("NoSpecial12").is_err());
    }
}
