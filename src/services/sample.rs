//! Demo catalog loaded by `SEED_SAMPLE_DATA`.

use rust_decimal::Decimal;
use crate::domain::aggregates::{AccessoryCategory, AccessoryDraft, BrandDraft, PhoneDraft, PhoneOs};

pub fn brands() -> Vec<BrandDraft> {
    [
        ("Apple", "USA"),
        ("Samsung", "South Korea"),
        ("Google", "USA"),
        ("OnePlus", "China"),
        ("Xiaomi", "China"),
    ]
    .into_iter()
    .map(|(brand_name, country)| BrandDraft { brand_name: brand_name.into(), country_of_origin: country.into() })
    .collect()
}

fn phone(
    model_name: &str,
    price: i64,
    stock_quantity: i32,
    (ram, storage, battery): (&str, &str, &str),
    processor: &str,
    os: PhoneOs,
    description: &str,
) -> PhoneDraft {
    PhoneDraft {
        brand_id: 0,
        model_name: model_name.into(),
        price: Decimal::new(price, 0),
        stock_quantity,
        ram: ram.into(),
        storage: storage.into(),
        battery_capacity: battery.into(),
        processor: processor.into(),
        os,
        description: Some(description.into()),
        image_url: None,
    }
}

/// Phones keyed by brand name; `brand_id` is filled in once the brand exists.
pub fn phones() -> Vec<(&'static str, PhoneDraft)> {
    vec![
        ("Apple", phone("iPhone 15 Pro", 129900, 50, ("8GB", "256GB", "3274mAh"), "A17 Pro", PhoneOs::Ios,
            "Latest iPhone with titanium design and advanced camera system")),
        ("Samsung", phone("Galaxy S24 Ultra", 124999, 45, ("12GB", "512GB", "5000mAh"), "Snapdragon 8 Gen 3", PhoneOs::Android,
            "Premium flagship with S Pen and AI features")),
        ("Google", phone("Pixel 8 Pro", 89999, 30, ("12GB", "256GB", "5050mAh"), "Google Tensor G3", PhoneOs::Android,
            "Best Android camera with pure Google experience")),
        ("OnePlus", phone("OnePlus 12", 64999, 60, ("16GB", "256GB", "5400mAh"), "Snapdragon 8 Gen 3", PhoneOs::Android,
            "Flagship killer with super-fast charging")),
        ("Xiaomi", phone("Xiaomi 14 Pro", 69999, 40, ("12GB", "512GB", "4880mAh"), "Snapdragon 8 Gen 3", PhoneOs::Android,
            "Premium features at competitive price")),
    ]
}

pub fn accessories() -> Vec<AccessoryDraft> {
    [
        ("Premium Silicone Case", AccessoryCategory::Case, 1499, 100, "High-quality silicone case with perfect fit"),
        ("Fast Charger 65W", AccessoryCategory::Charger, 2499, 80, "Super fast charging adapter with cable"),
        ("Wireless Earbuds Pro", AccessoryCategory::Earphones, 8999, 50, "Premium wireless earbuds with ANC"),
        ("Tempered Glass Screen Protector", AccessoryCategory::ScreenProtector, 599, 200, "9H hardness tempered glass protection"),
        ("Power Bank 20000mAh", AccessoryCategory::PowerBank, 3999, 60, "High-capacity power bank with dual USB ports"),
        ("USB-C to USB-C Cable", AccessoryCategory::Cable, 799, 150, "Durable braided cable supporting fast charging"),
        ("Car Phone Mount", AccessoryCategory::Other, 1299, 70, "Secure magnetic car mount holder"),
    ]
    .into_iter()
    .map(|(name, category, price, stock_quantity, description)| AccessoryDraft {
        name: name.into(),
        category,
        price: Decimal::new(price, 0),
        stock_quantity,
        description: Some(description.into()),
        image_url: None,
    })
    .collect()
}
