//! Shopping cart.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};
use validator::Validate;
use crate::domain::aggregates::{Cart, PricedCart, PricedCartLine};
use crate::domain::value_objects::{ProductRef, ProductType};
use crate::services::Actor;
use crate::storage::{Storage, UnitOfWork};
use crate::{Result, ShopError};

fn one() -> i32 {
    1
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AddItem {
    pub product_type: ProductType,
    pub product_id: i64,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct UpdateItem {
    pub cart_item_id: i64,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Clone)]
pub struct CartService {
    storage: Arc<dyn Storage>,
}

async fn priced(uow: &mut dyn UnitOfWork, cart: Cart) -> Result<PricedCart> {
    let mut lines = Vec::new();
    for line in uow.list_cart_lines(cart.cart_id).await? {
        let product = uow.find_product(line.product).await?;
        lines.push(PricedCartLine { line, product });
    }
    Ok(PricedCart { cart, lines })
}

impl CartService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn my_cart(&self, actor: &Actor) -> Result<PricedCart> {
        let mut uow = self.storage.begin().await?;
        let cart = uow.get_or_create_cart(actor.customer_id).await?;
        let view = priced(uow.as_mut(), cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Merges into an existing line for the same product; stock must cover the merged quantity.
    #[instrument(skip_all, fields(customer_id = actor.customer_id, product_id = item.product_id), err)]
    pub async fn add_item(&self, actor: &Actor, item: AddItem) -> Result<PricedCart> {
        item.validate()?;
        let product = ProductRef::new(item.product_type, item.product_id);
        let mut uow = self.storage.begin().await?;
        let summary = uow
            .find_product(product)
            .await?
            .ok_or_else(|| ShopError::field("product_id", "Product does not exist"))?;
        let cart = uow.get_or_create_cart(actor.customer_id).await?;
        let existing = uow.find_cart_line_for(cart.cart_id, product).await?;
        let wanted = existing.as_ref().map_or(0, |l| l.quantity).saturating_add(item.quantity);
        if wanted > summary.stock_quantity {
            return Err(ShopError::field(
                "quantity",
                format!("Only {} items available in stock", summary.stock_quantity),
            ));
        }
        match existing {
            Some(line) => {
                uow.set_cart_line_quantity(line.cart_item_id, wanted).await?;
            }
            None => {
                uow.insert_cart_line(cart.cart_id, product, item.quantity).await?;
            }
        }
        let view = priced(uow.as_mut(), cart).await?;
        uow.commit().await?;
        debug!(%product, quantity = wanted, "cart line saved");
        Ok(view)
    }

    pub async fn update_item(&self, actor: &Actor, item: UpdateItem) -> Result<PricedCart> {
        item.validate()?;
        let mut uow = self.storage.begin().await?;
        let cart = uow.get_or_create_cart(actor.customer_id).await?;
        let line = uow
            .find_cart_line(cart.cart_id, item.cart_item_id)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))?;
        uow.set_cart_line_quantity(line.cart_item_id, item.quantity).await?;
        let view = priced(uow.as_mut(), cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    pub async fn remove_item(&self, actor: &Actor, cart_item_id: i64) -> Result<PricedCart> {
        let mut uow = self.storage.begin().await?;
        let cart = uow.get_or_create_cart(actor.customer_id).await?;
        let line = uow
            .find_cart_line(cart.cart_id, cart_item_id)
            .await?
            .ok_or(ShopError::NotFound("Cart item"))?;
        uow.delete_cart_line(line.cart_item_id).await?;
        let view = priced(uow.as_mut(), cart).await?;
        uow.commit().await?;
        Ok(view)
    }

    pub async fn clear_cart(&self, actor: &Actor) -> Result<PricedCart> {
        let mut uow = self.storage.begin().await?;
        let cart = uow.get_or_create_cart(actor.customer_id).await?;
        uow.clear_cart(cart.cart_id).await?;
        let view = priced(uow.as_mut(), cart).await?;
        uow.commit().await?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{customer, seed_catalog, services, STAFF};
    use rust_decimal::Decimal;

    fn add(product_type: ProductType, product_id: i64, quantity: i32) -> AddItem {
        AddItem { product_type, product_id, quantity }
    }

    #[tokio::test]
    async fn test_adding_same_product_merges_lines() {
        let services = services();
        let (phone_id, _) = seed_catalog(&services, 10, 5).await;
        let buyer = customer(&services, "buyer@example.com").await;

        services.cart.add_item(&buyer, add(ProductType::Phone, phone_id, 1)).await.unwrap();
        let cart = services.cart.add_item(&buyer, add(ProductType::Phone, phone_id, 2)).await.unwrap();
        assert_eq!(cart.total_items(), 1);
        assert_eq!(cart.lines[0].line.quantity, 3);
        assert_eq!(cart.total_amount(), Decimal::new(299997, 2));
    }

    #[tokio::test]
    async fn test_add_checks_merged_quantity_against_stock() {
        let services = services();
        let (_, accessory_id) = seed_catalog(&services, 10, 5).await;
        let buyer = customer(&services, "buyer@example.com").await;

        services.cart.add_item(&buyer, add(ProductType::Accessory, accessory_id, 4)).await.unwrap();
        let err = services.cart.add_item(&buyer, add(ProductType::Accessory, accessory_id, 2)).await.unwrap_err();
        assert!(matches!(err, ShopError::Validation { .. }));
        let cart = services.cart.my_cart(&buyer).await.unwrap();
        assert_eq!(cart.lines[0].line.quantity, 4);
    }

    #[tokio::test]
    async fn test_unknown_product_and_bad_quantity() {
        let services = services();
        let buyer = customer(&services, "buyer@example.com").await;
        assert!(matches!(
            services.cart.add_item(&buyer, add(ProductType::Phone, 99, 1)).await,
            Err(ShopError::Validation { .. })
        ));
        assert!(matches!(
            services.cart.add_item(&buyer, add(ProductType::Phone, 99, 0)).await,
            Err(ShopError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_cart_prices_follow_catalog() {
        let services = services();
        let (phone_id, _) = seed_catalog(&services, 10, 5).await;
        let buyer = customer(&services, "buyer@example.com").await;
        services.cart.add_item(&buyer, add(ProductType::Phone, phone_id, 2)).await.unwrap();

        services.catalog.delete_phone(&STAFF, phone_id).await.unwrap();
        let cart = services.cart.my_cart(&buyer).await.unwrap();
        assert_eq!(cart.lines[0].product_name(), "Product not found");
        assert_eq!(cart.total_amount(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_lines_are_private_to_their_cart() {
        let services = services();
        let (phone_id, _) = seed_catalog(&services, 10, 5).await;
        let alice = customer(&services, "alice@example.com").await;
        let bob = customer(&services, "bob@example.com").await;
        let cart = services.cart.add_item(&alice, add(ProductType::Phone, phone_id, 1)).await.unwrap();
        let line_id = cart.lines[0].line.cart_item_id;

        let update = UpdateItem { cart_item_id: line_id, quantity: 2 };
        assert!(matches!(services.cart.update_item(&bob, update.clone()).await, Err(ShopError::NotFound(_))));
        assert!(matches!(services.cart.remove_item(&bob, line_id).await, Err(ShopError::NotFound(_))));

        let cart = services.cart.update_item(&alice, update).await.unwrap();
        assert_eq!(cart.lines[0].line.quantity, 2);
        let cart = services.cart.remove_item(&alice, line_id).await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_clear_cart() {
        let services = services();
        let (phone_id, accessory_id) = seed_catalog(&services, 10, 5).await;
        let buyer = customer(&services, "buyer@example.com").await;
        services.cart.add_item(&buyer, add(ProductType::Phone, phone_id, 1)).await.unwrap();
        services.cart.add_item(&buyer, add(ProductType::Accessory, accessory_id, 1)).await.unwrap();
        assert!(services.cart.clear_cart(&buyer).await.unwrap().is_empty());
    }
}
