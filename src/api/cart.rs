use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{delete, get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use crate::api::extract::{JsonBody, QueryParams};
use crate::api::views::CartView;
use crate::api::AppState;
use crate::services::cart::{AddItem, UpdateItem};
use crate::services::Actor;
use crate::ShopError;

#[derive(Deserialize)]
pub struct RemoveParams {
    pub cart_item_id: Option<i64>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart/my_cart/", get(my_cart))
        .route("/cart/add_item/", post(add_item))
        .route("/cart/update_item/", patch(update_item))
        .route("/cart/remove_item/", delete(remove_item))
        .route("/cart/clear_cart/", delete(clear_cart))
}

async fn my_cart(State(s): State<AppState>, actor: Actor) -> Result<Json<CartView>, ShopError> {
    Ok(Json(s.services.cart.my_cart(&actor).await?.into()))
}

async fn add_item(State(s): State<AppState>, actor: Actor, JsonBody(item): JsonBody<AddItem>) -> Result<(StatusCode, Json<CartView>), ShopError> {
    let cart = s.services.cart.add_item(&actor, item).await?;
    Ok((StatusCode::CREATED, Json(cart.into())))
}

async fn update_item(State(s): State<AppState>, actor: Actor, JsonBody(item): JsonBody<UpdateItem>) -> Result<Json<CartView>, ShopError> {
    Ok(Json(s.services.cart.update_item(&actor, item).await?.into()))
}

async fn remove_item(State(s): State<AppState>, actor: Actor, QueryParams(p): QueryParams<RemoveParams>) -> Result<Json<CartView>, ShopError> {
    let cart_item_id = p
        .cart_item_id
        .ok_or_else(|| ShopError::field("cart_item_id", "cart_item_id is required"))?;
    Ok(Json(s.services.cart.remove_item(&actor, cart_item_id).await?.into()))
}

async fn clear_cart(State(s): State<AppState>, actor: Actor) -> Result<Json<CartView>, ShopError> {
    Ok(Json(s.services.cart.clear_cart(&actor).await?.into()))
}
