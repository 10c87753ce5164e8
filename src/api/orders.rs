use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use crate::api::extract::{Id, JsonBody};
use crate::api::views::OrderView;
use crate::api::AppState;
use crate::domain::aggregates::{CheckoutRequest, OrderDetails, OrderStatus};
use crate::services::Actor;
use crate::ShopError;

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/orders/", get(list))
        .route("/orders/my_orders/", get(my_orders))
        .route("/orders/create_from_cart/", post(create_from_cart))
        .route("/orders/:id/", get(retrieve))
        .route("/orders/:id/update_status/", patch(update_status))
        .route("/orders/:id/cancel/", post(cancel))
}

fn views(orders: Vec<OrderDetails>) -> Json<Vec<OrderView>> {
    Json(orders.into_iter().map(OrderView::from).collect())
}

async fn list(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<OrderView>>, ShopError> {
    Ok(views(s.services.orders.list(&actor).await?))
}

async fn my_orders(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<OrderView>>, ShopError> {
    Ok(views(s.services.orders.my_orders(&actor).await?))
}

async fn retrieve(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<Json<OrderView>, ShopError> {
    Ok(Json(s.services.orders.get(&actor, id).await?.into()))
}

async fn create_from_cart(
    State(s): State<AppState>,
    actor: Actor,
    JsonBody(request): JsonBody<CheckoutRequest>,
) -> Result<(StatusCode, Json<OrderView>), ShopError> {
    let order = s.services.orders.create_from_cart(&actor, request).await?;
    Ok((StatusCode::CREATED, Json(order.into())))
}

async fn update_status(
    State(s): State<AppState>,
    actor: Actor,
    Id(id): Id,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<OrderView>, ShopError> {
    Ok(Json(s.services.orders.update_status(&actor, id, update.status).await?.into()))
}

async fn cancel(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<Json<OrderView>, ShopError> {
    Ok(Json(s.services.orders.cancel(&actor, id).await?.into()))
}
