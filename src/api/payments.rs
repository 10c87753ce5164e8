use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::Deserialize;
use crate::api::extract::{Id, JsonBody};
use crate::api::AppState;
use crate::domain::aggregates::{Payment, PaymentRequest, PaymentStatus};
use crate::services::Actor;
use crate::ShopError;

#[derive(Deserialize)]
pub struct StatusUpdate {
    pub status: PaymentStatus,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments/", get(list))
        .route("/payments/my_payments/", get(my_payments))
        .route("/payments/create_payment/", post(create_payment))
        .route("/payments/:id/", get(retrieve))
        .route("/payments/:id/update_status/", patch(update_status))
}

async fn list(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<Payment>>, ShopError> {
    Ok(Json(s.services.payments.list(&actor).await?))
}

async fn my_payments(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<Payment>>, ShopError> {
    Ok(Json(s.services.payments.my_payments(&actor).await?))
}

async fn retrieve(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<Json<Payment>, ShopError> {
    Ok(Json(s.services.payments.get(&actor, id).await?))
}

async fn create_payment(
    State(s): State<AppState>,
    actor: Actor,
    JsonBody(request): JsonBody<PaymentRequest>,
) -> Result<(StatusCode, Json<Payment>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.services.payments.create_payment(&actor, request).await?)))
}

async fn update_status(
    State(s): State<AppState>,
    actor: Actor,
    Id(id): Id,
    JsonBody(update): JsonBody<StatusUpdate>,
) -> Result<Json<Payment>, ShopError> {
    Ok(Json(s.services.payments.update_status(&actor, id, update.status).await?))
}
