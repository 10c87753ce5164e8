use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use crate::api::extract::{Id, JsonBody};
use crate::api::AppState;
use crate::auth::TokenPair;
use crate::domain::aggregates::{Customer, PasswordChange, ProfileUpdate, Registration};
use crate::services::customers::{AccessOnly, Credentials};
use crate::services::Actor;
use crate::ShopError;

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Serialize)]
pub struct Message {
    pub message: &'static str,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register/", post(register))
        .route("/auth/login/", post(login))
        .route("/auth/token/refresh/", post(refresh))
        .route("/customers/profiles/", get(list))
        .route("/customers/profiles/me/", get(me))
        .route("/customers/profiles/update_profile/", put(update_profile).patch(update_profile))
        .route("/customers/profiles/change_password/", post(change_password))
        .route("/customers/profiles/:id/", get(retrieve))
}

async fn register(State(s): State<AppState>, JsonBody(r): JsonBody<Registration>) -> Result<(StatusCode, Json<Customer>), ShopError> {
    Ok((StatusCode::CREATED, Json(s.services.customers.register(r).await?)))
}

async fn login(State(s): State<AppState>, JsonBody(c): JsonBody<Credentials>) -> Result<Json<TokenPair>, ShopError> {
    Ok(Json(s.services.customers.login(c).await?))
}

async fn refresh(State(s): State<AppState>, JsonBody(r): JsonBody<RefreshRequest>) -> Result<Json<AccessOnly>, ShopError> {
    Ok(Json(s.services.customers.refresh(&r.refresh).await?))
}

async fn list(State(s): State<AppState>, actor: Actor) -> Result<Json<Vec<Customer>>, ShopError> {
    Ok(Json(s.services.customers.list(&actor).await?))
}

async fn me(State(s): State<AppState>, actor: Actor) -> Result<Json<Customer>, ShopError> {
    Ok(Json(s.services.customers.me(&actor).await?))
}

async fn retrieve(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<Json<Customer>, ShopError> {
    Ok(Json(s.services.customers.get(&actor, id).await?))
}

async fn update_profile(State(s): State<AppState>, actor: Actor, JsonBody(u): JsonBody<ProfileUpdate>) -> Result<Json<Customer>, ShopError> {
    Ok(Json(s.services.customers.update_profile(&actor, u).await?))
}

async fn change_password(State(s): State<AppState>, actor: Actor, JsonBody(c): JsonBody<PasswordChange>) -> Result<Json<Message>, ShopError> {
    s.services.customers.change_password(&actor, c).await?;
    Ok(Json(Message { message: "Password updated successfully" }))
}
