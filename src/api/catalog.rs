use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use crate::api::extract::{Id, JsonBody, QueryParams};
use crate::api::views::Stocked;
use crate::api::AppState;
use crate::domain::aggregates::{Accessory, AccessoryDraft, Brand, BrandDraft, MobilePhone, PhoneDraft};
use crate::domain::value_objects::Page;
use crate::services::catalog::Paginated;
use crate::services::Actor;
use crate::ShopError;

type Reply<T> = Result<Json<T>, ShopError>;
type Created<T> = Result<(StatusCode, Json<T>), ShopError>;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl From<ListParams> for Page {
    fn from(p: ListParams) -> Self {
        Page::new(p.page, p.per_page)
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/brands/", get(list_brands).post(create_brand))
        .route("/brands/:id/", get(get_brand).put(update_brand).delete(delete_brand))
        .route("/phones/", get(list_phones).post(create_phone))
        .route("/phones/:id/", get(get_phone).put(update_phone).delete(delete_phone))
        .route("/accessories/", get(list_accessories).post(create_accessory))
        .route("/accessories/:id/", get(get_accessory).put(update_accessory).delete(delete_accessory))
}

async fn list_brands(State(s): State<AppState>, QueryParams(p): QueryParams<ListParams>) -> Reply<Paginated<Brand>> {
    Ok(Json(s.services.catalog.list_brands(p.into()).await?))
}

async fn get_brand(State(s): State<AppState>, Id(id): Id) -> Reply<Brand> {
    Ok(Json(s.services.catalog.get_brand(id).await?))
}

async fn create_brand(State(s): State<AppState>, actor: Actor, JsonBody(draft): JsonBody<BrandDraft>) -> Created<Brand> {
    Ok((StatusCode::CREATED, Json(s.services.catalog.create_brand(&actor, draft).await?)))
}

async fn update_brand(State(s): State<AppState>, actor: Actor, Id(id): Id, JsonBody(draft): JsonBody<BrandDraft>) -> Reply<Brand> {
    Ok(Json(s.services.catalog.update_brand(&actor, id, draft).await?))
}

async fn delete_brand(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<StatusCode, ShopError> {
    s.services.catalog.delete_brand(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_phones(State(s): State<AppState>, QueryParams(p): QueryParams<ListParams>) -> Reply<Paginated<Stocked<MobilePhone>>> {
    Ok(Json(s.services.catalog.list_phones(p.into()).await?.map(Stocked::from)))
}

async fn get_phone(State(s): State<AppState>, Id(id): Id) -> Reply<Stocked<MobilePhone>> {
    Ok(Json(s.services.catalog.get_phone(id).await?.into()))
}

async fn create_phone(State(s): State<AppState>, actor: Actor, JsonBody(draft): JsonBody<PhoneDraft>) -> Created<Stocked<MobilePhone>> {
    let phone = s.services.catalog.create_phone(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(phone.into())))
}

async fn update_phone(State(s): State<AppState>, actor: Actor, Id(id): Id, JsonBody(draft): JsonBody<PhoneDraft>) -> Reply<Stocked<MobilePhone>> {
    Ok(Json(s.services.catalog.update_phone(&actor, id, draft).await?.into()))
}

async fn delete_phone(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<StatusCode, ShopError> {
    s.services.catalog.delete_phone(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_accessories(State(s): State<AppState>, QueryParams(p): QueryParams<ListParams>) -> Reply<Paginated<Stocked<Accessory>>> {
    Ok(Json(s.services.catalog.list_accessories(p.into()).await?.map(Stocked::from)))
}

async fn get_accessory(State(s): State<AppState>, Id(id): Id) -> Reply<Stocked<Accessory>> {
    Ok(Json(s.services.catalog.get_accessory(id).await?.into()))
}

async fn create_accessory(State(s): State<AppState>, actor: Actor, JsonBody(draft): JsonBody<AccessoryDraft>) -> Created<Stocked<Accessory>> {
    let accessory = s.services.catalog.create_accessory(&actor, draft).await?;
    Ok((StatusCode::CREATED, Json(accessory.into())))
}

async fn update_accessory(State(s): State<AppState>, actor: Actor, Id(id): Id, JsonBody(draft): JsonBody<AccessoryDraft>) -> Reply<Stocked<Accessory>> {
    Ok(Json(s.services.catalog.update_accessory(&actor, id, draft).await?.into()))
}

async fn delete_accessory(State(s): State<AppState>, actor: Actor, Id(id): Id) -> Result<StatusCode, ShopError> {
    s.services.catalog.delete_accessory(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
