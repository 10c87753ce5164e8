//! Catalog maintenance and browsing.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;
use crate::domain::aggregates::{Accessory, AccessoryDraft, Brand, BrandDraft, MobilePhone, PhoneDraft};
use crate::domain::value_objects::Page;
use crate::services::{sample, Actor};
use crate::storage::Storage;
use crate::{Result, ShopError};

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
}

impl<T> Paginated<T> {
    fn new((data, total): (Vec<T>, i64), page: Page) -> Self {
        Self { data, total, page: page.page(), per_page: page.per_page() }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated { data: self.data.into_iter().map(f).collect(), total: self.total, page: self.page, per_page: self.per_page }
    }
}

#[derive(Clone)]
pub struct CatalogService {
    storage: Arc<dyn Storage>,
}

impl CatalogService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub async fn list_brands(&self, page: Page) -> Result<Paginated<Brand>> {
        let mut uow = self.storage.begin().await?;
        Ok(Paginated::new(uow.list_brands(page).await?, page))
    }

    pub async fn get_brand(&self, brand_id: i64) -> Result<Brand> {
        let mut uow = self.storage.begin().await?;
        uow.find_brand(brand_id).await?.ok_or(ShopError::NotFound("Brand"))
    }

    #[instrument(skip_all, fields(brand = %draft.brand_name), err)]
    pub async fn create_brand(&self, actor: &Actor, draft: BrandDraft) -> Result<Brand> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let brand = uow.insert_brand(&draft).await?;
        uow.commit().await?;
        info!(brand_id = brand.brand_id, "brand created");
        Ok(brand)
    }

    pub async fn update_brand(&self, actor: &Actor, brand_id: i64, draft: BrandDraft) -> Result<Brand> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let brand = uow.update_brand(brand_id, &draft).await?.ok_or(ShopError::NotFound("Brand"))?;
        uow.commit().await?;
        Ok(brand)
    }

    #[instrument(skip(self, actor), err)]
    pub async fn delete_brand(&self, actor: &Actor, brand_id: i64) -> Result<()> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        if !uow.delete_brand(brand_id).await? {
            return Err(ShopError::NotFound("Brand"));
        }
        uow.commit().await?;
        info!("brand deleted with its phones");
        Ok(())
    }

    pub async fn list_phones(&self, page: Page) -> Result<Paginated<MobilePhone>> {
        let mut uow = self.storage.begin().await?;
        Ok(Paginated::new(uow.list_phones(page).await?, page))
    }

    pub async fn get_phone(&self, phone_id: i64) -> Result<MobilePhone> {
        let mut uow = self.storage.begin().await?;
        uow.find_phone(phone_id).await?.ok_or(ShopError::NotFound("Phone"))
    }

    #[instrument(skip_all, fields(model = %draft.model_name), err)]
    pub async fn create_phone(&self, actor: &Actor, draft: PhoneDraft) -> Result<MobilePhone> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let phone = uow.insert_phone(&draft).await?;
        uow.commit().await?;
        info!(phone_id = phone.phone_id, "phone created");
        Ok(phone)
    }

    pub async fn update_phone(&self, actor: &Actor, phone_id: i64, draft: PhoneDraft) -> Result<MobilePhone> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let phone = uow.update_phone(phone_id, &draft).await?.ok_or(ShopError::NotFound("Phone"))?;
        uow.commit().await?;
        Ok(phone)
    }

    pub async fn delete_phone(&self, actor: &Actor, phone_id: i64) -> Result<()> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        if !uow.delete_phone(phone_id).await? {
            return Err(ShopError::NotFound("Phone"));
        }
        uow.commit().await
    }

    pub async fn list_accessories(&self, page: Page) -> Result<Paginated<Accessory>> {
        let mut uow = self.storage.begin().await?;
        Ok(Paginated::new(uow.list_accessories(page).await?, page))
    }

    pub async fn get_accessory(&self, accessory_id: i64) -> Result<Accessory> {
        let mut uow = self.storage.begin().await?;
        uow.find_accessory(accessory_id).await?.ok_or(ShopError::NotFound("Accessory"))
    }

    #[instrument(skip_all, fields(name = %draft.name), err)]
    pub async fn create_accessory(&self, actor: &Actor, draft: AccessoryDraft) -> Result<Accessory> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let accessory = uow.insert_accessory(&draft).await?;
        uow.commit().await?;
        info!(accessory_id = accessory.accessory_id, "accessory created");
        Ok(accessory)
    }

    pub async fn update_accessory(&self, actor: &Actor, accessory_id: i64, draft: AccessoryDraft) -> Result<Accessory> {
        actor.require_staff()?;
        draft.validate()?;
        let mut uow = self.storage.begin().await?;
        let accessory = uow
            .update_accessory(accessory_id, &draft)
            .await?
            .ok_or(ShopError::NotFound("Accessory"))?;
        uow.commit().await?;
        Ok(accessory)
    }

    pub async fn delete_accessory(&self, actor: &Actor, accessory_id: i64) -> Result<()> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        if !uow.delete_accessory(accessory_id).await? {
            return Err(ShopError::NotFound("Accessory"));
        }
        uow.commit().await
    }

    /// Loads the demo catalog into an empty store. Returns `false` and writes
    /// nothing when any brand or accessory already exists.
    #[instrument(skip_all, err)]
    pub async fn seed_sample_data(&self) -> Result<bool> {
        let mut uow = self.storage.begin().await?;
        let first = Page::new(Some(1), Some(1));
        if uow.list_brands(first).await?.1 > 0 || uow.list_accessories(first).await?.1 > 0 {
            info!("catalog not empty, sample data skipped");
            return Ok(false);
        }

        let mut brand_ids = HashMap::new();
        for draft in sample::brands() {
            draft.validate()?;
            let brand = uow.insert_brand(&draft).await?;
            brand_ids.insert(brand.brand_name, brand.brand_id);
        }
        for (brand_name, mut draft) in sample::phones() {
            draft.brand_id = *brand_ids.get(brand_name).ok_or(ShopError::NotFound("Brand"))?;
            draft.validate()?;
            uow.insert_phone(&draft).await?;
        }
        for draft in sample::accessories() {
            draft.validate()?;
            uow.insert_accessory(&draft).await?;
        }
        uow.commit().await?;
        info!(brands = brand_ids.len(), "sample catalog loaded");
        Ok(true)
    }
}
