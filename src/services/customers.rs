//! Accounts, credentials and profiles.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use validator::Validate;
use crate::auth::{hash_password, verify_password, BearerToken, TokenIssuer, TokenKind, TokenPair};
use crate::domain::aggregates::customer::normalize_email;
use crate::domain::aggregates::{Customer, NewCustomer, PasswordChange, ProfileUpdate, Registration};
use crate::services::Actor;
use crate::storage::Storage;
use crate::{Result, ShopError};

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AccessOnly {
    pub access: BearerToken,
}

#[derive(Clone)]
pub struct CustomerService {
    storage: Arc<dyn Storage>,
    tokens: TokenIssuer,
}

impl CustomerService {
    pub fn new(storage: Arc<dyn Storage>, tokens: TokenIssuer) -> Self {
        Self { storage, tokens }
    }

    #[instrument(skip_all, err)]
    pub async fn register(&self, registration: Registration) -> Result<Customer> {
        registration.validate()?;
        let email = normalize_email(&registration.email);
        let password_hash = hash_password(&registration.password)?;
        let mut uow = self.storage.begin().await?;
        if uow.find_customer_by_email(&email).await?.is_some() {
            return Err(ShopError::Conflict("A customer with this email already exists.".into()));
        }
        let customer = uow
            .insert_customer(&NewCustomer {
                name: registration.name,
                email,
                phone: registration.phone,
                address: registration.address,
                password_hash,
                is_staff: false,
            })
            .await?;
        uow.commit().await?;
        info!(customer_id = customer.customer_id, "customer registered");
        Ok(customer)
    }

    #[instrument(skip_all, err)]
    pub async fn login(&self, credentials: Credentials) -> Result<TokenPair> {
        let email = normalize_email(&credentials.email);
        let mut uow = self.storage.begin().await?;
        let customer = uow.find_customer_by_email(&email).await?;
        drop(uow);
        match customer {
            Some(c) if c.is_active && verify_password(&credentials.password, &c.password_hash) => {
                debug!(customer_id = c.customer_id, "login succeeded");
                self.tokens.issue_pair(c.customer_id)
            }
            _ => Err(ShopError::unauthenticated("No active account found with the given credentials")),
        }
    }

    pub async fn refresh(&self, refresh: &str) -> Result<AccessOnly> {
        let claims = self.tokens.verify(refresh, TokenKind::Refresh)?;
        let customer = self.active_customer(claims.sub).await?;
        Ok(AccessOnly { access: self.tokens.issue(customer.customer_id, TokenKind::Access)? })
    }

    /// Resolves an access token to the live account behind it.
    pub async fn authenticate(&self, access: &str) -> Result<Actor> {
        let claims = self.tokens.verify(access, TokenKind::Access)?;
        let customer = self.active_customer(claims.sub).await?;
        Ok(Actor { customer_id: customer.customer_id, is_staff: customer.is_staff })
    }

    async fn active_customer(&self, customer_id: i64) -> Result<Customer> {
        let mut uow = self.storage.begin().await?;
        match uow.find_customer(customer_id).await? {
            Some(c) if c.is_active => Ok(c),
            _ => Err(ShopError::unauthenticated("User not found or inactive")),
        }
    }

    pub async fn me(&self, actor: &Actor) -> Result<Customer> {
        let mut uow = self.storage.begin().await?;
        uow.find_customer(actor.customer_id).await?.ok_or(ShopError::NotFound("Customer"))
    }

    pub async fn get(&self, actor: &Actor, customer_id: i64) -> Result<Customer> {
        if !actor.can_access(customer_id) {
            return Err(ShopError::NotFound("Customer"));
        }
        let mut uow = self.storage.begin().await?;
        uow.find_customer(customer_id).await?.ok_or(ShopError::NotFound("Customer"))
    }

    pub async fn list(&self, actor: &Actor) -> Result<Vec<Customer>> {
        actor.require_staff()?;
        let mut uow = self.storage.begin().await?;
        uow.list_customers().await
    }

    #[instrument(skip_all, fields(customer_id = actor.customer_id), err)]
    pub async fn update_profile(&self, actor: &Actor, update: ProfileUpdate) -> Result<Customer> {
        update.validate()?;
        let mut uow = self.storage.begin().await?;
        let customer = uow.update_profile(actor.customer_id, &update).await?;
        uow.commit().await?;
        Ok(customer)
    }

    #[instrument(skip_all, fields(customer_id = actor.customer_id), err)]
    pub async fn change_password(&self, actor: &Actor, change: PasswordChange) -> Result<()> {
        change.validate()?;
        let mut uow = self.storage.begin().await?;
        let customer = uow.find_customer(actor.customer_id).await?.ok_or(ShopError::NotFound("Customer"))?;
        if !verify_password(&change.old_password, &customer.password_hash) {
            return Err(ShopError::field("old_password", "Old password is not correct"));
        }
        let password_hash = hash_password(&change.new_password)?;
        uow.update_password_hash(customer.customer_id, &password_hash).await?;
        uow.commit().await?;
        info!("password changed");
        Ok(())
    }

    /// Creates the account, or promotes and re-keys an existing one, so that
    /// the configured administrator can always sign in.
    #[instrument(skip_all, err)]
    pub async fn ensure_staff_account(&self, email: &str, password: &str) -> Result<Customer> {
        let email = normalize_email(email);
        let password_hash = hash_password(password)?;
        let mut uow = self.storage.begin().await?;
        let customer = match uow.find_customer_by_email(&email).await? {
            Some(existing) => {
                uow.set_staff(existing.customer_id, true).await?;
                uow.update_password_hash(existing.customer_id, &password_hash).await?;
                uow.find_customer(existing.customer_id).await?.ok_or(ShopError::NotFound("Customer"))?
            }
            None => {
                uow.insert_customer(&NewCustomer {
                    name: "Administrator".into(),
                    email,
                    phone: String::new(),
                    address: None,
                    password_hash,
                    is_staff: true,
                })
                .await?
            }
        };
        uow.commit().await?;
        info!(customer_id = customer.customer_id, "staff account ensured");
        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{customer, registration, services};

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials { email: email.into(), password: password.into() }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let services = services();
        let created = services.customers.register(registration("jane@Example.COM")).await.unwrap();
        assert_eq!(created.email, "jane@example.com");
        assert!(!created.is_staff);

        let pair = services.customers.login(credentials("jane@example.com", "Str0ng!pass")).await.unwrap();
        let actor = services.customers.authenticate(pair.access.as_ref()).await.unwrap();
        assert_eq!(actor.customer_id, created.customer_id);

        let fresh = services.customers.refresh(pair.refresh.as_ref()).await.unwrap();
        assert!(services.customers.authenticate(fresh.access.as_ref()).await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let services = services();
        services.customers.register(registration("dup@example.com")).await.unwrap();
        let err = services.customers.register(registration("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, ShopError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthenticated() {
        let services = services();
        services.customers.register(registration("a@example.com")).await.unwrap();
        let err = services.customers.login(credentials("a@example.com", "Wr0ng!pass")).await.unwrap_err();
        assert!(matches!(err, ShopError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn test_refresh_token_cannot_authenticate() {
        let services = services();
        services.customers.register(registration("b@example.com")).await.unwrap();
        let pair = services.customers.login(credentials("b@example.com", "Str0ng!pass")).await.unwrap();
        assert!(services.customers.authenticate(pair.refresh.as_ref()).await.is_err());
    }

    #[tokio::test]
    async fn test_change_password_checks_old_one() {
        let services = services();
        let actor = customer(&services, "c@example.com").await;
        let change = PasswordChange {
            old_password: "nope".into(),
            new_password: "N3w!password".into(),
            new_password2: "N3w!password".into(),
        };
        assert!(services.customers.change_password(&actor, change.clone()).await.is_err());

        let change = PasswordChange { old_password: "Str0ng!pass".into(), ..change };
        services.customers.change_password(&actor, change).await.unwrap();
        assert!(services.customers.login(credentials("c@example.com", "N3w!password")).await.is_ok());
    }

    #[tokio::test]
    async fn test_profile_update_is_partial() {
        let services = services();
        let actor = customer(&services, "d@example.com").await;
        let update = ProfileUpdate { address: Some("1 Infinite Loop".into()), ..Default::default() };
        let updated = services.customers.update_profile(&actor, update).await.unwrap();
        assert_eq!(updated.name, "Test Customer");
        assert_eq!(updated.address.as_deref(), Some("1 Infinite Loop"));
    }

    #[tokio::test]
    async fn test_staff_bootstrap_and_listing() {
        let services = services();
        let buyer = customer(&services, "e@example.com").await;
        assert!(matches!(services.customers.list(&buyer).await, Err(ShopError::PermissionDenied(_))));

        let admin = services.customers.ensure_staff_account("admin@example.com", "Adm1n!pass").await.unwrap();
        assert!(admin.is_staff);
        let again = services.customers.ensure_staff_account("admin@example.com", "Adm1n!pass").await.unwrap();
        assert_eq!(again.customer_id, admin.customer_id);

        let staff = Actor { customer_id: admin.customer_id, is_staff: true };
        assert_eq!(services.customers.list(&staff).await.unwrap().len(), 2);
    }
}
