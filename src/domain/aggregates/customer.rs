//! Customer accounts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;
use crate::domain::value_objects::{validate_phone_number, validate_strong_password};

#[derive(Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub is_active: bool,
    pub is_staff: bool,
    pub date_joined: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub password_hash: String,
}

impl std::fmt::Debug for Customer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Customer")
            .field("customer_id", &self.customer_id)
            .field("email", &self.email)
            .field("is_active", &self.is_active)
            .field("is_staff", &self.is_staff)
            .field("password_hash", &"[REDACTED]")
            .finish()
    }
}

/// Lower-cases the domain part, leaving the local part as typed.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Clone, Deserialize, Validate)]
pub struct Registration {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom = "validate_phone_number")]
    pub phone: String,
    pub address: Option<String>,
    #[validate(custom = "validate_strong_password")]
    pub password: String,
    #[validate(must_match(other = "password", message = "Password fields didn't match."))]
    pub password2: String,
}

#[derive(Clone, Debug, Default, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(custom = "validate_phone_number")]
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Clone, Deserialize, Validate)]
pub struct PasswordChange {
    pub old_password: String,
    #[validate(custom = "validate_strong_password")]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Password fields didn't match."))]
    pub new_password2: String,
}

/// Insert payload for the customer repository; the password is already hashed.
#[derive(Clone)]
pub struct NewCustomer {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: Option<String>,
    pub password_hash: String,
    pub is_staff: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration() -> Registration {
        Registration {
            name: "Test User".into(), email: "test@example.com".into(), phone: "+1234567890".into(),
            address: None, password: "Str0ng!pass".into(), password2: "Str0ng!pass".into(),
        }
    }

    #[test]
    fn test_registration_rules() {
        assert!(registration().validate().is_ok());
        assert!(Registration { password2: "other".into(), ..registration() }.validate().is_err());
        assert!(Registration { email: "nope".into(), ..registration() }.validate().is_err());
        assert!(Registration { phone: "123".into(), ..registration() }.validate().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email(" Jane.Doe@Example.COM "), "Jane.Doe@example.com");
    }
}
