use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{Result, ShopError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims stored in generated JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Customer ID
    pub sub: i64,
    pub typ: TokenKind,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Signed bearer token string
#[derive(Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for BearerToken {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BearerToken([REDACTED])")
    }
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: BearerToken,
    pub refresh: BearerToken,
}

/// HS256 signer and verifier for access and refresh tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], access_ttl: Duration, refresh_ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl,
            refresh_ttl,
        }
    }

    pub fn issue(&self, customer_id: i64, kind: TokenKind) -> Result<BearerToken> {
        let now = Utc::now();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let claims = TokenClaims {
            sub: customer_id,
            typ: kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map(BearerToken)
            .map_err(|e| ShopError::Internal(format!("token signing failed: {e}")))
    }

    pub fn issue_pair(&self, customer_id: i64) -> Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(customer_id, TokenKind::Access)?,
            refresh: self.issue(customer_id, TokenKind::Refresh)?,
        })
    }

    /// Checks signature, expiry and that the token is of the expected kind.
    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<TokenClaims> {
        let data = decode::<TokenClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map_err(|_| ShopError::unauthenticated("Given token not valid for any token type"))?;
        if data.claims.typ != kind {
            return Err(ShopError::unauthenticated("Token has wrong type"));
        }
        Ok(data.claims)
    }
}
