/**
 * Signed test tokens for the registration service
 *
 * The registration service in an e2e deployment trusts one extra signing key;
 * tokens minted here with that key are accepted as real logins.
 */
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Env var holding the path of the PEM-encoded RSA signing key
pub const SIGNING_KEY_ENV: &str = "E2E_SIGNING_KEY";

/// Env var holding the key id the registration service knows the key under
pub const SIGNING_KID_ENV: &str = "E2E_SIGNING_KID";

pub const DEFAULT_KID: &str = "e2e-test-key";

const TOKEN_LIFETIME_HOURS: i64 = 24;

/// A user as the identity provider would describe them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestIdentity {
    pub id: Uuid,
    pub username: String,
}

impl TestIdentity {
    /// Identity with a fresh random id
    #[must_use]
    pub fn new(username: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub sub: String,
    pub typ: String,
    pub preferred_username: String,
    pub email: String,
    pub email_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
}

pub struct SigningKey {
    kid: String,
    algorithm: Algorithm,
    key: EncodingKey,
}

impl SigningKey {
    /// RS256 key read from a PEM file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or holds no RSA key
    pub fn from_rsa_pem_file(kid: &str, path: &Path) -> Result<Self> {
        let pem = std::fs::read(path)?;
        Ok(Self {
            kid: kid.to_string(),
            algorithm: Algorithm::RS256,
            key: EncodingKey::from_rsa_pem(&pem)?,
        })
    }

    /// HS256 key from a shared secret
    #[must_use]
    pub fn from_secret(kid: &str, secret: &[u8]) -> Self {
        Self {
            kid: kid.to_string(),
            algorithm: Algorithm::HS256,
            key: EncodingKey::from_secret(secret),
        }
    }

    /// Key configured through `E2E_SIGNING_KEY` and `E2E_SIGNING_KID`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Env`] when no key path is configured, or the error from
    /// loading the key
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(SIGNING_KEY_ENV).map_err(|e| Error::Env {
            name: SIGNING_KEY_ENV,
            reason: e.to_string(),
        })?;
        let kid = std::env::var(SIGNING_KID_ENV).unwrap_or_else(|_| DEFAULT_KID.to_string());
        Self::from_rsa_pem_file(&kid, Path::new(&path))
    }

    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

/// Claims for `identity`, adjustable before signing
#[derive(Debug, Clone)]
pub struct TokenBuilder {
    claims: Claims,
}

impl TokenBuilder {
    /// Claims issued now, valid for a day, with a random `@email.tld` address
    #[must_use]
    pub fn new(identity: &TestIdentity) -> Self {
        let now = Utc::now();
        Self {
            claims: Claims {
                jti: Uuid::new_v4().to_string(),
                iat: now.timestamp(),
                exp: (now + TimeDelta::hours(TOKEN_LIFETIME_HOURS)).timestamp(),
                sub: identity.id.to_string(),
                typ: "Bearer".to_string(),
                preferred_username: identity.username.clone(),
                email: format!("{}@email.tld", Uuid::new_v4()),
                email_verified: true,
                given_name: None,
                family_name: None,
                company: None,
            },
        }
    }

    #[must_use]
    pub fn email(mut self, email: &str) -> Self {
        self.claims.email = email.to_string();
        self
    }

    /// Backdate or postdate the `iat` claim
    #[must_use]
    pub fn issued_at(mut self, at: DateTime<Utc>) -> Self {
        self.claims.iat = at.timestamp();
        self
    }

    #[must_use]
    pub fn names(mut self, given: &str, family: &str) -> Self {
        self.claims.given_name = Some(given.to_string());
        self.claims.family_name = Some(family.to_string());
        self
    }

    #[must_use]
    pub fn company(mut self, company: &str) -> Self {
        self.claims.company = Some(company.to_string());
        self
    }

    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.claims
    }

    /// # Errors
    ///
    /// Returns an error if the claims cannot be encoded with `key`
    pub fn sign(&self, key: &SigningKey) -> Result<String> {
        let mut header = Header::new(key.algorithm);
        header.kid = Some(key.kid.clone());
        Ok(encode(&header, &self.claims, &key.key)?)
    }
}

/// Token for `identity`, issued a minute ago so the service never sees it as
/// used before issue
///
/// # Errors
///
/// Returns an error if signing fails
pub fn sign_test_token(identity: &TestIdentity, email: &str, key: &SigningKey) -> Result<String> {
    TokenBuilder::new(identity)
        .email(email)
        .issued_at(Utc::now() - TimeDelta::seconds(60))
        .sign(key)
}
