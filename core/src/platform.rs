//! Platform abstraction traits
//!
//! These traits define the boundary between the sync engine and the concrete
//! HTTP transport, secret store and clock it runs against.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::Result;
use crate::github::auth::SignedAssertion;
use crate::secret::StoredSecret;

/// HTTP client for outbound requests to the token authority
#[async_trait(?Send)]
pub trait HttpClient {
    async fn post(&self, url: &str, headers: &[(&str, &str)], body: &[u8]) -> Result<HttpResponse>;
}

/// HTTP response from an outbound request
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy on invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Clock for current time (enables testing with deterministic timestamps)
pub trait Clock {
    fn now_secs(&self) -> u64;
}

/// Produces the app JWT presented to the token authority
#[async_trait(?Send)]
pub trait JwtSigner {
    async fn sign_app_jwt(&self, now_secs: i64) -> Result<SignedAssertion>;
}

/// Failure reported by a secret store backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of reading a secret by `(name, namespace)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    NotFound,
    Found(StoredSecret),
    Error(StoreError),
}

/// Key-value secret store addressed by `(name, namespace)`
///
/// Implementations never delete. `create` must fail if the key already
/// exists; `update` overwrites the existing record in place.
#[async_trait(?Send)]
pub trait SecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Lookup;
    async fn create(&self, secret: &StoredSecret) -> std::result::Result<StoredSecret, StoreError>;
    async fn update(&self, secret: &StoredSecret) -> std::result::Result<StoredSecret, StoreError>;
}
