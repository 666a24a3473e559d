//! GitHub App authentication
//!
//! Builds and signs the short-lived app JWT that is exchanged for an
//! installation token.

use async_trait::async_trait;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SyncError};
use crate::platform::JwtSigner;

/// Backdate applied to `iat` to tolerate clock drift against GitHub
pub const CLOCK_SKEW_SECS: i64 = 10;

/// Lifetime of an app JWT; GitHub rejects anything above ten minutes
pub const MAX_ASSERTION_LIFETIME_SECS: i64 = 300;

/// GitHub App JWT claims
#[derive(Serialize, Deserialize)]
struct AppJwtClaims {
    iat: i64,
    exp: i64,
    iss: String,
}

/// The GitHub App identity a run acts as
#[derive(Clone)]
pub struct AppIdentity {
    pub app_id: String,
    pub installation_id: u64,
    /// PEM-encoded RSA private key (PKCS#1 or PKCS#8)
    pub private_key_pem: Vec<u8>,
}

impl fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppIdentity")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key_pem", &"<redacted>")
            .finish()
    }
}

/// A signed app JWT together with the claim values it carries
#[derive(Clone)]
pub struct SignedAssertion {
    pub issuer: String,
    pub issued_at: i64,
    pub expires_at: i64,
    /// Compact serialization, `header.claims.signature`
    pub jwt: String,
}

impl fmt::Debug for SignedAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedAssertion")
            .field("issuer", &self.issuer)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Sign an app JWT for `identity` at `now_secs`.
///
/// Pure: no I/O happens here, a malformed key fails before anything is sent.
pub fn sign(identity: &AppIdentity, now_secs: i64) -> Result<SignedAssertion> {
    sign_app_jwt(&identity.app_id, &identity.private_key_pem, now_secs)
}

fn sign_app_jwt(app_id: &str, pem_key: &[u8], now_secs: i64) -> Result<SignedAssertion> {
    let claims = AppJwtClaims {
        iat: now_secs - CLOCK_SKEW_SECS,
        exp: now_secs + MAX_ASSERTION_LIFETIME_SECS,
        iss: app_id.to_string(),
    };

    let key = EncodingKey::from_rsa_pem(pem_key)
        .map_err(|e| SyncError::key_parse(e.to_string()))?;

    let jwt = encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        // The PEM envelope is only checked above; the DER body is parsed on first use
        match e.kind() {
            ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
                SyncError::key_parse(e.to_string())
            }
            _ => SyncError::signing(e.to_string()),
        }
    })?;

    Ok(SignedAssertion {
        issuer: claims.iss,
        issued_at: claims.iat,
        expires_at: claims.exp,
        jwt,
    })
}

/// JWT signer that uses a local PEM private key
pub struct PemJwtSigner {
    pub app_id: String,
    pub pem_key: Vec<u8>,
}

impl PemJwtSigner {
    pub fn for_identity(identity: &AppIdentity) -> Self {
        Self {
            app_id: identity.app_id.clone(),
            pem_key: identity.private_key_pem.clone(),
        }
    }
}

#[async_trait(?Send)]
impl JwtSigner for PemJwtSigner {
    async fn sign_app_jwt(&self, now_secs: i64) -> Result<SignedAssertion> {
        sign_app_jwt(&self.app_id, &self.pem_key, now_secs)
    }
}
