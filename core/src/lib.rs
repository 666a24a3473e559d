//! gh-token-sync-core: platform-agnostic engine for GitHub App token sync
//!
//! Signs a GitHub App JWT, exchanges it for an installation token and
//! reconciles that token into a secret store as one or more secrets. It
//! depends only on the abstract platform traits (HttpClient, SecretStore,
//! Clock, JwtSigner) and never imports a concrete transport or store client.

pub mod config;
pub mod error;
pub mod github;
pub mod platform;
pub mod secret;
pub mod sync;

#[cfg(test)]
pub mod test_support;
