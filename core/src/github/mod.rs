//! GitHub App module
//!
//! App JWT signing and installation token exchange.

pub mod auth;
pub mod token;
