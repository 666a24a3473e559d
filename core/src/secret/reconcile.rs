//! Create-or-update of a single secret target
//!
//! Read and write are separate calls against the store, so a change made
//! by someone else between them is overwritten (last writer wins).

use tracing::{debug, info};

use super::{SecretTarget, StoredSecret};
use crate::error::{Result, SyncError};
use crate::github::token::AccessToken;
use crate::platform::{Lookup, SecretStore};

/// Write to perform for a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    Update,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Update => "updated",
        }
    }
}

/// Map a lookup outcome to the write it calls for.
///
/// Only a definite not-found leads to a create; a failed read is never
/// treated as absence.
pub fn decide(lookup: Lookup) -> Result<Action> {
    match lookup {
        Lookup::NotFound => Ok(Action::Create),
        Lookup::Found(_) => Ok(Action::Update),
        Lookup::Error(e) => Err(SyncError::lookup(e.message)),
    }
}

/// Result of reconciling one target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub action: Action,
    pub secret: StoredSecret,
}

/// Reconciles targets against a secret store
pub struct Reconciler<'a> {
    store: &'a dyn SecretStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn SecretStore) -> Self {
        Self { store }
    }

    /// Bring `target` to the state derived from `token`.
    ///
    /// Updates replace the whole record, annotations included.
    pub async fn reconcile(&self, target: &SecretTarget, token: &AccessToken) -> Result<Applied> {
        let lookup = self.store.get(&target.namespace, &target.name).await;
        let action = decide(lookup)?;
        debug!(secret = %target, action = action.as_str(), "reconciling secret");

        let desired = target.render(token);
        let written = match action {
            Action::Create => self.store.create(&desired).await,
            Action::Update => self.store.update(&desired).await,
        }
        .map_err(|e| SyncError::write(e.message))?;

        info!(
            secret = %target,
            shape = %target.shape,
            action = action.as_str(),
            "secret reconciled"
        );

        Ok(Applied {
            action,
            secret: written,
        })
    }
}
