//! One refresh cycle: sign, exchange, reconcile every target

use futures::stream::{self, StreamExt};
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use super::report::{Failed, RunReport, Succeeded};
use crate::error::{Result, SyncError};
use crate::github::token::{self, AccessToken};
use crate::platform::{Clock, HttpClient, JwtSigner, SecretStore};
use crate::secret::{Applied, Reconciler, SecretTarget};

/// Platform-neutral run request
pub struct RunRequest<'a> {
    pub api_base: &'a str,
    pub installation_id: u64,
    pub targets: &'a [SecretTarget],
    /// Bounds token issuance and every reconciliation combined
    pub deadline: Instant,
    /// Reconciliations allowed in flight at once
    pub concurrency: usize,
}

/// Run one refresh cycle.
///
/// Returns `Err` only when no token could be obtained; per-target failures
/// are collected into the report instead.
pub async fn run(
    request: RunRequest<'_>,
    signer: &dyn JwtSigner,
    http: &dyn HttpClient,
    store: &dyn SecretStore,
    clock: &dyn Clock,
) -> Result<RunReport> {
    if Instant::now() >= request.deadline {
        return Err(SyncError::DeadlineExceeded { attempted: false });
    }

    let access_token = timeout_at(
        request.deadline,
        issue_token(request.api_base, request.installation_id, signer, http, clock),
    )
    .await
    .map_err(|_| SyncError::DeadlineExceeded { attempted: true })??;

    let reconciler = Reconciler::new(store);
    let access_token = &access_token;
    let reconciler = &reconciler;
    let deadline = request.deadline;

    let mut outcomes: Vec<(usize, Result<Applied>)> = stream::iter(request.targets.iter().enumerate())
        .map(move |(index, target)| async move {
            (index, reconcile_before(deadline, reconciler, target, access_token).await)
        })
        .buffer_unordered(request.concurrency.max(1))
        .collect()
        .await;
    outcomes.sort_by_key(|(index, _)| *index);

    let mut report = RunReport::default();
    for (index, outcome) in outcomes {
        let target = request.targets[index].clone();
        match outcome {
            Ok(applied) => report.succeeded.push(Succeeded {
                target,
                action: applied.action,
            }),
            Err(error) => {
                warn!(secret = %target, error = %error, "secret reconciliation failed");
                report.failed.push(Failed { target, error });
            }
        }
    }

    info!(
        succeeded = report.succeeded.len(),
        failed = report.failed.len(),
        "run finished"
    );
    Ok(report)
}

async fn issue_token(
    api_base: &str,
    installation_id: u64,
    signer: &dyn JwtSigner,
    http: &dyn HttpClient,
    clock: &dyn Clock,
) -> Result<AccessToken> {
    let now = clock.now_secs() as i64;
    let assertion = signer.sign_app_jwt(now).await?;

    info!(installation_id, issuer = %assertion.issuer, "requesting installation token");
    let access_token =
        token::create_installation_token(api_base, installation_id, &assertion, http).await?;

    match access_token.expires_in(now) {
        Some(expires_in) => info!(expires_in, "installation token issued"),
        None => info!("installation token issued"),
    }
    Ok(access_token)
}

/// Reconcile `target` unless the deadline has already passed; an in-flight
/// reconciliation is dropped when the deadline fires.
async fn reconcile_before(
    deadline: Instant,
    reconciler: &Reconciler<'_>,
    target: &SecretTarget,
    token: &AccessToken,
) -> Result<Applied> {
    if Instant::now() >= deadline {
        return Err(SyncError::DeadlineExceeded { attempted: false });
    }

    timeout_at(deadline, reconciler.reconcile(target, token))
        .await
        .unwrap_or(Err(SyncError::DeadlineExceeded { attempted: true }))
}
