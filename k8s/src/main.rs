//! gh-token-sync: refreshes a GitHub App installation token into Kubernetes secrets
//!
//! Runs a single cycle and exits. Uses a single-threaded tokio runtime
//! (compatible with core's !Send async traits).

use anyhow::{bail, Context};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::time::Instant;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gh_token_sync_core::config::Config;
use gh_token_sync_core::error::SyncError;
use gh_token_sync_core::github::auth::{AppIdentity, PemJwtSigner};
use gh_token_sync_core::sync::{self, RunReport, RunRequest, EXIT_FATAL};

mod platform;
mod store;

use platform::{ReqwestHttpClient, SystemClock};
use store::KubeSecretStore;

const DEFAULT_CONFIG_PATH: &str = "/etc/gh_get_token.conf";
const CONFIG_ENV_VAR: &str = "GH_TOKEN_SYNC_CONFIG";
const USAGE: &str = "usage: gh-token-sync [-c|--config <path>]";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gh_token_sync=info,gh_token_sync_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match config_path(std::env::args().skip(1), std::env::var(CONFIG_ENV_VAR).ok()) {
        Ok(Some(path)) => path,
        Ok(None) => {
            println!("{}", USAGE);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n{}", e, USAGE);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    match run(config_path).await {
        Ok(report) => {
            print!("{}", report);
            ExitCode::from(report.exit_code())
        }
        Err(e) => {
            let key = e
                .downcast_ref::<SyncError>()
                .map(SyncError::error_key)
                .unwrap_or("startup_error");
            let message = format!("{:#}", e);
            error!(error = %message, "run aborted before any secret was reconciled");
            println!("fatal ({}): {}", key, message);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(config_path: PathBuf) -> anyhow::Result<RunReport> {
    let config = Config::load(&config_path)?;
    info!(
        path = %config_path.display(),
        targets = config.targets.len(),
        "loaded configuration"
    );

    let app = &config.github_app;
    let private_key_pem = std::fs::read(&app.app_pem_path).map_err(|e| {
        SyncError::config(format!(
            "error reading pem file {}: {}",
            app.app_pem_path.display(),
            e
        ))
    })?;
    let identity = AppIdentity {
        app_id: app.app_id.clone(),
        installation_id: app.installation_id,
        private_key_pem,
    };

    let client = kube::Client::try_default()
        .await
        .context("failed to create kubernetes client")?;
    let store = KubeSecretStore::new(client);
    let http = ReqwestHttpClient::new();
    let signer = PemJwtSigner::for_identity(&identity);

    let deadline = Instant::now()
        .checked_add(config.run.deadline())
        .ok_or_else(|| SyncError::config("run.deadline_secs is out of range"))?;
    let request = RunRequest {
        api_base: &app.api_base,
        installation_id: identity.installation_id,
        targets: &config.targets,
        deadline,
        concurrency: config.run.concurrency,
    };

    Ok(sync::run(request, &signer, &http, &store, &SystemClock).await?)
}

/// Resolve the config path from flags, then the environment, then the default.
///
/// `Ok(None)` means help was requested.
fn config_path(
    mut args: impl Iterator<Item = String>,
    env_value: Option<String>,
) -> anyhow::Result<Option<PathBuf>> {
    let mut path = None;
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "-c" | "--config" => match args.next() {
                Some(value) => path = Some(value),
                None => bail!("{} requires a value", arg),
            },
            other => match other.strip_prefix("--config=") {
                Some(value) => path = Some(value.to_string()),
                None => bail!("unexpected argument '{}'", other),
            },
        }
    }

    Ok(Some(PathBuf::from(
        path.or(env_value)
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string()),
    )))
}
