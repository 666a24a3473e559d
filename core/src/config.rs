//! Configuration file model and validation
//!
//! The file is TOML. Targets come from `[[targets]]` entries and, for files
//! written for the single-secret layout, from a `[k8s_secret]` table that
//! expands into the opaque, basic-auth and `ghcr.io` pull secret trio.

use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SyncError};
use crate::github::token::DEFAULT_API_BASE;
use crate::secret::{SecretShape, SecretTarget, DEFAULT_REGISTRY};

/// Overall bound on token exchange plus all reconciliations (5 minutes)
pub const DEFAULT_DEADLINE_SECS: u64 = 300;

/// Upper bound on `run.deadline_secs` (1 hour)
pub const MAX_DEADLINE_SECS: u64 = 3600;

/// Reconciliations allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Validated application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub github_app: GithubAppConfig,
    pub run: RunSettings,
    pub targets: Vec<SecretTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubAppConfig {
    /// GitHub App numeric ID, used as the JWT issuer
    pub app_id: String,
    pub installation_id: u64,
    /// Path to the app's PEM private key
    pub app_pem_path: PathBuf,
    pub api_base: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    pub deadline_secs: u64,
    pub concurrency: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl RunSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

#[derive(Deserialize)]
struct RawConfig {
    github_app: RawGithubApp,
    #[serde(default)]
    run: RunSettings,
    k8s_secret: Option<LegacySecret>,
    #[serde(default)]
    targets: Vec<RawTarget>,
}

#[derive(Deserialize)]
struct RawGithubApp {
    app_id: NumericId,
    install_id: NumericId,
    app_pem_path: String,
    api_base: Option<String>,
}

/// IDs are accepted both quoted and bare
#[derive(Deserialize)]
#[serde(untagged)]
enum NumericId {
    Int(u64),
    Str(String),
}

impl NumericId {
    fn into_string(self) -> String {
        match self {
            Self::Int(n) => n.to_string(),
            Self::Str(s) => s.trim().to_string(),
        }
    }
}

#[derive(Deserialize)]
struct LegacySecret {
    name: String,
    namespace: String,
    #[serde(default)]
    dockerconf_anno: BTreeMap<String, String>,
    #[serde(default)]
    basicauth_anno: BTreeMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ShapeKind {
    Opaque,
    BasicAuth,
    #[serde(alias = "dockerconfigjson", alias = "registry-pull")]
    DockerConfigJson,
}

#[derive(Deserialize)]
struct RawTarget {
    name: String,
    namespace: String,
    shape: ShapeKind,
    registry: Option<String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
}

impl RawTarget {
    fn into_target(self) -> Result<SecretTarget> {
        let shape = match (self.shape, self.registry) {
            (ShapeKind::Opaque, None) => SecretShape::Opaque,
            (ShapeKind::BasicAuth, None) => SecretShape::BasicAuth,
            (ShapeKind::DockerConfigJson, registry) => {
                let registry = registry.unwrap_or_else(|| DEFAULT_REGISTRY.to_string());
                if !is_registry_host(&registry) {
                    return Err(SyncError::config(format!(
                        "target {}/{}: registry must be a bare host[:port], got '{}'",
                        self.namespace, self.name, registry
                    )));
                }
                SecretShape::DockerConfigJson { registry }
            }
            (_, Some(_)) => {
                return Err(SyncError::config(format!(
                    "target {}/{}: registry only applies to docker-config-json",
                    self.namespace, self.name
                )))
            }
        };

        Ok(SecretTarget {
            name: self.name,
            namespace: self.namespace,
            shape,
            annotations: self.annotations,
        })
    }
}

impl LegacySecret {
    /// The opaque secret carries the basic-auth annotations; existing
    /// deployments select on them.
    fn into_targets(self) -> Vec<SecretTarget> {
        vec![
            SecretTarget {
                name: format!("{}-opaque", self.name),
                namespace: self.namespace.clone(),
                shape: SecretShape::Opaque,
                annotations: self.basicauth_anno.clone(),
            },
            SecretTarget {
                name: self.name.clone(),
                namespace: self.namespace.clone(),
                shape: SecretShape::BasicAuth,
                annotations: self.basicauth_anno,
            },
            SecretTarget {
                name: format!("{}-ghcr", self.name),
                namespace: self.namespace,
                shape: SecretShape::DockerConfigJson {
                    registry: DEFAULT_REGISTRY.to_string(),
                },
                annotations: self.dockerconf_anno,
            },
        ]
    }
}

impl Config {
    /// Read and validate the configuration file at `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::config(format!("error reading config file {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| SyncError::config(format!("error parsing config: {}", e)))?;

        let app = raw.github_app;
        let app_id = app.app_id.into_string();
        if app_id.is_empty() {
            return Err(SyncError::config("github_app.app_id must not be empty"));
        }

        let install_id = app.install_id.into_string();
        let installation_id: u64 = install_id.parse().map_err(|_| {
            SyncError::config(format!(
                "github_app.install_id must be numeric, got '{}'",
                install_id
            ))
        })?;

        if app.app_pem_path.trim().is_empty() {
            return Err(SyncError::config("github_app.app_pem_path must not be empty"));
        }

        let api_base = app.api_base.unwrap_or_else(|| DEFAULT_API_BASE.to_string());
        let parsed = url::Url::parse(&api_base)
            .map_err(|e| SyncError::config(format!("invalid github_app.api_base: {}", e)))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(SyncError::config(format!(
                "github_app.api_base must be an http(s) URL, got '{}'",
                api_base
            )));
        }

        if raw.run.deadline_secs == 0 {
            return Err(SyncError::config("run.deadline_secs must be positive"));
        }
        if raw.run.deadline_secs > MAX_DEADLINE_SECS {
            return Err(SyncError::config(format!(
                "run.deadline_secs must be at most {}, got {}",
                MAX_DEADLINE_SECS, raw.run.deadline_secs
            )));
        }
        if raw.run.concurrency == 0 {
            return Err(SyncError::config("run.concurrency must be positive"));
        }

        let mut targets = raw
            .k8s_secret
            .map(LegacySecret::into_targets)
            .unwrap_or_default();
        for target in raw.targets {
            targets.push(target.into_target()?);
        }
        validate_targets(&targets)?;

        Ok(Self {
            github_app: GithubAppConfig {
                app_id,
                installation_id,
                app_pem_path: PathBuf::from(app.app_pem_path),
                api_base,
            },
            run: raw.run,
            targets,
        })
    }
}

/// The registry is written verbatim into the pull-secret JSON, so only
/// hostname characters and an optional numeric port are allowed.
fn is_registry_host(registry: &str) -> bool {
    let (host, port) = match registry.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (registry, None),
    };
    let host_ok = !host.is_empty()
        && host
            .split('.')
            .all(|label| {
                !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            });
    let port_ok = port.map_or(true, |p| p.parse::<u16>().map_or(false, |p| p > 0));
    host_ok && port_ok
}

fn validate_targets(targets: &[SecretTarget]) -> Result<()> {
    if targets.is_empty() {
        return Err(SyncError::config(
            "no targets configured; add [[targets]] or [k8s_secret]",
        ));
    }

    let mut seen = HashSet::new();
    for target in targets {
        if target.name.is_empty() || target.namespace.is_empty() {
            return Err(SyncError::config(
                "every target needs a non-empty name and namespace",
            ));
        }
        if !seen.insert((target.namespace.as_str(), target.name.as_str())) {
            return Err(SyncError::config(format!(
                "target {} is declared more than once",
                target
            )));
        }
    }
    Ok(())
}
