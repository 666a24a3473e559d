//! Secret targets and their stored representation
//!
//! A [`SecretTarget`] declares where a token goes and in which shape; the
//! shape alone decides the secret type and data layout.

mod reconcile;

pub use reconcile::{decide, Action, Applied, Reconciler};

use std::collections::BTreeMap;
use std::fmt;

use crate::github::token::AccessToken;

pub const OPAQUE_TYPE: &str = "Opaque";
pub const BASIC_AUTH_TYPE: &str = "kubernetes.io/basic-auth";
pub const DOCKER_CONFIG_JSON_TYPE: &str = "kubernetes.io/dockerconfigjson";

/// Registry used for pull secrets when none is configured
pub const DEFAULT_REGISTRY: &str = "ghcr.io";

/// Username GitHub expects alongside an installation token
const TOKEN_USERNAME: &str = "token";

/// Encoding family of a stored credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretShape {
    /// `{token}`
    Opaque,
    /// `{username, password}`
    BasicAuth,
    /// `{.dockerconfigjson}` for a single registry
    DockerConfigJson { registry: String },
}

impl SecretShape {
    pub fn secret_type(&self) -> &'static str {
        match self {
            Self::Opaque => OPAQUE_TYPE,
            Self::BasicAuth => BASIC_AUTH_TYPE,
            Self::DockerConfigJson { .. } => DOCKER_CONFIG_JSON_TYPE,
        }
    }

    pub fn data(&self, token: &AccessToken) -> BTreeMap<String, String> {
        let token = token.secret();
        match self {
            Self::Opaque => BTreeMap::from([("token".to_string(), token.to_string())]),
            Self::BasicAuth => BTreeMap::from([
                ("username".to_string(), TOKEN_USERNAME.to_string()),
                ("password".to_string(), token.to_string()),
            ]),
            Self::DockerConfigJson { registry } => BTreeMap::from([(
                ".dockerconfigjson".to_string(),
                docker_config_json(registry, token),
            )]),
        }
    }
}

impl fmt::Display for SecretShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Opaque => f.write_str("opaque"),
            Self::BasicAuth => f.write_str("basic-auth"),
            Self::DockerConfigJson { registry } => write!(f, "docker-config-json({})", registry),
        }
    }
}

/// Registry auth blob in the exact layout existing consumers parse.
///
/// `auth` carries `token:<token>` unencoded and the space after `"auth":` is
/// part of the format, so this is written by hand rather than serialized.
fn docker_config_json(registry: &str, token: &str) -> String {
    format!(
        r#"{{"auths":{{"{}":{{"auth": "token:{}"}}}}}}"#,
        registry, token
    )
}

/// One declared destination for the access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretTarget {
    pub name: String,
    pub namespace: String,
    pub shape: SecretShape,
    pub annotations: BTreeMap<String, String>,
}

impl SecretTarget {
    /// Full desired state of this target for `token`
    pub fn render(&self, token: &AccessToken) -> StoredSecret {
        StoredSecret {
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            secret_type: self.shape.secret_type().to_string(),
            data: self.shape.data(token),
            annotations: self.annotations.clone(),
        }
    }
}

impl fmt::Display for SecretTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// A secret as held by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredSecret {
    pub name: String,
    pub namespace: String,
    pub secret_type: String,
    pub data: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}
