//! Kubernetes Secret store
//!
//! Maps core `StoredSecret`s onto `v1/Secret` objects. Updates are plain
//! replaces without a resourceVersion precondition.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::ByteString;
use kube::api::{Api, PostParams};
use kube::Client;

use gh_token_sync_core::platform::{Lookup, SecretStore, StoreError};
use gh_token_sync_core::secret::{StoredSecret, OPAQUE_TYPE};

/// Secret store backed by the Kubernetes API
pub struct KubeSecretStore {
    client: Client,
}

impl KubeSecretStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

#[async_trait(?Send)]
impl SecretStore for KubeSecretStore {
    async fn get(&self, namespace: &str, name: &str) -> Lookup {
        match self.api(namespace).get(name).await {
            Ok(secret) => Lookup::Found(from_secret(secret)),
            Err(kube::Error::Api(response)) if response.code == 404 => Lookup::NotFound,
            Err(e) => Lookup::Error(StoreError::new(e.to_string())),
        }
    }

    async fn create(&self, secret: &StoredSecret) -> Result<StoredSecret, StoreError> {
        self.api(&secret.namespace)
            .create(&PostParams::default(), &to_secret(secret))
            .await
            .map(from_secret)
            .map_err(|e| StoreError::new(e.to_string()))
    }

    async fn update(&self, secret: &StoredSecret) -> Result<StoredSecret, StoreError> {
        self.api(&secret.namespace)
            .replace(&secret.name, &PostParams::default(), &to_secret(secret))
            .await
            .map(from_secret)
            .map_err(|e| StoreError::new(e.to_string()))
    }
}

fn to_secret(secret: &StoredSecret) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(secret.name.clone()),
            namespace: Some(secret.namespace.clone()),
            annotations: (!secret.annotations.is_empty()).then(|| secret.annotations.clone()),
            ..Default::default()
        },
        type_: Some(secret.secret_type.clone()),
        data: Some(
            secret
                .data
                .iter()
                .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Default::default()
    }
}

fn from_secret(secret: Secret) -> StoredSecret {
    StoredSecret {
        name: secret.metadata.name.unwrap_or_default(),
        namespace: secret.metadata.namespace.unwrap_or_default(),
        secret_type: secret.type_.unwrap_or_else(|| OPAQUE_TYPE.to_string()),
        data: secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| (k, String::from_utf8_lossy(&v.0).into_owned()))
            .collect(),
        annotations: secret.metadata.annotations.unwrap_or_default(),
    }
}
