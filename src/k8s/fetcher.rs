use crate::error::Error;
use crate::wait::{FetchError, ResourceFetcher, ResourceKey};
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, ListParams};
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fmt::Debug;
use tracing::debug;

/// Whether the API server reported the object as missing
#[must_use]
pub fn is_not_found(error: &kube::Error) -> bool {
    match error {
        kube::Error::Api(api_error) => api_error.code == 404,
        _ => false,
    }
}

/// Map a kube error onto the poller's retry classification.
///
/// Only a 404 is transient. Auth failures, bad requests and transport errors
/// end the wait.
#[must_use]
pub fn classify(error: kube::Error) -> FetchError {
    if is_not_found(&error) {
        FetchError::NotFound
    } else {
        FetchError::Fatal(error.into())
    }
}

/// Fetches a single object by name through a `kube::Api`.
///
/// Once bound to a namespace, keys naming any other namespace are rejected
/// as fatal rather than looked up in the wrong place.
pub struct KubeFetcher<K> {
    api: Api<K>,
    namespace: Option<String>,
}

impl<K> KubeFetcher<K> {
    pub const fn new(api: Api<K>) -> Self {
        Self {
            api,
            namespace: None,
        }
    }

    /// Record the namespace `api` was built for
    #[must_use]
    pub fn bound_to(mut self, namespace: &str) -> Self {
        self.namespace = Some(namespace.to_string());
        self
    }

    pub fn namespaced(client: Client, namespace: &str) -> Self
    where
        K: Resource<Scope = NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Self::new(Api::namespaced(client, namespace)).bound_to(namespace)
    }

    pub fn cluster(client: Client) -> Self
    where
        K: Resource,
        <K as Resource>::DynamicType: Default,
    {
        Self::new(Api::all(client))
    }
}

#[async_trait]
impl<K> ResourceFetcher for KubeFetcher<K>
where
    K: Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    type Snapshot = K;

    async fn fetch(&self, key: &ResourceKey) -> Result<K, FetchError> {
        if let (Some(bound), Some(wanted)) = (&self.namespace, &key.namespace)
            && bound != wanted
        {
            return Err(FetchError::Fatal(Error::Custom(format!(
                "{key} is outside namespace {bound}"
            ))));
        }
        self.api.get(&key.name).await.map_err(classify)
    }
}

/// `key=value` pairs in key order, comma separated
fn label_selector(labels: &BTreeMap<String, String>) -> String {
    let pairs: Vec<String> = labels.iter().map(|(key, value)| format!("{key}={value}")).collect();
    pairs.join(",")
}

/// Fetches the first object carrying every given label.
///
/// An empty list counts as not found, and so do several matches once
/// [`LabelledFetcher::unique`] is set. The key passed to `fetch` only labels
/// log lines and errors.
pub struct LabelledFetcher<K> {
    api: Api<K>,
    labels: BTreeMap<String, String>,
    unique: bool,
}

impl<K> LabelledFetcher<K> {
    pub const fn new(api: Api<K>, labels: BTreeMap<String, String>) -> Self {
        Self {
            api,
            labels,
            unique: false,
        }
    }

    /// Only a single matching object counts as found
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Key naming this fetcher's selector, for use with the poller
    #[must_use]
    pub fn selector_key(&self) -> ResourceKey {
        ResourceKey::cluster(label_selector(&self.labels))
    }
}

#[async_trait]
impl<K> ResourceFetcher for LabelledFetcher<K>
where
    K: Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    type Snapshot = K;

    async fn fetch(&self, key: &ResourceKey) -> Result<K, FetchError> {
        let params = ListParams::default().labels(&label_selector(&self.labels));
        let list = self.api.list(&params).await.map_err(classify)?;
        let matches = list.items.len();
        debug!("🔎 {}: {} object(s) match", key, matches);
        if self.unique && matches > 1 {
            debug!("⏳ {}: expected exactly one match", key);
            return Err(FetchError::NotFound);
        }
        list.items.into_iter().next().ok_or(FetchError::NotFound)
    }
}
