use crate::error::Error;
use async_trait::async_trait;
use std::fmt;

/// Name and optional namespace of the resource being waited on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub name: String,
    pub namespace: Option<String>,
}

impl ResourceKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{namespace}/{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Classified outcome of a failed fetch
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The resource does not exist (yet); pollers keep trying
    #[error("resource not found")]
    NotFound,

    /// Anything a retry will not fix, e.g. RBAC denial or a malformed key
    #[error("fatal fetch error: {0}")]
    Fatal(#[source] Error),
}

impl FetchError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

/// Read access to one kind of resource, keyed by [`ResourceKey`]
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    type Snapshot: Send;

    async fn fetch(&self, key: &ResourceKey) -> Result<Self::Snapshot, FetchError>;
}
