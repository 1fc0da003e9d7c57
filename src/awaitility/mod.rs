/**
 * Per-suite wait context for the host and member clusters
 *
 * One `Awaitility` is built per test suite and handed to every scenario; it
 * owns the clients, the operator namespaces and the default poll timing.
 */
pub mod host;
pub mod member;

pub use host::{ApprovalPolicy, HostAwaitility};
pub use member::MemberAwaitility;

use crate::error::{Error, Result};
use crate::k8s::{KubeFetcher, client, user_agent};
use crate::wait::{Criterion, PollConfig, ResourceKey, WaitError, wait_for, wait_until_deleted};
use k8s_openapi::NamespaceResourceScope;
use kube::{Client, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::path::PathBuf;
use tracing::{debug, info};

pub const HOST_NS_ENV: &str = "HOST_NS";
pub const MEMBER_NS_ENV: &str = "MEMBER_NS";
pub const REGISTRATION_SERVICE_URL_ENV: &str = "REGISTRATION_SERVICE_URL";
pub const MEMBER_KUBECONFIG_ENV: &str = "MEMBER_KUBECONFIG";

pub const DEFAULT_HOST_NS: &str = "toolchain-host-operator";
pub const DEFAULT_MEMBER_NS: &str = "toolchain-member-operator";

/// Outcome of a wait on a resource of type `K`
pub type WaitResult<K> = std::result::Result<K, WaitError<K>>;

/// Where the operators run and how long to wait for them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AwaitilityConfig {
    pub host_ns: String,
    pub member_ns: String,
    pub registration_service_url: Option<String>,
    /// Kubeconfig of a separate member cluster; `None` means host and member
    /// share the ambient cluster
    pub member_kubeconfig: Option<PathBuf>,
    pub poll: PollConfig,
}

impl Default for AwaitilityConfig {
    fn default() -> Self {
        Self {
            host_ns: DEFAULT_HOST_NS.to_string(),
            member_ns: DEFAULT_MEMBER_NS.to_string(),
            registration_service_url: None,
            member_kubeconfig: None,
            poll: PollConfig::default(),
        }
    }
}

impl AwaitilityConfig {
    /// Defaults overridden by `HOST_NS`, `MEMBER_NS`, `REGISTRATION_SERVICE_URL`,
    /// `MEMBER_KUBECONFIG` and the poll timing variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host_ns: non_empty_env(HOST_NS_ENV).unwrap_or(defaults.host_ns),
            member_ns: non_empty_env(MEMBER_NS_ENV).unwrap_or(defaults.member_ns),
            registration_service_url: non_empty_env(REGISTRATION_SERVICE_URL_ENV)
                .map(|url| url.trim_end_matches('/').to_string()),
            member_kubeconfig: non_empty_env(MEMBER_KUBECONFIG_ENV).map(PathBuf::from),
            poll: PollConfig::from_env(),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[derive(Clone)]
pub struct Awaitility {
    host: HostAwaitility,
    member: MemberAwaitility,
    registration_service_url: Option<String>,
}

impl Awaitility {
    pub fn new(host_client: Client, member_client: Client, config: &AwaitilityConfig) -> Self {
        Self {
            host: HostAwaitility::new(host_client, &config.host_ns, config.poll),
            member: MemberAwaitility::new(member_client, &config.member_ns, config.poll),
            registration_service_url: config.registration_service_url.clone(),
        }
    }

    /// Connect to the host cluster from the ambient kube configuration and to
    /// the member cluster from `config.member_kubeconfig` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if either client cannot be created
    pub async fn connect(config: &AwaitilityConfig) -> Result<Self> {
        let agent = user_agent();
        let host_client = client::new(Some(&agent)).await?;
        let member_client = match &config.member_kubeconfig {
            Some(path) => client::from_kubeconfig(path, Some(&agent)).await?,
            None => host_client.clone(),
        };
        info!(
            "🔗 Awaitility ready (host ns: {}, member ns: {})",
            config.host_ns, config.member_ns
        );
        Ok(Self::new(host_client, member_client, config))
    }

    #[must_use]
    pub const fn host(&self) -> &HostAwaitility {
        &self.host
    }

    #[must_use]
    pub const fn member(&self) -> &MemberAwaitility {
        &self.member
    }

    /// Base URL of the registration service
    ///
    /// # Errors
    ///
    /// Returns [`Error::Env`] when `REGISTRATION_SERVICE_URL` was not configured
    pub fn registration_service_url(&self) -> Result<&str> {
        self.registration_service_url
            .as_deref()
            .ok_or(Error::Env {
                name: REGISTRATION_SERVICE_URL_ENV,
                reason: "not set".to_string(),
            })
    }
}

pub(crate) async fn await_namespaced<K>(
    client: &Client,
    namespace: &str,
    name: &str,
    criteria: &[Criterion<K>],
    poll: PollConfig,
) -> WaitResult<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    let fetcher = KubeFetcher::<K>::namespaced(client.clone(), namespace);
    let key = ResourceKey::namespaced(namespace, name);
    debug!("⏳ Waiting for {} {} ({} criteria)", K::kind(&()), key, criteria.len());
    wait_for(&fetcher, &key, criteria, poll).await
}

pub(crate) async fn await_cluster<K>(
    client: &Client,
    name: &str,
    criteria: &[Criterion<K>],
    poll: PollConfig,
) -> WaitResult<K>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let fetcher = KubeFetcher::<K>::cluster(client.clone());
    let key = ResourceKey::cluster(name);
    debug!("⏳ Waiting for {} {} ({} criteria)", K::kind(&()), key, criteria.len());
    wait_for(&fetcher, &key, criteria, poll).await
}

pub(crate) async fn await_namespaced_deleted<K>(
    client: &Client,
    namespace: &str,
    name: &str,
    poll: PollConfig,
) -> std::result::Result<(), WaitError<K>>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
        + Clone
        + DeserializeOwned
        + Debug
        + Send
        + Sync
        + 'static,
{
    let fetcher = KubeFetcher::<K>::namespaced(client.clone(), namespace);
    let key = ResourceKey::namespaced(namespace, name);
    debug!("⏳ Waiting for {} {} to be deleted", K::kind(&()), key);
    wait_until_deleted(&fetcher, &key, poll).await
}

pub(crate) async fn await_cluster_deleted<K>(
    client: &Client,
    name: &str,
    poll: PollConfig,
) -> std::result::Result<(), WaitError<K>>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    let fetcher = KubeFetcher::<K>::cluster(client.clone());
    let key = ResourceKey::cluster(name);
    debug!("⏳ Waiting for {} {} to be deleted", K::kind(&()), key);
    wait_until_deleted(&fetcher, &key, poll).await
}
