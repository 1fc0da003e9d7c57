use super::{WaitResult, await_namespaced, await_namespaced_deleted};
use crate::toolchain::{BannedUser, MasterUserRecord, NSTemplateTier, UserSignup};
use crate::wait::{Criterion, PollConfig, RetryOption, WaitError};
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::core::v1::ConfigMap;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::api::{Api, PostParams};
use kube::{Client, Resource};
use std::collections::BTreeMap;
use tracing::info;

/// ConfigMap in the host namespace the host operator reads its settings from
pub const HOST_CONFIG_MAP: &str = "toolchain-host-operator";

/// Key of the signup approval policy in [`HOST_CONFIG_MAP`]
pub const APPROVAL_POLICY_KEY: &str = "user-approval-policy";

/// How the host operator approves new signups
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalPolicy {
    /// Signups wait for `spec.approved` to be set
    Manual,
    Automatic,
}

impl ApprovalPolicy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

/// Waits on the resources the host operator owns, all in its namespace
#[derive(Clone)]
pub struct HostAwaitility {
    client: Client,
    namespace: String,
    poll: PollConfig,
}

impl HostAwaitility {
    pub fn new(client: Client, namespace: &str, poll: PollConfig) -> Self {
        Self {
            client,
            namespace: namespace.to_string(),
            poll,
        }
    }

    /// Copy of this context polling with `options` applied
    #[must_use]
    pub fn with_retry_options(&self, options: &[RetryOption]) -> Self {
        Self {
            poll: self.poll.with_retry_options(options),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub const fn client(&self) -> &Client {
        &self.client
    }

    #[must_use]
    pub const fn poll_config(&self) -> PollConfig {
        self.poll
    }

    /// Namespaced `Api` for a host resource, for creating and deleting objects
    #[must_use]
    pub fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    pub async fn wait_for_user_signup(
        &self,
        name: &str,
        criteria: &[Criterion<UserSignup>],
    ) -> WaitResult<UserSignup> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    pub async fn wait_for_master_user_record(
        &self,
        name: &str,
        criteria: &[Criterion<MasterUserRecord>],
    ) -> WaitResult<MasterUserRecord> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    pub async fn wait_until_master_user_record_deleted(
        &self,
        name: &str,
    ) -> Result<(), WaitError<MasterUserRecord>> {
        await_namespaced_deleted(&self.client, &self.namespace, name, self.poll).await
    }

    pub async fn wait_until_user_signup_deleted(&self, name: &str) -> Result<(), WaitError<UserSignup>> {
        await_namespaced_deleted(&self.client, &self.namespace, name, self.poll).await
    }

    pub async fn wait_for_ns_template_tier(
        &self,
        name: &str,
        criteria: &[Criterion<NSTemplateTier>],
    ) -> WaitResult<NSTemplateTier> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    pub async fn wait_for_banned_user(
        &self,
        name: &str,
        criteria: &[Criterion<BannedUser>],
    ) -> WaitResult<BannedUser> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    /// Write `policy` into the host operator's ConfigMap, creating it if needed
    ///
    /// # Errors
    ///
    /// Returns an error if the ConfigMap cannot be read or written
    pub async fn set_approval_policy(&self, policy: ApprovalPolicy) -> crate::Result<()> {
        let api = self.api::<ConfigMap>();
        let params = PostParams::default();
        match api.get_opt(HOST_CONFIG_MAP).await? {
            Some(mut config_map) => {
                config_map
                    .data
                    .get_or_insert_with(BTreeMap::new)
                    .insert(APPROVAL_POLICY_KEY.to_string(), policy.as_str().to_string());
                api.replace(HOST_CONFIG_MAP, &params, &config_map).await?;
            }
            None => {
                let config_map = ConfigMap {
                    metadata: ObjectMeta {
                        name: Some(HOST_CONFIG_MAP.to_string()),
                        namespace: Some(self.namespace.clone()),
                        ..ObjectMeta::default()
                    },
                    data: Some(BTreeMap::from([(
                        APPROVAL_POLICY_KEY.to_string(),
                        policy.as_str().to_string(),
                    )])),
                    ..ConfigMap::default()
                };
                api.create(&params, &config_map).await?;
            }
        }
        info!("⚙️ Signup approval policy set to {}", policy.as_str());
        Ok(())
    }
}
