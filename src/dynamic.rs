/**
 * Untyped access to the kinds the command line can wait on
 */
use crate::awaitility::AwaitilityConfig;
use crate::error::{Error, Result};
use crate::k8s::KubeFetcher;
use crate::toolchain::{
    BannedUser, Condition, Identity, MasterUserRecord, NSTemplateSet, NSTemplateTier, User,
    UserAccount, UserSignup,
};
use crate::wait::{Criterion, ResourceKey};
use clap::ValueEnum;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::serde_json;
use kube::Client;
use kube::api::{Api, ApiResource, DynamicObject};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResourceKind {
    UserSignup,
    MasterUserRecord,
    UserAccount,
    NsTemplateSet,
    NsTemplateTier,
    BannedUser,
    User,
    Identity,
    Namespace,
}

/// Which operator namespace a kind lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Host,
    Member,
    Cluster,
}

impl ResourceKind {
    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        match self {
            Self::UserSignup => ApiResource::erase::<UserSignup>(&()),
            Self::MasterUserRecord => ApiResource::erase::<MasterUserRecord>(&()),
            Self::UserAccount => ApiResource::erase::<UserAccount>(&()),
            Self::NsTemplateSet => ApiResource::erase::<NSTemplateSet>(&()),
            Self::NsTemplateTier => ApiResource::erase::<NSTemplateTier>(&()),
            Self::BannedUser => ApiResource::erase::<BannedUser>(&()),
            Self::User => ApiResource::erase::<User>(&()),
            Self::Identity => ApiResource::erase::<Identity>(&()),
            Self::Namespace => ApiResource::erase::<Namespace>(&()),
        }
    }

    #[must_use]
    pub const fn scope(self) -> Scope {
        match self {
            Self::UserSignup | Self::MasterUserRecord | Self::NsTemplateTier | Self::BannedUser => {
                Scope::Host
            }
            Self::UserAccount | Self::NsTemplateSet => Scope::Member,
            Self::User | Self::Identity | Self::Namespace => Scope::Cluster,
        }
    }

    /// Key for `name`, in `namespace` or the kind's operator namespace.
    ///
    /// # Errors
    ///
    /// Returns an error when a namespace is given for a cluster-scoped kind
    pub fn key(self, name: &str, namespace: Option<&str>, config: &AwaitilityConfig) -> Result<ResourceKey> {
        match (self.scope(), namespace) {
            (Scope::Cluster, Some(ns)) => Err(Error::Custom(format!(
                "{} is cluster-scoped, namespace {ns} does not apply",
                self.api_resource().kind
            ))),
            (Scope::Cluster, None) => Ok(ResourceKey::cluster(name)),
            (_, Some(ns)) => Ok(ResourceKey::namespaced(ns, name)),
            (Scope::Host, None) => Ok(ResourceKey::namespaced(&config.host_ns, name)),
            (Scope::Member, None) => Ok(ResourceKey::namespaced(&config.member_ns, name)),
        }
    }

    /// Fetcher for objects of this kind addressed by `key`
    #[must_use]
    pub fn fetcher(self, client: Client, key: &ResourceKey) -> KubeFetcher<DynamicObject> {
        let resource = self.api_resource();
        match &key.namespace {
            Some(ns) => KubeFetcher::new(Api::namespaced_with(client, ns, &resource)).bound_to(ns),
            None => KubeFetcher::new(Api::all_with(client, &resource)),
        }
    }
}

/// Parse `Type=Status`, as given on the command line
///
/// # Errors
///
/// Returns an error if either side of the `=` is missing
pub fn parse_condition(raw: &str) -> Result<Condition> {
    let parts = raw
        .split_once('=')
        .map(|(type_, status)| (type_.trim(), status.trim()));
    match parts {
        Some((type_, status)) if !type_.is_empty() && !status.is_empty() => {
            Ok(Condition::new(type_, status, None))
        }
        _ => Err(Error::Custom(format!("expected Type=Status, got '{raw}'"))),
    }
}

fn status_conditions(object: &DynamicObject) -> Vec<Condition> {
    object
        .data
        .get("status")
        .and_then(|status| status.get("conditions"))
        .and_then(|conditions| serde_json::from_value(conditions.clone()).ok())
        .unwrap_or_default()
}

/// Every expected condition type is present with the expected status.
/// Reasons and any other conditions are not looked at.
#[must_use]
pub fn until_has_conditions(expected: Vec<Condition>) -> Criterion<DynamicObject> {
    let names: Vec<String> = expected
        .iter()
        .map(|c| format!("{}={}", c.type_, c.status))
        .collect();
    Criterion::new(
        format!("has conditions [{}]", names.join(", ")),
        move |object: &DynamicObject| {
            let actual = status_conditions(object);
            expected.iter().all(|want| {
                actual
                    .iter()
                    .any(|have| have.type_ == want.type_ && have.status == want.status)
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::serde_json::{Value, json};

    fn object(conditions: Value) -> DynamicObject {
        let resource = ResourceKind::MasterUserRecord.api_resource();
        let mut object = DynamicObject::new("johnsmith", &resource);
        object.data = json!({ "status": { "conditions": conditions } });
        object
    }

    #[test]
    fn test_parse_condition() {
        let condition = parse_condition("Ready=True").expect("valid");
        assert_eq!(condition.type_, "Ready");
        assert_eq!(condition.status, "True");
        assert!(parse_condition("Ready").is_err());
        assert!(parse_condition("=True").is_err());
        assert!(parse_condition("Ready=").is_err());
        assert!(parse_condition(" =True").is_err());
        assert!(parse_condition("Ready= ").is_err());

        let padded = parse_condition(" Ready = True ").expect("valid");
        assert_eq!(padded.type_, "Ready");
        assert_eq!(padded.status, "True");
    }

    #[test]
    fn test_until_has_conditions() {
        let criterion = until_has_conditions(vec![Condition::new("Ready", "True", None)]);
        assert_eq!(criterion.name(), "has conditions [Ready=True]");
        assert!(criterion.matches(&object(json!([
            { "type": "Ready", "status": "True", "reason": "Provisioned" },
            { "type": "Other", "status": "False" }
        ]))));
        assert!(!criterion.matches(&object(json!([{ "type": "Ready", "status": "False" }]))));
        assert!(!criterion.matches(&object(json!(null))));
    }

    #[test]
    fn test_keys_follow_scope() {
        let config = AwaitilityConfig::default();
        let key = ResourceKind::UserSignup.key("abc", None, &config).expect("key");
        assert_eq!(key.namespace.as_deref(), Some("toolchain-host-operator"));

        let key = ResourceKind::UserAccount.key("johnsmith", None, &config).expect("key");
        assert_eq!(key.namespace.as_deref(), Some("toolchain-member-operator"));

        let key = ResourceKind::NsTemplateSet.key("johnsmith", Some("custom"), &config).expect("key");
        assert_eq!(key.namespace.as_deref(), Some("custom"));

        assert!(ResourceKind::Identity.key("rhd:1", None, &config).expect("key").namespace.is_none());
        assert!(ResourceKind::User.key("johnsmith", Some("ns"), &config).is_err());
    }

    #[tokio::test]
    async fn test_fetcher_rejects_foreign_namespace() {
        use crate::wait::{FetchError, ResourceFetcher};
        use hyper::http::{Request, Response};
        use kube::client::Body;
        use tower_test::mock;

        let (service, _handle) = mock::pair::<Request<Body>, Response<Body>>();
        let key = ResourceKey::namespaced("toolchain-host-operator", "johnsmith");
        let fetcher = ResourceKind::MasterUserRecord.fetcher(Client::new(service, "default"), &key);

        let err = fetcher
            .fetch(&ResourceKey::namespaced("elsewhere", "johnsmith"))
            .await
            .expect_err("wrong namespace");
        assert!(matches!(err, FetchError::Fatal(_)));
    }

    #[test]
    fn test_api_resources() {
        let resource = ResourceKind::Identity.api_resource();
        assert_eq!(resource.group, "user.openshift.io");
        assert_eq!(resource.plural, "identities");
        assert_eq!(ResourceKind::NsTemplateTier.api_resource().kind, "NSTemplateTier");
    }
}
