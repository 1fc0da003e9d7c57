use super::{WaitResult, await_cluster, await_cluster_deleted, await_namespaced, await_namespaced_deleted};
use crate::k8s::LabelledFetcher;
use crate::toolchain::criteria::until_namespace_is_active;
use crate::toolchain::labels;
use crate::toolchain::{Identity, NSTemplateSet, User, UserAccount};
use crate::wait::{Criterion, PollConfig, RetryOption, WaitError, wait_for, wait_until_deleted};
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;
use kube::api::Api;
use kube::{Client, Resource};
use std::collections::BTreeMap;
use tracing::debug;

/// Waits on what the member operator provisions: accounts, template sets,
/// OpenShift users and the user namespaces
#[derive(Clone)]
pub struct MemberAwaitility {
    client: Client,
    namespace: String,
    poll: PollConfig,
}

impl MemberAwaitility {
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

    /// `Api` for a cluster-scoped member resource such as `User` or `Identity`
    #[must_use]
    pub fn cluster_api<K>(&self) -> Api<K>
    where
        K: Resource<DynamicType = ()>,
    {
        Api::all(self.client.clone())
    }

    pub async fn wait_for_user_account(
        &self,
        name: &str,
        criteria: &[Criterion<UserAccount>],
    ) -> WaitResult<UserAccount> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    pub async fn wait_until_user_account_deleted(&self, name: &str) -> Result<(), WaitError<UserAccount>> {
        await_namespaced_deleted(&self.client, &self.namespace, name, self.poll).await
    }

    pub async fn wait_for_ns_tmpl_set(
        &self,
        name: &str,
        criteria: &[Criterion<NSTemplateSet>],
    ) -> WaitResult<NSTemplateSet> {
        await_namespaced(&self.client, &self.namespace, name, criteria, self.poll).await
    }

    pub async fn wait_until_ns_template_set_deleted(
        &self,
        name: &str,
    ) -> Result<(), WaitError<NSTemplateSet>> {
        await_namespaced_deleted(&self.client, &self.namespace, name, self.poll).await
    }

    pub async fn wait_for_user(&self, name: &str, criteria: &[Criterion<User>]) -> WaitResult<User> {
        await_cluster(&self.client, name, criteria, self.poll).await
    }

    pub async fn wait_until_user_deleted(&self, name: &str) -> Result<(), WaitError<User>> {
        await_cluster_deleted(&self.client, name, self.poll).await
    }

    pub async fn wait_for_identity(
        &self,
        name: &str,
        criteria: &[Criterion<Identity>],
    ) -> WaitResult<Identity> {
        await_cluster(&self.client, name, criteria, self.poll).await
    }

    pub async fn wait_until_identity_deleted(&self, name: &str) -> Result<(), WaitError<Identity>> {
        await_cluster_deleted(&self.client, name, self.poll).await
    }

    /// Wait for the active namespace of type `type_` provisioned for `owner`
    /// from template revision `revision`. Exactly one namespace may match.
    pub async fn wait_for_namespace(
        &self,
        owner: &str,
        type_: &str,
        revision: &str,
    ) -> WaitResult<Namespace> {
        let mut selector = namespace_labels(owner, type_);
        selector.insert(labels::REVISION.to_string(), revision.to_string());
        let fetcher = LabelledFetcher::new(Api::<Namespace>::all(self.client.clone()), selector).unique();
        let key = fetcher.selector_key();
        debug!("⏳ Waiting for namespace {}", key);
        wait_for(&fetcher, &key, &[until_namespace_is_active()], self.poll).await
    }

    /// Wait until no namespace of type `type_` is labelled as owned by `owner`
    pub async fn wait_until_namespace_deleted(
        &self,
        owner: &str,
        type_: &str,
    ) -> Result<(), WaitError<Namespace>> {
        let fetcher = LabelledFetcher::new(
            Api::<Namespace>::all(self.client.clone()),
            namespace_labels(owner, type_),
        );
        let key = fetcher.selector_key();
        debug!("⏳ Waiting for namespace {} to be deleted", key);
        wait_until_deleted(&fetcher, &key, self.poll).await
    }

    /// Wait for role binding `name` inside the provisioned user namespace
    /// `namespace`
    pub async fn wait_for_role_binding(
        &self,
        namespace: &str,
        name: &str,
        criteria: &[Criterion<RoleBinding>],
    ) -> WaitResult<RoleBinding> {
        await_namespaced(&self.client, namespace, name, criteria, self.poll).await
    }
}

fn namespace_labels(owner: &str, type_: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (labels::OWNER.to_string(), owner.to_string()),
        (labels::TYPE.to_string(), type_.to_string()),
        (labels::PROVIDER.to_string(), labels::PROVIDER_VALUE.to_string()),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::http::{Request, Response};
    use k8s_openapi::serde_json::{self, Value, json};
    use kube::client::Body;
    use std::time::Duration;
    use tower_test::mock;

    fn respond(body: &Value) -> Response<Body> {
        Response::builder()
            .body(Body::from(serde_json::to_vec(body).expect("serializable")))
            .expect("valid response")
    }

    fn member(service: mock::Mock<Request<Body>, Response<Body>>) -> MemberAwaitility {
        MemberAwaitility::new(
            Client::new(service, "default"),
            "toolchain-member-operator",
            PollConfig::default(),
        )
    }

    #[test]
    fn test_namespace_labels() {
        let selector = namespace_labels("johnsmith", "dev");
        assert_eq!(selector[labels::OWNER], "johnsmith");
        assert_eq!(selector[labels::TYPE], "dev");
        assert_eq!(selector[labels::PROVIDER], "codeready-toolchain");
        assert!(!selector.contains_key(labels::REVISION));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_namespace_waits_until_active() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            for phase in ["Terminating", "Active"] {
                let (request, send) = handle.next_request().await.expect("service not called");
                assert_eq!(request.uri().path(), "/api/v1/namespaces");
                let query = request.uri().query().unwrap_or_default().to_string();
                assert!(query.contains("labelSelector"));
                send.send_response(respond(&json!({
                    "apiVersion": "v1",
                    "kind": "NamespaceList",
                    "metadata": {},
                    "items": [{
                        "apiVersion": "v1",
                        "kind": "Namespace",
                        "metadata": { "name": "johnsmith-dev" },
                        "status": { "phase": phase }
                    }]
                })));
            }
        });

        let ns = member(service)
            .wait_for_namespace("johnsmith", "dev", "abcde12")
            .await
            .expect("namespace active");

        assert_eq!(ns.metadata.name.as_deref(), Some("johnsmith-dev"));
        server.await.expect("mock server");
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_namespace_requires_single_match() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            for names in [vec!["johnsmith-dev", "johnsmith-dev-old"], vec!["johnsmith-dev"]] {
                let (_, send) = handle.next_request().await.expect("service not called");
                let items: Vec<Value> = names
                    .iter()
                    .map(|name| {
                        json!({
                            "apiVersion": "v1",
                            "kind": "Namespace",
                            "metadata": { "name": name },
                            "status": { "phase": "Active" }
                        })
                    })
                    .collect();
                send.send_response(respond(&json!({
                    "apiVersion": "v1",
                    "kind": "NamespaceList",
                    "metadata": {},
                    "items": items
                })));
            }
        });

        let start = tokio::time::Instant::now();
        let ns = member(service)
            .wait_for_namespace("johnsmith", "dev", "abcde12")
            .await
            .expect("single namespace");

        assert_eq!(ns.metadata.name.as_deref(), Some("johnsmith-dev"));
        assert_eq!(start.elapsed(), PollConfig::default().interval);
        server.await.expect("mock server");
    }

    #[tokio::test]
    async fn test_wait_for_role_binding_in_named_namespace() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(
                request.uri().path(),
                "/apis/rbac.authorization.k8s.io/v1/namespaces/johnsmith-dev/rolebindings/user-edit"
            );
            send.send_response(respond(&json!({
                "apiVersion": "rbac.authorization.k8s.io/v1",
                "kind": "RoleBinding",
                "metadata": { "name": "user-edit", "namespace": "johnsmith-dev" },
                "roleRef": { "apiGroup": "rbac.authorization.k8s.io", "kind": "ClusterRole", "name": "edit" },
                "subjects": [{ "kind": "User", "name": "johnsmith" }]
            })));
        });

        let binding = member(service)
            .wait_for_role_binding("johnsmith-dev", "user-edit", &[])
            .await
            .expect("role binding found");

        assert_eq!(binding.role_ref.name, "edit");
        server.await.expect("mock server");
    }

    #[tokio::test(start_paused = true)]
    async fn test_user_deletion_times_out_while_present() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        tokio::spawn(async move {
            while let Some((request, send)) = handle.next_request().await {
                assert_eq!(request.uri().path(), "/apis/user.openshift.io/v1/users/johnsmith");
                send.send_response(respond(&json!({
                    "apiVersion": "user.openshift.io/v1",
                    "kind": "User",
                    "metadata": { "name": "johnsmith" },
                    "identities": ["rhd:0b2c7e3a"]
                })));
            }
        });

        let err = member(service)
            .with_retry_options(&[
                RetryOption::Timeout(Duration::from_secs(1)),
                RetryOption::Interval(Duration::from_millis(250)),
            ])
            .wait_until_user_deleted("johnsmith")
            .await
            .expect_err("user never goes away");

        assert_eq!(err.failed_criterion(), Some("deleted"));
        let user = err.last_snapshot().expect("last snapshot kept");
        assert_eq!(user.identities, vec!["rhd:0b2c7e3a".to_string()]);
    }
}
