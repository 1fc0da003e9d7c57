/**
 * Per-suite lifecycle: the wait context plus everything the suite created
 *
 * Objects created through a `SuiteContext` are deleted again, newest first,
 * when `cleanup` runs. Objects the controllers derive from them (records,
 * accounts, namespaces) are left for the controllers to remove.
 */
use crate::awaitility::{Awaitility, AwaitilityConfig};
use crate::error::Result;
use crate::k8s::is_not_found;
use crate::toolchain::{BannedUser, UserSignup};
use futures::future::BoxFuture;
use kube::api::{Api, DeleteParams, PostParams};
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Mutex;
use tracing::{debug, info, warn};

type Deleter = Box<dyn FnOnce() -> BoxFuture<'static, std::result::Result<(), kube::Error>> + Send>;

struct Created {
    kind: String,
    name: String,
    delete: Deleter,
}

pub struct SuiteContext {
    awaitility: Awaitility,
    created: Mutex<Vec<Created>>,
}

impl SuiteContext {
    pub fn new(awaitility: Awaitility) -> Self {
        Self {
            awaitility,
            created: Mutex::new(Vec::new()),
        }
    }

    /// Context for the clusters configured in the environment
    ///
    /// # Errors
    ///
    /// Returns an error if the host or member client cannot be created
    pub async fn from_env() -> Result<Self> {
        let config = AwaitilityConfig::from_env();
        Ok(Self::new(Awaitility::connect(&config).await?))
    }

    #[must_use]
    pub const fn awaitility(&self) -> &Awaitility {
        &self.awaitility
    }

    /// Create `object` through `api` and schedule its deletion
    ///
    /// # Errors
    ///
    /// Returns the API error if the object cannot be created
    pub async fn create<K>(&self, api: &Api<K>, object: &K) -> Result<K>
    where
        K: Resource<DynamicType = ()> + Clone + Serialize + DeserializeOwned + Debug + Send + Sync + 'static,
    {
        let created = api.create(&PostParams::default(), object).await?;
        self.track(api.clone(), &created.name_any());
        Ok(created)
    }

    /// Schedule deletion of an object created outside this context, such as a
    /// signup the registration service made
    pub fn track<K>(&self, api: Api<K>, name: &str)
    where
        K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
    {
        let owned = name.to_string();
        let delete: Deleter = Box::new(move || {
            Box::pin(async move {
                api.delete(&owned, &DeleteParams::background()).await?;
                Ok(())
            })
        });
        debug!("📌 Tracking {} {}", K::kind(&()), name);
        self.lock().push(Created {
            kind: K::kind(&()).to_string(),
            name: name.to_string(),
            delete,
        });
    }

    /// Number of objects waiting for cleanup
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Create an unapproved `UserSignup` for `username` in the host namespace
    ///
    /// # Errors
    ///
    /// Returns the API error if the signup cannot be created
    pub async fn create_user_signup(&self, username: &str, email: &str, approved: bool) -> Result<UserSignup> {
        let host = self.awaitility.host();
        let mut signup = UserSignup::for_user(host.namespace(), username, email);
        signup.spec.approved = approved;
        let created = self.create(&host.api::<UserSignup>(), &signup).await?;
        info!(
            "📝 Created UserSignup {} for username '{}'",
            created.name_any(),
            username
        );
        Ok(created)
    }

    /// Ban `email` on the host cluster
    ///
    /// # Errors
    ///
    /// Returns the API error if the ban cannot be created
    pub async fn create_banned_user(&self, email: &str) -> Result<BannedUser> {
        let host = self.awaitility.host();
        let banned = BannedUser::for_email(host.namespace(), email);
        self.create(&host.api::<BannedUser>(), &banned).await
    }

    /// Delete every tracked object, newest first.
    ///
    /// Objects already gone are skipped. Other failures are logged and do not
    /// stop the remaining deletions. Returns how many objects were deleted.
    pub async fn cleanup(&self) -> usize {
        let created = std::mem::take(&mut *self.lock());
        let mut deleted = 0;
        for item in created.into_iter().rev() {
            match (item.delete)().await {
                Ok(()) => {
                    debug!("🗑️ Deleted {} {}", item.kind, item.name);
                    deleted += 1;
                }
                Err(e) if is_not_found(&e) => debug!("{} {} already gone", item.kind, item.name),
                Err(e) => warn!("⚠️  Failed to delete {} {}: {}", item.kind, item.name, e),
            }
        }
        info!("🧹 Cleanup removed {} object(s)", deleted);
        deleted
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Created>> {
        self.created
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::http::{Method, Request, Response};
    use k8s_openapi::api::core::v1::Namespace;
    use k8s_openapi::serde_json::{self, Value, json};
    use kube::Client;
    use kube::client::Body;
    use tower_test::mock;

    fn respond(status: u16, body: &Value) -> Response<Body> {
        Response::builder()
            .status(status)
            .body(Body::from(serde_json::to_vec(body).expect("serializable")))
            .expect("valid response")
    }

    fn context(client: Client) -> SuiteContext {
        SuiteContext::new(Awaitility::new(
            client.clone(),
            client,
            &AwaitilityConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_cleanup_deletes_newest_first_and_skips_missing() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            let mut seen = Vec::new();
            for _ in 0..2 {
                let (request, send) = handle.next_request().await.expect("service not called");
                assert_eq!(request.method(), Method::DELETE);
                let path = request.uri().path().to_string();
                if path.ends_with("/first") {
                    send.send_response(respond(
                        404,
                        &json!({
                            "apiVersion": "v1",
                            "kind": "Status",
                            "status": "Failure",
                            "reason": "NotFound",
                            "message": "namespaces \"first\" not found",
                            "code": 404
                        }),
                    ));
                } else {
                    send.send_response(respond(
                        200,
                        &json!({
                            "apiVersion": "v1",
                            "kind": "Namespace",
                            "metadata": { "name": "second" }
                        }),
                    ));
                }
                seen.push(path);
            }
            seen
        });

        let client = Client::new(service, "default");
        let suite = context(client.clone());
        let api: Api<Namespace> = Api::all(client);
        suite.track(api.clone(), "first");
        suite.track(api, "second");
        assert_eq!(suite.tracked(), 2);

        assert_eq!(suite.cleanup().await, 1);
        assert_eq!(suite.tracked(), 0);

        let seen = server.await.expect("mock server");
        assert_eq!(seen, vec!["/api/v1/namespaces/second", "/api/v1/namespaces/first"]);
    }

    #[tokio::test]
    async fn test_create_user_signup_is_tracked() {
        let (service, mut handle) = mock::pair::<Request<Body>, Response<Body>>();
        let server = tokio::spawn(async move {
            let (request, send) = handle.next_request().await.expect("service not called");
            assert_eq!(request.method(), Method::POST);
            assert_eq!(
                request.uri().path(),
                "/apis/toolchain.dev.openshift.com/v1alpha1/namespaces/toolchain-host-operator/usersignups"
            );
            send.send_response(respond(
                201,
                &json!({
                    "apiVersion": "toolchain.dev.openshift.com/v1alpha1",
                    "kind": "UserSignup",
                    "metadata": { "name": "0b2c7e3a", "namespace": "toolchain-host-operator" },
                    "spec": { "username": "johnsmith", "approved": true }
                }),
            ));
        });

        let suite = context(Client::new(service, "default"));
        let signup = suite
            .create_user_signup("johnsmith", "john@example.com", true)
            .await
            .expect("created");

        assert_eq!(signup.name_any(), "0b2c7e3a");
        assert!(signup.spec.approved);
        assert_eq!(suite.tracked(), 1);
        server.await.expect("mock server");
    }
}
