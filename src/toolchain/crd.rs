/**
 * Toolchain custom resources observed by the end-to-end suite
 *
 * Only the fields the suite reads or writes are modelled; everything else the
 * controllers put on these objects is ignored on deserialization.
 */
use super::conditions::Condition;
use kube::CustomResource;
use kube::api::ObjectMeta;
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const GROUP: &str = "toolchain.dev.openshift.com";

/// Annotation on a `UserSignup` carrying the user's email address
pub const USER_EMAIL_ANNOTATION: &str = "toolchain.dev.openshift.com/user-email";

/// Label on `UserSignup` and `BannedUser` objects carrying the md5 of the email
pub const EMAIL_HASH_LABEL: &str = "toolchain.dev.openshift.com/email-hash";

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "UserSignup",
    namespaced,
    status = "UserSignupStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct UserSignupSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_cluster: Option<String>,
    #[serde(default)]
    pub approved: bool,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default)]
    pub deactivated: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserSignupStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compliant_username: Option<String>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "MasterUserRecord",
    namespaced,
    status = "MasterUserRecordStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct MasterUserRecordSpec {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub deprovisioned: bool,
    #[serde(default)]
    pub user_accounts: Vec<UserAccountEmbedded>,
}

/// A `UserAccount` the record wants provisioned on one member cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountEmbedded {
    pub target_cluster: String,
    pub spec: UserAccountSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MasterUserRecordStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub user_accounts: Vec<UserAccountStatusEmbedded>,
}

/// Status of a member-cluster `UserAccount` as mirrored on the record
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountStatusEmbedded {
    pub target_cluster: String,
    #[serde(flatten)]
    pub user_account_status: UserAccountStatus,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "UserAccount",
    namespaced,
    status = "UserAccountStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct UserAccountSpec {
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub ns_limit: String,
    #[serde(default)]
    pub ns_template_set: NSTemplateSetSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserAccountStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "NSTemplateSet",
    namespaced,
    status = "NSTemplateSetStatus",
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct NSTemplateSetSpec {
    #[serde(default)]
    pub tier_name: String,
    #[serde(default)]
    pub namespaces: Vec<NSTemplateSetNamespace>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NSTemplateSetNamespace {
    #[serde(rename = "type")]
    pub type_: String,
    pub revision: String,
    /// Always empty on user-facing objects; the controller fills it from the tier
    #[serde(default)]
    pub template: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NSTemplateSetStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "NSTemplateTier",
    namespaced,
    schema = "disabled"
)]
pub struct NSTemplateTierSpec {
    #[serde(default)]
    pub namespaces: Vec<NSTemplateTierNamespace>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct NSTemplateTierNamespace {
    #[serde(rename = "type")]
    pub type_: String,
    pub revision: String,
    #[serde(default)]
    pub template: String,
}

impl NSTemplateTierSpec {
    /// Revision of the namespace template of the given type
    #[must_use]
    pub fn revision(&self, type_: &str) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|ns| ns.type_ == type_)
            .map(|ns| ns.revision.as_str())
    }
}

#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[kube(
    group = "toolchain.dev.openshift.com",
    version = "v1alpha1",
    kind = "BannedUser",
    namespaced,
    schema = "disabled"
)]
pub struct BannedUserSpec {
    pub email: String,
}

/// Hex-encoded md5 of an email address, as used in the email-hash labels
#[must_use]
pub fn email_hash(email: &str) -> String {
    Md5::digest(email.as_bytes())
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

impl UserSignup {
    /// Signup for `username` in the host namespace, named by a fresh UUID
    #[must_use]
    pub fn for_user(namespace: &str, username: &str, email: &str) -> Self {
        let metadata = ObjectMeta {
            name: Some(uuid::Uuid::new_v4().to_string()),
            namespace: Some(namespace.to_string()),
            annotations: Some(BTreeMap::from([(
                USER_EMAIL_ANNOTATION.to_string(),
                email.to_string(),
            )])),
            labels: Some(BTreeMap::from([(
                EMAIL_HASH_LABEL.to_string(),
                email_hash(email),
            )])),
            ..ObjectMeta::default()
        };
        Self {
            metadata,
            spec: UserSignupSpec {
                username: username.to_string(),
                ..UserSignupSpec::default()
            },
            status: None,
        }
    }

    /// Email address recorded on the signup, if any
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(USER_EMAIL_ANNOTATION))
            .map(String::as_str)
    }
}

impl BannedUser {
    /// Ban `email` from the host namespace
    #[must_use]
    pub fn for_email(namespace: &str, email: &str) -> Self {
        let metadata = ObjectMeta {
            name: Some(uuid::Uuid::new_v4().to_string()),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([(
                EMAIL_HASH_LABEL.to_string(),
                email_hash(email),
            )])),
            ..ObjectMeta::default()
        };
        Self {
            metadata,
            spec: BannedUserSpec {
                email: email.to_string(),
            },
        }
    }
}
