/**
 * Typed wait criteria, one constructor family per resource kind
 */
use super::conditions::{Condition, conditions_match, describe};
use super::crd::{
    MasterUserRecord, NSTemplateSet, NSTemplateTier, NSTemplateTierSpec, UserAccount,
    UserAccountSpec, UserAccountStatusEmbedded, UserSignup,
};
use super::openshift::{Identity, User};
use crate::wait::Criterion;
use k8s_openapi::api::core::v1::Namespace;
use k8s_openapi::api::rbac::v1::RoleBinding;

/// Criteria for the host record and the member account of one user,
/// kept apart so each list only ever sees its own resource type
#[derive(Debug, Clone, Default)]
pub struct ResourceCriteria {
    pub master_user_record: Vec<Criterion<MasterUserRecord>>,
    pub user_account: Vec<Criterion<UserAccount>>,
}

impl ResourceCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_master_user_record(mut self, criterion: Criterion<MasterUserRecord>) -> Self {
        self.master_user_record.push(criterion);
        self
    }

    #[must_use]
    pub fn with_user_account(mut self, criterion: Criterion<UserAccount>) -> Self {
        self.user_account.push(criterion);
        self
    }
}

pub fn until_user_signup_has_conditions(expected: Vec<Condition>) -> Criterion<UserSignup> {
    Criterion::new(format!("has conditions {}", describe(&expected)), move |signup: &UserSignup| {
        signup
            .status
            .as_ref()
            .is_some_and(|status| conditions_match(&status.conditions, &expected))
    })
}

pub fn until_master_user_record_has_conditions(expected: Vec<Condition>) -> Criterion<MasterUserRecord> {
    Criterion::new(format!("has conditions {}", describe(&expected)), move |mur: &MasterUserRecord| {
        mur.status
            .as_ref()
            .is_some_and(|status| conditions_match(&status.conditions, &expected))
    })
}

/// Every expected embedded account status is mirrored on the record, matched
/// by target cluster and conditions.
pub fn until_master_user_record_has_user_account_statuses(
    expected: Vec<UserAccountStatusEmbedded>,
) -> Criterion<MasterUserRecord> {
    let clusters: Vec<&str> = expected.iter().map(|s| s.target_cluster.as_str()).collect();
    let name = format!("has user account statuses for {clusters:?}");
    Criterion::new(name, move |mur: &MasterUserRecord| {
        let Some(status) = mur.status.as_ref() else {
            return false;
        };
        status.user_accounts.len() == expected.len()
            && expected.iter().all(|want| {
                status.user_accounts.iter().any(|have| {
                    have.target_cluster == want.target_cluster
                        && conditions_match(
                            &have.user_account_status.conditions,
                            &want.user_account_status.conditions,
                        )
                })
            })
    })
}

pub fn until_user_account_has_spec(expected: UserAccountSpec) -> Criterion<UserAccount> {
    Criterion::new(
        format!("has spec for user {}", expected.user_id),
        move |ua: &UserAccount| ua.spec == expected,
    )
}

pub fn until_user_account_has_conditions(expected: Vec<Condition>) -> Criterion<UserAccount> {
    Criterion::new(format!("has conditions {}", describe(&expected)), move |ua: &UserAccount| {
        ua.status
            .as_ref()
            .is_some_and(|status| conditions_match(&status.conditions, &expected))
    })
}

pub fn until_ns_template_set_has_conditions(expected: Vec<Condition>) -> Criterion<NSTemplateSet> {
    Criterion::new(format!("has conditions {}", describe(&expected)), move |set: &NSTemplateSet| {
        set.status
            .as_ref()
            .is_some_and(|status| conditions_match(&status.conditions, &expected))
    })
}

pub fn until_ns_template_tier_spec(matcher: Criterion<NSTemplateTierSpec>) -> Criterion<NSTemplateTier> {
    matcher.on("spec", |tier: &NSTemplateTier| &tier.spec)
}

/// Every namespace template of the tier is at `revision`
pub fn has_namespace_revisions(revision: &str) -> Criterion<NSTemplateTierSpec> {
    let revision = revision.to_string();
    Criterion::new(
        format!("has namespace revisions {revision}"),
        move |spec: &NSTemplateTierSpec| spec.namespaces.iter().all(|ns| ns.revision == revision),
    )
}

pub fn until_user_has_identity(identity: &str) -> Criterion<User> {
    let identity = identity.to_string();
    Criterion::new(format!("has identity {identity}"), move |user: &User| {
        user.identities.iter().any(|i| *i == identity)
    })
}

pub fn until_identity_has_user(user: &str) -> Criterion<Identity> {
    let user = user.to_string();
    Criterion::new(format!("is mapped to user {user}"), move |identity: &Identity| {
        identity.user.name.as_deref() == Some(user.as_str())
    })
}

pub fn until_namespace_is_active() -> Criterion<Namespace> {
    Criterion::new("is Active", |ns: &Namespace| {
        ns.status
            .as_ref()
            .and_then(|status| status.phase.as_deref())
            == Some("Active")
    })
}

/// Exactly one subject of `kind`/`name`, bound to role `role`
pub fn until_role_binding_has_subject(kind: &str, name: &str, role: &str) -> Criterion<RoleBinding> {
    let (kind, name, role) = (kind.to_string(), name.to_string(), role.to_string());
    Criterion::new(
        format!("binds {kind} {name} to {role}"),
        move |rb: &RoleBinding| {
            let subjects = rb.subjects.as_deref().unwrap_or_default();
            rb.role_ref.name == role
                && subjects.len() == 1
                && subjects[0].kind == kind
                && subjects[0].name == name
        },
    )
}
