#![allow(dead_code)]

use anyhow::{Context, anyhow};
use k8s_openapi::api::core::v1::Namespace;
use kube::api::Api;
use std::collections::BTreeMap;
use std::sync::Once;
use toolchain_await::awaitility::Awaitility;
use toolchain_await::toolchain::criteria::{
    has_namespace_revisions, until_master_user_record_has_user_account_statuses,
    until_ns_template_tier_spec, until_role_binding_has_subject, until_user_account_has_spec,
    until_user_has_identity,
};
use toolchain_await::toolchain::crd::{
    NSTemplateSetNamespace, NSTemplateSetSpec, UserAccountSpec, UserAccountStatusEmbedded,
};
use toolchain_await::toolchain::{ResourceCriteria, identity_name};
use toolchain_await::wait::not;
use toolchain_await::SuiteContext;

pub const BASIC_TIER: &str = "basic";
pub const NAMESPACE_TYPES: [&str; 3] = ["code", "dev", "stage"];

/// Revision the tier carries before the host operator has computed real ones
const PLACEHOLDER_REVISION: &str = "000000a";

static INIT: Once = Once::new();

pub fn init() {
    INIT.call_once(|| {
        rustls::crypto::aws_lc_rs::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "toolchain_await=info".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// Suite context for a cluster running the toolchain operators, or `None`
/// when there is no cluster or the host operator namespace is missing
pub async fn toolchain_available() -> Option<SuiteContext> {
    init();
    let suite = SuiteContext::from_env().await.ok()?;
    let host = suite.awaitility().host();
    let namespaces: Api<Namespace> = Api::all(host.client().clone());
    match namespaces.get_opt(host.namespace()).await {
        Ok(Some(_)) => Some(suite),
        _ => None,
    }
}

/// Namespace template revisions of the `basic` tier, once the host operator
/// has replaced the placeholder revisions
pub async fn get_revisions(awaitility: &Awaitility) -> anyhow::Result<BTreeMap<String, String>> {
    let tier = awaitility
        .host()
        .wait_for_ns_template_tier(
            BASIC_TIER,
            &[until_ns_template_tier_spec(not(has_namespace_revisions(
                PLACEHOLDER_REVISION,
            )))],
        )
        .await?;
    NAMESPACE_TYPES
        .iter()
        .map(|type_| {
            tier.spec
                .revision(type_)
                .map(|revision| ((*type_).to_string(), revision.to_string()))
                .ok_or_else(|| anyhow!("no revision for '{type_}' namespaces in the '{BASIC_TIER}' tier"))
        })
        .collect()
}

/// The account spec the host operator should derive for an approved signup
pub fn expected_user_account_spec(user_id: &str, revisions: &BTreeMap<String, String>) -> UserAccountSpec {
    UserAccountSpec {
        user_id: user_id.to_string(),
        disabled: false,
        ns_limit: "default".to_string(),
        ns_template_set: NSTemplateSetSpec {
            tier_name: BASIC_TIER.to_string(),
            namespaces: NAMESPACE_TYPES
                .iter()
                .map(|type_| NSTemplateSetNamespace {
                    type_: (*type_).to_string(),
                    revision: revisions.get(*type_).cloned().unwrap_or_default(),
                    template: String::new(),
                })
                .collect(),
        },
    }
}

/// Check everything provisioned for the record `mur_name`, on both clusters
pub async fn verify_resources(
    awaitility: &Awaitility,
    mur_name: &str,
    revisions: &BTreeMap<String, String>,
    criteria: ResourceCriteria,
) -> anyhow::Result<()> {
    let host = awaitility.host();
    let member = awaitility.member();

    let mur = host.wait_for_master_user_record(mur_name, &[]).await?;
    let embedded = mur
        .spec
        .user_accounts
        .first()
        .cloned()
        .context("record has no embedded user account")?;

    let mut account_criteria = criteria.user_account;
    account_criteria.push(until_user_account_has_spec(embedded.spec));
    let account = member.wait_for_user_account(mur_name, &account_criteria).await?;

    let mut record_criteria = criteria.master_user_record;
    record_criteria.push(until_master_user_record_has_user_account_statuses(vec![
        UserAccountStatusEmbedded {
            target_cluster: embedded.target_cluster,
            user_account_status: account.status.clone().unwrap_or_default(),
        },
    ]));
    host.wait_for_master_user_record(mur_name, &record_criteria).await?;

    let identity = identity_name(&account.spec.user_id);
    member
        .wait_for_user(mur_name, &[until_user_has_identity(&identity)])
        .await?;
    member.wait_for_identity(&identity, &[]).await?;
    member.wait_for_ns_tmpl_set(mur_name, &[]).await?;

    assert_eq!(revisions.len(), NAMESPACE_TYPES.len());
    for (type_, revision) in revisions {
        let namespace = member.wait_for_namespace(mur_name, type_, revision).await?;
        let namespace = namespace
            .metadata
            .name
            .context("provisioned namespace has no name")?;
        member
            .wait_for_role_binding(
                &namespace,
                "user-edit",
                &[until_role_binding_has_subject("User", mur_name, "edit")],
            )
            .await?;
    }
    Ok(())
}
