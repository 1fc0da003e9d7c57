use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const CONDITION_READY: &str = "Ready";
pub const CONDITION_APPROVED: &str = "Approved";
pub const CONDITION_COMPLETE: &str = "Complete";

pub const STATUS_TRUE: &str = "True";
pub const STATUS_FALSE: &str = "False";

pub const REASON_PROVISIONED: &str = "Provisioned";
pub const REASON_PENDING_APPROVAL: &str = "PendingApproval";
pub const REASON_APPROVED_BY_ADMIN: &str = "ApprovedByAdmin";
pub const REASON_APPROVED_AUTOMATICALLY: &str = "ApprovedAutomatically";
pub const REASON_BANNED: &str = "Banned";
pub const REASON_DEACTIVATED: &str = "Deactivated";

/// Status condition as reported by the toolchain controllers
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new(type_: &str, status: &str, reason: Option<&str>) -> Self {
        Self {
            type_: type_.to_string(),
            status: status.to_string(),
            reason: reason.map(str::to_string),
            ..Self::default()
        }
    }

    /// Same type, status and reason; message only when `expected` carries one.
    /// Timestamps never take part.
    #[must_use]
    pub fn matches(&self, expected: &Self) -> bool {
        self.type_ == expected.type_
            && self.status == expected.status
            && self.reason.as_deref().unwrap_or_default()
                == expected.reason.as_deref().unwrap_or_default()
            && expected
                .message
                .as_ref()
                .is_none_or(|message| self.message.as_ref() == Some(message))
    }
}

/// Order-insensitive comparison of a condition list against the expected set
#[must_use]
pub fn conditions_match(actual: &[Condition], expected: &[Condition]) -> bool {
    actual.len() == expected.len()
        && expected
            .iter()
            .all(|want| actual.iter().any(|have| have.matches(want)))
}

/// Short `Type=Status(Reason)` rendering used in criterion names
#[must_use]
pub fn describe(conditions: &[Condition]) -> String {
    let parts: Vec<String> = conditions
        .iter()
        .map(|c| match &c.reason {
            Some(reason) => format!("{}={}({reason})", c.type_, c.status),
            None => format!("{}={}", c.type_, c.status),
        })
        .collect();
    format!("[{}]", parts.join(", "))
}

#[must_use]
pub fn provisioned() -> Vec<Condition> {
    vec![Condition::new(CONDITION_READY, STATUS_TRUE, Some(REASON_PROVISIONED))]
}

#[must_use]
pub fn pending_approval() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_APPROVED, STATUS_FALSE, Some(REASON_PENDING_APPROVAL)),
        Condition::new(CONDITION_COMPLETE, STATUS_FALSE, Some(REASON_PENDING_APPROVAL)),
    ]
}

#[must_use]
pub fn approved_by_admin() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_APPROVED, STATUS_TRUE, Some(REASON_APPROVED_BY_ADMIN)),
        Condition::new(CONDITION_COMPLETE, STATUS_TRUE, None),
    ]
}

#[must_use]
pub fn approved_automatically() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_APPROVED, STATUS_TRUE, Some(REASON_APPROVED_AUTOMATICALLY)),
        Condition::new(CONDITION_COMPLETE, STATUS_TRUE, None),
    ]
}

#[must_use]
pub fn banned() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_APPROVED, STATUS_TRUE, Some(REASON_APPROVED_AUTOMATICALLY)),
        Condition::new(CONDITION_COMPLETE, STATUS_TRUE, Some(REASON_BANNED)),
    ]
}

#[must_use]
pub fn deactivated() -> Vec<Condition> {
    vec![
        Condition::new(CONDITION_APPROVED, STATUS_TRUE, Some(REASON_APPROVED_BY_ADMIN)),
        Condition::new(CONDITION_COMPLETE, STATUS_TRUE, Some(REASON_DEACTIVATED)),
    ]
}
