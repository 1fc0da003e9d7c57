pub mod conditions;
pub mod crd;
pub mod criteria;
pub mod openshift;

pub use conditions::Condition;
pub use crd::{
    BannedUser, MasterUserRecord, NSTemplateSet, NSTemplateTier, UserAccount, UserSignup,
    email_hash,
};
pub use criteria::ResourceCriteria;
pub use openshift::{Identity, User, identity_name};

/// Label keys the member cluster puts on every provisioned user namespace
pub mod labels {
    pub const OWNER: &str = "toolchain.dev.openshift.com/owner";
    pub const TYPE: &str = "toolchain.dev.openshift.com/type";
    pub const REVISION: &str = "toolchain.dev.openshift.com/revision";
    pub const PROVIDER: &str = "toolchain.dev.openshift.com/provider";

    /// Value of [`PROVIDER`] on objects created by the toolchain operators
    pub const PROVIDER_VALUE: &str = "codeready-toolchain";
}
