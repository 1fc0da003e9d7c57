//! Eventual-consistency wait helpers for end-to-end tests of the toolchain
//! signup and provisioning controllers.
//!
//! The core is [`wait::wait_for`]: fetch a resource until every criterion
//! holds, a fetch fails for good, or the timeout elapses. [`awaitility`]
//! binds it to the host and member clusters, and [`suite`] tracks what a test
//! suite created so it can be removed afterwards.

pub mod awaitility;
pub mod dynamic;
pub mod error;
pub mod k8s;
pub mod registration;
pub mod suite;
pub mod token;
pub mod toolchain;
pub mod wait;

pub use awaitility::{Awaitility, AwaitilityConfig};
pub use error::{Error, Result};
pub use suite::SuiteContext;
