pub mod client;
pub mod fetcher;

pub use fetcher::{KubeFetcher, LabelledFetcher, classify, is_not_found};

/// Default user agent - automatically uses the package version
///
/// Can be overridden with the `TOOLCHAIN_AWAIT_USER_AGENT` environment variable.
pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Env var overriding [`USER_AGENT`]
pub const USER_AGENT_ENV: &str = "TOOLCHAIN_AWAIT_USER_AGENT";

/// User agent from the environment, falling back to [`USER_AGENT`]
#[must_use]
pub fn user_agent() -> String {
    std::env::var(USER_AGENT_ENV).unwrap_or_else(|_| USER_AGENT.to_string())
}
