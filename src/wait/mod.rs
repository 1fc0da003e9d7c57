pub mod config;
pub mod criterion;
pub mod fetcher;
pub mod poller;

pub use config::{PollConfig, RetryOption};
pub use criterion::{Criterion, not};
pub use fetcher::{FetchError, ResourceFetcher, ResourceKey};
pub use poller::{WaitError, wait_for, wait_until_deleted};
