// Client creation with custom user-agent support for kube 2.x
use crate::error::Result as TaResult;
use hyper::http::{HeaderName, HeaderValue};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Connect timeout applied to clients built from an explicit kubeconfig
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// Read timeout applied to clients built from an explicit kubeconfig
pub const READ_TIMEOUT_SECS: u64 = 30;

/// Add a user-agent header to `config`, skipping values that are not valid
/// header text.
pub fn add_user_agent_header(config: &mut Config, custom_user_agent: Option<&str>) {
    if let Some(user_agent) = custom_user_agent {
        match HeaderValue::from_str(user_agent) {
            Ok(header_value) => config
                .headers
                .push((HeaderName::from_static("user-agent"), header_value)),
            Err(e) => warn!("⚠️  Ignoring invalid user agent {:?}: {}", user_agent, e),
        }
    }
}

/// Create a new k8s client from the ambient configuration (in-cluster or
/// `KUBECONFIG`)
///
/// # Errors
///
/// Will return `Err` if no configuration can be inferred
pub async fn new(custom_user_agent: Option<&str>) -> TaResult<Client> {
    let mut config = Config::infer().await?;
    add_user_agent_header(&mut config, custom_user_agent);
    let client = Client::try_from(config)?;
    Ok(client)
}

/// Create a k8s client for the cluster described by the kubeconfig at `path`
///
/// Used when the member cluster is not the one `KUBECONFIG` points at.
///
/// # Errors
///
/// Will return `Err` if the file cannot be read or describes no usable context
pub async fn from_kubeconfig(path: &Path, custom_user_agent: Option<&str>) -> TaResult<Client> {
    debug!("📄 Loading kubeconfig from {}", path.display());
    let kubeconfig = Kubeconfig::read_from(path)?;
    let mut config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    config.connect_timeout = Some(Duration::from_secs(CONNECT_TIMEOUT_SECS));
    config.read_timeout = Some(Duration::from_secs(READ_TIMEOUT_SECS));
    add_user_agent_header(&mut config, custom_user_agent);
    let client = Client::try_from(config)?;
    Ok(client)
}
