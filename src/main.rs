use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use toolchain_await::AwaitilityConfig;
use toolchain_await::dynamic::{ResourceKind, parse_condition, until_has_conditions};
use toolchain_await::k8s::{client, user_agent};
use toolchain_await::registration::RegistrationClient;
use toolchain_await::toolchain::Condition;
use toolchain_await::wait::{PollConfig, RetryOption, wait_for, wait_until_deleted};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Wait for toolchain resources to converge, or start a signup
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Wait until a resource exists and reports the given conditions
    Wait {
        #[command(flatten)]
        target: Target,

        /// Condition the resource must report, as Type=Status; repeatable
        #[arg(short, long = "condition", value_parser = parse_condition_arg)]
        conditions: Vec<Condition>,
    },

    /// Wait until a resource is gone
    WaitDeleted {
        #[command(flatten)]
        target: Target,
    },

    /// Post a signup request to the registration service
    Signup {
        /// Base URL of the registration service
        #[arg(long, env = "REGISTRATION_SERVICE_URL")]
        url: String,

        /// Signed bearer token
        #[arg(long, conflicts_with = "token_file", required_unless_present = "token_file")]
        token: Option<String>,

        /// File holding the signed bearer token
        #[arg(long)]
        token_file: Option<PathBuf>,
    },
}

#[derive(Args, Debug)]
struct Target {
    /// Kind of resource to wait on
    #[arg(short, long, value_enum)]
    kind: ResourceKind,

    /// Name of the resource
    #[arg(long)]
    name: String,

    /// Namespace, defaulting to the host or member operator namespace of the kind
    #[arg(short, long)]
    namespace: Option<String>,

    /// Give up after this many seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Pause between polls, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,
}

impl Target {
    fn poll_config(&self, defaults: PollConfig) -> PollConfig {
        let mut options = Vec::new();
        if let Some(secs) = self.timeout {
            options.push(RetryOption::Timeout(Duration::from_secs(secs)));
        }
        if let Some(millis) = self.interval_ms {
            options.push(RetryOption::Interval(Duration::from_millis(millis)));
        }
        defaults.with_retry_options(&options)
    }
}

fn parse_condition_arg(raw: &str) -> Result<Condition, String> {
    parse_condition(raw).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = rustls::crypto::aws_lc_rs::default_provider().install_default() {
        bail!("failed to install the TLS crypto provider: {e:?}");
    }

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = AwaitilityConfig::from_env();

    match cli.command {
        Command::Wait { target, conditions } => {
            let key = target.kind.key(&target.name, target.namespace.as_deref(), &config)?;
            let client = client::new(Some(&user_agent())).await?;
            let fetcher = target.kind.fetcher(client, &key);
            let criteria = if conditions.is_empty() {
                Vec::new()
            } else {
                vec![until_has_conditions(conditions)]
            };
            let object = wait_for(&fetcher, &key, &criteria, target.poll_config(config.poll))
                .await
                .with_context(|| format!("waiting for {:?} {key}", target.kind))?;
            info!(
                "✅ {:?} {} is ready (resourceVersion {})",
                target.kind,
                key,
                object.metadata.resource_version.as_deref().unwrap_or("-")
            );
        }
        Command::WaitDeleted { target } => {
            let key = target.kind.key(&target.name, target.namespace.as_deref(), &config)?;
            let client = client::new(Some(&user_agent())).await?;
            let fetcher = target.kind.fetcher(client, &key);
            wait_until_deleted(&fetcher, &key, target.poll_config(config.poll))
                .await
                .with_context(|| format!("waiting for {:?} {key} to be deleted", target.kind))?;
        }
        Command::Signup {
            url,
            token,
            token_file,
        } => {
            let token = match (token, token_file) {
                (Some(token), _) => token,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading token from {}", path.display()))?
                    .trim()
                    .to_string(),
                (None, None) => bail!("either --token or --token-file is required"),
            };
            let status = RegistrationClient::new(&url)?.register(&token).await?;
            println!("{}", status.as_u16());
            if !status.is_success() {
                bail!("signup rejected with {status}");
            }
        }
    }

    Ok(())
}
