//! `ledgerly-nav`: resolve the persisted session and print what it may see.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;

use ledgerly_auth::Feature;
use ledgerly_client::{
    AccessProvider, ClientConfig, FileStorage, HttpCapabilitySource, RecordingNotifier,
};

/// Inspect the navigation available to the persisted Ledgerly session
#[derive(Parser, Debug)]
#[command(name = "ledgerly-nav")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the principal, capabilities and visible navigation (default)
    Nav,
    /// Explain why a feature is shown or hidden
    Explain {
        /// Feature key (e.g. `Users`) or route (e.g. `/users`)
        feature: String,
    },
    /// Clear the persisted session
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_format = ClientConfig::log_format_from_env().context("invalid configuration")?;
    ledgerly_observability::init_with(log_format);
    let config = ClientConfig::from_env().context("invalid configuration")?;

    let session_path = match &config.session_file {
        Some(path) => path.clone(),
        None => FileStorage::default_path()?,
    };
    let storage = Arc::new(
        FileStorage::open(&session_path)
            .with_context(|| format!("failed to open session storage at {:?}", session_path))?,
    );
    let source = Arc::new(HttpCapabilitySource::new(
        config.api_url.clone(),
        config.fetch_timeout,
    )?);
    let notifier = Arc::new(RecordingNotifier::new());
    let provider = AccessProvider::mount(storage, source, notifier.clone(), config.ordering);

    match cli.command.unwrap_or(Command::Nav) {
        Command::Nav => {
            let phase = provider.start().await?;
            let snapshot = provider.capabilities();
            let menu: Vec<_> = provider
                .visible_features()
                .into_iter()
                .map(|f| json!({ "feature": f.key(), "route": f.route() }))
                .collect();
            let out = json!({
                "phase": phase,
                "principal": provider.principal(),
                "capabilities": snapshot,
                "navigation": menu,
                "notifications": notifier.take(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Explain { feature: key } => {
            let feature = Feature::from_key(&key)
                .or_else(|| Feature::from_route(&key))
                .with_context(|| format!("unknown feature '{key}'"))?;
            provider.start().await?;
            let explanation = provider.explain(feature);
            println!("{}", serde_json::to_string_pretty(&explanation)?);
        }
        Command::Logout => {
            provider
                .logout()
                .with_context(|| format!("failed to clear session at {:?}", session_path))?;
            tracing::info!(path = ?session_path, "session cleared");
        }
    }

    Ok(())
}
