//! Demonstration binary for the Data Hub core (spec §10.4): wires a
//! [`DataHub`] up with a static identity table and a config file, then
//! runs one end-to-end push/observe/dump cycle so the library can be
//! exercised without a real IPC transport in front of it. The actual
//! framing layer that would sit here is an external collaborator (spec
//! §1) this crate never implements.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use datahub_core::DataHub;
use datahub_domain::value::DataType;
use datahub_domain::HubConfig;
use datahub_sessions::{SessionId, StaticIdentity};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "datahub-demo", about = "Data Hub core demonstration binary")]
struct Cli {
    /// Path to a TOML config file (spec §10.3). Missing sections fall
    /// back to their defaults; omit entirely to run with all defaults.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let session = SessionId::new("demo-producer");
    let identity = StaticIdentity::new().with(session.clone(), "demo".to_string());
    let hub = DataHub::new(Box::new(identity), config);

    hub.create_input(&session, "temp", DataType::Numeric, "C")
        .context("creating /app/demo/temp")?;
    hub.configure_observation("/obs/temp_history", "/app/demo/temp", 16)
        .context("configuring /obs/temp_history")?;

    for (timestamp, value) in [(1.0, 21.0), (2.0, 21.4), (3.0, 22.1)] {
        hub.push_numeric(&session, "temp", value, timestamp);
    }

    if let Some(reason) = hub.take_kill_reason(&session) {
        anyhow::bail!("demo session was terminated: {reason}");
    }

    let dump = hub
        .read_buffer_json(&session, "/obs/temp_history", f64::NAN, None)
        .context("reading /obs/temp_history")?;
    println!("{}", serde_json::to_string_pretty(&dump)?);

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,datahub_core=debug")),
        )
        .json()
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<HubConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            HubConfig::from_toml(&text).with_context(|| format!("parsing config file {}", path.display()))
        }
        None => Ok(HubConfig::default()),
    }
}
