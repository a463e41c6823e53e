//! Tradfri debugging tool
//!
//! Decodes gateway payloads into models, and replays a snapshot of
//! accessories and groups through the group aggregator.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tradfri_core::{codec, IpsoObject, IpsoObjectExt, Value, WireObject};
use tradfri_devices::{Accessory, Group, Light, Scene};
use tradfri_groups::{GroupAggregator, GroupSyncConfig, MemoryStore, VirtualGroup};

#[derive(Parser)]
#[command(name = "tradfri")]
#[command(about = "Tradfri gateway debugging tool")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a wire object and show the model and its minimal payload
    Decode {
        /// Model type of the payload
        #[arg(short, long, value_enum)]
        kind: Kind,

        /// JSON payload file (stdin when omitted)
        file: Option<PathBuf>,
    },

    /// Replay a snapshot through the group aggregator and print the group states
    Groups {
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the debounce window
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// JSON file with `accessories`, `groups` and `virtualGroups`
        snapshot: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Light,
    Scene,
    Group,
    Accessory,
}

/// Gateway state as dumped by a CoAP client: raw wire objects
#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct Snapshot {
    accessories: Vec<WireObject>,
    groups: Vec<WireObject>,
    virtual_groups: Vec<VirtualGroup>,
}

/// Config file layout
#[derive(Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    groups: GroupSyncConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; stdout is reserved for output
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Decode { kind, file } => decode(kind, file.as_deref()),
        Command::Groups {
            config,
            debounce_ms,
            snapshot,
        } => {
            let mut config = match config {
                Some(path) => load_config(&path)?,
                None => GroupSyncConfig::default(),
            };
            if let Some(ms) = debounce_ms {
                config.debounce_ms = ms;
            }
            groups(config, &snapshot).await
        }
    }
}

fn read_input(file: Option<&Path>) -> Result<Vec<u8>> {
    match file {
        Some(path) => std::fs::read(path).with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn load_config(path: &Path) -> Result<GroupSyncConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: FileConfig =
        toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?;
    tracing::debug!("Loaded config from {}: {:?}", path.display(), config.groups);
    Ok(config.groups)
}

fn decode(kind: Kind, file: Option<&Path>) -> Result<()> {
    let payload = read_input(file)?;
    let obj = codec::decode(&payload).context("invalid wire payload")?;

    match kind {
        Kind::Light => show(&Light::default().parsed(&obj)),
        Kind::Scene => show(&Scene::default().parsed(&obj)),
        Kind::Group => show(&Group::default().parsed(&obj)),
        Kind::Accessory => show(&Accessory::from_wire(&obj)),
    }
}

/// Print a model and what it serializes to against the type's defaults
fn show<T: IpsoObject + Default + Debug>(model: &T) -> Result<()> {
    println!("{:#?}", model);
    let minimal = model
        .serialize_against(&T::default())
        .context("failed to serialize")?;
    println!("{}", serde_json::to_string_pretty(&minimal)?);
    Ok(())
}

async fn groups(config: GroupSyncConfig, path: &Path) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read snapshot {}", path.display()))?;
    let snapshot: Snapshot = serde_json::from_str(&text).context("invalid snapshot")?;

    let store = Arc::new(MemoryStore::new());
    let aggregator = GroupAggregator::new(store.clone(), config);

    for obj in &snapshot.groups {
        aggregator.extend_group(Group::default().parsed(obj)).await?;
    }
    for group in snapshot.virtual_groups {
        aggregator.extend_virtual_group(group).await?;
    }
    for obj in &snapshot.accessories {
        aggregator.observe_device(Accessory::from_wire(obj));
    }
    tracing::info!(
        "Replayed {} accessories and {} groups",
        snapshot.accessories.len(),
        snapshot.groups.len()
    );

    aggregator.flushed().await;

    let states: BTreeMap<String, Value> = store
        .states()
        .into_iter()
        .filter(|(id, _)| id.starts_with("G-") || id.starts_with("VG-"))
        .collect();
    println!("{}", serde_json::to_string_pretty(&states)?);
    Ok(())
}
