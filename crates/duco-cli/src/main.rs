//! Command-line interface for Duco Link.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use duco_core::config::env_vars;
use duco_core::{DucoConfig, DucoEvent};
use duco_devices::{
    create_transport, discover_topology, DucoEntity, DucoIntegration, EntityState,
};

/// Duco Link - Poll a Duco ventilation box over Modbus.
#[derive(Parser, Debug)]
#[command(name = "duco")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Action to perform.
    #[command(subcommand)]
    command: Command,

    /// Configuration file (TOML). Defaults to $DUCO_CONFIG.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Modbus gateway host.
    #[arg(long, global = true)]
    host: Option<String>,

    /// Modbus gateway port.
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Modbus slave id of the box.
    #[arg(long, global = true)]
    slave: Option<u8>,

    /// Refresh period in seconds.
    #[arg(long, global = true)]
    interval: Option<u64>,

    /// Use the built-in fake box instead of the bus.
    #[arg(long, global = true)]
    fake: bool,

    /// Verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// List the nodes attached to the box.
    Discover {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Poll the box and print entity states after every refresh.
    Poll {
        /// Number of refresh cycles to print; 0 runs until interrupted.
        #[arg(short = 'n', long, default_value_t = 1)]
        cycles: u64,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Set a number entity.
    Set {
        /// Entity unique id, e.g. master_unit_ventilation_target.
        entity: String,
        /// New value.
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Select a ventilation status.
    Select {
        /// Entity unique id, e.g. master_unit_status.
        entity: String,
        /// Status name, e.g. AUTO or MAN_HIGH.
        option: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = load_config(&args)?;

    match args.command {
        Command::Discover { json } => run_discover(&config, json).await,
        Command::Poll { cycles, json } => run_poll(&config, cycles, json).await,
        Command::Set { entity, value } => run_set(&config, &entity, value).await,
        Command::Select { entity, option } => run_select(&config, &entity, &option).await,
    }
}

fn init_logging(verbose: bool) {
    // JSON lines for container deployments
    let json_logging = env_vars::parse::<bool>(env_vars::LOG_JSON).unwrap_or(false);

    let default_level = if verbose { "duco=debug" } else { "duco=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(default_level)
            .add_directive(tracing::Level::WARN.into())
    });

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .compact()
            .with_writer(std::io::stderr)
            .init();
    }
}

/// File (flag or `DUCO_CONFIG`), then `DUCO_*` variables, then flags.
fn load_config(args: &Args) -> Result<DucoConfig> {
    let path = args
        .config
        .clone()
        .or_else(|| std::env::var(env_vars::CONFIG_PATH).ok().map(PathBuf::from));

    let mut config = match path {
        Some(path) => DucoConfig::from_file(&path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => DucoConfig::default(),
    }
    .apply_env();

    if let Some(host) = &args.host {
        config.modbus.host = host.clone();
    }
    if let Some(port) = args.port {
        config.modbus.port = port;
    }
    if let Some(slave) = args.slave {
        config.slave_id = slave;
    }
    if let Some(interval) = args.interval {
        config.update_interval_secs = interval;
    }
    if args.fake {
        config.fake = true;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

async fn setup(config: &DucoConfig) -> Result<DucoIntegration> {
    let transport = create_transport(config)?;
    match DucoIntegration::setup(transport, config).await {
        Ok(integration) => Ok(integration),
        Err(e) if e.is_not_ready() => Err(anyhow!(
            "Duco box (slave {}) not ready: {}. Check the connection and retry.",
            config.slave_id,
            e
        )),
        Err(e) => Err(e.into()),
    }
}

async fn run_discover(config: &DucoConfig, json: bool) -> Result<()> {
    let transport = create_transport(config)?;
    let nodes = discover_topology(transport.as_ref()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }
    for node in &nodes {
        let zone = node
            .zone
            .map(|zone| format!("zone {}", zone))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<16} base {:<4} {:<8} {}",
            node.kind.as_str(),
            node.base,
            zone,
            node.device_id(config.slave_id)
        );
    }
    Ok(())
}

fn print_states(states: &[EntityState], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(states)?);
        return Ok(());
    }
    for state in states {
        let value = match (&state.value, state.unit) {
            (Some(value), Some(unit)) => format!("{} {}", value, unit),
            (Some(value), None) => value.to_string(),
            (None, _) => "unknown".to_string(),
        };
        let availability = if state.available { "" } else { " (unavailable)" };
        println!("{:<40} {}{}", state.unique_id, value, availability);
    }
    Ok(())
}

async fn run_poll(config: &DucoConfig, cycles: u64, json: bool) -> Result<()> {
    let integration = setup(config).await?;
    let mut events = integration.coordinator().event_bus().refresh_events();

    print_states(&integration.states(), json)?;
    let mut printed = 1;

    while cycles == 0 || printed < cycles {
        tokio::select! {
            event = events.recv() => match event {
                Some((DucoEvent::RefreshFailed { reason, .. }, _)) => {
                    warn!("Refresh failed, showing last known values: {}", reason);
                }
                Some(_) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
        print_states(&integration.states(), json)?;
        printed += 1;
    }

    integration.unload().await;
    Ok(())
}

fn find_entity<'a>(integration: &'a DucoIntegration, unique_id: &str) -> Result<&'a DucoEntity> {
    integration.entity(unique_id).ok_or_else(|| {
        let known: Vec<&str> = integration
            .entities()
            .iter()
            .map(DucoEntity::unique_id)
            .collect();
        anyhow!("Unknown entity '{}'. Known entities: {}", unique_id, known.join(", "))
    })
}

async fn run_set(config: &DucoConfig, unique_id: &str, value: f64) -> Result<()> {
    let integration = setup(config).await?;

    let result = async {
        let number = find_entity(&integration, unique_id)?
            .as_number()
            .ok_or_else(|| anyhow!("'{}' is not a number entity", unique_id))?;
        number.set_value(value).await?;
        println!("{} set to {}", unique_id, value);
        Ok::<(), anyhow::Error>(())
    }
    .await;

    integration.unload().await;
    result
}

async fn run_select(config: &DucoConfig, unique_id: &str, option: &str) -> Result<()> {
    let integration = setup(config).await?;

    let result = async {
        let select = find_entity(&integration, unique_id)?
            .as_select()
            .ok_or_else(|| anyhow!("'{}' is not a select entity", unique_id))?;
        select.select_option(option).await?;
        println!("{} set to {}", unique_id, option.to_uppercase());
        Ok::<(), anyhow::Error>(())
    }
    .await;

    integration.unload().await;
    result
}
