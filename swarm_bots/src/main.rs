//! Spawn SmartFox load bots described by a JSON run document.
//!
//! All bots share one single-threaded event loop. The process keeps running
//! after the last bot is spawned until it is interrupted.

mod logging;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Error};
use ctrlc::set_handler;
use log::info;
use pico_args::Arguments;
use sfs_swarm::{
    Orchestrator, SfsClientFactory, SwarmConfig,
    config::{DEFAULT_CONFIG_FILE, config_dir},
    net::Transport,
    proxy::{ProxySelector, resolve_proxy_list, resolve_rotate_every},
};

const HELP: &str = "\
Spawn simulated SmartFox clients against a game server

USAGE:
  swarm_bots [OPTIONS]

OPTIONS:
  --config     PATH        Run document  [default: bots.json]
  --bots       N           Override botCount from the run document

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  RUST_LOG                 Log filter  [default: info]
  HTTPS_PROXY, HTTP_PROXY  Proxy used when the run document configures none
  (A .env file in the working directory is loaded first)
";

struct Args {
    config: PathBuf,
    bots: Option<usize>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        config: pargs
            .opt_value_from_str("--config")?
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE)),
        bots: pargs.opt_value_from_str("--bots")?,
    };

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let mut config = SwarmConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if let Some(bots) = args.bots {
        config.bot_count = bots;
    }
    if config.api_file.is_some() {
        info!("apiFile is ignored; the SmartFox client is built in");
    }

    let endpoints = resolve_proxy_list(&config.proxy_sources(), &config_dir(&args.config));
    let rotate_every = resolve_rotate_every(config.proxy_rotate_every.as_ref());
    let selector = ProxySelector::new(endpoints, rotate_every)
        .context("Proxy configured but cannot be routed")?
        .map(Arc::new);

    match &selector {
        Some(selector) => info!(
            "Using {} proxies, rotating every {} connections",
            selector.endpoints().len(),
            selector.rotate_every()
        ),
        None => info!("No proxy configured, connecting directly"),
    }

    let factory = SfsClientFactory::new(
        Transport::new(selector.clone()),
        config.websocket_path.clone(),
    );
    let orchestrator = Orchestrator::new(config, selector, factory);
    let _bots = orchestrator.spawn_all().await;

    info!("Bots running; press Ctrl-C to stop");
    std::future::pending::<()>().await;
    Ok(())
}
