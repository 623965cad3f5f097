pub mod config;
pub mod device;
pub mod engine;
pub mod persistence;
pub mod pointer;

use crate::config::EngineConfig;
use crate::device::UinputPad;
use crate::engine::EngineHandle;
use crate::pointer::EvdevPointer;
use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    setup()?;

    let config = load_config();
    info!("starting translation engine with profile: {:?}", config);

    let source = EvdevPointer::autodetect()
        .map_err(|e| eyre!("no usable pointer device: {} (input group membership?)", e))?;
    let sink = Box::new(UinputPad::new());

    let mut engine = EngineHandle::start(config, sink, Box::new(source))
        .map_err(|e| eyre!("failed to start engine: {}", e))?;

    engine.enable(true);
    info!("translation active, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;

    engine.stop().await;
    let stats = engine.stats();
    info!(
        "session over after {}s: {} movements, {} clicks, {} recoil activations",
        stats.uptime().num_seconds(),
        stats.movements,
        stats.clicks,
        stats.recoil_activations
    );
    Ok(())
}

fn load_config() -> EngineConfig {
    if let Err(e) = persistence::ensure_default_profile() {
        warn!("could not seed default profile: {}", e);
    }
    match persistence::load_profile() {
        Ok(config) => config,
        Err(e) => {
            warn!("falling back to default profile: {}", e);
            EngineConfig::default()
        }
    }
}

fn setup() -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    setup_logging_env();
    Ok(())
}

fn setup_logging_env() {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .pretty()
        .init();
}
