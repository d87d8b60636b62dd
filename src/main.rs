use anyhow::{Context, Result};
use clap::Parser;
use drawer_agent::actuator::{DrawerController, SimulatedPins};
use drawer_agent::config::{AgentConfig, Cli};
use drawer_agent::connection::LinkManager;
use drawer_agent::delay::{Delay, TokioDelay};
use drawer_agent::session::{AgentLoop, SessionAgent};
use drawer_agent::transport::{HttpTransport, TcpProbe};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level: Level = cli
        .log_level
        .parse()
        .with_context(|| format!("invalid log level: {}", cli.log_level))?;
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let config = AgentConfig::try_from(cli)?;

    info!("Drawer agent starting: {}", config.session.device_id);
    info!("  Server: {}", config.server_url);
    info!("  Drawers: {} on pins {:?}", config.drawer_pins.len(), config.drawer_pins);

    let delay: Arc<dyn Delay> = Arc::new(TokioDelay);

    // No relay driver is linked in; pins are simulated and logged
    let drawers = Arc::new(
        DrawerController::new(
            config.drawer_pins.clone(),
            Arc::new(SimulatedPins::new()),
            delay.clone(),
            config.polarity,
            config.pulse,
        )
        .context("drawer setup failed")?,
    );

    let transport = HttpTransport::new(&config.server_url, config.request_timeout)
        .context("http client setup failed")?;
    let probe = TcpProbe::new(config.server_address()?, config.request_timeout);
    let link = LinkManager::new(probe, config.link.clone(), delay.clone());

    let agent = SessionAgent::new(config.session.clone(), transport, drawers, delay);
    let mut agent_loop = AgentLoop::new(agent, link, config.poll_interval);

    if !agent_loop.startup().await {
        warn!("Startup incomplete, continuing with periodic recovery");
    }

    agent_loop
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("Drawer agent stopped");
    Ok(())
}
