mod bridge;
mod clear;
mod cli;
mod config;
mod error;
mod mqtt;
mod save;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use myuplink_api::{
    ApiClient, CredentialStore, MYUPLINK_API_BASE, Session, TokenStore, TransportConfig,
    check_prerequisites, ping,
};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::mqtt::MqttPublisher;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(&cli.global);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(global: &GlobalOpts) {
    let filter = if global.silent {
        "warn"
    } else if global.debug {
        "debug"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<(), BridgeError> {
    let mut config = BridgeConfig::load()?;
    if let Some(poll) = cli.global.poll {
        config.poll_interval = poll;
    }

    if cli.global.show_config {
        print!("{}", config.render());
        println!("\n# config file: {}", config::config_path().display());
        return Ok(());
    }

    if let Some(Command::Clear(args)) = &cli.command {
        return clear::run(&config, args).await;
    }

    info!("myuplink2mqtt {}", env!("CARGO_PKG_VERSION"));

    // Prerequisites are checked before any network I/O so a missing
    // credential names its remedy instead of surfacing as a 401.
    let credential_store = CredentialStore::default();
    let token_store = TokenStore::default();
    let (credentials, token) = check_prerequisites(&credential_store, &token_store)
        .map_err(|source| BridgeError::Prerequisites { source })?;
    if token.is_expired() {
        debug!("access token is stale, it will be refreshed on the first call");
    }

    let transport = TransportConfig::default();
    match ping(MYUPLINK_API_BASE, &transport).await {
        Ok(true) => debug!("myUplink API is reachable"),
        Ok(false) => warn!("myUplink API did not answer the ping probe, continuing anyway"),
        Err(e) => warn!("ping probe failed: {e}"),
    }

    let session = Session::new(MYUPLINK_API_BASE, credentials, token, token_store, &transport)?;
    let client = ApiClient::new(session);

    if let Some(file) = &cli.global.save {
        return save::run(&client, file).await;
    }

    if cli.global.debug {
        info!("debug mode: MQTT publishing is a dry run");
        return bridge::run(&client, &mqtt::DryRunSink, &config, cli.global.once).await;
    }

    let publisher = MqttPublisher::connect(&config, "myuplink2mqtt").await?;
    let result = bridge::run(&client, &publisher, &config, cli.global.once).await;
    if let Err(e) = publisher.disconnect().await {
        debug!("disconnect after shutdown: {e}");
    }
    result
}
