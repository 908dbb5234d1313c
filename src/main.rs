use std::{env, process::ExitCode};

use crypto_portfolio::{
    adapters::config::{logging_config::LoggingConfig, AppConfig},
    cli::cli_adapter::{self, CliAdapter},
    prettyprint::PrettyFormatter,
};
use tracing::{error, info, instrument};
use tracing_subscriber::{
    filter::Targets, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry,
};

#[tokio::main]
#[instrument]
async fn main() -> ExitCode {
    let config = AppConfig::load();

    let log_file = match &config {
        Ok(config) => config.logging.file.to_string(),
        Err(_) => LoggingConfig::default().file.to_string(),
    };
    if let Err(e) = setup_tracing(&log_file) {
        eprintln!("Failed to set up logging to '{log_file}': {e}");
        return ExitCode::FAILURE;
    }
    setup_panic_hook();

    let args: Vec<String> = env::args().collect();
    let command = match cli_adapter::parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            error!("❌ {e}");
            eprintln!("{}", cli_adapter::USAGE);
            return ExitCode::from(2);
        }
    };

    let config = match config {
        Ok(config) => config,
        Err(report) => {
            error!("❌ Configuration: {:?}", report);
            return ExitCode::from(cli_adapter::exit_code(&report));
        }
    };

    info!("Starting crypto-portfolio ({:?})", command);

    let result = match CliAdapter::from_config(&config).await {
        Ok(adapter) => adapter.handle(command).await,
        Err(report) => Err(report),
    };

    match result {
        Ok(message) => {
            info!("{message}");
            ExitCode::SUCCESS
        }
        Err(report) => {
            error!("❌ crypto-portfolio failed: {:?}", report);
            ExitCode::from(cli_adapter::exit_code(&report))
        }
    }
}

fn setup_tracing(log_file: &str) -> Result<(), Box<dyn std::error::Error>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(true))
        .with_writer(std::io::stderr);

    let log_file_layer = tracing_subscriber::fmt::layer()
        .event_format(PrettyFormatter::new(false))
        .with_writer(std::fs::File::create(log_file)?)
        .with_ansi(false);

    // RUST_LOG replaces the default filter when set.
    let env_filter = EnvFilter::try_from_default_env().ok();
    let targets = env_filter
        .is_none()
        .then(|| Targets::new().with_target("crypto_portfolio", tracing::Level::TRACE));

    Registry::default()
        .with(env_filter)
        .with(targets)
        .with(log_file_layer)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

fn setup_panic_hook() {
    tracing::trace!("Setting panic hook");
    std::panic::set_hook(Box::new(|info| {
        tracing::error!("panic: {info}");
    }));
}
