// # observerd - Observer station daemon
//
// Thin integration layer only: reads configuration, initializes
// tracing and the runtime, starts the driver, and prints the records
// it yields. All discovery, polling, and retry logic lives in
// observer-core.
//
// ## Configuration
//
// Environment variables, overridden by CLI flags:
//
// - `OBSERVER_HOST`: interface address to listen on (default: any)
// - `OBSERVER_PORT`: listen port (default 6500)
// - `OBSERVER_POLL_INTERVAL`: poll cadence in seconds (default 10)
// - `OBSERVER_TIMEOUT`: socket timeout in seconds (default 15)
// - `OBSERVER_RETRY_WAIT`: cooldown between cycles in seconds (default 5)
// - `OBSERVER_MAX_TRIES`: accepted, currently inert (default 3)
// - `OBSERVER_MODEL`: hardware label (default WS1001)
// - `OBSERVER_LOG_LEVEL`: trace|debug|info|warn|error (default info)

use anyhow::{Context, Result};
use clap::Parser;
use observer_core::{ObserverDriver, StationConfig};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios, following systemd
/// conventions.
#[derive(Debug, Clone, Copy)]
enum ObserverExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ObserverExitCode> for ExitCode {
    fn from(code: ObserverExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Collect data from an Observer weather station by polling over the
/// network.
#[derive(Debug, Parser)]
#[command(name = "observerd", version, about)]
struct Cli {
    /// IP address of the interface on which to listen
    #[arg(long)]
    host: Option<String>,

    /// Port on which the daemon should listen
    #[arg(long)]
    port: Option<u16>,

    /// Display diagnostic information while running
    #[arg(long)]
    debug: bool,

    /// Decode a captured response frame from FILE, print the fields,
    /// and exit
    #[arg(long, value_name = "FILE")]
    test_decode: Option<PathBuf>,
}

/// Read one optional numeric environment variable, failing fast on a
/// value that does not parse.
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .parse()
                .with_context(|| format!("{name} must be numeric, got '{raw}'"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

/// Assemble the station configuration from environment variables and
/// CLI flag overrides.
fn load_config(cli: &Cli) -> Result<StationConfig> {
    let mut config = StationConfig::new();
    if let Ok(host) = env::var("OBSERVER_HOST") {
        config.host = host;
    }
    if let Some(port) = env_parse("OBSERVER_PORT")? {
        config.port = port;
    }
    if let Some(poll_interval) = env_parse("OBSERVER_POLL_INTERVAL")? {
        config.poll_interval = poll_interval;
    }
    if let Some(timeout) = env_parse("OBSERVER_TIMEOUT")? {
        config.timeout = timeout;
    }
    if let Some(retry_wait) = env_parse("OBSERVER_RETRY_WAIT")? {
        config.retry_wait = retry_wait;
    }
    if let Some(max_tries) = env_parse("OBSERVER_MAX_TRIES")? {
        config.max_tries = max_tries;
    }
    if let Ok(model) = env::var("OBSERVER_MODEL") {
        config.model = model;
    }

    if let Some(ref host) = cli.host {
        config.host = host.clone();
    }
    if let Some(port) = cli.port {
        config.port = port;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Offline decode-test mode: no sockets, no runtime
    if let Some(ref path) = cli.test_decode {
        return match test_decode(path) {
            Ok(()) => ObserverExitCode::CleanShutdown.into(),
            Err(e) => {
                eprintln!("decode test failed: {e}");
                ObserverExitCode::ConfigError.into()
            }
        };
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ObserverExitCode::ConfigError.into();
        }
    };

    let log_level = if cli.debug {
        Level::DEBUG
    } else {
        match env::var("OBSERVER_LOG_LEVEL")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return ObserverExitCode::ConfigError.into();
    }

    info!("starting observerd");
    info!(
        host = %if config.host.is_empty() { "<any>" } else { &config.host },
        port = config.port,
        model = %config.model,
        "will listen for station connections"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return ObserverExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => ObserverExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {e}");
                ObserverExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Run the driver until SIGINT, printing each mapped record as JSON
async fn run_daemon(config: StationConfig) -> Result<()> {
    let mut driver = ObserverDriver::start(config)?;

    let interrupted = loop {
        tokio::select! {
            record = driver.next_record() => {
                match record {
                    Some(record) => match serde_json::to_string(&record) {
                        Ok(json) => println!("{json}"),
                        Err(e) => error!("failed to serialize record: {e}"),
                    },
                    // record sequence only ends after shutdown
                    None => break false,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break true;
            }
        }
    };

    if interrupted {
        driver.stop().await;
    }

    Ok(())
}

/// Offline decode of a captured frame: print the decoded fields as
/// JSON and exit.
fn test_decode(path: &PathBuf) -> Result<()> {
    let data = std::fs::read(path)
        .with_context(|| format!("cannot read capture file {}", path.display()))?;
    let record = observer_core::decode(&data);
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
