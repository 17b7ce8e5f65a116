// # dynsyncd - dynsync daemon
//
// Thin integration layer: reads the settings file, wires up the provider
// registry, the public IP resolver and the update engine, then runs until
// SIGTERM/SIGINT. All update logic lives in dynsync-core.
//
// ## Configuration
//
// - `DYNSYNC_CONFIG`: path to the JSON settings file (default: dynsync.json)
// - `DYNSYNC_LOG_LEVEL`: trace, debug, info, warn or error (default: info)
//
// ## Example
//
// ```bash
// export DYNSYNC_CONFIG=/etc/dynsync/dynsync.json
// export DYNSYNC_LOG_LEVEL=info
//
// dynsyncd
// ```
//
// Settings file shape:
//
// ```json
// {
//   "records": [
//     {
//       "domain": "example.com",
//       "owner": "www",
//       "provider": "cloudflare",
//       "ip_version": "ipv4",
//       "settings": {
//         "token": "...",
//         "zone_identifier": "...",
//         "ttl": 300
//       }
//     }
//   ]
// }
// ```

use anyhow::{Context, Result};
use dynsync_core::{
    ProviderRegistry, PublicIpResolver, Settings, UpdateEngine, status_report,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

const DEFAULT_CONFIG_PATH: &str = "dynsync.json";

/// Exit codes following systemd conventions:
/// - 0: clean shutdown
/// - 1: configuration or startup error
/// - 2: runtime error
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let log_level = env::var("DYNSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let log_level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        other => {
            eprintln!("Invalid DYNSYNC_LOG_LEVEL '{}'", other);
            return DaemonExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DaemonExitCode::ConfigError.into();
    }

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return DaemonExitCode::ConfigError.into();
        }
    };

    info!(records = settings.records.len(), "starting dynsyncd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DaemonExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(settings).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DaemonExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Read and validate the settings file
fn load_settings() -> Result<Settings> {
    let path = env::var("DYNSYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("reading settings file {}", path))?;
    let settings: Settings =
        serde_json::from_str(&raw).with_context(|| format!("parsing settings file {}", path))?;
    settings
        .validate()
        .with_context(|| format!("validating settings file {}", path))?;
    Ok(settings)
}

async fn run_daemon(settings: Settings) -> Result<()> {
    // One client for everything: provider adapters and IP sources share its
    // connection pool through cheap clones.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.engine.update_timeout_secs))
        .build()
        .context("building HTTP client")?;

    let mut registry = ProviderRegistry::new();

    #[cfg(feature = "cloudflare")]
    registry.register(
        "cloudflare",
        Box::new(dynsync_provider_cloudflare::CloudflareFactory::new(
            client.clone(),
        )),
    );

    info!(providers = ?registry.provider_names(), "providers registered");

    let records = registry.build_records(&settings)?;
    for record in &records {
        info!(record = %record.provider().describe(), "managing record");
    }

    let resolver = Arc::new(PublicIpResolver::new(
        dynsync_ip_http::sources_from_config(&settings.resolver.ipv4_sources, &client),
        dynsync_ip_http::sources_from_config(&settings.resolver.ipv6_sources, &client),
        Duration::from_secs(settings.resolver.timeout_secs),
    ));

    let (engine, mut event_rx, _trigger) =
        UpdateEngine::new(records, resolver, &settings.engine)?;
    let engine = Arc::new(engine);

    // Event log: the engine already logs outcomes, so this stays at debug
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            debug!(?event, "engine event");
        }
    });

    // Periodic status projection, one JSON line per tick
    {
        let engine = Arc::clone(&engine);
        let period = Duration::from_secs(settings.engine.tick_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await;
            loop {
                interval.tick().await;
                let report = status_report(engine.records(), chrono::Utc::now());
                match serde_json::to_string(&report) {
                    Ok(json) => info!(status = %json, "record status"),
                    Err(e) => warn!("status serialization failed: {}", e),
                }
            }
        });
    }

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        let name = wait_for_signal().await;
        info!(signal = name, "shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    engine.run_with_shutdown(Some(shutdown_rx)).await?;
    info!("dynsyncd stopped");
    Ok(())
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to set up SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
            unreachable!()
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to set up SIGINT handler: {}", e);
            std::future::pending::<()>().await;
            unreachable!()
        }
    };

    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Ctrl-C fallback for non-Unix platforms
#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "SIGINT"
}
