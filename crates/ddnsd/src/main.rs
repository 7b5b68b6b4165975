// # ddnsd - DDNS Daemon
//
// Thin integration layer: all update logic lives in ddns-core.
//
// The ddnsd daemon is responsible for:
// 1. Parsing the command line and loading the JSON configuration
// 2. Initializing logging and the runtime
// 3. Building the address source and the DnsPod provider
// 4. Resolving the configured domain and subdomains
// 5. Running the supervised update loop until SIGINT/SIGTERM
//
// ## Configuration
//
// ```json
// {
//   "api_id": 12345,
//   "api_token": "your_token",
//   "domain": "example.com",
//   "sub_domains": "home,nas",
//   "ip_fetch_url": "http://myexternalip.com/raw",
//   "check_second": 300
// }
// ```
//
// ## Example
//
// ```bash
// ddnsd -c /etc/ddnsd.conf            # external discovery
// ddnsd -c /etc/ddnsd.conf -i         # internal discovery
// ddnsd -c /etc/ddnsd.conf --ip       # print the current address and exit
// ```

mod cli;

use anyhow::Result;
use clap::Parser;
use clap::error::ErrorKind;
use ddns_core::{
    AddressSource, DiscoveryMode, DnsProvider, DomainResolver, RetryPolicy, Settings, Supervisor,
    SupervisorExit, UpdateLoop,
};
use ddns_ip_http::HttpAddressSource;
use ddns_ip_iface::InterfaceAddressSource;
use ddns_provider_dnspod::DnspodProvider;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

use cli::Cli;

/// Client version reported at startup
const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl DdnsExitCode {
    /// Misconfiguration found while talking to the provider is still a
    /// configuration error
    fn for_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<ddns_core::Error>() {
            Some(e) if e.is_fatal_config() => DdnsExitCode::ConfigError,
            _ => DdnsExitCode::RuntimeError,
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    DdnsExitCode::CleanShutdown.into()
                }
                _ => DdnsExitCode::ConfigError.into(),
            };
        }
    };

    // Load and validate configuration
    let settings = match Settings::load(&cli.conf) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate(cli.mode()) {
        eprintln!("Configuration validation error: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::from(cli.log_level))
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    install_panic_hook();

    info!("Starting ddnsd {}", CLIENT_VERSION);
    info!(
        "Configuration loaded from {}: domain {}, subdomains '{}'",
        cli.conf.display(),
        settings.domain.trim(),
        settings.sub_domains
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(cli, settings).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                DdnsExitCode::for_error(&e)
            }
        }
    });

    result.into()
}

/// Route panics through tracing, with a backtrace
///
/// The supervisor recovers from the panic itself; this only makes sure the
/// location and stack reach the log.
fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::force_capture();
        error!("{}\n{}", info, backtrace);
    }));
}

/// Build the address source for the selected mode
fn build_source(mode: DiscoveryMode, settings: &Settings) -> Result<Arc<dyn AddressSource>> {
    info!("IP discovery mode: {}", mode);
    let source: Arc<dyn AddressSource> = match mode {
        DiscoveryMode::Internal => Arc::new(InterfaceAddressSource::new()),
        DiscoveryMode::External => {
            Arc::new(HttpAddressSource::new(settings.ip_fetch_url.trim())?)
        }
    };
    Ok(source)
}

/// Run the daemon
async fn run_daemon(cli: Cli, settings: Settings) -> Result<()> {
    let check_interval = settings.check_interval()?;
    let source = build_source(cli.mode(), &settings)?;

    // Diagnostic mode: print the address and exit
    if cli.print_ip {
        let address = RetryPolicy::default()
            .run("Fetch IP", || source.discover())
            .await?;
        println!("{}", address);
        return Ok(());
    }

    if cli.dry_run {
        warn!("Running in dry-run mode, no DNS record will be modified");
    }

    let provider = Arc::new(DnspodProvider::new(settings.login_token(), cli.dry_run)?);

    match provider.api_version().await {
        Ok(version) => info!(
            "{} API version {} | client version {}",
            provider.provider_name(),
            version,
            CLIENT_VERSION
        ),
        Err(e) => warn!("Could not query {} API version: {}", provider.provider_name(), e),
    }

    let domain = DomainResolver::new(provider.as_ref())
        .resolve(&settings.domain, &settings.sub_domains)
        .await?;

    let update_loop = UpdateLoop::new(source, provider, domain, check_interval);
    let mut supervisor = Supervisor::new(update_loop);

    // Signals feed the supervisor and, past the restart ceiling, keep the
    // daemon alive until the operator stops it
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = tokio::spawn(async move {
        let received = wait_for_shutdown().await;
        let _ = shutdown_tx.send(());
        received
    });

    match supervisor.run_with_shutdown(Some(shutdown_rx)).await {
        SupervisorExit::Shutdown => {
            let signal = signals.await??;
            info!("Received shutdown signal: {}", signal);
        }
        SupervisorExit::RestartCeilingReached { restart_count } => {
            error!(
                "Update loop failed {} time(s) after {} restart(s); no more updates will be made. Waiting for shutdown signal",
                restart_count + 1,
                restart_count
            );
            let signal = signals.await??;
            info!("Received shutdown signal: {}", signal);
        }
        SupervisorExit::Completed => {
            signals.abort();
        }
    }

    info!("Shutting down daemon");
    Ok(())
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    // Set up signal handlers for SIGTERM and SIGINT
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
