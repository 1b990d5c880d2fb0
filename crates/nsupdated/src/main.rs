// # nsupdated - dynamic DNS update daemon
//
// The nsupdated binary is a thin integration layer over nsupdate-core:
// 1. Parse the command line and resolve it into an `UpdateConfig`
//    (zone defaulting, server discovery, TSIG secret decoding)
// 2. Initialize tracing and the runtime
// 3. Open the netlink tracker and start the update engine
// 4. Drive snapshots into the engine, once or in watch mode, and drain
//    the engine on shutdown
//
// No retry, scheduling or DNS logic lives here; that belongs to
// nsupdate-core and nsupdate-dns.
//
// ## Example
//
// ```bash
// export TSIG_SECRET=c2VjcmV0Cg==
// nsupdated --interface eth0 --name host.example.com \
//     --tsig-name update-key --tsig-algorithm hmac-sha256 --watch
// ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use nsupdate_core::config::{self, FamilyFilter, TsigAlgorithm, TsigKey, UpdateConfig};
use nsupdate_core::{AddressTracker, Error, UpdateEngine, WaitOutcome, ZoneResolver};
use nsupdate_dns::{SystemZoneResolver, UdpTransport};
use nsupdate_netlink::NetlinkSource;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or setup error
/// - 2: Runtime error (delivery failure, unexpected)
#[derive(Debug, Clone, Copy)]
enum DaemonExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DaemonExitCode> for ExitCode {
    fn from(code: DaemonExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep a DNS name's A/AAAA records in sync with a network interface.
#[derive(Debug, Parser)]
#[command(name = "nsupdated", version)]
struct Cli {
    /// Network interface to track
    #[arg(short, long)]
    interface: String,

    /// Address family for the initial scan (all, inet, ipv4, inet6, ipv6)
    #[arg(long, default_value = "all")]
    interface_family: FamilyFilter,

    /// Server receiving the updates, HOST[:PORT]; discovered from the
    /// zone's SOA record when omitted
    #[arg(long)]
    server: Option<String>,

    /// Per-attempt timeout, in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Base retry interval, in seconds
    #[arg(long, default_value_t = 30)]
    retry_interval: u64,

    /// TSIG key name
    #[arg(long)]
    tsig_name: Option<String>,

    /// TSIG secret, base64
    #[arg(long, env = "TSIG_SECRET", hide_env_values = true)]
    tsig_secret: Option<String>,

    /// TSIG algorithm (hmac-sha1, hmac-sha256, hmac-sha384, hmac-sha512)
    #[arg(long, default_value = "hmac-sha1")]
    tsig_algorithm: TsigAlgorithm,

    /// Zone to update; defaults to the parent of --name
    #[arg(long)]
    zone: Option<String>,

    /// Owner name whose records are kept in sync
    #[arg(long)]
    name: String,

    /// TTL for inserted records, in seconds
    #[arg(long, default_value_t = 60)]
    ttl: u32,

    /// Keep running and apply address changes as they happen
    #[arg(long)]
    watch: bool,

    /// Raise the default log level to debug
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DaemonExitCode::ConfigError.into();
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DaemonExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        match run_daemon(cli).await {
            Ok(()) => DaemonExitCode::CleanShutdown,
            Err(e) => {
                error!("{e:#}");
                classify(&e)
            }
        }
    })
    .into()
}

/// Map a failure to its exit code: everything that went wrong before
/// tracking started is a configuration problem.
fn classify(error: &anyhow::Error) -> DaemonExitCode {
    match error.downcast_ref::<Error>() {
        Some(
            Error::Config(_)
            | Error::InterfaceNotFound(_)
            | Error::Subscription(_)
            | Error::ZoneResolver(_),
        ) => DaemonExitCode::ConfigError,
        _ => DaemonExitCode::RuntimeError,
    }
}

async fn run_daemon(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli).await?;
    info!(
        name = %config.name,
        zone = %config.zone,
        server = %config.server,
        watch = cli.watch,
        "nsupdated starting"
    );

    let mut source = NetlinkSource::new()?;
    let mut tracker =
        AddressTracker::open(&mut source, &cli.interface, cli.interface_family).await?;

    let transport = Arc::new(UdpTransport::new());
    let mut engine = UpdateEngine::start(config, transport)?;

    engine.update(tracker.snapshot()).await?;

    if cli.watch {
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    info!(signal, "shutting down");
                    break;
                }
                outcome = tracker.wait_for_change() => match outcome {
                    WaitOutcome::Changed => {
                        engine.update(tracker.snapshot()).await?;
                    }
                    WaitOutcome::Closed => {
                        warn!("netlink event stream closed, shutting down");
                        break;
                    }
                },
            }
        }
    }

    engine.done().await?;
    info!("done");
    Ok(())
}

/// Wait for a shutdown signal (SIGTERM or SIGINT) and name it.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!("Failed to set up SIGTERM handler: {e}");
            std::future::pending().await
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(sigint) => sigint,
        Err(e) => {
            error!("Failed to set up SIGINT handler: {e}");
            std::future::pending().await
        }
    };
    tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    }
}

/// Fallback for non-Unix platforms: CTRL-C only.
#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            error!("Failed to wait for CTRL-C: {e}");
            std::future::pending().await
        }
    }
}

/// Resolve the command line into a complete configuration: absolute
/// names, a concrete server address, a decoded TSIG key. Every failure
/// here is a setup error.
async fn resolve_config(cli: &Cli) -> Result<UpdateConfig, Error> {
    let name = config::fqdn(&cli.name);
    let zone = match &cli.zone {
        Some(zone) => config::fqdn(zone),
        None => config::parent_zone(&name).ok_or_else(|| {
            Error::config(format!("{name} has no parent zone; use --zone"))
        })?,
    };

    let tsig = match (&cli.tsig_name, &cli.tsig_secret) {
        (Some(key_name), Some(secret)) => {
            let secret = base64::engine::general_purpose::STANDARD
                .decode(secret.trim())
                .map_err(|e| Error::config(format!("decoding TSIG secret: {e}")))?;
            Some(TsigKey::new(key_name, secret, cli.tsig_algorithm))
        }
        (None, None) => None,
        _ => {
            return Err(Error::config(
                "--tsig-name and --tsig-secret must be given together",
            ));
        }
    };

    let server = match &cli.server {
        Some(spec) => resolve_server(spec).await?,
        None => {
            let resolver = SystemZoneResolver::from_system_conf()?;
            let primary = resolver.zone_primary(&zone).await?;
            resolve_server(primary.trim_end_matches('.')).await?
        }
    };

    Ok(UpdateConfig {
        name,
        zone,
        server,
        timeout: Duration::from_secs(cli.timeout),
        retry_interval: Duration::from_secs(cli.retry_interval),
        ttl: cli.ttl,
        tsig,
    })
}

/// Resolve HOST[:PORT] to a socket address, defaulting to port 53.
async fn resolve_server(spec: &str) -> Result<SocketAddr, Error> {
    if let Ok(addr) = spec.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = spec.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, config::DNS_PORT));
    }

    let lookup = match spec.rsplit_once(':') {
        // A lone colon-separated pair is host:port; anything with more
        // colons is an IPv6 literal, handled above.
        Some((host, port)) if !host.contains(':') => {
            let port: u16 = port
                .parse()
                .map_err(|e| Error::config(format!("invalid port in {spec}: {e}")))?;
            tokio::net::lookup_host((host, port)).await
        }
        _ => tokio::net::lookup_host((spec, config::DNS_PORT)).await,
    };

    lookup
        .map_err(|e| Error::config(format!("resolving server {spec}: {e}")))?
        .next()
        .ok_or_else(|| Error::config(format!("no address for server {spec}")))
}
