// # dnsctld - authoritative DNS resolver daemon
//
// This daemon is a thin integration layer over `dnsctl-core`:
// 1. Reads configuration from environment variables.
// 2. Builds one zone per configured origin and starts a watcher for it.
// 3. Serves UDP queries against those zones until a shutdown signal.
//
// ## Configuration
//
// - `DNSCTL_ORIGINS`: comma-separated list of zone origins to serve.
// - `DNSCTL_RNAME`: SOA responsible-person mailbox, e.g. `hostmaster@example.com`.
// - `DNSCTL_WATCH_NAMESPACES`: comma-separated namespaces to watch (default: all).
// - `DNSCTL_DEBOUNCE_MILLIS`: rebuild debounce window in milliseconds (default 100).
// - `DNSCTL_LISTEN_ADDR`: UDP listen address (default `0.0.0.0:53`).
// - `DNSCTL_LOG_LEVEL`: trace|debug|info|warn|error (default info).

use anyhow::Result;
use dnsctl_core::config::{ResolverConfig, WatcherConfig};
use dnsctl_core::endpoint::normalize_dns_name;
use dnsctl_core::query::QueryHandler;
use dnsctl_core::selector::RandomDraw;
use dnsctl_core::watcher::{WatchSource, Watcher};
use dnsctl_core::wire;
use dnsctl_core::zone::{Zone, ZoneHandle};
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes follow systemd conventions: 0 clean, 1 config error, 2 runtime error.
#[derive(Debug, Clone, Copy)]
enum DnsctlExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<DnsctlExitCode> for ExitCode {
    fn from(code: DnsctlExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

struct Config {
    resolver: ResolverConfig,
    listen_addr: SocketAddr,
    log_level: String,
}

impl Config {
    fn from_env() -> Result<Self> {
        let origins: Vec<String> = env::var("DNSCTL_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rname = env::var("DNSCTL_RNAME").unwrap_or_default();
        let namespaces_raw = env::var("DNSCTL_WATCH_NAMESPACES").unwrap_or_default();
        let debounce_millis = env::var("DNSCTL_DEBOUNCE_MILLIS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(100);
        let listen_addr_raw = env::var("DNSCTL_LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:53".to_string());
        let listen_addr = listen_addr_raw
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid DNSCTL_LISTEN_ADDR '{listen_addr_raw}': {e}"))?;
        let log_level = env::var("DNSCTL_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut resolver = ResolverConfig::new(origins);
        resolver.rname = rname;
        resolver.watcher = WatcherConfig {
            namespaces: WatcherConfig::namespaces_from_env_value(&namespaces_raw),
            debounce_millis,
        };

        Ok(Self {
            resolver,
            listen_addr,
            log_level,
        })
    }

    fn validate(&self) -> Result<()> {
        self.resolver
            .validate()
            .map_err(|e| anyhow::anyhow!("DNSCTL_ORIGINS invalid: {e}"))?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => anyhow::bail!(
                "DNSCTL_LOG_LEVEL '{other}' is not valid. Valid levels: trace, debug, info, warn, error"
            ),
        }

        Ok(())
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return DnsctlExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {e}");
        return DnsctlExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {e}");
        return DnsctlExitCode::ConfigError.into();
    }

    info!(origins = ?config.resolver.origins, "starting dnsctld");

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {e}");
            return DnsctlExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config).await {
            error!("Daemon error: {e}");
            DnsctlExitCode::RuntimeError
        } else {
            DnsctlExitCode::CleanShutdown
        }
    });

    result.into()
}

async fn run_daemon(config: Config) -> Result<()> {
    let source: Arc<dyn WatchSource> = Arc::new(dnsctl_store_memory::InMemoryWatchSource::new());
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut zone_handles: HashMap<String, Arc<ZoneHandle>> = HashMap::new();
    let mut watcher_tasks = Vec::new();

    for origin in &config.resolver.origins {
        let zone = Zone::new(origin, &config.resolver.rname);
        let handle = Arc::new(ZoneHandle::new(zone));
        zone_handles.insert(normalize_dns_name(origin), handle.clone());

        let namespace = config.resolver.watcher.namespaces.first().cloned();
        let watcher = Watcher::new(
            origin.clone(),
            config.resolver.rname.clone(),
            namespace,
            source.clone(),
            handle,
            Duration::from_millis(config.resolver.watcher.debounce_millis),
        );
        watcher_tasks.push(tokio::spawn(watcher.run(shutdown_rx.clone())));
    }

    let handler = Arc::new(QueryHandler::new(zone_handles));
    let draw = Arc::new(RandomDraw::default());

    let socket = Arc::new(tokio::net::UdpSocket::bind(config.listen_addr).await?);
    info!(addr = %config.listen_addr, "listening for dns queries");

    let mut shutdown_signal = shutdown_rx.clone();
    let mut buf = vec![0u8; 512];

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                match received {
                    Ok((len, peer)) => {
                        let packet = buf[..len].to_vec();
                        let handler = handler.clone();
                        let draw = draw.clone();
                        let socket = socket.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_packet(&handler, draw.as_ref(), &packet, peer, &socket).await {
                                warn!(error = %e, %peer, "failed to answer query");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "error receiving udp datagram");
                    }
                }
            }
            _ = wait_for_shutdown_signal() => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
                break;
            }
            _ = shutdown_signal.changed() => {
                break;
            }
        }
    }

    for task in watcher_tasks {
        let _ = task.await;
    }

    Ok(())
}

async fn handle_packet(
    handler: &QueryHandler,
    draw: &RandomDraw,
    packet: &[u8],
    peer: SocketAddr,
    socket: &tokio::net::UdpSocket,
) -> Result<()> {
    let header = wire::parse_header(packet)?;
    let question = match wire::parse_question(packet) {
        Ok(q) => q,
        Err(e) => {
            warn!(error = %e, %peer, "rejecting malformed query");
            return Ok(());
        }
    };

    let qtype_value = match question.qtype {
        dnsctl_core::query::QType::Record(rt) => wire::record_type_to_u16(rt),
        dnsctl_core::query::QType::Axfr => 252,
        dnsctl_core::query::QType::Ixfr => 251,
    };

    let result = match handler.handle(&question, draw) {
        Ok(result) => result,
        Err(dnsctl_core::Error::ZoneNotConfigured(_)) => {
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, %peer, "query handler error");
            return Ok(());
        }
    };

    let response = wire::encode_response(header.id, &question, qtype_value, &result);
    socket.send_to(&response, peer).await?;
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGTERM handler: {e}");
            return;
        }
    };
    let mut sigint = match signal(SignalKind::interrupt()) {
        Ok(s) => s,
        Err(e) => {
            error!("failed to install SIGINT handler: {e}");
            return;
        }
    };
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = sigint.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
