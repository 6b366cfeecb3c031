// # dnswatchd - DNS Change Watcher Daemon
//
// This is a THIN integration layer. All detection and notification logic
// lives in dnswatch-core.
//
// The dnswatchd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering resolvers and transports
// 4. Running the watch engine until SIGTERM/SIGINT
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Watched names
// - `DNSWATCH_HOSTS`: Comma-separated list of names to watch
//
// ### Recipients
// - `DNSWATCH_RECIPIENTS`: Comma-separated list of `addr@host` or
//   `Name <addr@host>` entries
//
// ### SMTP
// - `DNSWATCH_SMTP_HOST`: SMTP relay hostname
// - `DNSWATCH_SMTP_PORT`: Submission port (default 587)
// - `DNSWATCH_SMTP_FROM`: Sender address
// - `DNSWATCH_SMTP_USER` / `DNSWATCH_SMTP_PASSWORD`: Optional credentials
// - `DNSWATCH_DRY_RUN`: `true` to log messages instead of sending them
//
// ### Engine
// - `DNSWATCH_RESOLVER`: Resolver type (system, hickory)
// - `DNSWATCH_TICK_INTERVAL_SECS`: Seconds between checks (default 60)
// - `DNSWATCH_RETENTION_SECS`: Retention window in seconds (default 300)
// - `DNSWATCH_RESOLVE_TIMEOUT_SECS`: Per-lookup timeout (default 10)
// - `DNSWATCH_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export DNSWATCH_HOSTS=example.com,vpn.example.com
// export DNSWATCH_RECIPIENTS="Ops <ops@example.com>,dev@example.com"
// export DNSWATCH_SMTP_HOST=smtp.example.com
// export DNSWATCH_SMTP_FROM=dnswatch@example.com
//
// dnswatchd
// ```

use anyhow::{Context, Result};
use dnswatch_core::config::{
    EngineConfig, RecipientConfig, ResolverConfig, TransportConfig, WatchConfig,
};
use dnswatch_core::traits::SystemClock;
use dnswatch_core::{ComponentRegistry, EngineEvent, TemplateRenderer, WatchEngine};
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Default SMTP submission port (STARTTLS)
const DEFAULT_SMTP_PORT: u16 = 587;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DnswatchExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnswatchExitCode> for ExitCode {
    fn from(code: DnswatchExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    hosts: Vec<String>,
    recipients: Vec<String>,
    smtp_host: String,
    smtp_port: Option<u16>,
    smtp_from: String,
    smtp_user: Option<String>,
    smtp_password: Option<String>,
    dry_run: bool,
    resolver_type: String,
    tick_interval_secs: Option<u64>,
    retention_secs: Option<u64>,
    resolve_timeout_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let list = |key: &str| -> Vec<String> {
            lookup(key)
                .unwrap_or_default()
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        };

        Ok(Self {
            hosts: list("DNSWATCH_HOSTS"),
            recipients: list("DNSWATCH_RECIPIENTS"),
            smtp_host: lookup("DNSWATCH_SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_var(&lookup, "DNSWATCH_SMTP_PORT")?,
            smtp_from: lookup("DNSWATCH_SMTP_FROM").unwrap_or_default(),
            smtp_user: lookup("DNSWATCH_SMTP_USER").filter(|s| !s.is_empty()),
            smtp_password: lookup("DNSWATCH_SMTP_PASSWORD").filter(|s| !s.is_empty()),
            dry_run: lookup("DNSWATCH_DRY_RUN")
                .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
            resolver_type: lookup("DNSWATCH_RESOLVER").unwrap_or_else(|| "system".to_string()),
            tick_interval_secs: parse_var(&lookup, "DNSWATCH_TICK_INTERVAL_SECS")?,
            retention_secs: parse_var(&lookup, "DNSWATCH_RETENTION_SECS")?,
            resolve_timeout_secs: parse_var(&lookup, "DNSWATCH_RESOLVE_TIMEOUT_SECS")?,
            log_level: lookup("DNSWATCH_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// Checks what the environment alone can get wrong; the engine validates
    /// the assembled `WatchConfig` again during init.
    fn validate(&self) -> Result<()> {
        if self.hosts.is_empty() {
            anyhow::bail!(
                "DNSWATCH_HOSTS must contain at least one name. \
                Set it via: export DNSWATCH_HOSTS=example.com,vpn.example.com"
            );
        }

        for host in &self.hosts {
            validate_domain_name(host)?;
        }

        if self.recipients.is_empty() {
            anyhow::bail!(
                "DNSWATCH_RECIPIENTS must contain at least one recipient. \
                Set it via: export DNSWATCH_RECIPIENTS=ops@example.com"
            );
        }

        if self.smtp_host.is_empty() {
            anyhow::bail!("DNSWATCH_SMTP_HOST is required");
        }

        if self.smtp_from.is_empty() {
            anyhow::bail!("DNSWATCH_SMTP_FROM is required");
        }

        if self.smtp_user.is_some() != self.smtp_password.is_some() {
            anyhow::bail!("DNSWATCH_SMTP_USER and DNSWATCH_SMTP_PASSWORD must be set together");
        }

        match self.resolver_type.as_str() {
            "system" | "hickory" => {}
            _ => anyhow::bail!(
                "DNSWATCH_RESOLVER '{}' is not supported. \
                Supported resolvers: system, hickory",
                self.resolver_type
            ),
        }

        if let Some(interval) = self.tick_interval_secs
            && !(1..=86_400).contains(&interval)
        {
            anyhow::bail!(
                "DNSWATCH_TICK_INTERVAL_SECS must be between 1 and 86400 seconds. Got: {}",
                interval
            );
        }

        if let (Some(retention), Some(interval)) = (self.retention_secs, self.tick_interval_secs)
            && retention < interval
        {
            warn!(
                "DNSWATCH_RETENTION_SECS ({}) is shorter than the tick interval ({}); \
                every observation will look new",
                retention, interval
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "DNSWATCH_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Assemble the engine configuration
    fn to_watch_config(&self) -> Result<WatchConfig> {
        let mut config = WatchConfig::new();

        for host in &self.hosts {
            config = config.with_watched(host.as_str());
        }

        for raw in &self.recipients {
            let recipient = RecipientConfig::parse(raw)
                .with_context(|| format!("Invalid entry in DNSWATCH_RECIPIENTS: '{}'", raw))?;
            config = config.with_recipient(recipient);
        }

        config.resolver = match self.resolver_type.as_str() {
            "hickory" => ResolverConfig::Hickory,
            _ => ResolverConfig::System,
        };

        config.transport = TransportConfig::Smtp {
            host: self.smtp_host.clone(),
            port: self.smtp_port.unwrap_or(DEFAULT_SMTP_PORT),
            from: self.smtp_from.clone(),
            username: self.smtp_user.clone(),
            password: self.smtp_password.clone(),
            dry_run: self.dry_run,
        };

        let defaults = EngineConfig::default();
        config.engine = EngineConfig {
            tick_interval_secs: self.tick_interval_secs.unwrap_or(defaults.tick_interval_secs),
            retention_secs: self.retention_secs.unwrap_or(defaults.retention_secs),
            resolve_timeout_secs: self
                .resolve_timeout_secs
                .unwrap_or(defaults.resolve_timeout_secs),
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }

    fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        }
    }
}

/// Parse an optional numeric variable
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(raw) => {
            let value = raw
                .trim()
                .parse()
                .with_context(|| format!("{} is not a valid number: '{}'", key, raw))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Validate that a string is a valid domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// A single trailing dot (fully-qualified form) is accepted.
fn validate_domain_name(domain: &str) -> Result<()> {
    let domain = domain.strip_suffix('.').unwrap_or(domain);

    if domain.is_empty() {
        anyhow::bail!("Domain name cannot be empty");
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        anyhow::bail!(
            "Domain name too long: {} chars (max 253). Got: {}",
            domain.len(),
            domain
        );
    }

    for label in domain.split('.') {
        if label.is_empty() {
            anyhow::bail!("Domain name has empty label: '{}'", domain);
        }

        if label.len() > 63 {
            anyhow::bail!(
                "Domain label too long: {} chars (max 63). Label: '{}'",
                label.len(),
                label
            );
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            anyhow::bail!(
                "Domain label contains invalid characters. Label: '{}'. \
                Valid: alphanumeric, hyphen and underscore only.",
                label
            );
        }

        if label.starts_with('-') || label.ends_with('-') {
            anyhow::bail!(
                "Domain label cannot start or end with hyphen. Label: '{}'",
                label
            );
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return DnswatchExitCode::ConfigError.into();
        }
    };

    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level())
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnswatchExitCode::ConfigError.into();
    }

    // Validate configuration
    let watch_config = match config.validate().and_then(|_| config.to_watch_config()) {
        Ok(watch_config) => watch_config,
        Err(e) => {
            error!("Configuration validation error: {:#}", e);
            return DnswatchExitCode::ConfigError.into();
        }
    };

    info!("Starting dnswatchd daemon");
    info!(
        "Configuration loaded: {} name(s), {} recipient(s)",
        watch_config.watched.len(),
        watch_config.recipients.len()
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnswatchExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(watch_config)).into()
}

/// Run the daemon
async fn run_daemon(config: WatchConfig) -> DnswatchExitCode {
    // Create component registry
    let registry = ComponentRegistry::new();

    info!("Registering resolvers");
    dnswatch_resolver::register(&registry);

    #[cfg(feature = "smtp")]
    {
        info!("Registering SMTP transport");
        dnswatch_notify_smtp::register(&registry);
    }

    let resolver = match registry.create_resolver(&config.resolver) {
        Ok(resolver) => resolver,
        Err(e) => {
            error!("Failed to create resolver: {}", e);
            return DnswatchExitCode::ConfigError;
        }
    };

    let transport = match registry.create_transport(&config.transport) {
        Ok(transport) => transport,
        Err(e) => {
            error!(
                "Failed to create transport (available: {:?}): {}",
                registry.list_transports(),
                e
            );
            return DnswatchExitCode::ConfigError;
        }
    };

    info!(
        "Using {} resolver and {} transport",
        resolver.resolver_name(),
        transport.transport_name()
    );

    let (mut engine, events) = WatchEngine::new(
        Arc::from(resolver),
        Arc::from(transport),
        Arc::new(TemplateRenderer::new()),
        Arc::new(SystemClock),
        config,
    );

    if let Err(e) = engine.init() {
        error!("Engine initialization failed: {}", e);
        engine.clear();
        return DnswatchExitCode::ConfigError;
    }

    let event_logger = tokio::spawn(log_events(events));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signal_task = tokio::spawn(async move {
        match wait_for_shutdown().await {
            Ok(signal) => info!("Received shutdown signal: {}", signal),
            Err(e) => error!("Signal handling failed, shutting down: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    info!("Watching for DNS changes");
    let result = engine.start(shutdown_rx).await;

    signal_task.abort();
    engine.clear();
    drop(engine);

    // the logger ends once the engine's event sender is gone
    let _ = event_logger.await;

    match result {
        Ok(()) => {
            info!("Shutting down daemon");
            DnswatchExitCode::CleanShutdown
        }
        Err(e) => {
            error!("Daemon error: {}", e);
            DnswatchExitCode::RuntimeError
        }
    }
}

/// Log engine events until the engine goes away
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::NotificationFailed { name, error } => {
                warn!("Change of {} was not delivered: {}", name, error);
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
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
