//! Minimal embedding example for dnswatch-core
//!
//! This example drives the watch engine inside a custom application with a
//! scripted resolver and a transport that prints to stdout. The engine
//! lifecycle (init, start, shutdown, clear) is fully managed by the
//! application.

use dnswatch_core::config::{EngineConfig, RecipientConfig, TransportConfig, WatchConfig};
use dnswatch_core::traits::{
    NameResolver, NotificationTransport, Recipient, RenderedMessage, SystemClock,
};
use dnswatch_core::{TemplateRenderer, Result, WatchEngine};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::Level;

/// Resolver that walks through a fixed list of answers, one per lookup
struct CyclingResolver {
    answers: Vec<IpAddr>,
    calls: AtomicUsize,
}

impl CyclingResolver {
    fn new(answers: Vec<IpAddr>) -> Self {
        Self {
            answers,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl NameResolver for CyclingResolver {
    async fn resolve(&self, name: &str) -> Result<Vec<IpAddr>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let addr = self.answers[n.min(self.answers.len() - 1)];
        println!("[Embedded] {} resolved to {}", name, addr);
        Ok(vec![addr])
    }

    fn resolver_name(&self) -> &'static str {
        "cycling"
    }
}

/// Transport that prints every message
struct StdoutTransport;

#[async_trait::async_trait]
impl NotificationTransport for StdoutTransport {
    async fn send(&self, recipient: &Recipient, message: &RenderedMessage) -> Result<()> {
        println!("\n[Mail to {}] {}", recipient, message.subject);
        println!("{}", message.body_text());
        Ok(())
    }

    fn transport_name(&self) -> &'static str {
        "stdout"
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    println!("=== Embedded dnswatch-core Example ===\n");

    // A, A, B, then A again (a flap, suppressed), then C
    let a = IpAddr::from([192, 0, 2, 1]);
    let b = IpAddr::from([192, 0, 2, 2]);
    let c = IpAddr::from([192, 0, 2, 3]);
    let resolver = Arc::new(CyclingResolver::new(vec![a, a, b, a, c]));

    let mut config = WatchConfig::new()
        .with_watched("app.example.com")
        .with_recipient(RecipientConfig::new("ops@example.com").with_display_name("Ops"));
    config.transport = TransportConfig::Custom {
        factory: "stdout".to_string(),
        config: serde_json::json!({}),
    };
    config.engine = EngineConfig {
        tick_interval_secs: 1,
        retention_secs: 3,
        ..EngineConfig::default()
    };

    println!("1. Creating engine...");
    let (mut engine, mut event_rx) = WatchEngine::new(
        resolver,
        Arc::new(StdoutTransport),
        Arc::new(TemplateRenderer::new()),
        Arc::new(SystemClock),
        config,
    );

    println!("2. Initializing...");
    engine.init()?;

    let event_listener = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            println!("[Event] {:?}", event);
        }
    });

    println!("3. Running for 6 ticks...");
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let stopper = tokio::spawn(async move {
        tokio::time::sleep(tokio::time::Duration::from_millis(6500)).await;
        let _ = shutdown_tx.send(());
    });

    engine.start(shutdown_rx).await?;
    let _ = stopper.await;

    println!("\n4. Engine stopped, releasing resources.");
    engine.clear();
    drop(engine);
    let _ = event_listener.await;

    println!("\n=== Embedding Successful ===");
    println!("Key Points:");
    println!("- Engine lifecycle is fully controlled by the application");
    println!("- Resolver and transport are custom (not dnswatchd defaults)");
    println!("- Re-seen addresses within the retention window are not reported");

    Ok(())
}

