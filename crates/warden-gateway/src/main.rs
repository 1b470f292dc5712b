//! Warden Gateway
//!
//! AI governance gateway: applies programmable policy checks before and
//! after every LLM call and escalates to a durable human review queue when
//! a policy demands judgment.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{info, warn};
use warden_audit::{AuditRepository, AuditService, DbConfig};
use warden_core::AuditSink;
use warden_gateway::{AppState, GatewayConfig, Orchestrator};
use warden_hitl::{HitlService, PgReviewRepository};
use warden_policy::{policies::register_builtin_policies, PolicyEngine, PolicyRegistry};
use warden_router::{load_router_config, ModelRouter};

#[derive(Parser, Debug)]
#[command(name = "warden-gateway")]
#[command(about = "Policy-gated LLM gateway with human review escalation", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Listen address (overrides configuration)
    #[arg(short = 'l', long)]
    listen: Option<String>,

    /// Listen port (overrides configuration)
    #[arg(short = 'P', long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    info!("Starting Warden Gateway");

    let gateway_config = GatewayConfig::load(&cli.config)?;
    let router_config = load_router_config(&cli.config)?;
    info!("Configuration loaded from {}", cli.config);

    let metrics_handle = init_metrics()?;

    // Policy subsystem: built-in policies plus the configured ordering
    let registry = Arc::new(PolicyRegistry::new());
    register_builtin_policies(&registry)?;

    // Durable stores are wired only when a database is configured; the
    // gateway still serves requests without them, with audit disabled and
    // escalations answered by synthetic review ids.
    let (audit_sink, hitl_service): (Option<Arc<dyn AuditSink>>, Option<Arc<HitlService>>) =
        match DbConfig::from_env() {
            Ok(db_config) => {
                let pool = warden_audit::connect(&db_config).await?;
                warden_audit::ensure_audit_schema(&pool).await?;
                warden_hitl::ensure_review_schema(&pool).await?;

                let audit = Arc::new(AuditService::new(AuditRepository::new(pool.clone())));
                let hitl = Arc::new(HitlService::new(Arc::new(PgReviewRepository::new(pool))));
                info!("audit and review stores enabled");
                (Some(audit), Some(hitl))
            }
            Err(e) => {
                warn!("audit and review stores disabled: {e}");
                (None, None)
            }
        };

    let engine = PolicyEngine::from_config(registry, &cli.config, audit_sink.clone())
        .map_err(|e| anyhow::anyhow!("failed to load policy configuration: {e}"))?;
    info!("Active policies: {:?}", engine.active_policies());

    let mut model_router = ModelRouter::new(router_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize model router: {e}"))?;
    if let Some(sink) = &audit_sink {
        model_router = model_router.with_audit_sink(sink.clone());
    }
    info!("Providers: {:?}", model_router.provider_names());

    let mut orchestrator = Orchestrator::new(Arc::new(engine), Arc::new(model_router));
    if let Some(hitl) = &hitl_service {
        orchestrator = orchestrator.with_hitl(hitl.clone());
    }
    if let Some(sink) = &audit_sink {
        orchestrator = orchestrator.with_audit_sink(sink.clone());
    }

    let mut state = AppState::new(Arc::new(orchestrator))
        .with_metrics_handle(metrics_handle)
        .with_review_lock_duration(Duration::from_secs(
            gateway_config.hitl.lock_duration_seconds,
        ));
    if let Some(hitl) = hitl_service {
        state = state.with_hitl(hitl);
    }

    let app = warden_gateway::routes::create_router(state);

    let host = cli.listen.unwrap_or(gateway_config.server.host);
    let port = cli.port.unwrap_or(gateway_config.server.port);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Listen for shutdown signals (SIGTERM, SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Initialize tracing/logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("warden=debug,tower_http=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warden=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Initialize metrics exporter and return the handle for rendering
fn init_metrics() -> Result<PrometheusHandle> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install metrics recorder: {e}"))?;

    metrics::describe_counter!("warden_requests_total", "Total number of requests processed");
    metrics::describe_counter!(
        "warden_decisions_total",
        "Final policy decisions by outcome"
    );
    metrics::describe_counter!("warden_errors_total", "Errors by kind");

    info!("Metrics exporter initialized");
    Ok(handle)
}
