use axum::{
    routing::{get, post},
    Json, Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

use brightfold_backend::api;
use brightfold_backend::config::AppConfig;
use brightfold_backend::database;
use brightfold_backend::database::repository::{BillingStore, PgBillingStore};
use brightfold_backend::health::{HealthChecker, HealthStatus};
use brightfold_backend::logging::init_tracing;
use brightfold_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use brightfold_backend::services::payment_intents::PaymentIntentService;
use brightfold_backend::services::reconciliation::ReconciliationService;
use brightfold_backend::services::webhook_processor::WebhookProcessor;
use brightfold_backend::stripe::client::StripeClient;
use brightfold_backend::stripe::gateway::PaymentGateway;

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        "🚀 Starting Brightfold backend service"
    );

    // Initialize database connection pool
    info!("📊 Initializing database connection pool...");
    let db_pool = database::init_pool_from_config(&config.database)
        .await
        .map_err(|e| {
            error!("Failed to initialize database pool: {}", e);
            anyhow::anyhow!(e.to_string())
        })?;
    info!("✅ Database connection pool initialized");

    // Initialize Stripe client. Missing keys degrade the payment endpoints
    // to "not configured" errors rather than failing startup.
    let stripe_client = StripeClient::from_env().map_err(|e| {
        error!("Failed to initialize Stripe client: {}", e);
        anyhow::anyhow!(e.to_string())
    })?;
    if stripe_client.is_configured() {
        info!("✅ Stripe client initialized");
    } else {
        info!("⚠️  STRIPE_SECRET_KEY not set, payment endpoints will report not-configured");
    }

    let stripe_configured = stripe_client.is_configured();
    let gateway: Arc<dyn PaymentGateway> = Arc::new(stripe_client);
    let store: Arc<dyn BillingStore> = Arc::new(PgBillingStore::new(db_pool.clone()));

    let intents = Arc::new(PaymentIntentService::new(gateway.clone(), store.clone()));
    let reconciliation = Arc::new(ReconciliationService::new(store.clone()));
    let webhook_processor = Arc::new(WebhookProcessor::new(
        gateway,
        store,
        reconciliation.clone(),
    ));

    // Initialize health checker
    let health_checker = HealthChecker::new(db_pool.clone(), stripe_configured);

    info!("🛣️  Setting up application routes...");

    let payments_routes = Router::new()
        .route("/api/payments/intent", post(api::payments::create_project_intent))
        .with_state(api::payments::PaymentsState {
            intents: intents.clone(),
        });

    let invoices_routes = Router::new()
        .route(
            "/api/invoices/payment-intent",
            post(api::invoices::create_invoice_intent),
        )
        .route("/api/invoices/payment", post(api::invoices::update_invoice_payment))
        .with_state(api::invoices::InvoicesState {
            intents,
            reconciliation,
        });

    let webhook_routes = Router::new()
        .route("/webhooks/stripe", post(api::webhooks::handle_stripe_webhook))
        .with_state(Arc::new(api::webhooks::WebhookState {
            processor: webhook_processor,
        }));

    let app = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/health/live", get(liveness))
        .merge(payments_routes)
        .merge(invoices_routes)
        .merge(webhook_routes)
        .with_state(AppState { health_checker })
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
                .layer(axum::middleware::from_fn(request_logging_middleware))
                .layer(PropagateRequestIdLayer::x_request_id()),
        );

    info!("✅ Routes configured");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("❌ Failed to bind to address {}: {}", addr, e);
        e
    })?;

    info!(address = %addr, "🚀 Server listening on http://{}", addr);
    info!("✅ Server is ready to accept connections");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 Server shutdown complete");

    Ok(())
}

// Application state
#[derive(Clone)]
struct AppState {
    health_checker: HealthChecker,
}

// Handlers
async fn root() -> &'static str {
    "Welcome to Brightfold Backend API"
}

async fn health(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    let health_status = state.health_checker.check_health().await;

    // Return 503 if any required component is unhealthy
    if matches!(
        health_status.status,
        brightfold_backend::health::HealthState::Unhealthy
    ) {
        error!("❌ Health check failed - service unhealthy");
        Err((
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        Ok(Json(health_status))
    }
}

/// Readiness probe - checks if the service is ready to accept traffic
async fn readiness(
    state: axum::extract::State<AppState>,
) -> Result<Json<HealthStatus>, (axum::http::StatusCode, String)> {
    health(state).await
}

/// Liveness probe - checks if the service is alive (basic check)
async fn liveness() -> &'static str {
    "OK"
}
