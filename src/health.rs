//! Health check module
//! Provides health status for the application and its dependencies

use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{error, info};

/// Health status response
#[derive(Debug, Serialize, Clone)]
pub struct HealthStatus {
    pub status: HealthState,
    pub checks: HashMap<String, ComponentHealth>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Overall health state
#[derive(Debug, Serialize, Clone)]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Individual component health status
#[derive(Debug, Serialize, Clone)]
pub struct ComponentHealth {
    pub status: ComponentState,
    pub response_time_ms: Option<u128>,
    pub details: Option<String>,
}

/// Component state
#[derive(Debug, Serialize, Clone)]
pub enum ComponentState {
    Up,
    Down,
    Warning,
}

impl HealthStatus {
    pub fn new() -> Self {
        Self {
            status: HealthState::Healthy,
            checks: HashMap::new(),
            timestamp: chrono::Utc::now(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        matches!(self.status, HealthState::Healthy)
    }
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentHealth {
    pub fn up(response_time_ms: Option<u128>) -> Self {
        Self {
            status: ComponentState::Up,
            response_time_ms,
            details: None,
        }
    }

    pub fn down(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Down,
            response_time_ms: None,
            details,
        }
    }

    pub fn warning(details: Option<String>) -> Self {
        Self {
            status: ComponentState::Warning,
            response_time_ms: None,
            details,
        }
    }
}

/// Health checker for the application
#[derive(Clone)]
pub struct HealthChecker {
    db_pool: sqlx::PgPool,
    stripe_configured: bool,
}

impl HealthChecker {
    pub fn new(db_pool: sqlx::PgPool, stripe_configured: bool) -> Self {
        Self {
            db_pool,
            stripe_configured,
        }
    }

    /// Perform comprehensive health check
    pub async fn check_health(&self) -> HealthStatus {
        let mut health_status = HealthStatus::new();
        let mut overall_healthy = true;

        // Check database health
        match timeout(Duration::from_secs(5), check_database_health(&self.db_pool)).await {
            Ok(db_result) => match db_result {
                Ok(response_time) => {
                    health_status.checks.insert(
                        "database".to_string(),
                        ComponentHealth::up(Some(response_time)),
                    );
                    info!("Database health check: OK ({}ms)", response_time);
                }
                Err(e) => {
                    overall_healthy = false;
                    health_status.checks.insert(
                        "database".to_string(),
                        ComponentHealth::down(Some(e.to_string())),
                    );
                    error!("Database health check failed: {}", e);
                }
            },
            Err(_) => {
                overall_healthy = false;
                health_status.checks.insert(
                    "database".to_string(),
                    ComponentHealth::down(Some("Timeout".to_string())),
                );
                error!("Database health check timed out");
            }
        }

        // Stripe is a configuration check, not a network probe: an
        // unconfigured processor degrades payments but the site still serves.
        if self.stripe_configured {
            health_status
                .checks
                .insert("stripe".to_string(), ComponentHealth::up(None));
        } else {
            health_status.checks.insert(
                "stripe".to_string(),
                ComponentHealth::warning(Some("STRIPE_SECRET_KEY not set".to_string())),
            );
        }

        // Set overall status
        health_status.status = if overall_healthy {
            if self.stripe_configured {
                HealthState::Healthy
            } else {
                HealthState::Degraded
            }
        } else {
            HealthState::Unhealthy
        };

        health_status
    }
}

// Check database connectivity with a trivial query
pub async fn check_database_health(
    pool: &sqlx::PgPool,
) -> Result<u128, Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();

    match sqlx::query("SELECT 1").fetch_one(pool).await {
        Ok(_) => Ok(start.elapsed().as_millis()),
        Err(e) => Err(Box::new(e)),
    }
}
