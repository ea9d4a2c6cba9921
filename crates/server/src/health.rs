use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use seatwise_db::DbPool;
use serde::Serialize;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    db_pool: DbPool,
    assistant_available: bool,
}

impl HealthState {
    pub fn new(db_pool: DbPool, assistant_available: bool) -> Self {
        Self { db_pool, assistant_available }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub database: HealthCheck,
    /// Informational: an unconfigured assistant does not make the service unready.
    pub assistant: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let database = database_check(&state.db_pool).await;
    let ready = database.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "seatwise-server runtime initialized".to_string(),
        },
        database,
        assistant: assistant_check(state.assistant_available),
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn assistant_check(available: bool) -> HealthCheck {
    if available {
        HealthCheck { status: "ready", detail: "model client configured".to_string() }
    } else {
        HealthCheck { status: "degraded", detail: "model client not configured".to_string() }
    }
}

async fn database_check(pool: &DbPool) -> HealthCheck {
    match sqlx::query_scalar::<_, i64>("SELECT 1").fetch_one(pool).await {
        Ok(_) => HealthCheck { status: "ready", detail: "database query succeeded".to_string() },
        Err(error) => {
            warn!(event_name = "system.health.database_degraded", error = %error, "database check failed");
            HealthCheck { status: "degraded", detail: format!("database query failed: {error}") }
        }
    }
}
