use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::bootstrap::AppState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub status: &'static str,
    pub mode: &'static str,
    pub checked_at: String,
}

pub fn router(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        status: "ready",
        mode: if state.config.offline() { "simulation" } else { "live" },
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use axum::extract::State;
    use concierge_core::config::AppConfig;

    use crate::bootstrap::state_for_tests;
    use crate::health::health;

    #[tokio::test]
    async fn health_reports_ready_and_simulation_mode() {
        let state = state_for_tests(AppConfig::default());

        let payload = health(State(state)).await.0;

        assert!(payload.ok);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.mode, "simulation");
    }
}
