use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use slashspot_core::Registry;
use tracing::warn;

#[derive(Clone)]
pub struct HealthState {
    registry: Arc<Registry>,
}

impl HealthState {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
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
    pub store: HealthCheck,
    pub store_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<usize>,
    pub checked_at: String,
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new().route("/health", get(health)).with_state(HealthState::new(registry))
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let store_path = state.registry.file_path().display().to_string();
    let (store, entries) = store_check(Arc::clone(&state.registry)).await;
    let ready = store.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "slashspot-server runtime initialized".to_string(),
        },
        store,
        store_path,
        entries,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn store_check(registry: Arc<Registry>) -> (HealthCheck, Option<usize>) {
    match tokio::task::spawn_blocking(move || registry.snapshot()).await {
        Ok(Ok(spots)) => (
            HealthCheck { status: "ready", detail: "spot store loaded".to_string() },
            Some(spots.len()),
        ),
        Ok(Err(error)) => {
            warn!(
                event_name = "system.health.store_degraded",
                correlation_id = "health",
                error_kind = %error.kind(),
                error = %error,
                "spot store failed to load"
            );
            (HealthCheck { status: "degraded", detail: format!("spot store failed: {error}") }, None)
        }
        Err(error) => (
            HealthCheck { status: "degraded", detail: format!("store check aborted: {error}") },
            None,
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, Json};
    use chrono::NaiveDate;
    use slashspot_core::{DateClock, Registry};
    use tempfile::TempDir;

    use crate::health::{health, HealthState};

    fn registry(dir: &TempDir) -> Arc<Registry> {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).expect("valid date");
        Arc::new(Registry::open(dir.path(), "spots.json", DateClock::fixed(today)).expect("open"))
    }

    #[tokio::test]
    async fn health_returns_ready_with_entry_count() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);
        registry.register("B1", "alice", None).expect("register");
        registry.register("B2", "bob", None).expect("register");

        let (status, Json(payload)) = health(State(HealthState::new(registry))).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(payload.status, "ready");
        assert_eq!(payload.store.status, "ready");
        assert_eq!(payload.entries, Some(2));
        assert!(payload.store_path.ends_with("spots.json"));
    }

    #[tokio::test]
    async fn health_returns_service_unavailable_when_store_is_corrupt() {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);
        fs::write(dir.path().join("spots.json"), "{ broken").expect("corrupt");

        let (status, Json(payload)) = health(State(HealthState::new(registry))).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(payload.status, "degraded");
        assert_eq!(payload.store.status, "degraded");
        assert_eq!(payload.service.status, "ready");
        assert_eq!(payload.entries, None);
    }
}
