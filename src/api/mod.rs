//! HTTP API for health checks and per-chain pipeline status

use crate::chain::ChainDirectory;
use crate::config::ApiConfig;
use crate::coordination::{OutcomeTallies, OutcomeTally};
use crate::error::{RelayerError, RelayerResult};

use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub instance_id: String,
    pub directory: Arc<ChainDirectory>,
    pub tallies: Arc<OutcomeTallies>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chains", get(get_chains))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP API server
pub async fn run_server(config: ApiConfig, state: AppState) -> RelayerResult<()> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RelayerError::Internal(format!("Failed to bind {}: {}", addr, e)))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| RelayerError::Internal(format!("API server failed: {}", e)))?;

    Ok(())
}

/// Health check endpoint - basic liveness
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        instance_id: state.instance_id,
    })
}

/// Configured chains with their outcome tallies
async fn get_chains(State(state): State<AppState>) -> impl IntoResponse {
    let mut chains: Vec<ChainStatus> = state
        .directory
        .entries()
        .map(|entry| ChainStatus {
            name: entry.name.clone(),
            selector: entry.selector,
            ledger: format!("{:?}", entry.contracts.ledger),
            outcomes: state.tallies.get(&entry.name),
        })
        .collect();
    chains.sort_by(|a, b| a.name.cmp(&b.name));
    Json(ChainsResponse { chains })
}

// Response types

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    instance_id: String,
}

#[derive(Serialize)]
struct ChainStatus {
    name: String,
    selector: u64,
    ledger: String,
    outcomes: OutcomeTally,
}

#[derive(Serialize)]
struct ChainsResponse {
    chains: Vec<ChainStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainEntry;
    use crate::config::ChainContracts;
    use crate::coordination::{Outcome, SkipReason};
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use ethers::types::Address;
    use tower::ServiceExt;

    fn state() -> AppState {
        let mut directory = ChainDirectory::new();
        for (name, selector) in [("s", 2u64), ("x", 1u64)] {
            directory.insert(ChainEntry {
                name: name.into(),
                selector,
                contracts: ChainContracts {
                    ledger: Address::repeat_byte(1),
                    receiver: Address::repeat_byte(2),
                    router: Address::repeat_byte(3),
                    fee_token: Address::repeat_byte(4),
                },
            });
        }
        let tallies = Arc::new(OutcomeTallies::new());
        tallies.add("x", &Outcome::Skipped(SkipReason::UnknownDestination));
        AppState {
            instance_id: "relayer-test".into(),
            directory: Arc::new(directory),
            tallies,
        }
    }

    async fn get_json(path: &str) -> serde_json::Value {
        let response = router(state())
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let body = get_json("/health").await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["instance_id"], "relayer-test");
    }

    #[tokio::test]
    async fn test_chains_report_tallies() {
        let body = get_json("/chains").await;
        let chains = body["chains"].as_array().unwrap();
        assert_eq!(chains.len(), 2);
        assert_eq!(chains[1]["name"], "x");
        assert_eq!(chains[1]["selector"], 1);
        assert_eq!(chains[1]["outcomes"]["skipped"], 1);
        assert_eq!(chains[0]["outcomes"]["sent"], 0);
    }
}
