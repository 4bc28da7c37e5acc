//! HTTP status endpoint: liveness, recent errors, balance snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tracing::{error, info};

use swapbot_chain::{EvmClient, UtxoClient};
use swapbot_core::error::{BotError, Result};
use swapbot_core::ErrorRing;
use swapbot_db::Db;

use crate::status::gather_info;

#[derive(Clone)]
pub struct StatusState {
    pub db: Db,
    pub utxo: Arc<dyn UtxoClient>,
    pub evm: Arc<dyn EvmClient>,
    pub ring: Arc<ErrorRing>,
}

pub async fn serve_status(listen: &str, state: StatusState) -> Result<()> {
    let app = Router::new()
        .route("/ping", get(ping))
        .route("/logs", get(logs))
        .route("/info", get(info_snapshot))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| BotError::Config(format!("bind status server {listen}: {e}")))?;
    info!(listen, "status server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| BotError::Config(format!("status server: {e}")))?;
    Ok(())
}

fn ok(result: Value) -> Json<Value> {
    Json(json!({ "success": true, "result": result }))
}

fn err(message: String) -> Json<Value> {
    Json(json!({ "success": false, "error": message }))
}

async fn ping() -> Json<Value> {
    ok(json!("pong"))
}

/// Remove and return up to `n` buffered errors (default 100).
async fn logs(
    State(state): State<StatusState>,
    Query(params): Query<HashMap<String, String>>,
) -> Json<Value> {
    let n = params
        .get("n")
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(100);
    match serde_json::to_value(state.ring.drain(n)) {
        Ok(entries) => ok(entries),
        Err(e) => err(e.to_string()),
    }
}

async fn info_snapshot(State(state): State<StatusState>) -> Json<Value> {
    match gather_info(&state.db, &state.utxo, &state.evm).await {
        Ok(info) => match serde_json::to_value(&info) {
            Ok(value) => ok(value),
            Err(e) => err(e.to_string()),
        },
        Err(e) => {
            error!(error = %e, "info snapshot failed");
            err(e.to_string())
        }
    }
}
