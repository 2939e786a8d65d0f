use axum::Json;
use serde_json::{json, Value};

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": ctc_core::unix_timestamp(),
        "version": env!("CARGO_PKG_VERSION"),
        "service": "ctc-server"
    }))
}
