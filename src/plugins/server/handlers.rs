use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::{prelude::*, state::AppState};

#[derive(Debug, Serialize)]
pub struct HealthRes {
  pub status: &'static str,
  pub database: bool,
  pub version: &'static str,
}

pub async fn health(
  State(app): State<Arc<AppState>>,
) -> (StatusCode, Json<HealthRes>) {
  let database = match app.db.ping().await {
    Ok(()) => true,
    Err(err) => {
      warn!("Health check: database unreachable: {err}");
      false
    }
  };

  let (code, status) = if database {
    (StatusCode::OK, "ok")
  } else {
    (StatusCode::SERVICE_UNAVAILABLE, "degraded")
  };

  let version = env!("CARGO_PKG_VERSION");
  (code, Json(HealthRes { status, database, version }))
}
