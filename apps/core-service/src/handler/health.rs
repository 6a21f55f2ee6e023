//! # ヘルスチェックハンドラ
//!
//! Core Service の稼働状態を確認するためのエンドポイント。
//!
//! - `GET /health`: プロセスが応答するか（liveness）
//! - `GET /health/ready`: PostgreSQL に接続できるか（readiness）
//!
//! レスポンス型は [`carflow_shared::HealthResponse`] / [`carflow_shared::ReadinessResponse`] を参照。

use std::{collections::HashMap, sync::Arc, time::Duration};

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use carflow_shared::{CheckStatus, HealthResponse, ReadinessResponse, ReadinessStatus};
use sqlx::PgPool;

/// Readiness Check 用の State
pub struct ReadinessState {
    pub pool: PgPool,
}

/// Core Service のヘルスチェックエンドポイント
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status:  "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness Check エンドポイント
///
/// 依存先が 1 つでも応答しなければ 503 を返す。
pub async fn readiness_check(State(state): State<Arc<ReadinessState>>) -> impl IntoResponse {
    let mut checks = HashMap::new();
    checks.insert("database".to_string(), check_database(&state.pool).await);

    let all_ok = checks.values().all(|s| matches!(s, CheckStatus::Ok));
    let (status, http_status) = if all_ok {
        (ReadinessStatus::Ready, StatusCode::OK)
    } else {
        (ReadinessStatus::NotReady, StatusCode::SERVICE_UNAVAILABLE)
    };

    (http_status, Json(ReadinessResponse { status, checks }))
}

/// PostgreSQL に `SELECT 1` を投げて確認する（タイムアウト: 5 秒）
async fn check_database(pool: &PgPool) -> CheckStatus {
    match tokio::time::timeout(
        Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(pool),
    )
    .await
    {
        Ok(Ok(_)) => CheckStatus::Ok,
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness check: database query failed");
            CheckStatus::Error
        }
        Err(_) => {
            tracing::warn!("readiness check: database query timed out");
            CheckStatus::Error
        }
    }
}
