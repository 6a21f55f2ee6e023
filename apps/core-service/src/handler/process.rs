//! # プロセス一覧 API ハンドラ

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carflow_domain::tenant::TenantId;
use carflow_shared::ApiResponse;

use super::TenantQuery;
use crate::{error::CoreError, usecase::ProcessUseCaseImpl};

/// プロセスハンドラの State
pub struct ProcessState {
    pub usecase: Arc<ProcessUseCaseImpl>,
}

/// テナントが選べるプロセスを宣言順に返す
///
/// ## エンドポイント
/// GET /internal/processes?tenant_id={tenant_id}
#[tracing::instrument(skip_all)]
pub async fn list_processes(
    State(state): State<Arc<ProcessState>>,
    Query(query): Query<TenantQuery>,
) -> Result<Response, CoreError> {
    let processes = state
        .usecase
        .get_company_processes(&TenantId::from_uuid(query.tenant_id))
        .await?;

    let response = ApiResponse::new(processes);
    Ok((StatusCode::OK, Json(response)).into_response())
}
