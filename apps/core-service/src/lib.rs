//! # Core Service ライブラリ
//!
//! Core Service のユースケースとハンドラを公開する。
//! テスト用に内部モジュールへのアクセスを提供する。

pub mod config;
pub mod error;
pub mod handler;
pub mod usecase;

// テストユーティリティ（内部実装、ドキュメントからは隠す）
#[cfg(any(test, feature = "test-utils"))]
#[doc(hidden)]
pub mod test_utils;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use handler::{
    FinishedStepState,
    ProcessState,
    WorkflowState,
    create_workflow,
    delete_workflow_step,
    get_workflow,
    health_check,
    list_processes,
    upsert_workflow_step,
};

/// 内部 API のルーターを組み立てる
///
/// readiness チェックは DB プールが必要なため `main` で追加する。
pub fn build_router(
    process_state: Arc<ProcessState>,
    workflow_state: Arc<WorkflowState>,
    finished_step_state: Arc<FinishedStepState>,
) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/internal/processes", get(list_processes))
        .with_state(process_state)
        .merge(
            Router::new()
                .route("/internal/workflows", post(create_workflow))
                .route("/internal/workflows/{id}", get(get_workflow))
                .with_state(workflow_state),
        )
        .merge(
            Router::new()
                .route(
                    "/internal/workflows/{id}/steps/{step_key}",
                    put(upsert_workflow_step).delete(delete_workflow_step),
                )
                .with_state(finished_step_state),
        )
}
