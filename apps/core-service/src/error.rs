//! # Core Service エラー定義
//!
//! Core Service 固有のエラーと、HTTP レスポンスへの変換を定義する。
//!
//! | エラー | HTTP ステータス |
//! |-------|----------------|
//! | `NotFound` | 404 |
//! | `BadRequest` | 400（添付の不正な入力を含む） |
//! | `Validation` | 422（フィールド単位のエラー付き） |
//! | `Conflict` | 409 |
//! | `Configuration` | 500（運用者向けに error ログ） |
//! | `Database` | 500 |

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carflow_domain::ConfigurationError;
use carflow_infra::{InfraError, InfraErrorKind};
use carflow_shared::{
    ErrorResponse,
    error_response::FieldErrors,
    event_log::error::{category, kind},
};
use thiserror::Error;

/// Core Service で発生するエラー
#[derive(Debug, Error)]
pub enum CoreError {
    /// リソースが見つからない
    #[error("リソースが見つかりません: {0}")]
    NotFound(String),

    /// 不正なリクエスト
    #[error("不正なリクエスト: {0}")]
    BadRequest(String),

    /// 入力検証エラー（フィールド名 → メッセージ）
    #[error("入力値が不正です")]
    Validation(FieldErrors),

    /// 競合（同一車両へのワークフロー二重登録など）
    #[error("競合が発生しました: {0}")]
    Conflict(String),

    /// テナント設定・プロセス定義の不整合
    #[error("設定エラー: {0}")]
    Configuration(#[from] ConfigurationError),

    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(InfraError),
}

impl CoreError {
    /// 単一フィールドの検証エラーを作る
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.into(), vec![message.into()]);
        Self::Validation(errors)
    }
}

impl From<InfraError> for CoreError {
    fn from(error: InfraError) -> Self {
        if let Some((entity, id)) = error.as_conflict() {
            return Self::Conflict(format!("{entity} は登録済みです: {id}"));
        }
        if let InfraErrorKind::InvalidInput(msg) = error.kind() {
            return Self::BadRequest(msg.clone());
        }
        Self::Database(error)
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let body = match self {
            CoreError::NotFound(msg) => ErrorResponse::not_found(msg),
            CoreError::BadRequest(msg) => ErrorResponse::bad_request(msg),
            CoreError::Validation(errors) => {
                ErrorResponse::validation_error("入力値が不正です", errors)
            }
            CoreError::Conflict(msg) => ErrorResponse::conflict(msg),
            CoreError::Configuration(e) => {
                tracing::error!(
                    error.category = category::CONFIGURATION,
                    error.kind = kind::MODULE_RESOLUTION,
                    "設定エラー: {}",
                    e
                );
                ErrorResponse::new(
                    "configuration-error",
                    "Configuration Error",
                    500,
                    e.to_string(),
                )
            }
            CoreError::Database(e) => {
                tracing::error!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::DATABASE,
                    "データベースエラー: {:?}",
                    e
                );
                ErrorResponse::internal_error()
            }
        };

        let status =
            StatusCode::from_u16(body.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    }
}
