//! # 完了記録 API ハンドラ
//!
//! ステップの完了（PUT）と取り消し（DELETE）を受け付ける。
//! 添付ファイルは JSON 内の base64 文字列で受け取る。

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use carflow_domain::{
    attachment::AttachmentKind,
    tenant::TenantId,
    user::UserId,
    workflow::{AdditionalValue, UpsertOutcome, WorkflowId},
};
use carflow_infra::attachment::UploadedFile;
use carflow_shared::ApiResponse;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::CoreError,
    usecase::{FinishedStepPayload, UpsertWorkflowStepInput, WorkflowFinishedStepUseCaseImpl},
};

/// 完了記録ハンドラの State
pub struct FinishedStepState {
    pub usecase: Arc<WorkflowFinishedStepUseCaseImpl>,
}

/// ステップのパスパラメータ
#[derive(Debug, Deserialize)]
pub struct StepPathParams {
    pub id:       Uuid,
    pub step_key: String,
}

/// 操作ユーザー指定クエリパラメータ
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    pub tenant_id: Uuid,
    pub user_id:   Uuid,
}

/// アップロードファイル
#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// フォーム上のフィールド名（例: `images`, `documents`）
    pub collection:    String,
    pub kind:          AttachmentKind,
    pub original_name: String,
    pub content_type:  String,
    /// base64（標準アルファベット、パディングあり）
    pub content:       String,
}

/// ステップ完了リクエスト
#[derive(Debug, Deserialize)]
pub struct UpsertFinishedStepRequest {
    pub finished_at:      Option<NaiveDate>,
    pub additional_value: Option<AdditionalValue>,
    pub email_recipient:  Option<String>,
    #[serde(default)]
    pub uploads:          Vec<UploadRequest>,
    /// テナント ID (内部 API 用)
    pub tenant_id:        Uuid,
    /// 操作するユーザー ID (内部 API 用)
    pub user_id:          Uuid,
}

/// ステップ完了レスポンス
#[derive(Debug, Serialize)]
pub struct UpsertFinishedStepResponse {
    pub outcome: UpsertOutcome,
}

/// 取り消しレスポンス
#[derive(Debug, Serialize)]
pub struct DeleteFinishedStepResponse {
    pub deleted: bool,
}

fn decode_uploads(uploads: Vec<UploadRequest>) -> Result<Vec<UploadedFile>, CoreError> {
    uploads
        .into_iter()
        .enumerate()
        .map(|(index, upload)| {
            if !is_media_type(&upload.content_type) {
                return Err(CoreError::invalid_field(
                    format!("uploads.{index}.content_type"),
                    format!("MIME タイプとして読めません: {}", upload.content_type),
                ));
            }
            let content = STANDARD.decode(upload.content.as_bytes()).map_err(|e| {
                CoreError::invalid_field(
                    format!("uploads.{index}.content"),
                    format!("base64 として読めません: {e}"),
                )
            })?;
            Ok(UploadedFile {
                collection: upload.collection,
                kind: upload.kind,
                original_name: upload.original_name,
                content_type: upload.content_type,
                content,
            })
        })
        .collect()
}

/// `type/subtype` の形をしているか（パラメータは問わない）
fn is_media_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or_default().trim();
    let is_token = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };
    essence
        .split_once('/')
        .is_some_and(|(type_, subtype)| is_token(type_) && is_token(subtype))
}

/// ステップを完了にする（既に完了なら更新する）
///
/// ## エンドポイント
/// PUT /internal/workflows/{id}/steps/{step_key}
///
/// 新規作成なら 201、更新なら 200 を返す。
#[tracing::instrument(skip_all, fields(id = %params.id, step_key = %params.step_key))]
pub async fn upsert_workflow_step(
    State(state): State<Arc<FinishedStepState>>,
    Path(params): Path<StepPathParams>,
    Json(req): Json<UpsertFinishedStepRequest>,
) -> Result<Response, CoreError> {
    let uploads = decode_uploads(req.uploads)?;
    let input = UpsertWorkflowStepInput {
        workflow_id: WorkflowId::from_uuid(params.id),
        step_key: params.step_key,
        payload: FinishedStepPayload {
            finished_at:      req.finished_at,
            additional_value: req.additional_value,
            email_recipient:  req.email_recipient,
        },
        uploads,
    };

    let outcome = state
        .usecase
        .upsert_workflow_step(
            &TenantId::from_uuid(req.tenant_id),
            &UserId::from_uuid(req.user_id),
            input,
        )
        .await?;

    let status = match outcome {
        UpsertOutcome::Created => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    };
    let response = ApiResponse::new(UpsertFinishedStepResponse { outcome });
    Ok((status, Json(response)).into_response())
}

/// ステップの完了を取り消す
///
/// ## エンドポイント
/// DELETE /internal/workflows/{id}/steps/{step_key}?tenant_id={tenant_id}&user_id={user_id}
#[tracing::instrument(skip_all, fields(id = %params.id, step_key = %params.step_key))]
pub async fn delete_workflow_step(
    State(state): State<Arc<FinishedStepState>>,
    Path(params): Path<StepPathParams>,
    Query(query): Query<ActorQuery>,
) -> Result<Response, CoreError> {
    let deleted = state
        .usecase
        .delete_workflow_step(
            &TenantId::from_uuid(query.tenant_id),
            &UserId::from_uuid(query.user_id),
            &WorkflowId::from_uuid(params.id),
            &params.step_key,
        )
        .await?;

    let response = ApiResponse::new(DeleteFinishedStepResponse { deleted });
    Ok((StatusCode::OK, Json(response)).into_response())
}
