//! # ワークフロー API ハンドラ
//!
//! ワークフロー記録の作成と、完了状態ツリーを含む集約の取得を行う。

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use carflow_domain::{
    attachment::{Attachment, AttachmentGroups, AttachmentKind},
    tenant::TenantId,
    tracked_entity::{TrackedEntityRef, TrackedEntityType},
    user::UserId,
    workflow::{
        AdditionalValue,
        ProcessNode,
        Progress,
        StatusCompletion,
        StatusNode,
        StepCapability,
        StepNode,
        SubprocessNode,
        WorkflowAggregate,
        WorkflowId,
        WorkflowRecord,
    },
};
use carflow_shared::ApiResponse;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use crate::{
    error::CoreError,
    usecase::{CreateWorkflowInput, WorkflowUseCaseImpl},
};

/// ワークフローハンドラの State
pub struct WorkflowState {
    pub usecase: Arc<WorkflowUseCaseImpl>,
}

/// テナント指定クエリパラメータ（GET リクエスト用）
#[derive(Debug, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Uuid,
}

/// ワークフロー作成リクエスト
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub entity_type: TrackedEntityType,
    pub entity_id:   Uuid,
    /// テナントモジュール内のプロセスキー
    pub process_key: String,
    /// テナント ID (内部 API 用)
    pub tenant_id:   Uuid,
    /// 作成するユーザー ID (内部 API 用)
    pub user_id:     Uuid,
}

/// ワークフロー記録 DTO
#[derive(Debug, Serialize)]
pub struct WorkflowRecordDto {
    pub id:                 String,
    pub entity_type:        TrackedEntityType,
    pub entity_id:          String,
    pub process_identifier: String,
    pub created_by:         String,
    pub created_at:         String,
}

impl From<WorkflowRecord> for WorkflowRecordDto {
    fn from(record: WorkflowRecord) -> Self {
        Self {
            id:                 record.id().to_string(),
            entity_type:        record.entity().entity_type,
            entity_id:          record.entity().entity_id.to_string(),
            process_identifier: record.process_identifier().to_string(),
            created_by:         record.created_by().to_string(),
            created_at:         record.created_at().to_rfc3339(),
        }
    }
}

/// 進捗 DTO
#[derive(Debug, Serialize)]
pub struct ProgressDto {
    pub completed:  usize,
    pub total:      usize,
    pub percentage: u8,
}

impl From<Progress> for ProgressDto {
    fn from(progress: Progress) -> Self {
        Self {
            completed:  progress.completed,
            total:      progress.total,
            percentage: progress.percentage(),
        }
    }
}

/// 添付 DTO（ストレージキーは返さない）
#[derive(Debug, Serialize)]
pub struct AttachmentDto {
    pub id:            String,
    pub kind:          AttachmentKind,
    pub collection:    String,
    pub original_name: String,
    pub content_type:  String,
    pub size_bytes:    i64,
    pub created_at:    DateTime<Utc>,
}

impl From<&Attachment> for AttachmentDto {
    fn from(attachment: &Attachment) -> Self {
        Self {
            id:            attachment.id.to_string(),
            kind:          attachment.kind,
            collection:    attachment.collection.clone(),
            original_name: attachment.original_name.clone(),
            content_type:  attachment.content_type.clone(),
            size_bytes:    attachment.size_bytes,
            created_at:    attachment.created_at,
        }
    }
}

fn attachment_groups(groups: &AttachmentGroups) -> BTreeMap<String, Vec<AttachmentDto>> {
    groups
        .iter()
        .map(|(name, attachments)| {
            (
                name.clone(),
                attachments.iter().map(AttachmentDto::from).collect(),
            )
        })
        .collect()
}

/// ステップ DTO
#[derive(Debug, Serialize)]
pub struct StepDto {
    pub key:              String,
    pub identifier:       String,
    pub name:             String,
    pub modal:            Option<String>,
    pub capabilities:     Vec<StepCapability>,
    pub completed:        bool,
    pub finished_at:      Option<NaiveDate>,
    pub additional_value: Option<AdditionalValue>,
    pub finished_by:      Option<String>,
    pub attachments:      Vec<AttachmentDto>,
}

impl From<&StepNode> for StepDto {
    fn from(step: &StepNode) -> Self {
        let finished = step.finished();
        Self {
            key:              step.key().to_string(),
            identifier:       step.identifier().to_string(),
            name:             step.name().to_string(),
            modal:            step.definition().modal.clone(),
            capabilities:     step.definition().capabilities.clone(),
            completed:        step.is_completed(),
            finished_at:      step.finished_at(),
            additional_value: step.additional_value().cloned(),
            finished_by:      finished.map(|f| f.created_by().to_string()),
            attachments:      finished
                .map(|f| f.attachments().iter().map(AttachmentDto::from).collect())
                .unwrap_or_default(),
        }
    }
}

/// ステータス DTO
#[derive(Debug, Serialize)]
pub struct StatusDto {
    pub key:        String,
    pub name:       String,
    pub completion: StatusCompletion,
    pub completed:  bool,
    pub progress:   ProgressDto,
    pub steps:      Vec<StepDto>,
}

impl From<&StatusNode> for StatusDto {
    fn from(status: &StatusNode) -> Self {
        Self {
            key:        status.key().to_string(),
            name:       status.name().to_string(),
            completion: status.completion(),
            completed:  status.is_completed(),
            progress:   status.progress().into(),
            steps:      status.steps().iter().map(StepDto::from).collect(),
        }
    }
}

/// サブプロセス DTO
#[derive(Debug, Serialize)]
pub struct SubprocessDto {
    pub key:       String,
    pub name:      String,
    pub completed: bool,
    pub progress:  ProgressDto,
    pub statuses:  Vec<StatusDto>,
}

impl From<&SubprocessNode> for SubprocessDto {
    fn from(subprocess: &SubprocessNode) -> Self {
        Self {
            key:       subprocess.key().to_string(),
            name:      subprocess.name().to_string(),
            completed: subprocess.is_completed(),
            progress:  subprocess.progress().into(),
            statuses:  subprocess.statuses().iter().map(StatusDto::from).collect(),
        }
    }
}

/// プロセス DTO
#[derive(Debug, Serialize)]
pub struct ProcessDto {
    pub key:          String,
    pub identifier:   String,
    pub name:         String,
    pub completed:    bool,
    pub progress:     ProgressDto,
    pub subprocesses: Vec<SubprocessDto>,
}

impl From<&ProcessNode> for ProcessDto {
    fn from(process: &ProcessNode) -> Self {
        Self {
            key:          process.key().to_string(),
            identifier:   process.snapshot().record().process_identifier().to_string(),
            name:         process.name().to_string(),
            completed:    process.is_completed(),
            progress:     process.progress().into(),
            subprocesses: process
                .subprocesses()
                .iter()
                .map(SubprocessDto::from)
                .collect(),
        }
    }
}

/// 追跡対象 DTO
#[derive(Debug, Serialize)]
pub struct EntityDto {
    pub entity_type: TrackedEntityType,
    pub entity_id:   String,
    pub attributes:  JsonMap<String, JsonValue>,
    pub relations:   BTreeMap<String, JsonValue>,
    pub trashed:     bool,
}

/// 作成者 DTO
#[derive(Debug, Serialize)]
pub struct CreatorDto {
    pub id:   String,
    pub name: String,
}

/// ワークフロー集約 DTO
#[derive(Debug, Serialize)]
pub struct WorkflowDto {
    pub id:         String,
    pub entity:     EntityDto,
    pub process:    ProcessDto,
    pub images:     BTreeMap<String, Vec<AttachmentDto>>,
    pub files:      BTreeMap<String, Vec<AttachmentDto>>,
    pub created_by: Option<CreatorDto>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&WorkflowAggregate> for WorkflowDto {
    fn from(aggregate: &WorkflowAggregate) -> Self {
        let record = aggregate.record();
        let entity = aggregate.entity();
        Self {
            id:         aggregate.workflow_id().to_string(),
            entity:     EntityDto {
                entity_type: entity.entity_type(),
                entity_id:   entity.reference().entity_id.to_string(),
                attributes:  entity.attributes().clone(),
                relations:   entity.relations().clone(),
                trashed:     entity.is_trashed(),
            },
            process:    aggregate.process().into(),
            images:     attachment_groups(aggregate.images()),
            files:      attachment_groups(aggregate.files()),
            created_by: aggregate.creator().map(|user| CreatorDto {
                id:   user.id().to_string(),
                name: user.name().as_str().to_string(),
            }),
            created_at: record.created_at().to_rfc3339(),
            updated_at: record.updated_at().to_rfc3339(),
        }
    }
}

/// ワークフローを作成する
///
/// ## エンドポイント
/// POST /internal/workflows
#[tracing::instrument(skip_all)]
pub async fn create_workflow(
    State(state): State<Arc<WorkflowState>>,
    Json(req): Json<CreateWorkflowRequest>,
) -> Result<Response, CoreError> {
    let input = CreateWorkflowInput {
        entity:      TrackedEntityRef::new(req.entity_type, req.entity_id),
        process_key: req.process_key,
    };

    let record = state
        .usecase
        .create_workflow(
            input,
            TenantId::from_uuid(req.tenant_id),
            UserId::from_uuid(req.user_id),
        )
        .await?;

    let response = ApiResponse::new(WorkflowRecordDto::from(record));
    Ok((StatusCode::CREATED, Json(response)).into_response())
}

/// ワークフロー集約を取得する
///
/// ## エンドポイント
/// GET /internal/workflows/{id}?tenant_id={tenant_id}
#[tracing::instrument(skip_all, fields(%id))]
pub async fn get_workflow(
    State(state): State<Arc<WorkflowState>>,
    Path(id): Path<Uuid>,
    Query(query): Query<TenantQuery>,
) -> Result<Response, CoreError> {
    let aggregate = state
        .usecase
        .get_workflow(
            &TenantId::from_uuid(query.tenant_id),
            &WorkflowId::from_uuid(id),
        )
        .await?;

    let response = ApiResponse::new(WorkflowDto::from(&aggregate));
    Ok((StatusCode::OK, Json(response)).into_response())
}
