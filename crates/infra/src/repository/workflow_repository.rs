//! # WorkflowRepository
//!
//! ワークフロー記録の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **テナント分離**: すべての検索にテナント ID を条件として含める
//! - **1 追跡対象 1 記録**: `(tenant_id, entity_type, entity_id)` の一意制約で保証し、
//!   違反は [`InfraError::conflict`] として返す
//! - **不変**: 作成後のプロセス付け替えはしないため、更新メソッドを持たない

use async_trait::async_trait;
use carflow_domain::{
    tenant::TenantId,
    tracked_entity::{TrackedEntityRef, TrackedEntityType},
    user::UserId,
    workflow::{ProcessIdentifier, WorkflowId, WorkflowRecord, WorkflowRecordRow},
};
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::InfraError;

/// ワークフロー記録リポジトリトレイト
#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    /// ワークフロー記録を新規作成する
    ///
    /// 同じ追跡対象の記録が既にある場合は `Conflict` エラー。
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), InfraError>;

    /// ID でワークフロー記録を検索
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &WorkflowId,
    ) -> Result<Option<WorkflowRecord>, InfraError>;

    /// 追跡対象でワークフロー記録を検索
    async fn find_by_entity(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
    ) -> Result<Option<WorkflowRecord>, InfraError>;
}

#[derive(Debug, FromRow)]
struct WorkflowRow {
    id:                 Uuid,
    tenant_id:          Uuid,
    entity_type:        String,
    entity_id:          Uuid,
    process_identifier: String,
    created_by:         Uuid,
    created_at:         DateTime<Utc>,
    updated_at:         DateTime<Utc>,
}

impl TryFrom<WorkflowRow> for WorkflowRecord {
    type Error = InfraError;

    fn try_from(row: WorkflowRow) -> Result<Self, Self::Error> {
        let entity_type: TrackedEntityType = row
            .entity_type
            .parse()
            .map_err(|e: carflow_domain::DomainError| InfraError::unexpected(e.to_string()))?;
        let process_identifier = ProcessIdentifier::parse(&row.process_identifier)
            .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(WorkflowRecord::from_db(WorkflowRecordRow {
            id: WorkflowId::from_uuid(row.id),
            tenant_id: TenantId::from_uuid(row.tenant_id),
            entity: TrackedEntityRef::new(entity_type, row.entity_id),
            process_identifier,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// PostgreSQL 実装の WorkflowRepository
#[derive(Debug, Clone)]
pub struct PostgresWorkflowRepository {
    pool: PgPool,
}

impl PostgresWorkflowRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowRepository for PostgresWorkflowRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %record.id(), entity = %record.entity()))]
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), InfraError> {
        let entity_type: &'static str = record.entity().entity_type.into();

        let result = sqlx::query(
            r#"
            INSERT INTO workflows (
                id, tenant_id, entity_type, entity_id, process_identifier,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id().as_uuid())
        .bind(record.tenant_id().as_uuid())
        .bind(entity_type)
        .bind(record.entity().entity_id)
        .bind(record.process_identifier().as_str())
        .bind(record.created_by().as_uuid())
        .bind(record.created_at())
        .bind(record.updated_at())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let error = InfraError::from(e);
                if error.is_unique_violation() {
                    Err(InfraError::conflict("Workflow", record.entity().to_string()))
                } else {
                    Err(error)
                }
            }
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &WorkflowId,
    ) -> Result<Option<WorkflowRecord>, InfraError> {
        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, tenant_id, entity_type, entity_id, process_identifier,
                   created_by, created_at, updated_at
            FROM workflows
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(tenant_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowRecord::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%entity))]
    async fn find_by_entity(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
    ) -> Result<Option<WorkflowRecord>, InfraError> {
        let entity_type: &'static str = entity.entity_type.into();

        let row = sqlx::query_as::<_, WorkflowRow>(
            r#"
            SELECT id, tenant_id, entity_type, entity_id, process_identifier,
                   created_by, created_at, updated_at
            FROM workflows
            WHERE tenant_id = $1 AND entity_type = $2 AND entity_id = $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(entity_type)
        .bind(entity.entity_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WorkflowRecord::try_from).transpose()
    }
}
