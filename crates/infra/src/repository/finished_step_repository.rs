//! # FinishedStepRepository
//!
//! ステップ完了記録の永続化を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **高々 1 件**: `(workflow_id, step_identifier)` の一意制約と
//!   `INSERT ... ON CONFLICT DO UPDATE` で保証する
//! - **結果の判定**: 挿入か更新かは `xmax = 0` で判定する。
//!   同時に upsert した場合も、後着側は先着側の行を更新する
//! - **部分更新**: 更新時に値が無い項目は既存値を保持する
//! - **添付は別管理**: 添付ファイルは `AttachmentStore` が扱う

use async_trait::async_trait;
use carflow_domain::{
    user::UserId,
    workflow::{
        AdditionalValue,
        FinishedStep,
        FinishedStepId,
        FinishedStepRecord,
        StepIdentifier,
        UpsertOutcome,
        WorkflowId,
    },
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use crate::error::InfraError;

/// 完了記録リポジトリトレイト
#[async_trait]
pub trait FinishedStepRepository: Send + Sync {
    /// 完了記録を作成または更新する
    ///
    /// 同じ `(workflow_id, step_identifier)` の記録があれば更新し、
    /// `created_at` と ID を保持したまま作成者と `updated_at` を上書きする。
    ///
    /// # 戻り値
    ///
    /// 保存後の完了記録と、挿入・更新のどちらだったか
    async fn upsert(&self, step: &FinishedStep) -> Result<(FinishedStep, UpsertOutcome), InfraError>;

    /// ワークフローとステップ識別子で完了記録を検索
    async fn find(
        &self,
        workflow_id: &WorkflowId,
        step_identifier: &StepIdentifier,
    ) -> Result<Option<FinishedStep>, InfraError>;

    /// ワークフローの完了記録をすべて取得する（作成順）
    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<FinishedStep>, InfraError>;

    /// 完了記録を削除する
    ///
    /// 削除した場合は `true`、対象が無かった場合は `false`。
    async fn delete(&self, id: &FinishedStepId) -> Result<bool, InfraError>;
}

#[derive(Debug, FromRow)]
struct FinishedStepRow {
    id:               Uuid,
    workflow_id:      Uuid,
    step_identifier:  String,
    additional_value: Option<Json<AdditionalValue>>,
    finished_at:      Option<NaiveDate>,
    created_by:       Uuid,
    created_at:       DateTime<Utc>,
    updated_at:       DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct UpsertedRow {
    #[sqlx(flatten)]
    step:     FinishedStepRow,
    inserted: bool,
}

impl TryFrom<FinishedStepRow> for FinishedStep {
    type Error = InfraError;

    fn try_from(row: FinishedStepRow) -> Result<Self, Self::Error> {
        let step_identifier = StepIdentifier::parse(&row.step_identifier)
            .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(FinishedStep::from_db(FinishedStepRecord {
            id: FinishedStepId::from_uuid(row.id),
            workflow_id: WorkflowId::from_uuid(row.workflow_id),
            step_identifier,
            additional_value: row.additional_value.map(|Json(value)| value),
            finished_at: row.finished_at,
            created_by: UserId::from_uuid(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }
}

/// PostgreSQL 実装の FinishedStepRepository
#[derive(Debug, Clone)]
pub struct PostgresFinishedStepRepository {
    pool: PgPool,
}

impl PostgresFinishedStepRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FinishedStepRepository for PostgresFinishedStepRepository {
    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(workflow_id = %step.workflow_id(), step = %step.step_identifier())
    )]
    async fn upsert(&self, step: &FinishedStep) -> Result<(FinishedStep, UpsertOutcome), InfraError> {
        let row = sqlx::query_as::<_, UpsertedRow>(
            r#"
            INSERT INTO workflow_finished_steps (
                id, workflow_id, step_identifier, additional_value, finished_at,
                created_by, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (workflow_id, step_identifier) DO UPDATE SET
                additional_value = COALESCE(EXCLUDED.additional_value, workflow_finished_steps.additional_value),
                finished_at = COALESCE(EXCLUDED.finished_at, workflow_finished_steps.finished_at),
                created_by = EXCLUDED.created_by,
                updated_at = EXCLUDED.updated_at
            RETURNING
                id, workflow_id, step_identifier, additional_value, finished_at,
                created_by, created_at, updated_at,
                (xmax = 0) AS inserted
            "#,
        )
        .bind(step.id().as_uuid())
        .bind(step.workflow_id().as_uuid())
        .bind(step.step_identifier().as_str())
        .bind(step.additional_value().map(Json))
        .bind(step.finished_at())
        .bind(step.created_by().as_uuid())
        .bind(step.created_at())
        .bind(step.updated_at())
        .fetch_one(&self.pool)
        .await?;

        let outcome = if row.inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        };

        Ok((FinishedStep::try_from(row.step)?, outcome))
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%workflow_id, %step_identifier))]
    async fn find(
        &self,
        workflow_id: &WorkflowId,
        step_identifier: &StepIdentifier,
    ) -> Result<Option<FinishedStep>, InfraError> {
        let row = sqlx::query_as::<_, FinishedStepRow>(
            r#"
            SELECT id, workflow_id, step_identifier, additional_value, finished_at,
                   created_by, created_at, updated_at
            FROM workflow_finished_steps
            WHERE workflow_id = $1 AND step_identifier = $2
            "#,
        )
        .bind(workflow_id.as_uuid())
        .bind(step_identifier.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(FinishedStep::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%workflow_id))]
    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<FinishedStep>, InfraError> {
        let rows = sqlx::query_as::<_, FinishedStepRow>(
            r#"
            SELECT id, workflow_id, step_identifier, additional_value, finished_at,
                   created_by, created_at, updated_at
            FROM workflow_finished_steps
            WHERE workflow_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(workflow_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FinishedStep::try_from).collect()
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn delete(&self, id: &FinishedStepId) -> Result<bool, InfraError> {
        let result = sqlx::query(
            r#"
            DELETE FROM workflow_finished_steps
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresFinishedStepRepository>();
    }

    #[test]
    fn test_行から週範囲付きの完了記録を復元できる() {
        let now = DateTime::from_timestamp(1_704_844_800, 0).unwrap();
        let value: AdditionalValue = serde_json::from_value(json!({
            "from": ["2024-01-01", "2024-01-07"],
            "to": ["2024-02-01", "2024-02-07"],
        }))
        .unwrap();
        let row = FinishedStepRow {
            id: Uuid::now_v7(),
            workflow_id: Uuid::now_v7(),
            step_identifier: "trade::transportBooked".to_string(),
            additional_value: Some(Json(value.clone())),
            finished_at: None,
            created_by: Uuid::now_v7(),
            created_at: now,
            updated_at: now,
        };

        let step = FinishedStep::try_from(row).unwrap();

        assert_eq!(step.step_identifier().key(), "transportBooked");
        assert_eq!(step.additional_value(), Some(&value));
    }
}
