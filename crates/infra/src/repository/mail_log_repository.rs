//! # MailLogRepository
//!
//! 送信済みメールの監査ログを記録するリポジトリ。

use async_trait::async_trait;
use carflow_domain::notification::MailLog;
use sqlx::PgPool;

use crate::error::InfraError;

/// メールログリポジトリトレイト
#[async_trait]
pub trait MailLogRepository: Send + Sync {
    /// メールログを記録する
    async fn insert(&self, log: &MailLog) -> Result<(), InfraError>;
}

/// PostgreSQL 実装の MailLogRepository
#[derive(Debug, Clone)]
pub struct PostgresMailLogRepository {
    pool: PgPool,
}

impl PostgresMailLogRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MailLogRepository for PostgresMailLogRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(workflow_id = %log.workflow_id, step = %log.step_identifier))]
    async fn insert(&self, log: &MailLog) -> Result<(), InfraError> {
        sqlx::query(
            r#"
            INSERT INTO mail_logs (
                id, tenant_id, workflow_id, step_identifier, rendered_body,
                recipients, sender, subject, attachment_name, sent_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.tenant_id.as_uuid())
        .bind(log.workflow_id.as_uuid())
        .bind(&log.step_identifier)
        .bind(&log.rendered_body)
        .bind(&log.recipients)
        .bind(&log.sender)
        .bind(&log.subject)
        .bind(log.attachment_name.as_deref())
        .bind(log.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresMailLogRepository>();
    }
}
