//! # TenantConfigRepository
//!
//! テナントごとのキー・値設定を読み取るリポジトリ。
//! ワークフローモジュールの名前空間（`workflowNamespace`）の解決に使う。

use async_trait::async_trait;
use carflow_domain::tenant::TenantId;
use sqlx::PgPool;

use crate::error::InfraError;

/// テナント設定リポジトリトレイト
#[async_trait]
pub trait TenantConfigRepository: Send + Sync {
    /// 設定値を取得する。未設定なら `None`
    async fn get_config(&self, tenant_id: &TenantId, key: &str) -> Result<Option<String>, InfraError>;
}

/// PostgreSQL 実装の TenantConfigRepository
#[derive(Debug, Clone)]
pub struct PostgresTenantConfigRepository {
    pool: PgPool,
}

impl PostgresTenantConfigRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantConfigRepository for PostgresTenantConfigRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%tenant_id, %key))]
    async fn get_config(&self, tenant_id: &TenantId, key: &str) -> Result<Option<String>, InfraError> {
        let value: Option<String> = sqlx::query_scalar(
            r#"
            SELECT value
            FROM tenant_configs
            WHERE tenant_id = $1 AND key = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value.filter(|v| !v.trim().is_empty()))
    }
}
