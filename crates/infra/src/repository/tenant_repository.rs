//! # TenantRepository
//!
//! テナント情報の取得を担当するリポジトリ。
//!
//! ## 設計方針
//!
//! - **読み取り専用**: テナントの作成・更新はこのサービスの責務外
//! - **メールアドレス検索**: 通知の宛先解決で、ユーザーが見つからない場合の
//!   フォールバックとして使う（テナント横断）

use async_trait::async_trait;
use carflow_domain::{
    tenant::{Tenant, TenantId, TenantName},
    user::Email,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::InfraError;

/// テナントリポジトリトレイト
#[async_trait]
pub trait TenantRepository: Send + Sync {
    /// ID でテナントを検索
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, InfraError>;

    /// メールアドレスでテナントを検索
    async fn find_by_email(&self, email: &Email) -> Result<Option<Tenant>, InfraError>;
}

#[derive(Debug, FromRow)]
struct TenantRow {
    id:    Uuid,
    name:  String,
    email: Option<String>,
}

impl TryFrom<TenantRow> for Tenant {
    type Error = InfraError;

    fn try_from(row: TenantRow) -> Result<Self, Self::Error> {
        let email = row
            .email
            .map(Email::new)
            .transpose()
            .map_err(|e| InfraError::unexpected(e.to_string()))?;

        Ok(Tenant::from_db(
            TenantId::from_uuid(row.id),
            TenantName::new(row.name).map_err(|e| InfraError::unexpected(e.to_string()))?,
            email,
        ))
    }
}

/// PostgreSQL 実装の TenantRepository
#[derive(Debug, Clone)]
pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%id))]
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, InfraError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, email
            FROM tenants
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tenant::try_from).transpose()
    }

    #[tracing::instrument(skip_all, level = "debug")]
    async fn find_by_email(&self, email: &Email) -> Result<Option<Tenant>, InfraError> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, email
            FROM tenants
            WHERE lower(email) = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Tenant::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PostgresTenantRepository>();
    }

    #[test]
    fn test_不正なメールアドレスの行は変換エラー() {
        let row = TenantRow {
            id:    Uuid::now_v7(),
            name:  "Garage Zuid".to_string(),
            email: Some("broken".to_string()),
        };

        assert!(Tenant::try_from(row).is_err());
    }
}
