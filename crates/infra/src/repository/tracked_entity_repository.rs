//! # TrackedEntityRepository
//!
//! ワークフローで追跡する車両を読み込むリポジトリ。
//!
//! ## 設計方針
//!
//! - **タグで分岐**: テーブル名とリレーション定義は [`TrackedEntityType`] から
//!   静的に決まる。SQL に外部入力の識別子を埋め込まない
//! - **カラム選択**: 行は `to_jsonb` で取得し、要求されたカラムだけを残す
//! - **ソフトデリート**: `with_trashed` のときは削除済みの車両も返す

use std::collections::BTreeMap;

use async_trait::async_trait;
use carflow_domain::{
    tenant::TenantId,
    tracked_entity::{TrackedEntity, TrackedEntityRef, TrackedEntityType},
};
use chrono::{DateTime, Utc};
use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::InfraError;

/// 追跡対象の読み込みオプション
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityLoadOptions {
    /// 読み込むカラム。`None` なら全カラム
    pub columns:      Option<Vec<String>>,
    /// 読み込むリレーション名
    pub relations:    Vec<String>,
    /// ソフトデリート済みも対象にするか
    pub with_trashed: bool,
}

/// 追跡対象リポジトリトレイト
#[async_trait]
pub trait TrackedEntityRepository: Send + Sync {
    /// 追跡対象が（削除されずに）存在するか
    async fn exists(&self, tenant_id: &TenantId, entity: &TrackedEntityRef) -> Result<bool, InfraError>;

    /// 追跡対象を読み込む
    async fn load(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
        options: &EntityLoadOptions,
    ) -> Result<Option<TrackedEntity>, InfraError>;
}

/// リレーションの結合方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelationJoin {
    /// 相手テーブルが外部キーを持つ（1 件）
    HasOne {
        table:       &'static str,
        foreign_key: &'static str,
    },
    /// 自テーブルが外部キーを持つ
    BelongsTo {
        table:       &'static str,
        foreign_key: &'static str,
    },
}

/// 種別ごとに読み込めるリレーション
fn relation_join(entity_type: TrackedEntityType, name: &str) -> Option<RelationJoin> {
    match (entity_type, name) {
        (TrackedEntityType::Vehicle, "purchase") => Some(RelationJoin::HasOne {
            table:       "vehicle_purchases",
            foreign_key: "vehicle_id",
        }),
        (TrackedEntityType::Vehicle, "sale") => Some(RelationJoin::HasOne {
            table:       "vehicle_sales",
            foreign_key: "vehicle_id",
        }),
        (TrackedEntityType::ServiceVehicle, "owner") => Some(RelationJoin::BelongsTo {
            table:       "customers",
            foreign_key: "customer_id",
        }),
        _ => None,
    }
}

impl RelationJoin {
    fn query(self, parent_table: &str) -> String {
        match self {
            Self::HasOne { table, foreign_key } => format!(
                "SELECT to_jsonb(r) FROM {table} r WHERE r.{foreign_key} = $1 ORDER BY r.created_at DESC LIMIT 1"
            ),
            Self::BelongsTo { table, foreign_key } => format!(
                "SELECT to_jsonb(r) FROM {table} r JOIN {parent_table} p ON p.{foreign_key} = r.id WHERE p.id = $1"
            ),
        }
    }
}

/// 要求されたカラムだけを残す
fn select_columns(mut data: JsonMap<String, JsonValue>, columns: Option<&[String]>) -> JsonMap<String, JsonValue> {
    if let Some(columns) = columns {
        data.retain(|key, _| columns.iter().any(|c| c == key));
    }
    data
}

#[derive(Debug, FromRow)]
struct EntityRow {
    data:       JsonValue,
    tenant_id:  Uuid,
    deleted_at: Option<DateTime<Utc>>,
}

/// PostgreSQL 実装の TrackedEntityRepository
#[derive(Debug, Clone)]
pub struct PostgresTrackedEntityRepository {
    pool: PgPool,
}

impl PostgresTrackedEntityRepository {
    /// 新しいリポジトリインスタンスを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_relation(&self, entity: &TrackedEntityRef, name: &str) -> Result<JsonValue, InfraError> {
        let join = relation_join(entity.entity_type, name).ok_or_else(|| {
            InfraError::unexpected(format!(
                "{} に未定義のリレーション: {name}",
                entity.entity_type
            ))
        })?;

        let value: Option<JsonValue> = sqlx::query_scalar(&join.query(entity.entity_type.table_name()))
            .bind(entity.entity_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value.unwrap_or(JsonValue::Null))
    }
}

#[async_trait]
impl TrackedEntityRepository for PostgresTrackedEntityRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%entity))]
    async fn exists(&self, tenant_id: &TenantId, entity: &TrackedEntityRef) -> Result<bool, InfraError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL)",
            entity.entity_type.table_name()
        );

        let exists: bool = sqlx::query_scalar(&sql)
            .bind(entity.entity_id)
            .bind(tenant_id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%entity, with_trashed = options.with_trashed))]
    async fn load(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
        options: &EntityLoadOptions,
    ) -> Result<Option<TrackedEntity>, InfraError> {
        let mut sql = format!(
            "SELECT to_jsonb(v) AS data, v.tenant_id, v.deleted_at FROM {} v WHERE v.id = $1 AND v.tenant_id = $2",
            entity.entity_type.table_name()
        );
        if !options.with_trashed {
            sql.push_str(" AND v.deleted_at IS NULL");
        }

        let Some(row) = sqlx::query_as::<_, EntityRow>(&sql)
            .bind(entity.entity_id)
            .bind(tenant_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let JsonValue::Object(data) = row.data else {
            return Err(InfraError::unexpected(format!("{entity} の行がオブジェクトではない")));
        };

        let mut relations = BTreeMap::new();
        for name in &options.relations {
            relations.insert(name.clone(), self.load_relation(entity, name).await?);
        }

        Ok(Some(TrackedEntity::from_db(
            entity.clone(),
            TenantId::from_uuid(row.tenant_id),
            select_columns(data, options.columns.as_deref()),
            relations,
            row.deleted_at,
        )))
    }
}
