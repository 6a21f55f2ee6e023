//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するデータ投入ヘルパー。
//! Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use carflow_domain::{
    tenant::TenantId,
    tracked_entity::{TrackedEntityRef, TrackedEntityType},
    user::UserId,
    workflow::{NewWorkflowRecord, ProcessIdentifier, WorkflowId, WorkflowRecord},
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_704_844_800, 0).unwrap()
}

/// テナントを作成する
pub async fn insert_tenant(pool: &PgPool, email: Option<&str>) -> TenantId {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO tenants (id, name, email) VALUES ($1, 'Autohaus Test', $2)")
        .bind(id)
        .bind(email)
        .execute(pool)
        .await
        .expect("テナント作成に失敗");
    TenantId::from_uuid(id)
}

/// ユーザーを作成する
pub async fn insert_user(pool: &PgPool, tenant_id: &TenantId, email: &str) -> UserId {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id, tenant_id, email, name) VALUES ($1, $2, $3, 'Test User')")
        .bind(id)
        .bind(tenant_id.as_uuid())
        .bind(email)
        .execute(pool)
        .await
        .expect("ユーザー作成に失敗");
    UserId::from_uuid(id)
}

/// 車両を作成する
pub async fn insert_vehicle(pool: &PgPool, tenant_id: &TenantId, trashed: bool) -> TrackedEntityRef {
    let id = Uuid::now_v7();
    sqlx::query(
        r#"
        INSERT INTO vehicles (id, tenant_id, vin, make, model, notes, deleted_at)
        VALUES ($1, $2, 'WVWZZZ1JZXW000001', 'Volkswagen', 'Golf', 'internal',
                CASE WHEN $3 THEN now() ELSE NULL END)
        "#,
    )
    .bind(id)
    .bind(tenant_id.as_uuid())
    .bind(trashed)
    .execute(pool)
    .await
    .expect("車両作成に失敗");
    TrackedEntityRef::new(TrackedEntityType::Vehicle, id)
}

/// import プロセスのワークフロー記録を組み立てる（未保存）
pub fn new_workflow(tenant_id: &TenantId, entity: &TrackedEntityRef, user_id: &UserId) -> WorkflowRecord {
    WorkflowRecord::new(NewWorkflowRecord {
        id: WorkflowId::new(),
        tenant_id: tenant_id.clone(),
        entity: entity.clone(),
        process_identifier: ProcessIdentifier::new("trade", "import"),
        created_by: user_id.clone(),
        now: test_now(),
    })
}
