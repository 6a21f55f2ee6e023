//! WorkflowRepository 統合テスト
//!
//! データベースを使用したテスト。sqlx::test マクロを使用して、
//! テストごとに専用のデータベースを作成する。
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://localhost/carflow cargo test -p carflow-infra --test workflow_repository_test -- --ignored
//! ```

mod common;

use carflow_domain::tenant::TenantId;
use carflow_infra::{
    error::InfraErrorKind,
    repository::{PostgresWorkflowRepository, WorkflowRepository},
};
use common::{insert_tenant, insert_user, insert_vehicle, new_workflow};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_作成したワークフロー記録をidと追跡対象で取得できる(pool: PgPool) {
    let tenant_id = insert_tenant(&pool, None).await;
    let user_id = insert_user(&pool, &tenant_id, "clerk@example.com").await;
    let entity = insert_vehicle(&pool, &tenant_id, false).await;
    let record = new_workflow(&tenant_id, &entity, &user_id);
    let repo = PostgresWorkflowRepository::new(pool);

    repo.insert(&record).await.unwrap();

    let by_id = repo.find_by_id(&tenant_id, record.id()).await.unwrap();
    let by_entity = repo.find_by_entity(&tenant_id, &entity).await.unwrap();
    assert_eq!(by_id.as_ref(), Some(&record));
    assert_eq!(by_entity, Some(record));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_同じ追跡対象の2件目はconflictになる(pool: PgPool) {
    let tenant_id = insert_tenant(&pool, None).await;
    let user_id = insert_user(&pool, &tenant_id, "clerk@example.com").await;
    let entity = insert_vehicle(&pool, &tenant_id, false).await;
    let repo = PostgresWorkflowRepository::new(pool);
    repo.insert(&new_workflow(&tenant_id, &entity, &user_id))
        .await
        .unwrap();

    let result = repo.insert(&new_workflow(&tenant_id, &entity, &user_id)).await;

    let err = result.unwrap_err();
    assert!(matches!(err.kind(), InfraErrorKind::Conflict { .. }));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_別テナントのワークフロー記録は取得できない(pool: PgPool) {
    let tenant_id = insert_tenant(&pool, None).await;
    let user_id = insert_user(&pool, &tenant_id, "clerk@example.com").await;
    let entity = insert_vehicle(&pool, &tenant_id, false).await;
    let record = new_workflow(&tenant_id, &entity, &user_id);
    let repo = PostgresWorkflowRepository::new(pool);
    repo.insert(&record).await.unwrap();

    let result = repo.find_by_id(&TenantId::new(), record.id()).await.unwrap();

    assert!(result.is_none());
}
