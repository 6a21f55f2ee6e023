//! TrackedEntityRepository 統合テスト
//!
//! 実行方法:
//! ```bash
//! DATABASE_URL=postgres://localhost/carflow cargo test -p carflow-infra --test tracked_entity_repository_test -- --ignored
//! ```

mod common;

use carflow_infra::repository::{
    EntityLoadOptions,
    PostgresTrackedEntityRepository,
    TrackedEntityRepository,
};
use common::{insert_tenant, insert_vehicle};
use pretty_assertions::assert_eq;
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_指定カラムとリレーションだけを読み込む(pool: PgPool) {
    let tenant_id = insert_tenant(&pool, None).await;
    let entity = insert_vehicle(&pool, &tenant_id, false).await;
    sqlx::query("INSERT INTO vehicle_purchases (id, vehicle_id, supplier) VALUES ($1, $2, 'Dealer BV')")
        .bind(Uuid::now_v7())
        .bind(entity.entity_id)
        .execute(&pool)
        .await
        .unwrap();
    let repo = PostgresTrackedEntityRepository::new(pool);
    let options = EntityLoadOptions {
        columns:      Some(vec!["vin".to_string(), "make".to_string()]),
        relations:    vec!["purchase".to_string(), "sale".to_string()],
        with_trashed: true,
    };

    let loaded = repo.load(&tenant_id, &entity, &options).await.unwrap().unwrap();

    assert_eq!(loaded.attributes().len(), 2);
    assert_eq!(loaded.attribute("make"), Some(&json!("Volkswagen")));
    assert!(loaded.attribute("notes").is_none());
    assert_eq!(loaded.relation("purchase").and_then(|p| p.get("supplier")), Some(&json!("Dealer BV")));
    assert_eq!(loaded.relation("sale"), Some(&json!(null)));
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "DATABASE_URL が必要"]
async fn test_削除済みの車両はwith_trashedのときだけ読み込む(pool: PgPool) {
    let tenant_id = insert_tenant(&pool, None).await;
    let entity = insert_vehicle(&pool, &tenant_id, true).await;
    let repo = PostgresTrackedEntityRepository::new(pool);

    let without = repo
        .load(&tenant_id, &entity, &EntityLoadOptions::default())
        .await
        .unwrap();
    let with = repo
        .load(
            &tenant_id,
            &entity,
            &EntityLoadOptions {
                with_trashed: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert!(without.is_none());
    assert!(with.is_some_and(|e| e.is_trashed()));
    assert!(!repo.exists(&tenant_id, &entity).await.unwrap());
}
