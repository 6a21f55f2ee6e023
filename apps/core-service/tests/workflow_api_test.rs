//! ワークフロー API 統合テスト
//!
//! ルーター全体をモックリポジトリで組み立て、複数のエンドポイントを
//! 横断したレスポンスの整合性を検証する。
//!
//! ## テストケース
//!
//! - プロセス一覧が宣言順に返る
//! - ワークフローの作成 → 取得でプロセスツリーと追跡対象が返る
//! - 同じ車両への二重登録は 409
//! - ステップの完了 → 更新 → 取り消しでステータスが切り替わる
//! - 作成時の必須項目不足は 422 でフィールドごとのエラーを返す
//! - メール送信ステップの完了で通知が送られる
//! - base64 の添付がステップとファイルグループに現れる
//! - 名前空間に対応するモジュールがなければ 500

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode},
};
use carflow_core_service::{
    build_router,
    handler::{FinishedStepState, ProcessState, WorkflowState},
    test_utils::WorkflowTestBuilder,
};
use carflow_domain::{
    user::{Email, User, UserId, UserName},
    workflow::WorkflowRecord,
};
use pretty_assertions::assert_eq;
use serde_json::{Value as JsonValue, json};
use tower::ServiceExt;

// --- テストヘルパー ---

fn create_test_app(builder: &WorkflowTestBuilder) -> Router {
    build_router(
        Arc::new(ProcessState {
            usecase: Arc::new(builder.build_process_usecase()),
        }),
        Arc::new(WorkflowState {
            usecase: Arc::new(builder.build_workflow_usecase()),
        }),
        Arc::new(FinishedStepState {
            usecase: Arc::new(builder.build_finished_step_usecase()),
        }),
    )
}

/// レスポンスボディを JSON として解析する
async fn parse_body(response: axum::http::Response<Body>) -> JsonValue {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, JsonValue) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    (status, parse_body(response).await)
}

fn json_request(method: Method, uri: String, body: JsonValue) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get_request(uri: String) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn get_workflow_via_api(
    app: &Router,
    builder: &WorkflowTestBuilder,
    record: &WorkflowRecord,
) -> JsonValue {
    let (status, body) = send(
        app,
        get_request(format!(
            "/internal/workflows/{}?tenant_id={}",
            record.id(),
            builder.tenant_id()
        )),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["data"].clone()
}

async fn put_step_via_api(
    app: &Router,
    builder: &WorkflowTestBuilder,
    record: &WorkflowRecord,
    step_key: &str,
    payload: JsonValue,
) -> (StatusCode, JsonValue) {
    let mut body = json!({
        "tenant_id": builder.tenant_id().as_uuid(),
        "user_id": builder.user_id().as_uuid(),
    });
    if let (Some(body), Some(payload)) = (body.as_object_mut(), payload.as_object()) {
        body.extend(payload.clone());
    }
    send(
        app,
        json_request(
            Method::PUT,
            format!("/internal/workflows/{}/steps/{}", record.id(), step_key),
            body,
        ),
    )
    .await
}

async fn delete_step_via_api(
    app: &Router,
    builder: &WorkflowTestBuilder,
    record: &WorkflowRecord,
    step_key: &str,
) -> (StatusCode, JsonValue) {
    send(
        app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!(
                "/internal/workflows/{}/steps/{}?tenant_id={}&user_id={}",
                record.id(),
                step_key,
                builder.tenant_id(),
                builder.user_id()
            ))
            .body(Body::empty())
            .unwrap(),
    )
    .await
}

/// 集約 JSON からキーでステータスを探す
fn find_status<'a>(workflow: &'a JsonValue, key: &str) -> &'a JsonValue {
    workflow["process"]["subprocesses"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|subprocess| subprocess["statuses"].as_array().unwrap())
        .find(|status| status["key"] == key)
        .unwrap()
}

/// 集約 JSON からキーでステップを探す
fn find_step<'a>(workflow: &'a JsonValue, key: &str) -> &'a JsonValue {
    workflow["process"]["subprocesses"]
        .as_array()
        .unwrap()
        .iter()
        .flat_map(|subprocess| subprocess["statuses"].as_array().unwrap())
        .flat_map(|status| status["steps"].as_array().unwrap())
        .find(|step| step["key"] == key)
        .unwrap()
}

// --- テストケース ---

#[tokio::test]
async fn test_プロセス一覧を宣言順に返す() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let app = create_test_app(&builder);

    // When
    let (status, body) = send(
        &app,
        get_request(format!(
            "/internal/processes?tenant_id={}",
            builder.tenant_id()
        )),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::OK);
    let identifiers: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|process| process["identifier"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(identifiers, vec!["trade::import", "trade::export"]);
}

#[tokio::test]
async fn test_作成したワークフローを取得するとプロセスツリーと車両が返る() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let app = create_test_app(&builder);

    // When: 作成
    let (status, created) = send(
        &app,
        json_request(
            Method::POST,
            "/internal/workflows".to_string(),
            json!({
                "entity_type": "vehicle",
                "entity_id": builder.vehicle_ref().entity_id,
                "process_key": "import",
                "tenant_id": builder.tenant_id().as_uuid(),
                "user_id": builder.user_id().as_uuid(),
            }),
        ),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["process_identifier"], "trade::import");
    assert_eq!(created["data"]["entity_type"], "vehicle");

    // When: 取得
    let record = builder.workflow_repo().records().remove(0);
    let workflow = get_workflow_via_api(&app, &builder, &record).await;

    // Then
    assert_eq!(workflow["id"], created["data"]["id"]);
    assert_eq!(workflow["process"]["identifier"], "trade::import");
    assert_eq!(workflow["process"]["completed"], false);
    assert_eq!(workflow["process"]["progress"]["completed"], 0);
    assert_eq!(workflow["entity"]["attributes"]["vin"], "WVWZZZ1JZXW000001");
    assert_eq!(workflow["created_by"]["name"], "Jan de Vries");
}

#[tokio::test]
async fn test_同じ車両への二重登録は409() {
    // Given
    let builder = WorkflowTestBuilder::new();
    builder.seed_workflow("import").await;
    let app = create_test_app(&builder);

    // When
    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/internal/workflows".to_string(),
            json!({
                "entity_type": "vehicle",
                "entity_id": builder.vehicle_ref().entity_id,
                "process_key": "export",
                "tenant_id": builder.tenant_id().as_uuid(),
                "user_id": builder.user_id().as_uuid(),
            }),
        ),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);
    assert_eq!(builder.workflow_repo().records().len(), 1);
}

#[tokio::test]
async fn test_ステップの完了と取り消しでステータスが切り替わる() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let record = builder.seed_workflow("import").await;
    let app = create_test_app(&builder);

    // When: 完了
    let (status, body) = put_step_via_api(
        &app,
        &builder,
        &record,
        "hasReceivedOriginalDocuments",
        json!({"finished_at": "2024-01-10"}),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["outcome"], "created");
    let workflow = get_workflow_via_api(&app, &builder, &record).await;
    assert_eq!(find_status(&workflow, "documentsReceived")["completed"], true);
    assert_eq!(
        find_step(&workflow, "hasReceivedOriginalDocuments")["finished_at"],
        "2024-01-10"
    );

    // When: 更新
    let (status, body) = put_step_via_api(
        &app,
        &builder,
        &record,
        "hasReceivedOriginalDocuments",
        json!({"finished_at": "2024-01-12"}),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["outcome"], "updated");
    assert_eq!(builder.finished_step_repo().steps().len(), 1);

    // When: 取り消し
    let (status, body) =
        delete_step_via_api(&app, &builder, &record, "hasReceivedOriginalDocuments").await;

    // Then
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], true);
    let workflow = get_workflow_via_api(&app, &builder, &record).await;
    assert_eq!(find_status(&workflow, "documentsReceived")["completed"], false);

    // When: 2 回目の取り消し
    let (status, _) =
        delete_step_via_api(&app, &builder, &record, "hasReceivedOriginalDocuments").await;

    // Then
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_作成時の必須項目不足は422でフィールドごとに返す() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let record = builder.seed_workflow("import").await;
    let app = create_test_app(&builder);

    // When
    let (status, body) =
        put_step_via_api(&app, &builder, &record, "transportBooked", json!({})).await;

    // Then
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["additional_value"].is_array());
    assert!(body["errors"]["email_recipient"].is_array());
    assert!(builder.finished_step_repo().steps().is_empty());
}

#[tokio::test]
async fn test_メール送信ステップの完了で通知が送られる() {
    // Given
    let builder = WorkflowTestBuilder::new();
    builder.user_repo().add_user(User::from_db(
        UserId::new(),
        builder.tenant_id().clone(),
        Email::new("planner@transport.nl").unwrap(),
        UserName::new("Transport Planner").unwrap(),
    ));
    let record = builder.seed_workflow("import").await;
    let app = create_test_app(&builder);

    // When
    let (status, _) = put_step_via_api(
        &app,
        &builder,
        &record,
        "transportBooked",
        json!({
            "additional_value": {
                "from": ["2024-01-01", "2024-01-07"],
                "to": ["2024-02-01", "2024-02-07"],
            },
            "email_recipient": "planner@transport.nl",
        }),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::CREATED);
    let emails = builder.sender().sent_emails();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].to, "planner@transport.nl");
    assert_eq!(emails[0].reply_to.as_deref(), Some("jan@dealer.nl"));
    assert_eq!(builder.mail_log_repo().logs().len(), 1);
}

#[tokio::test]
async fn test_base64の添付がステップとファイルグループに現れる() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let record = builder.seed_workflow("import").await;
    let app = create_test_app(&builder);

    // When
    let (status, _) = put_step_via_api(
        &app,
        &builder,
        &record,
        "hasReceivedOriginalDocuments",
        json!({
            "finished_at": "2024-01-10",
            "uploads": [{
                "collection": "documents",
                "kind": "file",
                "original_name": "registration.pdf",
                "content_type": "application/pdf",
                "content": "JVBERi0xLjc=",
            }],
        }),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::CREATED);
    let workflow = get_workflow_via_api(&app, &builder, &record).await;
    let attachments = find_step(&workflow, "hasReceivedOriginalDocuments")["attachments"]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0]["original_name"], "registration.pdf");
    assert!(attachments[0].get("storage_key").is_none());
    assert_eq!(workflow["files"]["stepFiles"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_モジュールが解決できなければ500() {
    // Given
    let builder = WorkflowTestBuilder::new();
    let record = builder.seed_workflow("import").await;
    let builder = builder.with_namespace("leasing");
    let app = create_test_app(&builder);

    // When
    let (status, body) = send(
        &app,
        get_request(format!(
            "/internal/workflows/{}?tenant_id={}",
            record.id(),
            builder.tenant_id()
        )),
    )
    .await;

    // Then
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["title"], "Configuration Error");
}
