//! # Core Service サーバー
//!
//! 車両取引バックオフィスのワークフロー進捗を管理する内部サービス。
//!
//! ## 役割
//!
//! - **プロセス定義の解決**: テナント設定から使用するモジュールを決める
//! - **ワークフロー記録**: 車両などの追跡対象とプロセスの紐付け
//! - **完了記録**: ステップの完了・取り消しと添付ファイルの保存
//! - **メール通知**: メール送信可能なステップの完了時に関係者へ通知
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | 接続プールの最大接続数（デフォルト: 10） |
//! | `S3_BUCKET_NAME` | **Yes** | 添付ファイルの保存先バケット |
//! | `S3_REGION` | No | リージョン（デフォルト: `eu-west-1`） |
//! | `S3_ENDPOINT_URL` | No | MinIO 等のエンドポイント |
//! | `NOTIFICATION_BACKEND` | No | `smtp` / `ses` / `noop`（デフォルト: `noop`） |
//! | `SMTP_HOST` / `SMTP_PORT` | No | SMTP 送信先（デフォルト: `localhost:1025`） |
//! | `NOTIFICATION_FROM_ADDRESS` | No | 送信元アドレス |
//! | `NOTIFICATION_SUBJECT_PREFIX` | No | 件名の接頭辞（デフォルト: `[CarFlow]`） |
//! | `LOG_FORMAT` | No | `json` / `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! # 開発環境
//! cargo run -p carflow-core-service
//!
//! # 本番環境
//! CORE_PORT=3001 DATABASE_URL=postgres://... S3_BUCKET_NAME=... cargo run -p carflow-core-service --release
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context as _;
use axum::{Router, routing::get};
use carflow_core_service::{
    build_router,
    config::{CoreConfig, NotificationBackend, NotificationConfig},
    handler::{FinishedStepState, ProcessState, ReadinessState, WorkflowState, readiness_check},
    usecase::{
        ProcessUseCaseImpl,
        TenantModuleResolver,
        WorkflowFinishedStepUseCaseImpl,
        WorkflowUseCaseImpl,
        notification::{StepNotificationService, TemplateRenderer},
    },
};
use carflow_domain::{
    clock::{Clock, SystemClock},
    workflow::default_registry,
};
use carflow_infra::{
    attachment::{AttachmentStore, StorageAttachmentStore},
    db,
    notification::{
        NoopNotificationSender,
        NotificationSender,
        SesNotificationSender,
        SmtpNotificationSender,
    },
    repository::{
        PostgresFinishedStepRepository,
        PostgresMailLogRepository,
        PostgresTenantConfigRepository,
        PostgresTenantRepository,
        PostgresTrackedEntityRepository,
        PostgresUserRepository,
        PostgresWorkflowRepository,
    },
    s3::{self, AwsObjectStorage},
};
use carflow_shared::observability::TracingConfig;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env("core-service");
    carflow_shared::observability::init_tracing(&tracing_config);
    let _tracing_guard = tracing_config.service_span().entered();

    let config = CoreConfig::from_env().context("設定の読み込みに失敗しました")?;

    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    db::run_migrations(&pool)
        .await
        .context("マイグレーションの適用に失敗しました")?;
    tracing::info!("マイグレーションを適用しました");

    let registry = default_registry().context("プロセス定義の読み込みに失敗しました")?;
    let resolver = Arc::new(TenantModuleResolver::new(
        Arc::new(PostgresTenantConfigRepository::new(pool.clone())),
        Arc::new(registry),
    ));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let s3_client = s3::create_client(
        &config.storage.region,
        config.storage.endpoint_url.as_deref(),
    )
    .await;
    let object_storage = Arc::new(AwsObjectStorage::new(
        s3_client,
        config.storage.bucket_name.clone(),
    ));
    let attachment_store: Arc<dyn AttachmentStore> =
        Arc::new(StorageAttachmentStore::new(pool.clone(), object_storage));

    let workflow_repo = Arc::new(PostgresWorkflowRepository::new(pool.clone()));
    let finished_step_repo = Arc::new(PostgresFinishedStepRepository::new(pool.clone()));
    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));

    let notification_service = Arc::new(StepNotificationService::new(
        create_sender(&config.notification).await,
        TemplateRenderer::new(config.notification.subject_prefix.clone())
            .context("メールテンプレートの読み込みに失敗しました")?,
        user_repo.clone(),
        Arc::new(PostgresTenantRepository::new(pool.clone())),
        attachment_store.clone(),
        Arc::new(PostgresMailLogRepository::new(pool.clone())),
        clock.clone(),
    ));

    let process_state = Arc::new(ProcessState {
        usecase: Arc::new(ProcessUseCaseImpl::new(resolver.clone())),
    });
    let workflow_state = Arc::new(WorkflowState {
        usecase: Arc::new(WorkflowUseCaseImpl::new(
            resolver.clone(),
            workflow_repo.clone(),
            finished_step_repo.clone(),
            Arc::new(PostgresTrackedEntityRepository::new(pool.clone())),
            user_repo,
            attachment_store.clone(),
            clock.clone(),
        )),
    });
    let finished_step_state = Arc::new(FinishedStepState {
        usecase: Arc::new(WorkflowFinishedStepUseCaseImpl::new(
            resolver,
            workflow_repo,
            finished_step_repo,
            attachment_store,
            notification_service,
            clock,
        )),
    });
    let readiness_state = Arc::new(ReadinessState { pool });

    let app = build_router(process_state, workflow_state, finished_step_state)
        .merge(
            Router::new()
                .route("/health/ready", get(readiness_check))
                .with_state(readiness_state),
        )
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("{addr} へのバインドに失敗しました"))?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app)
        .await
        .context("サーバーエラーが発生しました")?;

    Ok(())
}

/// 設定に応じた送信バックエンドを作る
async fn create_sender(config: &NotificationConfig) -> Arc<dyn NotificationSender> {
    match config.backend {
        NotificationBackend::Smtp => {
            tracing::info!(
                host = %config.smtp_host,
                port = config.smtp_port,
                "SMTP で通知を送信します"
            );
            Arc::new(SmtpNotificationSender::new(
                &config.smtp_host,
                config.smtp_port,
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Ses => {
            tracing::info!("SES で通知を送信します");
            let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
            Arc::new(SesNotificationSender::new(
                aws_sdk_sesv2::Client::new(&aws_config),
                config.from_address.clone(),
            ))
        }
        NotificationBackend::Noop => {
            tracing::info!("通知は送信せずログのみ出力します");
            Arc::new(NoopNotificationSender::new(config.from_address.clone()))
        }
    }
}
