//! ワークフローテストビルダー
//!
//! テストコードの重複を削減するためのビルダーパターン実装。
//! 標準的なテストデータ（テナント設定・操作ユーザー・車両）と
//! モックリポジトリのセットアップを提供する。

use std::{collections::BTreeMap, sync::Arc};

use carflow_domain::{
    clock::FixedClock,
    tenant::{TenantId, WORKFLOW_NAMESPACE_KEY},
    tracked_entity::{TrackedEntity, TrackedEntityRef, TrackedEntityType},
    user::{Email, User, UserId, UserName},
    workflow::{
        NewWorkflowRecord,
        ProcessIdentifier,
        WorkflowId,
        WorkflowRecord,
        default_registry,
    },
};
use carflow_infra::{
    mock::{
        MockAttachmentStore,
        MockFinishedStepRepository,
        MockMailLogRepository,
        MockNotificationSender,
        MockTenantConfigRepository,
        MockTenantRepository,
        MockTrackedEntityRepository,
        MockUserRepository,
        MockWorkflowRepository,
    },
    repository::WorkflowRepository,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::usecase::{
    ProcessUseCaseImpl,
    TenantModuleResolver,
    WorkflowFinishedStepUseCaseImpl,
    WorkflowUseCaseImpl,
    notification::{StepNotificationService, TemplateRenderer},
};

/// ワークフローテストビルダー
///
/// モックは共有状態を持つため、SUT を構築した後もビルダー経由で
/// 保存内容を確認できる。
///
/// # 使用例
///
/// ```ignore
/// use carflow_core_service::test_utils::WorkflowTestBuilder;
///
/// #[tokio::test]
/// async fn test_example() {
///     let builder = WorkflowTestBuilder::new();
///     let record = builder.seed_workflow("import").await;
///     let sut = builder.build_finished_step_usecase();
///
///     // SUT を使ってテスト
///     let result = sut.upsert_workflow_step(...).await;
///
///     // Mock リポジトリの状態を確認
///     assert_eq!(builder.finished_step_repo().steps().len(), 1);
/// }
/// ```
pub struct WorkflowTestBuilder {
    tenant_id:          TenantId,
    user_id:            UserId,
    now:                DateTime<Utc>,
    vehicle_ref:        TrackedEntityRef,
    config_repo:        MockTenantConfigRepository,
    tenant_repo:        MockTenantRepository,
    user_repo:          MockUserRepository,
    workflow_repo:      MockWorkflowRepository,
    finished_step_repo: MockFinishedStepRepository,
    entity_repo:        MockTrackedEntityRepository,
    mail_log_repo:      MockMailLogRepository,
    attachment_store:   MockAttachmentStore,
    sender:             MockNotificationSender,
}

impl WorkflowTestBuilder {
    /// デフォルト値で新しいビルダーを作成
    ///
    /// テナントは `trade` モジュールを使い、操作ユーザー（Jan de Vries）と
    /// 車両 1 台が登録済みの状態になる。
    pub fn new() -> Self {
        let tenant_id = TenantId::new();
        let user_id = UserId::new();
        let vehicle_ref = TrackedEntityRef::new(TrackedEntityType::Vehicle, Uuid::now_v7());

        let config_repo = MockTenantConfigRepository::new();
        config_repo.set(&tenant_id, WORKFLOW_NAMESPACE_KEY, "trade");

        let user_repo = MockUserRepository::new();
        user_repo.add_user(User::from_db(
            user_id.clone(),
            tenant_id.clone(),
            Email::new("jan@dealer.nl").unwrap(),
            UserName::new("Jan de Vries").unwrap(),
        ));

        let entity_repo = MockTrackedEntityRepository::new();
        let attributes = json!({
            "id": vehicle_ref.entity_id,
            "vin": "WVWZZZ1JZXW000001",
            "license_plate": "12-ABC-3",
            "make": "Volkswagen",
            "model": "Golf",
        });
        entity_repo.add_entity(TrackedEntity::from_db(
            vehicle_ref.clone(),
            tenant_id.clone(),
            attributes.as_object().cloned().unwrap_or_default(),
            BTreeMap::new(),
            None,
        ));

        Self {
            tenant_id,
            user_id,
            now: DateTime::from_timestamp(1_704_844_800, 0).unwrap(), // 2024-01-10T00:00:00Z
            vehicle_ref,
            config_repo,
            tenant_repo: MockTenantRepository::new(),
            user_repo,
            workflow_repo: MockWorkflowRepository::new(),
            finished_step_repo: MockFinishedStepRepository::new(),
            entity_repo,
            mail_log_repo: MockMailLogRepository::new(),
            attachment_store: MockAttachmentStore::new(),
            sender: MockNotificationSender::new(),
        }
    }

    /// テナントのワークフロー名前空間を差し替える
    pub fn with_namespace(self, namespace: &str) -> Self {
        self.config_repo
            .set(&self.tenant_id, WORKFLOW_NAMESPACE_KEY, namespace);
        self
    }

    /// 通知送信者を差し替える（失敗させる場合など）
    pub fn with_sender(mut self, sender: MockNotificationSender) -> Self {
        self.sender = sender;
        self
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 登録済みの車両
    pub fn vehicle_ref(&self) -> &TrackedEntityRef {
        &self.vehicle_ref
    }

    pub fn config_repo(&self) -> &MockTenantConfigRepository {
        &self.config_repo
    }

    pub fn tenant_repo(&self) -> &MockTenantRepository {
        &self.tenant_repo
    }

    pub fn user_repo(&self) -> &MockUserRepository {
        &self.user_repo
    }

    pub fn workflow_repo(&self) -> &MockWorkflowRepository {
        &self.workflow_repo
    }

    pub fn finished_step_repo(&self) -> &MockFinishedStepRepository {
        &self.finished_step_repo
    }

    pub fn entity_repo(&self) -> &MockTrackedEntityRepository {
        &self.entity_repo
    }

    pub fn mail_log_repo(&self) -> &MockMailLogRepository {
        &self.mail_log_repo
    }

    pub fn attachment_store(&self) -> &MockAttachmentStore {
        &self.attachment_store
    }

    pub fn sender(&self) -> &MockNotificationSender {
        &self.sender
    }

    /// 登録済みの車両に対するワークフロー記録を作って保存する
    ///
    /// プロセスキーは `trade` 名前空間で修飾する。
    pub async fn seed_workflow(&self, process_key: &str) -> WorkflowRecord {
        let record = WorkflowRecord::new(NewWorkflowRecord {
            id: WorkflowId::new(),
            tenant_id: self.tenant_id.clone(),
            entity: self.vehicle_ref.clone(),
            process_identifier: ProcessIdentifier::new("trade", process_key),
            created_by: self.user_id.clone(),
            now: self.now,
        });
        self.workflow_repo.insert(&record).await.unwrap();
        record
    }

    /// 既定のモジュール一式を持つリゾルバ
    pub fn resolver(&self) -> Arc<TenantModuleResolver> {
        Arc::new(TenantModuleResolver::new(
            Arc::new(self.config_repo.clone()),
            Arc::new(default_registry().unwrap()),
        ))
    }

    pub fn build_process_usecase(&self) -> ProcessUseCaseImpl {
        ProcessUseCaseImpl::new(self.resolver())
    }

    pub fn build_workflow_usecase(&self) -> WorkflowUseCaseImpl {
        WorkflowUseCaseImpl::new(
            self.resolver(),
            Arc::new(self.workflow_repo.clone()),
            Arc::new(self.finished_step_repo.clone()),
            Arc::new(self.entity_repo.clone()),
            Arc::new(self.user_repo.clone()),
            Arc::new(self.attachment_store.clone()),
            Arc::new(FixedClock::new(self.now)),
        )
    }

    pub fn build_notification_service(&self) -> StepNotificationService {
        StepNotificationService::new(
            Arc::new(self.sender.clone()),
            TemplateRenderer::new("[CarFlow]").unwrap(),
            Arc::new(self.user_repo.clone()),
            Arc::new(self.tenant_repo.clone()),
            Arc::new(self.attachment_store.clone()),
            Arc::new(self.mail_log_repo.clone()),
            Arc::new(FixedClock::new(self.now)),
        )
    }

    pub fn build_finished_step_usecase(&self) -> WorkflowFinishedStepUseCaseImpl {
        WorkflowFinishedStepUseCaseImpl::new(
            self.resolver(),
            Arc::new(self.workflow_repo.clone()),
            Arc::new(self.finished_step_repo.clone()),
            Arc::new(self.attachment_store.clone()),
            Arc::new(self.build_notification_service()),
            Arc::new(FixedClock::new(self.now)),
        )
    }
}

impl Default for WorkflowTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use carflow_infra::repository::TenantConfigRepository;
    use pretty_assertions::assert_eq;

    use super::*;

    #[tokio::test]
    async fn test_new_tradeモジュールのテナントが設定される() {
        let builder = WorkflowTestBuilder::new();

        let namespace = builder
            .config_repo()
            .get_config(builder.tenant_id(), WORKFLOW_NAMESPACE_KEY)
            .await
            .unwrap();

        assert_eq!(namespace.as_deref(), Some("trade"));
    }

    #[tokio::test]
    async fn test_seed_workflow_登録済みの車両にワークフローを作る() {
        let builder = WorkflowTestBuilder::new();

        let record = builder.seed_workflow("export").await;

        assert_eq!(record.process_identifier().to_string(), "trade::export");
        assert_eq!(record.entity(), builder.vehicle_ref());
        assert_eq!(builder.workflow_repo().records(), vec![record]);
    }
}
