//! # テスト用モック
//!
//! ユースケーステストで使用するインメモリのリポジトリ・ストア・送信者。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! carflow-infra = { workspace = true, features = ["test-utils"] }
//! ```

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use carflow_domain::{
    attachment::{Attachment, AttachmentId, AttachmentOwner},
    notification::{EmailMessage, MailLog, NotificationError},
    tenant::{Tenant, TenantId},
    tracked_entity::{TrackedEntity, TrackedEntityRef},
    user::{Email, User, UserId},
    workflow::{
        FinishedStep,
        FinishedStepId,
        FinishedStepRecord,
        StepIdentifier,
        UpsertOutcome,
        WorkflowId,
        WorkflowRecord,
    },
};
use chrono::Utc;

use crate::{
    attachment::{AttachmentStore, UploadedFile, storage_key},
    error::InfraError,
    notification::NotificationSender,
    repository::{
        EntityLoadOptions,
        FinishedStepRepository,
        MailLogRepository,
        TenantConfigRepository,
        TenantRepository,
        TrackedEntityRepository,
        UserRepository,
        WorkflowRepository,
    },
    s3::ObjectStorage,
};

// ===== MockTenantConfigRepository =====

#[derive(Clone, Default)]
pub struct MockTenantConfigRepository {
    values: Arc<Mutex<HashMap<(TenantId, String), String>>>,
}

impl MockTenantConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, tenant_id: &TenantId, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert((tenant_id.clone(), key.to_string()), value.to_string());
    }
}

#[async_trait]
impl TenantConfigRepository for MockTenantConfigRepository {
    async fn get_config(&self, tenant_id: &TenantId, key: &str) -> Result<Option<String>, InfraError> {
        Ok(self
            .values
            .lock()
            .unwrap()
            .get(&(tenant_id.clone(), key.to_string()))
            .cloned())
    }
}

// ===== MockTenantRepository =====

#[derive(Clone, Default)]
pub struct MockTenantRepository {
    tenants: Arc<Mutex<Vec<Tenant>>>,
}

impl MockTenantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, tenant: Tenant) {
        self.tenants.lock().unwrap().push(tenant);
    }
}

#[async_trait]
impl TenantRepository for MockTenantRepository {
    async fn find_by_id(&self, id: &TenantId) -> Result<Option<Tenant>, InfraError> {
        Ok(self.tenants.lock().unwrap().iter().find(|t| t.id() == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<Tenant>, InfraError> {
        Ok(self
            .tenants
            .lock()
            .unwrap()
            .iter()
            .find(|t| t.email() == Some(email))
            .cloned())
    }
}

// ===== MockUserRepository =====

#[derive(Clone, Default)]
pub struct MockUserRepository {
    users: Arc<Mutex<Vec<User>>>,
}

impl MockUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_user(&self, user: User) {
        self.users.lock().unwrap().push(user);
    }
}

#[async_trait]
impl UserRepository for MockUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, InfraError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id() == id).cloned())
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, InfraError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email() == email)
            .cloned())
    }
}

// ===== MockWorkflowRepository =====

#[derive(Clone, Default)]
pub struct MockWorkflowRepository {
    records: Arc<Mutex<Vec<WorkflowRecord>>>,
}

impl MockWorkflowRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<WorkflowRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkflowRepository for MockWorkflowRepository {
    async fn insert(&self, record: &WorkflowRecord) -> Result<(), InfraError> {
        let mut records = self.records.lock().unwrap();
        if records
            .iter()
            .any(|r| r.tenant_id() == record.tenant_id() && r.entity() == record.entity())
        {
            return Err(InfraError::conflict("Workflow", record.entity().to_string()));
        }
        records.push(record.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &WorkflowId,
    ) -> Result<Option<WorkflowRecord>, InfraError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id() == id && r.tenant_id() == tenant_id)
            .cloned())
    }

    async fn find_by_entity(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
    ) -> Result<Option<WorkflowRecord>, InfraError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.tenant_id() == tenant_id && r.entity() == entity)
            .cloned())
    }
}

// ===== MockFinishedStepRepository =====

/// テスト用のモック FinishedStepRepository
///
/// PostgreSQL 実装と同じく、更新時に値の無い項目は既存値を保持する。
#[derive(Clone, Default)]
pub struct MockFinishedStepRepository {
    steps: Arc<Mutex<Vec<FinishedStep>>>,
}

impl MockFinishedStepRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn steps(&self) -> Vec<FinishedStep> {
        self.steps.lock().unwrap().clone()
    }
}

#[async_trait]
impl FinishedStepRepository for MockFinishedStepRepository {
    async fn upsert(&self, step: &FinishedStep) -> Result<(FinishedStep, UpsertOutcome), InfraError> {
        let mut steps = self.steps.lock().unwrap();
        let existing = steps.iter().position(|s| {
            s.workflow_id() == step.workflow_id() && s.step_identifier() == step.step_identifier()
        });

        let Some(index) = existing else {
            let saved = step.clone().with_attachments(Vec::new());
            steps.push(saved.clone());
            return Ok((saved, UpsertOutcome::Created));
        };

        let current = &steps[index];
        let updated = FinishedStep::from_db(FinishedStepRecord {
            id: current.id().clone(),
            workflow_id: current.workflow_id().clone(),
            step_identifier: current.step_identifier().clone(),
            additional_value: step
                .additional_value()
                .or(current.additional_value())
                .cloned(),
            finished_at: step.finished_at().or(current.finished_at()),
            created_by: step.created_by().clone(),
            created_at: current.created_at(),
            updated_at: step.updated_at(),
        });
        steps[index] = updated.clone();
        Ok((updated, UpsertOutcome::Updated))
    }

    async fn find(
        &self,
        workflow_id: &WorkflowId,
        step_identifier: &StepIdentifier,
    ) -> Result<Option<FinishedStep>, InfraError> {
        Ok(self
            .steps
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.workflow_id() == workflow_id && s.step_identifier() == step_identifier)
            .cloned())
    }

    async fn find_by_workflow(&self, workflow_id: &WorkflowId) -> Result<Vec<FinishedStep>, InfraError> {
        Ok(self
            .steps
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.workflow_id() == workflow_id)
            .cloned()
            .collect())
    }

    async fn delete(&self, id: &FinishedStepId) -> Result<bool, InfraError> {
        let mut steps = self.steps.lock().unwrap();
        let before = steps.len();
        steps.retain(|s| s.id() != id);
        Ok(steps.len() < before)
    }
}

// ===== MockTrackedEntityRepository =====

/// テスト用のモック TrackedEntityRepository
///
/// 受け取った読み込みオプションを記録する。
#[derive(Clone, Default)]
pub struct MockTrackedEntityRepository {
    entities:      Arc<Mutex<Vec<TrackedEntity>>>,
    load_requests: Arc<Mutex<Vec<EntityLoadOptions>>>,
}

impl MockTrackedEntityRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&self, entity: TrackedEntity) {
        self.entities.lock().unwrap().push(entity);
    }

    pub fn load_requests(&self) -> Vec<EntityLoadOptions> {
        self.load_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TrackedEntityRepository for MockTrackedEntityRepository {
    async fn exists(&self, tenant_id: &TenantId, entity: &TrackedEntityRef) -> Result<bool, InfraError> {
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .any(|e| e.tenant_id() == tenant_id && e.reference() == entity && !e.is_trashed()))
    }

    async fn load(
        &self,
        tenant_id: &TenantId,
        entity: &TrackedEntityRef,
        options: &EntityLoadOptions,
    ) -> Result<Option<TrackedEntity>, InfraError> {
        self.load_requests.lock().unwrap().push(options.clone());
        Ok(self
            .entities
            .lock()
            .unwrap()
            .iter()
            .find(|e| {
                e.tenant_id() == tenant_id
                    && e.reference() == entity
                    && (options.with_trashed || !e.is_trashed())
            })
            .cloned())
    }
}

// ===== MockMailLogRepository =====

#[derive(Clone, Default)]
pub struct MockMailLogRepository {
    logs: Arc<Mutex<Vec<MailLog>>>,
}

impl MockMailLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<MailLog> {
        self.logs.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailLogRepository for MockMailLogRepository {
    async fn insert(&self, log: &MailLog) -> Result<(), InfraError> {
        self.logs.lock().unwrap().push(log.clone());
        Ok(())
    }
}

// ===== MockObjectStorage =====

#[derive(Clone, Default)]
pub struct MockObjectStorage {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn put_object(&self, key: &str, _content_type: &str, body: Vec<u8>) -> Result<(), InfraError> {
        self.objects.lock().unwrap().insert(key.to_string(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<Vec<u8>, InfraError> {
        self.object(key)
            .ok_or_else(|| InfraError::s3(format!("オブジェクトが存在しない: {key}")))
    }
}

// ===== MockAttachmentStore =====

/// テスト用のモック AttachmentStore
///
/// メタデータはメモリ上に、本体は [`MockObjectStorage`] に保存する。
#[derive(Clone, Default)]
pub struct MockAttachmentStore {
    attachments: Arc<Mutex<Vec<Attachment>>>,
    storage:     MockObjectStorage,
}

impl MockAttachmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の添付を登録する（本体も一緒に置く）
    pub fn add_attachment(&self, attachment: Attachment, content: Vec<u8>) {
        self.storage
            .objects
            .lock()
            .unwrap()
            .insert(attachment.storage_key.clone(), content);
        self.attachments.lock().unwrap().push(attachment);
    }

    pub fn attachments(&self) -> Vec<Attachment> {
        self.attachments.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttachmentStore for MockAttachmentStore {
    async fn upload_multiple_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError> {
        let mut uploaded = Vec::with_capacity(files.len());
        for file in files {
            let id = AttachmentId::new();
            let key = storage_key(tenant_id, owner, &id);
            let size_bytes = file.content.len() as i64;
            self.storage
                .put_object(&key, &file.content_type, file.content)
                .await?;
            uploaded.push(Attachment {
                id,
                tenant_id: tenant_id.clone(),
                owner: owner.clone(),
                kind: file.kind,
                collection: file.collection,
                original_name: file.original_name,
                content_type: file.content_type,
                storage_key: key,
                size_bytes,
                created_at: Utc::now(),
            });
        }
        Ok(uploaded)
    }

    async fn save_with_files(
        &self,
        tenant_id: &TenantId,
        owner: &AttachmentOwner,
        files: Vec<UploadedFile>,
    ) -> Result<Vec<Attachment>, InfraError> {
        let uploaded = self.upload_multiple_files(tenant_id, owner, files).await?;
        self.attachments
            .lock()
            .unwrap()
            .extend(uploaded.iter().cloned());
        Ok(uploaded)
    }

    async fn find_by_owners(
        &self,
        tenant_id: &TenantId,
        owners: &[AttachmentOwner],
    ) -> Result<Vec<Attachment>, InfraError> {
        Ok(self
            .attachments
            .lock()
            .unwrap()
            .iter()
            .filter(|a| &a.tenant_id == tenant_id && owners.contains(&a.owner))
            .cloned()
            .collect())
    }

    async fn read_content(&self, attachment: &Attachment) -> Result<Vec<u8>, InfraError> {
        self.storage.get_object(&attachment.storage_key).await
    }
}

// ===== MockNotificationSender =====

/// テスト用のモック NotificationSender
///
/// 送信したメールを記録する。`failing()` で常に失敗する送信者を作る。
#[derive(Clone)]
pub struct MockNotificationSender {
    from_address: String,
    sent:         Arc<Mutex<Vec<EmailMessage>>>,
    fail:         bool,
}

impl Default for MockNotificationSender {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotificationSender {
    pub fn new() -> Self {
        Self {
            from_address: "noreply@carflow.example".to_string(),
            sent:         Arc::new(Mutex::new(Vec::new())),
            fail:         false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn sent_emails(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSender for MockNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::SendFailed("モック送信失敗".to_string()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }

    fn sender_address(&self) -> &str {
        &self.from_address
    }
}
