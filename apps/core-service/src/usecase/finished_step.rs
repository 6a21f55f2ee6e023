//! # 完了記録ユースケース
//!
//! ステップの完了（upsert）と取り消し（delete）を行う。
//!
//! ## 処理順序
//!
//! 1. テナントのモジュールからステップ定義を引く
//! 2. 既存の完了記録の有無で作成/更新の規則を選び、入力を検証する
//! 3. 完了記録を upsert する
//! 4. 保存後に添付ファイルを保存し、メール通知付きステップなら通知する
//!
//! 添付と通知は完了記録の保存後に行う。通知の失敗で完了記録は巻き戻さない。

pub mod validation;

use std::sync::Arc;

use carflow_domain::{
    ConfigurationError,
    attachment::{AttachmentOwner, AttachmentOwnerType},
    clock::Clock,
    tenant::TenantId,
    user::UserId,
    workflow::{FinishedStep, NewFinishedStep, UpsertOutcome, WorkflowId},
};
use carflow_infra::{
    attachment::{AttachmentStore, UploadedFile},
    repository::{FinishedStepRepository, WorkflowRepository},
};
use carflow_shared::{event_log::event, log_business_event};
pub use validation::{FinishedStepPayload, ValidationMode, validate_payload};

use super::{
    TenantModuleResolver,
    notification::{StepFinishedNotice, StepNotificationService},
};
use crate::error::CoreError;

/// ステップ完了の入力
#[derive(Debug)]
pub struct UpsertWorkflowStepInput {
    pub workflow_id: WorkflowId,
    /// 名前空間なしのステップキー（例: `transportBooked`）
    pub step_key:    String,
    pub payload:     FinishedStepPayload,
    pub uploads:     Vec<UploadedFile>,
}

/// 完了記録ユースケースの実装
pub struct WorkflowFinishedStepUseCaseImpl {
    resolver:             Arc<TenantModuleResolver>,
    workflow_repo:        Arc<dyn WorkflowRepository>,
    finished_step_repo:   Arc<dyn FinishedStepRepository>,
    attachment_store:     Arc<dyn AttachmentStore>,
    notification_service: Arc<StepNotificationService>,
    clock:                Arc<dyn Clock>,
}

impl WorkflowFinishedStepUseCaseImpl {
    pub fn new(
        resolver: Arc<TenantModuleResolver>,
        workflow_repo: Arc<dyn WorkflowRepository>,
        finished_step_repo: Arc<dyn FinishedStepRepository>,
        attachment_store: Arc<dyn AttachmentStore>,
        notification_service: Arc<StepNotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            workflow_repo,
            finished_step_repo,
            attachment_store,
            notification_service,
            clock,
        }
    }

    /// ステップを完了にする（既に完了なら更新する）
    ///
    /// # Errors
    ///
    /// - ステップがモジュールにない: `Configuration`
    /// - 入力が不正: `Validation`（何も書き込まない）
    /// - ワークフローがない: `NotFound`
    /// - ワークフローが別の名前空間で作られている: `Configuration`（何も書き込まない）
    pub async fn upsert_workflow_step(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
        input: UpsertWorkflowStepInput,
    ) -> Result<UpsertOutcome, CoreError> {
        let module = self.resolver.resolve(tenant_id).await?;
        let step_identifier = module.step_identifier(&input.step_key);
        let step = module
            .step(&input.step_key)
            .cloned()
            .ok_or_else(|| ConfigurationError::StepNotFound {
                identifier: step_identifier.to_string(),
            })?;

        let mode = match self
            .finished_step_repo
            .find(&input.workflow_id, &step_identifier)
            .await?
        {
            Some(_) => ValidationMode::Update,
            None => ValidationMode::Create,
        };
        validate_payload(&step, &input.payload, mode).map_err(CoreError::Validation)?;

        let record = self
            .workflow_repo
            .find_by_id(tenant_id, &input.workflow_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("ワークフローが見つかりません: {}", input.workflow_id))
            })?;
        module.ensure_owns(&record)?;
        let process = self
            .resolver
            .registry()
            .process(record.process_identifier())?;

        let FinishedStepPayload {
            finished_at,
            additional_value,
            email_recipient,
        } = input.payload;

        let (saved, outcome) = self
            .finished_step_repo
            .upsert(&FinishedStep::new(NewFinishedStep {
                workflow_id: record.id().clone(),
                step_identifier: step_identifier.clone(),
                additional_value,
                finished_at,
                created_by: user_id.clone(),
                now: self.clock.now(),
            }))
            .await?;

        let saved = if input.uploads.is_empty() {
            saved
        } else {
            let owner = AttachmentOwner::new(
                AttachmentOwnerType::FinishedStep,
                *saved.id().as_uuid(),
            );
            let attachments = self
                .attachment_store
                .save_with_files(tenant_id, &owner, input.uploads)
                .await?;
            saved.with_attachments(attachments)
        };

        let action = match outcome {
            UpsertOutcome::Created => event::action::STEP_FINISHED,
            UpsertOutcome::Updated => event::action::STEP_UPDATED,
        };
        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = action,
            event.tenant_id = %tenant_id,
            event.entity_type = event::entity_type::FINISHED_STEP,
            event.entity_id = %saved.id(),
            event.actor_id = %user_id,
            event.result = event::result::SUCCESS,
            workflow.id = %record.id(),
            workflow.step = %step_identifier,
            workflow.attachments = saved.attachments().len(),
            "ステップの完了記録を保存した"
        );

        if step.sends_email()
            && let Some(recipient) = email_recipient.as_deref()
        {
            self.notification_service
                .notify(StepFinishedNotice {
                    tenant_id,
                    actor_id: user_id,
                    process_name: &process.name,
                    step: &step,
                    finished: &saved,
                    recipient,
                })
                .await;
        }

        Ok(outcome)
    }

    /// ステップの完了を取り消す
    ///
    /// # Errors
    ///
    /// - ステップがモジュールにない: `Configuration`
    /// - ワークフローまたは完了記録がない: `NotFound`（何も変更しない）
    pub async fn delete_workflow_step(
        &self,
        tenant_id: &TenantId,
        user_id: &UserId,
        workflow_id: &WorkflowId,
        step_key: &str,
    ) -> Result<bool, CoreError> {
        let module = self.resolver.resolve(tenant_id).await?;
        let step_identifier = module.step_identifier(step_key);
        if module.step(step_key).is_none() {
            return Err(ConfigurationError::StepNotFound {
                identifier: step_identifier.to_string(),
            }
            .into());
        }

        let record = self
            .workflow_repo
            .find_by_id(tenant_id, workflow_id)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!("ワークフローが見つかりません: {workflow_id}"))
            })?;
        module.ensure_owns(&record)?;

        let finished = self
            .finished_step_repo
            .find(record.id(), &step_identifier)
            .await?
            .ok_or_else(|| {
                CoreError::NotFound(format!(
                    "完了記録が見つかりません: {} / {}",
                    record.id(),
                    step_identifier
                ))
            })?;

        let deleted = self.finished_step_repo.delete(finished.id()).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::STEP_UNFINISHED,
            event.tenant_id = %tenant_id,
            event.entity_type = event::entity_type::FINISHED_STEP,
            event.entity_id = %finished.id(),
            event.actor_id = %user_id,
            event.result = event::result::SUCCESS,
            workflow.id = %record.id(),
            workflow.step = %step_identifier,
            "ステップの完了を取り消した"
        );

        Ok(deleted)
    }
}
