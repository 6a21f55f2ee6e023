//! # ワークフローユースケース
//!
//! ワークフロー集約の組み立てと、ワークフロー記録の作成を行う。
//!
//! 集約はキャッシュせず、呼び出しのたびに記録・完了記録・追跡対象・添付を
//! 読み直して組み立てる。

use std::{collections::HashMap, sync::Arc};

use carflow_domain::{
    attachment::{Attachment, AttachmentOwner, AttachmentOwnerType},
    clock::Clock,
    tenant::TenantId,
    tracked_entity::TrackedEntityRef,
    user::UserId,
    workflow::{
        FinishedStep,
        NewWorkflowRecord,
        WorkflowAggregate,
        WorkflowAggregateParts,
        WorkflowId,
        WorkflowRecord,
    },
};
use carflow_infra::{
    attachment::AttachmentStore,
    repository::{
        EntityLoadOptions,
        FinishedStepRepository,
        TrackedEntityRepository,
        UserRepository,
        WorkflowRepository,
    },
};
use carflow_shared::{event_log::event, log_business_event};

use super::TenantModuleResolver;
use crate::error::CoreError;

/// ワークフロー作成の入力
#[derive(Debug, Clone)]
pub struct CreateWorkflowInput {
    pub entity:      TrackedEntityRef,
    /// テナントモジュール内のプロセスキー（例: `import`）
    pub process_key: String,
}

/// ワークフローユースケース
pub struct WorkflowUseCaseImpl {
    resolver:           Arc<TenantModuleResolver>,
    workflow_repo:      Arc<dyn WorkflowRepository>,
    finished_step_repo: Arc<dyn FinishedStepRepository>,
    entity_repo:        Arc<dyn TrackedEntityRepository>,
    user_repo:          Arc<dyn UserRepository>,
    attachment_store:   Arc<dyn AttachmentStore>,
    clock:              Arc<dyn Clock>,
}

impl WorkflowUseCaseImpl {
    pub fn new(
        resolver: Arc<TenantModuleResolver>,
        workflow_repo: Arc<dyn WorkflowRepository>,
        finished_step_repo: Arc<dyn FinishedStepRepository>,
        entity_repo: Arc<dyn TrackedEntityRepository>,
        user_repo: Arc<dyn UserRepository>,
        attachment_store: Arc<dyn AttachmentStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            workflow_repo,
            finished_step_repo,
            entity_repo,
            user_repo,
            attachment_store,
            clock,
        }
    }

    /// ワークフロー集約を組み立てる
    ///
    /// 1. テナントモジュールと読み込み計画を解決
    /// 2. ワークフロー記録・完了記録・作成者を読み込む（記録はテナントのモジュールに属すること）
    /// 3. 追跡対象を計画どおりのカラム・リレーションで読み込む（削除済みも対象）
    /// 4. 追跡対象と完了記録の添付をまとめて読み込み、集約を組み立てる
    pub async fn get_workflow(
        &self,
        tenant_id: &TenantId,
        workflow_id: &WorkflowId,
    ) -> Result<WorkflowAggregate, CoreError> {
        let module = self.resolver.resolve(tenant_id).await?;
        let plan = module.relations_plan()?;

        let record = self
            .workflow_repo
            .find_by_id(tenant_id, workflow_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("ワークフローが見つかりません: {workflow_id}")))?;
        module.ensure_owns(&record)?;

        let process = self.resolver.registry().process(record.process_identifier())?;

        let entity_ref = record.entity().clone();
        let options = EntityLoadOptions {
            columns:      plan
                .columns_to_select(entity_ref.entity_type)
                .map(<[String]>::to_vec),
            relations:    plan
                .relations(entity_ref.entity_type)
                .map(<[String]>::to_vec)
                .unwrap_or_default(),
            with_trashed: true,
        };
        let entity = self
            .entity_repo
            .load(tenant_id, &entity_ref, &options)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("追跡対象が見つかりません: {entity_ref}")))?;

        let finished_steps = self.finished_step_repo.find_by_workflow(workflow_id).await?;

        let entity_owner = AttachmentOwner::new(
            entity_ref.entity_type.attachment_owner_type(),
            entity_ref.entity_id,
        );
        let mut owners = vec![entity_owner.clone()];
        owners.extend(finished_steps.iter().map(step_owner));

        let (entity_attachments, step_attachments): (Vec<_>, Vec<_>) = self
            .attachment_store
            .find_by_owners(tenant_id, &owners)
            .await?
            .into_iter()
            .partition(|attachment| attachment.owner == entity_owner);

        let mut by_owner: HashMap<AttachmentOwner, Vec<Attachment>> = HashMap::new();
        for attachment in step_attachments {
            by_owner
                .entry(attachment.owner.clone())
                .or_default()
                .push(attachment);
        }
        let finished_steps = finished_steps
            .into_iter()
            .map(|step| {
                let own = by_owner.remove(&step_owner(&step)).unwrap_or_default();
                step.with_attachments(own)
            })
            .collect();

        let creator = self.user_repo.find_by_id(record.created_by()).await?;

        Ok(WorkflowAggregate::assemble(WorkflowAggregateParts {
            record,
            finished_steps,
            process,
            entity,
            entity_attachments,
            creator,
        }))
    }

    /// ワークフロー記録を作成する
    ///
    /// # Errors
    ///
    /// - プロセスキーがモジュールにない: `Validation`
    /// - 追跡対象が存在しない: `NotFound`
    /// - 追跡対象にワークフローが既にある: `Conflict`
    pub async fn create_workflow(
        &self,
        input: CreateWorkflowInput,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<WorkflowRecord, CoreError> {
        let module = self.resolver.resolve(&tenant_id).await?;

        if module.process(&input.process_key).is_none() {
            return Err(CoreError::invalid_field(
                "process_key",
                format!(
                    "プロセス '{}' はモジュール '{}' に存在しません",
                    input.process_key, module.namespace
                ),
            ));
        }

        if !self.entity_repo.exists(&tenant_id, &input.entity).await? {
            return Err(CoreError::NotFound(format!(
                "追跡対象が見つかりません: {}",
                input.entity
            )));
        }

        if self
            .workflow_repo
            .find_by_entity(&tenant_id, &input.entity)
            .await?
            .is_some()
        {
            return Err(CoreError::Conflict(format!(
                "追跡対象には既にワークフローがあります: {}",
                input.entity
            )));
        }

        let record = WorkflowRecord::new(NewWorkflowRecord {
            id: WorkflowId::new(),
            tenant_id,
            entity: input.entity,
            process_identifier: module.process_identifier(&input.process_key),
            created_by: user_id,
            now: self.clock.now(),
        });
        self.workflow_repo.insert(&record).await?;

        log_business_event!(
            event.category = event::category::WORKFLOW,
            event.action = event::action::WORKFLOW_CREATED,
            event.tenant_id = %record.tenant_id(),
            event.entity_type = event::entity_type::WORKFLOW,
            event.entity_id = %record.id(),
            event.actor_id = %record.created_by(),
            event.result = event::result::SUCCESS,
            workflow.process = %record.process_identifier(),
            workflow.entity = %record.entity(),
            "ワークフローを作成した"
        );

        Ok(record)
    }
}

fn step_owner(step: &FinishedStep) -> AttachmentOwner {
    AttachmentOwner::new(AttachmentOwnerType::FinishedStep, *step.id().as_uuid())
}
