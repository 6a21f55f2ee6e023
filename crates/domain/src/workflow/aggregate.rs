//! # ワークフロー集約
//!
//! 画面表示用に組み立てる読み取り専用の集約。
//! 追跡対象、プロセスツリー、添付グループをまとめて持つ。
//! 永続化もキャッシュもせず、読み取りのたびに組み立て直す。

use std::sync::Arc;

use super::{
    definition::ProcessDefinition,
    finished_step::FinishedStep,
    progress::{ProcessNode, WorkflowSnapshot},
    record::{WorkflowId, WorkflowRecord},
};
use crate::{
    attachment::{Attachment, AttachmentGroups, group_attachments},
    tracked_entity::{TrackedEntity, TrackedEntityType},
    user::User,
};

/// 集約の構成要素
pub struct WorkflowAggregateParts {
    pub record: WorkflowRecord,
    pub finished_steps: Vec<FinishedStep>,
    pub process: Arc<ProcessDefinition>,
    pub entity: TrackedEntity,
    pub entity_attachments: Vec<Attachment>,
    pub creator: Option<User>,
}

/// ワークフロー集約
#[derive(Debug)]
pub struct WorkflowAggregate {
    entity:  TrackedEntity,
    process: ProcessNode,
    creator: Option<User>,
    images:  AttachmentGroups,
    files:   AttachmentGroups,
}

impl WorkflowAggregate {
    /// 構成要素から集約を組み立てる
    ///
    /// 完了記録の添付は `stepImages` / `stepFiles` に、追跡対象の添付は
    /// コレクション名ごとのグループに振り分ける。
    pub fn assemble(parts: WorkflowAggregateParts) -> Self {
        let step_attachments: Vec<Attachment> = parts
            .finished_steps
            .iter()
            .flat_map(|step| step.attachments().iter().cloned())
            .collect();
        let (images, files) = group_attachments(parts.entity_attachments, step_attachments);

        let snapshot = Arc::new(WorkflowSnapshot::new(parts.record, parts.finished_steps));

        Self {
            entity: parts.entity,
            process: ProcessNode::new(parts.process, snapshot),
            creator: parts.creator,
            images,
            files,
        }
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        self.record().id()
    }

    pub fn record(&self) -> &WorkflowRecord {
        self.process.snapshot().record()
    }

    pub fn entity(&self) -> &TrackedEntity {
        &self.entity
    }

    pub fn entity_type(&self) -> TrackedEntityType {
        self.entity.entity_type()
    }

    pub fn process(&self) -> &ProcessNode {
        &self.process
    }

    pub fn creator(&self) -> Option<&User> {
        self.creator.as_ref()
    }

    pub fn images(&self) -> &AttachmentGroups {
        &self.images
    }

    pub fn files(&self) -> &AttachmentGroups {
        &self.files
    }
}
