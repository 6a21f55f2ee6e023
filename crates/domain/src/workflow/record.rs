//! # ワークフロー記録
//!
//! 追跡対象が進捗管理に入ったときに 1 度だけ作成される永続レコード。
//! どのプロセスで追跡するか（`<namespace>::<process_key>`）を保持し、
//! 以後付け替えられることはない。

use chrono::{DateTime, Utc};

use super::identifier::ProcessIdentifier;
use crate::{tenant::TenantId, tracked_entity::TrackedEntityRef, user::UserId};

define_uuid_id! {
    /// ワークフロー ID
    pub struct WorkflowId;
}

/// ワークフロー記録エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRecord {
    id:                 WorkflowId,
    tenant_id:          TenantId,
    entity:             TrackedEntityRef,
    process_identifier: ProcessIdentifier,
    created_by:         UserId,
    created_at:         DateTime<Utc>,
    updated_at:         DateTime<Utc>,
}

/// ワークフロー記録の新規作成パラメータ
pub struct NewWorkflowRecord {
    pub id: WorkflowId,
    pub tenant_id: TenantId,
    pub entity: TrackedEntityRef,
    pub process_identifier: ProcessIdentifier,
    pub created_by: UserId,
    pub now: DateTime<Utc>,
}

/// ワークフロー記録の DB 復元パラメータ
pub struct WorkflowRecordRow {
    pub id: WorkflowId,
    pub tenant_id: TenantId,
    pub entity: TrackedEntityRef,
    pub process_identifier: ProcessIdentifier,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowRecord {
    pub fn new(params: NewWorkflowRecord) -> Self {
        Self {
            id:                 params.id,
            tenant_id:          params.tenant_id,
            entity:             params.entity,
            process_identifier: params.process_identifier,
            created_by:         params.created_by,
            created_at:         params.now,
            updated_at:         params.now,
        }
    }

    pub fn from_db(row: WorkflowRecordRow) -> Self {
        Self {
            id:                 row.id,
            tenant_id:          row.tenant_id,
            entity:             row.entity,
            process_identifier: row.process_identifier,
            created_by:         row.created_by,
            created_at:         row.created_at,
            updated_at:         row.updated_at,
        }
    }

    pub fn id(&self) -> &WorkflowId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn entity(&self) -> &TrackedEntityRef {
        &self.entity
    }

    pub fn process_identifier(&self) -> &ProcessIdentifier {
        &self.process_identifier
    }

    /// プロセスが属するモジュールの名前空間
    pub fn namespace(&self) -> &str {
        self.process_identifier.namespace()
    }

    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
