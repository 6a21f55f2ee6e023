//! # ワークフロー
//!
//! 追跡対象ごとの業務プロセスの進捗を管理する。
//!
//! ## 概念モデル
//!
//! - **ProcessDefinition**: Process → Subprocess → Status → Step の宣言（テナントごとに固定）
//! - **TenantModule / ModuleRegistry**: 名前空間ごとのプロセス一式と、その検索
//! - **WorkflowRecord**: 追跡対象がどのプロセスで追跡されているかの永続レコード
//! - **FinishedStep**: ステップ完了の永続レコード（ワークフロー × ステップで高々 1 件）
//! - **ProcessNode**: 定義と完了記録を結び付けた完了状態ツリー
//! - **WorkflowAggregate**: 表示用に組み立てる読み取り専用の集約
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//!
//! use carflow_domain::{
//!     tenant::TenantId,
//!     tracked_entity::{TrackedEntityRef, TrackedEntityType},
//!     user::UserId,
//!     workflow::{
//!         NewWorkflowRecord, ProcessNode, WorkflowId, WorkflowRecord, WorkflowSnapshot,
//!         default_registry,
//!     },
//! };
//!
//! let registry = default_registry()?;
//! let module = registry.module("trade")?;
//! let identifier = module.process_identifier("import");
//!
//! let record = WorkflowRecord::new(NewWorkflowRecord {
//!     id: WorkflowId::new(),
//!     tenant_id: TenantId::new(),
//!     entity: TrackedEntityRef::new(TrackedEntityType::Vehicle, uuid::Uuid::now_v7()),
//!     process_identifier: identifier.clone(),
//!     created_by: UserId::new(),
//!     now: chrono::Utc::now(),
//! });
//!
//! let process = ProcessNode::new(
//!     registry.process(&identifier)?,
//!     Arc::new(WorkflowSnapshot::new(record, Vec::new())),
//! );
//! assert!(!process.is_completed());
//! # Ok(())
//! # }
//! ```

mod aggregate;
mod catalog;
mod definition;
mod definition_validator;
mod finished_step;
mod identifier;
mod progress;
mod record;
mod registry;

pub use aggregate::*;
pub use catalog::default_registry;
pub use definition::*;
pub use definition_validator::*;
pub use finished_step::*;
pub use identifier::*;
pub use progress::*;
pub use record::*;
pub use registry::*;
