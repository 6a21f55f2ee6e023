//! # ユースケース層
//!
//! Core Service のビジネスロジックを実装する。
//!
//! ## 設計方針
//!
//! - **依存性注入**: リポジトリを `Arc<dyn Trait>` で外部から注入
//! - **薄いハンドラ**: ハンドラは薄く保ち、ロジックはユースケースに集約
//! - **都度組み立て**: ワークフロー集約はキャッシュせず、読み取りのたびに組み立てる
//!
//! ## モジュール構成
//!
//! - `tenant_module`: テナント → ワークフローモジュールの解決
//! - `process`: テナントが選べるプロセスの一覧
//! - `workflow`: ワークフロー集約の組み立てと作成
//! - `finished_step`: ステップの完了・取り消しと入力検証
//! - `notification`: ステップ完了時のメール通知

pub mod finished_step;
pub mod notification;
pub mod process;
pub mod tenant_module;
pub mod workflow;

pub use finished_step::{
    FinishedStepPayload,
    UpsertWorkflowStepInput,
    WorkflowFinishedStepUseCaseImpl,
};
pub use process::{ProcessChoice, ProcessUseCaseImpl};
pub use tenant_module::TenantModuleResolver;
pub use workflow::{CreateWorkflowInput, WorkflowUseCaseImpl};
