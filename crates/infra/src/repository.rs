//! # リポジトリ実装
//!
//! ユースケース層が利用するリポジトリトレイトと、その PostgreSQL 実装を提供する。
//!
//! ## 設計方針
//!
//! - **依存性逆転**: ユースケース層はトレイトにのみ依存する
//! - **データベース抽象化**: sqlx を使用し、PostgreSQL 固有の処理をカプセル化
//! - **テスタビリティ**: トレイト経由でモック可能な設計（[`crate::mock`]）

pub mod finished_step_repository;
pub mod mail_log_repository;
pub mod tenant_config_repository;
pub mod tenant_repository;
pub mod tracked_entity_repository;
pub mod user_repository;
pub mod workflow_repository;

pub use finished_step_repository::{FinishedStepRepository, PostgresFinishedStepRepository};
pub use mail_log_repository::{MailLogRepository, PostgresMailLogRepository};
pub use tenant_config_repository::{PostgresTenantConfigRepository, TenantConfigRepository};
pub use tenant_repository::{PostgresTenantRepository, TenantRepository};
pub use tracked_entity_repository::{
    EntityLoadOptions,
    PostgresTrackedEntityRepository,
    TrackedEntityRepository,
};
pub use user_repository::{PostgresUserRepository, UserRepository};
pub use workflow_repository::{PostgresWorkflowRepository, WorkflowRepository};
