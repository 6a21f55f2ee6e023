//! # CarFlow ドメイン層
//!
//! 車両取引バックオフィスのワークフロー進捗管理を担うドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートは DDD（ドメイン駆動設計）の原則に従い、以下を提供する:
//!
//! - **エンティティ**: 一意の識別子を持つオブジェクト（例: WorkflowRecord, FinishedStep）
//! - **値オブジェクト**: 識別子を持たない不変オブジェクト（例: TenantId, StepIdentifier）
//! - **宣言的な定義**: テナントごとに固定されたプロセスツリー
//! - **ドメインエラー**: ビジネスルール違反と設定不整合を表現するエラー型
//!
//! ## 依存関係の方向
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ドメイン層はインフラ層（DB、外部サービス）には一切依存しない。
//!
//! ## モジュール構成
//!
//! - [`error`] - ドメインエラーと設定エラー
//! - [`tenant`] / [`user`] - テナントとユーザー
//! - [`tracked_entity`] - 進捗を追跡する車両と読み込み計画
//! - [`attachment`] - 添付ファイルのメタデータ
//! - [`workflow`] - プロセス定義、完了記録、完了状態ツリー
//! - [`notification`] - ステップ完了時のメール通知
//!
//! ## 使用例
//!
//! ```rust
//! use carflow_domain::{DomainError, tracked_entity::TrackedEntityType};
//!
//! let entity_type: TrackedEntityType = "vehicle".parse()?;
//! assert_eq!(entity_type.table_name(), "vehicles");
//! # Ok::<(), DomainError>(())
//! ```

#[macro_use]
mod macros;

pub mod attachment;
pub mod clock;
pub mod error;
pub mod notification;
pub mod tenant;
pub mod tracked_entity;
pub mod user;
pub mod workflow;

pub use error::{ConfigurationError, DomainError};
