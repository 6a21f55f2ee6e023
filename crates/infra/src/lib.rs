//! # CarFlow インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 設計方針
//!
//! このクレートはユースケース層が依存するトレイトと、その具体的な実装を提供する。
//! 外部システムの詳細をカプセル化し、ドメイン層をインフラの変更から保護する。
//!
//! ## 責務
//!
//! - **データベース接続**: PostgreSQL への接続プール管理とマイグレーション
//! - **リポジトリ実装**: ワークフロー記録・完了記録・追跡対象などの永続化
//! - **添付ファイル**: S3 へのアップロードとメタデータ管理
//! - **メール送信**: SMTP / SES / Noop の切り替え
//!
//! ## 依存関係
//!
//! ```text
//! core-service → infra → domain
//! ```
//!
//! ## モジュール構成
//!
//! - [`db`] - PostgreSQL データベース接続管理
//! - [`error`] - インフラ層エラー定義
//! - [`repository`] - リポジトリ実装
//! - [`attachment`] - 添付ファイルストア
//! - [`s3`] - オブジェクトストレージ
//! - [`notification`] - メール送信
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use carflow_infra::{db, repository::PostgresWorkflowRepository};
//!
//! async fn setup() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = db::create_pool("postgres://localhost/carflow", 10).await?;
//!     let workflows = PostgresWorkflowRepository::new(pool);
//!     Ok(())
//! }
//! ```

pub mod attachment;
pub mod db;
pub mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod notification;
pub mod repository;
pub mod s3;

pub use error::{InfraError, InfraErrorKind};
