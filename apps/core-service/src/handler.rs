//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - 各ハンドラはサブモジュールに配置
//! - 親モジュール（この `handler.rs`）で re-export し、フラットな API を提供
//! - ハンドラは薄く保ち、ビジネスロジックはユースケースに委譲
//! - テナント ID・ユーザー ID は内部 API としてボディまたはクエリで受け取る

pub mod finished_step;
pub mod health;
pub mod process;
pub mod workflow;

pub use finished_step::{FinishedStepState, delete_workflow_step, upsert_workflow_step};
pub use health::{ReadinessState, health_check, readiness_check};
pub use process::{ProcessState, list_processes};
pub use workflow::{TenantQuery, WorkflowState, create_workflow, get_workflow};
