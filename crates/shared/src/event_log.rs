//! # ビジネスイベントログとエラーコンテキストの構造化ヘルパー
//!
//! `jq` で効率的に調査できるよう、ログフィールドの命名規約と
//! ヘルパーマクロを提供する。
//!
//! ## ビジネスイベント
//!
//! [`log_business_event!`] マクロで出力する。`event.kind = "business_event"` マーカーが
//! 自動付与され、`jq 'select(.["event.kind"] == "business_event")'` でフィルタできる。
//!
//! ## エラーコンテキスト
//!
//! 既存の `tracing::error!` に `error.category` + `error.kind` フィールドを直接追加する。
//! 定数は [`error`] モジュールで提供。
//!
//! ## フィールド命名規約
//!
//! ドット記法（`event.category`、`error.kind`）を使用。tracing の
//! `$($field:ident).+` パターンでサポートされ、JSON 出力でフラットなキーになる。

/// ビジネスイベントを構造化ログとして出力する。
///
/// `event.kind = "business_event"` マーカーを自動付与し、
/// `tracing::info!` レベルで出力する。
///
/// ## 必須フィールド（慣例）
///
/// - `event.category`: イベントカテゴリ（[`event::category`] の定数を使用）
/// - `event.action`: アクション名（[`event::action`] の定数を使用）
/// - `event.tenant_id`: テナント ID
/// - `event.result`: 結果（[`event::result`] の定数を使用）
///
/// ## 推奨フィールド
///
/// - `event.entity_type`: エンティティ種別（[`event::entity_type`] の定数を使用）
/// - `event.entity_id`: エンティティ ID
/// - `event.actor_id`: 操作者 ID
///
/// ## 使用例
///
/// ```ignore
/// use carflow_shared::{event_log::event, log_business_event};
///
/// log_business_event!(
///     event.category = event::category::WORKFLOW,
///     event.action = event::action::STEP_FINISHED,
///     event.tenant_id = %tenant_id,
///     event.result = event::result::SUCCESS,
///     "ステップを完了にした"
/// );
/// ```
#[macro_export]
macro_rules! log_business_event {
    ($($args:tt)*) => {
        ::tracing::info!(
            event.kind = "business_event",
            $($args)*
        )
    };
}

/// イベントフィールドの定数
pub mod event {
    /// イベントカテゴリ
    pub mod category {
        pub const WORKFLOW: &str = "workflow";
        pub const NOTIFICATION: &str = "notification";
    }

    /// イベントアクション
    pub mod action {
        // ワークフロー
        pub const WORKFLOW_CREATED: &str = "workflow.created";
        pub const STEP_FINISHED: &str = "step.finished";
        pub const STEP_UPDATED: &str = "step.updated";
        pub const STEP_UNFINISHED: &str = "step.unfinished";

        // 通知
        pub const NOTIFICATION_SENT: &str = "notification.sent";
        pub const NOTIFICATION_SKIPPED: &str = "notification.skipped";
        pub const NOTIFICATION_FAILED: &str = "notification.failed";
    }

    /// エンティティ種別
    pub mod entity_type {
        pub const WORKFLOW: &str = "workflow";
        pub const FINISHED_STEP: &str = "finished_step";
        pub const MAIL_LOG: &str = "mail_log";
    }

    /// イベント結果
    pub mod result {
        pub const SUCCESS: &str = "success";
        pub const FAILURE: &str = "failure";
    }
}

/// エラーコンテキストフィールドの定数
pub mod error {
    /// エラーカテゴリ
    pub mod category {
        /// インフラストラクチャ（DB、オブジェクトストレージ）
        pub const INFRASTRUCTURE: &str = "infrastructure";
        /// テナントモジュールの設定不整合
        pub const CONFIGURATION: &str = "configuration";
        /// 外部サービス呼び出し（SMTP、SES）
        pub const EXTERNAL_SERVICE: &str = "external_service";
    }

    /// エラー種別
    pub mod kind {
        pub const DATABASE: &str = "database";
        pub const STORAGE: &str = "storage";
        pub const MODULE_RESOLUTION: &str = "module_resolution";
        pub const MAIL_DELIVERY: &str = "mail_delivery";
        pub const MAIL_LOG: &str = "mail_log";
    }
}
