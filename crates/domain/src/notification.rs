//! # 通知
//!
//! ステップ完了時のメール通知に関するドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: 通知送信の失敗は完了記録の保存に影響しない
//! - **テンプレート分離**: 通知内容とメール生成は分離（TemplateRenderer は core-service）
//! - **監査**: 送信したメールは [`MailLog`] として記録する

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::{tenant::TenantId, workflow::WorkflowId};

define_uuid_id! {
    /// メールログ ID（一意識別子）
    ///
    /// mail_logs テーブルの主キー。UUID v7 を使用。
    pub struct MailLogId;
}

/// 通知送信エラー
#[derive(Debug, Error)]
pub enum NotificationError {
    /// メール送信に失敗
    #[error("メール送信に失敗: {0}")]
    SendFailed(String),

    /// テンプレートレンダリングに失敗
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateFailed(String),

    /// メールログの記録に失敗
    #[error("メールログの記録に失敗: {0}")]
    LogFailed(String),
}

/// メールの添付ファイル
#[derive(Clone)]
pub struct EmailAttachment {
    pub filename:     String,
    pub content_type: String,
    pub content:      Vec<u8>,
}

impl std::fmt::Debug for EmailAttachment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailAttachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("content", &format_args!("{} bytes", self.content.len()))
            .finish()
    }
}

/// メールメッセージ
///
/// テンプレートレンダリングの出力。NotificationSender に渡される。
#[derive(Debug, Clone)]
pub struct EmailMessage {
    /// 送信先メールアドレス
    pub to:          String,
    /// 返信先（操作したユーザー）
    pub reply_to:    Option<String>,
    /// 件名
    pub subject:     String,
    /// HTML 本文
    pub html_body:   String,
    /// プレーンテキスト本文
    pub text_body:   String,
    pub attachments: Vec<EmailAttachment>,
}

/// ステップ完了通知
///
/// メール通知付きステップが完了したときに送る内容。
/// `body` は完了記録から組み立て済みの本文（テンプレート文 + 日付など）。
#[derive(Debug, Clone, Serialize)]
pub struct StepNotification {
    pub step_name:      String,
    pub process_name:   String,
    pub body:           String,
    pub recipient_name: String,
    pub recipient:      String,
    pub sender_name:    String,
}

/// 送信済みメールの監査ログ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailLog {
    pub id:              MailLogId,
    pub tenant_id:       TenantId,
    pub workflow_id:     WorkflowId,
    pub step_identifier: String,
    pub rendered_body:   String,
    pub recipients:      Vec<String>,
    pub sender:          String,
    pub subject:         String,
    /// 完了記録に添付された最初のファイル名
    pub attachment_name: Option<String>,
    pub sent_at:         DateTime<Utc>,
}
