//! # 通知送信
//!
//! ステップ完了メールの送信を担当するインフラストラクチャモジュール。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: `NotificationSender` trait でメール送信を抽象化
//! - **3 つの実装**: SMTP（Mailpit 開発用）、SES（本番用）、Noop（テスト用）
//! - **環境変数切替**: `NOTIFICATION_BACKEND` でランタイム選択
//! - **添付付きメール**: 完了記録の添付ファイルを MIME マルチパートで同送する

mod noop;
mod ses;
mod smtp;

use async_trait::async_trait;
use carflow_domain::notification::{EmailMessage, NotificationError};
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart, header::ContentType};
pub use noop::NoopNotificationSender;
pub use ses::SesNotificationSender;
pub use smtp::SmtpNotificationSender;

/// メール送信トレイト
///
/// 通知基盤の中核。メール送信の具体的な方法を抽象化する。
/// SMTP / SES / Noop の 3 実装を環境変数で切り替える。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// メールを送信する
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError>;

    /// 送信元アドレス（メールログに記録する）
    fn sender_address(&self) -> &str;
}

/// MIME メッセージを組み立てる
///
/// 本文は text / html の alternative、添付があれば mixed で包む。
/// SMTP 送信と SES の raw 送信で共有する。
pub(crate) fn build_mime_message(
    from_address: &str,
    email: &EmailMessage,
) -> Result<Message, NotificationError> {
    let mut builder = Message::builder()
        .from(parse_mailbox(from_address, "送信元")?)
        .to(parse_mailbox(&email.to, "宛先")?)
        .subject(&email.subject);

    if let Some(reply_to) = &email.reply_to {
        builder = builder.reply_to(parse_mailbox(reply_to, "返信先")?);
    }

    let body = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(email.text_body.clone()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(email.html_body.clone()),
        );

    let message = if email.attachments.is_empty() {
        builder.multipart(body)
    } else {
        let mut mixed = MultiPart::mixed().multipart(body);
        for attachment in &email.attachments {
            let content_type = match ContentType::parse(&attachment.content_type) {
                Ok(content_type) => content_type,
                Err(e) => {
                    tracing::warn!(
                        filename = %attachment.filename,
                        content_type = %attachment.content_type,
                        "Content-Type が不正な添付を除外します: {e}"
                    );
                    continue;
                }
            };
            mixed = mixed.singlepart(
                Attachment::new(attachment.filename.clone())
                    .body(attachment.content.clone(), content_type),
            );
        }
        builder.multipart(mixed)
    };

    message.map_err(|e| NotificationError::SendFailed(format!("メッセージ構築失敗: {e}")))
}

fn parse_mailbox(address: &str, label: &str) -> Result<Mailbox, NotificationError> {
    address
        .parse()
        .map_err(|e| NotificationError::SendFailed(format!("{label}アドレス不正: {e}")))
}
