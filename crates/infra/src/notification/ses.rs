//! SES 通知送信実装
//!
//! AWS SES v2 API を使用してメールを送信する。本番環境で使用する。
//!
//! 添付ファイルがない場合は simple コンテンツ、ある場合は lettre で組み立てた
//! MIME を raw コンテンツとして送る。

use async_trait::async_trait;
use aws_sdk_sesv2::{
    Client,
    primitives::Blob,
    types::{Body, Content, Destination, EmailContent, Message, RawMessage},
};
use carflow_domain::notification::{EmailMessage, NotificationError};

use super::{NotificationSender, build_mime_message};

/// SES 通知送信
///
/// `aws_sdk_sesv2::Client` をラップする。
pub struct SesNotificationSender {
    client:       Client,
    from_address: String,
}

impl SesNotificationSender {
    /// 新しい SES 送信インスタンスを作成
    ///
    /// # 引数
    ///
    /// - `client`: AWS SES v2 クライアント
    /// - `from_address`: 送信元メールアドレス（SES で検証済みであること）
    pub fn new(client: Client, from_address: String) -> Self {
        Self {
            client,
            from_address,
        }
    }

    fn content(text: &str, label: &str) -> Result<Content, NotificationError> {
        Content::builder()
            .data(text)
            .charset("UTF-8")
            .build()
            .map_err(|e| NotificationError::SendFailed(format!("{label}構築失敗: {e}")))
    }

    fn simple_content(email: &EmailMessage) -> Result<EmailContent, NotificationError> {
        let message = Message::builder()
            .subject(Self::content(&email.subject, "件名")?)
            .body(
                Body::builder()
                    .html(Self::content(&email.html_body, "HTML 本文")?)
                    .text(Self::content(&email.text_body, "テキスト本文")?)
                    .build(),
            )
            .build();

        Ok(EmailContent::builder().simple(message).build())
    }

    fn raw_content(&self, email: &EmailMessage) -> Result<EmailContent, NotificationError> {
        let mime = build_mime_message(&self.from_address, email)?;
        let raw = RawMessage::builder()
            .data(Blob::new(mime.formatted()))
            .build()
            .map_err(|e| NotificationError::SendFailed(format!("raw メッセージ構築失敗: {e}")))?;

        Ok(EmailContent::builder().raw(raw).build())
    }
}

#[async_trait]
impl NotificationSender for SesNotificationSender {
    async fn send_email(&self, email: &EmailMessage) -> Result<(), NotificationError> {
        let content = if email.attachments.is_empty() {
            Self::simple_content(email)?
        } else {
            self.raw_content(email)?
        };

        let mut request = self
            .client
            .send_email()
            .from_email_address(&self.from_address)
            .destination(Destination::builder().to_addresses(&email.to).build())
            .content(content);
        if let Some(reply_to) = &email.reply_to {
            request = request.reply_to_addresses(reply_to);
        }

        request
            .send()
            .await
            .map_err(|e| NotificationError::SendFailed(format!("SES 送信失敗: {e}")))?;

        Ok(())
    }

    fn sender_address(&self) -> &str {
        &self.from_address
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SesNotificationSender>();
    }

    #[test]
    fn test_simpleコンテンツに件名と本文が入る() {
        let email = EmailMessage {
            to:          "planner@example.nl".to_string(),
            reply_to:    None,
            subject:     "RDW approved".to_string(),
            html_body:   "<p>approved</p>".to_string(),
            text_body:   "approved".to_string(),
            attachments: Vec::new(),
        };

        let content = SesNotificationSender::simple_content(&email).unwrap();
        let simple = content.simple().unwrap();
        assert_eq!(simple.subject().map(Content::data), Some("RDW approved"));
    }
}
