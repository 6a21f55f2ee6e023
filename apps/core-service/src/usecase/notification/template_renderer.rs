//! # テンプレートレンダラー
//!
//! tera テンプレートエンジンでステップ完了通知を HTML/plaintext 両形式で生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに埋め込まれる
//! - **件名パターン**: `{接頭辞} {プロセス名}: {ステップ名}`
//! - **エスケープ**: `.html` テンプレートのみ自動エスケープされる

use carflow_domain::notification::{EmailMessage, NotificationError, StepNotification};
use tera::{Context, Tera};

const HTML_TEMPLATE: &str = "step_notification.html";
const TEXT_TEMPLATE: &str = "step_notification.txt";

/// テンプレートレンダラー
///
/// `StepNotification` から `EmailMessage` を生成する。
/// 返信先と添付ファイルは呼び出し側で設定する。
pub struct TemplateRenderer {
    engine:         Tera,
    subject_prefix: String,
}

impl TemplateRenderer {
    /// 新しいレンダラーインスタンスを作成
    pub fn new(subject_prefix: impl Into<String>) -> Result<Self, NotificationError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(vec![
                (
                    HTML_TEMPLATE,
                    include_str!("../../../templates/notifications/step_notification.html"),
                ),
                (
                    TEXT_TEMPLATE,
                    include_str!("../../../templates/notifications/step_notification.txt"),
                ),
            ])
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(Self {
            engine,
            subject_prefix: subject_prefix.into(),
        })
    }

    /// 件名を組み立てる
    pub fn subject(&self, notification: &StepNotification) -> String {
        format!(
            "{} {}: {}",
            self.subject_prefix, notification.process_name, notification.step_name
        )
        .trim_start()
        .to_string()
    }

    /// 通知からメールメッセージを生成する
    pub fn render(&self, notification: &StepNotification) -> Result<EmailMessage, NotificationError> {
        let context = Context::from_serialize(notification)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let html_body = self
            .engine
            .render(HTML_TEMPLATE, &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        let text_body = self
            .engine
            .render(TEXT_TEMPLATE, &context)
            .map_err(|e| NotificationError::TemplateFailed(e.to_string()))?;

        Ok(EmailMessage {
            to: notification.recipient.clone(),
            reply_to: None,
            subject: self.subject(notification),
            html_body,
            text_body,
            attachments: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn notification() -> StepNotification {
        StepNotification {
            step_name:      "Transport booked".to_string(),
            process_name:   "Import".to_string(),
            body:           "The transport of the vehicle is planned between 02.01.2024 - 07.02.2024"
                .to_string(),
            recipient_name: "Transport Planner".to_string(),
            recipient:      "planner@transport.nl".to_string(),
            sender_name:    "Jan de Vries".to_string(),
        }
    }

    #[test]
    fn test_件名は接頭辞とプロセス名とステップ名から作る() {
        let renderer = TemplateRenderer::new("[CarFlow]").unwrap();

        let email = renderer.render(&notification()).unwrap();

        assert_eq!(email.subject, "[CarFlow] Import: Transport booked");
        assert_eq!(email.to, "planner@transport.nl");
        assert_eq!(email.reply_to, None);
        assert!(email.attachments.is_empty());
    }

    #[test]
    fn test_接頭辞が空なら件名に空白を残さない() {
        let renderer = TemplateRenderer::new("").unwrap();

        assert_eq!(renderer.subject(&notification()), "Import: Transport booked");
    }

    #[test]
    fn test_本文に通知文と宛名と差出人が含まれる() {
        let renderer = TemplateRenderer::new("[CarFlow]").unwrap();

        let email = renderer.render(&notification()).unwrap();

        for body in [&email.html_body, &email.text_body] {
            assert!(body.contains("02.01.2024 - 07.02.2024"));
            assert!(body.contains("Dear Transport Planner"));
            assert!(body.contains("Jan de Vries"));
        }
    }

    #[test]
    fn test_htmlでは本文がエスケープされる() {
        let renderer = TemplateRenderer::new("[CarFlow]").unwrap();
        let mut notification = notification();
        notification.body = "<b>urgent</b>".to_string();

        let email = renderer.render(&notification).unwrap();

        assert!(email.html_body.contains("&lt;b&gt;urgent&lt;&#x2F;b&gt;"));
        assert!(email.text_body.contains("<b>urgent</b>"));
    }
}
