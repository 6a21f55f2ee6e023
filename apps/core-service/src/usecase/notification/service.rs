//! # ステップ完了通知サービス
//!
//! 宛先解決 → 本文の組み立て → テンプレートレンダリング → メール送信 → メールログ記録を
//! 統合するサービス。
//!
//! ## 設計方針
//!
//! - **fire-and-forget**: `notify()` はどの段階で失敗してもエラーを返さない
//! - **宛先解決**: ユーザー → テナントの順にメールアドレスで引く。どちらにもいなければ送らない
//! - **監査**: 送信を試みたメールは `mail_logs` に記録する

use std::sync::Arc;

use carflow_domain::{
    attachment::Attachment,
    clock::Clock,
    notification::{EmailAttachment, EmailMessage, MailLog, MailLogId, StepNotification},
    tenant::TenantId,
    user::{Email, UserId},
    workflow::{AdditionalValue, FinishedStep, NOTIFICATION_DATE_FORMAT, StepDefinition},
};
use carflow_infra::{
    attachment::AttachmentStore,
    notification::NotificationSender,
    repository::{MailLogRepository, TenantRepository, UserRepository},
};
use carflow_shared::{
    event_log::{
        error::{category, kind},
        event,
    },
    log_business_event,
};

use super::TemplateRenderer;

/// 操作したユーザーが引けない場合の差出人名
const DEFAULT_SENDER_NAME: &str = "CarFlow";

/// 完了したステップの通知依頼
pub struct StepFinishedNotice<'a> {
    pub tenant_id:    &'a TenantId,
    /// 完了操作をしたユーザー（差出人名・返信先）
    pub actor_id:     &'a UserId,
    pub process_name: &'a str,
    pub step:         &'a StepDefinition,
    /// 保存済みの完了記録（添付込み）
    pub finished:     &'a FinishedStep,
    pub recipient:    &'a str,
}

/// 宛先
struct Recipient {
    name:  String,
    email: String,
}

/// 通知本文を組み立てる
///
/// 週範囲があれば期間表記、日付ステップなら完了日をテンプレート文に続ける。
/// それ以外は自由記述をそのまま使い、自由記述もなければテンプレート文だけになる。
pub fn compose_body(step: &StepDefinition, finished: &FinishedStep) -> String {
    let template = step.email_template().unwrap_or_default();

    if let Some(range) = finished
        .additional_value()
        .and_then(AdditionalValue::as_week_range)
    {
        return format!("{template} {}", range.notification_label());
    }

    if step.requires_date()
        && let Some(date) = finished.finished_at()
    {
        return format!("{template} {}", date.format(NOTIFICATION_DATE_FORMAT));
    }

    finished
        .additional_value()
        .and_then(AdditionalValue::as_text)
        .filter(|text| !text.trim().is_empty())
        .map_or_else(|| template.to_string(), ToString::to_string)
}

/// ステップ完了通知サービス
pub struct StepNotificationService {
    sender:            Arc<dyn NotificationSender>,
    template_renderer: TemplateRenderer,
    user_repo:         Arc<dyn UserRepository>,
    tenant_repo:       Arc<dyn TenantRepository>,
    attachment_store:  Arc<dyn AttachmentStore>,
    mail_log_repo:     Arc<dyn MailLogRepository>,
    clock:             Arc<dyn Clock>,
}

impl StepNotificationService {
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        template_renderer: TemplateRenderer,
        user_repo: Arc<dyn UserRepository>,
        tenant_repo: Arc<dyn TenantRepository>,
        attachment_store: Arc<dyn AttachmentStore>,
        mail_log_repo: Arc<dyn MailLogRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sender,
            template_renderer,
            user_repo,
            tenant_repo,
            attachment_store,
            mail_log_repo,
            clock,
        }
    }

    /// 通知を送信する（fire-and-forget）
    ///
    /// 送信したら `true`。宛先解決・レンダリング・送信のいずれかで止まった場合は
    /// ログを出して `false` を返す。
    #[tracing::instrument(skip_all, fields(step = %notice.finished.step_identifier()))]
    pub async fn notify(&self, notice: StepFinishedNotice<'_>) -> bool {
        let step_identifier = notice.finished.step_identifier().to_string();

        let Some(recipient) = self.resolve_recipient(notice.recipient).await else {
            log_business_event!(
                event.category = event::category::NOTIFICATION,
                event.action = event::action::NOTIFICATION_SKIPPED,
                event.tenant_id = %notice.tenant_id,
                event.entity_type = event::entity_type::FINISHED_STEP,
                event.entity_id = %notice.finished.id(),
                event.result = event::result::FAILURE,
                notification.step = %step_identifier,
                "通知の宛先が見つからないため送信をスキップ"
            );
            return false;
        };

        let (sender_name, reply_to) = self.resolve_actor(notice.actor_id).await;

        let notification = StepNotification {
            step_name: notice.step.name.clone(),
            process_name: notice.process_name.to_string(),
            body: compose_body(notice.step, notice.finished),
            recipient_name: recipient.name,
            recipient: recipient.email,
            sender_name,
        };

        let mut email = match self.template_renderer.render(&notification) {
            Ok(email) => email,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    notification.step = %step_identifier,
                    "通知テンプレートのレンダリングに失敗"
                );
                return false;
            }
        };
        email.reply_to = reply_to;
        email.attachments = self.read_attachments(notice.finished.attachments()).await;

        let sent = self.send(&email, &notice, &step_identifier).await;
        if sent {
            self.record_mail_log(&email, &notice, step_identifier).await;
        }
        sent
    }

    async fn send(
        &self,
        email: &EmailMessage,
        notice: &StepFinishedNotice<'_>,
        step_identifier: &str,
    ) -> bool {
        match self.sender.send_email(email).await {
            Ok(()) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_SENT,
                    event.tenant_id = %notice.tenant_id,
                    event.entity_type = event::entity_type::FINISHED_STEP,
                    event.entity_id = %notice.finished.id(),
                    event.result = event::result::SUCCESS,
                    notification.step = %step_identifier,
                    "通知メール送信成功"
                );
                true
            }
            Err(e) => {
                log_business_event!(
                    event.category = event::category::NOTIFICATION,
                    event.action = event::action::NOTIFICATION_FAILED,
                    event.tenant_id = %notice.tenant_id,
                    event.entity_type = event::entity_type::FINISHED_STEP,
                    event.entity_id = %notice.finished.id(),
                    event.result = event::result::FAILURE,
                    error.category = category::EXTERNAL_SERVICE,
                    error.kind = kind::MAIL_DELIVERY,
                    notification.step = %step_identifier,
                    error = %e,
                    "通知メール送信失敗"
                );
                false
            }
        }
    }

    async fn record_mail_log(
        &self,
        email: &EmailMessage,
        notice: &StepFinishedNotice<'_>,
        step_identifier: String,
    ) {
        let log = MailLog {
            id: MailLogId::new(),
            tenant_id: notice.tenant_id.clone(),
            workflow_id: notice.finished.workflow_id().clone(),
            step_identifier,
            rendered_body: email.html_body.clone(),
            recipients: vec![email.to.clone()],
            sender: self.sender.sender_address().to_string(),
            subject: email.subject.clone(),
            attachment_name: notice
                .finished
                .attachments()
                .first()
                .map(|attachment| attachment.original_name.clone()),
            sent_at: self.clock.now(),
        };

        if let Err(e) = self.mail_log_repo.insert(&log).await {
            tracing::error!(
                error.category = category::INFRASTRUCTURE,
                error.kind = kind::MAIL_LOG,
                error = %e,
                "メールログの記録に失敗"
            );
        }
    }

    /// ユーザー → テナントの順に宛先を引く
    async fn resolve_recipient(&self, address: &str) -> Option<Recipient> {
        let email = match Email::new(address) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(error = %e, "通知の宛先メールアドレスが不正");
                return None;
            }
        };

        match self.user_repo.find_by_email(&email).await {
            Ok(Some(user)) => {
                return Some(Recipient {
                    name:  user.name().as_str().to_string(),
                    email: user.email().as_str().to_string(),
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "宛先ユーザーの検索に失敗"),
        }

        match self.tenant_repo.find_by_email(&email).await {
            Ok(Some(tenant)) => Some(Recipient {
                name:  tenant.name().as_str().to_string(),
                email: email.into_string(),
            }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(error = %e, "宛先テナントの検索に失敗");
                None
            }
        }
    }

    /// 差出人名と返信先
    async fn resolve_actor(&self, actor_id: &UserId) -> (String, Option<String>) {
        match self.user_repo.find_by_id(actor_id).await {
            Ok(Some(user)) => (
                user.name().as_str().to_string(),
                Some(user.email().as_str().to_string()),
            ),
            Ok(None) => (DEFAULT_SENDER_NAME.to_string(), None),
            Err(e) => {
                tracing::warn!(error = %e, "操作ユーザーの検索に失敗");
                (DEFAULT_SENDER_NAME.to_string(), None)
            }
        }
    }

    /// 添付を読み出す。読めなかったものは添付しない
    async fn read_attachments(&self, attachments: &[Attachment]) -> Vec<EmailAttachment> {
        let mut result = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            match self.attachment_store.read_content(attachment).await {
                Ok(content) => result.push(EmailAttachment {
                    filename: attachment.original_name.clone(),
                    content_type: attachment.content_type.clone(),
                    content,
                }),
                Err(e) => tracing::warn!(
                    error.category = category::INFRASTRUCTURE,
                    error.kind = kind::STORAGE,
                    error = %e,
                    attachment.id = %attachment.id,
                    "添付ファイルの読み出しに失敗"
                ),
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use carflow_domain::{
        attachment::{AttachmentKind, AttachmentOwner, AttachmentOwnerType},
        tenant::{Tenant, TenantName},
        user::{User, UserName},
        workflow::{NewFinishedStep, StepCapability, StepIdentifier, WeekRange, WorkflowId},
    };
    use carflow_infra::{attachment::UploadedFile, mock::MockNotificationSender};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::WorkflowTestBuilder;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn week_email_step() -> StepDefinition {
        StepDefinition::new("transportBooked", "Transport booked")
            .capability(StepCapability::WeekRange)
            .capability(StepCapability::Email {
                template: "The transport of the vehicle is planned between".to_string(),
            })
    }

    fn date_email_step() -> StepDefinition {
        StepDefinition::new("rdwApproved", "RDW approved")
            .capability(StepCapability::Date)
            .capability(StepCapability::Email {
                template: "The vehicle has been approved by the RDW on".to_string(),
            })
    }

    fn message_step() -> StepDefinition {
        StepDefinition::new("customerInformed", "Customer informed").capability(
            StepCapability::Email {
                template: "Message to the customer".to_string(),
            },
        )
    }

    fn finished(
        builder: &WorkflowTestBuilder,
        key: &str,
        additional_value: Option<AdditionalValue>,
        finished_at: Option<NaiveDate>,
    ) -> FinishedStep {
        FinishedStep::new(NewFinishedStep {
            workflow_id: WorkflowId::new(),
            step_identifier: StepIdentifier::new("trade", key),
            additional_value,
            finished_at,
            created_by: builder.user_id().clone(),
            now: builder.now(),
        })
    }

    fn week_range() -> AdditionalValue {
        AdditionalValue::WeekRange(WeekRange {
            from: [date(2024, 1, 1), date(2024, 1, 7)],
            to:   [date(2024, 2, 1), date(2024, 2, 7)],
        })
    }

    fn notice<'a>(
        builder: &'a WorkflowTestBuilder,
        step: &'a StepDefinition,
        finished: &'a FinishedStep,
        recipient: &'a str,
    ) -> StepFinishedNotice<'a> {
        StepFinishedNotice {
            tenant_id: builder.tenant_id(),
            actor_id: builder.user_id(),
            process_name: "Import",
            step,
            finished,
            recipient,
        }
    }

    fn add_user(builder: &WorkflowTestBuilder, email: &str, name: &str) {
        builder.user_repo().add_user(User::from_db(
            UserId::new(),
            builder.tenant_id().clone(),
            Email::new(email).unwrap(),
            UserName::new(name).unwrap(),
        ));
    }

    #[test]
    fn test_週範囲の本文は開始翌日と終了日を続ける() {
        let builder = WorkflowTestBuilder::new();
        let step = week_email_step();
        let finished = finished(&builder, "transportBooked", Some(week_range()), None);

        assert_eq!(
            compose_body(&step, &finished),
            "The transport of the vehicle is planned between 02.01.2024 - 07.02.2024"
        );
    }

    #[test]
    fn test_日付ステップの本文は完了日を続ける() {
        let builder = WorkflowTestBuilder::new();
        let step = date_email_step();
        let finished = finished(&builder, "rdwApproved", None, Some(date(2024, 3, 5)));

        assert_eq!(
            compose_body(&step, &finished),
            "The vehicle has been approved by the RDW on 05.03.2024"
        );
    }

    #[test]
    fn test_それ以外は自由記述を本文にする() {
        let builder = WorkflowTestBuilder::new();
        let step = message_step();
        let with_text = finished(
            &builder,
            "customerInformed",
            Some(AdditionalValue::Text("Your car is ready.".to_string())),
            None,
        );
        let without_text = finished(&builder, "customerInformed", None, None);

        assert_eq!(compose_body(&step, &with_text), "Your car is ready.");
        assert_eq!(compose_body(&step, &without_text), "Message to the customer");
    }

    #[tokio::test]
    async fn test_ユーザーに届けてメールログを残す() {
        let builder = WorkflowTestBuilder::new();
        add_user(&builder, "planner@transport.nl", "Transport Planner");
        let step = week_email_step();
        let finished = finished(&builder, "transportBooked", Some(week_range()), None);
        let sut = builder.build_notification_service();

        let sent = sut
            .notify(notice(&builder, &step, &finished, "Planner@Transport.nl"))
            .await;

        assert!(sent);
        let emails = builder.sender().sent_emails();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].to, "planner@transport.nl");
        assert_eq!(emails[0].subject, "[CarFlow] Import: Transport booked");
        assert_eq!(emails[0].reply_to.as_deref(), Some("jan@dealer.nl"));
        assert!(emails[0].text_body.contains("Dear Transport Planner"));
        assert!(emails[0].text_body.contains("Jan de Vries"));

        let logs = builder.mail_log_repo().logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].recipients, vec!["planner@transport.nl".to_string()]);
        assert_eq!(logs[0].sender, "noreply@carflow.example");
        assert_eq!(logs[0].step_identifier, "trade::transportBooked");
        assert!(logs[0].rendered_body.contains("02.01.2024 - 07.02.2024"));
        assert_eq!(logs[0].attachment_name, None);
        assert_eq!(logs[0].sent_at, builder.now());
    }

    #[tokio::test]
    async fn test_ユーザーにいなければテナントに届ける() {
        let builder = WorkflowTestBuilder::new();
        builder.tenant_repo().add_tenant(Tenant::from_db(
            TenantId::new(),
            TenantName::new("Autohuis Utrecht").unwrap(),
            Some(Email::new("office@autohuis.nl").unwrap()),
        ));
        let step = message_step();
        let finished = finished(
            &builder,
            "customerInformed",
            Some(AdditionalValue::Text("Your car is ready.".to_string())),
            None,
        );
        let sut = builder.build_notification_service();

        let sent = sut
            .notify(notice(&builder, &step, &finished, "office@autohuis.nl"))
            .await;

        assert!(sent);
        let emails = builder.sender().sent_emails();
        assert_eq!(emails[0].to, "office@autohuis.nl");
        assert!(emails[0].text_body.contains("Dear Autohuis Utrecht"));
    }

    #[tokio::test]
    async fn test_宛先が引けなければ送らない() {
        let builder = WorkflowTestBuilder::new();
        let step = message_step();
        let finished = finished(&builder, "customerInformed", None, None);
        let sut = builder.build_notification_service();

        let sent = sut
            .notify(notice(&builder, &step, &finished, "nobody@nowhere.nl"))
            .await;

        assert!(!sent);
        assert!(builder.sender().sent_emails().is_empty());
        assert!(builder.mail_log_repo().logs().is_empty());
    }

    #[tokio::test]
    async fn test_送信に失敗してもパニックせずログも残さない() {
        let builder = WorkflowTestBuilder::new().with_sender(MockNotificationSender::failing());
        add_user(&builder, "planner@transport.nl", "Transport Planner");
        let step = week_email_step();
        let finished = finished(&builder, "transportBooked", Some(week_range()), None);
        let sut = builder.build_notification_service();

        let sent = sut
            .notify(notice(&builder, &step, &finished, "planner@transport.nl"))
            .await;

        assert!(!sent);
        assert!(builder.mail_log_repo().logs().is_empty());
    }

    #[tokio::test]
    async fn test_添付ファイルを同封し最初のファイル名を記録する() {
        let builder = WorkflowTestBuilder::new();
        add_user(&builder, "planner@transport.nl", "Transport Planner");
        let step = week_email_step();
        let finished = finished(&builder, "transportBooked", Some(week_range()), None);
        let owner = AttachmentOwner::new(
            AttachmentOwnerType::FinishedStep,
            *finished.id().as_uuid(),
        );
        let attachments = builder
            .attachment_store()
            .save_with_files(
                builder.tenant_id(),
                &owner,
                vec![UploadedFile {
                    collection:    "documents".to_string(),
                    kind:          AttachmentKind::File,
                    original_name: "booking.pdf".to_string(),
                    content_type:  "application/pdf".to_string(),
                    content:       b"%PDF-1.7".to_vec(),
                }],
            )
            .await
            .unwrap();
        let finished = finished.with_attachments(attachments);
        let sut = builder.build_notification_service();

        sut.notify(notice(&builder, &step, &finished, "planner@transport.nl"))
            .await;

        let emails = builder.sender().sent_emails();
        assert_eq!(emails[0].attachments.len(), 1);
        assert_eq!(emails[0].attachments[0].filename, "booking.pdf");
        assert_eq!(emails[0].attachments[0].content, b"%PDF-1.7".to_vec());
        assert_eq!(
            builder.mail_log_repo().logs()[0].attachment_name.as_deref(),
            Some("booking.pdf")
        );
    }
}
