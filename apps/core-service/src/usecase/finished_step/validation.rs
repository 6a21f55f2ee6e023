//! 完了入力の検証
//!
//! 形式の検証（メールアドレス、週範囲の順序、文字数）は `validator` の derive で、
//! ステップの能力タグに依存する検証は手続き的に行う。
//!
//! | 規則 | 作成 | 更新 |
//! |-----|:---:|:---:|
//! | 宛先メールアドレスの形式 | ✓ | ✓ |
//! | 週範囲の順序 / 自由記述の文字数 | ✓ | ✓ |
//! | 週範囲ステップは週範囲のみ、それ以外は週範囲を受け付けない | ✓ | ✓ |
//! | `Date` ステップの完了日 | 必須 | - |
//! | `WeekRange` ステップの週範囲 | 必須 | - |
//! | `Email` ステップの宛先 | 必須 | - |
//! | 日付・週範囲のない `Email` ステップの本文 | 必須 | - |

use std::borrow::Cow;

use carflow_domain::workflow::{AdditionalValue, StepDefinition, WeekRange};
use carflow_shared::error_response::FieldErrors;
use chrono::NaiveDate;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// 自由記述の最大文字数
pub const MAX_TEXT_LENGTH: usize = 2000;

/// 完了入力
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Validate)]
pub struct FinishedStepPayload {
    pub finished_at:      Option<NaiveDate>,
    #[validate(custom(function = "validate_additional_value"))]
    pub additional_value: Option<AdditionalValue>,
    #[validate(email(message = "メールアドレスの形式が不正です"))]
    pub email_recipient:  Option<String>,
}

impl FinishedStepPayload {
    fn text(&self) -> Option<&str> {
        self.additional_value
            .as_ref()
            .and_then(AdditionalValue::as_text)
            .filter(|text| !text.trim().is_empty())
    }

    fn week_range(&self) -> Option<&WeekRange> {
        self.additional_value
            .as_ref()
            .and_then(AdditionalValue::as_week_range)
    }
}

/// 適用する規則
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// 完了記録がまだない
    Create,
    /// 既存の完了記録を更新する
    Update,
}

/// 完了入力を検証する
///
/// 失敗時はフィールド名 → メッセージ一覧を返す。
pub fn validate_payload(
    step: &StepDefinition,
    payload: &FinishedStepPayload,
    mode: ValidationMode,
) -> Result<(), FieldErrors> {
    let mut errors = FieldErrors::new();

    if let Err(validation_errors) = payload.validate() {
        for (field, field_errors) in validation_errors.field_errors() {
            let messages = errors.entry(field.to_string()).or_default();
            messages.extend(field_errors.iter().map(|error| {
                error
                    .message
                    .as_ref()
                    .map_or_else(|| error.code.to_string(), ToString::to_string)
            }));
        }
    }

    match &payload.additional_value {
        Some(AdditionalValue::Text(_)) if step.requires_week_range() => {
            push(&mut errors, "additional_value", "このステップには週範囲を指定してください");
        }
        Some(AdditionalValue::WeekRange(_)) if !step.requires_week_range() => {
            push(&mut errors, "additional_value", "このステップは週範囲を受け付けません");
        }
        _ => {}
    }

    if mode == ValidationMode::Create {
        if step.requires_date() && payload.finished_at.is_none() {
            push(&mut errors, "finished_at", "完了日は必須です");
        }
        if step.requires_week_range() && payload.additional_value.is_none() {
            push(&mut errors, "additional_value", "週範囲は必須です");
        }
        if step.sends_email() {
            let has_recipient = payload
                .email_recipient
                .as_deref()
                .is_some_and(|recipient| !recipient.trim().is_empty());
            if !has_recipient {
                push(&mut errors, "email_recipient", "宛先メールアドレスは必須です");
            }
            if !step.requires_date()
                && !step.requires_week_range()
                && payload.text().is_none()
                && payload.week_range().is_none()
            {
                push(&mut errors, "additional_value", "本文は必須です");
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn push(errors: &mut FieldErrors, field: &str, message: &str) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.to_string());
}

fn validate_additional_value(value: &AdditionalValue) -> Result<(), ValidationError> {
    match value {
        AdditionalValue::Text(text) if text.chars().count() > MAX_TEXT_LENGTH => Err(
            validation_error("text_too_long", "本文は2000文字以内である必要があります"),
        ),
        AdditionalValue::WeekRange(range) if !range.is_ordered() => Err(validation_error(
            "week_range_order",
            "週の開始日は終了日以前である必要があります",
        )),
        _ => Ok(()),
    }
}

fn validation_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

#[cfg(test)]
mod tests {
    use carflow_domain::workflow::StepCapability;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn week_range() -> AdditionalValue {
        AdditionalValue::WeekRange(WeekRange {
            from: [date(2024, 1, 1), date(2024, 1, 7)],
            to:   [date(2024, 2, 1), date(2024, 2, 7)],
        })
    }

    fn plain_step() -> StepDefinition {
        StepDefinition::new("hasReceivedOriginalDocuments", "Original documents received")
    }

    fn date_step() -> StepDefinition {
        StepDefinition::new("invoiceSent", "Invoice sent").capability(StepCapability::Date)
    }

    fn week_email_step() -> StepDefinition {
        StepDefinition::new("transportBooked", "Transport booked")
            .capability(StepCapability::WeekRange)
            .capability(StepCapability::Email {
                template: "The transport of the vehicle is planned between".to_string(),
            })
    }

    fn message_step() -> StepDefinition {
        StepDefinition::new("customerInformed", "Customer informed").capability(
            StepCapability::Email {
                template: "Message to the customer".to_string(),
            },
        )
    }

    fn fields(result: Result<(), FieldErrors>) -> Vec<String> {
        result.unwrap_err().into_keys().collect()
    }

    #[rstest]
    #[case(ValidationMode::Create)]
    #[case(ValidationMode::Update)]
    fn test_タグなしのステップは空の入力を受け付ける(#[case] mode: ValidationMode) {
        assert_eq!(
            validate_payload(&plain_step(), &FinishedStepPayload::default(), mode),
            Ok(())
        );
    }

    #[test]
    fn test_日付ステップの作成は完了日が必須() {
        let result = validate_payload(
            &date_step(),
            &FinishedStepPayload::default(),
            ValidationMode::Create,
        );

        assert_eq!(fields(result), vec!["finished_at"]);
    }

    #[test]
    fn test_日付ステップの更新は完了日を省略できる() {
        let result = validate_payload(
            &date_step(),
            &FinishedStepPayload::default(),
            ValidationMode::Update,
        );

        assert_eq!(result, Ok(()));
    }

    #[test]
    fn test_週範囲メールステップの作成は週範囲と宛先が必須() {
        let result = validate_payload(
            &week_email_step(),
            &FinishedStepPayload::default(),
            ValidationMode::Create,
        );

        assert_eq!(fields(result), vec!["additional_value", "email_recipient"]);
    }

    #[test]
    fn test_週範囲メールステップは正しい入力を受け付ける() {
        let payload = FinishedStepPayload {
            finished_at:      None,
            additional_value: Some(week_range()),
            email_recipient:  Some("planner@transport.nl".to_string()),
        };

        assert_eq!(
            validate_payload(&week_email_step(), &payload, ValidationMode::Create),
            Ok(())
        );
    }

    #[rstest]
    #[case(ValidationMode::Create)]
    #[case(ValidationMode::Update)]
    fn test_宛先メールアドレスの形式はいつも検証する(#[case] mode: ValidationMode) {
        let payload = FinishedStepPayload {
            finished_at:      None,
            additional_value: Some(week_range()),
            email_recipient:  Some("not-an-address".to_string()),
        };

        let errors = validate_payload(&week_email_step(), &payload, mode).unwrap_err();

        assert_eq!(
            errors.get("email_recipient"),
            Some(&vec!["メールアドレスの形式が不正です".to_string()])
        );
    }

    #[test]
    fn test_週の順序が逆ならエラー() {
        let payload = FinishedStepPayload {
            additional_value: Some(AdditionalValue::WeekRange(WeekRange {
                from: [date(2024, 1, 7), date(2024, 1, 1)],
                to:   [date(2024, 2, 1), date(2024, 2, 7)],
            })),
            ..FinishedStepPayload::default()
        };

        let result = validate_payload(&week_email_step(), &payload, ValidationMode::Update);

        assert_eq!(fields(result), vec!["additional_value"]);
    }

    #[test]
    fn test_週範囲ステップは自由記述を受け付けない() {
        let payload = FinishedStepPayload {
            additional_value: Some(AdditionalValue::Text("next week".to_string())),
            ..FinishedStepPayload::default()
        };

        let result = validate_payload(&week_email_step(), &payload, ValidationMode::Update);

        assert_eq!(fields(result), vec!["additional_value"]);
    }

    #[test]
    fn test_週範囲でないステップは週範囲を受け付けない() {
        let payload = FinishedStepPayload {
            additional_value: Some(week_range()),
            ..FinishedStepPayload::default()
        };

        let result = validate_payload(&plain_step(), &payload, ValidationMode::Update);

        assert_eq!(fields(result), vec!["additional_value"]);
    }

    #[test]
    fn test_自由記述は2000文字まで() {
        let at_limit = FinishedStepPayload {
            additional_value: Some(AdditionalValue::Text("a".repeat(MAX_TEXT_LENGTH))),
            ..FinishedStepPayload::default()
        };
        let over_limit = FinishedStepPayload {
            additional_value: Some(AdditionalValue::Text("a".repeat(MAX_TEXT_LENGTH + 1))),
            ..FinishedStepPayload::default()
        };

        assert_eq!(
            validate_payload(&plain_step(), &at_limit, ValidationMode::Update),
            Ok(())
        );
        assert_eq!(
            fields(validate_payload(&plain_step(), &over_limit, ValidationMode::Update)),
            vec!["additional_value"]
        );
    }

    #[test]
    fn test_本文だけのメールステップの作成は本文が必須() {
        let payload = FinishedStepPayload {
            email_recipient: Some("owner@example.nl".to_string()),
            additional_value: Some(AdditionalValue::Text("   ".to_string())),
            ..FinishedStepPayload::default()
        };

        let result = validate_payload(&message_step(), &payload, ValidationMode::Create);

        assert_eq!(fields(result), vec!["additional_value"]);
    }

    #[test]
    fn test_作成の規則は更新より厳しい() {
        let payload = FinishedStepPayload::default();

        for step in [date_step(), week_email_step(), message_step()] {
            assert!(validate_payload(&step, &payload, ValidationMode::Update).is_ok());
            assert!(validate_payload(&step, &payload, ValidationMode::Create).is_err());
        }
    }
}
