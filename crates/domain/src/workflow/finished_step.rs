//! # 完了記録
//!
//! ワークフローの 1 ステップが完了したことを表す記録。
//!
//! ## 不変条件
//!
//! (ワークフロー, ステップ識別子) ごとに完了記録は高々 1 件。
//! 再度完了にすると既存の記録を更新する（upsert）。作成者と `updated_at` は
//! 操作したユーザー・時刻で上書きし、`created_at` は保持する。

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{identifier::StepIdentifier, record::WorkflowId};
use crate::{attachment::Attachment, user::UserId};

define_uuid_id! {
    /// 完了記録 ID
    pub struct FinishedStepId;
}

/// 通知文で使う日付書式（`dd.mm.yyyy`）
pub const NOTIFICATION_DATE_FORMAT: &str = "%d.%m.%Y";

/// 画面で選んだ 2 つの週
///
/// `from` と `to` はそれぞれ週の初日と最終日を持つ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekRange {
    pub from: [NaiveDate; 2],
    pub to:   [NaiveDate; 2],
}

impl WeekRange {
    /// 各週の初日が最終日以前か
    pub fn is_ordered(&self) -> bool {
        self.from[0] <= self.from[1] && self.to[0] <= self.to[1]
    }

    /// 通知文に載せる期間表記
    ///
    /// 開始は `from` 週の初日の翌日、終了は `to` 週の最終日。
    pub fn notification_label(&self) -> String {
        let start = self.from[0]
            .checked_add_days(Days::new(1))
            .unwrap_or(self.from[0]);
        format!(
            "{} - {}",
            start.format(NOTIFICATION_DATE_FORMAT),
            self.to[1].format(NOTIFICATION_DATE_FORMAT)
        )
    }
}

/// 完了記録の付帯値
///
/// JSON では自由記述は文字列、週範囲は `{"from": [..], "to": [..]}` で保存する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AdditionalValue {
    Text(String),
    WeekRange(WeekRange),
}

impl AdditionalValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::WeekRange(_) => None,
        }
    }

    pub fn as_week_range(&self) -> Option<&WeekRange> {
        match self {
            Self::WeekRange(range) => Some(range),
            Self::Text(_) => None,
        }
    }
}

/// upsert の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UpsertOutcome {
    /// 新規に完了記録を作成した
    Created,
    /// 既存の完了記録を更新した
    Updated,
}

/// 完了記録エンティティ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishedStep {
    id: FinishedStepId,
    workflow_id: WorkflowId,
    step_identifier: StepIdentifier,
    additional_value: Option<AdditionalValue>,
    finished_at: Option<NaiveDate>,
    created_by: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    attachments: Vec<Attachment>,
}

/// 完了記録の新規作成パラメータ
pub struct NewFinishedStep {
    pub workflow_id: WorkflowId,
    pub step_identifier: StepIdentifier,
    pub additional_value: Option<AdditionalValue>,
    pub finished_at: Option<NaiveDate>,
    pub created_by: UserId,
    pub now: DateTime<Utc>,
}

/// 完了記録の DB 復元パラメータ
pub struct FinishedStepRecord {
    pub id: FinishedStepId,
    pub workflow_id: WorkflowId,
    pub step_identifier: StepIdentifier,
    pub additional_value: Option<AdditionalValue>,
    pub finished_at: Option<NaiveDate>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FinishedStep {
    pub fn new(params: NewFinishedStep) -> Self {
        Self {
            id: FinishedStepId::new(),
            workflow_id: params.workflow_id,
            step_identifier: params.step_identifier,
            additional_value: params.additional_value,
            finished_at: params.finished_at,
            created_by: params.created_by,
            created_at: params.now,
            updated_at: params.now,
            attachments: Vec::new(),
        }
    }

    pub fn from_db(record: FinishedStepRecord) -> Self {
        Self {
            id: record.id,
            workflow_id: record.workflow_id,
            step_identifier: record.step_identifier,
            additional_value: record.additional_value,
            finished_at: record.finished_at,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
            attachments: Vec::new(),
        }
    }

    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn id(&self) -> &FinishedStepId {
        &self.id
    }

    pub fn workflow_id(&self) -> &WorkflowId {
        &self.workflow_id
    }

    pub fn step_identifier(&self) -> &StepIdentifier {
        &self.step_identifier
    }

    pub fn additional_value(&self) -> Option<&AdditionalValue> {
        self.additional_value.as_ref()
    }

    pub fn finished_at(&self) -> Option<NaiveDate> {
        self.finished_at
    }

    pub fn created_by(&self) -> &UserId {
        &self.created_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn into_attachments(self) -> Vec<Attachment> {
        self.attachments
    }
}
