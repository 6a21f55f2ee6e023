//! # プロセス定義
//!
//! Process → Subprocess → Status → Step の 4 階層で業務プロセスを宣言する。
//! 定義はデプロイ時に固定され、永続化されない。
//!
//! ## 能力タグ
//!
//! ステップの振る舞い（日付入力、週範囲入力、完了時メール）はサブタイプではなく
//! [`StepCapability`] のタグで表す。更新処理はタグの有無で分岐する。
//!
//! ## 使用例
//!
//! ```rust
//! use carflow_domain::workflow::{
//!     ProcessDefinition, StatusDefinition, StepCapability, StepDefinition, SubprocessDefinition,
//! };
//!
//! let process = ProcessDefinition::new("import", "Import").subprocess(
//!     SubprocessDefinition::new("registration", "Registration").status(
//!         StatusDefinition::all("rdwApproved", "RDW Approved")
//!             .step(StepDefinition::new("rdwApproved", "RDW approved").capability(StepCapability::Date)),
//!     ),
//! );
//!
//! assert!(process.find_step("rdwApproved").is_some_and(|s| s.requires_date()));
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// ステップの能力タグ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepCapability {
    /// 完了日（`finished_at`）の入力を要求する
    Date,
    /// 週範囲（`additional_value`）の入力を要求する
    WeekRange,
    /// 完了時にメールを送る。`template` は本文の先頭に置く文
    Email { template: String },
}

/// ステップ定義（葉）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    pub key:          String,
    pub name:         String,
    /// 完了入力に使う UI コンポーネント名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modal:        Option<String>,
    #[serde(default)]
    pub capabilities: Vec<StepCapability>,
}

impl StepDefinition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key:          key.into(),
            name:         name.into(),
            modal:        None,
            capabilities: Vec::new(),
        }
    }

    pub fn modal(mut self, modal: impl Into<String>) -> Self {
        self.modal = Some(modal.into());
        self
    }

    pub fn capability(mut self, capability: StepCapability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn requires_date(&self) -> bool {
        self.capabilities.contains(&StepCapability::Date)
    }

    pub fn requires_week_range(&self) -> bool {
        self.capabilities.contains(&StepCapability::WeekRange)
    }

    /// メール通知のテンプレート文。メールタグがなければ `None`
    pub fn email_template(&self) -> Option<&str> {
        self.capabilities.iter().find_map(|capability| match capability {
            StepCapability::Email { template } => Some(template.as_str()),
            _ => None,
        })
    }

    pub fn sends_email(&self) -> bool {
        self.email_template().is_some()
    }
}

/// ステータスの完了判定方法
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCompletion {
    /// すべてのステップが完了（AND）
    #[default]
    All,
    /// いずれかのステップが完了（OR）
    Any,
}

/// ステータス定義（チェックポイント）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDefinition {
    pub key:        String,
    pub name:       String,
    #[serde(default)]
    pub completion: StatusCompletion,
    pub steps:      Vec<Arc<StepDefinition>>,
}

impl StatusDefinition {
    /// すべてのステップ完了で完了するステータス
    pub fn all(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key:        key.into(),
            name:       name.into(),
            completion: StatusCompletion::All,
            steps:      Vec::new(),
        }
    }

    /// いずれかのステップ完了で完了するステータス
    pub fn any(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            completion: StatusCompletion::Any,
            ..Self::all(key, name)
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

/// サブプロセス定義
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessDefinition {
    pub key:      String,
    pub name:     String,
    pub statuses: Vec<Arc<StatusDefinition>>,
}

impl SubprocessDefinition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key:      key.into(),
            name:     name.into(),
            statuses: Vec::new(),
        }
    }

    pub fn status(mut self, status: StatusDefinition) -> Self {
        self.statuses.push(Arc::new(status));
        self
    }
}

/// プロセス定義（ルート）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDefinition {
    pub key:          String,
    pub name:         String,
    pub subprocesses: Vec<Arc<SubprocessDefinition>>,
}

impl ProcessDefinition {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key:          key.into(),
            name:         name.into(),
            subprocesses: Vec::new(),
        }
    }

    pub fn subprocess(mut self, subprocess: SubprocessDefinition) -> Self {
        self.subprocesses.push(Arc::new(subprocess));
        self
    }

    /// 宣言順にすべてのステップを列挙する（重複キーもそのまま返す）
    pub fn steps(&self) -> impl Iterator<Item = &Arc<StepDefinition>> {
        self.subprocesses
            .iter()
            .flat_map(|subprocess| subprocess.statuses.iter())
            .flat_map(|status| status.steps.iter())
    }

    pub fn find_step(&self, key: &str) -> Option<&Arc<StepDefinition>> {
        self.steps().find(|step| step.key == key)
    }
}
