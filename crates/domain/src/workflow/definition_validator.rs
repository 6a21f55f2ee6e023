//! # テナントモジュール定義バリデーション
//!
//! プロセスツリーの構造的整合性を検証する。
//! モジュールをレジストリへ登録するときに自動実行される。

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use super::{
    definition::{ProcessDefinition, StepCapability, StepDefinition},
    identifier::IDENTIFIER_SEPARATOR,
    registry::TenantModule,
};

/// バリデーション結果
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid:  bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// エラーメッセージだけを取り出す
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }
}

/// バリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub code:     String,
    pub message:  String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_key: Option<String>,
}

impl ValidationError {
    fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code:     code.into(),
            message:  message.into(),
            step_key: None,
        }
    }

    fn with_step_key(
        code: impl Into<String>,
        message: impl Into<String>,
        step_key: impl Into<String>,
    ) -> Self {
        Self {
            code:     code.into(),
            message:  message.into(),
            step_key: Some(step_key.into()),
        }
    }
}

/// テナントモジュールをバリデーションする
///
/// すべてのルールを順に検証し、エラーを収集して返す。
pub fn validate_module(module: &TenantModule) -> ValidationResult {
    let mut errors = Vec::new();

    validate_namespace(module, &mut errors);
    validate_processes_present(module, &mut errors);
    validate_process_keys_unique(module, &mut errors);
    for process in &module.processes {
        validate_tree_not_empty(process, &mut errors);
    }
    validate_keys(module, &mut errors);
    validate_step_keys_consistent(module, &mut errors);
    validate_capabilities(module, &mut errors);

    ValidationResult {
        valid: errors.is_empty(),
        errors,
    }
}

/// モジュール内の全ステップ（宣言順）
fn all_steps(module: &TenantModule) -> impl Iterator<Item = &StepDefinition> {
    module
        .processes
        .iter()
        .flat_map(|process| process.steps())
        .map(|step| step.as_ref())
}

fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains(IDENTIFIER_SEPARATOR)
}

// --- バリデーションルール ---

/// ルール 1: 名前空間が空でなく区切り文字を含まない
fn validate_namespace(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    if !is_valid_key(&module.namespace) {
        errors.push(ValidationError::new(
            "invalid_namespace",
            format!("名前空間 '{}' は無効です", module.namespace),
        ));
    }
}

/// ルール 2: プロセスが 1 つ以上
fn validate_processes_present(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    if module.processes.is_empty() {
        errors.push(ValidationError::new(
            "missing_process",
            "プロセスが 1 つ以上必要です",
        ));
    }
}

/// ルール 3: プロセスキーの重複チェック
fn validate_process_keys_unique(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    let mut seen = HashSet::new();
    for process in &module.processes {
        if !seen.insert(process.key.as_str()) {
            errors.push(ValidationError::new(
                "duplicate_process_key",
                format!("プロセスキー '{}' が重複しています", process.key),
            ));
        }
    }
}

/// ルール 4: サブプロセス・ステータス・ステップが空でない
fn validate_tree_not_empty(process: &ProcessDefinition, errors: &mut Vec<ValidationError>) {
    if process.subprocesses.is_empty() {
        errors.push(ValidationError::new(
            "empty_process",
            format!("プロセス '{}' にサブプロセスがありません", process.key),
        ));
    }
    for subprocess in &process.subprocesses {
        if subprocess.statuses.is_empty() {
            errors.push(ValidationError::new(
                "empty_subprocess",
                format!("サブプロセス '{}' にステータスがありません", subprocess.key),
            ));
        }
        for status in &subprocess.statuses {
            if status.steps.is_empty() {
                errors.push(ValidationError::new(
                    "empty_status",
                    format!("ステータス '{}' にステップがありません", status.key),
                ));
            }

            let mut seen = HashSet::new();
            for step in &status.steps {
                if !seen.insert(step.key.as_str()) {
                    errors.push(ValidationError::with_step_key(
                        "duplicate_step_in_status",
                        format!(
                            "ステータス '{}' でステップ '{}' が重複しています",
                            status.key, step.key
                        ),
                        &step.key,
                    ));
                }
            }
        }
    }
}

/// ルール 5: キーが空でなく区切り文字を含まない
fn validate_keys(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    for process in &module.processes {
        if !is_valid_key(&process.key) {
            errors.push(ValidationError::new(
                "invalid_key",
                format!("プロセスキー '{}' は無効です", process.key),
            ));
        }
    }
    for step in all_steps(module) {
        if !is_valid_key(&step.key) {
            errors.push(ValidationError::with_step_key(
                "invalid_key",
                format!("ステップキー '{}' は無効です", step.key),
                &step.key,
            ));
        }
    }
}

/// ルール 6: 同じステップキーは同じ定義を指す
///
/// ステップキーは完了記録の結合キーなので、複数のステータスで再利用する場合は
/// 名前・能力タグまで一致している必要がある。
fn validate_step_keys_consistent(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    let mut first_seen: HashMap<&str, &StepDefinition> = HashMap::new();
    let mut reported = HashSet::new();

    for step in all_steps(module) {
        match first_seen.get(step.key.as_str()) {
            None => {
                first_seen.insert(step.key.as_str(), step);
            }
            Some(existing) if *existing != step && reported.insert(step.key.as_str()) => {
                errors.push(ValidationError::with_step_key(
                    "conflicting_step_definition",
                    format!(
                        "ステップキー '{}' に異なる定義が宣言されています",
                        step.key
                    ),
                    &step.key,
                ));
            }
            Some(_) => {}
        }
    }
}

/// ルール 7: 能力タグの整合性
///
/// - メールテンプレートが空でない
/// - 日付と週範囲を同時に要求しない
fn validate_capabilities(module: &TenantModule, errors: &mut Vec<ValidationError>) {
    let mut checked = HashSet::new();

    for step in all_steps(module) {
        if !checked.insert(step.key.as_str()) {
            continue;
        }

        let has_empty_template = step.capabilities.iter().any(|capability| {
            matches!(capability, StepCapability::Email { template } if template.trim().is_empty())
        });
        if has_empty_template {
            errors.push(ValidationError::with_step_key(
                "empty_email_template",
                format!("ステップ '{}' のメールテンプレートが空です", step.key),
                &step.key,
            ));
        }

        if step.requires_date() && step.requires_week_range() {
            errors.push(ValidationError::with_step_key(
                "conflicting_capabilities",
                format!(
                    "ステップ '{}' は日付と週範囲を同時に要求できません",
                    step.key
                ),
                &step.key,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::workflow::{StatusDefinition, SubprocessDefinition};

    fn module(processes: Vec<ProcessDefinition>) -> TenantModule {
        TenantModule::new("trade", "Trade", processes)
    }

    fn process_with_steps(key: &str, steps: Vec<StepDefinition>) -> ProcessDefinition {
        let status = steps
            .into_iter()
            .fold(StatusDefinition::all("status", "Status"), StatusDefinition::step);
        ProcessDefinition::new(key, key).subprocess(SubprocessDefinition::new("sub", "Sub").status(status))
    }

    fn error_codes(result: &ValidationResult) -> Vec<&str> {
        result.errors.iter().map(|e| e.code.as_str()).collect()
    }

    #[test]
    fn test_有効な定義でバリデーション成功() {
        let result = validate_module(&module(vec![process_with_steps(
            "import",
            vec![StepDefinition::new("vehicleArrived", "Arrived").capability(StepCapability::Date)],
        )]));

        assert!(result.valid);
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_プロセスがない場合エラー() {
        let result = validate_module(&module(Vec::new()));

        assert!(!result.valid);
        assert_eq!(error_codes(&result), vec!["missing_process"]);
    }

    #[test]
    fn test_プロセスキーが重複している場合エラー() {
        let step = StepDefinition::new("a", "A");
        let result = validate_module(&module(vec![
            process_with_steps("import", vec![step.clone()]),
            process_with_steps("import", vec![step]),
        ]));

        assert_eq!(error_codes(&result), vec!["duplicate_process_key"]);
    }

    #[test]
    fn test_空のステータスはエラー() {
        let result = validate_module(&module(vec![process_with_steps("import", Vec::new())]));

        assert_eq!(error_codes(&result), vec!["empty_status"]);
    }

    #[test]
    fn test_空のサブプロセスと空のプロセスはエラー() {
        let result = validate_module(&module(vec![
            ProcessDefinition::new("import", "Import"),
            ProcessDefinition::new("export", "Export")
                .subprocess(SubprocessDefinition::new("sales", "Sales")),
        ]));

        assert_eq!(error_codes(&result), vec!["empty_process", "empty_subprocess"]);
    }

    #[test]
    fn test_同じキーの同一定義は再利用できる() {
        let shared = StepDefinition::new("contractSigned", "Contract signed")
            .capability(StepCapability::Date);
        let result = validate_module(&module(vec![
            process_with_steps("import", vec![shared.clone()]),
            process_with_steps("export", vec![shared]),
        ]));

        assert!(result.valid);
    }

    #[test]
    fn test_同じキーで異なる定義はエラー() {
        let result = validate_module(&module(vec![
            process_with_steps(
                "import",
                vec![StepDefinition::new("contractSigned", "Signed").capability(StepCapability::Date)],
            ),
            process_with_steps("export", vec![StepDefinition::new("contractSigned", "Signed")]),
        ]));

        assert_eq!(error_codes(&result), vec!["conflicting_step_definition"]);
        assert_eq!(result.errors[0].step_key.as_deref(), Some("contractSigned"));
    }

    #[test]
    fn test_同じステータス内のステップ重複はエラー() {
        let step = StepDefinition::new("a", "A");
        let result = validate_module(&module(vec![process_with_steps(
            "import",
            vec![step.clone(), step],
        )]));

        assert_eq!(error_codes(&result), vec!["duplicate_step_in_status"]);
    }

    #[test]
    fn test_メールテンプレートが空の場合エラー() {
        let result = validate_module(&module(vec![process_with_steps(
            "import",
            vec![StepDefinition::new("notify", "Notify").capability(StepCapability::Email {
                template: "  ".to_string(),
            })],
        )]));

        assert_eq!(error_codes(&result), vec!["empty_email_template"]);
    }

    #[test]
    fn test_日付と週範囲の同時指定はエラー() {
        let result = validate_module(&module(vec![process_with_steps(
            "import",
            vec![StepDefinition::new("planned", "Planned")
                .capability(StepCapability::Date)
                .capability(StepCapability::WeekRange)],
        )]));

        assert_eq!(error_codes(&result), vec!["conflicting_capabilities"]);
    }

    #[test]
    fn test_区切り文字を含むキーはエラー() {
        let result = validate_module(&module(vec![process_with_steps(
            "import",
            vec![StepDefinition::new("bad::key", "Bad")],
        )]));

        assert_eq!(error_codes(&result), vec!["invalid_key"]);
    }

    #[test]
    fn test_複数エラーが同時に返される() {
        let result = validate_module(&module(vec![
            process_with_steps("import", Vec::new()),
            process_with_steps("import", Vec::new()),
        ]));

        assert!(!result.valid);
        assert_eq!(
            error_codes(&result),
            vec!["duplicate_process_key", "empty_status", "empty_status"]
        );
        assert_eq!(result.messages().len(), 3);
    }
}
