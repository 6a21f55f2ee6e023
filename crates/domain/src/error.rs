//! # ドメイン層エラー定義
//!
//! ビジネスルール違反やドメイン固有の例外状態を表現するエラー型。
//!
//! ## 設計方針
//!
//! - **型による分類**: エラーの種類を列挙型で明示し、パターンマッチで処理可能に
//! - **thiserror 活用**: `#[error(...)]` マクロでエラーメッセージを自動生成
//! - **利用者エラーと設定エラーの分離**: テナント設定やプロセス定義の不整合は
//!   [`ConfigurationError`] として扱い、[`DomainError`] には混ぜない
//!
//! ## エラーの種類と HTTP ステータスの対応
//!
//! | エラー種別 | HTTP ステータス | 用途 |
//! |-----------|----------------|------|
//! | `DomainError::Validation` | 422 Unprocessable Entity | 入力値の検証失敗 |
//! | `ConfigurationError` | 500 Internal Server Error | デプロイ設定の不整合 |
//!
//! ## 使用例
//!
//! ```rust
//! use carflow_domain::{ConfigurationError, DomainError, tracked_entity::TrackedEntityType};
//!
//! let err = "truck".parse::<TrackedEntityType>().unwrap_err();
//! assert!(matches!(err, DomainError::Validation(_)));
//!
//! let err = ConfigurationError::ModuleNotFound {
//!     namespace: "unknown".to_string(),
//! };
//! assert!(err.to_string().contains("unknown"));
//! ```

use thiserror::Error;

/// ドメイン層で発生するエラー
///
/// ビジネスロジックの実行中に発生する例外状態を表現する。
/// API 層でこのエラーを受け取り、適切な HTTP レスポンスに変換する。
#[derive(Debug, Error)]
pub enum DomainError {
    /// バリデーションエラー
    ///
    /// 入力値がビジネスルールに違反している場合に使用する。
    #[error("バリデーションエラー: {0}")]
    Validation(String),
}

/// 設定エラー
///
/// テナント設定とプロセス定義の不整合を表す。利用者の入力ミスではなく
/// デプロイ時の設定ミスを意味するため、握りつぶさずに運用者へ届ける。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// テナントに `workflowNamespace` が設定されていない
    #[error("テナント {tenant_id} にワークフローモジュールが設定されていません")]
    NamespaceNotConfigured {
        /// 対象テナント
        tenant_id: String,
    },

    /// 名前空間に対応するモジュールが登録されていない
    #[error("ワークフローモジュールが見つかりません: {namespace}")]
    ModuleNotFound {
        /// 設定値の名前空間
        namespace: String,
    },

    /// モジュールにリレーション定義（RelationsPlan）がない
    #[error("ワークフローモジュール {namespace} にリレーション定義がありません")]
    RelationsPlanMissing {
        /// モジュールの名前空間
        namespace: String,
    },

    /// プロセス識別子が宣言済みツリーに存在しない
    #[error("プロセス定義が見つかりません: {identifier}")]
    ProcessNotFound {
        /// `<namespace>::<process_key>`
        identifier: String,
    },

    /// ステップ識別子が宣言済みツリーに存在しない
    #[error("ステップ定義が見つかりません: {identifier}")]
    StepNotFound {
        /// `<namespace>::<step_key>`
        identifier: String,
    },

    /// ワークフロー記録の名前空間がテナントのモジュールと異なる
    #[error(
        "ワークフロー {workflow_id} の名前空間 {actual} はテナントのモジュール {expected} と一致しません"
    )]
    NamespaceMismatch {
        /// 対象ワークフロー
        workflow_id: String,
        /// テナント設定の名前空間
        expected:    String,
        /// 記録に保存された名前空間
        actual:      String,
    },

    /// 識別子の形式が不正
    #[error("識別子の形式が不正です: {0}")]
    MalformedIdentifier(String),

    /// モジュール定義そのものが不正（登録時の検証失敗）
    #[error("ワークフローモジュール {namespace} の定義が不正です: {}", errors.join(", "))]
    InvalidModule {
        /// モジュールの名前空間
        namespace: String,
        /// 検証エラーメッセージ
        errors:    Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_バリデーションエラーのメッセージに理由が含まれる() {
        let err = DomainError::Validation("不正な追跡対象種別: truck".to_string());

        assert_eq!(err.to_string(), "バリデーションエラー: 不正な追跡対象種別: truck");
    }

    #[test]
    fn test_invalid_moduleのメッセージはエラーを連結する() {
        let err = ConfigurationError::InvalidModule {
            namespace: "trade".to_string(),
            errors:    vec!["a".to_string(), "b".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "ワークフローモジュール trade の定義が不正です: a, b"
        );
    }
}
