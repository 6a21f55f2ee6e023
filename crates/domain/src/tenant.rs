//! # テナント
//!
//! 車両を取引する各社（テナント）のモデル。
//!
//! ## マルチテナントとワークフローモジュール
//!
//! 各テナントは設定キー [`WORKFLOW_NAMESPACE_KEY`] で、どのワークフローモジュール
//! （プロセスツリーの宣言）を使うかを指定する。車両は必ず 1 つのテナントに属し、
//! その車両のワークフローは所属テナントのモジュールからのみ定義を解決する。
//!
//! ## 使用例
//!
//! ```rust
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use carflow_domain::tenant::{Tenant, TenantId, TenantName};
//! use carflow_domain::user::Email;
//!
//! let tenant = Tenant::from_db(
//!     TenantId::new(),
//!     TenantName::new("Autohandel Noord B.V.")?,
//!     Some(Email::new("info@autohandel-noord.nl")?),
//! );
//! assert_eq!(tenant.name().as_str(), "Autohandel Noord B.V.");
//! # Ok(())
//! # }
//! ```

use crate::user::Email;

/// テナント設定のうち、ワークフローモジュールの名前空間を保持するキー
pub const WORKFLOW_NAMESPACE_KEY: &str = "workflowNamespace";

define_uuid_id! {
    /// テナント（会社）の一意識別子
    ///
    /// すべての業務エンティティ（ワークフロー、車両、完了記録）はこの ID を持ち、
    /// テナント間のデータ分離を保証する。
    pub struct TenantId;
}

define_validated_string! {
    /// テナント名（値オブジェクト）
    ///
    /// # 不変条件
    ///
    /// - 空文字列ではない
    /// - 最大 255 文字（DB: `VARCHAR(255)`）
    pub struct TenantName {
        label: "テナント名",
        max_length: 255,
    }
}

/// テナント（会社）エンティティ
///
/// 通知の宛先解決では、ユーザーが見つからない場合のフォールバックとして
/// テナントのメールアドレスを照合する。
#[derive(Debug, Clone)]
pub struct Tenant {
    id:    TenantId,
    name:  TenantName,
    email: Option<Email>,
}

impl Tenant {
    /// データベースからテナントを復元する
    pub fn from_db(id: TenantId, name: TenantName, email: Option<Email>) -> Self {
        Self { id, name, email }
    }

    pub fn id(&self) -> &TenantId {
        &self.id
    }

    pub fn name(&self) -> &TenantName {
        &self.name
    }

    pub fn email(&self) -> Option<&Email> {
        self.email.as_ref()
    }
}
