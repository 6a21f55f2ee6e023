//! # ユーザー
//!
//! 完了記録の作成者・ワークフローの作成者、および通知の宛先となる
//! バックオフィスのユーザーを定義する。
//!
//! ## 設計方針
//!
//! - **Newtype パターン**: UserId は UUID をラップし、型安全性を確保
//! - **バリデーション**: 値オブジェクトの生成時に検証ロジックを実行
//! - **PII 保護**: ユーザー名は Debug 出力でマスクする

use crate::{DomainError, tenant::TenantId};

define_uuid_id! {
    /// ユーザー ID（一意識別子）
    pub struct UserId;
}

define_validated_string! {
    /// ユーザー表示名
    pub struct UserName {
        label: "ユーザー名",
        max_length: 100,
        pii: true,
    }
}

/// メールアドレス（値オブジェクト）
///
/// 通知の宛先解決（ユーザー → テナントの順）に使う照合キー。
/// 比較は小文字化した値で行う。
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Email(String);

impl Email {
    /// メールアドレスを作成する
    ///
    /// # バリデーション
    ///
    /// - 空文字列ではない
    /// - `local@domain` の形式
    /// - 最大 255 文字
    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_lowercase();

        if value.is_empty() {
            return Err(DomainError::Validation(
                "メールアドレスは必須です".to_string(),
            ));
        }

        let Some((local, domain)) = value.split_once('@') else {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        };

        if local.is_empty() || domain.is_empty() || domain.contains('@') {
            return Err(DomainError::Validation(
                "メールアドレスの形式が不正です".to_string(),
            ));
        }

        if value.len() > 255 {
            return Err(DomainError::Validation(
                "メールアドレスは255文字以内である必要があります".to_string(),
            ));
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// ユーザーエンティティ
#[derive(Debug, Clone)]
pub struct User {
    id:        UserId,
    tenant_id: TenantId,
    email:     Email,
    name:      UserName,
}

impl User {
    pub fn from_db(id: UserId, tenant_id: TenantId, email: Email, name: UserName) -> Self {
        Self {
            id,
            tenant_id,
            email,
            name,
        }
    }

    pub fn id(&self) -> &UserId {
        &self.id
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn name(&self) -> &UserName {
        &self.name
    }
}
