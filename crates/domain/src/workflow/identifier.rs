//! # 修飾済み識別子
//!
//! プロセス・ステップは `<namespace>::<key>` 形式の識別子で永続化される。
//! 名前空間はテナントモジュールの名前空間、キーはモジュール内で一意な定義キー。
//!
//! ```rust
//! use carflow_domain::workflow::StepIdentifier;
//!
//! let identifier = StepIdentifier::new("trade", "hasReceivedOriginalDocuments");
//! assert_eq!(identifier.as_str(), "trade::hasReceivedOriginalDocuments");
//! assert_eq!(identifier.key(), "hasReceivedOriginalDocuments");
//! ```

use serde::{Deserialize, Serialize};

use crate::ConfigurationError;

/// 名前空間とキーの区切り文字
pub const IDENTIFIER_SEPARATOR: &str = "::";

macro_rules! define_qualified_identifier {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        $vis struct $Name {
            value:         String,
            separator_pos: usize,
        }

        impl $Name {
            /// 名前空間とキーから識別子を組み立てる
            pub fn new(namespace: &str, key: &str) -> Self {
                Self {
                    value:         format!("{namespace}{IDENTIFIER_SEPARATOR}{key}"),
                    separator_pos: namespace.len(),
                }
            }

            /// 永続化された文字列から復元する
            ///
            /// # Errors
            ///
            /// 区切り文字を含まない、または名前空間・キーが空の場合は
            /// `ConfigurationError::MalformedIdentifier`。
            pub fn parse(value: &str) -> Result<Self, ConfigurationError> {
                match value.split_once(IDENTIFIER_SEPARATOR) {
                    Some((namespace, key))
                        if !namespace.is_empty()
                            && !key.is_empty()
                            && !key.contains(IDENTIFIER_SEPARATOR) =>
                    {
                        Ok(Self::new(namespace, key))
                    }
                    _ => Err(ConfigurationError::MalformedIdentifier(value.to_string())),
                }
            }

            pub fn namespace(&self) -> &str {
                &self.value[..self.separator_pos]
            }

            pub fn key(&self) -> &str {
                &self.value[self.separator_pos + IDENTIFIER_SEPARATOR.len()..]
            }

            pub fn as_str(&self) -> &str {
                &self.value
            }
        }

        impl std::fmt::Display for $Name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.value)
            }
        }

        impl TryFrom<String> for $Name {
            type Error = ConfigurationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$Name> for String {
            fn from(identifier: $Name) -> Self {
                identifier.value
            }
        }
    };
}

define_qualified_identifier! {
    /// プロセス識別子（`<namespace>::<process_key>`）
    pub struct ProcessIdentifier;
}

define_qualified_identifier! {
    /// ステップ識別子（`<namespace>::<step_key>`）
    ///
    /// 完了記録の結合キー。同じキーのステップが複数のステータスに現れる場合も
    /// 同じ識別子になり、完了状態を共有する。
    pub struct StepIdentifier;
}
