//! # 組み込みプロセスカタログ
//!
//! テナントが選べるワークフローモジュールをコードで宣言する。
//! テナント設定 `workflowNamespace` の値がここの名前空間に対応する。
//!
//! | 名前空間 | 用途 |
//! |---------|------|
//! | `trade` | 車両の輸入・輸出（売買） |
//! | `service` | 整備・輸送代行などのサービス車両 |

mod service;
mod trade;

use super::registry::ModuleRegistry;
use crate::ConfigurationError;

/// 組み込みモジュールをすべて登録したレジストリを返す
///
/// # Errors
///
/// 宣言に不整合があれば `ConfigurationError::InvalidModule`。
pub fn default_registry() -> Result<ModuleRegistry, ConfigurationError> {
    let mut registry = ModuleRegistry::new();
    registry.register(trade::module())?;
    registry.register(service::module())?;
    Ok(registry)
}
