//! # テナントモジュールレジストリ
//!
//! 名前空間 → [`TenantModule`] の対応表。起動時にコードで宣言したカタログ
//! （または JSON）から組み立て、以後は読み取り専用で共有する。
//!
//! 登録時に [`validate_module`] を実行するため、レジストリに載った定義は
//! 構造的に整合していることが保証される。
//!
//! ```rust
//! use carflow_domain::workflow::{StepIdentifier, default_registry};
//!
//! let registry = default_registry().unwrap();
//! let step = registry
//!     .step(&StepIdentifier::new("trade", "hasReceivedOriginalDocuments"))
//!     .unwrap();
//! assert!(!step.sends_email());
//! ```

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};

use super::{
    definition::{ProcessDefinition, StepDefinition},
    definition_validator::validate_module,
    identifier::{ProcessIdentifier, StepIdentifier},
    record::WorkflowRecord,
};
use crate::{ConfigurationError, tracked_entity::RelationsPlan};

/// テナントモジュール
///
/// テナントが使うプロセスツリー一式と、追跡対象の読み込み計画。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantModule {
    pub namespace: String,
    pub name:      String,
    pub processes: Vec<Arc<ProcessDefinition>>,
    #[serde(default)]
    pub relations: Option<RelationsPlan>,
}

impl TenantModule {
    pub fn new(
        namespace: impl Into<String>,
        name: impl Into<String>,
        processes: Vec<ProcessDefinition>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            name:      name.into(),
            processes: processes.into_iter().map(Arc::new).collect(),
            relations: None,
        }
    }

    pub fn with_relations(mut self, relations: RelationsPlan) -> Self {
        self.relations = Some(relations);
        self
    }

    /// 読み込み計画。未宣言なら設定エラー
    pub fn relations_plan(&self) -> Result<&RelationsPlan, ConfigurationError> {
        self.relations
            .as_ref()
            .ok_or_else(|| ConfigurationError::RelationsPlanMissing {
                namespace: self.namespace.clone(),
            })
    }

    pub fn process(&self, key: &str) -> Option<&Arc<ProcessDefinition>> {
        self.processes.iter().find(|process| process.key == key)
    }

    /// モジュール内のどのプロセスに現れるステップでもキーで引ける
    pub fn step(&self, key: &str) -> Option<&Arc<StepDefinition>> {
        self.processes.iter().find_map(|process| process.find_step(key))
    }

    pub fn process_identifier(&self, key: &str) -> ProcessIdentifier {
        ProcessIdentifier::new(&self.namespace, key)
    }

    pub fn step_identifier(&self, key: &str) -> StepIdentifier {
        StepIdentifier::new(&self.namespace, key)
    }

    /// ワークフロー記録がこのモジュールの名前空間で作られたことを確かめる
    ///
    /// # Errors
    ///
    /// 名前空間が異なれば `ConfigurationError::NamespaceMismatch`。
    pub fn ensure_owns(&self, record: &WorkflowRecord) -> Result<(), ConfigurationError> {
        if record.namespace() == self.namespace {
            return Ok(());
        }
        Err(ConfigurationError::NamespaceMismatch {
            workflow_id: record.id().to_string(),
            expected:    self.namespace.clone(),
            actual:      record.namespace().to_string(),
        })
    }
}

/// テナントモジュールのレジストリ
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: BTreeMap<String, Arc<TenantModule>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// モジュールを検証して登録する
    ///
    /// # Errors
    ///
    /// 定義が不正、または同じ名前空間が登録済みの場合は `ConfigurationError::InvalidModule`。
    pub fn register(&mut self, module: TenantModule) -> Result<(), ConfigurationError> {
        let result = validate_module(&module);
        if !result.valid {
            return Err(ConfigurationError::InvalidModule {
                namespace: module.namespace,
                errors:    result.messages(),
            });
        }

        if self.modules.contains_key(&module.namespace) {
            return Err(ConfigurationError::InvalidModule {
                errors:    vec![format!("名前空間 '{}' は登録済みです", module.namespace)],
                namespace: module.namespace,
            });
        }

        self.modules
            .insert(module.namespace.clone(), Arc::new(module));
        Ok(())
    }

    /// JSON で記述されたモジュールを検証して登録する
    pub fn register_json(&mut self, json: &str) -> Result<(), ConfigurationError> {
        let module: TenantModule =
            serde_json::from_str(json).map_err(|e| ConfigurationError::InvalidModule {
                namespace: "<json>".to_string(),
                errors:    vec![e.to_string()],
            })?;
        self.register(module)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn module(&self, namespace: &str) -> Result<Arc<TenantModule>, ConfigurationError> {
        self.modules
            .get(namespace)
            .cloned()
            .ok_or_else(|| ConfigurationError::ModuleNotFound {
                namespace: namespace.to_string(),
            })
    }

    pub fn process(
        &self,
        identifier: &ProcessIdentifier,
    ) -> Result<Arc<ProcessDefinition>, ConfigurationError> {
        self.module(identifier.namespace())?
            .process(identifier.key())
            .cloned()
            .ok_or_else(|| ConfigurationError::ProcessNotFound {
                identifier: identifier.to_string(),
            })
    }

    pub fn step(
        &self,
        identifier: &StepIdentifier,
    ) -> Result<Arc<StepDefinition>, ConfigurationError> {
        self.module(identifier.namespace())?
            .step(identifier.key())
            .cloned()
            .ok_or_else(|| ConfigurationError::StepNotFound {
                identifier: identifier.to_string(),
            })
    }
}
