//! テナントモジュールの解決
//!
//! テナント設定 `workflowNamespace` からワークフローモジュールを引く。

use std::sync::Arc;

use carflow_domain::{
    ConfigurationError,
    tenant::{TenantId, WORKFLOW_NAMESPACE_KEY},
    workflow::{ModuleRegistry, TenantModule},
};
use carflow_infra::repository::TenantConfigRepository;

use crate::error::CoreError;

/// テナント → ワークフローモジュールのリゾルバ
pub struct TenantModuleResolver {
    config_repo: Arc<dyn TenantConfigRepository>,
    registry:    Arc<ModuleRegistry>,
}

impl TenantModuleResolver {
    pub fn new(config_repo: Arc<dyn TenantConfigRepository>, registry: Arc<ModuleRegistry>) -> Self {
        Self {
            config_repo,
            registry,
        }
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// テナントが使うモジュールを返す
    ///
    /// # Errors
    ///
    /// 設定キーがない、または名前空間が未登録なら `CoreError::Configuration`。
    pub async fn resolve(&self, tenant_id: &TenantId) -> Result<Arc<TenantModule>, CoreError> {
        let namespace = self
            .config_repo
            .get_config(tenant_id, WORKFLOW_NAMESPACE_KEY)
            .await?
            .ok_or_else(|| ConfigurationError::NamespaceNotConfigured {
                tenant_id: tenant_id.to_string(),
            })?;

        Ok(self.registry.module(namespace.trim())?)
    }
}
