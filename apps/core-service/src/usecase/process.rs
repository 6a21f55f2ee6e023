//! プロセス一覧ユースケース

use std::sync::Arc;

use carflow_domain::{tenant::TenantId, workflow::ProcessIdentifier};
use serde::Serialize;

use super::TenantModuleResolver;
use crate::error::CoreError;

/// 選択可能なプロセス
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessChoice {
    pub key:        String,
    pub identifier: ProcessIdentifier,
    pub name:       String,
}

/// プロセス一覧ユースケース
pub struct ProcessUseCaseImpl {
    resolver: Arc<TenantModuleResolver>,
}

impl ProcessUseCaseImpl {
    pub fn new(resolver: Arc<TenantModuleResolver>) -> Self {
        Self { resolver }
    }

    /// テナントが選べるプロセスを宣言順に返す
    pub async fn get_company_processes(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Vec<ProcessChoice>, CoreError> {
        let module = self.resolver.resolve(tenant_id).await?;

        Ok(module
            .processes
            .iter()
            .map(|process| ProcessChoice {
                key:        process.key.clone(),
                identifier: module.process_identifier(&process.key),
                name:       process.name.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::test_utils::WorkflowTestBuilder;

    #[tokio::test]
    async fn test_プロセスを宣言順に返す() {
        let builder = WorkflowTestBuilder::new();
        let sut = builder.build_process_usecase();

        let choices = sut.get_company_processes(builder.tenant_id()).await.unwrap();

        let identifiers: Vec<_> = choices.iter().map(|c| c.identifier.to_string()).collect();
        assert_eq!(identifiers, vec!["trade::import", "trade::export"]);
        assert_eq!(choices[0].name, "Import");
    }

    #[tokio::test]
    async fn test_モジュールが解決できなければ設定エラー() {
        let builder = WorkflowTestBuilder::new().with_namespace("leasing");
        let sut = builder.build_process_usecase();

        let result = sut.get_company_processes(builder.tenant_id()).await;

        assert!(matches!(result, Err(crate::error::CoreError::Configuration(_))));
    }
}
