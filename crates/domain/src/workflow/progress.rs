//! # 完了状態ツリー
//!
//! プロセス定義をワークフローのスナップショットに結び付けたノード群。
//! 各ノードは `is_completed()` を持ち、子ノードは初回アクセス時に生成する。
//!
//! ## 完了判定
//!
//! | ノード | 判定 |
//! |-------|------|
//! | Step | 完了記録が存在する |
//! | Status | `All` ならすべてのステップ、`Any` ならいずれかのステップ |
//! | Subprocess | すべてのステータス |
//! | Process | すべてのサブプロセス |
//!
//! すべてのノードは同じ [`WorkflowSnapshot`] を `Arc` で共有するため、
//! 1 回の描画の中で完了状態が食い違うことはない。

use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

use chrono::NaiveDate;
use serde::Serialize;

use super::{
    definition::{
        ProcessDefinition, StatusCompletion, StatusDefinition, StepDefinition,
        SubprocessDefinition,
    },
    finished_step::{AdditionalValue, FinishedStep},
    identifier::StepIdentifier,
    record::WorkflowRecord,
};

/// ワークフロー記録と完了記録の読み取り専用スナップショット
#[derive(Debug)]
pub struct WorkflowSnapshot {
    record:   WorkflowRecord,
    finished: HashMap<StepIdentifier, FinishedStep>,
}

impl WorkflowSnapshot {
    pub fn new(record: WorkflowRecord, finished_steps: impl IntoIterator<Item = FinishedStep>) -> Self {
        let finished = finished_steps
            .into_iter()
            .map(|step| (step.step_identifier().clone(), step))
            .collect();
        Self { record, finished }
    }

    pub fn record(&self) -> &WorkflowRecord {
        &self.record
    }

    pub fn finished_step(&self, identifier: &StepIdentifier) -> Option<&FinishedStep> {
        self.finished.get(identifier)
    }

    pub fn finished_steps(&self) -> impl Iterator<Item = &FinishedStep> {
        self.finished.values()
    }
}

/// 完了ステップ数と全ステップ数
///
/// 読み取りのたびに数え直し、保存はしない。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub completed: usize,
    pub total:     usize,
}

impl Progress {
    /// 完了率（0〜100）。ステップがなければ 0
    pub fn percentage(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        u8::try_from(self.completed * 100 / self.total).unwrap_or(100)
    }
}

impl std::ops::Add for Progress {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            completed: self.completed + rhs.completed,
            total:     self.total + rhs.total,
        }
    }
}

impl std::iter::Sum for Progress {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |acc, p| acc + p)
    }
}

/// プロセスノード（ルート）
#[derive(Debug)]
pub struct ProcessNode {
    definition:   Arc<ProcessDefinition>,
    snapshot:     Arc<WorkflowSnapshot>,
    subprocesses: OnceLock<Vec<SubprocessNode>>,
}

impl ProcessNode {
    pub fn new(definition: Arc<ProcessDefinition>, snapshot: Arc<WorkflowSnapshot>) -> Self {
        Self {
            definition,
            snapshot,
            subprocesses: OnceLock::new(),
        }
    }

    pub fn definition(&self) -> &ProcessDefinition {
        &self.definition
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn snapshot(&self) -> &WorkflowSnapshot {
        &self.snapshot
    }

    pub fn subprocesses(&self) -> &[SubprocessNode] {
        self.subprocesses.get_or_init(|| {
            self.definition
                .subprocesses
                .iter()
                .map(|definition| SubprocessNode::new(Arc::clone(definition), Arc::clone(&self.snapshot)))
                .collect()
        })
    }

    pub fn subprocess(&self, key: &str) -> Option<&SubprocessNode> {
        self.subprocesses().iter().find(|node| node.key() == key)
    }

    /// 最初に見つかったステータス（宣言順）
    pub fn status(&self, key: &str) -> Option<&StatusNode> {
        self.subprocesses().iter().find_map(|node| node.status(key))
    }

    /// 最初に見つかったステップ（宣言順）
    pub fn step(&self, key: &str) -> Option<&StepNode> {
        self.subprocesses().iter().find_map(|node| node.step(key))
    }

    pub fn is_completed(&self) -> bool {
        self.subprocesses().iter().all(SubprocessNode::is_completed)
    }

    pub fn progress(&self) -> Progress {
        self.subprocesses().iter().map(SubprocessNode::progress).sum()
    }
}

/// サブプロセスノード
#[derive(Debug)]
pub struct SubprocessNode {
    definition: Arc<SubprocessDefinition>,
    snapshot:   Arc<WorkflowSnapshot>,
    statuses:   OnceLock<Vec<StatusNode>>,
}

impl SubprocessNode {
    fn new(definition: Arc<SubprocessDefinition>, snapshot: Arc<WorkflowSnapshot>) -> Self {
        Self {
            definition,
            snapshot,
            statuses: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn statuses(&self) -> &[StatusNode] {
        self.statuses.get_or_init(|| {
            self.definition
                .statuses
                .iter()
                .map(|definition| StatusNode::new(Arc::clone(definition), Arc::clone(&self.snapshot)))
                .collect()
        })
    }

    pub fn status(&self, key: &str) -> Option<&StatusNode> {
        self.statuses().iter().find(|node| node.key() == key)
    }

    pub fn step(&self, key: &str) -> Option<&StepNode> {
        self.statuses().iter().find_map(|node| node.step(key))
    }

    pub fn is_completed(&self) -> bool {
        self.statuses().iter().all(StatusNode::is_completed)
    }

    pub fn progress(&self) -> Progress {
        self.statuses().iter().map(StatusNode::progress).sum()
    }
}

/// ステータスノード
#[derive(Debug)]
pub struct StatusNode {
    definition: Arc<StatusDefinition>,
    snapshot:   Arc<WorkflowSnapshot>,
    steps:      OnceLock<Vec<StepNode>>,
}

impl StatusNode {
    fn new(definition: Arc<StatusDefinition>, snapshot: Arc<WorkflowSnapshot>) -> Self {
        Self {
            definition,
            snapshot,
            steps: OnceLock::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn completion(&self) -> StatusCompletion {
        self.definition.completion
    }

    pub fn steps(&self) -> &[StepNode] {
        self.steps.get_or_init(|| {
            let namespace = self.snapshot.record().namespace();
            self.definition
                .steps
                .iter()
                .map(|definition| {
                    StepNode {
                        identifier: StepIdentifier::new(namespace, &definition.key),
                        definition: Arc::clone(definition),
                        snapshot:   Arc::clone(&self.snapshot),
                    }
                })
                .collect()
        })
    }

    pub fn step(&self, key: &str) -> Option<&StepNode> {
        self.steps().iter().find(|node| node.key() == key)
    }

    pub fn is_completed(&self) -> bool {
        match self.definition.completion {
            StatusCompletion::All => self.steps().iter().all(StepNode::is_completed),
            StatusCompletion::Any => self.steps().iter().any(StepNode::is_completed),
        }
    }

    pub fn progress(&self) -> Progress {
        Progress {
            completed: self.steps().iter().filter(|step| step.is_completed()).count(),
            total:     self.steps().len(),
        }
    }
}

/// ステップノード（葉）
#[derive(Debug)]
pub struct StepNode {
    identifier: StepIdentifier,
    definition: Arc<StepDefinition>,
    snapshot:   Arc<WorkflowSnapshot>,
}

impl StepNode {
    pub fn identifier(&self) -> &StepIdentifier {
        &self.identifier
    }

    pub fn definition(&self) -> &StepDefinition {
        &self.definition
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// このステップの完了記録
    pub fn finished(&self) -> Option<&FinishedStep> {
        self.snapshot.finished_step(&self.identifier)
    }

    pub fn is_completed(&self) -> bool {
        self.finished().is_some()
    }

    pub fn finished_at(&self) -> Option<NaiveDate> {
        self.finished().and_then(FinishedStep::finished_at)
    }

    pub fn additional_value(&self) -> Option<&AdditionalValue> {
        self.finished().and_then(FinishedStep::additional_value)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    use super::*;
    use crate::{
        tenant::TenantId,
        tracked_entity::{TrackedEntityRef, TrackedEntityType},
        user::UserId,
        workflow::{
            NewFinishedStep, NewWorkflowRecord, ProcessIdentifier, StepCapability, WorkflowId,
        },
    };

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_704_844_800, 0).unwrap()
    }

    #[fixture]
    fn process() -> Arc<ProcessDefinition> {
        Arc::new(
            ProcessDefinition::new("import", "Import")
                .subprocess(
                    SubprocessDefinition::new("registration", "Registration")
                        .status(
                            StatusDefinition::all("documentsReceived", "Documents Received")
                                .step(StepDefinition::new("hasReceivedOriginalDocuments", "Originals")),
                        )
                        .status(
                            StatusDefinition::all("rdwApproved", "RDW Approved")
                                .step(StepDefinition::new("rdwInspectionPlanned", "Planned"))
                                .step(
                                    StepDefinition::new("rdwApproved", "Approved")
                                        .capability(StepCapability::Date),
                                ),
                        ),
                )
                .subprocess(
                    SubprocessDefinition::new("purchase", "Purchase").status(
                        StatusDefinition::any("paymentCompleted", "Payment Completed")
                            .step(StepDefinition::new("paidByBankTransfer", "Bank"))
                            .step(StepDefinition::new("paidInCash", "Cash")),
                    ),
                ),
        )
    }

    fn record() -> WorkflowRecord {
        WorkflowRecord::new(NewWorkflowRecord {
            id: WorkflowId::new(),
            tenant_id: TenantId::new(),
            entity: TrackedEntityRef::new(TrackedEntityType::Vehicle, Uuid::now_v7()),
            process_identifier: ProcessIdentifier::new("trade", "import"),
            created_by: UserId::new(),
            now: now(),
        })
    }

    fn finished(record: &WorkflowRecord, key: &str) -> FinishedStep {
        FinishedStep::new(NewFinishedStep {
            workflow_id: record.id().clone(),
            step_identifier: StepIdentifier::new(record.namespace(), key),
            additional_value: None,
            finished_at: Some(now().date_naive()),
            created_by: UserId::new(),
            now: now(),
        })
    }

    fn node(process: Arc<ProcessDefinition>, keys: &[&str]) -> ProcessNode {
        let record = record();
        let steps: Vec<_> = keys.iter().map(|key| finished(&record, key)).collect();
        ProcessNode::new(process, Arc::new(WorkflowSnapshot::new(record, steps)))
    }

    #[rstest]
    fn test_完了記録がなければどのノードも未完了(process: Arc<ProcessDefinition>) {
        let node = node(process, &[]);

        assert!(!node.is_completed());
        assert!(!node.status("documentsReceived").unwrap().is_completed());
        assert_eq!(node.progress(), Progress { completed: 0, total: 5 });
        assert_eq!(node.progress().percentage(), 0);
    }

    #[rstest]
    fn test_完了記録のあるステップとそのステータスは完了(process: Arc<ProcessDefinition>) {
        let node = node(process, &["hasReceivedOriginalDocuments"]);

        assert!(node.step("hasReceivedOriginalDocuments").unwrap().is_completed());
        assert!(node.status("documentsReceived").unwrap().is_completed());
        assert!(!node.subprocess("registration").unwrap().is_completed());
    }

    #[rstest]
    fn test_allステータスは全ステップ完了まで未完了(process: Arc<ProcessDefinition>) {
        let partial = node(Arc::clone(&process), &["rdwInspectionPlanned"]);
        assert!(!partial.status("rdwApproved").unwrap().is_completed());

        let full = node(process, &["rdwInspectionPlanned", "rdwApproved"]);
        assert!(full.status("rdwApproved").unwrap().is_completed());
    }

    #[rstest]
    #[case(&["paidByBankTransfer"])]
    #[case(&["paidInCash"])]
    #[case(&["paidByBankTransfer", "paidInCash"])]
    fn test_anyステータスはいずれかのステップで完了(
        process: Arc<ProcessDefinition>,
        #[case] keys: &[&str],
    ) {
        let node = node(process, keys);

        assert!(node.status("paymentCompleted").unwrap().is_completed());
        assert!(node.subprocess("purchase").unwrap().is_completed());
    }

    #[rstest]
    fn test_全ステップ完了でプロセスが完了(process: Arc<ProcessDefinition>) {
        let node = node(
            process,
            &[
                "hasReceivedOriginalDocuments",
                "rdwInspectionPlanned",
                "rdwApproved",
                "paidInCash",
            ],
        );

        assert!(node.is_completed());
        assert_eq!(node.progress(), Progress { completed: 4, total: 5 });
        assert_eq!(node.progress().percentage(), 80);
    }

    #[rstest]
    fn test_完了記録を追加しても完了済みノードは未完了に戻らない(process: Arc<ProcessDefinition>) {
        let mut keys = vec!["hasReceivedOriginalDocuments"];
        let before = node(Arc::clone(&process), &keys);
        keys.push("paidInCash");
        let after = node(process, &keys);

        for status in ["documentsReceived", "paymentCompleted", "rdwApproved"] {
            if before.status(status).unwrap().is_completed() {
                assert!(after.status(status).unwrap().is_completed());
            }
        }
    }

    #[rstest]
    fn test_ステップノードから完了日を参照できる(process: Arc<ProcessDefinition>) {
        let node = node(process, &["rdwApproved"]);
        let step = node.step("rdwApproved").unwrap();

        assert_eq!(step.identifier().as_str(), "trade::rdwApproved");
        assert_eq!(step.finished_at(), Some(now().date_naive()));
        assert_eq!(step.additional_value(), None);
    }

    #[rstest]
    fn test_別の名前空間の完了記録は一致しない(process: Arc<ProcessDefinition>) {
        let record = record();
        let foreign = FinishedStep::new(NewFinishedStep {
            workflow_id: record.id().clone(),
            step_identifier: StepIdentifier::new("service", "hasReceivedOriginalDocuments"),
            additional_value: None,
            finished_at: None,
            created_by: UserId::new(),
            now: now(),
        });
        let node = ProcessNode::new(process, Arc::new(WorkflowSnapshot::new(record, vec![foreign])));

        assert!(!node.step("hasReceivedOriginalDocuments").unwrap().is_completed());
    }
}
