//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するヘルパー。
//! 各テストファイルが独立したクレートとしてコンパイルされるため、
//! モジュール全体で dead_code 警告を抑制する。

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use erpflow_domain::{
    document::{Document, DocumentHeader, DocumentId, DocumentKind},
    user::UserId,
    value_objects::{ActionName, ButtonColor, ColorCode, DisplayLabel, Money, StateName},
    workflow::{
        ApprovalEffect,
        NewWorkflowDefinition,
        NewWorkflowState,
        WorkflowDefinition,
        WorkflowDefinitionId,
        WorkflowState,
        WorkflowStateId,
        WorkflowTransition,
        WorkflowTransitionId,
        WorkflowTransitionRecord,
    },
};
use erpflow_infra::{
    PgTransactionManager,
    TransactionManager,
    repository::{PostgresWorkflowDefinitionRepository, WorkflowDefinitionRepository},
};
use sqlx::PgPool;

pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn test_user_id() -> UserId {
    UserId::from_uuid("00000000-0000-0000-0000-000000000001".parse().unwrap())
}

/// 出荷の最小ワークフロー（draft → prepared）
pub struct ShipmentFixture {
    pub definition: WorkflowDefinition,
    pub draft:      WorkflowState,
    pub prepared:   WorkflowState,
    pub prepare:    WorkflowTransition,
}

pub fn shipment_fixture() -> ShipmentFixture {
    let definition = WorkflowDefinition::new(NewWorkflowDefinition {
        id: WorkflowDefinitionId::new(),
        document_kind: DocumentKind::Shipment,
        name: DisplayLabel::new("出荷ワークフロー").unwrap(),
        initial_state: StateName::new("draft").unwrap(),
        requires_approval: false,
        approval_threshold: None,
        approval_permission: None,
        reactivation_permission: None,
        now: test_now(),
    })
    .unwrap();
    let state = |name: &str, order: u32| {
        WorkflowState::new(NewWorkflowState {
            id: WorkflowStateId::new(),
            workflow_id: definition.id().clone(),
            name: StateName::new(name).unwrap(),
            display_name: DisplayLabel::new(name).unwrap(),
            order,
            is_final: false,
            requires_approval: false,
            color_code: ColorCode::new("#6c757d").unwrap(),
        })
    };
    let draft = state("draft", 10);
    let prepared = state("prepared", 20);
    let prepare = WorkflowTransition::new(WorkflowTransitionRecord {
        id: WorkflowTransitionId::new(),
        workflow_id: definition.id().clone(),
        from_state: StateName::new("draft").unwrap(),
        to_state: StateName::new("prepared").unwrap(),
        action: ActionName::new("prepare").unwrap(),
        name: DisplayLabel::new("出荷準備").unwrap(),
        required_permission: None,
        approval_effect: ApprovalEffect::None,
        button_color: ButtonColor::Blue,
    });

    ShipmentFixture {
        definition,
        draft,
        prepared,
        prepare,
    }
}

/// フィクスチャのワークフローを DB に登録する
pub async fn seed_shipment_workflow(pool: &PgPool) -> ShipmentFixture {
    let fixture = shipment_fixture();
    let repo = PostgresWorkflowDefinitionRepository::new(pool.clone());
    let mut tx = PgTransactionManager::new(pool.clone()).begin().await.unwrap();

    repo.get_or_create_definition(&mut tx, &fixture.definition)
        .await
        .unwrap();
    repo.get_or_create_state(&mut tx, &fixture.draft)
        .await
        .unwrap();
    repo.get_or_create_state(&mut tx, &fixture.prepared)
        .await
        .unwrap();
    repo.get_or_create_transition(&mut tx, &fixture.prepare)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    fixture
}

/// ID 採番済みの下書き文書
pub fn draft_document(kind: DocumentKind, document_no: &str, total: u32) -> Document {
    let mut header = DocumentHeader::draft(document_no, Money::from_major(total), test_now());
    header.id = Some(DocumentId::new());
    Document::draft(kind, header)
}
