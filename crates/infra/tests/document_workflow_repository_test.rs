//! DocumentWorkflowRepository 統合テスト

mod common;

use common::{seed_shipment_workflow, test_now, test_user_id};
use erpflow_domain::{
    document::{DocumentId, DocumentKind, DocumentRef},
    value_objects::Version,
    workflow::{DocumentWorkflow, DocumentWorkflowId, NewDocumentWorkflow},
};
use erpflow_infra::{
    InfraErrorKind,
    PgTransactionManager,
    TransactionManager,
    repository::{DocumentWorkflowRepository, PostgresDocumentWorkflowRepository},
};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "PostgreSQL が必要"]
async fn test_同じ文書への二重登録は挿入されない(pool: PgPool) {
    let fixture = seed_shipment_workflow(&pool).await;
    let repo = PostgresDocumentWorkflowRepository::new(pool.clone());
    let document = DocumentRef::new(DocumentKind::Shipment, DocumentId::new());
    let new_workflow = || {
        DocumentWorkflow::new(NewDocumentWorkflow {
            id: DocumentWorkflowId::new(),
            document: document.clone(),
            definition_id: fixture.definition.id().clone(),
            initial_state: &fixture.draft,
            created_by: Some(test_user_id()),
            now: test_now(),
        })
        .unwrap()
    };

    let mut tx = PgTransactionManager::new(pool).begin().await.unwrap();
    let first = repo.insert_if_absent(&mut tx, &new_workflow()).await.unwrap();
    let second = repo.insert_if_absent(&mut tx, &new_workflow()).await.unwrap();
    tx.commit().await.unwrap();

    assert!(first);
    assert!(!second);
    let stored = repo.find_by_document(&document).await.unwrap().unwrap();
    assert_eq!(stored.current_state().as_str(), "draft");
    assert_eq!(stored.version(), Version::initial());
}

#[sqlx::test(migrations = "../../migrations")]
#[ignore = "PostgreSQL が必要"]
async fn test_古いバージョンでの更新は競合になる(pool: PgPool) {
    let fixture = seed_shipment_workflow(&pool).await;
    let repo = PostgresDocumentWorkflowRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool);
    let workflow = DocumentWorkflow::new(NewDocumentWorkflow {
        id: DocumentWorkflowId::new(),
        document: DocumentRef::new(DocumentKind::Shipment, DocumentId::new()),
        definition_id: fixture.definition.id().clone(),
        initial_state: &fixture.draft,
        created_by: None,
        now: test_now(),
    })
    .unwrap();
    let mut tx = tx_manager.begin().await.unwrap();
    repo.insert_if_absent(&mut tx, &workflow).await.unwrap();
    tx.commit().await.unwrap();

    let advanced = workflow
        .clone()
        .transitioned(&fixture.prepared, test_now())
        .unwrap();
    let mut tx = tx_manager.begin().await.unwrap();
    repo.update_with_version_check(&mut tx, &advanced, workflow.version())
        .await
        .unwrap();
    tx.commit().await.unwrap();

    // 同じ旧バージョンでもう一度更新する
    let mut tx = tx_manager.begin().await.unwrap();
    let result = repo
        .update_with_version_check(&mut tx, &advanced, workflow.version())
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err.kind(), InfraErrorKind::Conflict { .. }));
}
