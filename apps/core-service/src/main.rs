//! # Core Service サーバー
//!
//! 業務文書のワークフローエンジンを内部 API として公開する。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `CORE_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `CORE_PORT` | **Yes** | ポート番号 |
//! | `DATABASE_URL` | **Yes** | PostgreSQL 接続 URL |
//! | `DATABASE_MAX_CONNECTIONS` | No | 接続プールの上限（デフォルト: 10） |
//! | `RUN_MIGRATIONS` | No | 起動時にマイグレーションを適用する（デフォルト: `true`） |
//! | `LOG_FORMAT` | No | `json` または `pretty` |
//!
//! ## 起動方法
//!
//! ```bash
//! CORE_PORT=3001 DATABASE_URL=postgres://... cargo run -p erpflow-core-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    Router,
    routing::{get, patch, post},
};
use erpflow_core_service::{
    config::CoreConfig,
    handler::{
        DocumentActionState,
        DocumentState,
        execute_action,
        health_check,
        list_actions,
        reactivate,
        register_document,
        update_notes,
        workflow_status,
    },
    usecase::{DocumentUseCaseImpl, WorkflowUseCaseImpl},
};
use erpflow_domain::clock::{Clock, SystemClock};
use erpflow_infra::{
    PgTransactionManager,
    TransactionManager,
    db,
    repository::{
        PostgresDocumentRepository,
        PostgresDocumentWorkflowRepository,
        PostgresNumberSequenceRepository,
        PostgresUserPermissionRepository,
        PostgresUserRepository,
        PostgresWorkflowApprovalRepository,
        PostgresWorkflowDefinitionRepository,
    },
};
use erpflow_shared::observability::{
    MakeRequestUuidV7,
    TracingConfig,
    init_tracing,
    make_request_span,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let tracing_config = TracingConfig::from_env("core-service");
    init_tracing(&tracing_config);
    let _tracing_guard = tracing::info_span!("app", service = "core-service").entered();

    let config = CoreConfig::from_env().context("設定の読み込みに失敗しました")?;
    tracing::info!(
        "Core Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    let pool = db::create_pool(&config.database_url, config.database_max_connections)
        .await
        .context("データベース接続に失敗しました")?;
    tracing::info!("データベースに接続しました");

    if config.run_migrations {
        db::run_migrations(&pool)
            .await
            .context("マイグレーションに失敗しました")?;
        tracing::info!("マイグレーションを適用しました");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tx_manager: Arc<dyn TransactionManager> = Arc::new(PgTransactionManager::new(pool.clone()));
    let document_repo = Arc::new(PostgresDocumentRepository::new(pool.clone()));

    let workflow_usecase = Arc::new(WorkflowUseCaseImpl::new(
        Arc::new(PostgresWorkflowDefinitionRepository::new(pool.clone())),
        Arc::new(PostgresDocumentWorkflowRepository::new(pool.clone())),
        Arc::new(PostgresWorkflowApprovalRepository::new(pool.clone())),
        document_repo.clone(),
        Arc::new(PostgresUserPermissionRepository::new(pool.clone())),
        Arc::new(PostgresUserRepository::new(pool.clone())),
        clock.clone(),
        tx_manager.clone(),
    ));
    let document_usecase = DocumentUseCaseImpl::new(
        document_repo,
        Arc::new(PostgresNumberSequenceRepository::new(pool.clone())),
        workflow_usecase.clone(),
        clock,
        tx_manager,
    );

    let action_state = Arc::new(DocumentActionState {
        usecase: workflow_usecase,
    });
    let document_state = Arc::new(DocumentState {
        usecase: document_usecase,
    });

    let app = Router::new()
        .route("/health", get(health_check))
        .merge(
            Router::new()
                .route(
                    "/internal/documents/{kind}/{id}/actions",
                    get(list_actions),
                )
                .route(
                    "/internal/documents/{kind}/{id}/actions/{action}",
                    post(execute_action),
                )
                .route(
                    "/internal/documents/{kind}/{id}/reactivate",
                    post(reactivate),
                )
                .route(
                    "/internal/documents/{kind}/{id}/workflow",
                    get(workflow_status),
                )
                .with_state(action_state),
        )
        .merge(
            Router::new()
                .route("/internal/documents/{kind}", post(register_document))
                .route(
                    "/internal/documents/{kind}/{id}",
                    patch(update_notes),
                )
                .with_state(document_state),
        )
        // 下に書いたものが外側
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("アドレスのパースに失敗しました")?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Core Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
