//! # ワークフローのシード
//!
//! 全文書種別の標準ワークフロー（定義・状態・遷移）を DB に投入する。
//! 既存の行は変更しないため、何度実行してもよい。
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run -p erpflow-core-service --bin setup_workflows
//! DATABASE_URL=postgres://... cargo run -p erpflow-core-service --bin setup_workflows -- --only invoice
//! ```

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use erpflow_core_service::usecase::{SetupUseCaseImpl, WorkflowBlueprint};
use erpflow_domain::{clock::SystemClock, document::DocumentKind};
use erpflow_infra::{PgTransactionManager, db, repository::PostgresWorkflowDefinitionRepository};
use erpflow_shared::observability::{TracingConfig, init_tracing};

/// `--only <document_type>` を解釈する
fn parse_only(args: &[String]) -> anyhow::Result<Option<DocumentKind>> {
    match args {
        [] => Ok(None),
        [flag, kind] if flag == "--only" => Ok(Some(
            kind.parse::<DocumentKind>()
                .with_context(|| format!("不正な文書種別です: {kind}"))?,
        )),
        _ => bail!("使い方: setup_workflows [--only <document_type>]"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&TracingConfig::from_env("setup-workflows"));

    let args: Vec<String> = env::args().skip(1).collect();
    let blueprints = match parse_only(&args)? {
        Some(kind) => vec![WorkflowBlueprint::preset(kind)],
        None => WorkflowBlueprint::presets(),
    };

    let database_url = env::var("DATABASE_URL").context("DATABASE_URL が設定されていません")?;
    let pool = db::create_pool(&database_url, 2)
        .await
        .context("データベース接続に失敗しました")?;
    db::run_migrations(&pool)
        .await
        .context("マイグレーションに失敗しました")?;

    let usecase = SetupUseCaseImpl::new(
        Arc::new(PostgresWorkflowDefinitionRepository::new(pool.clone())),
        Arc::new(SystemClock),
        Arc::new(PgTransactionManager::new(pool)),
    );

    for report in usecase.seed_all(&blueprints).await? {
        println!("{report}");
    }

    Ok(())
}
