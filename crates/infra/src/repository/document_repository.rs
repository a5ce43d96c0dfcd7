//! # DocumentRepository
//!
//! 業務文書（受注・発注・請求書・出荷）の永続化。
//!
//! 文書種別ごとに別テーブルを持つ。共通ヘッダ列は全テーブルで同じ名前で、
//! 種別固有の列だけが異なる。

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use erpflow_domain::{
    document::{
        DocStatus,
        Document,
        DocumentHeader,
        DocumentId,
        DocumentKind,
        DocumentRef,
        Invoice,
        PurchaseOrder,
        SalesOrder,
        Shipment,
        WorkflowDocument,
    },
    user::UserId,
    value_objects::Money,
};
use rust_decimal::Decimal;
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

use crate::{db::TxContext, error::InfraError};

#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn find(&self, document: &DocumentRef) -> Result<Option<Document>, InfraError>;

    /// 行ロック（`FOR UPDATE`）を取って読み込む
    async fn find_for_update(
        &self,
        tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<Document>, InfraError>;

    /// # Errors
    ///
    /// - `InfraErrorKind::InvalidInput`: ID が未採番
    /// - `InfraErrorKind::Conflict`: 文書番号が重複している
    async fn insert(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError>;

    /// ヘッダと種別固有の列を書き戻す
    async fn update(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError>;
}

// ===== 行構造体 =====

#[derive(sqlx::FromRow)]
struct HeaderRow {
    id: Uuid,
    document_no: String,
    doc_status: String,
    grand_total: Decimal,
    description: Option<String>,
    updated_by: Option<Uuid>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HeaderRow> for DocumentHeader {
    type Error = InfraError;

    fn try_from(row: HeaderRow) -> Result<Self, Self::Error> {
        Ok(DocumentHeader {
            id: Some(DocumentId::from_uuid(row.id)),
            document_no: row.document_no,
            doc_status: row.doc_status.parse::<DocStatus>()?,
            grand_total: Money::new(row.grand_total)?,
            description: row.description,
            updated_by: row.updated_by.map(UserId::from_uuid),
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SalesOrderRow {
    #[sqlx(flatten)]
    header: HeaderRow,
    date_delivered: Option<NaiveDate>,
}

#[derive(sqlx::FromRow)]
struct PurchaseOrderRow {
    #[sqlx(flatten)]
    header: HeaderRow,
    date_received: Option<NaiveDate>,
    is_received: bool,
}

#[derive(sqlx::FromRow)]
struct InvoiceRow {
    #[sqlx(flatten)]
    header: HeaderRow,
    paid_amount: Decimal,
    open_amount: Decimal,
    is_paid: bool,
}

#[derive(sqlx::FromRow)]
struct ShipmentRow {
    #[sqlx(flatten)]
    header: HeaderRow,
    date_received: Option<NaiveDate>,
    is_in_transit: bool,
    tracking_no: Option<String>,
}

impl TryFrom<SalesOrderRow> for Document {
    type Error = InfraError;

    fn try_from(row: SalesOrderRow) -> Result<Self, Self::Error> {
        Ok(Document::SalesOrder(SalesOrder {
            header: row.header.try_into()?,
            date_delivered: row.date_delivered,
        }))
    }
}

impl TryFrom<PurchaseOrderRow> for Document {
    type Error = InfraError;

    fn try_from(row: PurchaseOrderRow) -> Result<Self, Self::Error> {
        Ok(Document::PurchaseOrder(PurchaseOrder {
            header: row.header.try_into()?,
            date_received: row.date_received,
            is_received: row.is_received,
        }))
    }
}

impl TryFrom<InvoiceRow> for Document {
    type Error = InfraError;

    fn try_from(row: InvoiceRow) -> Result<Self, Self::Error> {
        Ok(Document::Invoice(Invoice {
            header: row.header.try_into()?,
            paid_amount: Money::new(row.paid_amount)?,
            open_amount: Money::new(row.open_amount)?,
            is_paid: row.is_paid,
        }))
    }
}

impl TryFrom<ShipmentRow> for Document {
    type Error = InfraError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        Ok(Document::Shipment(Shipment {
            header: row.header.try_into()?,
            date_received: row.date_received,
            is_in_transit: row.is_in_transit,
            tracking_no: row.tracking_no,
        }))
    }
}

const HEADER_COLUMNS: &str =
    "id, document_no, doc_status, grand_total, description, updated_by, updated_at";

fn table_name(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::SalesOrder => "sales_orders",
        DocumentKind::PurchaseOrder => "purchase_orders",
        DocumentKind::Invoice => "invoices",
        DocumentKind::Shipment => "shipments",
    }
}

fn extra_columns(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::SalesOrder => "date_delivered",
        DocumentKind::PurchaseOrder => "date_received, is_received",
        DocumentKind::Invoice => "paid_amount, open_amount, is_paid",
        DocumentKind::Shipment => "date_received, is_in_transit, tracking_no",
    }
}

fn select_sql(kind: DocumentKind, for_update: bool) -> String {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    format!(
        "SELECT {HEADER_COLUMNS}, {} FROM {} WHERE id = $1{lock}",
        extra_columns(kind),
        table_name(kind),
    )
}

async fn fetch_document<'e, E>(
    executor: E,
    document: &DocumentRef,
    for_update: bool,
) -> Result<Option<Document>, InfraError>
where
    E: PgExecutor<'e>,
{
    let sql = select_sql(document.kind, for_update);
    let id = *document.id.as_uuid();
    match document.kind {
        DocumentKind::SalesOrder => sqlx::query_as::<_, SalesOrderRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Document::try_from)
            .transpose(),
        DocumentKind::PurchaseOrder => sqlx::query_as::<_, PurchaseOrderRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Document::try_from)
            .transpose(),
        DocumentKind::Invoice => sqlx::query_as::<_, InvoiceRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Document::try_from)
            .transpose(),
        DocumentKind::Shipment => sqlx::query_as::<_, ShipmentRow>(&sql)
            .bind(id)
            .fetch_optional(executor)
            .await?
            .map(Document::try_from)
            .transpose(),
    }
}

fn persisted_id(document: &Document) -> Result<Uuid, InfraError> {
    document
        .header()
        .id
        .as_ref()
        .map(|id| *id.as_uuid())
        .ok_or_else(|| InfraError::invalid_input("文書 ID が採番されていません"))
}

#[derive(Debug, Clone)]
pub struct PostgresDocumentRepository {
    pool: PgPool,
}

impl PostgresDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentRepository for PostgresDocumentRepository {
    #[tracing::instrument(skip_all, level = "debug", fields(%document))]
    async fn find(&self, document: &DocumentRef) -> Result<Option<Document>, InfraError> {
        fetch_document(&self.pool, document, false).await
    }

    #[tracing::instrument(skip_all, level = "debug", fields(%document))]
    async fn find_for_update(
        &self,
        tx: &mut TxContext,
        document: &DocumentRef,
    ) -> Result<Option<Document>, InfraError> {
        fetch_document(tx.conn(), document, true).await
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(kind = %document.kind(), document_no = %document.header().document_no)
    )]
    async fn insert(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        let id = persisted_id(document)?;
        let header = document.header();
        let kind = document.kind();
        let sql = match kind {
            DocumentKind::SalesOrder => format!(
                "INSERT INTO {} ({HEADER_COLUMNS}, {}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
                table_name(kind),
                extra_columns(kind)
            ),
            DocumentKind::PurchaseOrder => format!(
                "INSERT INTO {} ({HEADER_COLUMNS}, {}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
                table_name(kind),
                extra_columns(kind)
            ),
            DocumentKind::Invoice | DocumentKind::Shipment => format!(
                "INSERT INTO {} ({HEADER_COLUMNS}, {}) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
                table_name(kind),
                extra_columns(kind)
            ),
        };

        let query = sqlx::query(&sql)
            .bind(id)
            .bind(&header.document_no)
            .bind(header.doc_status.as_str())
            .bind(header.grand_total.amount())
            .bind(&header.description)
            .bind(header.updated_by.as_ref().map(UserId::as_uuid))
            .bind(header.updated_at);
        let query = match document {
            Document::SalesOrder(d) => query.bind(d.date_delivered),
            Document::PurchaseOrder(d) => query.bind(d.date_received).bind(d.is_received),
            Document::Invoice(d) => query
                .bind(d.paid_amount.amount())
                .bind(d.open_amount.amount())
                .bind(d.is_paid),
            Document::Shipment(d) => query
                .bind(d.date_received)
                .bind(d.is_in_transit)
                .bind(&d.tracking_no),
        };

        query.execute(tx.conn()).await.map_err(|e| {
            if matches!(&e, sqlx::Error::Database(db) if db.is_unique_violation()) {
                InfraError::conflict(kind.to_string(), header.document_no.clone())
            } else {
                InfraError::from(e)
            }
        })?;

        Ok(())
    }

    #[tracing::instrument(
        skip_all,
        level = "debug",
        fields(kind = %document.kind(), document_no = %document.header().document_no)
    )]
    async fn update(&self, tx: &mut TxContext, document: &Document) -> Result<(), InfraError> {
        let id = persisted_id(document)?;
        let header = document.header();
        let kind = document.kind();
        let extra = match kind {
            DocumentKind::SalesOrder => "date_delivered = $7",
            DocumentKind::PurchaseOrder => "date_received = $7, is_received = $8",
            DocumentKind::Invoice => "paid_amount = $7, open_amount = $8, is_paid = $9",
            DocumentKind::Shipment => "date_received = $7, is_in_transit = $8, tracking_no = $9",
        };
        let sql = format!(
            "UPDATE {} SET doc_status = $2, grand_total = $3, description = $4, \
             updated_by = $5, updated_at = $6, {extra} WHERE id = $1",
            table_name(kind),
        );

        let query = sqlx::query(&sql)
            .bind(id)
            .bind(header.doc_status.as_str())
            .bind(header.grand_total.amount())
            .bind(&header.description)
            .bind(header.updated_by.as_ref().map(UserId::as_uuid))
            .bind(header.updated_at);
        let query = match document {
            Document::SalesOrder(d) => query.bind(d.date_delivered),
            Document::PurchaseOrder(d) => query.bind(d.date_received).bind(d.is_received),
            Document::Invoice(d) => query
                .bind(d.paid_amount.amount())
                .bind(d.open_amount.amount())
                .bind(d.is_paid),
            Document::Shipment(d) => query
                .bind(d.date_received)
                .bind(d.is_in_transit)
                .bind(&d.tracking_no),
        };

        let result = query.execute(tx.conn()).await?;
        if result.rows_affected() == 0 {
            return Err(InfraError::unexpected(format!(
                "更新対象の文書が存在しません: {kind}:{id}"
            )));
        }

        Ok(())
    }
}
