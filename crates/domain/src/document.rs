//! # 業務文書
//!
//! ワークフローに従う 4 種類の業務文書（受注・発注・請求書・出荷）。
//! 文書そのものはワークフローエンジンの外部エンティティであり、
//! エンジンは文書種別と ID の組（[`DocumentRef`]）でワークフローと結び付ける。
//!
//! 種別ごとの差異は `Document` の列挙子で表現し、共通の振る舞いは
//! [`WorkflowDocument`] トレイトで提供する。

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoStaticStr};

use crate::{
    DomainError,
    user::UserId,
    value_objects::{Money, StateName},
};

define_uuid_id! {
    /// 文書 ID
    pub struct DocumentId;
}

/// 文書種別
///
/// 文字列表現（`document_type`）はワークフロー定義のキーと一致する。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    IntoStaticStr,
    EnumIter,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentKind {
    SalesOrder,
    PurchaseOrder,
    Invoice,
    Shipment,
}

impl DocumentKind {
    /// ワークフロー定義の `document_type` キー
    pub fn document_type(&self) -> &'static str {
        self.into()
    }

    /// 設定に関係なく承認を要求しない種別か
    pub fn is_approval_exempt(&self) -> bool {
        matches!(self, Self::Shipment)
    }

    /// 再開できるステータス
    pub fn reactivatable_statuses(&self) -> &'static [DocStatus] {
        match self {
            Self::Invoice => &[DocStatus::Paid, DocStatus::Closed],
            Self::SalesOrder | Self::PurchaseOrder | Self::Shipment => {
                &[DocStatus::Complete, DocStatus::Closed]
            }
        }
    }

    /// 再開後のステータス
    pub fn reactivation_target(&self) -> DocStatus {
        match self {
            Self::Invoice => DocStatus::Sent,
            Self::SalesOrder | Self::PurchaseOrder | Self::Shipment => DocStatus::InProgress,
        }
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sales_order" => Ok(Self::SalesOrder),
            "purchase_order" => Ok(Self::PurchaseOrder),
            "invoice" => Ok(Self::Invoice),
            "shipment" => Ok(Self::Shipment),
            _ => Err(DomainError::Validation(format!("不正な文書種別: {s}"))),
        }
    }
}

/// 文書への多態参照（種別 + ID）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[display("{kind}:{id}")]
pub struct DocumentRef {
    pub kind: DocumentKind,
    pub id:   DocumentId,
}

impl DocumentRef {
    pub fn new(kind: DocumentKind, id: DocumentId) -> Self {
        Self { kind, id }
    }
}

/// 文書ステータス（`doc_status`）
///
/// ワークフローの現在状態のミラー。状態名 `draft` のみ `drafted` に対応し、
/// それ以外は同名のステータスに対応する。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoStaticStr, strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocStatus {
    Drafted,
    PendingApproval,
    Approved,
    InProgress,
    Complete,
    Closed,
    Rejected,
    Sent,
    PartialPayment,
    Overdue,
    Paid,
    Cancelled,
    Prepared,
    InTransit,
    Delivered,
    Returned,
}

impl DocStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 対応するワークフロー状態名
    pub fn state_name(&self) -> &'static str {
        match self {
            Self::Drafted => "draft",
            other => other.as_str(),
        }
    }

    /// ワークフロー状態名からステータスを求める
    ///
    /// # エラー
    ///
    /// 対応するステータスがない状態名は `DomainError::Validation`
    pub fn from_state_name(state: &StateName) -> Result<Self, DomainError> {
        match state.as_str() {
            "draft" => Ok(Self::Drafted),
            "drafted" => Err(DomainError::Validation(
                "状態名 drafted は使用できません（draft を使用してください）".to_string(),
            )),
            other => other.parse(),
        }
    }
}

impl FromStr for DocStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drafted" => Ok(Self::Drafted),
            "pending_approval" => Ok(Self::PendingApproval),
            "approved" => Ok(Self::Approved),
            "in_progress" => Ok(Self::InProgress),
            "complete" => Ok(Self::Complete),
            "closed" => Ok(Self::Closed),
            "rejected" => Ok(Self::Rejected),
            "sent" => Ok(Self::Sent),
            "partial_payment" => Ok(Self::PartialPayment),
            "overdue" => Ok(Self::Overdue),
            "paid" => Ok(Self::Paid),
            "cancelled" => Ok(Self::Cancelled),
            "prepared" => Ok(Self::Prepared),
            "in_transit" => Ok(Self::InTransit),
            "delivered" => Ok(Self::Delivered),
            "returned" => Ok(Self::Returned),
            _ => Err(DomainError::Validation(format!("不正な文書ステータス: {s}"))),
        }
    }
}

// =========================================================================
// 文書本体
// =========================================================================

/// 全文書共通のヘッダ項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentHeader {
    /// 未保存の文書は `None`
    pub id:          Option<DocumentId>,
    pub document_no: String,
    pub doc_status:  DocStatus,
    pub grand_total: Money,
    pub description: Option<String>,
    pub updated_by:  Option<UserId>,
    pub updated_at:  DateTime<Utc>,
}

impl DocumentHeader {
    /// 下書きのヘッダを作成する
    pub fn draft(document_no: impl Into<String>, grand_total: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: None,
            document_no: document_no.into(),
            doc_status: DocStatus::Drafted,
            grand_total,
            description: None,
            updated_by: None,
            updated_at: now,
        }
    }

    /// 変更者と変更日時を打刻する
    pub fn touch(&mut self, actor: &UserId, now: DateTime<Utc>) {
        self.updated_by = Some(actor.clone());
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub header:         DocumentHeader,
    pub date_delivered: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub header:        DocumentHeader,
    pub date_received: Option<NaiveDate>,
    pub is_received:   bool,
}

/// 請求書
///
/// 入金額の管理は請求書自身の責務。`open_amount` は未入金残高。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub header:      DocumentHeader,
    pub paid_amount: Money,
    pub open_amount: Money,
    pub is_paid:     bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shipment {
    pub header:        DocumentHeader,
    pub date_received: Option<NaiveDate>,
    pub is_in_transit: bool,
    pub tracking_no:   Option<String>,
}

/// 業務文書（種別ごとのタグ付き共用体）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Document {
    SalesOrder(SalesOrder),
    PurchaseOrder(PurchaseOrder),
    Invoice(Invoice),
    Shipment(Shipment),
}

impl Document {
    /// 指定種別の下書き文書を作成する
    pub fn draft(kind: DocumentKind, header: DocumentHeader) -> Self {
        match kind {
            DocumentKind::SalesOrder => Self::SalesOrder(SalesOrder {
                header,
                date_delivered: None,
            }),
            DocumentKind::PurchaseOrder => Self::PurchaseOrder(PurchaseOrder {
                header,
                date_received: None,
                is_received: false,
            }),
            DocumentKind::Invoice => {
                let open_amount = header.grand_total;
                Self::Invoice(Invoice {
                    header,
                    paid_amount: Money::zero(),
                    open_amount,
                    is_paid: false,
                })
            }
            DocumentKind::Shipment => Self::Shipment(Shipment {
                header,
                date_received: None,
                is_in_transit: false,
                tracking_no: None,
            }),
        }
    }

    pub fn header_mut(&mut self) -> &mut DocumentHeader {
        match self {
            Self::SalesOrder(d) => &mut d.header,
            Self::PurchaseOrder(d) => &mut d.header,
            Self::Invoice(d) => &mut d.header,
            Self::Shipment(d) => &mut d.header,
        }
    }
}

/// ワークフローに結び付けられる文書の共通インターフェース
///
/// 文書種別キーと閾値判定用の合計金額を提供する。
pub trait WorkflowDocument {
    fn kind(&self) -> DocumentKind;

    fn header(&self) -> &DocumentHeader;

    fn document_type(&self) -> &'static str {
        self.kind().document_type()
    }

    /// 永続化済みの文書のみ参照を返す
    fn document_ref(&self) -> Option<DocumentRef> {
        self.header()
            .id
            .clone()
            .map(|id| DocumentRef::new(self.kind(), id))
    }

    /// 承認閾値と比較する合計金額
    fn total_amount(&self) -> Money {
        self.header().grand_total
    }

    fn doc_status(&self) -> DocStatus {
        self.header().doc_status
    }
}

macro_rules! impl_workflow_document {
    ($ty:ty, $kind:expr) => {
        impl WorkflowDocument for $ty {
            fn kind(&self) -> DocumentKind {
                $kind
            }

            fn header(&self) -> &DocumentHeader {
                &self.header
            }
        }
    };
}

impl_workflow_document!(SalesOrder, DocumentKind::SalesOrder);
impl_workflow_document!(PurchaseOrder, DocumentKind::PurchaseOrder);
impl_workflow_document!(Invoice, DocumentKind::Invoice);
impl_workflow_document!(Shipment, DocumentKind::Shipment);

impl WorkflowDocument for Document {
    fn kind(&self) -> DocumentKind {
        match self {
            Self::SalesOrder(_) => DocumentKind::SalesOrder,
            Self::PurchaseOrder(_) => DocumentKind::PurchaseOrder,
            Self::Invoice(_) => DocumentKind::Invoice,
            Self::Shipment(_) => DocumentKind::Shipment,
        }
    }

    fn header(&self) -> &DocumentHeader {
        match self {
            Self::SalesOrder(d) => &d.header,
            Self::PurchaseOrder(d) => &d.header,
            Self::Invoice(d) => &d.header,
            Self::Shipment(d) => &d.header,
        }
    }
}
