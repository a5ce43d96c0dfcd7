//! # 文書ライフサイクル
//!
//! ワークフロー遷移に伴う文書側の変更（ステータスのミラーと種別ごとの付随項目）、
//! 再開（reactivate）、承認要否の判定、項目ロックを扱う。
//!
//! ここにある関数はすべて純粋関数で、永続化は呼び出し側のユースケースが
//! ワークフロー行の更新と同じトランザクションで行う。

use chrono::{DateTime, Utc};

use crate::{
    DomainError,
    action::{ActionError, ActionParams},
    document::{DocStatus, Document, DocumentKind, WorkflowDocument},
    user::UserId,
    value_objects::Money,
    workflow::{WorkflowDefinition, WorkflowState},
};

/// 文書が承認を必要とするか判定する
///
/// ワークフローがない文書（`definition` が `None`）、承認不要な定義、
/// 閾値が未設定の定義はいずれも `false`。出荷は設定に関係なく常に `false`。
pub fn needs_approval<D>(definition: Option<&WorkflowDefinition>, document: &D) -> bool
where
    D: WorkflowDocument + ?Sized,
{
    if document.kind().is_approval_exempt() {
        return false;
    }
    definition.is_some_and(|d| d.approval_required_for(document.total_amount()))
}

/// 遷移先の状態を文書に反映する
///
/// `doc_status` を遷移先のミラーに更新し、種別ごとの付随項目を設定して
/// 変更者を打刻する。検証はすべて変更前に行うため、エラー時に文書は変更されない。
///
/// # Errors
///
/// - `ActionError::ConfigurationMissing`: 遷移先の状態名に対応するステータスがない
/// - `ActionError::InvalidInput`: 一部入金の金額が欠落・範囲外、または入金額が請求額を超えている
pub fn apply_transition(
    document: &mut Document,
    target: &WorkflowState,
    params: &ActionParams,
    actor: &UserId,
    now: DateTime<Utc>,
) -> Result<DocStatus, ActionError> {
    let status = DocStatus::from_state_name(target.name())
        .map_err(|e| ActionError::ConfigurationMissing(e.to_string()))?;
    let today = now.date_naive();

    match document {
        Document::SalesOrder(order) => match status {
            DocStatus::Complete => order.date_delivered = Some(today),
            s if is_working(s) => order.date_delivered = None,
            _ => {}
        },
        Document::PurchaseOrder(order) => match status {
            DocStatus::Complete => {
                order.date_received = Some(today);
                order.is_received = true;
            }
            s if is_working(s) => {
                order.date_received = None;
                order.is_received = false;
            }
            _ => {}
        },
        Document::Invoice(invoice) => {
            let from = invoice.header.doc_status;
            match status {
                DocStatus::Paid => {
                    invoice.paid_amount = invoice.header.grand_total;
                    invoice.open_amount = Money::zero();
                    invoice.is_paid = true;
                }
                DocStatus::PartialPayment => {
                    let amount = partial_payment_amount(params.amount, invoice.open_amount)?;
                    invoice.open_amount = invoice
                        .open_amount
                        .minus(amount)
                        .map_err(|e| ActionError::InvalidInput(e.to_string()))?;
                    invoice.paid_amount = invoice.paid_amount.plus(amount);
                }
                DocStatus::Sent if from == DocStatus::Approved => {
                    invoice.open_amount = invoice
                        .header
                        .grand_total
                        .minus(invoice.paid_amount)
                        .map_err(|_| {
                            ActionError::InvalidInput(format!(
                                "入金額 {} が請求額 {} を超えています",
                                invoice.paid_amount, invoice.header.grand_total
                            ))
                        })?;
                }
                _ => {}
            }
        }
        Document::Shipment(shipment) => match status {
            DocStatus::InTransit => shipment.is_in_transit = true,
            DocStatus::Delivered => {
                shipment.date_received = Some(today);
                shipment.is_in_transit = false;
            }
            DocStatus::Returned => shipment.is_in_transit = false,
            _ => {}
        },
    }

    let header = document.header_mut();
    header.doc_status = status;
    header.touch(actor, now);
    Ok(status)
}

/// 完了前の作業中ステータス（完了日を持たない）
fn is_working(status: DocStatus) -> bool {
    matches!(
        status,
        DocStatus::Drafted | DocStatus::PendingApproval | DocStatus::Approved | DocStatus::InProgress
    )
}

fn partial_payment_amount(amount: Option<Money>, open_amount: Money) -> Result<Money, ActionError> {
    let amount = amount.ok_or_else(|| {
        ActionError::InvalidInput("一部入金には入金額の指定が必要です".to_string())
    })?;
    if amount.is_zero() || amount >= open_amount {
        return Err(ActionError::InvalidInput(format!(
            "入金額は 0 より大きく未入金残高 {open_amount} 未満である必要があります: {amount}"
        )));
    }
    Ok(amount)
}

/// 文書を作業中のステータスに戻す
///
/// 種別ごとの完了項目を消去して変更者を打刻し、再開後のステータスを返す。
///
/// # Errors
///
/// - `ActionError::PreconditionFailed`: 現在のステータスが再開対象外
pub fn reactivate(
    document: &mut Document,
    actor: &UserId,
    now: DateTime<Utc>,
) -> Result<DocStatus, ActionError> {
    let kind = document.kind();
    let current = document.doc_status();
    if !kind.reactivatable_statuses().contains(&current) {
        return Err(ActionError::PreconditionFailed {
            status: current.to_string(),
        });
    }

    match document {
        Document::SalesOrder(order) => order.date_delivered = None,
        Document::PurchaseOrder(order) => {
            order.date_received = None;
            order.is_received = false;
        }
        Document::Invoice(invoice) => {
            invoice.paid_amount = Money::zero();
            invoice.open_amount = invoice.header.grand_total;
            invoice.is_paid = false;
        }
        Document::Shipment(shipment) => shipment.date_received = None,
    }

    let target = kind.reactivation_target();
    let header = document.header_mut();
    header.doc_status = target;
    header.touch(actor, now);
    Ok(target)
}

// =========================================================================
// 項目ロック
// =========================================================================

/// ワークフロー状態による項目の編集可否
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldLock {
    /// すべて編集可能
    Unlocked,
    /// 備考などの補足項目のみ編集可能
    NotesOnly,
    /// 編集不可
    Locked,
}

/// ロック判定の対象となる文書項目
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DocumentField {
    DocumentNo,
    GrandTotal,
    Description,
    TrackingNo,
}

/// 現在のワークフロー状態から項目ロックを求める
///
/// ワークフローがない文書（`state` が `None`）は従来データとして扱い、ロックしない。
pub fn field_lock(state: Option<&WorkflowState>) -> FieldLock {
    let Some(state) = state else {
        return FieldLock::Unlocked;
    };
    match state.name().as_str() {
        "draft" | "rejected" => FieldLock::Unlocked,
        "closed" | "paid" | "cancelled" => FieldLock::Locked,
        _ if state.is_final() => FieldLock::Locked,
        _ => FieldLock::NotesOnly,
    }
}

/// 項目が編集可能か判定する
pub fn is_field_editable(
    kind: DocumentKind,
    state: Option<&WorkflowState>,
    field: DocumentField,
) -> bool {
    match field_lock(state) {
        FieldLock::Unlocked => true,
        FieldLock::Locked => false,
        FieldLock::NotesOnly => match field {
            DocumentField::Description => true,
            // 出荷の追跡番号は発送準備中・輸送中なら更新できる
            DocumentField::TrackingNo => {
                kind == DocumentKind::Shipment
                    && state.is_some_and(|s| matches!(s.name().as_str(), "prepared" | "in_transit"))
            }
            DocumentField::DocumentNo | DocumentField::GrandTotal => false,
        },
    }
}

/// # Errors
///
/// - `DomainError::Forbidden`: 項目がロックされている
pub fn ensure_field_editable(
    kind: DocumentKind,
    state: Option<&WorkflowState>,
    field: DocumentField,
) -> Result<(), DomainError> {
    if is_field_editable(kind, state, field) {
        Ok(())
    } else {
        Err(DomainError::Forbidden(format!(
            "現在の状態「{}」では項目 {field} を変更できません",
            state.map(|s| s.name().as_str()).unwrap_or("-")
        )))
    }
}
