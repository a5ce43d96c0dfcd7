//! # 文書番号の採番
//!
//! 文書種別ごとの連番カウンター。既存番号の最大値を走査せず、
//! カウンター行を排他ロックして 1 件ずつ払い出す（払い出しはインフラ層の責務）。
//! 年・月・日ごとに連番を振り直す設定もできる。
//!
//! ```rust
//! use erpflow_domain::{document::DocumentKind, sequence::NumberSequence};
//!
//! let seq = NumberSequence::default_for(DocumentKind::PurchaseOrder);
//! assert_eq!(seq.format(42), "PO-000042");
//! ```

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{EnumString, IntoStaticStr};

use crate::{DomainError, document::DocumentKind};

/// 連番を振り直す周期
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SequenceReset {
    #[default]
    Never,
    Year,
    Month,
    Day,
}

impl SequenceReset {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    /// 前回の払い出し日から周期の境界を越えているか
    pub fn crosses_boundary(&self, last: NaiveDate, today: NaiveDate) -> bool {
        match self {
            Self::Never => false,
            Self::Year => last.year() != today.year(),
            Self::Month => (last.year(), last.month()) != (today.year(), today.month()),
            Self::Day => last != today,
        }
    }
}

/// 文書番号の連番カウンター
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberSequence {
    document_kind:  DocumentKind,
    prefix:         String,
    suffix:         String,
    /// 次に払い出す番号
    current_next:   i64,
    increment:      i64,
    /// ゼロ埋め桁数
    padding:        usize,
    restart_every:  SequenceReset,
    /// 振り直し後の最初の番号
    start_no:       i64,
    last_issued_on: Option<NaiveDate>,
}

/// カウンターの DB 復元パラメータ
pub struct NumberSequenceRecord {
    pub document_kind:  DocumentKind,
    pub prefix:         String,
    pub suffix:         String,
    pub current_next:   i64,
    pub increment:      i64,
    pub padding:        i32,
    pub restart_every:  String,
    pub start_no:       i64,
    pub last_issued_on: Option<NaiveDate>,
}

impl NumberSequence {
    /// 種別ごとの既定設定（`SO-` / `PO-` / `INV-` / `SHP-`、6 桁、1 から開始）
    pub fn default_for(kind: DocumentKind) -> Self {
        let prefix = match kind {
            DocumentKind::SalesOrder => "SO-",
            DocumentKind::PurchaseOrder => "PO-",
            DocumentKind::Invoice => "INV-",
            DocumentKind::Shipment => "SHP-",
        };
        Self {
            document_kind:  kind,
            prefix:         prefix.to_string(),
            suffix:         String::new(),
            current_next:   1,
            increment:      1,
            padding:        6,
            restart_every:  SequenceReset::Never,
            start_no:       1,
            last_issued_on: None,
        }
    }

    /// # Errors
    ///
    /// - `DomainError::Validation`: 次番号・増分・開始番号が 1 未満、桁数が負、または振り直し周期が不正
    pub fn from_db(record: NumberSequenceRecord) -> Result<Self, DomainError> {
        if record.current_next < 1 || record.increment < 1 || record.start_no < 1 {
            return Err(DomainError::Validation(format!(
                "採番カウンターが不正です: next={}, increment={}, start={}",
                record.current_next, record.increment, record.start_no
            )));
        }
        let restart_every = record.restart_every.parse::<SequenceReset>().map_err(|_| {
            DomainError::Validation(format!("不正な振り直し周期: {}", record.restart_every))
        })?;
        let padding = usize::try_from(record.padding).map_err(|_| {
            DomainError::Validation(format!("桁数は 0 以上である必要があります: {}", record.padding))
        })?;
        Ok(Self {
            document_kind: record.document_kind,
            prefix: record.prefix,
            suffix: record.suffix,
            current_next: record.current_next,
            increment: record.increment,
            padding,
            restart_every,
            start_no: record.start_no,
            last_issued_on: record.last_issued_on,
        })
    }

    pub fn document_kind(&self) -> DocumentKind {
        self.document_kind
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn current_next(&self) -> i64 {
        self.current_next
    }

    pub fn increment(&self) -> i64 {
        self.increment
    }

    pub fn padding(&self) -> usize {
        self.padding
    }

    pub fn restart_every(&self) -> SequenceReset {
        self.restart_every
    }

    pub fn last_issued_on(&self) -> Option<NaiveDate> {
        self.last_issued_on
    }

    /// 振り直し周期を設定する
    pub fn restarting_every(self, restart_every: SequenceReset) -> Self {
        Self {
            restart_every,
            ..self
        }
    }

    /// 番号を文書番号の文字列に整形する
    pub fn format(&self, number: i64) -> String {
        format!(
            "{}{:0width$}{}",
            self.prefix,
            number,
            self.suffix,
            width = self.padding
        )
    }

    /// `today` の文書番号を払い出し、カウンターを進めたものと組で返す
    ///
    /// 前回の払い出しから振り直し周期の境界を越えていれば開始番号から払い出す。
    pub fn issue(self, today: NaiveDate) -> (String, Self) {
        let restart = self
            .last_issued_on
            .is_some_and(|last| self.restart_every.crosses_boundary(last, today));
        let current = if restart { self.start_no } else { self.current_next };
        let document_no = self.format(current);
        let next = Self {
            current_next: current.saturating_add(self.increment),
            last_issued_on: Some(today),
            ..self
        };
        (document_no, next)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(DocumentKind::SalesOrder, "SO-000001")]
    #[case(DocumentKind::PurchaseOrder, "PO-000001")]
    #[case(DocumentKind::Invoice, "INV-000001")]
    #[case(DocumentKind::Shipment, "SHP-000001")]
    fn test_既定設定の最初の番号(#[case] kind: DocumentKind, #[case] expected: &str) {
        let (document_no, _) = NumberSequence::default_for(kind).issue(date(2026, 1, 5));

        assert_eq!(document_no, expected);
    }

    #[test]
    fn test_払い出すとカウンターが増分だけ進む() {
        let seq = NumberSequence::from_db(NumberSequenceRecord {
            document_kind:  DocumentKind::Invoice,
            prefix:         "INV".to_string(),
            suffix:         "/26".to_string(),
            current_next:   7,
            increment:      5,
            padding:        3,
            restart_every:  "never".to_string(),
            start_no:       1,
            last_issued_on: None,
        })
        .unwrap();

        let (first, seq) = seq.issue(date(2026, 1, 5));
        let (second, seq) = seq.issue(date(2027, 1, 5));

        assert_eq!(first, "INV007/26");
        assert_eq!(second, "INV012/26");
        assert_eq!(seq.current_next(), 17);
    }

    #[test]
    fn test_桁数を超える番号は切り詰めない() {
        let seq = NumberSequence::default_for(DocumentKind::Shipment);

        assert_eq!(seq.format(1_234_567), "SHP-1234567");
    }

    #[rstest]
    #[case(0, 1, 6, "never")]
    #[case(1, 0, 6, "never")]
    #[case(1, 1, -1, "never")]
    #[case(1, 1, 6, "weekly")]
    fn test_不正なカウンターは復元できない(
        #[case] current_next: i64,
        #[case] increment: i64,
        #[case] padding: i32,
        #[case] restart_every: &str,
    ) {
        let result = NumberSequence::from_db(NumberSequenceRecord {
            document_kind: DocumentKind::SalesOrder,
            prefix: "SO-".to_string(),
            suffix: String::new(),
            current_next,
            increment,
            padding,
            restart_every: restart_every.to_string(),
            start_no: 1,
            last_issued_on: None,
        });

        assert!(result.is_err());
    }

    #[rstest]
    #[case(SequenceReset::Never, date(2026, 12, 31), date(2027, 1, 1), false)]
    #[case(SequenceReset::Year, date(2026, 12, 31), date(2027, 1, 1), true)]
    #[case(SequenceReset::Year, date(2026, 1, 1), date(2026, 12, 31), false)]
    #[case(SequenceReset::Month, date(2026, 1, 31), date(2026, 2, 1), true)]
    #[case(SequenceReset::Month, date(2025, 2, 10), date(2026, 2, 10), true)]
    #[case(SequenceReset::Month, date(2026, 2, 1), date(2026, 2, 28), false)]
    #[case(SequenceReset::Day, date(2026, 2, 1), date(2026, 2, 1), false)]
    #[case(SequenceReset::Day, date(2026, 2, 1), date(2026, 2, 2), true)]
    fn test_振り直し周期の境界(
        #[case] reset: SequenceReset,
        #[case] last: NaiveDate,
        #[case] today: NaiveDate,
        #[case] expected: bool,
    ) {
        assert_eq!(reset.crosses_boundary(last, today), expected);
    }

    #[test]
    fn test_年ごとの振り直しでは年が変わると開始番号に戻る() {
        let seq = NumberSequence::default_for(DocumentKind::Invoice)
            .restarting_every(SequenceReset::Year);

        let (first, seq) = seq.issue(date(2026, 12, 30));
        let (second, seq) = seq.issue(date(2026, 12, 31));
        let (third, seq) = seq.issue(date(2027, 1, 1));

        assert_eq!(first, "INV-000001");
        assert_eq!(second, "INV-000002");
        assert_eq!(third, "INV-000001");
        assert_eq!(seq.current_next(), 2);
        assert_eq!(seq.last_issued_on(), Some(date(2027, 1, 1)));
    }

    #[test]
    fn test_振り直し周期の文字列表現() {
        assert_eq!(SequenceReset::Month.as_str(), "month");
        assert_eq!("day".parse::<SequenceReset>().unwrap(), SequenceReset::Day);
    }
}
