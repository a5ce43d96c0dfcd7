//! # 値オブジェクト
//!
//! ワークフロー定義と文書で共有する値オブジェクトを定義する。
//!
//! | 型 | 内部表現 | 用途 |
//! |---|---|---|
//! | [`Version`] | `u32` | 楽観的ロック用のバージョン番号 |
//! | [`Money`] | `Decimal` | 文書金額・承認閾値・承認上限 |
//! | [`StateName`] | `String` | 状態の機械名（`draft`, `pending_approval` など） |
//! | [`ActionName`] | `String` | 遷移の機械名（`submit_approval`, `approve` など） |
//! | [`DisplayLabel`] | `String` | 画面表示用の名称 |
//! | [`ColorCode`] | `#rrggbb` | 状態バッジの表示色 |
//! | [`ButtonColor`] | enum | アクションボタンの表示色 |

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

// =========================================================================
// Version（バージョン番号）
// =========================================================================

/// バージョン番号
///
/// 文書ワークフローの楽観的ロックに使用する。1 から始まり、
/// 状態が変わるたびにインクリメントされる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Version(u32);

impl Version {
    pub fn initial() -> Self {
        Self(1)
    }

    /// # エラー
    ///
    /// 0 は `DomainError::Validation`
    pub fn new(value: u32) -> Result<Self, DomainError> {
        if value == 0 {
            return Err(DomainError::Validation(
                "バージョン番号は 1 以上である必要があります".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn next(&self) -> Self {
        Self(self.0.saturating_add(1))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// i32 に変換する（DB 互換用）
    pub fn as_i32(&self) -> i32 {
        i32::try_from(self.0).unwrap_or(i32::MAX)
    }
}

impl TryFrom<i32> for Version {
    type Error = DomainError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        let value = u32::try_from(value).map_err(|_| {
            DomainError::Validation("バージョン番号は 1 以上である必要があります".to_string())
        })?;
        Self::new(value)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::initial()
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// =========================================================================
// Money（金額）
// =========================================================================

/// 金額（値オブジェクト）
///
/// 小数第 2 位までの非負の金額（端数は四捨五入）。DB では `NUMERIC(15,2)` に対応する。
/// 通貨は扱わない（単一通貨前提）。
///
/// ```rust
/// use erpflow_domain::value_objects::Money;
/// use rust_decimal::Decimal;
///
/// let total = Money::new(Decimal::new(150_000, 2)).unwrap();
/// assert_eq!(total.to_string(), "1500.00");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    /// # エラー
    ///
    /// 負の金額は `DomainError::Validation`
    pub fn new(amount: Decimal) -> Result<Self, DomainError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(DomainError::Validation(format!(
                "金額は 0 以上である必要があります: {amount}"
            )));
        }
        Ok(Self(
            amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        ))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// 整数の金額から作成する（シードデータ・テスト用）
    pub fn from_major(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn plus(&self, other: Money) -> Money {
        Self(self.0 + other.0)
    }

    /// 差額を返す。結果が負になる場合は `DomainError::Validation`
    pub fn minus(&self, other: Money) -> Result<Money, DomainError> {
        Self::new(self.0 - other.0)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = DomainError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

// =========================================================================
// 名前系
// =========================================================================

define_validated_string! {
    /// 状態の機械名
    ///
    /// ワークフロー定義内で一意。文書の `doc_status` と対応付けられる。
    pub struct StateName {
        label: "状態名",
        max_length: 50,
    }
}

define_validated_string! {
    /// アクション（遷移）の機械名
    ///
    /// `execute_action` に渡すキー。遷移元状態ごとに一意。
    pub struct ActionName {
        label: "アクション名",
        max_length: 50,
    }
}

define_validated_string! {
    /// 画面表示用の名称（状態の表示名、ボタンラベル、定義名）
    pub struct DisplayLabel {
        label: "表示名",
        max_length: 100,
    }
}

// =========================================================================
// ColorCode / ButtonColor
// =========================================================================

/// 状態バッジの表示色（`#rrggbb` 形式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ColorCode(String);

impl ColorCode {
    /// 未指定時の色（グレー）
    pub const DEFAULT: &'static str = "#6c757d";

    pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
        let value = value.into().trim().to_ascii_lowercase();
        let is_hex = value.len() == 7
            && value.starts_with('#')
            && value[1..].chars().all(|c| c.is_ascii_hexdigit());
        if !is_hex {
            return Err(DomainError::Validation(format!(
                "色コードは #rrggbb 形式である必要があります: {value}"
            )));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ColorCode {
    fn default() -> Self {
        Self(Self::DEFAULT.to_string())
    }
}

impl TryFrom<String> for ColorCode {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ColorCode> for String {
    fn from(value: ColorCode) -> Self {
        value.0
    }
}

/// アクションボタンの表示色
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ButtonColor {
    #[default]
    Blue,
    Green,
    Orange,
    Red,
    Gray,
}

impl FromStr for ButtonColor {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blue" => Ok(Self::Blue),
            "green" => Ok(Self::Green),
            "orange" => Ok(Self::Orange),
            "red" => Ok(Self::Red),
            "gray" => Ok(Self::Gray),
            _ => Err(DomainError::Validation(format!("不正なボタン色: {s}"))),
        }
    }
}
