//! # Clock（時刻プロバイダ）
//!
//! 遷移時の `updated_at` や受領日・納品日の打刻に使う現在時刻を抽象化する。
//! ユースケースは `Utc::now()` を直接呼ばず、この trait 経由で時刻を得る。

use chrono::{DateTime, NaiveDate, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 業務日付（UTC 基準）
    ///
    /// 受領日 `date_received` などの日付項目はこの値で打刻する。
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// 実際のシステム時刻を返す実装
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 固定時刻を返すテスト用実装
pub struct FixedClock {
    now: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}
