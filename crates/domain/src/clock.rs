//! # Clock（時刻プロバイダ）
//!
//! 完了記録やワークフロー作成時のタイムスタンプ付与に使う。
//! ユースケース層では `Utc::now()` を直接呼ばず、このトレイト経由で取得する。

use chrono::{DateTime, NaiveDate, Utc};

/// 現在時刻を提供するトレイト
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// 現在日付（UTC）
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// システム時刻を返す実装
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clockは呼び出し時点の時刻を返す() {
        let before = Utc::now();
        let result = SystemClock.now();
        let after = Utc::now();

        assert!(before <= result && result <= after);
    }

    #[test]
    fn test_fixed_clockのtodayは固定時刻の日付を返す() {
        let fixed = DateTime::from_timestamp(1_704_844_800, 0).unwrap(); // 2024-01-10T00:00:00Z
        let clock = FixedClock::new(fixed);

        assert_eq!(clock.now(), fixed);
        assert_eq!(
            clock.today(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
        );
    }
}
