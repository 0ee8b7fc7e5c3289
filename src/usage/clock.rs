//! # 统计日期时钟

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Local, NaiveDateTime};

/// 日期格式 YYYY-MM-DD
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 统计使用的时钟
pub trait UsageClock: Send + Sync {
    /// 当前时间
    fn now(&self) -> NaiveDateTime;

    /// 当前自然日，YYYY-MM-DD
    fn today(&self) -> String {
        self.now().format(DATE_FORMAT).to_string()
    }
}

/// 本地时区系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl UsageClock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// 手动推进的时钟，用于模拟跨日
#[derive(Debug)]
pub struct ManualClock {
    seconds: AtomicI64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            seconds: AtomicI64::new(start.and_utc().timestamp()),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.seconds.store(at.and_utc().timestamp(), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn advance_days(&self, days: i64) {
        self.advance(Duration::days(days));
    }
}

impl UsageClock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        DateTime::from_timestamp(self.seconds.load(Ordering::SeqCst), 0)
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_manual_clock_crosses_midnight() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_opt(23, 59, 30))
            .unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.today(), "2025-03-01");

        clock.advance(Duration::seconds(45));
        assert_eq!(clock.today(), "2025-03-02");

        clock.advance_days(30);
        assert_eq!(clock.today(), "2025-04-01");
    }

    #[test]
    fn test_manual_clock_set_jumps_backwards_and_forwards() {
        let start = NaiveDate::from_ymd_opt(2025, 3, 14)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        let clock = ManualClock::new(start);

        let earlier = NaiveDate::from_ymd_opt(2024, 12, 31)
            .and_then(|d| d.and_hms_opt(23, 0, 0))
            .unwrap();
        clock.set(earlier);
        assert_eq!(clock.now(), earlier);
        assert_eq!(clock.today(), "2024-12-31");

        clock.set(start);
        assert_eq!(clock.today(), "2025-03-14");
    }

    #[test]
    fn test_system_clock_formats_date() {
        let today = SystemClock.today();
        assert_eq!(today.len(), 10);
        assert!(NaiveDate::parse_from_str(&today, DATE_FORMAT).is_ok());
    }
}
