//! # 用量统计数据类型

use chrono::NaiveDateTime;
use entity::api_stats;
use serde::Serialize;

/// 某个 API 路径某一天的用量计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageCounter {
    /// 持久化行 ID，尚未落库时为 `None`
    pub id: Option<i32>,
    pub endpoint_id: i32,
    /// YYYY-MM-DD
    pub date: String,
    pub call_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_hit_tokens: i64,
    pub last_updated: NaiveDateTime,
    /// 自上次成功落库后是否有新增量
    #[serde(skip)]
    pub dirty: bool,
}

impl UsageCounter {
    /// 新建一个归零且未落库的计数
    #[must_use]
    pub fn zeroed(endpoint_id: i32, date: impl Into<String>, now: NaiveDateTime) -> Self {
        Self {
            id: None,
            endpoint_id,
            date: date.into(),
            call_count: 0,
            input_tokens: 0,
            output_tokens: 0,
            cache_hit_tokens: 0,
            last_updated: now,
            dirty: false,
        }
    }

    /// 累加一次调用，达到 `i64::MAX` 后不再增长
    pub fn record(&mut self, input_tokens: i64, output_tokens: i64, cache_hit_tokens: i64, now: NaiveDateTime) {
        self.call_count = self.call_count.saturating_add(1);
        self.input_tokens = self.input_tokens.saturating_add(input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(output_tokens);
        self.cache_hit_tokens = self.cache_hit_tokens.saturating_add(cache_hit_tokens);
        self.last_updated = now;
        self.dirty = true;
    }

    /// 计数是否属于给定日期
    #[must_use]
    pub fn is_for(&self, date: &str) -> bool {
        self.date == date
    }
}

impl From<api_stats::Model> for UsageCounter {
    fn from(model: api_stats::Model) -> Self {
        Self {
            id: Some(model.id),
            endpoint_id: model.api_endpoint_id,
            date: model.date,
            call_count: model.call_count,
            input_tokens: model.input_tokens,
            output_tokens: model.output_tokens,
            cache_hit_tokens: model.cache_hit_tokens,
            last_updated: model.last_updated,
            dirty: false,
        }
    }
}

/// 一次落库的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// 成功写入的计数
    pub written: usize,
    /// 写入失败、留待下次重试的计数
    pub failed: usize,
    /// 仍在等待落库的跨日旧计数
    pub retired_pending: usize,
}

impl SyncReport {
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.failed == 0 && self.retired_pending == 0
    }
}
