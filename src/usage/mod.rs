//! # 用量统计模块
//!
//! 按 (API 路径, 自然日) 在内存中累加调用计数，并周期性落库

mod aggregator;
mod clock;
mod sync_task;
mod types;

pub use aggregator::UsageAggregator;
pub use clock::{DATE_FORMAT, ManualClock, SystemClock, UsageClock};
pub use sync_task::UsageSyncTask;
pub use types::{SyncReport, UsageCounter};
