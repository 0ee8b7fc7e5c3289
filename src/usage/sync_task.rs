//! # 统计定时落库任务

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::{SyncReport, UsageAggregator};
use crate::config::UsageConfig;
use crate::logging::{LogComponent, LogStage};
use crate::{lerror, linfo, lwarn};

/// 周期性调用 [`UsageAggregator::sync`] 的后台任务
#[derive(Clone)]
pub struct UsageSyncTask {
    aggregator: Arc<UsageAggregator>,
    interval: Duration,
    flush_on_shutdown: bool,
    shutdown_sender: Arc<RwLock<Option<watch::Sender<bool>>>>,
    task_handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl UsageSyncTask {
    pub fn new(aggregator: Arc<UsageAggregator>, interval: Duration, flush_on_shutdown: bool) -> Self {
        Self {
            aggregator,
            interval,
            flush_on_shutdown,
            shutdown_sender: Arc::new(RwLock::new(None)),
            task_handle: Arc::new(RwLock::new(None)),
        }
    }

    /// 按配置创建，间隔为 0 时使用默认值
    pub fn from_config(aggregator: Arc<UsageAggregator>, config: &UsageConfig) -> Self {
        Self::new(aggregator, config.sync_interval(), config.flush_on_shutdown)
    }

    pub const fn interval(&self) -> Duration {
        self.interval
    }

    pub async fn is_running(&self) -> bool {
        self.task_handle.read().await.is_some()
    }

    /// 启动后台任务，重复调用不会启动第二个循环
    pub async fn start(&self) {
        let mut handle_guard = self.task_handle.write().await;
        if handle_guard.is_some() {
            lwarn!(
                "system",
                LogStage::BackgroundTask,
                LogComponent::UsageSync,
                "usage_sync_already_running",
                "Usage sync task already running"
            );
            return;
        }

        let (shutdown_sender, shutdown_receiver) = watch::channel(false);
        *handle_guard = Some(tokio::spawn(run(
            Arc::clone(&self.aggregator),
            self.interval,
            shutdown_receiver,
        )));
        *self.shutdown_sender.write().await = Some(shutdown_sender);
    }

    /// 停止后台任务；开启 `flush_on_shutdown` 时执行最后一次落库
    pub async fn stop(&self) -> Option<SyncReport> {
        if let Some(sender) = self.shutdown_sender.write().await.take() {
            let _ = sender.send(true);
        }

        let handle = self.task_handle.write().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                lerror!(
                    "system",
                    LogStage::Shutdown,
                    LogComponent::UsageSync,
                    "usage_sync_join_failed",
                    "Usage sync task ended abnormally",
                    error = %e
                );
            }
        }

        let report = if self.flush_on_shutdown {
            Some(self.aggregator.sync().await)
        } else {
            None
        };

        linfo!(
            "system",
            LogStage::Shutdown,
            LogComponent::UsageSync,
            "usage_sync_stopped",
            "Usage sync task stopped",
            final_flush = report.is_some(),
            written = report.map_or(0, |r| r.written),
            failed = report.map_or(0, |r| r.failed)
        );
        report
    }
}

async fn run(aggregator: Arc<UsageAggregator>, period: Duration, mut shutdown: watch::Receiver<bool>) {
    // 首次落库在一个周期之后
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::UsageSync,
        "usage_sync_started",
        "Usage sync task started",
        interval_secs = period.as_secs()
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let report = aggregator.sync().await;
                if !report.is_clean() {
                    lwarn!(
                        "system",
                        LogStage::BackgroundTask,
                        LogComponent::UsageSync,
                        "usage_sync_partial",
                        "Usage sync left counters pending",
                        failed = report.failed,
                        retired_pending = report.retired_pending
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockUsageStore;
    use crate::usage::ManualClock;
    use chrono::NaiveDate;

    fn aggregator(store: MockUsageStore) -> Arc<UsageAggregator> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_opt(8, 0, 0))
            .unwrap();
        Arc::new(UsageAggregator::new(Arc::new(store), Arc::new(ManualClock::new(start))))
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_sync_writes_dirty_counters() {
        let mut store = MockUsageStore::new();
        store.expect_find_counter().returning(|_, _| Ok(None));
        store.expect_save_counter().times(1).returning(|_| Ok(1));

        let aggregator = aggregator(store);
        aggregator.add_usage(7, 1, 1, 1).await.unwrap();

        let task = UsageSyncTask::new(Arc::clone(&aggregator), Duration::from_secs(60), false);
        task.start().await;
        assert!(task.is_running().await);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(!aggregator.live_counters().await[0].dirty);

        assert!(task.stop().await.is_none());
        assert!(!task.is_running().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_performs_final_flush() {
        let mut store = MockUsageStore::new();
        store.expect_find_counter().returning(|_, _| Ok(None));
        store.expect_save_counter().times(1).returning(|_| Ok(1));

        let aggregator = aggregator(store);
        let task = UsageSyncTask::new(Arc::clone(&aggregator), Duration::from_secs(3600), true);
        task.start().await;
        task.start().await;

        aggregator.add_usage(7, 1, 1, 1).await.unwrap();
        let report = task.stop().await.unwrap();
        assert_eq!(report.written, 1);
    }

    #[test]
    fn test_zero_interval_config_uses_default() {
        let store = MockUsageStore::new();
        let config = UsageConfig {
            sync_interval_secs: 0,
            flush_on_shutdown: true,
        };
        let start = NaiveDate::from_ymd_opt(2025, 3, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        let aggregator = Arc::new(UsageAggregator::new(Arc::new(store), Arc::new(ManualClock::new(start))));
        let task = UsageSyncTask::from_config(aggregator, &config);
        assert_eq!(task.interval(), Duration::from_secs(60));
    }
}
