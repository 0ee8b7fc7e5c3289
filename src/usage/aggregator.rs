//! # 用量聚合器
//!
//! 请求路径上只做内存累加；每个 API 路径同一时刻只有一个"当日"计数。
//! 整张计数表由一把互斥锁保护，`add_usage` 与 `sync` 互斥执行。
//!
//! 跨日时先落库再丢弃：旧计数若有未落库增量，在切换时立即写入；
//! 写入失败则移入待重试列表，由下一次 `sync` 继续写入。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tokio::sync::Mutex;

use super::{SyncReport, UsageClock, UsageCounter};
use crate::ensure_valid;
use crate::error::{Context, GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::store::UsageStore;
use crate::{ldebug, linfo, lwarn};

#[derive(Debug, Default)]
struct CounterTable {
    /// 每个 API 路径的当日计数
    live: HashMap<i32, UsageCounter>,
    /// 跨日时落库失败的旧计数
    retired: Vec<UsageCounter>,
}

/// 用量聚合器
pub struct UsageAggregator {
    store: Arc<dyn UsageStore>,
    clock: Arc<dyn UsageClock>,
    table: Mutex<CounterTable>,
}

impl UsageAggregator {
    pub fn new(store: Arc<dyn UsageStore>, clock: Arc<dyn UsageClock>) -> Self {
        Self {
            store,
            clock,
            table: Mutex::new(CounterTable::default()),
        }
    }

    /// 当前统计日期
    pub fn today(&self) -> String {
        self.clock.today()
    }

    /// 启动时加载数据库中已有的当日计数，避免重启后当日总量归零
    pub async fn load(&self) -> Result<usize> {
        let today = self.clock.today();
        let rows = self
            .store
            .find_counters_for_date(&today)
            .await
            .with_context(|| format!("加载当日统计失败: {today}"))?;

        let mut table = self.table.lock().await;
        let mut loaded = 0;
        for counter in rows {
            // 已在内存中的计数更新，不覆盖
            if !table.live.contains_key(&counter.endpoint_id) {
                table.live.insert(counter.endpoint_id, counter);
                loaded += 1;
            }
        }
        drop(table);

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::UsageAggregator,
            "load",
            "当日统计加载完成",
            date = %today,
            counters = loaded
        );
        Ok(loaded)
    }

    /// 记录一次完成的上游调用
    ///
    /// 内存中没有该路径的当日计数时，先查库取回或新建归零计数；
    /// 查库失败时计数表保持不变并返回错误。负的 token 数直接拒绝
    pub async fn add_usage(
        &self,
        endpoint_id: i32,
        input_tokens: i64,
        output_tokens: i64,
        cache_hit_tokens: i64,
    ) -> Result<()> {
        ensure_valid!(input_tokens >= 0, "input_tokens", "输入 token 数不能为负");
        ensure_valid!(output_tokens >= 0, "output_tokens", "输出 token 数不能为负");
        ensure_valid!(cache_hit_tokens >= 0, "cache_hit_tokens", "缓存命中 token 数不能为负");

        let today = self.clock.today();
        let now = self.clock.now();

        let mut table = self.table.lock().await;

        let needs_load = table
            .live
            .get(&endpoint_id)
            .is_none_or(|counter| !counter.is_for(&today));

        if needs_load {
            let fresh = self.load_or_create(endpoint_id, &today, now).await?;
            if let Some(prior) = table.live.insert(endpoint_id, fresh) {
                self.retire(&mut table, prior).await;
            }
        }

        let counter = table
            .live
            .get_mut(&endpoint_id)
            .ok_or_else(|| GatewayError::usage(format!("计数缺失: endpoint_id={endpoint_id}")))?;
        counter.record(input_tokens, output_tokens, cache_hit_tokens, now);
        Ok(())
    }

    /// 把有未落库增量的计数写入数据库
    ///
    /// 单个计数写入失败不影响其他计数，保留在内存中等待下次重试
    pub async fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();
        let mut table = self.table.lock().await;

        let retired = std::mem::take(&mut table.retired);
        for counter in retired {
            match self.store.save_counter(&counter).await {
                Ok(_) => report.written += 1,
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::Usage,
                        LogComponent::UsageAggregator,
                        "sync_retired_failed",
                        "跨日旧计数落库失败，下次重试",
                        endpoint_id = counter.endpoint_id,
                        date = %counter.date,
                        error = %e
                    );
                    report.failed += 1;
                    table.retired.push(counter);
                }
            }
        }

        for counter in table.live.values_mut().filter(|counter| counter.dirty) {
            match self.store.save_counter(counter).await {
                Ok(id) => {
                    counter.id = Some(id);
                    counter.dirty = false;
                    report.written += 1;
                }
                Err(e) => {
                    lwarn!(
                        "system",
                        LogStage::Usage,
                        LogComponent::UsageAggregator,
                        "sync_failed",
                        "统计落库失败，下次重试",
                        endpoint_id = counter.endpoint_id,
                        date = %counter.date,
                        error = %e
                    );
                    report.failed += 1;
                }
            }
        }

        report.retired_pending = table.retired.len();
        drop(table);

        ldebug!(
            "system",
            LogStage::Usage,
            LogComponent::UsageAggregator,
            "sync",
            "统计落库完成",
            written = report.written,
            failed = report.failed,
            retired_pending = report.retired_pending
        );
        report
    }

    /// 内存计数表的独立拷贝，按 API 路径 ID 排序
    pub async fn live_counters(&self) -> Vec<UsageCounter> {
        let table = self.table.lock().await;
        let mut counters: Vec<UsageCounter> = table.live.values().cloned().collect();
        drop(table);
        counters.sort_by_key(|counter| counter.endpoint_id);
        counters
    }

    /// 等待重试的跨日旧计数数量
    pub async fn retired_pending(&self) -> usize {
        self.table.lock().await.retired.len()
    }

    async fn load_or_create(&self, endpoint_id: i32, today: &str, now: NaiveDateTime) -> Result<UsageCounter> {
        let existing = self
            .store
            .find_counter(endpoint_id, today)
            .await
            .with_context(|| format!("读取统计计数失败: endpoint_id={endpoint_id}, date={today}"))?;

        Ok(existing.unwrap_or_else(|| UsageCounter::zeroed(endpoint_id, today, now)))
    }

    /// 跨日切换：旧计数有增量时立即落库，失败则移入待重试列表
    async fn retire(&self, table: &mut CounterTable, prior: UsageCounter) {
        if !prior.dirty {
            return;
        }

        match self.store.save_counter(&prior).await {
            Ok(_) => {
                ldebug!(
                    "system",
                    LogStage::Usage,
                    LogComponent::UsageAggregator,
                    "rollover_flush",
                    "跨日旧计数已落库",
                    endpoint_id = prior.endpoint_id,
                    date = %prior.date
                );
            }
            Err(e) => {
                lwarn!(
                    "system",
                    LogStage::Usage,
                    LogComponent::UsageAggregator,
                    "rollover_flush_failed",
                    "跨日旧计数落库失败，留待下次同步",
                    endpoint_id = prior.endpoint_id,
                    date = %prior.date,
                    error = %e
                );
                table.retired.push(prior);
            }
        }
    }
}
