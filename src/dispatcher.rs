//! 分发器 - 定时从队列取消息并交给投递渠道
//!
//! 每个周期：
//! 1. 队列非空时，取出一条（可能已合并）消息投递
//! 2. 执行溢出检查，如产生抑制提示也一并投递
//! 3. 等待固定间隔后进入下一周期
//!
//! 间隔从上一周期结束开始计算；同一时刻只有一个周期在执行。

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::event::QueueEntry;
use crate::notification::DeliverySink;
use crate::queue::{lock_state, Coalescer, OverflowController, SharedState};

/// 默认分发间隔
pub const DISPATCH_INTERVAL: Duration = Duration::from_secs(10);

/// 分发器
pub struct Dispatcher {
    state: SharedState,
    coalescer: Coalescer,
    overflow: OverflowController,
    sink: Arc<dyn DeliverySink>,
    interval: Duration,
}

impl Dispatcher {
    pub fn new(
        state: SharedState,
        coalescer: Coalescer,
        overflow: OverflowController,
        sink: Arc<dyn DeliverySink>,
    ) -> Self {
        Self {
            state,
            coalescer,
            overflow,
            sink,
            interval: DISPATCH_INTERVAL,
        }
    }

    pub fn from_config(config: &RelayConfig, state: SharedState, sink: Arc<dyn DeliverySink>) -> Self {
        Self::new(
            state,
            Coalescer::from_config(config),
            OverflowController::from_config(config),
            sink,
        )
    }

    /// 设置分发间隔（测试用）
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn sink(&self) -> &Arc<dyn DeliverySink> {
        &self.sink
    }

    /// 执行一个分发周期，返回投递的消息数量
    pub fn tick(&self) -> usize {
        self.tick_at(Instant::now())
    }

    /// 执行一个分发周期（带时间参数，用于测试）
    pub fn tick_at(&self, now: Instant) -> usize {
        let outgoing = self.collect(now);
        for entry in &outgoing {
            self.forward(entry);
        }
        outgoing.len()
    }

    /// 在锁内取出本周期要投递的消息；投递在锁外进行
    fn collect(&self, now: Instant) -> Vec<QueueEntry> {
        let mut guard = lock_state(&self.state);
        let state = &mut *guard;
        let mut outgoing = Vec::with_capacity(2);

        if let Some(entry) = self.coalescer.take_next(&mut state.queue) {
            outgoing.push(entry);
        }

        if let Some(notice) = self
            .overflow
            .enforce_at(&mut state.queue, &mut state.suppression, now)
        {
            outgoing.push(notice);
        }

        if !outgoing.is_empty() {
            debug!(
                outgoing = outgoing.len(),
                remaining = state.queue.len(),
                "Dispatch cycle"
            );
        }

        outgoing
    }

    fn forward(&self, entry: &QueueEntry) {
        if let Err(e) = self.sink.send_async(entry) {
            warn!(
                sink = self.sink.name(),
                category = %entry.category,
                error = %e,
                "Failed to hand message to sink"
            );
        }
    }

    /// 队列是否为空
    pub fn is_idle(&self) -> bool {
        lock_state(&self.state).queue.is_empty()
    }

    /// 循环执行分发周期，直到 shutdown 变为 true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            queue_max = self.overflow.queue_max(),
            sink = self.sink.name(),
            "Dispatcher started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.tick();

            tokio::select! {
                _ = sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        // sender 已释放，视为停止
                        break;
                    }
                }
            }
        }

        info!("Dispatcher stopped");
    }
}
