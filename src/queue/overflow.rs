//! 溢出控制 - 队列超过上限时截断并发送一次抑制提示
//!
//! 抑制期间不再重复提示；提示发出满 60 秒后重置，下一次溢出会再次提示。

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::MessageQueue;
use crate::config::RelayConfig;
use crate::event::{Category, QueueEntry};

/// 抑制提示冷却时间
pub const SUPPRESSION_COOLDOWN: Duration = Duration::from_secs(60);

/// 抑制提示文本
pub const SUPPRESSION_NOTICE: &str = "Messages are being suppressed due to rate limiting.";

/// 抑制状态（进程级单例，随 RelayState 存在）
#[derive(Debug, Clone, Copy)]
pub struct SuppressionState {
    pub active: bool,
    pub since: Instant,
}

impl Default for SuppressionState {
    fn default() -> Self {
        Self {
            active: false,
            since: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OverflowController {
    queue_max: usize,
    cooldown: Duration,
    /// 抑制提示的来源名
    notice_source: String,
    /// 单调时钟与 Unix 秒的对应点，用于从 `now` 推算提示的到达时间
    clock_anchor: (Instant, i64),
}

impl OverflowController {
    pub fn new(queue_max: usize, notice_source: impl Into<String>) -> Self {
        Self {
            queue_max,
            cooldown: SUPPRESSION_COOLDOWN,
            notice_source: notice_source.into(),
            clock_anchor: (Instant::now(), Utc::now().timestamp()),
        }
    }

    /// 指定时钟对应点（测试用）
    pub fn with_clock_anchor(mut self, at: Instant, unix_secs: i64) -> Self {
        self.clock_anchor = (at, unix_secs);
        self
    }

    /// 将单调时间换算为 Unix 秒
    fn unix_secs_at(&self, now: Instant) -> i64 {
        let (at, unix_secs) = self.clock_anchor;
        if now >= at {
            unix_secs + now.duration_since(at).as_secs() as i64
        } else {
            unix_secs - at.duration_since(now).as_secs() as i64
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.queue_max, config.self_name.clone())
    }

    pub fn queue_max(&self) -> usize {
        self.queue_max
    }

    pub fn enforce(
        &self,
        queue: &mut MessageQueue,
        state: &mut SuppressionState,
    ) -> Option<QueueEntry> {
        self.enforce_at(queue, state, Instant::now())
    }

    /// 执行一次溢出检查（带时间参数，用于测试）
    ///
    /// 返回需要投递的抑制提示（每个抑制周期最多一次）。
    pub fn enforce_at(
        &self,
        queue: &mut MessageQueue,
        state: &mut SuppressionState,
        now: Instant,
    ) -> Option<QueueEntry> {
        let mut notice = None;

        if queue.len() > self.queue_max {
            let dropped = queue.truncate(self.queue_max);
            warn!(
                dropped,
                queue_max = self.queue_max,
                "Message queue over limit, dropping newest messages"
            );

            if !state.active {
                state.active = true;
                state.since = now;
                notice = Some(QueueEntry::new(
                    self.notice_source.clone(),
                    Category::Suppressed,
                    SUPPRESSION_NOTICE,
                    self.unix_secs_at(now),
                ));
            }
        }

        if state.active && now.saturating_duration_since(state.since) >= self.cooldown {
            debug!("Suppression cooldown elapsed, resetting");
            state.active = false;
        }

        notice
    }
}
