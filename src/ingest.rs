//! 事件接入 - 过滤总线事件并转换为队列消息
//!
//! 过滤规则：
//! 1. 排除 relay 自身的事件（避免回环）
//! 2. 配置了 `process_name` 时只保留该进程
//! 3. 分类未开启时丢弃
//!
//! `ingest` 只做内存操作，不阻塞、不等待。

use chrono::Utc;
use std::sync::Arc;
use tracing::debug;

use crate::config::RelayConfig;
use crate::event::{payload_text, BusEvent, Category, ProcessInfo, QueueEntry};
use crate::queue::{lock_state, SharedState};
use crate::sanitize::strip_ansi;

/// kill 事件的固定来源名
pub const PROCESS_MANAGER_SOURCE: &str = "process-manager";

/// 生命周期事件的描述文本
pub fn lifecycle_message(process_name: &str, event: &str) -> String {
    format!(
        "The following event has occurred on the process {}: {}",
        process_name, event
    )
}

/// 事件接入器
#[derive(Clone)]
pub struct EventIngestor {
    config: Arc<RelayConfig>,
    state: SharedState,
}

impl EventIngestor {
    pub fn new(config: Arc<RelayConfig>, state: SharedState) -> Self {
        Self { config, state }
    }

    /// 接入一个总线事件
    pub fn ingest(&self, event: BusEvent) {
        self.ingest_at(event, Utc::now().timestamp());
    }

    /// 接入一个总线事件（带时间戳，用于测试）
    pub fn ingest_at(&self, event: BusEvent, now_secs: i64) {
        let pm_id = event.pm_id();
        let entry = match event {
            BusEvent::LogOut(packet) => {
                self.create_entry(&packet.process, Category::Log, payload_text(&packet.data), now_secs)
            }
            BusEvent::LogErr(packet) => {
                self.create_entry(&packet.process, Category::Error, payload_text(&packet.data), now_secs)
            }
            BusEvent::Exception(packet) => self.create_entry(
                &packet.process,
                Category::Exception,
                payload_text(&packet.data),
                now_secs,
            ),
            BusEvent::Kill(packet) => {
                if !self.config.kill {
                    return;
                }
                Some(QueueEntry::new(
                    PROCESS_MANAGER_SOURCE,
                    Category::Kill,
                    strip_ansi(&packet.msg),
                    now_secs,
                ))
            }
            BusEvent::Lifecycle(packet) => {
                let text = lifecycle_message(&packet.process.name, &packet.event);
                self.create_entry(&packet.process, Category::Lifecycle(packet.event), text, now_secs)
            }
        };

        if let Some(entry) = entry {
            debug!(
                source = %entry.source_name,
                pm_id = ?pm_id,
                category = %entry.category,
                "Queued message"
            );
            lock_state(&self.state).queue.push(entry);
        }
    }

    /// 按过滤规则构造消息，被过滤时返回 None
    fn create_entry(
        &self,
        process: &ProcessInfo,
        category: Category,
        text: String,
        now_secs: i64,
    ) -> Option<QueueEntry> {
        if process.name == self.config.self_name {
            return None;
        }

        if let Some(filter) = &self.config.process_name {
            if &process.name != filter {
                return None;
            }
        }

        if !self.config.is_enabled(&category) {
            return None;
        }

        Some(QueueEntry::new(
            process.name.clone(),
            category,
            strip_ansi(&text),
            now_secs,
        ))
    }
}
