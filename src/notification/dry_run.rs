//! Dry-run 渠道 - 只打印不发送

use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::channel::DeliverySink;
use crate::event::QueueEntry;

/// 将消息打印到 stdout，用于调试配置和过滤规则
#[derive(Debug, Default)]
pub struct DryRunSink {
    printed: AtomicUsize,
}

impl DryRunSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已打印的消息数量
    pub fn printed(&self) -> usize {
        self.printed.load(Ordering::SeqCst)
    }

    fn render(entry: &QueueEntry) -> String {
        format!(
            "[DRY-RUN] route={} category={} source={}\n{}",
            entry.route(),
            entry.category,
            entry.source_name,
            entry.text
        )
    }
}

impl DeliverySink for DryRunSink {
    fn name(&self) -> &str {
        "dry_run"
    }

    fn send_async(&self, entry: &QueueEntry) -> Result<()> {
        println!("{}", Self::render(entry));
        self.printed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
