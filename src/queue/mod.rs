//! 消息队列与共享状态
//!
//! 入站事件追加到队尾，dispatcher 每个周期从队头取出一条（可能合并多条）投递。
//! 队列和抑制状态由同一把锁保护，保证同一时刻只有一个修改者。

pub mod coalescer;
pub mod overflow;

pub use coalescer::Coalescer;
pub use overflow::{OverflowController, SuppressionState, SUPPRESSION_COOLDOWN, SUPPRESSION_NOTICE};

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::event::QueueEntry;

/// FIFO 消息队列，插入顺序即到达顺序
#[derive(Debug, Clone, Default)]
pub struct MessageQueue {
    entries: VecDeque<QueueEntry>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QueueEntry) {
        self.entries.push_back(entry);
    }

    pub fn pop_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    pub fn front(&self) -> Option<&QueueEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 保留最早的 `max` 条，丢弃更新的部分，返回丢弃数量
    pub fn truncate(&mut self, max: usize) -> usize {
        let dropped = self.entries.len().saturating_sub(max);
        self.entries.truncate(max);
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }
}

/// 队列 + 抑制状态
#[derive(Debug, Default)]
pub struct RelayState {
    pub queue: MessageQueue,
    pub suppression: SuppressionState,
}

impl RelayState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 在 ingestor 和 dispatcher 之间共享的状态
pub type SharedState = Arc<Mutex<RelayState>>;

pub fn new_shared_state() -> SharedState {
    Arc::new(Mutex::new(RelayState::new()))
}

/// 获取锁；状态是纯数据，锁中毒时直接恢复
pub fn lock_state(state: &SharedState) -> MutexGuard<'_, RelayState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Category;

    fn entry(text: &str) -> QueueEntry {
        QueueEntry::new("api", Category::Log, text, 0)
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = MessageQueue::new();
        queue.push(entry("a"));
        queue.push(entry("b"));
        assert_eq!(queue.front().map(|e| e.text.as_str()), Some("a"));
        assert_eq!(queue.pop_front().unwrap().text, "a");
        assert_eq!(queue.pop_front().unwrap().text, "b");
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn test_truncate_keeps_oldest() {
        let mut queue = MessageQueue::new();
        for i in 0..5 {
            queue.push(entry(&i.to_string()));
        }
        assert_eq!(queue.truncate(3), 2);
        let texts: Vec<&str> = queue.iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, vec!["0", "1", "2"]);
        assert_eq!(queue.truncate(10), 0);
    }

    #[test]
    fn test_lock_state_recovers_from_poison() {
        let state = new_shared_state();
        let cloned = state.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        lock_state(&state).queue.push(entry("after poison"));
        assert_eq!(lock_state(&state).queue.len(), 1);
    }
}
