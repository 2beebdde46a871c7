//! 消息合并 - 将时间窗口内相邻的同类消息合并为一次投递
//!
//! 窗口为半开区间 `[head.t, head.t + buffer_seconds)`，只合并紧邻队头的连续消息，
//! 遇到不同分类或超出窗口的消息立即停止。

use tracing::debug;

use super::MessageQueue;
use crate::config::RelayConfig;
use crate::event::QueueEntry;

#[derive(Debug, Clone)]
pub struct Coalescer {
    enabled: bool,
    window_secs: i64,
}

impl Coalescer {
    pub fn new(enabled: bool, window_secs: u64) -> Self {
        Self {
            enabled,
            window_secs: window_secs as i64,
        }
    }

    pub fn from_config(config: &RelayConfig) -> Self {
        Self::new(config.buffer, config.buffer_seconds)
    }

    /// 取出队头消息，并吸收其后可合并的消息
    pub fn take_next(&self, queue: &mut MessageQueue) -> Option<QueueEntry> {
        let mut head = queue.pop_front()?;
        if !self.enabled {
            return Some(head);
        }

        let window_start = head.arrival_time_seconds;
        let window_end = window_start + self.window_secs;
        let mut fragments = vec![std::mem::take(&mut head.text)];

        while let Some(next) = queue.front() {
            let in_window =
                next.arrival_time_seconds >= window_start && next.arrival_time_seconds < window_end;
            if !in_window || next.category != head.category {
                break;
            }
            if let Some(next) = queue.pop_front() {
                fragments.push(next.text);
            }
        }

        if fragments.len() > 1 {
            debug!(
                category = %head.category,
                merged = fragments.len(),
                "Coalesced queued messages"
            );
        }

        head.text = fragments.join("\n");
        Some(head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Category;

    fn entry(category: Category, text: &str, t: i64) -> QueueEntry {
        QueueEntry::new("api", category, text, t)
    }

    fn queue_of(entries: Vec<QueueEntry>) -> MessageQueue {
        let mut queue = MessageQueue::new();
        for e in entries {
            queue.push(e);
        }
        queue
    }

    #[test]
    fn test_merges_same_category_within_window() {
        let mut queue = queue_of(vec![
            entry(Category::Log, "A", 0),
            entry(Category::Log, "B", 1),
            entry(Category::Error, "C", 1),
        ]);
        let merged = Coalescer::new(true, 2).take_next(&mut queue).unwrap();

        assert_eq!(merged.text, "A\nB");
        assert_eq!(merged.category, Category::Log);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.front().unwrap().text, "C");
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let mut queue = queue_of(vec![
            entry(Category::Log, "A", 10),
            entry(Category::Log, "B", 11),
            entry(Category::Log, "C", 12),
        ]);
        let merged = Coalescer::new(true, 2).take_next(&mut queue).unwrap();

        assert_eq!(merged.text, "A\nB");
        assert_eq!(queue.front().unwrap().text, "C");
    }

    #[test]
    fn test_earlier_timestamp_not_merged() {
        let mut queue = queue_of(vec![
            entry(Category::Log, "A", 10),
            entry(Category::Log, "B", 9),
        ]);
        let merged = Coalescer::new(true, 4).take_next(&mut queue).unwrap();
        assert_eq!(merged.text, "A");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_stops_at_first_different_category() {
        let mut queue = queue_of(vec![
            entry(Category::Log, "A", 0),
            entry(Category::Error, "B", 0),
            entry(Category::Log, "C", 0),
        ]);
        let merged = Coalescer::new(true, 4).take_next(&mut queue).unwrap();
        assert_eq!(merged.text, "A");
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_lifecycle_events_merge_only_with_same_name() {
        let mut queue = queue_of(vec![
            entry(Category::Lifecycle("restart".into()), "r1", 0),
            entry(Category::Lifecycle("restart".into()), "r2", 0),
            entry(Category::Lifecycle("exit".into()), "e1", 0),
        ]);
        let merged = Coalescer::new(true, 1).take_next(&mut queue).unwrap();
        assert_eq!(merged.text, "r1\nr2");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_disabled_returns_head_unchanged() {
        let mut queue = queue_of(vec![
            entry(Category::Log, "A", 0),
            entry(Category::Log, "B", 0),
        ]);
        let next = Coalescer::new(false, 4).take_next(&mut queue).unwrap();
        assert_eq!(next.text, "A");
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_empty_queue() {
        let mut queue = MessageQueue::new();
        assert!(Coalescer::new(true, 1).take_next(&mut queue).is_none());
    }
}
