//! 投递渠道 trait 定义

use anyhow::Result;

use crate::event::QueueEntry;

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（未配置目标等）
    Skipped(String),
    /// 发送失败
    Failed(String),
}

/// 投递渠道 trait
///
/// `send_async` 必须立即返回：实际发送在后台完成，结果只写日志，不会回流到队列。
pub trait DeliverySink: Send + Sync {
    /// 渠道名称（用于日志）
    fn name(&self) -> &str;

    /// 异步发送消息（spawn 后立即返回）
    fn send_async(&self, entry: &QueueEntry) -> Result<()>;

    /// 尚未完成的发送数量
    fn in_flight(&self) -> usize {
        0
    }
}

/// 按字符数切分内容，每段不超过 `max_chars`
///
/// 优先在段内最后一个换行处切分（换行本身丢弃），没有换行时按字符边界硬切。
pub fn split_content(s: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= max_chars {
        return vec![s.to_string()];
    }

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        if end == chars.len() {
            chunks.push(chars[start..].iter().collect());
            break;
        }
        match chars[start..end].iter().rposition(|&c| c == '\n') {
            Some(pos) if pos > 0 => {
                chunks.push(chars[start..start + pos].iter().collect());
                start += pos + 1;
            }
            _ => {
                chunks.push(chars[start..end].iter().collect());
                start = end;
            }
        }
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_content_short_is_untouched() {
        assert_eq!(split_content("short", 10), vec!["short"]);
        assert_eq!(split_content("", 10), vec![""]);
    }

    #[test]
    fn test_split_content_hard_split() {
        assert_eq!(split_content("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn test_split_content_prefers_newlines() {
        assert_eq!(split_content("a\nb\nc", 3), vec!["a", "b\nc"]);
        assert_eq!(
            split_content("line one\nline two\nline three", 18),
            vec!["line one\nline two", "line three"]
        );
    }

    #[test]
    fn test_split_content_multibyte() {
        let text = "进程重启进程重启";
        assert_eq!(split_content(text, 5), vec!["进程重启进", "程重启"]);
    }

    #[test]
    fn test_split_content_keeps_every_character() {
        let text = "x".repeat(4500);
        let chunks = split_content(&text, 2000);
        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|c| c.chars().count() <= 2000));
        assert_eq!(chunks.concat(), text);
    }
}
