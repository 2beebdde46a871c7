//! 总线输入 - 逐行读取 JSON 事件并交给 ingestor
//!
//! 每行一个 `BusEvent`，空行跳过，无法解析的行记录 warn 后跳过。
//! 非 UTF-8 字节按 lossy 方式替换，只有真正的 I/O 错误才会中止读取。

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

use crate::event::BusEvent;
use crate::ingest::EventIngestor;

/// 解析一行总线事件
pub fn parse_line(line: &str) -> Option<Result<BusEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(
        serde_json::from_str::<BusEvent>(trimmed)
            .with_context(|| format!("Invalid bus event: {}", trimmed)),
    )
}

/// 读取直到 EOF，返回成功解析的事件数量
pub async fn pump<R>(reader: R, ingestor: &EventIngestor) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut reader = reader;
    let mut buf = Vec::new();
    let mut accepted = 0;

    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("Failed to read bus input")?;
        if n == 0 {
            break;
        }

        let line = String::from_utf8_lossy(&buf);
        match parse_line(&line) {
            Some(Ok(event)) => {
                ingestor.ingest(event);
                accepted += 1;
            }
            Some(Err(e)) => warn!(error = %e, "Skipping malformed bus event"),
            None => {}
        }
    }

    debug!(accepted, "Bus input closed");
    Ok(accepted)
}
