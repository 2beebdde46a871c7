//! run 命令 - 启动 relay
//!
//! 从 stdin（或 `--input` 指定的文件 / FIFO）读取总线事件，定时投递到 webhook。
//! 输入结束后继续分发直到队列清空；Ctrl+C 立即停止。

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

use crate::bus;
use crate::config::RelayConfig;
use crate::dispatcher::Dispatcher;
use crate::ingest::EventIngestor;
use crate::notification::{DeliverySink, DryRunSink, WebhookConfig, WebhookSink};
use crate::queue::new_shared_state;

/// 退出前等待在途发送的最长时间
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// 输入结束后检查队列是否清空的间隔
const DRAIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// run 命令参数
#[derive(Args)]
pub struct RunArgs {
    /// 配置文件路径（默认 ~/.config/process-event-relay/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 事件输入文件或 FIFO（默认 stdin）
    #[arg(long, short)]
    pub input: Option<PathBuf>,

    /// Dry-run 模式（只打印不发送）
    #[arg(long)]
    pub dry_run: bool,
}

/// 处理 run 命令
pub async fn handle_run(args: RunArgs) -> Result<()> {
    let config = Arc::new(RelayConfig::load(args.config.as_deref())?);

    let sink: Arc<dyn DeliverySink> = if args.dry_run {
        Arc::new(DryRunSink::new())
    } else {
        if !config.has_webhooks() {
            warn!("Webhook URLs are not configured, messages will be dropped");
        }
        Arc::new(WebhookSink::new(WebhookConfig::from(config.as_ref()))?)
    };

    let state = new_shared_state();
    let ingestor = EventIngestor::new(config.clone(), state.clone());
    let dispatcher = Arc::new(Dispatcher::from_config(&config, state, sink));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let runner = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
    };

    info!(
        input = %args.input.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "stdin".to_string()),
        dry_run = args.dry_run,
        "Relay started"
    );

    let pump_input = async {
        match &args.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open input {}", path.display()))?;
                bus::pump(BufReader::new(file), &ingestor).await
            }
            None => bus::pump(BufReader::new(tokio::io::stdin()), &ingestor).await,
        }
    };

    tokio::select! {
        result = pump_input => {
            let accepted = result?;
            info!(accepted, "Bus input ended, draining queue");
            wait_until_drained(&dispatcher, DRAIN_POLL_INTERVAL).await;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, stopping");
        }
    }

    let _ = shutdown_tx.send(true);
    runner.await.context("Dispatcher task failed")?;

    wait_for_in_flight(dispatcher.sink().as_ref(), SHUTDOWN_GRACE).await;
    Ok(())
}

/// 等待队列清空（Ctrl+C 提前结束），每 `poll` 检查一次
async fn wait_until_drained(dispatcher: &Dispatcher, poll: Duration) {
    loop {
        if dispatcher.is_idle() {
            return;
        }
        tokio::select! {
            _ = sleep(poll) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, dropping remaining messages");
                return;
            }
        }
    }
}

/// 等待在途发送完成，最多等待 `grace`
async fn wait_for_in_flight(sink: &dyn DeliverySink, grace: Duration) {
    let deadline = Instant::now() + grace;
    while sink.in_flight() > 0 {
        if Instant::now() >= deadline {
            warn!(
                sink = sink.name(),
                in_flight = sink.in_flight(),
                "Giving up on in-flight deliveries"
            );
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Category, QueueEntry};
    use crate::queue::{lock_state, Coalescer, OverflowController};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<String>>,
    }

    impl DeliverySink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        fn send_async(&self, entry: &QueueEntry) -> Result<()> {
            self.sent.lock().unwrap().push(entry.text.clone());
            Ok(())
        }
    }

    struct StuckSink {
        pending: AtomicUsize,
    }

    impl DeliverySink for StuckSink {
        fn name(&self) -> &str {
            "stuck"
        }

        fn send_async(&self, _entry: &QueueEntry) -> Result<()> {
            Ok(())
        }

        fn in_flight(&self) -> usize {
            self.pending.load(Ordering::SeqCst)
        }
    }

    #[tokio::test]
    async fn test_wait_for_in_flight_gives_up_after_grace() {
        let sink = StuckSink {
            pending: AtomicUsize::new(1),
        };
        let started = Instant::now();
        wait_for_in_flight(&sink, Duration::from_millis(100)).await;
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_wait_for_in_flight_returns_immediately_when_idle() {
        let sink = DryRunSink::new();
        let started = Instant::now();
        wait_for_in_flight(&sink, Duration::from_secs(5)).await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_input_end_drains_whole_queue_in_order() {
        let state = new_shared_state();
        {
            let mut guard = lock_state(&state);
            // 时间戳相隔较远，每条单独投递
            for (i, text) in ["first", "second", "third", "fourth"].iter().enumerate() {
                guard
                    .queue
                    .push(QueueEntry::new("api", Category::Log, *text, i as i64 * 10));
            }
        }

        let sink = Arc::new(RecordingSink::default());
        let dispatcher = Arc::new(
            Dispatcher::new(
                state.clone(),
                Coalescer::new(true, 1),
                OverflowController::new(100, "relay"),
                sink.clone(),
            )
            .with_interval(Duration::from_millis(20)),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move { dispatcher.run(shutdown_rx).await })
        };

        tokio::time::timeout(
            Duration::from_secs(5),
            wait_until_drained(&dispatcher, Duration::from_millis(10)),
        )
        .await
        .expect("queue should drain");

        shutdown_tx.send(true).unwrap();
        runner.await.unwrap();

        assert!(dispatcher.is_idle());
        assert_eq!(
            *sink.sent.lock().unwrap(),
            vec!["first", "second", "third", "fourth"]
        );
    }
}
