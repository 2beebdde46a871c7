//! Chat Webhook 渠道
//!
//! 将消息以 `{"content": "..."}` 形式 POST 到 webhook。
//! error / exception 发往错误频道，其余发往日志频道。
//! 成功响应为 204 No Content，其它状态码或网络错误只记录日志，不重试。
//! 超过 2000 字符的内容拆成多条依次发送，任一条失败即停止。

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::channel::{split_content, DeliverySink, SendResult};
use crate::config::RelayConfig;
use crate::event::{QueueEntry, Route};

/// 单条消息内容上限（字符）
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Webhook 渠道配置
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub logs_url: Option<String>,
    pub errors_url: Option<String>,
    /// 超时时间 (秒)
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            logs_url: None,
            errors_url: None,
            timeout_secs: 30,
        }
    }
}

impl From<&RelayConfig> for WebhookConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            logs_url: config.webhook_url_logs.clone(),
            errors_url: config.webhook_url_errors.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// Webhook 请求载荷
#[derive(Debug, Serialize)]
pub struct WebhookPayload {
    /// 消息内容
    pub content: String,
}

/// Webhook 投递渠道
#[derive(Debug, Clone)]
pub struct WebhookSink {
    client: Client,
    config: WebhookConfig,
    in_flight: Arc<AtomicUsize>,
}

impl WebhookSink {
    /// 创建新的 Webhook 渠道
    pub fn new(config: WebhookConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            config,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// 按路由选择目标 URL；两个 URL 都配置时才投递
    pub fn target_url(&self, route: Route) -> Option<&str> {
        let (logs, errors) = (self.config.logs_url.as_deref(), self.config.errors_url.as_deref());
        match (logs, errors) {
            (Some(logs), Some(errors)) => Some(match route {
                Route::Logs => logs,
                Route::Errors => errors,
            }),
            _ => None,
        }
    }

    /// 同步等待一次发送完成
    pub async fn send(&self, entry: &QueueEntry) -> SendResult {
        let Some(url) = self.target_url(entry.route()) else {
            error!("You must set both webhook URLs (webhook_url_logs, webhook_url_errors)");
            return SendResult::Skipped("webhook URLs not configured".to_string());
        };
        post_content(&self.client, url, &entry.text).await
    }
}

/// POST 一条消息（必要时拆分），每段都返回 204 才视为成功
async fn post_content(client: &Client, url: &str, content: &str) -> SendResult {
    let chunks = split_content(content, MAX_CONTENT_CHARS);
    if chunks.len() > 1 {
        debug!(
            chars = content.chars().count(),
            parts = chunks.len(),
            "Splitting long message"
        );
    }

    let total = chunks.len();
    for (index, chunk) in chunks.into_iter().enumerate() {
        if let Err(reason) = post_chunk(client, url, chunk).await {
            return SendResult::Failed(if total > 1 {
                format!("part {}/{}: {}", index + 1, total, reason)
            } else {
                reason
            });
        }
    }
    SendResult::Sent
}

async fn post_chunk(client: &Client, url: &str, content: String) -> Result<(), String> {
    let payload = WebhookPayload { content };

    match client.post(url).json(&payload).send().await {
        Ok(response) if response.status() == StatusCode::NO_CONTENT => Ok(()),
        Ok(response) => Err(format!("Webhook responded with status {}", response.status())),
        Err(e) => Err(format!("HTTP request failed: {}", e)),
    }
}

impl DeliverySink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn send_async(&self, entry: &QueueEntry) -> Result<()> {
        let route = entry.route();
        let Some(url) = self.target_url(route) else {
            error!(
                category = %entry.category,
                "You must set both webhook URLs (webhook_url_logs, webhook_url_errors), dropping message"
            );
            return Ok(());
        };

        let client = self.client.clone();
        let url = url.to_string();
        let content = entry.text.clone();
        let category = entry.category.to_string();
        let in_flight = self.in_flight.clone();

        in_flight.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(async move {
            match post_content(&client, &url, &content).await {
                SendResult::Sent => {
                    debug!(route = %route, category = %category, "Webhook message delivered");
                }
                SendResult::Failed(reason) | SendResult::Skipped(reason) => {
                    warn!(route = %route, category = %category, error = %reason, "Webhook delivery failed");
                }
            }
            in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(())
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
