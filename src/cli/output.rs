//! Output formatting for CLI commands

use serde::Serialize;

use crate::config::RelayConfig;

/// Format output as pretty JSON
pub fn format_output<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// 隐藏 webhook URL 中的 token，只保留协议和主机
pub fn mask_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or(rest);
            format!("{}://{}/***", scheme, host)
        }
        None => "***".to_string(),
    }
}

/// 人类可读的配置摘要
pub fn format_config_summary(config: &RelayConfig) -> String {
    let url = |u: &Option<String>| u.as_deref().map(mask_url).unwrap_or_else(|| "(not set)".to_string());
    let events: Vec<String> = config
        .events
        .iter()
        .map(|(name, enabled)| format!("{}={}", name, enabled))
        .collect();

    let mut lines = vec![
        format!("buffer:             {} ({}s window)", config.buffer, config.buffer_seconds),
        format!("queue_max:          {}", config.queue_max),
        format!(
            "process_name:       {}",
            config.process_name.as_deref().unwrap_or("(all processes)")
        ),
        format!(
            "categories:         log={} error={} exception={} kill={}",
            config.log, config.error, config.exception, config.kill
        ),
        format!(
            "lifecycle events:   {}",
            if events.is_empty() { "(none)".to_string() } else { events.join(" ") }
        ),
        format!("webhook_url_logs:   {}", url(&config.webhook_url_logs)),
        format!("webhook_url_errors: {}", url(&config.webhook_url_errors)),
        format!("self_name:          {}", config.self_name),
        format!("timeout_secs:       {}", config.timeout_secs),
    ];

    if !config.has_webhooks() {
        lines.push("⚠️  Both webhook URLs must be set, messages will be dropped".to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_url() {
        assert_eq!(
            mask_url("https://discord.com/api/webhooks/123/secret-token"),
            "https://discord.com/***"
        );
        assert_eq!(mask_url("not a url"), "***");
    }

    #[test]
    fn test_config_summary_hides_tokens() {
        let config = RelayConfig {
            webhook_url_logs: Some("https://chat.example/hooks/abc/TOKEN".to_string()),
            ..Default::default()
        };
        let summary = format_config_summary(&config);
        assert!(!summary.contains("TOKEN"));
        assert!(summary.contains("webhook_url_errors: (not set)"));
        assert!(summary.contains("messages will be dropped"));
    }
}
