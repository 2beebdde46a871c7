//! 配置加载
//!
//! 加载优先级：
//! 1. `--config <path>` 指定的 JSON 文件
//! 2. `~/.config/process-event-relay/config.json`
//! 3. 内置默认值
//!
//! 之后再应用环境变量覆盖（`PER_WEBHOOK_URL_LOGS`、`PER_WEBHOOK_URL_ERRORS`、`PER_PROCESS_NAME`）。
//! 数值越界时按规则回退到默认值并输出 warn 日志。

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::event::Category;

/// relay 自身的进程名（用于排除自身日志，避免回环）
pub const RELAY_PROCESS_NAME: &str = "process-event-relay";

/// 默认合并窗口（秒）
pub const DEFAULT_BUFFER_SECONDS: u64 = 1;
/// 默认队列上限
pub const DEFAULT_QUEUE_MAX: usize = 100;
/// 默认 HTTP 超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// 已知的生命周期事件名，其它名称按自定义事件处理
pub const KNOWN_LIFECYCLE_EVENTS: &[&str] = &[
    "start",
    "stop",
    "restart",
    "exit",
    "online",
    "delete",
    "restart overlimit",
];

/// 配置文件原始结构（宽松解析）
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub buffer: Option<bool>,
    #[serde(default)]
    pub buffer_seconds: Option<Value>,
    #[serde(default)]
    pub queue_max: Option<Value>,
    #[serde(default)]
    pub process_name: Option<String>,
    #[serde(default)]
    pub log: Option<bool>,
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub exception: Option<bool>,
    #[serde(default)]
    pub kill: Option<bool>,
    /// 生命周期事件开关：事件名 -> 是否转发
    #[serde(default)]
    pub events: HashMap<String, bool>,
    #[serde(default)]
    pub webhook_url_logs: Option<String>,
    #[serde(default)]
    pub webhook_url_errors: Option<String>,
    #[serde(default)]
    pub self_name: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// 旧式平铺写法：顶层 `"restart": true`
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// 校验后的运行配置，启动后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayConfig {
    /// 是否合并相邻同类消息
    pub buffer: bool,
    /// 合并窗口，取值 [1, 5)
    pub buffer_seconds: u64,
    /// 队列上限，取值 (10, 100]
    pub queue_max: usize,
    /// 只转发该进程的事件
    pub process_name: Option<String>,
    pub log: bool,
    pub error: bool,
    pub exception: bool,
    pub kill: bool,
    pub events: BTreeMap<String, bool>,
    pub webhook_url_logs: Option<String>,
    pub webhook_url_errors: Option<String>,
    pub self_name: String,
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            buffer: true,
            buffer_seconds: DEFAULT_BUFFER_SECONDS,
            queue_max: DEFAULT_QUEUE_MAX,
            process_name: None,
            log: true,
            error: false,
            exception: true,
            kill: true,
            events: BTreeMap::new(),
            webhook_url_logs: None,
            webhook_url_errors: None,
            self_name: RELAY_PROCESS_NAME.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RelayConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("process-event-relay")
            .join("config.json")
    }

    /// 按优先级加载配置并应用环境变量覆盖
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => {
                let default_path = Self::default_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    debug!(path = %default_path.display(), "No config file found, using defaults");
                    Self::default()
                }
            }
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// 从 JSON 文件加载
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let raw: FileConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!(path = %path.display(), "Loaded config file");
        Ok(Self::from_file_config(raw))
    }

    /// 校验并归一化原始配置
    pub fn from_file_config(raw: FileConfig) -> Self {
        let defaults = Self::default();

        let buffer_seconds = match raw.buffer_seconds.as_ref().map(|v| (v, config_int(v))) {
            Some((_, Some(v))) if v > 0 && v < 5 => v as u64,
            Some((_, Some(v))) => {
                warn!(value = v, fallback = DEFAULT_BUFFER_SECONDS, "buffer_seconds out of range (1..5)");
                DEFAULT_BUFFER_SECONDS
            }
            Some((raw_value, None)) => {
                warn!(value = %raw_value, fallback = DEFAULT_BUFFER_SECONDS, "buffer_seconds is not an integer");
                DEFAULT_BUFFER_SECONDS
            }
            None => DEFAULT_BUFFER_SECONDS,
        };

        let queue_max = match raw.queue_max.as_ref().map(|v| (v, config_int(v))) {
            Some((_, Some(v))) if v > 10 && v <= 100 => v as usize,
            Some((_, Some(v))) => {
                warn!(value = v, fallback = DEFAULT_QUEUE_MAX, "queue_max out of range (11..=100)");
                DEFAULT_QUEUE_MAX
            }
            Some((raw_value, None)) => {
                warn!(value = %raw_value, fallback = DEFAULT_QUEUE_MAX, "queue_max is not an integer");
                DEFAULT_QUEUE_MAX
            }
            None => DEFAULT_QUEUE_MAX,
        };

        let mut events: BTreeMap<String, bool> = BTreeMap::new();
        for (key, value) in raw.extra {
            match value {
                Value::Bool(enabled) => {
                    events.insert(key, enabled);
                }
                other => {
                    warn!(key = %key, value = %other, "Ignoring unknown config key");
                }
            }
        }
        // `events` 对象优先于平铺写法
        events.extend(raw.events);

        for name in events.keys() {
            if !KNOWN_LIFECYCLE_EVENTS.contains(&name.as_str()) {
                warn!(event = %name, "Unknown lifecycle event, forwarding as custom event");
            }
        }

        Self {
            buffer: raw.buffer.unwrap_or(defaults.buffer),
            buffer_seconds,
            queue_max,
            process_name: raw.process_name.filter(|n| !n.is_empty()),
            log: raw.log.unwrap_or(defaults.log),
            error: raw.error.unwrap_or(defaults.error),
            exception: raw.exception.unwrap_or(defaults.exception),
            kill: raw.kill.unwrap_or(defaults.kill),
            events,
            webhook_url_logs: raw.webhook_url_logs.filter(|u| !u.is_empty()),
            webhook_url_errors: raw.webhook_url_errors.filter(|u| !u.is_empty()),
            self_name: raw
                .self_name
                .filter(|n| !n.is_empty())
                .unwrap_or(defaults.self_name),
            timeout_secs: raw.timeout_secs.filter(|t| *t > 0).unwrap_or(defaults.timeout_secs),
        }
    }

    /// 应用环境变量覆盖（读取函数可注入，便于测试）
    pub fn apply_env_overrides<F>(&mut self, get: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = get("PER_WEBHOOK_URL_LOGS").filter(|u| !u.is_empty()) {
            debug!("Using PER_WEBHOOK_URL_LOGS from environment");
            self.webhook_url_logs = Some(url);
        }
        if let Some(url) = get("PER_WEBHOOK_URL_ERRORS").filter(|u| !u.is_empty()) {
            debug!("Using PER_WEBHOOK_URL_ERRORS from environment");
            self.webhook_url_errors = Some(url);
        }
        if let Some(name) = get("PER_PROCESS_NAME").filter(|n| !n.is_empty()) {
            self.process_name = Some(name);
        }
    }

    /// 判断某分类是否开启转发
    pub fn is_enabled(&self, category: &Category) -> bool {
        match category {
            Category::Log => self.log,
            Category::Error => self.error,
            Category::Exception => self.exception,
            Category::Kill => self.kill,
            Category::Lifecycle(name) => self.lifecycle_enabled(name),
            Category::Suppressed => true,
        }
    }

    pub fn lifecycle_enabled(&self, event: &str) -> bool {
        self.events.get(event).copied().unwrap_or(false)
    }

    /// 两个 webhook 是否都已配置
    pub fn has_webhooks(&self) -> bool {
        self.webhook_url_logs.is_some() && self.webhook_url_errors.is_some()
    }
}

/// 宽松读取整数配置：整数、整数值浮点数（`50.0`）、数字字符串（`"3"`）
fn config_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
