//! 事件数据结构
//!
//! 进程管理器总线上的入站事件（`BusEvent`）以及排队等待投递的消息（`QueueEntry`）。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 事件分类
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// 标准输出日志
    Log,
    /// 标准错误日志
    Error,
    /// 未捕获异常
    Exception,
    /// 进程管理器被 kill
    Kill,
    /// 进程生命周期事件（restart、exit 等），携带事件名
    Lifecycle(String),
    /// 限流抑制提示
    Suppressed,
}

/// 投递目标
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Logs,
    Errors,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Logs => write!(f, "logs"),
            Route::Errors => write!(f, "errors"),
        }
    }
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Log => "log",
            Category::Error => "error",
            Category::Exception => "exception",
            Category::Kill => "kill",
            Category::Lifecycle(name) => name,
            Category::Suppressed => "suppressed",
        }
    }

    /// error / exception 走错误频道，其余走普通频道
    pub fn route(&self) -> Route {
        match self {
            Category::Error | Category::Exception => Route::Errors,
            _ => Route::Logs,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 队列中的一条待投递消息
///
/// 创建后只有 `text` 会被合并逻辑改写。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// 来源进程名
    pub source_name: String,
    pub category: Category,
    /// 已清理颜色码的消息文本
    pub text: String,
    /// 到达时间（Unix 秒，向下取整）
    pub arrival_time_seconds: i64,
}

impl QueueEntry {
    pub fn new(
        source_name: impl Into<String>,
        category: Category,
        text: impl Into<String>,
        arrival_time_seconds: i64,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            category,
            text: text.into(),
            arrival_time_seconds,
        }
    }

    pub fn route(&self) -> Route {
        self.category.route()
    }
}

/// 事件来源进程
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub name: String,
    /// 进程管理器内部 ID（可选，仅用于日志）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pm_id: Option<u64>,
}

/// 日志 / 异常事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPacket {
    pub process: ProcessInfo,
    /// 字符串或结构化对象
    #[serde(default)]
    pub data: Value,
}

/// 进程管理器 kill 事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KillPacket {
    #[serde(default)]
    pub msg: String,
}

/// 生命周期事件载荷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecyclePacket {
    pub process: ProcessInfo,
    /// 事件名，如 restart / exit
    pub event: String,
}

/// 总线入站事件（JSON，按 `type` 字段区分）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BusEvent {
    #[serde(rename = "log:out")]
    LogOut(ProcessPacket),
    #[serde(rename = "log:err")]
    LogErr(ProcessPacket),
    #[serde(rename = "process:exception")]
    Exception(ProcessPacket),
    #[serde(rename = "processManager:kill", alias = "pm2:kill")]
    Kill(KillPacket),
    #[serde(rename = "process:event")]
    Lifecycle(LifecyclePacket),
}

impl BusEvent {
    /// 事件来源进程名（kill 事件没有进程）
    pub fn process_name(&self) -> Option<&str> {
        match self {
            BusEvent::LogOut(p) | BusEvent::LogErr(p) | BusEvent::Exception(p) => {
                Some(&p.process.name)
            }
            BusEvent::Lifecycle(p) => Some(&p.process.name),
            BusEvent::Kill(_) => None,
        }
    }

    /// 来源进程的 pm_id（未携带或 kill 事件时为 None）
    pub fn pm_id(&self) -> Option<u64> {
        match self {
            BusEvent::LogOut(p) | BusEvent::LogErr(p) | BusEvent::Exception(p) => p.process.pm_id,
            BusEvent::Lifecycle(p) => p.process.pm_id,
            BusEvent::Kill(_) => None,
        }
    }
}

/// 将载荷转换为文本：字符串原样返回，其它 JSON 值序列化
pub fn payload_text(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
