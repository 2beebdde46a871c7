//! Process Event Relay - 将进程管理器事件转发到聊天 Webhook
//!
//! 数据流：总线事件 -> `EventIngestor` -> 队列 -> `Dispatcher`（合并 / 溢出控制）-> `DeliverySink`

pub mod bus;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod event;
pub mod ingest;
pub mod notification;
pub mod queue;
pub mod sanitize;

pub use config::RelayConfig;
pub use dispatcher::{Dispatcher, DISPATCH_INTERVAL};
pub use event::{BusEvent, Category, QueueEntry, Route};
pub use ingest::EventIngestor;
pub use notification::{DeliverySink, DryRunSink, SendResult, WebhookConfig, WebhookSink};
pub use queue::{
    new_shared_state, Coalescer, MessageQueue, OverflowController, RelayState, SharedState,
    SuppressionState,
};
pub use sanitize::strip_ansi;
