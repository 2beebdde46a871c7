//! 投递层 - 将 dispatcher 取出的消息发送到外部渠道
//!
//! 所有渠道实现 `DeliverySink`，发送是 fire-and-forget：
//! 失败只记录日志，不重试，也不会重新入队。

pub mod channel;
pub mod dry_run;
pub mod webhook;

pub use channel::{DeliverySink, SendResult};
pub use dry_run::DryRunSink;
pub use webhook::{WebhookConfig, WebhookSink};
