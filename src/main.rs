//! Process Event Relay CLI
//!
//! 将进程管理器的日志、错误、异常、重启等事件转发到聊天 Webhook

use anyhow::Result;
use clap::{Parser, Subcommand};
use process_event_relay::cli::{
    handle_check_config, handle_run, handle_send_test, CheckConfigArgs, RunArgs, SendTestArgs,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "per")]
#[command(about = "Process Event Relay - 将进程事件转发到聊天 Webhook")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 读取总线事件并转发（默认从 stdin 读取 JSON Lines）
    Run(RunArgs),
    /// 打印生效配置
    CheckConfig(CheckConfigArgs),
    /// 发送一条测试消息
    SendTest(SendTestArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("process_event_relay=info,per=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => handle_run(args).await,
        Commands::CheckConfig(args) => handle_check_config(args),
        Commands::SendTest(args) => handle_send_test(args).await,
    }
}
