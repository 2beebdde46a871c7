//! check-config 命令 - 打印生效配置

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::output::{format_config_summary, format_output, mask_url};
use crate::config::RelayConfig;

/// check-config 命令参数
#[derive(Args)]
pub struct CheckConfigArgs {
    /// 配置文件路径（默认 ~/.config/process-event-relay/config.json）
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// 输出 JSON 格式
    #[arg(long)]
    pub json: bool,
}

/// 处理 check-config 命令
pub fn handle_check_config(args: CheckConfigArgs) -> Result<()> {
    let mut config = RelayConfig::load(args.config.as_deref())?;

    if args.json {
        config.webhook_url_logs = config.webhook_url_logs.as_deref().map(mask_url);
        config.webhook_url_errors = config.webhook_url_errors.as_deref().map(mask_url);
        println!("{}", format_output(&config));
    } else {
        println!("{}", format_config_summary(&config));
    }

    Ok(())
}
