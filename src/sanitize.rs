//! 终端颜色码清理

use regex::Regex;
use std::sync::LazyLock;

/// ANSI 转义序列（CSI 颜色/光标控制，以及以 BEL 结尾的 OSC 序列）
static ANSI_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"[\x1B\x9B][\[\]()#;?]*(?:(?:(?:(?:;[-a-zA-Z\d/#&.:=?%@~_]+)*|[a-zA-Z\d]+(?:;[-a-zA-Z\d/#&.:=?%@~_]*)*)?\x07)|(?:(?:\d{1,4}(?:;\d{0,4})*)?[\dA-PR-TZcf-nq-uy=><~]))",
    )
    .ok()
});

/// 移除文本中的终端颜色码
pub fn strip_ansi(text: &str) -> String {
    match ANSI_PATTERN.as_ref() {
        Some(pattern) => pattern.replace_all(text, "").into_owned(),
        None => text.to_string(),
    }
}
