/// 日志工具模块
///
/// 提供日志初始化和输出的辅助函数
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::models::{DownloadGroup, EpisodeStreams};

/// 初始化日志
///
/// # 参数
/// - `verbose`: 是否输出调试日志（设置了 `RUST_LOG` 时以环境变量为准）
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 截断过长的文本（按字符计）
///
/// # 参数
/// - `text`: 原始文本
/// - `max_chars`: 最大字符数
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// 记录程序启动信息
///
/// # 参数
/// - `operation`: 操作名称
/// - `content_id`: 内容标识
pub fn log_startup(operation: &str, content_id: &str) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 {} - {} ({})",
        operation,
        content_id,
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
}

/// 记录播放源解析结果
pub fn log_streams_summary(streams: &EpisodeStreams) {
    info!("\n{}", "─".repeat(60));
    info!("📊 剧集: {}", streams.resolved_path);
    info!(
        "✓ 服务器 {} 个，可播放 {} 个",
        streams.servers.len(),
        streams.playable_count()
    );
    info!("📥 下载分组: {} 个", streams.downloads.len());
    info!("{}", "─".repeat(60));
}

/// 记录下载解析结果
pub fn log_downloads_summary(groups: &[DownloadGroup]) {
    let links: usize = groups
        .iter()
        .flat_map(|g| g.qualities.iter())
        .map(|q| q.servers.len())
        .sum();
    info!("\n{}", "─".repeat(60));
    info!("📥 下载分组 {} 个，链接 {} 条", groups.len(), links);
    info!("{}", "─".repeat(60));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("abc", 5), "abc");
        assert_eq!(truncate_text("abcdef", 3), "abc...");
        assert_eq!(truncate_text("剧集解析测试", 2), "剧集...");
    }
}
