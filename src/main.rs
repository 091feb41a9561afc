use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use stream_resolver::utils::logging;
use stream_resolver::{Config, StreamResolver};

#[derive(Parser)]
#[command(name = "stream_resolver")]
#[command(about = "解析剧集播放源和下载链接")]
struct Cli {
    /// TOML 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 解析剧集播放源（番剧 slug 自动取最新一集）
    Stream { id: String },
    /// 解析批量下载链接
    Download { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 加载配置
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env(),
    };

    // 初始化日志
    logging::init(cli.verbose || config.verbose_logging);

    let resolver = StreamResolver::new(config)?;

    match cli.command {
        Command::Stream { id } => {
            logging::log_startup("解析播放源", &id);
            let streams = resolver.resolve_episode_streams(&id).await?;
            logging::log_streams_summary(&streams);
            println!("{}", serde_json::to_string_pretty(&streams)?);
        }
        Command::Download { id } => {
            logging::log_startup("解析下载链接", &id);
            let page = resolver.resolve_batch_page(&id).await?;
            logging::log_downloads_summary(&page.downloads);
            println!("{}", serde_json::to_string_pretty(&page)?);
        }
    }

    Ok(())
}
