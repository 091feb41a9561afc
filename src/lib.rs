//! # Stream Resolver
//!
//! 为带反爬保护的番剧站点解析剧集播放源和下载链接
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源，只暴露能力
//! - `JsExecutor` - 唯一的 page owner，提供 eval() 能力
//! - `HttpClient` / `CacheManager` / `poll_until`
//! - `browser/` - 启动或附着 Chromium，实现 `BrowserDriver`
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，每个文件一种能力
//! - `PageAcquirer` - 轻量请求 → 浏览器渲染
//! - `static_extractor` / `InteractiveResolver` / `EmbedResolver`
//! - `download_extractor` / `episode_locator` / `metadata_extractor`
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个页面"的完整处理流程
//! - `ResolutionCtx` - 上下文封装（日志前缀）
//! - `EpisodeFlow` - 流程编排（获取 → 扫描 → 交互 → 嵌入页 → 下载区）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/resolver` - 对外入口，缓存两个公开操作
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{BrowserDriver, ChromiumDriver};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{CacheManager, JsExecutor};
pub use models::{DownloadGroup, EpisodeStreams, QualityTier, ResolvedServer, SourceTag};
pub use orchestrator::StreamResolver;
pub use workflow::{EpisodeFlow, ResolutionCtx};
