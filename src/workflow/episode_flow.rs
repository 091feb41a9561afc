//! 单次解析流程
//!
//! 定义"一个页面"的完整处理流程：
//! 别名解析 → 获取页面 → 静态扫描 → 交互解析 → 嵌入页解析 → 下载区解析

use std::sync::Arc;

use tracing::{info, warn};

use super::resolution_ctx::ResolutionCtx;
use crate::browser::BrowserDriver;
use crate::config::{Config, ResolverSettings};
use crate::error::AppResult;
use crate::models::{BatchPage, ContentReference, EpisodeStreams, ResolvedServer, ServerCandidate};
use crate::services::{
    download_extractor, episode_locator, metadata_extractor, static_extractor, EmbedResolver,
    InteractiveResolver, PageAcquirer,
};

/// 解析流程
///
/// 不做缓存；只有页面获取失败会返回错误，其余情况都降级为部分结果
pub struct EpisodeFlow {
    config: Config,
    acquirer: Arc<PageAcquirer>,
    driver: Arc<dyn BrowserDriver>,
    interactive: InteractiveResolver,
    embed: EmbedResolver,
}

impl EpisodeFlow {
    pub fn new(config: Config, acquirer: Arc<PageAcquirer>, driver: Arc<dyn BrowserDriver>) -> Self {
        let resolver: ResolverSettings = config.resolver.clone();
        Self {
            interactive: InteractiveResolver::new(resolver.clone()),
            embed: EmbedResolver::new(driver.clone(), resolver),
            config,
            acquirer,
            driver,
        }
    }

    /// 把内容标识解析为具体页面
    ///
    /// 番剧 slug 解析为序号最大的剧集；找不到剧集链接时直接使用 slug
    pub async fn locate(&self, content_id: &str) -> AppResult<ContentReference> {
        if !ContentReference::needs_alias_resolution(content_id) {
            return Ok(ContentReference::concrete(content_id));
        }

        let slug = ContentReference::concrete(content_id).resolved_path;
        info!("[番剧 {}] 🔍 查找最新剧集...", slug);
        let page = self.acquirer.acquire(&self.config.build_site_url(&slug)).await?;

        match episode_locator::latest_episode_path(&page.html, &slug, &self.config.site.base_url) {
            Some(path) => {
                info!("[番剧 {}] ✓ 最新剧集: {}", slug, path);
                Ok(ContentReference::resolved(content_id, path))
            }
            None => {
                warn!("[番剧 {}] ⚠️ 没有找到剧集链接，按原路径处理", slug);
                Ok(ContentReference::concrete(content_id))
            }
        }
    }

    /// 打开播放页做交互解析；会话打不开时退回静态候选
    async fn run_interactive(
        &self,
        ctx: &ResolutionCtx,
        url: &str,
        candidates: &[ServerCandidate],
    ) -> Vec<ResolvedServer> {
        let session = match self.driver.open_player(url).await {
            Ok(session) => session,
            Err(e) => {
                warn!("{} ⚠️ 无法打开播放页，保留静态结果: {}", ctx, e);
                return static_extractor::into_unresolved(candidates);
            }
        };

        let servers = self.interactive.resolve(session.as_ref(), candidates).await;
        session.close().await;
        servers
    }

    /// 解析剧集播放源
    pub async fn run_streams(&self, reference: &ContentReference) -> AppResult<EpisodeStreams> {
        let ctx = ResolutionCtx::episode(&reference.resolved_path);
        let url = self.config.build_site_url(&reference.resolved_path);

        info!("{} 📄 获取页面...", ctx);
        let page = self.acquirer.acquire(&url).await?;
        info!("{} ✓ 页面获取成功 (方式: {})", ctx, page.method);

        let metadata = metadata_extractor::extract(&page.html);
        let downloads = download_extractor::extract(&page.html);
        let candidates = static_extractor::extract(&page.html);
        info!("{} 🔎 静态扫描发现 {} 个候选", ctx, candidates.len());

        let servers = if candidates.is_empty() || self.config.resolver.resolve_static_candidates {
            info!("{} 🎬 开始交互解析...", ctx);
            self.run_interactive(&ctx, &url, &candidates).await
        } else {
            static_extractor::into_unresolved(&candidates)
        };

        let servers = self.embed.resolve_all(servers).await;
        let playable = servers.iter().filter(|s| s.is_playable).count();
        info!(
            "{} ✅ 解析完成: 服务器 {} 个 (可播放 {})，下载分组 {} 个",
            ctx,
            servers.len(),
            playable,
            downloads.len()
        );

        Ok(EpisodeStreams {
            resolved_path: reference.resolved_path.clone(),
            metadata,
            servers,
            downloads,
        })
    }

    /// 解析批量下载页：元数据和下载链接
    pub async fn run_batch(&self, reference: &ContentReference) -> AppResult<BatchPage> {
        let ctx = ResolutionCtx::batch(&reference.resolved_path);
        let url = self.config.build_site_url(&reference.resolved_path);

        info!("{} 📄 获取页面...", ctx);
        let page = self.acquirer.acquire(&url).await?;

        let metadata = metadata_extractor::extract_batch(&page.html);
        let downloads = download_extractor::extract(&page.html);
        if downloads.is_empty() {
            warn!("{} ⚠️ 没有找到下载链接", ctx);
        } else {
            info!("{} ✅ 下载分组 {} 个", ctx, downloads.len());
        }
        Ok(BatchPage {
            resolved_path: reference.resolved_path.clone(),
            metadata,
            downloads,
        })
    }
}
