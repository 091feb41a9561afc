//! 对外解析入口
//!
//! 持有缓存、浏览器驱动和解析流程，所有公开操作都经过缓存

use std::sync::Arc;

use tracing::{error, info};

use crate::browser::{BrowserDriver, ChromiumDriver};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::CacheManager;
use crate::models::{BatchPage, ContentReference, DownloadGroup, EpisodeStreams};
use crate::services::PageAcquirer;
use crate::workflow::EpisodeFlow;

const STREAMS_NAMESPACE: &str = "episode:streams";
const BATCH_NAMESPACE: &str = "batch:downloads";

fn cache_key(namespace: &str, content_id: &str) -> String {
    format!("{}:{}", namespace, content_id)
}

/// 播放源 / 下载链接解析器
pub struct StreamResolver {
    config: Config,
    flow: EpisodeFlow,
    cache: Arc<CacheManager>,
}

impl StreamResolver {
    /// 使用 Chromium 驱动和默认获取策略创建解析器
    pub fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(&config));
        let acquirer = Arc::new(PageAcquirer::standard(&config, driver.clone())?);
        let cache = Arc::new(CacheManager::new(
            config.cache.ttl_for(config.cache.streams_tier),
        ));
        Ok(Self::with_components(config, acquirer, driver, cache))
    }

    /// 使用指定组件创建解析器
    pub fn with_components(
        config: Config,
        acquirer: Arc<PageAcquirer>,
        driver: Arc<dyn BrowserDriver>,
        cache: Arc<CacheManager>,
    ) -> Self {
        let flow = EpisodeFlow::new(config.clone(), acquirer, driver);
        Self {
            config,
            flow,
            cache,
        }
    }

    /// 解析剧集播放源（带缓存）
    ///
    /// `content_id` 可以是具体剧集路径，也可以是番剧 slug（自动取最新一集）
    pub async fn resolve_episode_streams(&self, content_id: &str) -> AppResult<EpisodeStreams> {
        let key = cache_key(STREAMS_NAMESPACE, content_id);
        let ttl = self.config.cache.ttl_for(self.config.cache.streams_tier);

        self.cache
            .get_or_set(&key, ttl, move || async move {
                let reference = self.flow.locate(content_id).await?;
                self.flow.run_streams(&reference).await
            })
            .await
            .inspect_err(|e| error!("❌ 解析播放源失败 ({}): {}", content_id, e))
    }

    /// 解析批量下载链接（带缓存）
    pub async fn resolve_batch_downloads(&self, content_id: &str) -> AppResult<Vec<DownloadGroup>> {
        self.resolve_batch_page(content_id).await.map(|page| page.downloads)
    }

    /// 解析批量下载页，包含标题、集数范围和番剧资料（带缓存）
    ///
    /// 与 `resolve_batch_downloads` 共用同一个缓存条目
    pub async fn resolve_batch_page(&self, content_id: &str) -> AppResult<BatchPage> {
        let key = cache_key(BATCH_NAMESPACE, content_id);
        let ttl = self.config.cache.ttl_for(self.config.cache.downloads_tier);

        self.cache
            .get_or_set(&key, ttl, move || async move {
                let reference = ContentReference::batch(content_id);
                self.flow.run_batch(&reference).await
            })
            .await
            .inspect_err(|e| error!("❌ 解析下载链接失败 ({}): {}", content_id, e))
    }

    /// 删除某个标识的全部缓存结果，返回是否删除了内容
    pub fn invalidate(&self, content_id: &str) -> bool {
        let streams = self.cache.delete(&cache_key(STREAMS_NAMESPACE, content_id));
        let downloads = self.cache.delete(&cache_key(BATCH_NAMESPACE, content_id));
        if streams || downloads {
            info!("🗑️ 已清除缓存: {}", content_id);
        }
        streams || downloads
    }

    /// 清空缓存
    pub fn flush_cache(&self) {
        self.cache.flush();
        info!("🗑️ 缓存已清空");
    }

    pub fn cache(&self) -> &CacheManager {
        &self.cache
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
