//! 页面获取能力
//!
//! 按顺序尝试获取策略：轻量请求 → 浏览器渲染。
//! 只有所有策略都失败才算致命错误

use std::fmt;
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::BrowserDriver;
use crate::config::{Config, SiteConfig};
use crate::error::{AcquisitionError, AppError, AppResult};
use crate::infrastructure::HttpClient;
use crate::utils::logging::truncate_text;

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex"));

fn normalize(signatures: &[String]) -> Vec<String> {
    signatures
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 拦截页检测
///
/// 普通特征匹配整页内容，标题特征只匹配 `<title>`
#[derive(Debug, Clone)]
pub struct BlockDetector {
    signatures: Vec<String>,
    title_signatures: Vec<String>,
}

impl BlockDetector {
    pub fn new(signatures: &[String], title_signatures: &[String]) -> Self {
        Self {
            signatures: normalize(signatures),
            title_signatures: normalize(title_signatures),
        }
    }

    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(&site.block_signatures, &site.title_block_signatures)
    }

    /// 原始 HTML 中第一个命中的特征
    pub fn matched(&self, html: &str) -> Option<&str> {
        let title = TITLE
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map_or("", |m| m.as_str());
        self.matched_parts(title, html)
    }

    /// 分别给出标题与页面文本时第一个命中的特征
    pub fn matched_parts(&self, title: &str, text: &str) -> Option<&str> {
        let lower = text.to_lowercase();
        let title = title.to_lowercase();
        self.signatures
            .iter()
            .find(|sig| lower.contains(sig.as_str()))
            .or_else(|| self.title_signatures.iter().find(|sig| title.contains(sig.as_str())))
            .map(String::as_str)
    }

    pub fn is_blocked(&self, html: &str) -> bool {
        self.matched(html).is_some()
    }
}

/// 获取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireMethod {
    Light,
    Browser,
}

impl fmt::Display for AcquireMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcquireMethod::Light => f.write_str("light"),
            AcquireMethod::Browser => f.write_str("browser"),
        }
    }
}

/// 获取结果
#[derive(Debug, Clone)]
pub struct AcquiredPage {
    pub html: String,
    pub method: AcquireMethod,
    pub blocked: bool,
}

/// 单个获取策略
#[async_trait]
pub trait AcquireStrategy: Send + Sync {
    fn method(&self) -> AcquireMethod;

    async fn fetch(&self, url: &str) -> AppResult<AcquiredPage>;
}

/// 轻量请求
pub struct LightFetchStrategy {
    client: HttpClient,
    detector: BlockDetector,
}

impl LightFetchStrategy {
    pub fn new(client: HttpClient, detector: BlockDetector) -> Self {
        Self { client, detector }
    }
}

#[async_trait]
impl AcquireStrategy for LightFetchStrategy {
    fn method(&self) -> AcquireMethod {
        AcquireMethod::Light
    }

    async fn fetch(&self, url: &str) -> AppResult<AcquiredPage> {
        let html = self.client.get_html(url).await?;
        let blocked = match self.detector.matched(&html) {
            Some(sig) => {
                debug!("命中拦截特征: {}", sig);
                true
            }
            None => false,
        };
        Ok(AcquiredPage {
            html,
            method: AcquireMethod::Light,
            blocked,
        })
    }
}

/// 浏览器渲染
pub struct BrowserRenderStrategy {
    driver: Arc<dyn BrowserDriver>,
}

impl BrowserRenderStrategy {
    pub fn new(driver: Arc<dyn BrowserDriver>) -> Self {
        Self { driver }
    }
}

#[async_trait]
impl AcquireStrategy for BrowserRenderStrategy {
    fn method(&self) -> AcquireMethod {
        AcquireMethod::Browser
    }

    async fn fetch(&self, url: &str) -> AppResult<AcquiredPage> {
        let page = self.driver.render(url).await?;
        Ok(AcquiredPage {
            html: page.html,
            method: AcquireMethod::Browser,
            blocked: page.blocked,
        })
    }
}

/// 页面获取器
pub struct PageAcquirer {
    strategies: Vec<Box<dyn AcquireStrategy>>,
}

impl PageAcquirer {
    pub fn new(strategies: Vec<Box<dyn AcquireStrategy>>) -> Self {
        Self { strategies }
    }

    /// 默认策略：轻量请求 → 浏览器渲染
    pub fn standard(config: &Config, driver: Arc<dyn BrowserDriver>) -> AppResult<Self> {
        let detector = BlockDetector::from_site(&config.site);
        let client = HttpClient::new(&config.site)?;
        Ok(Self::new(vec![
            Box::new(LightFetchStrategy::new(client, detector)),
            Box::new(BrowserRenderStrategy::new(driver)),
        ]))
    }

    /// 获取页面
    ///
    /// 非最后一个策略的结果若命中拦截特征则丢弃并继续；
    /// 最后一个策略的结果即使仍被拦截也照常返回
    pub async fn acquire(&self, url: &str) -> AppResult<AcquiredPage> {
        if self.strategies.is_empty() {
            return Err(AcquisitionError::NoStrategies {
                url: url.to_string(),
            }
            .into());
        }

        let last = self.strategies.len() - 1;
        let mut reasons = Vec::new();

        for (i, strategy) in self.strategies.iter().enumerate() {
            let method = strategy.method();
            debug!("尝试 {} 获取: {}", method, truncate_text(url, 80));

            match strategy.fetch(url).await {
                Ok(page) if page.blocked && i < last => {
                    warn!("⚠️ {} 获取命中拦截页，切换下一种方式", method);
                    reasons.push(format!("{}: 命中拦截页", method));
                }
                Ok(page) => {
                    if page.blocked {
                        warn!("⚠️ {} 获取的页面仍可能是拦截页，按原样使用", method);
                    } else {
                        info!("✓ {} 获取成功 ({} 字节)", method, page.html.len());
                    }
                    return Ok(page);
                }
                Err(e) => {
                    warn!("⚠️ {} 获取失败: {}", method, e);
                    reasons.push(format!("{}: {}", method, e));
                }
            }
        }

        Err(AppError::acquisition_failed(url, reasons))
    }
}
