//! 基于 chromiumoxide 的浏览器驱动
//!
//! 每次调用独占一个浏览器会话和一个页面，无论成功失败都会释放

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use super::connection::connect_to_browser;
use super::headless::BrowserSession;
use super::navigation::{retry_navigation, settle_challenge};
use super::traits::{
    BrowserDriver, EmbedSession, EmbedSnapshot, PlayerOption, PlayerSession, RenderedPage,
};
use crate::config::{BrowserSettings, Config, ResolverSettings, SiteConfig};
use crate::error::{AppResult, BrowserError};
use crate::infrastructure::{poll_until, JsExecutor};
use crate::services::page_acquirer::BlockDetector;
use crate::utils::logging::truncate_text;

/// Chromium 驱动
pub struct ChromiumDriver {
    site: SiteConfig,
    browser: BrowserSettings,
    resolver: ResolverSettings,
    detector: BlockDetector,
}

impl ChromiumDriver {
    pub fn new(config: &Config) -> Self {
        Self {
            site: config.site.clone(),
            browser: config.browser.clone(),
            resolver: config.resolver.clone(),
            detector: BlockDetector::from_site(&config.site),
        }
    }

    /// 启动或附着浏览器并新建页面
    async fn open_page(&self) -> AppResult<(BrowserSession, JsExecutor)> {
        let session = match self.browser.debug_port {
            Some(port) => connect_to_browser(port).await?,
            None => BrowserSession::launch(&self.browser).await?,
        };
        match session.new_page(&self.site).await {
            Ok(page) => Ok((session, JsExecutor::new(page))),
            Err(e) => {
                session.close().await;
                Err(e)
            }
        }
    }

    /// 带重试的导航
    async fn navigate(&self, executor: &JsExecutor, url: &str) -> AppResult<()> {
        let limit = self.browser.navigation_timeout();
        retry_navigation(
            url,
            self.browser.navigation_retries,
            self.browser.navigation_backoff(),
            move || async move {
                match timeout(limit, executor.page().goto(url)).await {
                    Ok(Ok(_)) => Ok(()),
                    Ok(Err(e)) => Err(e.to_string()),
                    Err(_) => Err("导航超时".to_string()),
                }
            },
        )
        .await
    }

    async fn is_blocked(&self, executor: &JsExecutor) -> bool {
        let title = executor.title().await.unwrap_or_default();
        match executor.visible_text().await {
            Ok(text) => self.detector.matched_parts(&title, &text).is_some(),
            Err(e) => {
                debug!("读取页面文本失败: {}", e);
                false
            }
        }
    }

    async fn render_on(&self, executor: &JsExecutor, url: &str) -> AppResult<RenderedPage> {
        self.navigate(executor, url).await?;
        let blocked = settle_challenge(
            self.browser.challenge_dwell(),
            self.browser.blocked_extra_wait(),
            move || self.is_blocked(executor),
        )
        .await;

        sleep(self.browser.settle()).await;
        let html = executor.content().await?;
        Ok(RenderedPage { html, blocked })
    }

    async fn count_options(&self, executor: &JsExecutor) -> usize {
        let all: Vec<&String> = self
            .resolver
            .option_selectors
            .iter()
            .chain(&self.resolver.server_button_selectors)
            .collect();
        let selectors = serde_json::to_string(&all).unwrap_or_default();
        let js = format!(
            "(() => {{ let n = 0; for (const s of {}) {{ n += document.querySelectorAll(s).length; }} return n; }})()",
            selectors
        );
        executor.eval_as::<usize>(js).await.unwrap_or(0)
    }

    async fn prepare_player(&self, executor: &JsExecutor, url: &str) -> AppResult<()> {
        self.navigate(executor, url).await?;
        sleep(self.browser.challenge_dwell()).await;

        let found = poll_until(
            self.resolver.poll_interval(),
            self.resolver.option_wait_attempts,
            move || async move {
                let n = self.count_options(executor).await;
                (n > 0).then_some(n)
            },
        )
        .await;
        match found {
            Some(n) => debug!("检测到 {} 个播放选项", n),
            None => warn!("⚠️ 等待播放选项超时: {}", truncate_text(url, 80)),
        }

        sleep(self.browser.settle()).await;
        Ok(())
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn render(&self, url: &str) -> AppResult<RenderedPage> {
        info!("🌐 浏览器渲染: {}", truncate_text(url, 80));
        let (session, executor) = self.open_page().await?;
        let result = self.render_on(&executor, url).await;
        executor.close().await;
        session.close().await;
        result
    }

    async fn open_player(&self, url: &str) -> AppResult<Box<dyn PlayerSession>> {
        info!("🎬 打开播放页: {}", truncate_text(url, 80));
        let (session, executor) = self.open_page().await?;
        if let Err(e) = self.prepare_player(&executor, url).await {
            executor.close().await;
            session.close().await;
            return Err(e);
        }
        Ok(Box::new(ChromiumPlayerSession {
            session,
            executor,
            player_container: self.resolver.player_container.clone(),
        }))
    }

    async fn open_embed(&self, url: &str) -> AppResult<Box<dyn EmbedSession>> {
        debug!("打开嵌入页: {}", truncate_text(url, 80));
        let (session, executor) = self.open_page().await?;
        if let Err(e) = self.navigate(&executor, url).await {
            executor.close().await;
            session.close().await;
            return Err(e);
        }
        sleep(self.resolver.embed_dwell()).await;
        Ok(Box::new(ChromiumEmbedSession { session, executor }))
    }
}

/// 页面脚本返回的原始选项
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawOption {
    index: usize,
    #[serde(default)]
    style: String,
    #[serde(default)]
    class_name: String,
    #[serde(default)]
    dataset: HashMap<String, String>,
    #[serde(default)]
    text: String,
}

struct ChromiumPlayerSession {
    session: BrowserSession,
    executor: JsExecutor,
    player_container: String,
}

impl ChromiumPlayerSession {
    /// 脚本点击，元素不可交互时使用
    async fn script_click(&self, option: &PlayerOption) -> AppResult<()> {
        let selector = serde_json::to_string(&option.selector)?;
        let js = format!(
            "(() => {{ const el = document.querySelectorAll({})[{}]; if (!el) return false; el.click(); return true; }})()",
            selector, option.index
        );
        let clicked = self.executor.eval_as::<bool>(js).await?;
        if clicked {
            Ok(())
        } else {
            Err(BrowserError::ClickFailed {
                selector: option.selector.clone(),
                index: option.index,
                message: "元素不存在".to_string(),
            }
            .into())
        }
    }
}

#[async_trait]
impl PlayerSession for ChromiumPlayerSession {
    async fn player_options(&self, selector: &str) -> AppResult<Vec<PlayerOption>> {
        let js = format!(
            r#"(() => Array.from(document.querySelectorAll({})).map((el, index) => ({{
                index,
                style: el.getAttribute('style') || '',
                className: el.getAttribute('class') || '',
                dataset: Object.assign({{}}, el.dataset),
                text: (el.textContent || '').trim()
            }})))()"#,
            serde_json::to_string(selector)?
        );
        let raw: Vec<RawOption> = self.executor.eval_as(js).await?;
        Ok(raw
            .into_iter()
            .map(|r| PlayerOption {
                selector: selector.to_string(),
                index: r.index,
                style: r.style,
                class_name: r.class_name,
                dataset: r.dataset,
                text: r.text,
            })
            .collect())
    }

    async fn click_option(&self, option: &PlayerOption) -> AppResult<()> {
        let elements = self.executor.page().find_elements(option.selector.as_str()).await?;
        let Some(element) = elements.get(option.index) else {
            return self.script_click(option).await;
        };

        let _ = element.scroll_into_view().await;
        if let Err(e) = element.click().await {
            debug!("原生点击失败，改用脚本点击: {}", e);
            return self.script_click(option).await;
        }
        Ok(())
    }

    async fn media_source(&self) -> AppResult<String> {
        let js = format!(
            r#"(() => {{
                const frame = document.querySelector({} + ' iframe');
                if (!frame) return '';
                return frame.getAttribute('src') || frame.getAttribute('data-src') || '';
            }})()"#,
            serde_json::to_string(&self.player_container)?
        );
        self.executor.eval_as::<String>(js).await
    }

    async fn close(self: Box<Self>) {
        let this = *self;
        this.executor.close().await;
        this.session.close().await;
    }
}

struct ChromiumEmbedSession {
    session: BrowserSession,
    executor: JsExecutor,
}

#[async_trait]
impl EmbedSession for ChromiumEmbedSession {
    async fn snapshot(&self) -> AppResult<EmbedSnapshot> {
        #[derive(Deserialize)]
        struct Raw {
            videos: Vec<String>,
            scripts: Vec<String>,
            anchors: Vec<String>,
        }

        let raw: Raw = self
            .executor
            .eval_as(
                r#"(() => {
                    const videos = [];
                    document.querySelectorAll('video').forEach(v => {
                        if (v.src) videos.push(v.src);
                        v.querySelectorAll('source').forEach(s => { if (s.src) videos.push(s.src); });
                    });
                    const scripts = Array.from(document.querySelectorAll('script:not([src])'))
                        .map(s => s.textContent || '');
                    const anchors = Array.from(document.querySelectorAll('a[href]'))
                        .map(a => a.getAttribute('href') || '');
                    return { videos, scripts, anchors };
                })()"#,
            )
            .await?;

        Ok(EmbedSnapshot {
            video_sources: raw.videos,
            scripts: raw.scripts,
            anchors: raw.anchors,
        })
    }

    async fn close(self: Box<Self>) {
        let this = *self;
        this.executor.close().await;
        this.session.close().await;
    }
}
