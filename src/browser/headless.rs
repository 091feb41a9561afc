use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    Headers, SetExtraHttpHeadersParams, SetUserAgentOverrideParams,
};
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{BrowserSettings, SiteConfig};
use crate::error::{AppError, AppResult, BrowserError};

/// 一次浏览器会话
///
/// `owned` 为 false 表示附着在外部浏览器上，关闭时只关页面不关浏览器
pub struct BrowserSession {
    pub(crate) browser: Browser,
    handler_task: JoinHandle<()>,
    owned: bool,
}

impl BrowserSession {
    pub(crate) fn new(browser: Browser, handler_task: JoinHandle<()>, owned: bool) -> Self {
        Self {
            browser,
            handler_task,
            owned,
        }
    }

    /// 启动无头浏览器
    pub async fn launch(settings: &BrowserSettings) -> AppResult<Self> {
        info!("🚀 启动无头浏览器...");

        let (width, height) = settings.viewport;
        let mut builder = BrowserConfig::builder()
            .window_size(width, height)
            .args(vec![
                "--disable-gpu",
                "--no-sandbox",
                "--disable-dev-shm-usage",
                "--disable-blink-features=AutomationControlled",
                "--remote-debugging-port=0",
            ]);
        if settings.headless {
            builder = builder.new_headless_mode();
        } else {
            builder = builder.with_head();
        }
        if let Some(path) = &settings.chrome_executable {
            debug!("使用指定浏览器: {}", path.display());
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(|e| {
            error!("配置无头浏览器失败: {}", e);
            BrowserError::ConfigurationFailed { message: e }
        })?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| {
            error!("启动无头浏览器失败: {}", e);
            AppError::browser_launch_failed(e)
        })?;
        debug!("无头浏览器启动成功");

        // 在后台处理浏览器事件
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        // 添加短暂延迟以等待浏览器状态同步
        sleep(Duration::from_millis(300)).await;

        Ok(Self::new(browser, handler_task, true))
    }

    /// 新建空白页面，设置随机 User-Agent 和浏览器请求头
    pub async fn new_page(&self, site: &SiteConfig) -> AppResult<Page> {
        let page = self.browser.new_page("about:blank").await.map_err(|e| {
            error!("创建页面失败: {}", e);
            BrowserError::PageCreationFailed {
                source: Box::new(e),
            }
        })?;

        if !site.user_agents.is_empty() {
            let idx = rand::rng().random_range(0..site.user_agents.len());
            let params = SetUserAgentOverrideParams::new(site.user_agents[idx].clone());
            if let Err(e) = page.set_user_agent(params).await {
                warn!("⚠️ 设置 User-Agent 失败: {}", e);
            }
        }

        let headers = Headers::new(serde_json::json!({
            "Accept": site.accept,
            "Accept-Language": site.accept_language,
            "DNT": "1",
            "Upgrade-Insecure-Requests": "1",
        }));
        if let Err(e) = page.execute(SetExtraHttpHeadersParams::new(headers)).await {
            warn!("⚠️ 设置请求头失败: {}", e);
        }

        Ok(page)
    }

    /// 关闭会话
    pub async fn close(mut self) {
        if self.owned {
            if let Err(e) = self.browser.close().await {
                debug!("关闭浏览器失败: {}", e);
            }
            let _ = self.browser.wait().await;
        }
        self.handler_task.abort();
        debug!("浏览器会话已释放");
    }
}
