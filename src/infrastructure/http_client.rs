//! 轻量 HTTP 客户端 - 基础设施层
//!
//! 只负责"带浏览器请求头拉取 HTML"，不判断内容

use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::redirect::Policy;
use tokio::time::sleep;
use tracing::debug;

use crate::config::SiteConfig;
use crate::error::{AppError, AppResult, HttpError};

/// 轻量 HTTP 客户端
pub struct HttpClient {
    client: reqwest::Client,
    user_agents: Vec<String>,
    courtesy_delay_ms: (u64, u64),
}

impl HttpClient {
    /// 根据站点配置创建客户端
    pub fn new(site: &SiteConfig) -> AppResult<Self> {
        let mut headers = HeaderMap::new();
        if let Ok(v) = HeaderValue::from_str(&site.accept) {
            headers.insert(ACCEPT, v);
        }
        if let Ok(v) = HeaderValue::from_str(&site.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, v);
        }
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert("Upgrade-Insecure-Requests", HeaderValue::from_static("1"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(site.request_timeout_secs))
            .redirect(Policy::limited(5))
            .gzip(true)
            .build()
            .map_err(HttpError::ClientBuildFailed)?;

        Ok(Self {
            client,
            user_agents: site.user_agents.clone(),
            courtesy_delay_ms: site.courtesy_delay_ms,
        })
    }

    /// 拉取页面 HTML
    ///
    /// 请求前随机等待一小段时间，每次随机选择 User-Agent
    pub async fn get_html(&self, url: &str) -> AppResult<String> {
        let (delay, user_agent) = {
            let mut rng = rand::rng();
            let (lo, hi) = self.courtesy_delay_ms;
            let delay = if hi > lo { rng.random_range(lo..=hi) } else { lo };
            let ua = if self.user_agents.is_empty() {
                None
            } else {
                Some(self.user_agents[rng.random_range(0..self.user_agents.len())].clone())
            };
            (delay, ua)
        };
        sleep(Duration::from_millis(delay)).await;

        let mut request = self.client.get(url);
        if let Some(ua) = user_agent {
            request = request.header(USER_AGENT, ua);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::http_request_failed(url, e))?;

        let status = response.status();
        debug!("轻量请求 {} 返回状态 {}", url, status);
        if !status.is_success() {
            return Err(HttpError::BadStatus {
                url: url.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        response
            .text()
            .await
            .map_err(|e| AppError::http_request_failed(url, e))
    }
}
