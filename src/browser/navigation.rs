//! 导航重试与挑战页等待
//!
//! 与具体浏览器无关：导航和拦截检测都以闭包传入

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{AppResult, BrowserError};
use crate::utils::logging::truncate_text;

/// 带固定退避的导航重试
///
/// 最多尝试 `attempts` 次（至少 1 次），两次尝试之间等待 `backoff`，最后一次失败后不再等待
pub async fn retry_navigation<F, Fut>(
    url: &str,
    attempts: usize,
    backoff: Duration,
    mut navigate: F,
) -> AppResult<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), String>>,
{
    let attempts = attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match navigate().await {
            Ok(()) => {
                debug!("导航成功 (第 {} 次): {}", attempt, truncate_text(url, 80));
                return Ok(());
            }
            Err(e) => last_error = e,
        }
        warn!("⚠️ 导航失败，第 {}/{} 次: {}", attempt, attempts, last_error);
        if attempt < attempts {
            sleep(backoff).await;
        }
    }

    Err(BrowserError::NavigationFailed {
        url: url.to_string(),
        attempts,
        message: last_error,
    }
    .into())
}

/// 等待挑战页放行，返回最终是否仍被拦截
///
/// 先停留 `dwell` 再检测；命中拦截时额外等待 `extra_wait` 后复查一次
pub async fn settle_challenge<F, Fut>(dwell: Duration, extra_wait: Duration, mut is_blocked: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    sleep(dwell).await;
    if !is_blocked().await {
        return false;
    }

    warn!("⚠️ 页面仍处于挑战状态，额外等待后复查");
    sleep(extra_wait).await;
    is_blocked().await
}
