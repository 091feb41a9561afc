//! 有界轮询

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// 按固定间隔轮询，直到探测函数返回 Some 或次数用尽
///
/// 每次探测前先等待一个间隔；次数用尽返回 None
pub async fn poll_until<T, F, Fut>(interval: Duration, max_attempts: usize, mut check: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    for _ in 0..max_attempts {
        sleep(interval).await;
        if let Some(value) = check().await {
            return Some(value);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_returns_first_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let result = poll_until(Duration::from_millis(500), 10, || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { (n == 3).then_some(n) }
        })
        .await;
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let start = tokio::time::Instant::now();
        let result: Option<()> = poll_until(Duration::from_millis(200), 4, || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { None }
        })
        .await;
        assert!(result.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(start.elapsed() >= Duration::from_millis(800));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_attempts_never_checks() {
        let result: Option<u8> = poll_until(Duration::from_millis(1), 0, || async { Some(1) }).await;
        assert!(result.is_none());
    }
}
