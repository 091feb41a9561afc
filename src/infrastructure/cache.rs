//! 进程内缓存 - 基础设施层
//!
//! 单进程、单实例的记忆化存储：进程重启即丢失，也不在多个实例之间共享。
//! 同一个尚未缓存的键被并发请求时，每个请求都会独立重新计算。

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// 缓存条目
///
/// 写入后不可变，重新计算时整体替换
#[derive(Clone)]
pub struct CacheEntry {
    pub key: String,
    value: Arc<dyn Any + Send + Sync>,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// 缓存管理器
pub struct CacheManager {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl CacheManager {
    /// 创建缓存，`default_ttl` 用于未指定有效期的写入
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// 读取未过期的值
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.is_expired(Instant::now()) {
            return None;
        }
        entry.value.downcast_ref::<T>().cloned()
    }

    /// 写入（整体替换同键的旧条目）
    pub fn set<T>(&self, key: &str, value: T, ttl: Option<Duration>)
    where
        T: Send + Sync + 'static,
    {
        let entry = CacheEntry {
            key: key.to_string(),
            value: Arc::new(value),
            expires_at: Instant::now() + ttl.unwrap_or(self.default_ttl),
        };
        self.entries.write().insert(key.to_string(), entry);
    }

    /// 是否存在未过期的条目
    pub fn has(&self, key: &str) -> bool {
        self.entries
            .read()
            .get(key)
            .is_some_and(|e| !e.is_expired(Instant::now()))
    }

    /// 删除条目，返回是否删除了内容
    pub fn delete(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// 清空缓存
    pub fn flush(&self) {
        self.entries.write().clear();
    }

    /// 清理已过期的条目，返回清理数量
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| !e.is_expired(now));
        before - entries.len()
    }

    /// 当前条目数（包含尚未清理的过期条目）
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 先查缓存，未命中时计算并写入
    ///
    /// 计算失败时不写入，错误原样返回
    pub async fn get_or_set<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            debug!("缓存命中: {}", key);
            return Ok(cached);
        }

        debug!("缓存未命中: {}", key);
        let value = compute().await?;
        self.set(key, value.clone(), Some(ttl));
        Ok(value)
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_get_or_set_memoizes_within_ttl() {
        let cache = CacheManager::default();
        let calls = AtomicUsize::new(0);
        let counter = &calls;

        for _ in 0..3 {
            let value: Result<String, ()> = cache
                .get_or_set("episode:x", Duration::from_secs(60), move || async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok("v".to_string())
                })
                .await;
            assert_eq!(value.unwrap(), "v");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_and_recomputes() {
        let cache = CacheManager::default();
        cache.set("k", 1u32, Some(Duration::from_secs(10)));
        assert_eq!(cache.get::<u32>("k"), Some(1));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert!(!cache.has("k"));
        assert_eq!(cache.get::<u32>("k"), None);

        let v: Result<u32, ()> = cache
            .get_or_set("k", Duration::from_secs(10), || async { Ok(2) })
            .await;
        assert_eq!(v.unwrap(), 2);
        assert_eq!(cache.get::<u32>("k"), Some(2));
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = CacheManager::default();
        let r: Result<u32, &str> = tokio_test::block_on(
            cache.get_or_set("k", Duration::from_secs(10), || async { Err("boom") }),
        );
        assert!(r.is_err());
        assert!(!cache.has("k"));
    }

    #[test]
    fn test_delete_flush_and_type_mismatch() {
        let cache = CacheManager::default();
        cache.set("a", "x".to_string(), None);
        cache.set("b", 5u8, None);
        assert_eq!(cache.get::<u32>("b"), None);
        assert!(cache.delete("a"));
        assert!(!cache.delete("a"));
        cache.flush();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let cache = CacheManager::default();
        cache.set("short", 1u8, Some(Duration::from_secs(1)));
        cache.set("long", 1u8, Some(Duration::from_secs(100)));
        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }
}
