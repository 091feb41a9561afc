//! 嵌入页二次解析
//!
//! 只处理已知嵌入域名的地址；任何失败都退回原地址，从不报错

use std::sync::{Arc, LazyLock};

use futures::future::join_all;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::browser::{BrowserDriver, EmbedSnapshot};
use crate::config::ResolverSettings;
use crate::infrastructure::poll_until;
use crate::models::server::normalize_media_url;
use crate::models::{ResolvedServer, SourceTag};
use crate::utils::logging::truncate_text;

/// 脚本里的媒体文件地址
static SCRIPT_MEDIA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?:https?:)?//[^\s"'<>]+?\.(?:mp4|m3u8)(?:\?[^\s"'<>]*)?"#)
        .expect("媒体地址正则无效")
});

/// 指向媒体文件的链接
static MEDIA_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(?:mp4|m3u8)(?:[?#]|$)").expect("媒体链接正则无效"));

/// 按优先级从快照中挑选媒体地址：video 元素 → 脚本 → 链接
pub fn pick_media_url(snapshot: &EmbedSnapshot) -> Option<String> {
    if let Some(src) = snapshot
        .video_sources
        .iter()
        .map(|s| s.trim())
        .find(|s| !s.is_empty() && !s.starts_with("blob:"))
    {
        return Some(normalize_media_url(src));
    }

    for script in &snapshot.scripts {
        let unescaped = script.replace("\\/", "/");
        if let Some(m) = SCRIPT_MEDIA.find(&unescaped) {
            return Some(normalize_media_url(m.as_str()));
        }
    }

    snapshot
        .anchors
        .iter()
        .map(|a| a.trim())
        .find(|a| MEDIA_LINK.is_match(a))
        .map(normalize_media_url)
}

/// 嵌入页解析器
pub struct EmbedResolver {
    driver: Arc<dyn BrowserDriver>,
    settings: ResolverSettings,
}

impl EmbedResolver {
    pub fn new(driver: Arc<dyn BrowserDriver>, settings: ResolverSettings) -> Self {
        Self { driver, settings }
    }

    /// 地址是否属于已知嵌入域名
    pub fn is_embed_url(&self, url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        let host = host.to_lowercase();
        self.settings.embed_hosts.iter().any(|pattern| {
            let pattern = pattern.to_lowercase();
            host == pattern || host.ends_with(&format!(".{}", pattern))
        })
    }

    /// 解析嵌入页，失败时返回原地址
    pub async fn resolve_embed(&self, url: &str) -> String {
        if !self.is_embed_url(url) {
            return url.to_string();
        }

        let session = match self.driver.open_embed(url).await {
            Ok(session) => session,
            Err(e) => {
                warn!("⚠️ 打开嵌入页失败，保留原地址: {}", e);
                return url.to_string();
            }
        };

        let found = {
            let session = session.as_ref();
            poll_until(
                self.settings.poll_interval(),
                self.settings.embed_poll_attempts,
                move || async move {
                    match session.snapshot().await {
                        Ok(snapshot) => pick_media_url(&snapshot),
                        Err(e) => {
                            debug!("读取嵌入页失败: {}", e);
                            None
                        }
                    }
                },
            )
            .await
        };
        session.close().await;

        match found {
            Some(media) => {
                info!("🎯 嵌入页解析成功: {}", truncate_text(&media, 60));
                media
            }
            None => {
                warn!("⚠️ 嵌入页没有找到媒体地址: {}", truncate_text(url, 60));
                url.to_string()
            }
        }
    }

    /// 对所有嵌入地址做二次解析，地址改变的条目标记为 embed
    pub async fn resolve_all(&self, servers: Vec<ResolvedServer>) -> Vec<ResolvedServer> {
        let tasks = servers.into_iter().map(|server| async move {
            if !server.is_playable || !self.is_embed_url(&server.url) {
                return server;
            }
            let resolved = self.resolve_embed(&server.url).await;
            if resolved == server.url {
                server
            } else {
                ResolvedServer::new(server.candidate, resolved, SourceTag::Embed)
            }
        });
        join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::browser::{EmbedSession, PlayerSession, RenderedPage};
    use crate::error::{AppError, AppResult};
    use crate::models::{QualityTier, ServerCandidate};

    struct FakeEmbed {
        snapshot: EmbedSnapshot,
    }

    #[async_trait]
    impl EmbedSession for FakeEmbed {
        async fn snapshot(&self) -> AppResult<EmbedSnapshot> {
            Ok(self.snapshot.clone())
        }

        async fn close(self: Box<Self>) {}
    }

    struct FakeDriver {
        snapshot: Option<EmbedSnapshot>,
        opened: AtomicUsize,
    }

    #[async_trait]
    impl BrowserDriver for FakeDriver {
        async fn render(&self, _url: &str) -> AppResult<RenderedPage> {
            Err(AppError::Other("未使用".into()))
        }

        async fn open_player(&self, _url: &str) -> AppResult<Box<dyn PlayerSession>> {
            Err(AppError::Other("未使用".into()))
        }

        async fn open_embed(&self, _url: &str) -> AppResult<Box<dyn EmbedSession>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            match &self.snapshot {
                Some(snapshot) => Ok(Box::new(FakeEmbed {
                    snapshot: snapshot.clone(),
                })),
                None => Err(AppError::Other("浏览器不可用".into())),
            }
        }
    }

    fn make_resolver(snapshot: Option<EmbedSnapshot>) -> (EmbedResolver, Arc<FakeDriver>) {
        let driver = Arc::new(FakeDriver {
            snapshot,
            opened: AtomicUsize::new(0),
        });
        let resolver = EmbedResolver::new(driver.clone(), ResolverSettings::default());
        (resolver, driver)
    }

    #[test]
    fn test_pick_priority() {
        let snapshot = EmbedSnapshot {
            video_sources: vec!["".into(), "//cdn.x/v.mp4".into()],
            scripts: vec!["file: 'https://cdn.x/s.m3u8'".into()],
            anchors: vec!["https://cdn.x/a.mp4".into()],
        };
        assert_eq!(pick_media_url(&snapshot).unwrap(), "https://cdn.x/v.mp4");

        let snapshot = EmbedSnapshot {
            scripts: vec![r#"player.setup({"file":"https:\/\/cdn.x\/s.m3u8?t=1"})"#.into()],
            anchors: vec!["https://cdn.x/a.mp4".into()],
            ..Default::default()
        };
        assert_eq!(pick_media_url(&snapshot).unwrap(), "https://cdn.x/s.m3u8?t=1");

        let snapshot = EmbedSnapshot {
            anchors: vec!["/about".into(), "https://cdn.x/a.mp4".into()],
            ..Default::default()
        };
        assert_eq!(pick_media_url(&snapshot).unwrap(), "https://cdn.x/a.mp4");

        assert!(pick_media_url(&EmbedSnapshot::default()).is_none());
    }

    #[test]
    fn test_embed_host_matching() {
        let (resolver, _) = make_resolver(None);
        assert!(resolver.is_embed_url("https://wibufile.com/embed/1"));
        assert!(resolver.is_embed_url("https://api.wibufile.com/embed/1"));
        assert!(!resolver.is_embed_url("https://notwibufile.com/embed/1"));
        assert!(!resolver.is_embed_url("not a url"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_all_tags_changed_urls() {
        let (resolver, driver) = make_resolver(Some(EmbedSnapshot {
            video_sources: vec!["https://cdn.x/final.mp4".into()],
            ..Default::default()
        }));
        let servers = vec![
            ResolvedServer::new(
                ServerCandidate::new("Wibu", QualityTier::P720, ""),
                "https://wibufile.com/embed/1",
                SourceTag::Interactive,
            ),
            ResolvedServer::new(
                ServerCandidate::new("Nakama", QualityTier::P720, ""),
                "https://other.host/e/2",
                SourceTag::Interactive,
            ),
        ];

        let out = resolver.resolve_all(servers).await;
        assert_eq!(out[0].url, "https://cdn.x/final.mp4");
        assert_eq!(out[0].source_tag, SourceTag::Embed);
        assert_eq!(out[1].source_tag, SourceTag::Interactive);
        assert_eq!(driver.opened.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_keep_original_url() {
        let (resolver, _) = make_resolver(None);
        let url = "https://wibufile.com/embed/9";
        assert_eq!(resolver.resolve_embed(url).await, url);

        let (resolver, _) = resolver_with_empty_page();
        assert_eq!(resolver.resolve_embed(url).await, url);
    }

    fn resolver_with_empty_page() -> (EmbedResolver, Arc<FakeDriver>) {
        make_resolver(Some(EmbedSnapshot::default()))
    }
}
