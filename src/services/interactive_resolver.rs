//! 交互式解析能力
//!
//! 逐个点击播放选项，轮询播放器容器的地址变化。
//! 同一会话内严格串行：页面 UI 状态是共享的

use std::collections::HashSet;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::browser::{PlayerOption, PlayerSession};
use crate::config::ResolverSettings;
use crate::infrastructure::poll_until;
use crate::models::server::{normalize_media_url, title_case};
use crate::models::{QualityTier, ResolvedServer, ServerCandidate, ServerKey, SourceTag};
use crate::utils::logging::truncate_text;

/// 选项画质：显式属性优先于文字
pub fn option_quality(option: &PlayerOption) -> QualityTier {
    [
        option.data("quality"),
        Some(option.text.as_str()),
        option.data("label"),
        option.data("resolution"),
    ]
    .into_iter()
    .flatten()
    .find_map(QualityTier::extract)
    .unwrap_or(QualityTier::Auto)
}

/// 去掉标签中的画质
///
/// 保留画质词之前的部分（为空时取之后的部分），再去掉残留的 HD / SD 这类泛称
fn strip_quality(label: &str) -> String {
    let label = label.trim();
    let rest = match QualityTier::find(label) {
        Some(m) => {
            let before = label[..m.range.start].trim();
            if before.is_empty() {
                label[m.range.end..].trim()
            } else {
                before
            }
        }
        None => label,
    };
    rest.split_whitespace()
        .filter(|word| QualityTier::from_token(word).is_none())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 选项服务器名
pub fn option_name(option: &PlayerOption) -> String {
    let raw = [
        option.data("server"),
        Some(option.text.as_str()),
        option.data("type"),
        option.data("nume"),
        option.data("label"),
    ]
    .into_iter()
    .flatten()
    .map(strip_quality)
    .find(|label| !label.is_empty());

    match raw {
        Some(label) => title_case(&label),
        None => "Unknown".to_string(),
    }
}

fn compact(value: &str) -> String {
    value.to_lowercase().split_whitespace().collect()
}

/// 服务器按钮是否对应某个静态候选：名称和画质都要命中文字或 data 属性
pub fn button_matches(button: &PlayerOption, candidate: &ServerCandidate) -> bool {
    let server = compact(&candidate.name);
    let quality = compact(candidate.quality.as_str());
    if server.is_empty() || button.is_disabled() {
        return false;
    }
    let text = compact(&button.text);
    let server_hit =
        text.contains(&server) || button.data("server").is_some_and(|v| compact(v) == server);
    let quality_hit =
        text.contains(&quality) || button.data("quality").is_some_and(|v| compact(v) == quality);
    server_hit && quality_hit
}

/// 交互式解析器
pub struct InteractiveResolver {
    settings: ResolverSettings,
}

impl InteractiveResolver {
    pub fn new(settings: ResolverSettings) -> Self {
        Self { settings }
    }

    /// 按顺序尝试选择器，返回第一个非空结果
    async fn enumerate(&self, session: &dyn PlayerSession) -> Vec<PlayerOption> {
        for selector in &self.settings.option_selectors {
            match session.player_options(selector).await {
                Ok(options) if !options.is_empty() => {
                    info!("🔎 选择器 {} 找到 {} 个播放选项", selector, options.len());
                    return options;
                }
                Ok(_) => debug!("选择器 {} 没有结果", selector),
                Err(e) => warn!("⚠️ 枚举播放选项失败 ({}): {}", selector, e),
            }
        }
        warn!("⚠️ 页面上没有任何播放选项");
        Vec::new()
    }

    /// 点击后等待地址变化
    async fn await_new_source(&self, session: &dyn PlayerSession, baseline: &str) -> Option<String> {
        poll_until(
            self.settings.poll_interval(),
            self.settings.poll_max_attempts,
            move || async move {
                match session.media_source().await {
                    Ok(src) => {
                        let src = src.trim().to_string();
                        (!src.is_empty() && src != baseline).then_some(src)
                    }
                    Err(e) => {
                        debug!("读取播放地址失败: {}", e);
                        None
                    }
                }
            },
        )
        .await
    }

    /// 解析单个选项
    async fn resolve_option(
        &self,
        session: &dyn PlayerSession,
        option: &PlayerOption,
        candidate: ServerCandidate,
    ) -> ResolvedServer {
        let baseline = session
            .media_source()
            .await
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if let Err(e) = session.click_option(option).await {
            warn!("⚠️ 点击 {} {} 失败: {}", candidate.name, candidate.quality, e);
            return ResolvedServer::unresolved(candidate, SourceTag::Interactive);
        }

        match self.await_new_source(session, &baseline).await {
            Some(src) => {
                let url = normalize_media_url(&src);
                info!(
                    "✅ {} {} → {}",
                    candidate.name,
                    candidate.quality,
                    truncate_text(&url, 60)
                );
                ResolvedServer::new(candidate, url, SourceTag::Interactive)
            }
            None => {
                warn!(
                    "⚠️ {} {} 轮询 {} 次后仍无新地址",
                    candidate.name, candidate.quality, self.settings.poll_max_attempts
                );
                ResolvedServer::unresolved(candidate, SourceTag::Interactive)
            }
        }
    }

    /// 收集所有服务器按钮
    async fn server_buttons(&self, session: &dyn PlayerSession) -> Vec<PlayerOption> {
        let mut buttons = Vec::new();
        for selector in &self.settings.server_button_selectors {
            match session.player_options(selector).await {
                Ok(found) => buttons.extend(found),
                Err(e) => debug!("枚举服务器按钮失败 ({}): {}", selector, e),
            }
        }
        buttons
    }

    /// 第二轮：为播放选项未覆盖的静态候选寻找匹配的服务器按钮
    ///
    /// 找不到按钮的候选保留为未解析的静态结果
    async fn resolve_by_buttons(
        &self,
        session: &dyn PlayerSession,
        unmatched: Vec<ServerCandidate>,
    ) -> Vec<ResolvedServer> {
        let buttons = if unmatched.is_empty() {
            Vec::new()
        } else {
            self.server_buttons(session).await
        };
        if !unmatched.is_empty() {
            debug!("{} 个静态候选待匹配，找到 {} 个服务器按钮", unmatched.len(), buttons.len());
        }

        let mut results = Vec::with_capacity(unmatched.len());
        for candidate in unmatched {
            match buttons.iter().find(|b| button_matches(b, &candidate)) {
                Some(button) => {
                    info!("🖱️ 按钮匹配 {} {}", candidate.name, candidate.quality);
                    results.push(self.resolve_option(session, button, candidate).await);
                    sleep(self.settings.option_settle()).await;
                }
                None => {
                    debug!("没有匹配的按钮: {}", candidate.key());
                    results.push(ResolvedServer::unresolved(candidate, SourceTag::Static));
                }
            }
        }
        results
    }

    /// 解析所有播放选项
    ///
    /// 每个未被跳过的选项都会产出一条结果（失败时地址为空）；
    /// 没有被任何选项覆盖的静态候选再按服务器按钮匹配点击，仍无匹配的保留为未解析的静态结果
    pub async fn resolve(
        &self,
        session: &dyn PlayerSession,
        candidates: &[ServerCandidate],
    ) -> Vec<ResolvedServer> {
        let options = self.enumerate(session).await;
        let mut seen: HashSet<ServerKey> = HashSet::new();
        let mut results = Vec::new();

        for (i, option) in options.iter().enumerate() {
            if option.is_disabled() {
                debug!("跳过不可用选项 #{}", option.index);
                continue;
            }

            let candidate = ServerCandidate::new(
                option_name(option),
                option_quality(option),
                option.text.trim(),
            );
            // 去重在点击之前完成
            if !seen.insert(candidate.key()) {
                debug!("跳过重复选项: {}", candidate.key());
                continue;
            }

            debug!("处理选项 {}/{}: {}", i + 1, options.len(), candidate.key());
            results.push(self.resolve_option(session, option, candidate).await);
            sleep(self.settings.option_settle()).await;
        }

        let unmatched: Vec<ServerCandidate> = candidates
            .iter()
            .filter(|c| seen.insert(c.key()))
            .cloned()
            .collect();
        results.extend(self.resolve_by_buttons(session, unmatched).await);

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::error::{AppError, AppResult};

    /// 点击第 n 个选项后播放器地址变为 `sources[n]`
    #[derive(Default)]
    struct FakeSession {
        options: Vec<PlayerOption>,
        sources: HashMap<usize, String>,
        failing_clicks: Vec<usize>,
        buttons: Vec<PlayerOption>,
        current: Mutex<String>,
        clicks: Arc<Mutex<Vec<usize>>>,
    }

    #[async_trait]
    impl PlayerSession for FakeSession {
        async fn player_options(&self, selector: &str) -> AppResult<Vec<PlayerOption>> {
            match selector {
                ".east_player_option" => Ok(self.options.clone()),
                ".server-item" => Ok(self.buttons.clone()),
                _ => Ok(Vec::new()),
            }
        }

        async fn click_option(&self, option: &PlayerOption) -> AppResult<()> {
            self.clicks.lock().push(option.index);
            if self.failing_clicks.contains(&option.index) {
                return Err(AppError::Other("元素被遮挡".into()));
            }
            if let Some(src) = self.sources.get(&option.index) {
                *self.current.lock() = src.clone();
            }
            Ok(())
        }

        async fn media_source(&self) -> AppResult<String> {
            Ok(self.current.lock().clone())
        }

        async fn close(self: Box<Self>) {}
    }

    fn option(index: usize, text: &str) -> PlayerOption {
        PlayerOption {
            selector: ".east_player_option".into(),
            index,
            class_name: "east_player_option".into(),
            text: text.into(),
            ..Default::default()
        }
    }

    fn settings() -> ResolverSettings {
        ResolverSettings::default()
    }

    #[test]
    fn test_option_labels_prefer_attributes() {
        let mut opt = option(0, "Nakama 720p");
        assert_eq!(option_name(&opt), "Nakama");
        assert_eq!(option_quality(&opt), QualityTier::P720);

        opt.dataset.insert("quality".into(), "1080p".into());
        opt.dataset.insert("server".into(), "pucuk wibu".into());
        assert_eq!(option_name(&opt), "Pucuk Wibu");
        assert_eq!(option_quality(&opt), QualityTier::P1080);
    }

    #[test]
    fn test_option_labels_with_leading_or_glued_quality() {
        let leading = option(0, "HD Nakama 720p");
        assert_eq!(option_name(&leading), "Nakama");
        assert_eq!(option_quality(&leading), QualityTier::P720);

        let other = option(1, "HD Pucuk 720p");
        assert_ne!(
            ServerCandidate::new(option_name(&leading), QualityTier::P720, "").key(),
            ServerCandidate::new(option_name(&other), QualityTier::P720, "").key()
        );

        let glued = option(2, "Nakama720p");
        assert_eq!(option_name(&glued), "Nakama");
        assert_eq!(option_quality(&glued), QualityTier::P720);

        let trailing = option(3, "720p Mega");
        assert_eq!(option_name(&trailing), "Mega");
    }

    #[test]
    fn test_option_without_labels() {
        let opt = option(0, "   ");
        assert_eq!(option_name(&opt), "Unknown");
        assert_eq!(option_quality(&opt), QualityTier::Auto);

        let mut numbered = option(1, "");
        numbered.dataset.insert("nume".into(), "2".into());
        assert_eq!(option_name(&numbered), "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_each_option_and_skips_duplicates_before_click() {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let session = FakeSession {
            options: vec![
                option(0, "Nakama 720p"),
                option(1, "nakama   720P"),
                option(2, "Nakama 1080p"),
            ],
            sources: HashMap::from([
                (0, "//cdn.example/e/720".to_string()),
                (2, "https://cdn.example/e/1080".to_string()),
            ]),
            clicks: clicks.clone(),
            ..Default::default()
        };

        let resolver = InteractiveResolver::new(settings());
        let servers = resolver.resolve(&session, &[]).await;

        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].url, "https://cdn.example/e/720");
        assert_eq!(servers[0].source_tag, SourceTag::Interactive);
        assert_eq!(servers[1].quality(), QualityTier::P1080);
        assert!(servers.iter().all(|s| s.is_playable));
        assert_eq!(*clicks.lock(), vec![0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unchanged_source_and_failed_click_are_unresolved() {
        let session = FakeSession {
            options: vec![option(0, "Mega 720p"), option(1, "Pucuk 480p")],
            failing_clicks: vec![1],
            current: Mutex::new("https://cdn.example/same".to_string()),
            ..Default::default()
        };

        let resolver = InteractiveResolver::new(settings());
        let servers = resolver.resolve(&session, &[]).await;

        assert_eq!(servers.len(), 2);
        assert!(servers.iter().all(|s| !s.is_playable && s.url.is_empty()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_options_are_not_clicked() {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let mut disabled = option(0, "Mega 720p");
        disabled.style = "pointer-events: none".into();
        let session = FakeSession {
            options: vec![disabled],
            clicks: clicks.clone(),
            ..Default::default()
        };

        let resolver = InteractiveResolver::new(settings());
        let servers = resolver.resolve(&session, &[]).await;
        assert!(servers.is_empty());
        assert!(clicks.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_static_candidates_are_kept() {
        let session = FakeSession {
            options: vec![option(0, "Nakama 720p")],
            sources: HashMap::from([(0, "https://cdn.example/a".to_string())]),
            ..Default::default()
        };
        let candidates = vec![
            ServerCandidate::new("Nakama", QualityTier::P720, "Nakama 720p"),
            ServerCandidate::new("Mega", QualityTier::P480, "Mega 480p"),
        ];

        let resolver = InteractiveResolver::new(settings());
        let servers = resolver.resolve(&session, &candidates).await;

        assert_eq!(servers.len(), 2);
        assert_eq!(servers[0].source_tag, SourceTag::Interactive);
        assert_eq!(servers[1].name(), "Mega");
        assert_eq!(servers[1].source_tag, SourceTag::Static);
    }

    fn button(index: usize, text: &str) -> PlayerOption {
        PlayerOption {
            selector: ".server-item".into(),
            index,
            class_name: "server-item".into(),
            text: text.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_button_matching_needs_server_and_quality() {
        let candidate = ServerCandidate::new("Pucuk", QualityTier::P480, "Pucuk 480p");
        assert!(button_matches(&button(0, "PUCUK  480p"), &candidate));
        assert!(!button_matches(&button(0, "Pucuk 720p"), &candidate));
        assert!(!button_matches(&button(0, "Mega 480p"), &candidate));

        let mut by_data = button(0, "Server 3");
        by_data.dataset.insert("server".into(), "pucuk".into());
        by_data.dataset.insert("quality".into(), "480P".into());
        assert!(button_matches(&by_data, &candidate));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmatched_candidates_resolved_through_server_buttons() {
        let clicks = Arc::new(Mutex::new(Vec::new()));
        let session = FakeSession {
            options: vec![option(0, "Nakama 720p")],
            buttons: vec![button(10, "Mega 720p"), button(11, "Pucuk 480p")],
            sources: HashMap::from([
                (0, "https://cdn.example/a".to_string()),
                (11, "//cdn.example/pucuk".to_string()),
            ]),
            clicks: clicks.clone(),
            ..Default::default()
        };
        let candidates = vec![
            ServerCandidate::new("Pucuk", QualityTier::P480, "Pucuk 480p"),
            ServerCandidate::new("Wibu", QualityTier::P360, "Wibu 360p"),
        ];

        let resolver = InteractiveResolver::new(settings());
        let servers = resolver.resolve(&session, &candidates).await;

        assert_eq!(servers.len(), 3);
        assert_eq!(servers[1].name(), "Pucuk");
        assert_eq!(servers[1].url, "https://cdn.example/pucuk");
        assert_eq!(servers[1].source_tag, SourceTag::Interactive);
        assert_eq!(servers[2].name(), "Wibu");
        assert_eq!(servers[2].source_tag, SourceTag::Static);
        assert!(!servers[2].is_playable);
        assert_eq!(*clicks.lock(), vec![0, 11]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_options_yields_nothing() {
        let session = FakeSession::default();
        let resolver = InteractiveResolver::new(settings());
        assert!(resolver.resolve(&session, &[]).await.is_empty());
    }
}
