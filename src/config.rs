use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AppResult, ConfigError};

/// 缓存有效期层级
///
/// 按内容的更新频率选择，越容易变化的内容有效期越短
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheTier {
    /// 很少变化的内容（类型列表、站点结构）
    Static,
    /// 偶尔更新的内容（完结番剧、批量下载页）
    Occasional,
    /// 定期更新的内容（热门、连载）
    Regular,
    /// 频繁变化的内容（剧集播放源）
    Dynamic,
    /// 极易变化的内容（首页）
    Frequent,
}

impl CacheTier {
    /// 获取该层级的有效期
    pub fn ttl(self) -> Duration {
        match self {
            CacheTier::Static => Duration::from_secs(24 * 60 * 60),
            CacheTier::Occasional => Duration::from_secs(6 * 60 * 60),
            CacheTier::Regular => Duration::from_secs(30 * 60),
            CacheTier::Dynamic => Duration::from_secs(10 * 60),
            CacheTier::Frequent => Duration::from_secs(5 * 60),
        }
    }
}

/// 程序配置
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 目标站点配置
    pub site: SiteConfig,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// 解析流程配置
    pub resolver: ResolverSettings,
    /// 缓存配置
    pub cache: CacheSettings,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

/// 目标站点配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// 站点根地址
    pub base_url: String,
    /// 轮换使用的 User-Agent 列表
    pub user_agents: Vec<String>,
    /// 模拟浏览器的请求头
    pub accept: String,
    pub accept_language: String,
    /// 轻量请求超时（秒）
    pub request_timeout_secs: u64,
    /// 轻量请求前的随机礼貌延迟区间（毫秒）
    pub courtesy_delay_ms: (u64, u64),
    /// 反爬挑战页特征（小写匹配）
    pub block_signatures: Vec<String>,
    /// 只在页面标题中匹配的拦截特征（正文里出现不算）
    pub title_block_signatures: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://v1.samehadaku.how".to_string(),
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:109.0) Gecko/20100101 Firefox/118.0".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
            ],
            accept: "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8".to_string(),
            accept_language: "en-US,en;q=0.9,id;q=0.8".to_string(),
            request_timeout_secs: 10,
            courtesy_delay_ms: (100, 600),
            block_signatures: [
                "cloudflare",
                "checking your browser",
                "ddos protection",
                "just a moment",
                "please wait while we are checking your browser",
                "checking if the site connection is secure",
                "__cf_chl_jschl_tk__",
                "cf-browser-verification",
                "cf-challenge-running",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            title_block_signatures: vec!["access denied".to_string()],
        }
    }
}

/// 浏览器配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct BrowserSettings {
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 已运行浏览器的调试端口（设置后连接而不是启动）
    pub debug_port: Option<u16>,
    /// 是否无头模式
    pub headless: bool,
    /// 视口尺寸
    pub viewport: (u32, u32),
    /// 单次导航超时（秒）
    pub navigation_timeout_secs: u64,
    /// 导航最大尝试次数
    pub navigation_retries: usize,
    /// 导航失败后的退避等待（毫秒）
    pub navigation_backoff_ms: u64,
    /// 等待客户端挑战完成的停留时间（毫秒）
    pub challenge_dwell_ms: u64,
    /// 仍被拦截时的额外等待（毫秒）
    pub blocked_extra_wait_ms: u64,
    /// 获取内容前等待动态内容的时间（毫秒）
    pub settle_ms: u64,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            chrome_executable: None,
            debug_port: None,
            headless: true,
            viewport: (1366, 768),
            navigation_timeout_secs: 30,
            navigation_retries: 3,
            navigation_backoff_ms: 2000,
            challenge_dwell_ms: 3000,
            blocked_extra_wait_ms: 5000,
            settle_ms: 2000,
        }
    }
}

impl BrowserSettings {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn navigation_backoff(&self) -> Duration {
        Duration::from_millis(self.navigation_backoff_ms)
    }

    pub fn challenge_dwell(&self) -> Duration {
        Duration::from_millis(self.challenge_dwell_ms)
    }

    pub fn blocked_extra_wait(&self) -> Duration {
        Duration::from_millis(self.blocked_extra_wait_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// 解析流程配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// 播放选项选择器（按顺序尝试，第一个有结果的生效）
    pub option_selectors: Vec<String>,
    /// 服务器按钮选择器（播放选项未覆盖的静态候选按文字匹配点击）
    pub server_button_selectors: Vec<String>,
    /// 播放器容器选择器
    pub player_container: String,
    /// 等待播放选项出现的最大轮询次数
    pub option_wait_attempts: usize,
    /// 轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 每个选项的最大轮询次数
    pub poll_max_attempts: usize,
    /// 相邻两次点击之间的等待（毫秒）
    pub option_settle_ms: u64,
    /// 需要二次解析的嵌入页主机
    pub embed_hosts: Vec<String>,
    /// 打开嵌入页后的停留时间（毫秒）
    pub embed_dwell_ms: u64,
    /// 嵌入页轮询次数
    pub embed_poll_attempts: usize,
    /// 静态提取有结果时是否仍进行交互解析以补全地址
    pub resolve_static_candidates: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            option_selectors: vec![
                "#server ul li .east_player_option".to_string(),
                ".east_player_option".to_string(),
                "#server .east_player_option".to_string(),
                "ul li .east_player_option".to_string(),
            ],
            server_button_selectors: [
                ".mirror_line > a",
                ".mirror_dl > button",
                ".mirrorstream > ul > li > a",
                ".download > ul > li > a",
                "a[data-video]",
                "button[data-video]",
                ".server-item",
                ".quality-option",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            player_container: "#player_embed".to_string(),
            option_wait_attempts: 30,
            poll_interval_ms: 500,
            poll_max_attempts: 10,
            option_settle_ms: 150,
            embed_hosts: vec!["wibufile.com".to_string()],
            embed_dwell_ms: 2000,
            embed_poll_attempts: 3,
            resolve_static_candidates: true,
        }
    }
}

impl ResolverSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn option_settle(&self) -> Duration {
        Duration::from_millis(self.option_settle_ms)
    }

    pub fn embed_dwell(&self) -> Duration {
        Duration::from_millis(self.embed_dwell_ms)
    }
}

/// 缓存配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// 剧集播放源的缓存层级
    pub streams_tier: CacheTier,
    /// 批量下载的缓存层级
    pub downloads_tier: CacheTier,
    /// 覆盖所有层级的有效期（秒）
    pub ttl_override_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            streams_tier: CacheTier::Dynamic,
            downloads_tier: CacheTier::Occasional,
            ttl_override_secs: None,
        }
    }
}

impl CacheSettings {
    /// 计算某个层级实际使用的有效期
    pub fn ttl_for(&self, tier: CacheTier) -> Duration {
        self.ttl_override_secs
            .map(Duration::from_secs)
            .unwrap_or_else(|| tier.ttl())
    }
}

impl Config {
    /// 从环境变量加载（未设置的项使用默认值）
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// 从 TOML 文件加载，再用环境变量覆盖
    pub fn load(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.display().to_string(),
            source: e,
        })?;
        let mut config = Self::from_toml_str(&content, &path.display().to_string())?;
        config.apply_env();
        Ok(config)
    }

    /// 解析 TOML 字符串
    pub fn from_toml_str(content: &str, origin: &str) -> AppResult<Self> {
        let config: Config = toml::from_str(content).map_err(|e| ConfigError::TomlParseFailed {
            path: origin.to_string(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// 用环境变量覆盖部分配置
    pub fn apply_env(&mut self) {
        if let Ok(v) = std::env::var("SITE_BASE_URL") {
            self.site.base_url = v;
        }
        if let Ok(v) = std::env::var("CHROME_EXECUTABLE") {
            self.browser.chrome_executable = Some(PathBuf::from(v));
        }
        if let Some(port) = std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()) {
            self.browser.debug_port = Some(port);
        }
        if let Some(ttl) = std::env::var("CACHE_TTL_SECONDS").ok().and_then(|v| v.parse().ok()) {
            self.cache.ttl_override_secs = Some(ttl);
        }
        if let Some(verbose) = std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()) {
            self.verbose_logging = verbose;
        }
    }

    /// 校验配置
    pub fn validate(&self) -> AppResult<()> {
        url::Url::parse(&self.site.base_url).map_err(|_| ConfigError::InvalidBaseUrl {
            value: self.site.base_url.clone(),
        })?;
        Ok(())
    }

    /// 将站点相对路径拼成完整地址
    ///
    /// 已经是完整地址的直接返回；相对路径补上结尾斜杠
    pub fn build_site_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        let base = self.site.base_url.trim_end_matches('/');
        let clean = path.trim_matches('/');
        if clean.is_empty() {
            format!("{}/", base)
        } else {
            format!("{}/{}/", base, clean)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_tier_ttls() {
        assert_eq!(CacheTier::Dynamic.ttl(), Duration::from_secs(600));
        assert_eq!(CacheTier::Static.ttl(), Duration::from_secs(86_400));
    }

    #[test]
    fn test_ttl_override_wins() {
        let settings = CacheSettings {
            ttl_override_secs: Some(5),
            ..Default::default()
        };
        assert_eq!(settings.ttl_for(CacheTier::Static), Duration::from_secs(5));
    }

    #[test]
    fn test_build_site_url() {
        let config = Config::default();
        assert_eq!(
            config.build_site_url("/show-x-episode-7/"),
            "https://v1.samehadaku.how/show-x-episode-7/"
        );
        assert_eq!(
            config.build_site_url("https://other.example/a"),
            "https://other.example/a"
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            verbose_logging = true

            [site]
            base_url = "https://mirror.example"

            [resolver]
            poll_max_attempts = 4

            [cache]
            streams_tier = "frequent"
        "#;
        let config = Config::from_toml_str(toml, "inline").unwrap();
        assert!(config.verbose_logging);
        assert_eq!(config.site.base_url, "https://mirror.example");
        assert_eq!(config.resolver.poll_max_attempts, 4);
        assert_eq!(config.resolver.poll_interval_ms, 500);
        assert_eq!(config.cache.streams_tier, CacheTier::Frequent);
        assert!(!config.site.block_signatures.is_empty());
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let toml = r#"
            [site]
            base_url = "not a url"
        "#;
        assert!(Config::from_toml_str(toml, "inline").is_err());
    }
}
