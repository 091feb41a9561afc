//! 浏览器能力接口
//!
//! 解析流程只依赖这里的 trait，不直接接触 chromiumoxide，
//! 测试可以用内存实现替换真实浏览器

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppResult;

/// 渲染后的页面
#[derive(Debug, Clone, Default)]
pub struct RenderedPage {
    pub html: String,
    /// 最后一次检查时仍命中拦截特征
    pub blocked: bool,
}

/// 页面上的一个播放选项
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerOption {
    /// 枚举时使用的选择器
    pub selector: String,
    /// 在该选择器结果中的位置
    pub index: usize,
    pub style: String,
    pub class_name: String,
    /// `data-*` 属性（去掉 `data-` 前缀）
    pub dataset: HashMap<String, String>,
    pub text: String,
}

impl PlayerOption {
    /// 是否被页面标记为不可用
    pub fn is_disabled(&self) -> bool {
        let style = self.style.to_lowercase().replace(' ', "");
        let class_name = self.class_name.to_lowercase();
        style.contains("pointer-events:none")
            || style.contains("opacity:0.3")
            || class_name.contains("disabled")
            || class_name.contains("inactive")
    }

    pub fn data(&self, key: &str) -> Option<&str> {
        self.dataset
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// 嵌入页快照
#[derive(Debug, Clone, Default)]
pub struct EmbedSnapshot {
    /// `<video>` / `<source>` 的地址
    pub video_sources: Vec<String>,
    /// 内联脚本文本
    pub scripts: Vec<String>,
    /// 所有链接地址
    pub anchors: Vec<String>,
}

/// 播放页会话
///
/// 同一会话内的操作必须串行执行：页面 UI 状态是共享的
#[async_trait]
pub trait PlayerSession: Send + Sync {
    /// 用指定选择器枚举播放选项
    async fn player_options(&self, selector: &str) -> AppResult<Vec<PlayerOption>>;

    /// 点击选项
    async fn click_option(&self, option: &PlayerOption) -> AppResult<()>;

    /// 播放器容器当前的媒体地址（没有时为空串）
    async fn media_source(&self) -> AppResult<String>;

    /// 释放页面资源
    async fn close(self: Box<Self>);
}

/// 嵌入页会话
#[async_trait]
pub trait EmbedSession: Send + Sync {
    async fn snapshot(&self) -> AppResult<EmbedSnapshot>;

    async fn close(self: Box<Self>);
}

/// 浏览器驱动
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// 完整渲染页面（含挑战页等待与拦截复查）
    async fn render(&self, url: &str) -> AppResult<RenderedPage>;

    /// 打开播放页，等待播放选项出现
    async fn open_player(&self, url: &str) -> AppResult<Box<dyn PlayerSession>>;

    /// 打开嵌入页
    async fn open_embed(&self, url: &str) -> AppResult<Box<dyn EmbedSession>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(style: &str, class_name: &str) -> PlayerOption {
        PlayerOption {
            style: style.to_string(),
            class_name: class_name.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_disabled_detection() {
        assert!(option("pointer-events: none;", "").is_disabled());
        assert!(option("opacity:0.3", "").is_disabled());
        assert!(option("", "east_player_option disabled").is_disabled());
        assert!(option("", "Inactive").is_disabled());
        assert!(!option("opacity: 1", "east_player_option").is_disabled());
    }

    #[test]
    fn test_data_ignores_blank_values() {
        let mut opt = PlayerOption::default();
        opt.dataset.insert("quality".into(), "  ".into());
        opt.dataset.insert("server".into(), " Nakama ".into());
        assert_eq!(opt.data("quality"), None);
        assert_eq!(opt.data("server"), Some("Nakama"));
    }
}
