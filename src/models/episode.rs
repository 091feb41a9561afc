use serde::{Deserialize, Serialize};

use super::download::DownloadGroup;
use super::server::ResolvedServer;

/// 剧集元数据（每一项都可能缺失）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub episode_number: Option<String>,
    pub subtitle_language: Option<String>,
    pub release_time: Option<String>,
}

/// 剧集播放源解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeStreams {
    /// 实际解析的页面路径
    pub resolved_path: String,
    pub metadata: EpisodeMetadata,
    pub servers: Vec<ResolvedServer>,
    pub downloads: Vec<DownloadGroup>,
}

impl EpisodeStreams {
    /// 可直接播放的服务器数量
    pub fn playable_count(&self) -> usize {
        self.servers.iter().filter(|s| s.is_playable).count()
    }
}
