//! 批量下载页

use serde::{Deserialize, Serialize};

use super::download::DownloadGroup;

/// 番剧资料（`.infox .spe` 中的字段）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimeDetail {
    pub japanese: Option<String>,
    pub english: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub source: Option<String>,
    pub score: Option<String>,
    pub duration: Option<String>,
    pub total_episode: Option<u32>,
    pub season: Option<String>,
    pub studio: Option<String>,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub producers: Vec<String>,
    pub released: Option<String>,
}

/// 批量下载页元数据
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchMetadata {
    pub title: Option<String>,
    /// 标题中的集数范围，如 `1-12`
    pub episode_range: Option<String>,
    pub anime_detail: AnimeDetail,
}

/// 批量下载页解析结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPage {
    pub resolved_path: String,
    pub metadata: BatchMetadata,
    pub downloads: Vec<DownloadGroup>,
}
