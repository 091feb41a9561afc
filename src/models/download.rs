use serde::{Deserialize, Serialize};

use super::quality::QualityTier;

/// 下载文件的封装格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VideoType {
    #[serde(rename = "MKV")]
    Mkv,
    #[serde(rename = "MP4")]
    Mp4,
    #[serde(rename = "x265")]
    X265,
}

impl VideoType {
    /// 识别类型标题，无法识别时返回 None
    pub fn from_label(label: &str) -> Option<Self> {
        let lower = label.to_lowercase();
        if lower.contains("x265") || lower.contains("hevc") {
            Some(VideoType::X265)
        } else if lower.contains("mp4") {
            Some(VideoType::Mp4)
        } else if lower.contains("mkv") {
            Some(VideoType::Mkv)
        } else {
            None
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VideoType::Mkv => "MKV",
            VideoType::Mp4 => "MP4",
            VideoType::X265 => "x265",
        }
    }
}

impl Default for VideoType {
    fn default() -> Self {
        VideoType::Mkv
    }
}

/// 单个下载服务器
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadServer {
    pub name: String,
    pub url: String,
}

/// 同一画质下的服务器列表
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadQuality {
    pub quality: QualityTier,
    pub servers: Vec<DownloadServer>,
}

/// 按类型分组的下载项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadGroup {
    pub video_type: VideoType,
    pub qualities: Vec<DownloadQuality>,
}

impl DownloadGroup {
    pub fn quality(&self, tier: QualityTier) -> Option<&DownloadQuality> {
        self.qualities.iter().find(|q| q.quality == tier)
    }
}

/// 分组累加器
///
/// 保证：同一 (类型, 画质) 只出现一次；同一画质内地址不重复；空分组不输出
#[derive(Debug, Default)]
pub struct DownloadGroups {
    groups: Vec<DownloadGroup>,
}

impl DownloadGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入一个服务器，返回是否为新地址
    pub fn push(&mut self, video_type: VideoType, quality: QualityTier, server: DownloadServer) -> bool {
        let gi = match self.groups.iter().position(|g| g.video_type == video_type) {
            Some(idx) => idx,
            None => {
                self.groups.push(DownloadGroup {
                    video_type,
                    qualities: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[gi];

        let qi = match group.qualities.iter().position(|q| q.quality == quality) {
            Some(idx) => idx,
            None => {
                group.qualities.push(DownloadQuality {
                    quality,
                    servers: Vec::new(),
                });
                group.qualities.len() - 1
            }
        };
        let entry = &mut group.qualities[qi];

        if entry.servers.iter().any(|s| s.url == server.url) {
            return false;
        }
        entry.servers.push(server);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn into_groups(self) -> Vec<DownloadGroup> {
        self.groups
            .into_iter()
            .map(|mut g| {
                g.qualities.retain(|q| !q.servers.is_empty());
                g
            })
            .filter(|g| !g.qualities.is_empty())
            .collect()
    }
}
