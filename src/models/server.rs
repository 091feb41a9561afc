use std::fmt;

use serde::{Deserialize, Serialize};

use super::quality::QualityTier;

/// 去重键：小写、折叠空白后的 `(名称, 画质)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerKey(String);

impl ServerKey {
    pub fn new(name: &str, quality: QualityTier) -> Self {
        Self(format!("{}:{}", normalize_label(name), quality.as_str()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 小写并折叠连续空白
pub fn normalize_label(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 每个词首字母大写
pub fn title_case(value: &str) -> String {
    value
        .split_whitespace()
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// 尚未获得地址的服务器候选
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCandidate {
    pub name: String,
    pub quality: QualityTier,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub raw_label: String,
}

impl ServerCandidate {
    pub fn new(name: impl Into<String>, quality: QualityTier, raw_label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quality,
            raw_label: raw_label.into(),
        }
    }

    pub fn key(&self) -> ServerKey {
        ServerKey::new(&self.name, self.quality)
    }
}

/// 地址来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceTag {
    /// 静态 HTML 扫描（没有地址）
    Static,
    /// 点击播放选项得到
    Interactive,
    /// 经过嵌入页二次解析
    Embed,
}

/// 解析后的服务器
///
/// `url` 为空表示未能解析，调用方应视为不可播放而不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedServer {
    #[serde(flatten)]
    pub candidate: ServerCandidate,
    pub url: String,
    pub source_tag: SourceTag,
    pub is_playable: bool,
}

impl ResolvedServer {
    /// 带地址的结果，空地址自动标记为不可播放
    pub fn new(candidate: ServerCandidate, url: impl Into<String>, source_tag: SourceTag) -> Self {
        let url = url.into();
        let is_playable = !url.is_empty();
        Self {
            candidate,
            url,
            source_tag,
            is_playable,
        }
    }

    /// 未解析的结果
    pub fn unresolved(candidate: ServerCandidate, source_tag: SourceTag) -> Self {
        Self::new(candidate, String::new(), source_tag)
    }

    pub fn name(&self) -> &str {
        &self.candidate.name
    }

    pub fn quality(&self) -> QualityTier {
        self.candidate.quality
    }

    pub fn key(&self) -> ServerKey {
        self.candidate.key()
    }
}

/// 协议相对地址补全为 https，并去掉首尾空白
pub fn normalize_media_url(src: &str) -> String {
    let src = src.trim();
    if let Some(rest) = src.strip_prefix("//") {
        format!("https://{}", rest)
    } else {
        src.to_string()
    }
}
