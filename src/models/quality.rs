//! 画质词表
//!
//! 所有提取阶段共用同一套封闭词表和同一个匹配规则

use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use phf::phf_map;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 画质层级
///
/// 声明顺序即排序顺序：`4k > 1080p > 720p > 480p > 360p > hd > sd > auto`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "auto")]
    Auto,
    #[serde(rename = "sd")]
    Sd,
    #[serde(rename = "hd")]
    Hd,
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "4k")]
    FourK,
}

/// 非数字画质词 → 画质层级
static NAMED_TOKENS: phf::Map<&'static str, QualityTier> = phf_map! {
    "4k" => QualityTier::FourK,
    "uhd" => QualityTier::FourK,
    "fullhd" => QualityTier::P1080,
    "fhd" => QualityTier::P1080,
    "hd" => QualityTier::Hd,
    "sd" => QualityTier::Sd,
    "auto" => QualityTier::Auto,
};

/// 画质词匹配规则（作用于单个小写词）
static QUALITY_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(\d{3,4})p|4k|uhd|fullhd|fhd|hd|sd|auto)$").expect("画质正则无效")
});

/// 分词规则（原文上匹配，位置可直接用于切片）
static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[a-z0-9]+").expect("分词正则无效"));

/// 粘连在名字后的分辨率，如 `nakama720p`
static GLUED_RESOLUTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+(\d{3,4}p|4k)$").expect("画质正则无效"));

/// 文本中的一处画质词
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityMatch {
    pub tier: QualityTier,
    /// 画质词在原文中的字节范围
    pub range: Range<usize>,
}

impl QualityTier {
    /// 画质的规范写法
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Auto => "auto",
            QualityTier::Sd => "sd",
            QualityTier::Hd => "hd",
            QualityTier::P360 => "360p",
            QualityTier::P480 => "480p",
            QualityTier::P720 => "720p",
            QualityTier::P1080 => "1080p",
            QualityTier::FourK => "4k",
        }
    }

    /// 是否为明确的分辨率（hd / sd / auto 只是泛称）
    pub fn is_explicit(self) -> bool {
        !matches!(self, QualityTier::Hd | QualityTier::Sd | QualityTier::Auto)
    }

    /// 解析单个词
    ///
    /// 词表之外的分辨率（如 240p）返回 None
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim().to_lowercase();
        let caps = QUALITY_TOKEN.captures(&token)?;
        if let Some(height) = caps.get(1) {
            return match height.as_str() {
                "360" => Some(QualityTier::P360),
                "480" => Some(QualityTier::P480),
                "720" => Some(QualityTier::P720),
                "1080" => Some(QualityTier::P1080),
                "2160" => Some(QualityTier::FourK),
                _ => None,
            };
        }
        NAMED_TOKENS.get(token.as_str()).copied()
    }

    /// 定位文本中的画质词
    ///
    /// 明确分辨率优先于 hd / sd 这类泛称；同类取第一个
    pub fn find(text: &str) -> Option<QualityMatch> {
        let mut generic = None;
        for word in WORD.find_iter(text) {
            let lower = word.as_str().to_ascii_lowercase();
            let found = match Self::from_token(&lower) {
                Some(tier) => Some((tier, word.range())),
                None => GLUED_RESOLUTION.captures(&lower).and_then(|caps| {
                    let m = caps.get(1)?;
                    let tier = Self::from_token(m.as_str())?;
                    Some((tier, word.start() + m.start()..word.start() + m.end()))
                }),
            };
            let Some((tier, range)) = found else {
                continue;
            };
            if tier.is_explicit() {
                return Some(QualityMatch { tier, range });
            }
            generic.get_or_insert(QualityMatch { tier, range });
        }
        generic
    }

    /// 从任意文本中提取画质
    ///
    /// `"720p HD"` → 720p，`"FullHD 1080p"` → 1080p，`"4K Ultra"` → 4k
    pub fn extract(text: &str) -> Option<Self> {
        Self::find(text).map(|m| m.tier)
    }

    /// 按展示顺序排序（高画质在前）
    pub fn sort_desc(tiers: &mut [QualityTier]) {
        tiers.sort_by(|a, b| b.cmp(a));
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
