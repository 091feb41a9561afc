//! 番剧 slug → 最新剧集路径

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

static EPISODE_LINKS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"a[href*="-episode-"], a[href*="-ep-"]"#).expect("CSS 选择器无效")
});

static EPISODE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-episode-(\d+)").expect("剧集正则无效"));

static EP_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-ep-(\d+)").expect("剧集正则无效"));

/// 从链接中解析剧集序号
pub fn episode_number(href: &str) -> Option<u32> {
    EPISODE_NUMBER
        .captures(href)
        .or_else(|| EP_NUMBER.captures(href))
        .and_then(|caps| caps[1].parse().ok())
}

/// 找出序号最大的剧集路径（去掉首尾斜杠）
///
/// 优先考虑包含番剧 slug 的链接；一个都没有时考虑全部剧集链接
pub fn latest_episode_path(html: &str, slug: &str, base_url: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(base_url).ok()?;
    let slug = slug.trim().trim_matches('/').to_lowercase();

    let links: Vec<(u32, String)> = document
        .select(&EPISODE_LINKS)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| {
            let number = episode_number(href)?;
            let path = base.join(href.trim()).ok()?.path().trim_matches('/').to_string();
            (!path.is_empty()).then_some((number, path))
        })
        .collect();

    let preferred: Vec<&(u32, String)> = links
        .iter()
        .filter(|(_, path)| !slug.is_empty() && path.to_lowercase().contains(&slug))
        .collect();
    let pool = if preferred.is_empty() {
        links.iter().collect()
    } else {
        preferred
    };

    let mut best: Option<&(u32, String)> = None;
    for link in pool {
        if best.is_none_or(|b| link.0 > b.0) {
            best = Some(link);
        }
    }
    best.map(|(_, path)| path.clone())
}
