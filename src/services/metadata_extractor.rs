//! 剧集页 / 批量下载页元数据

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::models::{AnimeDetail, BatchMetadata, EpisodeMetadata};

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("CSS 选择器无效")
}

static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("h1.entry-title"));
static DESCRIPTION: LazyLock<Selector> =
    LazyLock::new(|| selector("div.entry-content.entry-content-single"));
static EPISODE_NUMBER: LazyLock<Selector> =
    LazyLock::new(|| selector(r#"span[itemprop="episodeNumber"]"#));
static SUBTITLE: LazyLock<Selector> = LazyLock::new(|| selector("span.epx span.lg"));
static RELEASE_TIME: LazyLock<Selector> = LazyLock::new(|| selector("span.time-post"));

static BATCH_TITLES: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ["h1", ".entry-title", ".post-title", ".batch-title"]
        .into_iter()
        .map(selector)
        .collect()
});
static DETAIL_SPANS: LazyLock<Selector> = LazyLock::new(|| selector(".infox .spe span"));
static BOLD: LazyLock<Selector> = LazyLock::new(|| selector("b"));
static LINKS: LazyLock<Selector> = LazyLock::new(|| selector("a"));

static EPISODE_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)episode\s*(\d+\s*[-–]\s*\d+)").expect("集数正则无效"));
static SINGLE_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)episode\s*(\d+)").expect("集数正则无效"));

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: ElementRef<'_>) -> String {
    collapse(&el.text().collect::<String>())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    let text = element_text(document.select(selector).next()?);
    (!text.is_empty()).then_some(text)
}

/// 解析剧集页元数据，缺失的字段为 None
pub fn extract(html: &str) -> EpisodeMetadata {
    let document = Html::parse_document(html);
    EpisodeMetadata {
        title: first_text(&document, &TITLE),
        description: first_text(&document, &DESCRIPTION),
        episode_number: first_text(&document, &EPISODE_NUMBER),
        subtitle_language: first_text(&document, &SUBTITLE),
        release_time: first_text(&document, &RELEASE_TIME),
    }
}

/// 标题中的集数范围，没有范围时取单集序号
pub fn episode_range(title: &str) -> Option<String> {
    if let Some(caps) = EPISODE_RANGE.captures(title) {
        return Some(caps[1].split_whitespace().collect());
    }
    SINGLE_EPISODE.captures(title).map(|caps| caps[1].to_string())
}

/// 链接文字列表
fn link_texts(span: ElementRef<'_>) -> Vec<String> {
    span.select(&LINKS)
        .map(element_text)
        .filter(|t| !t.is_empty())
        .collect()
}

/// 逗号分隔的列表，有链接时以链接文字为准
fn list_value(span: ElementRef<'_>, value: &str) -> Vec<String> {
    let links = link_texts(span);
    if !links.is_empty() {
        return links;
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

fn joined_value(span: ElementRef<'_>, value: String) -> String {
    let links = link_texts(span);
    if links.is_empty() {
        value
    } else {
        links.join(", ")
    }
}

/// 解析 `.infox .spe span`：加粗部分为字段名，其余文字为值
fn anime_detail(document: &Html) -> AnimeDetail {
    let mut detail = AnimeDetail::default();

    for span in document.select(&DETAIL_SPANS) {
        let Some(bold) = span.select(&BOLD).next() else {
            continue;
        };
        let label = element_text(bold);
        let key = label.to_lowercase().replacen(':', "", 1);
        let value = element_text(span).replacen(&label, "", 1).trim().to_string();

        match key.trim() {
            "japanese" => detail.japanese = Some(value),
            "english" => detail.english = Some(value),
            "status" => detail.status = Some(value),
            "type" => detail.kind = Some(value),
            "source" => detail.source = Some(value),
            "score" => detail.score = Some(value),
            "duration" => detail.duration = Some(value),
            "total episode" => {
                detail.total_episode = value
                    .split(|c: char| !c.is_ascii_digit())
                    .find(|part| !part.is_empty())
                    .and_then(|n| n.parse().ok());
            }
            "season" => detail.season = Some(joined_value(span, value)),
            "studio" => detail.studio = Some(joined_value(span, value)),
            "genre" => detail.genre = list_value(span, &value),
            "producers" => detail.producers = list_value(span, &value),
            "released" => detail.released = Some(value),
            _ => {}
        }
    }

    detail
}

/// 解析批量下载页元数据
pub fn extract_batch(html: &str) -> BatchMetadata {
    let document = Html::parse_document(html);
    let title = BATCH_TITLES
        .iter()
        .find_map(|selector| first_text(&document, selector));
    BatchMetadata {
        episode_range: title.as_deref().and_then(episode_range),
        title,
        anime_detail: anime_detail(&document),
    }
}
