//! 下载区解析
//!
//! 按 (类型, 画质) 分组；画质必须落在词表内，否则丢弃该条

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use crate::models::{DownloadGroup, DownloadGroups, DownloadServer, QualityTier, VideoType};

/// 下载区容器
const CONTAINERS: &str = ".download-eps, #download, #downloadb, .download-section";

/// 域名片段 → 展示名（按顺序匹配，gofile.io 必须在 file.io 之前）
const HOST_NAMES: &[(&str, &str)] = &[
    ("gofile.io", "Gofile"),
    ("krakenfiles.com", "Krakenfile"),
    ("mirrored.to", "Mirrored"),
    ("pixeldrain.com", "Pixeldrain"),
    ("acefile.co", "AceFile"),
    ("bayfiles.com", "BayFiles"),
    ("letsupload.io", "LetsUpload"),
    ("mega.nz", "Mega.nz"),
    ("mega.co", "Mega.nz"),
    ("mediafire.com", "MediaFire"),
    ("zippyshare.com", "ZippyShare"),
    ("drive.google.com", "Google Drive"),
    ("gdrive", "Google Drive"),
    ("file.io", "File.io"),
];

/// 兜底扫描时允许的下载域名
const FALLBACK_HOSTS: &[&str] = &[
    "gofile.io",
    "krakenfiles.com",
    "mirrored.to",
    "pixeldrain.com",
    "acefile.co",
    "bayfiles.com",
    "letsupload.io",
    "mega.nz",
    "mediafire.com",
    "zippyshare.com",
    "drive.google.com",
];

/// 社交 / 导航域名
const EXCLUDED_HOSTS: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "telegram.org",
    "discord.com",
    "youtube.com",
];

const MAX_HEADER_CHARS: usize = 30;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("CSS 选择器无效")
}

static CONTAINER: LazyLock<Selector> = LazyLock::new(|| selector(CONTAINERS));
static BOLD: LazyLock<Selector> = LazyLock::new(|| selector("b, strong"));
static ITEMS: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static QUALITY_LABEL: LazyLock<Selector> =
    LazyLock::new(|| selector("strong, em, b, .quality, .res"));
static ANCHORS: LazyLock<Selector> = LazyLock::new(|| selector("a[href]"));

/// 根据链接地址推断服务器名
pub fn host_name(href: &str) -> Option<&'static str> {
    let lower = href.to_lowercase();
    HOST_NAMES
        .iter()
        .find(|(pattern, _)| lower.contains(pattern))
        .map(|(_, name)| *name)
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_usable_href(href: &str) -> bool {
    let href = href.trim();
    href.len() > 10 && !href.starts_with('#') && !href.to_lowercase().starts_with("javascript:")
}

/// 类型标题：短小的加粗文字
fn header_label(el: ElementRef<'_>) -> Option<String> {
    let tag = el.value().name();
    let is_bold_tag = matches!(tag, "b" | "strong");
    let is_wrapper = matches!(tag, "p" | "h3" | "h4" | "h5" | "span");
    if !(is_bold_tag || (is_wrapper && el.select(&BOLD).next().is_some())) {
        return None;
    }
    let text = text_of(el);
    (!text.is_empty() && text.chars().count() <= MAX_HEADER_CHARS).then_some(text)
}

/// 解析单个列表项
fn parse_item(item: ElementRef<'_>, video_type: VideoType, groups: &mut DownloadGroups) {
    let quality = item
        .select(&QUALITY_LABEL)
        .next()
        .and_then(|label| QualityTier::extract(&text_of(label)))
        .or_else(|| QualityTier::extract(&text_of(item)));
    let Some(quality) = quality else {
        debug!("丢弃无法识别画质的下载项: {}", text_of(item));
        return;
    };

    for anchor in item.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if !is_usable_href(href) {
            continue;
        }
        let text = text_of(anchor);
        let name = match host_name(href) {
            Some(name) => name.to_string(),
            None if !text.is_empty() => text,
            None => "Unknown Server".to_string(),
        };
        groups.push(
            video_type,
            quality,
            DownloadServer {
                name,
                url: href.to_string(),
            },
        );
    }
}

/// 遍历容器的直接子元素，维护当前类型
fn walk(container: ElementRef<'_>, current: &mut VideoType, groups: &mut DownloadGroups) {
    for child in container.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "ul" | "ol" => {
                for item in child.select(&ITEMS) {
                    parse_item(item, *current, groups);
                }
            }
            "div" | "section" => walk(child, current, groups),
            _ => {
                if let Some(label) = header_label(child) {
                    *current = VideoType::from_label(&label).unwrap_or_default();
                    debug!("下载类型: {} ({})", current.as_str(), label);
                }
            }
        }
    }
}

fn has_container_ancestor(el: ElementRef<'_>) -> bool {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| CONTAINER.matches(&ancestor))
}

/// 没有下载区时扫描整页链接
fn fallback(document: &Html, groups: &mut DownloadGroups) {
    for anchor in document.select(&ANCHORS) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if !is_usable_href(href) {
            continue;
        }
        let lower = href.to_lowercase();
        if EXCLUDED_HOSTS.iter().any(|h| lower.contains(h))
            || !FALLBACK_HOSTS.iter().any(|h| lower.contains(h))
        {
            continue;
        }
        let quality = QualityTier::extract(href).unwrap_or(QualityTier::P720);
        let name = host_name(href).unwrap_or("Unknown Server");
        groups.push(
            VideoType::Mkv,
            quality,
            DownloadServer {
                name: name.to_string(),
                url: href.to_string(),
            },
        );
    }
}

/// 解析页面中的下载链接
pub fn extract(html: &str) -> Vec<DownloadGroup> {
    let document = Html::parse_document(html);
    let mut groups = DownloadGroups::new();

    // 嵌套的下载区已由外层容器遍历
    let containers: Vec<ElementRef<'_>> = document
        .select(&CONTAINER)
        .filter(|el| !has_container_ancestor(*el))
        .collect();
    if containers.is_empty() {
        debug!("没有下载区，扫描整页链接");
        fallback(&document, &mut groups);
    } else {
        for container in containers {
            let mut current = VideoType::default();
            walk(container, &mut current, &mut groups);
        }
    }

    groups.into_groups()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_type_headers_do_not_leak() {
        let html = r#"<html><body>
            <div class="download-eps">
                <p><b>MKV</b></p>
                <ul>
                    <li><strong>480p</strong>
                        <span><a href="https://gofile.io/d/mkv480">Gofile</a></span>
                        <span><a href="https://krakenfiles.com/view/mkv480">KF</a></span>
                    </li>
                    <li><strong>720p</strong><span><a href="https://pixeldrain.com/u/mkv720">PD</a></span></li>
                </ul>
                <p><b>MP4</b></p>
                <ul>
                    <li><strong>480p</strong><span><a href="https://gofile.io/d/mp4480">Gofile</a></span></li>
                </ul>
            </div>
        </body></html>"#;

        let groups = extract(html);
        assert_eq!(groups.len(), 2);

        let mkv = &groups[0];
        assert_eq!(mkv.video_type, VideoType::Mkv);
        let mkv480 = mkv.quality(QualityTier::P480).unwrap();
        assert_eq!(mkv480.servers.len(), 2);
        assert_eq!(mkv480.servers[0].name, "Gofile");
        assert_eq!(mkv480.servers[1].name, "Krakenfile");
        assert!(mkv.quality(QualityTier::P720).is_some());

        let mp4 = &groups[1];
        assert_eq!(mp4.video_type, VideoType::Mp4);
        assert_eq!(mp4.qualities.len(), 1);
        assert_eq!(mp4.qualities[0].servers[0].url, "https://gofile.io/d/mp4480");
        assert!(mp4.qualities[0].servers.iter().all(|s| !s.url.contains("mkv")));
    }

    #[test]
    fn test_nested_container_keeps_outer_header() {
        let html = r#"<div id="download">
            <p><b>MP4</b></p>
            <div class="download-eps">
                <ul><li><strong>720p</strong><a href="https://gofile.io/d/mp4-720">Gofile</a></li></ul>
            </div>
        </div>"#;
        let groups = extract(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].video_type, VideoType::Mp4);
        assert_eq!(groups[0].qualities[0].servers.len(), 1);
    }

    #[test]
    fn test_items_without_quality_are_dropped_and_urls_deduped() {
        let html = r##"<div id="download">
            <ul>
                <li><strong>Batch</strong><a href="https://gofile.io/d/zzzzz">Gofile</a></li>
                <li>1080p <a href="https://example.org/file/abc">MyHost</a> <a href="https://example.org/file/abc">dup</a> <a href="#">x</a></li>
            </ul>
        </div>"##;
        let groups = extract(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].video_type, VideoType::Mkv);
        let q = &groups[0].qualities;
        assert_eq!(q.len(), 1);
        assert_eq!(q[0].quality, QualityTier::P1080);
        assert_eq!(q[0].servers.len(), 1);
        assert_eq!(q[0].servers[0].name, "MyHost");
    }

    #[test]
    fn test_unrecognized_header_defaults_to_mkv() {
        let html = r#"<div class="download-eps">
            <p><strong>AVC</strong></p>
            <ul><li><em>720p</em><a href="https://mega.nz/file/xyz">Mega</a></li></ul>
        </div>"#;
        let groups = extract(html);
        assert_eq!(groups[0].video_type, VideoType::Mkv);
        assert_eq!(groups[0].qualities[0].servers[0].name, "Mega.nz");
    }

    #[test]
    fn test_fallback_scans_allowed_hosts_only() {
        let html = r#"<html><body>
            <a href="https://www.facebook.com/share/gofile.io">share</a>
            <a href="https://gofile.io/d/show-1080p">dl</a>
            <a href="https://mediafire.com/file/show.mkv">dl</a>
            <a href="https://random.site/page/123">other</a>
        </body></html>"#;
        let groups = extract(html);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].video_type, VideoType::Mkv);
        let p1080 = groups[0].quality(QualityTier::P1080).unwrap();
        assert_eq!(p1080.servers[0].name, "Gofile");
        let p720 = groups[0].quality(QualityTier::P720).unwrap();
        assert_eq!(p720.servers[0].name, "MediaFire");
    }

    #[test]
    fn test_host_name_order() {
        assert_eq!(host_name("https://gofile.io/d/a"), Some("Gofile"));
        assert_eq!(host_name("https://file.io/a"), Some("File.io"));
        assert_eq!(host_name("https://unknown.example/a"), None);
    }

    #[test]
    fn test_empty_page() {
        assert!(extract("<html><body></body></html>").is_empty());
    }
}
