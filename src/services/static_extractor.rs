//! 静态服务器扫描
//!
//! 纯函数：只读已经拿到的 HTML，不产生地址

use std::collections::HashSet;
use std::sync::LazyLock;

use phf::phf_map;
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

use crate::models::server::{normalize_label, title_case};
use crate::models::{QualityTier, ResolvedServer, ServerCandidate, SourceTag};

/// 已知服务器名（小写） → 展示名
static KNOWN_SERVERS: phf::Map<&'static str, &'static str> = phf_map! {
    "blogspot" => "Blogspot",
    "premium" => "Premium",
    "pixel" => "Pixel",
    "vidhide" => "Vidhide",
    "kraken" => "Kraken",
    "krakenfiles" => "Krakenfiles",
    "mega" => "Mega",
    "drive" => "Drive",
    "google drive" => "Google Drive",
    "wibufile" => "Wibufile",
    "wibu" => "Wibu",
    "nakama" => "Nakama",
    "pucuk" => "Pucuk",
    "pixeldrain" => "Pixeldrain",
    "acefile" => "Acefile",
    "gofile" => "Gofile",
    "mediafire" => "Mediafire",
    "fembed" => "Fembed",
};

const QUALITY_ALT: &str = r"\d{3,4}p|4k|uhd|fullhd|fhd|hd|sd";

/// 按长度倒序的服务器名，保证长名字优先匹配
fn server_alternation() -> String {
    let mut names: Vec<&str> = KNOWN_SERVERS.keys().copied().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
    names
        .iter()
        .map(|n| regex::escape(n))
        .collect::<Vec<_>>()
        .join("|")
}

/// "服务器名 画质" 紧邻
static ADJACENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\s+({})\b",
        server_alternation(),
        QUALITY_ALT
    ))
    .expect("服务器正则无效")
});

/// 脚本中的 `server: "name"` 写法
static SCRIPT_SERVER_FIELD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"(?i)["']?server["']?\s*[=:]\s*["']({})["']"#,
        server_alternation()
    ))
    .expect("脚本正则无效")
});

/// 脚本中服务器名之后、同一对象内的画质
static SCRIPT_NEAR_QUALITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\b[^}}]*?\b({})\b",
        server_alternation(),
        QUALITY_ALT
    ))
    .expect("脚本正则无效")
});

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("CSS 选择器无效")
}

static BODY: LazyLock<Selector> = LazyLock::new(|| selector("body"));
static DATA_ATTRS: LazyLock<Selector> = LazyLock::new(|| selector("[data-server], [data-quality]"));
static SHORT_LABELS: LazyLock<Selector> = LazyLock::new(|| selector("button, a, span, div"));
static SCRIPTS: LazyLock<Selector> = LazyLock::new(|| selector("script"));

/// 扫描结果累加器，按去重键丢弃重复项
#[derive(Default)]
struct Collector {
    seen: HashSet<String>,
    items: Vec<ServerCandidate>,
}

impl Collector {
    fn push(&mut self, name: &str, quality: QualityTier, raw_label: &str) {
        let candidate = ServerCandidate::new(name, quality, raw_label.trim());
        if self.seen.insert(candidate.key().as_str().to_string()) {
            debug!("静态扫描发现: {} {}", candidate.name, candidate.quality);
            self.items.push(candidate);
        }
    }

    /// 按 "服务器名 画质" 紧邻模式扫描一段文本
    fn scan_adjacent(&mut self, text: &str) {
        for caps in ADJACENT.captures_iter(text) {
            let Some(quality) = QualityTier::from_token(&caps[2]) else {
                continue;
            };
            self.push(display_name(&caps[1]), quality, &caps[0]);
        }
    }
}

fn display_name(matched: &str) -> &'static str {
    let key = normalize_label(matched);
    KNOWN_SERVERS.get(key.as_str()).copied().unwrap_or("Unknown")
}

/// 从 HTML 中扫描 (服务器, 画质) 候选
///
/// 结果按名称、画质（高在前）排序
pub fn extract(html: &str) -> Vec<ServerCandidate> {
    let document = Html::parse_document(html);
    let mut collector = Collector::default();

    // 正文逐行
    if let Some(body) = document.select(&BODY).next() {
        for node in body.text() {
            for line in node.lines() {
                let line = line.trim();
                if !line.is_empty() {
                    collector.scan_adjacent(line);
                }
            }
        }
    }

    // 显式 data 属性
    for el in document.select(&DATA_ATTRS) {
        let attrs = el.value();
        let server = attrs.attr("data-server").map(str::trim).filter(|s| !s.is_empty());
        let quality = attrs
            .attr("data-quality")
            .and_then(QualityTier::extract);
        match (server, quality) {
            (Some(server), Some(quality)) => {
                collector.push(&title_case(server), quality, server);
            }
            _ => {
                let text = el.text().collect::<String>();
                let text = text.trim();
                if !text.is_empty() && text.chars().count() < 50 {
                    collector.scan_adjacent(text);
                }
            }
        }
    }

    // 短按钮 / 链接文字
    for el in document.select(&SHORT_LABELS) {
        let text = el.text().collect::<String>();
        let text = text.trim();
        let len = text.chars().count();
        if len > 2 && len < 40 {
            collector.scan_adjacent(text);
        }
    }

    // 内联脚本
    for el in document.select(&SCRIPTS) {
        let content = el.text().collect::<String>();
        if content.trim().is_empty() {
            continue;
        }
        let mut with_quality = HashSet::new();
        for caps in SCRIPT_NEAR_QUALITY.captures_iter(&content) {
            if let Some(quality) = QualityTier::from_token(&caps[2]) {
                let name = display_name(&caps[1]);
                with_quality.insert(name);
                collector.push(name, quality, &caps[0]);
            }
        }
        for caps in SCRIPT_SERVER_FIELD.captures_iter(&content) {
            let name = display_name(&caps[1]);
            if !with_quality.contains(name) {
                collector.push(name, QualityTier::Hd, &caps[0]);
            }
        }
    }

    let mut items = collector.items;
    items.sort_by(|a, b| {
        normalize_label(&a.name)
            .cmp(&normalize_label(&b.name))
            .then(b.quality.cmp(&a.quality))
    });
    items
}

/// 没有被交互解析覆盖的候选，作为未解析的静态结果
pub fn into_unresolved(candidates: &[ServerCandidate]) -> Vec<ResolvedServer> {
    candidates
        .iter()
        .cloned()
        .map(|c| ResolvedServer::unresolved(c, SourceTag::Static))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(items: &[ServerCandidate]) -> Vec<String> {
        items
            .iter()
            .map(|c| format!("{} {}", c.name, c.quality))
            .collect()
    }

    #[test]
    fn test_body_lines_and_labels() {
        let html = r#"<html><body>
            <div class="server-list">
                <span>Nakama 720p</span>
                <span>Nakama 1080p</span>
                <span>Pucuk 480p</span>
            </div>
            <p>Tonton juga Mega 360p</p>
        </body></html>"#;
        let items = extract(html);
        assert_eq!(
            names(&items),
            vec!["Mega 360p", "Nakama 1080p", "Nakama 720p", "Pucuk 480p"]
        );
        assert!(items.iter().all(|c| !c.raw_label.is_empty()));
    }

    #[test]
    fn test_duplicates_collapse_across_heuristics() {
        let html = r##"<html><body>
            <a href="#">NAKAMA 720p</a>
            <button data-server="nakama" data-quality="720p">Nakama 720p</button>
            <script>var players = [{server: "nakama", label: "720p"}];</script>
        </body></html>"##;
        let items = extract(html);
        assert_eq!(names(&items), vec!["Nakama 720p"]);
    }

    #[test]
    fn test_longer_server_names_win() {
        let items = extract("<html><body><span>Krakenfiles 1080p</span></body></html>");
        assert_eq!(names(&items), vec!["Krakenfiles 1080p"]);
    }

    #[test]
    fn test_script_server_without_quality_defaults_to_hd() {
        let html = r#"<html><body><script>
            window.cfg = { "server": "vidhide" };
        </script></body></html>"#;
        let items = extract(html);
        assert_eq!(names(&items), vec!["Vidhide hd"]);
    }

    #[test]
    fn test_unknown_resolution_is_ignored() {
        let items = extract("<html><body><span>Nakama 240p</span></body></html>");
        assert!(items.is_empty());
    }

    #[test]
    fn test_nothing_found() {
        assert!(extract("<html><body><h1>Episode 7</h1></body></html>").is_empty());
    }

    #[test]
    fn test_into_unresolved() {
        let items = extract("<html><body><span>Nakama 720p</span></body></html>");
        let resolved = into_unresolved(&items);
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].source_tag, SourceTag::Static);
        assert!(!resolved[0].is_playable);
    }
}
