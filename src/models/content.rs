//! 内容标识

use std::fmt;

/// 内容引用
///
/// `raw_id` 可能是番剧 slug，也可能已经是具体的剧集路径；
/// `resolved_path` 总是别名解析之后的具体页面路径
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentReference {
    pub raw_id: String,
    pub resolved_path: String,
}

impl ContentReference {
    /// 已经是具体路径的引用
    pub fn concrete(raw_id: &str) -> Self {
        let clean = clean_id(raw_id);
        Self {
            raw_id: raw_id.to_string(),
            resolved_path: clean,
        }
    }

    /// 别名解析后的引用
    pub fn resolved(raw_id: &str, resolved_path: impl Into<String>) -> Self {
        Self {
            raw_id: raw_id.to_string(),
            resolved_path: clean_id(&resolved_path.into()),
        }
    }

    /// 批量下载页引用：不带 `batch/` 前缀的标识补上前缀
    pub fn batch(raw_id: &str) -> Self {
        let clean = clean_id(raw_id);
        let is_full_url = clean.starts_with("http://") || clean.starts_with("https://");
        let resolved_path = if is_full_url || clean.starts_with("batch/") {
            clean
        } else {
            format!("batch/{}", clean)
        };
        Self {
            raw_id: raw_id.to_string(),
            resolved_path,
        }
    }

    /// 是否需要把番剧 slug 解析为最新剧集
    pub fn needs_alias_resolution(raw_id: &str) -> bool {
        let clean = clean_id(raw_id).to_lowercase();
        let is_batch = clean.starts_with("batch/") || clean.contains("/batch/");
        !(clean.contains("episode") || clean.contains("-ep-") || is_batch)
    }
}

impl fmt::Display for ContentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.resolved_path)
    }
}

/// 去掉首尾斜杠和空白
pub fn clean_id(raw: &str) -> String {
    raw.trim().trim_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_detection() {
        assert!(ContentReference::needs_alias_resolution("show-x"));
        assert!(ContentReference::needs_alias_resolution("/show-x/"));
        assert!(!ContentReference::needs_alias_resolution("show-x-episode-7"));
        assert!(!ContentReference::needs_alias_resolution("show-x-ep-7/"));
        assert!(!ContentReference::needs_alias_resolution("batch/show-x-batch"));
    }

    #[test]
    fn test_paths_are_cleaned() {
        let r = ContentReference::concrete("/show-x-episode-7/");
        assert_eq!(r.resolved_path, "show-x-episode-7");
        assert_eq!(r.raw_id, "/show-x-episode-7/");
        let r = ContentReference::resolved("show-x", "/show-x-episode-9/");
        assert_eq!(r.to_string(), "show-x-episode-9");
    }

    #[test]
    fn test_batch_paths() {
        assert_eq!(ContentReference::batch("show-x-batch").resolved_path, "batch/show-x-batch");
        assert_eq!(ContentReference::batch("/batch/show-x-batch/").resolved_path, "batch/show-x-batch");
    }
}
