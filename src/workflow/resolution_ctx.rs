//! 解析上下文
//!
//! 封装"我正在解析哪个页面"这一信息，只用于日志前缀

use std::fmt::Display;

/// 解析类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Episode,
    Batch,
}

/// 解析上下文
#[derive(Debug, Clone)]
pub struct ResolutionCtx {
    pub kind: ResolutionKind,

    /// 别名解析后的页面路径
    pub path: String,
}

impl ResolutionCtx {
    pub fn episode(path: impl Into<String>) -> Self {
        Self {
            kind: ResolutionKind::Episode,
            path: path.into(),
        }
    }

    pub fn batch(path: impl Into<String>) -> Self {
        Self {
            kind: ResolutionKind::Batch,
            path: path.into(),
        }
    }
}

impl Display for ResolutionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self.kind {
            ResolutionKind::Episode => "剧集",
            ResolutionKind::Batch => "合集",
        };
        write!(f, "[{} {}]", label, self.path)
    }
}
