//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层是对外入口，负责缓存和组件装配。
//!
//! ## 模块划分
//!
//! ### `resolver` - 解析入口
//! - 装配浏览器驱动、页面获取器和解析流程
//! - 用 `CacheManager` 包裹两个公开操作
//! - 提供缓存清理
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::StreamResolver (缓存 + 装配)
//!     ↓
//! workflow::EpisodeFlow (单个页面的完整流程)
//!     ↓
//! services (能力层：获取 / 静态扫描 / 交互解析 / 嵌入页 / 下载区)
//!     ↓
//! browser + infrastructure (浏览器驱动、HTTP、缓存、轮询)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services → infrastructure
//! 2. **无业务逻辑**：只做缓存和装配，不做具体解析判断

pub mod resolver;

pub use resolver::StreamResolver;
