pub mod episode_flow;
pub mod resolution_ctx;

pub use episode_flow::EpisodeFlow;
pub use resolution_ctx::{ResolutionCtx, ResolutionKind};
