pub mod download_extractor;
pub mod embed_resolver;
pub mod episode_locator;
pub mod interactive_resolver;
pub mod metadata_extractor;
pub mod page_acquirer;
pub mod static_extractor;

pub use embed_resolver::EmbedResolver;
pub use interactive_resolver::InteractiveResolver;
pub use page_acquirer::{
    AcquireMethod, AcquireStrategy, AcquiredPage, BlockDetector, BrowserRenderStrategy,
    LightFetchStrategy, PageAcquirer,
};
