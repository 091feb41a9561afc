pub mod batch;
pub mod content;
pub mod download;
pub mod episode;
pub mod quality;
pub mod server;

pub use batch::{AnimeDetail, BatchMetadata, BatchPage};
pub use content::ContentReference;
pub use download::{DownloadGroup, DownloadGroups, DownloadQuality, DownloadServer, VideoType};
pub use episode::{EpisodeMetadata, EpisodeStreams};
pub use quality::QualityTier;
pub use server::{ResolvedServer, ServerCandidate, ServerKey, SourceTag};
