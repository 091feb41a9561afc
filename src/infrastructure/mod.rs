pub mod cache;
pub mod http_client;
pub mod js_executor;
pub mod poll;

pub use cache::{CacheEntry, CacheManager};
pub use http_client::HttpClient;
pub use js_executor::JsExecutor;
pub use poll::poll_until;
