pub mod chromium;
pub mod connection;
pub mod headless;
pub mod navigation;
pub mod traits;

pub use chromium::ChromiumDriver;
pub use headless::BrowserSession;
pub use traits::{
    BrowserDriver, EmbedSession, EmbedSnapshot, PlayerOption, PlayerSession, RenderedPage,
};
