pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod metrics;
pub mod pages;
pub mod refresh;
pub mod runtime;
pub mod schedule;

pub use config::Config;
pub use error::Error;
pub use refresh::RefreshJob;
pub use schedule::PageScheduler;
