pub mod auth;
pub mod bloom;
pub mod config;
pub mod debounce;
pub mod engine;
pub mod error;
pub mod events;
pub mod gpu;
pub mod params;
pub mod processing;
pub mod scene;
pub mod tasks {
    pub mod watch;
}

pub use engine::BloomEngine;
pub use error::{Error, Result};
