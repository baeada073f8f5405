pub mod api;
pub mod bridge;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;

pub use bridge::ConfigEntries;
pub use bridge::HomecenterIntegration;
pub use config::Config;
pub use config::LogLevel;
pub use engine::HostState;
pub use engine::StateStore;
