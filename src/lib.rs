pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{toml_config::TomlConfig, OutputFormat};
pub use core::dashboard::{Dashboard, UploadView};
pub use utils::error::{DashboardError, Result};
pub use utils::logger::Logger;
