pub mod config;

pub use config::{CaptureSettings, ToolConfig};
