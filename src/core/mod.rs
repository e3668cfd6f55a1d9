pub mod config;

pub use config::{EditorConfig, GatewayConfig, SessionConfig};
