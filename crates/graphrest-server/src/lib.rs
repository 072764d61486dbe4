pub mod config;
pub mod observability;
pub mod server;
pub mod upstream;

pub use config::{AppConfig, LoggingConfig, OpenApiSettings, ServerConfig, UpstreamConfig};
pub use observability::{apply_logging_level, init_tracing};
pub use server::{GraphrestServer, ServerBuilder, build_app};
pub use upstream::{UpstreamExecutor, load_schema};
