pub mod api_server;
pub mod cli;
pub mod commands;
pub mod config;
pub mod content_type;
pub mod errors;
pub mod telemetry;

pub use api_server::{spawn_api_server, ApiServerHandle, RpcTransportProvider, TransportProvider};
pub use config::ApiConfig;
pub use errors::DataApiError;
