pub mod data_source;
pub mod processor;
pub mod steps;
pub mod types;

pub use data_source::{connector_from_config, FeedConnector, FileSource, WebSocketSource};
pub use processor::FeedConnectionManager;
pub use types::ConnectionState;
