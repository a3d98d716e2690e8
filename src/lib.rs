pub mod alert;
pub mod broker;
pub mod cli;
pub mod config;
pub mod detector;
pub mod errors;
pub mod producer;
pub mod reading;
pub mod secrets;
pub mod source;

// Re-exports
pub use alert::{AlertDispatcher, LogNotifier, Notifier, SmsGatewayNotifier};
pub use broker::{Broker, MemoryBroker, MessageChannel, MessageStream};
pub use config::Settings;
pub use detector::{AnomalyPolicy, Detector, DetectorConfig, SlidingWindow};
pub use errors::{PipelineError, PipelineResult};
pub use producer::Router;
pub use reading::{Alert, ChannelId, Reading, SensorRow};
pub use source::ReadingSource;
