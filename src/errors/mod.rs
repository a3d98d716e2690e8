use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source Error: {0}")]
    Source(#[from] SourceError),

    #[error("Broker Error: {0}")]
    Broker(#[from] BrokerError),

    #[error("Notification Error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Secret Error: {0}")]
    Secret(#[from] SecretError),

    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
}

/// Fatal input errors from the reading source. Any of these aborts the run;
/// a missing value in a row is not an error and never surfaces here.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Source file not found: {path}")]
    FileNotFound { path: String },

    #[error("Source file is missing required column: {column}")]
    MissingColumn { column: &'static str },

    #[error("Invalid temperature '{value}' in column {column}, row {row}")]
    InvalidTemperature {
        row: usize,
        column: &'static str,
        value: String,
    },

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Failed to connect to broker at {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Failed to open queue {queue}: {message}")]
    Open { queue: String, message: String },

    #[error("Publish to {queue} failed: {message}")]
    Publish { queue: String, message: String },

    #[error("Consume from {queue} failed: {message}")]
    Consume { queue: String, message: String },

    #[error("Ack on {queue} failed for delivery {tag}: {message}")]
    Ack {
        queue: String,
        tag: u64,
        message: String,
    },

    #[error("Operation not supported by this channel: {operation}")]
    Unsupported { operation: &'static str },
}

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Notification transport authentication failed")]
    Auth,

    #[error("Notification transport error: {message}")]
    Transport { message: String },

    #[error("Notifier misconfigured: {0}")]
    Secret(#[from] SecretError),
}

#[derive(Error, Debug)]
pub enum SecretError {
    #[error("Secret not found: {key}")]
    NotFound { key: String },

    #[error("Failed to load secrets from {path}: {message}")]
    Load { path: String, message: String },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
