use thiserror::Error;

/// Errors raised by a media engine while answering a query or a command.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine process, library or connection is not reachable.
    #[error("engine unavailable: {0}")]
    Unavailable(String),

    /// The engine answered, but with malformed or partial data.
    #[error("engine query failed: {0}")]
    QueryFailed(String),

    /// The engine rejected or failed a playback command.
    #[error("engine command failed: {0}")]
    Command(String),

    #[error("{0} is not supported by this engine")]
    Unsupported(&'static str),
}

/// Errors from handing a payload to the broadcast transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    SendFailed(#[from] std::io::Error),

    #[error("datagram truncated: sent {sent} of {expected} bytes")]
    Truncated { sent: usize, expected: usize },
}

/// Top-level error for startup and command-line paths.
#[derive(Debug, Error)]
pub enum StatuscastError {
    #[error("config error: {0}")]
    Config(String),

    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("wire format error: {0}")]
    Wire(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
