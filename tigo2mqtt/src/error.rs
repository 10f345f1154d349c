use thiserror::Error;

/// The appliance could not be read this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("appliance answered with HTTP status {0}")]
    Status(u16),
    #[error("appliance request failed: {0}")]
    Transport(String),
}

/// The status page was read but carried no optimizer rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("optimizer table not found in status page")]
    TableNotFound,
    #[error("optimizer table has no data rows")]
    Empty,
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("mqtt client is not connected")]
    Disconnected,
    #[error("publish to {0} was not acknowledged")]
    NotAcknowledged(String),
    #[error("mqtt client error: {0:?}")]
    Client(#[from] anyhow::Error),
}

/// Reason a cycle ended without publishing anything.
#[derive(Debug, Error)]
pub enum NoData {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
}
