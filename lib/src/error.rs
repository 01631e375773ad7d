// Copyright (c) 2022-2023 The MobileCoin Foundation

use satochip_apdu::{ApduError, StatusWord};
use tokio::time::error::Elapsed;

/// Satochip card API Error Type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No card connected
    #[error("No card connected")]
    NotConnected,

    /// Transport error
    #[error("Transport error: {0}")]
    Transport(String),

    /// APDU encoding / decoding error
    #[error("APDU error: {0}")]
    Apdu(ApduError),

    /// Card rejected the request
    #[error("Card returned {0} ({0:?})")]
    Status(StatusWord),

    /// Keyslot outside of the supported range
    #[error("Invalid keyslot {0} (max: {})", satochip_apdu::Keyslot::MAX)]
    InvalidKeyslot(u8),

    /// Unexpected APDU response
    #[error("Unexpected APDU response")]
    InvalidResponse,

    /// Request timeout
    #[error("Timeout waiting for card response")]
    RequestTimeout,
}

impl From<ApduError> for Error {
    fn from(e: ApduError) -> Self {
        match e {
            ApduError::InvalidKeyslot(n) => Error::InvalidKeyslot(n),
            _ => Error::Apdu(e),
        }
    }
}

impl From<StatusWord> for Error {
    fn from(sw: StatusWord) -> Self {
        Error::Status(sw)
    }
}

impl From<Elapsed> for Error {
    fn from(_: Elapsed) -> Self {
        Error::RequestTimeout
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Transport(format!("IO: {e}"))
    }
}
