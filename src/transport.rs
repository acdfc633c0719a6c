//! Transport abstraction over the host's contactless channel.
//!
//! The core drives any half-duplex APDU channel honouring this contract; the
//! platform NFC adapter is a wrapper outside this crate. APDU exchanges are
//! strictly sequential: one outstanding command, FIFO order.

use thiserror::Error;

/// Errors a transport may surface. Everything else the chip says arrives as
/// response bytes and is classified by the ISO 7816 layer.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The tag left the field mid-exchange.
    #[error("Tag connection lost.")]
    TagLost,

    /// The transport's per-APDU deadline expired (default 20s).
    #[error("Transceive timed out.")]
    Timeout,

    /// The user aborted the host session.
    #[error("Session canceled by user.")]
    UserCanceled,

    /// Anything else the transmit path reports.
    #[error("Transmit failed: {0}")]
    Transmit(String),
}

/// A connected contactless card channel.
pub trait Transport {
    /// Ensure the channel is up. Idempotent.
    fn connect(&mut self) -> Result<(), TransportError>;

    /// Send one command APDU and block for the full response, status word
    /// included.
    fn transceive(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Tear the session down, optionally with a message for the host UI.
    /// Idempotent: later calls are no-ops.
    fn invalidate(&mut self, message: Option<&str>);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self) -> Result<(), TransportError> {
        (**self).connect()
    }

    fn transceive(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        (**self).transceive(apdu)
    }

    fn invalidate(&mut self, message: Option<&str>) {
        (**self).invalidate(message);
    }
}
