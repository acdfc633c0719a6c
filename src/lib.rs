//! Protocol engine and LDS decoder for ICAO 9303 eMRTDs.
//!
//! The crate drives an ISO/IEC 14443 / 7816-4 contactless chip through the
//! ICAO Doc 9303 chip access procedure and decodes the resulting data groups.
//! The physical NFC layer is abstracted behind [`transport::Transport`]; the
//! entry point is [`session::Session::read_document`], which runs
//! PACE → (fallback BAC) → data-group discovery → Chip Authentication →
//! file reads → Active Authentication → Passive Authentication and returns a
//! [`session::DocumentResult`].

pub mod asn1;
pub mod crypto;
mod error;
pub mod handshake;
pub mod iso7816;
pub mod lds;
pub mod passive;
pub mod reader;
pub mod secure_messaging;
pub mod session;
pub mod transport;

pub use self::{
    error::Error,
    lds::{DataGroup, DataGroupId},
    session::{DisplayMessage, DocumentResult, ReadOptions, Session},
    transport::{Transport, TransportError},
};

/// Like `anyhow::ensure!`, but takes an error value instead of a message.
#[macro_export]
macro_rules! ensure_err {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

/// Crate result type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
