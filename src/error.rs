use {crate::iso7816::StatusWord, thiserror::Error};

/// Crate-wide error taxonomy.
///
/// Protocol layers surface status words through [`Error::Response`]; the
/// handshake engines convert those into their own kinds (a BAC MAC mismatch
/// becomes [`Error::InvalidMrzKey`]). The session orchestrator recovers from
/// a defined subset and reports the rest once.
#[derive(Debug, Error)]
pub enum Error {
    #[error("NFC is not supported on this device.")]
    NfcNotSupported,

    #[error("Tag not valid.")]
    TagNotValid,

    #[error("More than one tag found.")]
    MoreThanOneTagFound,

    #[error("Connection error.")]
    Connection,

    #[error("User canceled the session.")]
    UserCanceled,

    #[error("Timed out waiting for the tag.")]
    Timeout,

    #[error("MRZ key not valid for this document.")]
    InvalidMrzKey,

    #[error("Error response from chip: {0}")]
    Response(StatusWord),

    #[error("Secure messaging error: {0}")]
    SecureMessaging(&'static str),

    #[error("PACE failed: {0}")]
    Pace(String),

    #[error("Chip Authentication failed.")]
    ChipAuthentication,

    #[error("Passive Authentication failed: {0}")]
    PassiveAuthentication(String),

    #[error("Malformed data: {0}")]
    Parse(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl Error {
    /// The user-facing rendering of this error.
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidMrzKey => "MRZ Key not valid for this document.".into(),
            Self::MoreThanOneTagFound => {
                "More than 1 tags was found. Please present only 1 tag.".into()
            }
            Self::TagNotValid => "Tag not valid.".into(),
            Self::Connection => "Connection error. Please try again.".into(),
            Self::Response(status) => format!(
                "Sorry, there was a problem reading the Document. {} - (0x{:02X}, 0x{:02X}",
                status.as_str(),
                status.sw1(),
                status.sw2()
            ),
            _ => "Sorry, there was a problem reading the Document. Please try again".into(),
        }
    }

    /// True when the failure indicates a corrupted secure-messaging channel
    /// that a fresh BAC run may recover.
    pub fn indicates_broken_channel(&self) -> bool {
        match self {
            Self::SecureMessaging(_) => true,
            Self::Response(status) => {
                matches!(u16::from(*status), 0x6987 | 0x6988 | 0x6E00)
            }
            _ => false,
        }
    }

    /// True when the chip denied access to the requested file.
    pub fn indicates_access_denied(&self) -> bool {
        matches!(
            self,
            Self::Response(status) if matches!(u16::from(*status), 0x6982 | 0x6A82)
        )
    }

    /// True when the chip rejected the read length.
    pub fn indicates_wrong_length(&self) -> bool {
        match self {
            Self::Response(status) => {
                let sw = u16::from(*status);
                sw == 0x6700 || (0x6C00..=0x6CFF).contains(&sw)
            }
            _ => false,
        }
    }
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<crate::transport::TransportError> for Error {
    fn from(err: crate::transport::TransportError) -> Self {
        use crate::transport::TransportError::*;
        match err {
            TagLost => Self::Connection,
            Timeout => Self::Timeout,
            UserCanceled => Self::UserCanceled,
            Transmit(msg) => Self::Unexpected(msg),
        }
    }
}
