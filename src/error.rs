use thiserror::Error;

pub type FtpcResult<T> = Result<T, FtpcError>;

#[derive(Error, Debug)]
pub enum FtpcError {
    #[error("not connected to an FTP server")]
    NotConnected,

    #[error("not logged in")]
    NotLoggedIn,

    #[error("control channel failure: {0}")]
    Transport(String),

    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("server is closing the control connection (421)")]
    ServiceClosing,

    #[error("server rejected command: {code} {text}")]
    CommandRejected { code: u32, text: String },

    #[error("login failed: {code} {text}")]
    AuthFailed { code: u32, text: String },

    #[error("cannot parse server reply: {0}")]
    Protocol(String),

    #[error("data channel failure: {0}")]
    DataChannel(String),

    #[error("transfer aborted")]
    TransferAborted,

    #[error("server does not support {0}")]
    Unsupported(&'static str),

    #[error("local file error: {0}")]
    Io(#[from] std::io::Error),
}

impl FtpcError {
    /// The server reply code that produced this error, if any.
    pub fn reply_code(&self) -> Option<u32> {
        match self {
            FtpcError::ServiceClosing => Some(421),
            FtpcError::CommandRejected { code, .. } => Some(*code),
            FtpcError::AuthFailed { code, .. } => Some(*code),
            _ => None,
        }
    }
}
