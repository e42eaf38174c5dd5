//! An async FTP client: control-channel session management, passive
//! and active data connections, ASCII/binary transfers with resume,
//! and the usual remote file and directory operations.

pub mod config;
pub mod constants;
pub mod core_command;
pub mod core_network;
pub mod core_ops;
pub mod core_reply;
pub mod core_transfer;
pub mod error;
pub mod helpers;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{ClientConfig, Config};
pub use core_command::RetryPolicy;
pub use core_reply::Reply;
pub use core_transfer::{GetMode, PutMode, TransferType};
pub use error::{FtpcError, FtpcResult};
pub use session::{Capabilities, Session};
