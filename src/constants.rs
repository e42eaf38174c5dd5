// src/constants.rs

/// Default FTP control port.
pub const DEFAULT_FTP_PORT: u16 = 21;

/// Maximum length of a single control-channel reply line. Longer lines
/// are truncated with a warning, matching the classic client behavior.
pub const REPLY_LINE_MAX: usize = 512;

/// Chunk size for data-channel copies.
pub const XFER_BUFFER_SIZE: usize = 8 * 1024;

/// Chunk size used when draining a dying data stream during ABOR.
pub const DRAIN_BUFFER_SIZE: usize = 512;

// Telnet protocol bytes that may appear on the control channel
// (RFC 854). The server may try to negotiate options; we refuse.
pub const TELNET_IAC: u8 = 255;
pub const TELNET_DONT: u8 = 254;
pub const TELNET_DO: u8 = 253;
pub const TELNET_WONT: u8 = 252;
pub const TELNET_WILL: u8 = 251;
/// Interrupt Process, sent as part of the transfer abort sequence.
pub const TELNET_IP: u8 = 244;
/// Data Mark, the Telnet synch signal.
pub const TELNET_DM: u8 = 242;
