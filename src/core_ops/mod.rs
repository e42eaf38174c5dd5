//! Operations exposed to the shell layer: login, directory
//! management, file queries and listing retrieval. Each is a thin
//! composition of control-channel commands with command-specific
//! reply interpretation.

pub mod dirops;
pub mod listing;
pub mod login;
pub mod queries;

/// Replies that mean "this command is not implemented here": 500
/// (syntax error / unrecognized), 502 (not implemented) and 202
/// (superfluous). These downgrade the matching capability flag for
/// the rest of the session.
pub(crate) fn reply_indicates_unsupported(code: u32) -> bool {
    matches!(code, 500 | 502 | 202)
}

/// The text of the first reply line after the `NNN ` prefix. The
/// reply is server-controlled and may be garbage, so the split must
/// tolerate a multibyte character straddling the offset.
pub(crate) fn reply_payload(reply: &str) -> &str {
    let line = reply.lines().next().unwrap_or("");
    line.get(4..).unwrap_or("").trim()
}
