//! Control-channel reply parser (RFC 959 §4.2).
//!
//! Produces the next complete server reply: single lines, multi-line
//! continuations terminated by `<code><space>`, and embedded Telnet
//! negotiation, which is refused inline while parsing.

use crate::constants::{
    REPLY_LINE_MAX, TELNET_DO, TELNET_DONT, TELNET_IAC, TELNET_WILL, TELNET_WONT,
};
use crate::core_network::ControlChannel;
use crate::error::FtpcError;
use log::{trace, warn};
use std::time::Duration;

/// A parsed server reply: the 3-digit status code and the full text,
/// continuation lines included, joined with `\n`. Transient: each
/// command overwrites the session's copy.
#[derive(Debug, Clone)]
pub struct Reply {
    pub code: u32,
    pub text: String,
}

/// Reads one complete reply from the control channel.
///
/// A line whose 4th character is `-` opens a multi-line reply; lines
/// are then consumed until one starts with the same 3-digit code
/// followed by a space. A non-numeric prefix parses as code 0.
pub async fn read_reply(chan: &mut ControlChannel, dur: Duration) -> Result<Reply, FtpcError> {
    let first = read_line(chan, dur).await?;
    let code = parse_code(&first);
    let mut lines = vec![first.clone()];

    if code != 0 && is_continuation(&first) {
        let terminator = format!("{:03} ", code);
        loop {
            let next = read_line(chan, dur).await?;
            let done = next.starts_with(&terminator);
            lines.push(next);
            if done {
                break;
            }
        }
    }

    let reply = Reply {
        code,
        text: lines.join("\n"),
    };
    trace!("<<< {}", lines.last().map(String::as_str).unwrap_or(""));
    Ok(reply)
}

fn is_continuation(line: &str) -> bool {
    line.len() >= 4 && line.as_bytes()[3] == b'-'
}

/// Parses the leading 3-digit status code, or 0 if the prefix is not
/// numeric.
pub fn parse_code(line: &str) -> u32 {
    let bytes = line.as_bytes();
    if bytes.len() >= 3 && bytes[..3].iter().all(u8::is_ascii_digit) {
        (bytes[0] - b'0') as u32 * 100 + (bytes[1] - b'0') as u32 * 10 + (bytes[2] - b'0') as u32
    } else {
        0
    }
}

/// Reads a single reply line, terminated by CR NL or a bare NL.
///
/// Telnet IAC negotiation sequences embedded in the stream are
/// consumed and answered with a refusal on the same channel. Lines
/// longer than [`REPLY_LINE_MAX`] are truncated with a warning.
async fn read_line(chan: &mut ControlChannel, dur: Duration) -> Result<String, FtpcError> {
    let mut line: Vec<u8> = Vec::with_capacity(80);
    let mut truncated = false;
    let mut pending: Option<u8> = None;

    loop {
        let b = match pending.take() {
            Some(b) => b,
            None => chan.read_byte(dur).await?,
        };

        match b {
            TELNET_IAC => {
                let cmd = chan.read_byte(dur).await?;
                match cmd {
                    TELNET_WILL | TELNET_WONT | TELNET_DO | TELNET_DONT => {
                        let opt = chan.read_byte(dur).await?;
                        let refusal = if cmd == TELNET_WILL || cmd == TELNET_WONT {
                            TELNET_DONT
                        } else {
                            TELNET_WONT
                        };
                        chan.send_raw(&[TELNET_IAC, refusal, opt])
                            .await
                            .map_err(|e| {
                                FtpcError::Transport(format!("telnet refusal: {}", e))
                            })?;
                    }
                    // Escaped 0xff data byte
                    TELNET_IAC => push(&mut line, TELNET_IAC, &mut truncated),
                    // Other Telnet commands carry no option byte; drop them
                    _ => {}
                }
            }
            b'\n' => break,
            b'\r' => {
                let next = chan.read_byte(dur).await?;
                if next == b'\n' {
                    break;
                }
                // Lone CR inside the line: keep it, reprocess the byte
                push(&mut line, b'\r', &mut truncated);
                pending = Some(next);
            }
            _ => push(&mut line, b, &mut truncated),
        }
    }

    if truncated {
        warn!("reply line exceeded {} bytes, truncated", REPLY_LINE_MAX);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

fn push(line: &mut Vec<u8>, b: u8, truncated: &mut bool) {
    if line.len() < REPLY_LINE_MAX {
        line.push(b);
    } else {
        *truncated = true;
    }
}
