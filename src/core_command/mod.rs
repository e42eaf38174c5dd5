//! Command dispatcher: one synchronous request/reply cycle on the
//! control channel, plus the bounded 421 reconnect-and-resend policy.

use log::{debug, trace, warn};

use crate::core_reply::read_reply;
use crate::error::FtpcError;
use crate::session::Session;

/// How many times a 421 "service not available" may transparently
/// reconnect, re-login and resend the command. Kept as an explicit
/// value so the bound is visible and testable.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_reconnects: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_reconnects: 1 }
    }
}

impl Session {
    /// Sends one command line and reads the complete reply.
    ///
    /// `self.code` and the reply text always reflect the outcome.
    /// A 5xx reply is failure; every other code is success, and the
    /// caller inspects `reply_code()` for command-specific handling.
    ///
    /// On 421, if the session was logged in and the command is not
    /// QUIT, the session reconnects, re-logs-in, restores the working
    /// directory and resends the command, at most
    /// `RetryPolicy::max_reconnects` times. A 421 past that bound is
    /// fatal.
    pub async fn command(&mut self, line: &str) -> Result<(), FtpcError> {
        let mut reconnects_left = self.retry.max_reconnects;

        loop {
            let chan = self.cmd.as_mut().ok_or(FtpcError::NotConnected)?;

            if let Err(e) = chan.send_line(line).await {
                self.code = 0;
                self.reset();
                return Err(FtpcError::Transport(format!("control write: {}", e)));
            }

            let reply = match read_reply(chan, self.reply_timeout).await {
                Ok(r) => r,
                Err(e) => {
                    self.reset();
                    return Err(e);
                }
            };

            self.code = reply.code;
            self.reply = reply.text;
            trace!("{} -> {}", verb_of(line), self.code);

            if reply.code == 421 {
                if reconnects_left > 0 && self.logged_in && !is_quit(line) {
                    reconnects_left -= 1;
                    warn!("Server closing control connection (421), reconnecting");
                    // Boxed: reconnect re-enters command() via login
                    Box::pin(self.reconnect()).await?;
                    continue;
                }
                self.reset();
                return Err(FtpcError::ServiceClosing);
            }

            if (500..=599).contains(&reply.code) {
                return Err(FtpcError::CommandRejected {
                    code: self.code,
                    text: self.reply.clone(),
                });
            }

            return Ok(());
        }
    }

    /// Tears down the control channel, reconnects, re-authenticates
    /// and restores the previous remote working directory, which
    /// becomes the new initial directory.
    async fn reconnect(&mut self) -> Result<(), FtpcError> {
        let (user, pass) = self
            .credentials
            .clone()
            .ok_or(FtpcError::NotLoggedIn)?;
        let prev_dir = self.curr_rdir.clone();

        self.reset();
        self.open_control().await?;
        self.login(&user, &pass).await?;

        if prev_dir != self.curr_rdir {
            self.command(&format!("CWD {}", prev_dir)).await?;
            self.curr_rdir = prev_dir.clone();
        }
        self.initial_rdir = prev_dir;
        debug!("Reconnected and restored directory {}", self.curr_rdir);
        Ok(())
    }
}

fn verb_of(line: &str) -> &str {
    line.split_whitespace().next().unwrap_or(line)
}

fn is_quit(line: &str) -> bool {
    verb_of(line).eq_ignore_ascii_case("QUIT")
}
