//! Mid-transfer cancellation (the ABOR handshake).

use log::{debug, info, warn};
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::constants::{DRAIN_BUFFER_SIZE, TELNET_DM, TELNET_IAC, TELNET_IP};
use crate::core_reply::read_reply;
use crate::session::Session;

impl Session {
    /// Aborts the transfer in progress.
    ///
    /// If the control channel already has unread data pending, the
    /// server finished on its own; the data stream is just drained.
    /// Otherwise the Telnet Interrupt-Process and Data-Mark sequence
    /// is sent out, followed by `ABOR`, the data stream is drained,
    /// and up to two replies are read: {226, 426} then {226, 225}.
    /// Deviations are logged but do not fail the abort itself. The
    /// enclosing transfer always reports failure to its caller.
    pub(crate) async fn xfr_abort(&mut self, data: &mut TcpStream) {
        let Some(chan) = self.cmd.as_mut() else {
            return;
        };

        if chan.has_pending_input().await {
            // The final reply is already queued: nothing to abort
            debug!("Control data pending, draining data stream only");
            drain(data, self.reply_timeout).await;
            return;
        }

        self.interrupted = true;

        info!("Sending Telnet ABOR sequence");
        let seq = [TELNET_IAC, TELNET_IP, TELNET_IAC, TELNET_DM];
        if chan.send_raw(&seq).await.is_err() || chan.send_line("ABOR").await.is_err() {
            warn!("Failed to send abort sequence");
            return;
        }

        drain(data, self.reply_timeout).await;

        // First reply: "426 transfer aborted" or "226 closing"
        match read_reply(chan, self.reply_timeout).await {
            Ok(reply) => {
                self.code = reply.code;
                self.reply = reply.text;
                if reply.code != 226 && reply.code != 426 {
                    info!("Expected 226 or 426 after ABOR, got {}", reply.code);
                    return;
                }
            }
            Err(e) => {
                warn!("No reply to ABOR: {}", e);
                return;
            }
        }

        // Second reply: "226 closing" or "225 no transfer in progress"
        match read_reply(chan, self.reply_timeout).await {
            Ok(reply) => {
                self.code = reply.code;
                self.reply = reply.text;
                if reply.code != 226 && reply.code != 225 {
                    info!("Expected 225 or 226 after ABOR, got {}", reply.code);
                }
            }
            Err(e) => warn!("No second reply to ABOR: {}", e),
        }
    }
}

/// Reads and discards whatever remains on the dying data stream.
async fn drain(data: &mut TcpStream, dur: std::time::Duration) {
    let mut sink = [0u8; DRAIN_BUFFER_SIZE];
    loop {
        match timeout(dur, data.read(&mut sink)).await {
            Ok(Ok(n)) if n > 0 => continue,
            _ => break,
        }
    }
}
