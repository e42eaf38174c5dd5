use crate::error::FtpcError;
use log::trace;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Runs a socket future under a deadline, mapping both expiry and I/O
/// failure into the library error. This is the single timeout
/// mechanism for every blocking step: the blocked call simply returns
/// an error when the deadline passes.
pub async fn with_deadline<T, F>(what: &'static str, dur: Duration, fut: F) -> Result<T, FtpcError>
where
    F: Future<Output = std::io::Result<T>>,
{
    match timeout(dur, fut).await {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(FtpcError::Transport(format!("{}: {}", what, e))),
        Err(_) => Err(FtpcError::Timeout(what)),
    }
}

/// Buffered control-channel socket. Reads go through a `BufReader` so
/// the reply parser can consume the stream byte by byte; writes go
/// straight to the write half.
pub struct ControlChannel {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    local: SocketAddr,
    peer: SocketAddr,
}

impl ControlChannel {
    pub async fn connect(addr: SocketAddr, dur: Duration) -> Result<Self, FtpcError> {
        let stream = with_deadline("control connect", dur, TcpStream::connect(addr)).await?;
        stream.set_nodelay(true).ok();
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self, FtpcError> {
        let local = stream
            .local_addr()
            .map_err(|e| FtpcError::Transport(format!("control local_addr: {}", e)))?;
        let peer = stream
            .peer_addr()
            .map_err(|e| FtpcError::Transport(format!("control peer_addr: {}", e)))?;
        let (rd, wr) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(rd),
            writer: wr,
            local,
            peer,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Sends one command line, appending CRLF, and flushes.
    pub async fn send_line(&mut self, line: &str) -> std::io::Result<()> {
        trace!(">>> {}", line);
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await?;
        self.writer.flush().await
    }

    /// Sends raw bytes (Telnet sequences) and flushes.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await
    }

    /// Reads the next byte of the reply stream under a deadline.
    pub async fn read_byte(&mut self, dur: Duration) -> Result<u8, FtpcError> {
        with_deadline("control reply", dur, self.reader.read_u8()).await
    }

    /// Non-blocking check for unread bytes already queued on the
    /// control channel. Used by the abort protocol to detect that the
    /// server already finished the transfer on its own.
    pub async fn has_pending_input(&mut self) -> bool {
        if !self.reader.buffer().is_empty() {
            return true;
        }
        matches!(
            timeout(Duration::ZERO, self.reader.fill_buf()).await,
            Ok(Ok(buf)) if !buf.is_empty()
        )
    }
}
