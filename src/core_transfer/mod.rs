//! Transfer engine: moves file bytes over an established data
//! channel, in either direction, in ASCII or binary representation.

pub mod abort;
pub mod ascii;
pub mod get;
pub mod put;

use log::debug;
use tokio::net::TcpStream;

use crate::core_network::with_deadline;
use crate::error::FtpcError;
use crate::session::Session;

/// Wire representation for the data channel (RFC 959 TYPE).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferType {
    /// `TYPE A`: lines travel as CRLF on the wire.
    Ascii,
    /// `TYPE I`: raw bytes.
    Binary,
}

/// Local-file disposition for a download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GetMode {
    /// Create or truncate the local file.
    Normal,
    /// Append to the local file from the remote start.
    Append,
    /// Resume: `REST <local size>` then append.
    Resume,
}

/// Remote-file disposition for an upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutMode {
    /// STOR: create or replace the remote file.
    Normal,
    /// APPE: append to the remote file.
    Append,
    /// STOU: let the server pick a unique remote name.
    Unique,
    /// SIZE + REST + STOR: continue a partial upload.
    Resume,
}

impl Session {
    /// Switches the server-side representation if it differs from the
    /// current one. A rejection is ignored, like the classic client:
    /// the server simply keeps its default.
    pub(crate) async fn xfr_mode(&mut self, ty: TransferType) -> Result<(), FtpcError> {
        if self.xfr_type == Some(ty) {
            return Ok(());
        }
        let arg = match ty {
            TransferType::Ascii => 'A',
            TransferType::Binary => 'I',
        };
        match self.command(&format!("TYPE {}", arg)).await {
            Ok(()) | Err(FtpcError::CommandRejected { .. }) => {
                self.xfr_type = Some(ty);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Hands out the connected data stream for the transfer. Passive
    /// mode connected during `xfr_init`; active mode accepts the
    /// server's incoming connection here, after the transfer command
    /// was sent.
    pub(crate) async fn take_data_stream(&mut self) -> Result<TcpStream, FtpcError> {
        if let Some(stream) = self.data.take() {
            return Ok(stream);
        }
        let acceptor = self
            .acceptor
            .take()
            .ok_or_else(|| FtpcError::DataChannel(String::from("no data channel prepared")))?;

        let (stream, peer) = with_deadline("data accept", self.connect_timeout, acceptor.accept())
            .await
            .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
        debug!("Accepted data connection from {}", peer);
        Ok(stream)
    }

    /// Closes the data half after a clean transfer and reads the
    /// final control reply (226 and friends).
    pub(crate) async fn finish_transfer(&mut self, data: TcpStream) -> Result<u64, FtpcError> {
        drop(data);

        let chan = self.cmd.as_mut().ok_or(FtpcError::NotConnected)?;
        let reply = crate::core_reply::read_reply(chan, self.reply_timeout).await?;
        self.code = reply.code;
        self.reply = reply.text;

        if self.interrupted {
            return Err(FtpcError::TransferAborted);
        }
        debug!("Transfer complete, {} bytes", self.size);
        Ok(self.size)
    }
}
