//! Directory listing retrieval over the data channel. The listing is
//! returned as the raw server text; no parsing or formatting beyond
//! line-ending normalization.

use log::warn;
use tokio::io::AsyncReadExt;

use crate::core_network::with_deadline;
use crate::core_transfer::ascii::CrlfDecoder;
use crate::core_transfer::TransferType;
use crate::error::FtpcError;
use crate::session::Session;

impl Session {
    /// Retrieves a directory listing: LIST when `details`, NLST for
    /// bare names. `path` defaults to the remote working directory.
    pub async fn list_directory(
        &mut self,
        path: Option<&str>,
        details: bool,
    ) -> Result<String, FtpcError> {
        if !self.is_connected() {
            return Err(FtpcError::NotConnected);
        }

        let abspath = self.absrpath(path);
        let verb = if details { "LIST" } else { "NLST" };

        self.xfr_reset();
        self.xfr_mode(TransferType::Ascii).await?;
        self.xfr_init().await?;

        if let Err(e) = self.command(&format!("{} {}", verb, abspath)).await {
            self.data = None;
            self.acceptor = None;
            return Err(e);
        }

        let mut data = self.take_data_stream().await?;
        let mut raw = Vec::new();
        let mut buffer = vec![0u8; self.xfer_buffer_size()];
        let result = loop {
            match with_deadline("data read", self.reply_timeout, data.read(&mut buffer)).await {
                Ok(0) => break Ok(()),
                Ok(n) => raw.extend_from_slice(&buffer[..n]),
                Err(e) => break Err(FtpcError::DataChannel(e.to_string())),
            }
        };

        if let Err(e) = result {
            warn!("Listing of {} failed: {}", abspath, e);
            self.xfr_abort(&mut data).await;
            return Err(e);
        }

        self.size = raw.len() as u64;
        self.finish_transfer(data).await?;

        let mut decoded = Vec::with_capacity(raw.len());
        let mut decoder = CrlfDecoder::new();
        decoder.push(&raw, &mut decoded);
        decoder.finish(&mut decoded);
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}
