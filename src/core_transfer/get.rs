//! File download (RETR) with resume support.

use log::{debug, info, warn};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::core_network::with_deadline;
use crate::core_transfer::ascii::CrlfDecoder;
use crate::core_transfer::{GetMode, TransferType};
use crate::error::FtpcError;
use crate::helpers::basename;
use crate::session::Session;

impl Session {
    /// Downloads `rname` into `lname` (default: the remote basename in
    /// the local working directory). Returns the byte count written.
    ///
    /// `GetMode::Resume` measures the partial local file, issues
    /// `REST <size>` and appends from that offset.
    pub async fn get_file(
        &mut self,
        rname: &str,
        lname: Option<&str>,
        mode: GetMode,
        ty: TransferType,
    ) -> Result<u64, FtpcError> {
        if !self.is_connected() {
            return Err(FtpcError::NotConnected);
        }

        let absrpath = self.absrpath(Some(rname));
        let abslpath = self.abslpath(Some(lname.unwrap_or_else(|| basename(rname))));

        let mut file = match mode {
            GetMode::Normal => File::create(&abslpath).await?,
            GetMode::Append | GetMode::Resume => {
                OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&abslpath)
                    .await?
            }
        };

        self.xfr_reset();
        if mode == GetMode::Resume {
            self.offset = file.metadata().await?.len();
        }

        self.xfr_mode(ty).await?;
        self.xfr_init().await?;

        if self.offset > 0 {
            debug!("Resuming download of {} at offset {}", absrpath, self.offset);
            self.command(&format!("REST {}", self.offset)).await?;
            self.size = self.offset;
        }

        if let Err(e) = self.command(&format!("RETR {}", absrpath)).await {
            self.data = None;
            self.acceptor = None;
            return Err(e);
        }

        let mut data = self.take_data_stream().await?;
        let result = match ty {
            TransferType::Binary => self.recv_binary(&mut data, &mut file).await,
            TransferType::Ascii => self.recv_ascii(&mut data, &mut file).await,
        };

        match result {
            Ok(()) => {
                file.flush().await?;
                let total = self.finish_transfer(data).await?;
                info!("Downloaded {} ({} bytes)", absrpath, total);
                Ok(total)
            }
            Err(e) => {
                warn!("Download of {} failed: {}", absrpath, e);
                self.xfr_abort(&mut data).await;
                Err(e)
            }
        }
    }

    async fn recv_binary(&mut self, data: &mut TcpStream, file: &mut File) -> Result<(), FtpcError> {
        let mut buffer = vec![0u8; self.xfer_buffer_size()];
        loop {
            let n = with_deadline("data read", self.reply_timeout, data.read(&mut buffer))
                .await
                .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
            if n == 0 {
                return Ok(());
            }
            file.write_all(&buffer[..n]).await?;
            self.size += n as u64;
        }
    }

    async fn recv_ascii(&mut self, data: &mut TcpStream, file: &mut File) -> Result<(), FtpcError> {
        let mut buffer = vec![0u8; self.xfer_buffer_size()];
        let mut decoded = Vec::with_capacity(buffer.len());
        let mut decoder = CrlfDecoder::new();
        loop {
            let n = with_deadline("data read", self.reply_timeout, data.read(&mut buffer))
                .await
                .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
            if n == 0 {
                decoded.clear();
                decoder.finish(&mut decoded);
                if !decoded.is_empty() {
                    file.write_all(&decoded).await?;
                    self.size += decoded.len() as u64;
                }
                return Ok(());
            }
            decoded.clear();
            decoder.push(&buffer[..n], &mut decoded);
            file.write_all(&decoded).await?;
            self.size += decoded.len() as u64;
        }
    }
}
