//! File upload (STOR/APPE/STOU) with resume support.

use log::{debug, info, warn};
use regex::Regex;
use std::io::SeekFrom;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::core_network::with_deadline;
use crate::core_transfer::ascii::encode_crlf;
use crate::core_transfer::{PutMode, TransferType};
use crate::error::FtpcError;
use crate::helpers::basename;
use crate::session::Session;

impl Session {
    /// Uploads `lname` to `rname` (default: the local basename in the
    /// remote working directory). Returns the byte count sent.
    ///
    /// `PutMode::Unique` requires STOU support and records the
    /// server-chosen name, available via `unique_remote_name()`.
    /// `PutMode::Resume` asks the server for the remote size, seeks
    /// the local file there and issues `REST`.
    pub async fn put_file(
        &mut self,
        lname: &str,
        rname: Option<&str>,
        mode: PutMode,
        ty: TransferType,
    ) -> Result<u64, FtpcError> {
        if !self.is_connected() {
            return Err(FtpcError::NotConnected);
        }
        if mode == PutMode::Unique && !self.caps.stou {
            warn!("Host does not support STOU");
            return Err(FtpcError::Unsupported("STOU"));
        }

        let abslpath = self.abslpath(Some(lname));
        let absrpath = self.absrpath(Some(rname.unwrap_or_else(|| basename(lname))));

        let mut file = File::open(&abslpath).await?;

        self.xfr_reset();
        self.xfr_mode(ty).await?;

        // Resume needs the remote size before the data channel is set
        // up, since SIZE is itself a control-channel exchange.
        if mode == PutMode::Resume {
            let remote_size = self.filesize(&absrpath).await?;
            file.seek(SeekFrom::Start(remote_size)).await?;
            self.offset = remote_size;
        }

        self.xfr_init().await?;

        if self.offset > 0 {
            debug!("Resuming upload of {} at offset {}", absrpath, self.offset);
            self.command(&format!("REST {}", self.offset)).await?;
            self.size = self.offset;
        }

        let cmdline = match mode {
            PutMode::Normal | PutMode::Resume => format!("STOR {}", absrpath),
            PutMode::Append => format!("APPE {}", absrpath),
            PutMode::Unique => format!("STOU {}", absrpath),
        };
        if let Err(e) = self.command(&cmdline).await {
            self.data = None;
            self.acceptor = None;
            return Err(e);
        }

        if mode == PutMode::Unique {
            self.unique_rname = parse_unique_name(&self.reply);
            debug!("Server-selected unique name: {:?}", self.unique_rname);
        }

        let mut data = self.take_data_stream().await?;
        let result = match ty {
            TransferType::Binary => self.send_binary(&mut data, &mut file).await,
            TransferType::Ascii => self.send_ascii(&mut data, &mut file).await,
        };

        match result {
            Ok(()) => {
                data.shutdown().await.ok();
                let total = self.finish_transfer(data).await?;
                info!("Uploaded {} ({} bytes)", abslpath, total);
                Ok(total)
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", abslpath, e);
                self.xfr_abort(&mut data).await;
                Err(e)
            }
        }
    }

    async fn send_binary(&mut self, data: &mut TcpStream, file: &mut File) -> Result<(), FtpcError> {
        let mut buffer = vec![0u8; self.xfer_buffer_size()];
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                return Ok(());
            }
            with_deadline("data write", self.reply_timeout, data.write_all(&buffer[..n]))
                .await
                .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
            self.size += n as u64;
        }
    }

    async fn send_ascii(&mut self, data: &mut TcpStream, file: &mut File) -> Result<(), FtpcError> {
        let mut buffer = vec![0u8; self.xfer_buffer_size()];
        let mut encoded = Vec::with_capacity(buffer.len() * 2);
        loop {
            let n = file.read(&mut buffer).await?;
            if n == 0 {
                return Ok(());
            }
            encoded.clear();
            encode_crlf(&buffer[..n], &mut encoded);
            with_deadline("data write", self.reply_timeout, data.write_all(&encoded))
                .await
                .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
            self.size += encoded.len() as u64;
        }
    }
}

/// Pulls the server-suggested file name out of a STOU reply. Servers
/// phrase it as `150 FILE: name` or end the line with the name.
fn parse_unique_name(reply: &str) -> Option<String> {
    let re = Regex::new(r"FILE: *(\S+)").unwrap();
    if let Some(caps) = re.captures(reply) {
        return Some(caps[1].to_string());
    }
    reply
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().last())
        .map(|s| s.trim_matches('"').to_string())
}

#[cfg(test)]
mod tests {
    use super::parse_unique_name;
    use crate::core_transfer::{GetMode, PutMode, TransferType};
    use crate::error::FtpcError;
    use crate::testutil::{connect, pasv_script_server, DataAction, Step};

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("rouilleftpc-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_parse_unique_name() {
        assert_eq!(
            parse_unique_name("150 FILE: upload.000017").as_deref(),
            Some("upload.000017")
        );
        assert_eq!(
            parse_unique_name("150 Opening data connection for upload.1").as_deref(),
            Some("upload.1")
        );
    }

    #[tokio::test]
    async fn test_put_binary() {
        let payload = b"some file content\x00\x01".to_vec();
        let local = temp_path("put-binary");
        std::fs::write(&local, &payload).unwrap();

        let (addr, server) = pasv_script_server(
            vec![
                Step::Send("220 Ready"),
                Step::Expect("TYPE I", "200 Type set to I"),
                Step::Pasv,
                Step::ExpectData(
                    "STOR /up.bin",
                    "150 Ok to send data",
                    DataAction::ReadExpect(payload.clone()),
                    "226 Transfer complete",
                ),
            ],
        )
        .await;

        let mut session = connect(addr).await;
        let n = session
            .put_file(
                local.to_str().unwrap(),
                Some("/up.bin"),
                PutMode::Normal,
                TransferType::Binary,
            )
            .await
            .unwrap();
        assert_eq!(n, payload.len() as u64);
        std::fs::remove_file(&local).ok();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_put_ascii_inserts_cr() {
        let local = temp_path("put-ascii");
        std::fs::write(&local, b"one\ntwo\n").unwrap();

        let (addr, server) = pasv_script_server(
            vec![
                Step::Send("220 Ready"),
                Step::Expect("TYPE A", "200 Type set to A"),
                Step::Pasv,
                Step::ExpectData(
                    "STOR /up.txt",
                    "150 Ok",
                    DataAction::ReadExpect(b"one\r\ntwo\r\n".to_vec()),
                    "226 Done",
                ),
            ],
        )
        .await;

        let mut session = connect(addr).await;
        session
            .put_file(
                local.to_str().unwrap(),
                Some("/up.txt"),
                PutMode::Normal,
                TransferType::Ascii,
            )
            .await
            .unwrap();
        std::fs::remove_file(&local).ok();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_put_unique_records_server_name() {
        let local = temp_path("put-unique");
        std::fs::write(&local, b"x").unwrap();

        let (addr, server) = pasv_script_server(
            vec![
                Step::Send("220 Ready"),
                Step::Expect("TYPE I", "200 Type set to I"),
                Step::Pasv,
                Step::ExpectData(
                    "STOU ",
                    "150 FILE: unique.000003",
                    DataAction::ReadExpect(b"x".to_vec()),
                    "226 Done",
                ),
            ],
        )
        .await;

        let mut session = connect(addr).await;
        session
            .put_file(
                local.to_str().unwrap(),
                None,
                PutMode::Unique,
                TransferType::Binary,
            )
            .await
            .unwrap();
        assert_eq!(session.unique_remote_name(), Some("unique.000003"));
        std::fs::remove_file(&local).ok();
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_put_unique_without_capability_sends_nothing() {
        let (addr, server) = pasv_script_server(vec![Step::Send("220 Ready")]).await;
        let local = temp_path("put-nocap");
        std::fs::write(&local, b"x").unwrap();

        let mut session = connect(addr).await;
        session.caps.stou = false;
        let err = session
            .put_file(
                local.to_str().unwrap(),
                None,
                PutMode::Unique,
                TransferType::Binary,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FtpcError::Unsupported("STOU")));
        std::fs::remove_file(&local).ok();
        drop(session);
        server.await.unwrap();
    }

    /// Binary upload then download round-trips byte-identical content.
    #[tokio::test]
    async fn test_binary_round_trip() {
        let payload: Vec<u8> = (0u32..4096).map(|i| (i % 251) as u8).collect();
        let up = temp_path("rt-up");
        let down = temp_path("rt-down");
        std::fs::write(&up, &payload).unwrap();

        let (addr, server) = pasv_script_server(
            vec![
                Step::Send("220 Ready"),
                Step::Expect("TYPE I", "200 Type set to I"),
                Step::Pasv,
                Step::ExpectData(
                    "STOR /rt.bin",
                    "150 Ok",
                    DataAction::ReadExpect(payload.clone()),
                    "226 Done",
                ),
                Step::Pasv,
                Step::ExpectData(
                    "RETR /rt.bin",
                    "150 Ok",
                    DataAction::Write(payload.clone()),
                    "226 Done",
                ),
            ],
        )
        .await;

        let mut session = connect(addr).await;
        session
            .put_file(
                up.to_str().unwrap(),
                Some("/rt.bin"),
                PutMode::Normal,
                TransferType::Binary,
            )
            .await
            .unwrap();
        session
            .get_file(
                "/rt.bin",
                Some(down.to_str().unwrap()),
                GetMode::Normal,
                TransferType::Binary,
            )
            .await
            .unwrap();

        assert_eq!(std::fs::read(&down).unwrap(), payload);
        std::fs::remove_file(&up).ok();
        std::fs::remove_file(&down).ok();
        server.await.unwrap();
    }
}
