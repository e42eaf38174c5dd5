//! Remote directory and name management.

use log::debug;
use regex::Regex;

use crate::core_ops::reply_payload;
use crate::error::FtpcError;
use crate::session::Session;

impl Session {
    /// CWD, then refresh the cached working directory with PWD.
    pub async fn chdir(&mut self, path: &str) -> Result<(), FtpcError> {
        let abspath = self.absrpath(Some(path));
        self.command(&format!("CWD {}", abspath)).await?;
        self.curr_rdir = self.pwd().await.unwrap_or(abspath);
        Ok(())
    }

    /// CDUP, then refresh the cached working directory.
    pub async fn cdup(&mut self) -> Result<(), FtpcError> {
        self.command("CDUP").await?;
        if let Ok(dir) = self.pwd().await {
            self.curr_rdir = dir;
        }
        Ok(())
    }

    /// The server's working directory from a 257 PWD reply.
    pub async fn pwd(&mut self) -> Result<String, FtpcError> {
        self.command("PWD").await?;
        parse_quoted_path(&self.reply)
            .ok_or_else(|| FtpcError::Protocol(format!("cannot parse PWD reply: {}", self.reply)))
    }

    pub async fn mkdir(&mut self, path: &str) -> Result<(), FtpcError> {
        let abspath = self.absrpath(Some(path));
        self.command(&format!("MKD {}", abspath)).await?;
        debug!("Created remote directory {}", abspath);
        Ok(())
    }

    pub async fn rmdir(&mut self, path: &str) -> Result<(), FtpcError> {
        let abspath = self.absrpath(Some(path));
        self.command(&format!("RMD {}", abspath)).await
    }

    /// RNFR/RNTO pair. RNFR answers 350 when the source exists.
    pub async fn rename(&mut self, from: &str, to: &str) -> Result<(), FtpcError> {
        let absfrom = self.absrpath(Some(from));
        let absto = self.absrpath(Some(to));

        self.command(&format!("RNFR {}", absfrom)).await?;
        if self.code != 350 {
            return Err(FtpcError::CommandRejected {
                code: self.code,
                text: self.reply.clone(),
            });
        }
        self.command(&format!("RNTO {}", absto)).await
    }

    /// DELE a remote file.
    pub async fn unlink(&mut self, path: &str) -> Result<(), FtpcError> {
        let abspath = self.absrpath(Some(path));
        self.command(&format!("DELE {}", abspath)).await
    }
}

/// Extracts the quoted path of a 257 reply, un-doubling embedded
/// quotes per RFC 959.
fn parse_quoted_path(reply: &str) -> Option<String> {
    let re = Regex::new(r#""((?:[^"]|"")*)""#).unwrap();
    let payload = reply_payload(reply);
    let caps = re.captures(payload)?;
    Some(caps[1].replace("\"\"", "\""))
}
