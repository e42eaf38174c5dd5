//! Capability-gated file queries: SIZE, MDTM, SITE CHMOD, SITE IDLE.
//!
//! Each is optional server-side. The first "not implemented" reply
//! clears the matching capability flag and the command is never sent
//! again for the life of the session.

use chrono::{DateTime, NaiveDateTime, Utc};
use log::info;

use crate::core_ops::{reply_indicates_unsupported, reply_payload};
use crate::core_transfer::TransferType;
use crate::error::FtpcError;
use crate::session::Session;

impl Session {
    /// Remote file size in bytes (SIZE). Requires binary mode, which
    /// is selected on the way if necessary.
    pub async fn filesize(&mut self, path: &str) -> Result<u64, FtpcError> {
        if !self.caps.size {
            return Err(FtpcError::Unsupported("SIZE"));
        }

        let abspath = self.absrpath(Some(path));
        self.xfr_mode(TransferType::Binary).await?;

        let result = self.command(&format!("SIZE {}", abspath)).await;
        if reply_indicates_unsupported(self.code) {
            info!("Host does not implement SIZE, disabling");
            self.caps.size = false;
            return Err(FtpcError::Unsupported("SIZE"));
        }
        result?;

        reply_payload(&self.reply)
            .parse::<u64>()
            .map_err(|_| FtpcError::Protocol(format!("cannot parse SIZE reply: {}", self.reply)))
    }

    /// Remote file modification time (MDTM, `YYYYMMDDhhmmss` UTC).
    pub async fn filetime(&mut self, path: &str) -> Result<DateTime<Utc>, FtpcError> {
        if !self.caps.mdtm {
            return Err(FtpcError::Unsupported("MDTM"));
        }

        let abspath = self.absrpath(Some(path));
        let result = self.command(&format!("MDTM {}", abspath)).await;
        if reply_indicates_unsupported(self.code) {
            info!("Host does not implement MDTM, disabling");
            self.caps.mdtm = false;
            return Err(FtpcError::Unsupported("MDTM"));
        }
        result?;

        let stamp = reply_payload(&self.reply);
        NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
            .map(|naive| naive.and_utc())
            .map_err(|_| FtpcError::Protocol(format!("cannot parse MDTM reply: {}", self.reply)))
    }

    /// SITE CHMOD, where the server allows it.
    pub async fn chmod(&mut self, path: &str, mode: &str) -> Result<(), FtpcError> {
        if !self.caps.chmod {
            return Err(FtpcError::Unsupported("SITE CHMOD"));
        }

        let abspath = self.absrpath(Some(path));
        let result = self.command(&format!("SITE CHMOD {} {}", mode, abspath)).await;
        if reply_indicates_unsupported(self.code) {
            info!("Host does not implement SITE CHMOD, disabling");
            self.caps.chmod = false;
            return Err(FtpcError::Unsupported("SITE CHMOD"));
        }
        result
    }

    /// SITE IDLE: queries or sets the server idle timeout.
    pub async fn idle(&mut self, seconds: Option<u32>) -> Result<&str, FtpcError> {
        if !self.caps.idle {
            return Err(FtpcError::Unsupported("SITE IDLE"));
        }

        let result = match seconds {
            Some(secs) => self.command(&format!("SITE IDLE {}", secs)).await,
            None => self.command("SITE IDLE").await,
        };
        if reply_indicates_unsupported(self.code) {
            info!("Host does not implement SITE IDLE, disabling");
            self.caps.idle = false;
            return Err(FtpcError::Unsupported("SITE IDLE"));
        }
        result?;
        Ok(self.reply_text())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::FtpcError;
    use crate::testutil::{connect, script_server, Step};

    #[tokio::test]
    async fn test_filesize() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("TYPE I", "200 Type set to I"),
            Step::Expect("SIZE /f.bin", "213 4096"),
        ]])
        .await;

        let mut session = connect(addr).await;
        assert_eq!(session.filesize("/f.bin").await.unwrap(), 4096);
        server.await.unwrap();
    }

    /// Scenario: SIZE answered with 502. The capability is downgraded
    /// permanently; the second call sends nothing at all.
    #[tokio::test]
    async fn test_filesize_downgrade_is_permanent() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("TYPE I", "200 Type set to I"),
            Step::Expect("SIZE /nofile.txt", "502 Command not implemented"),
        ]])
        .await;

        let mut session = connect(addr).await;
        let err = session.filesize("/nofile.txt").await.unwrap_err();
        assert!(matches!(err, FtpcError::Unsupported("SIZE")));
        assert!(!session.capabilities().size);

        // Script exhausted: any further SIZE would fail the server task
        let err = session.filesize("/nofile.txt").await.unwrap_err();
        assert!(matches!(err, FtpcError::Unsupported("SIZE")));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_filetime() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("MDTM /f.bin", "213 20110707121618"),
        ]])
        .await;

        let mut session = connect(addr).await;
        let when = session.filetime("/f.bin").await.unwrap();
        assert_eq!(when.to_rfc3339(), "2011-07-07T12:16:18+00:00");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_chmod_downgrade_on_500() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("SITE CHMOD 644 /f", "500 Unknown SITE command"),
        ]])
        .await;

        let mut session = connect(addr).await;
        assert!(session.chmod("/f", "644").await.is_err());
        assert!(!session.capabilities().chmod);
        assert!(matches!(
            session.chmod("/f", "644").await.unwrap_err(),
            FtpcError::Unsupported(_)
        ));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_idle_downgrade_on_202() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("SITE IDLE", "202 Superfluous at this site"),
        ]])
        .await;

        let mut session = connect(addr).await;
        assert!(session.idle(None).await.is_err());
        assert!(!session.capabilities().idle);
        server.await.unwrap();
    }
}
