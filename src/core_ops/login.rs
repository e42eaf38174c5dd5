//! Login sequence, session teardown and raw command passthrough.

use log::{debug, info, warn};

use crate::error::FtpcError;
use crate::session::Session;

impl Session {
    /// Authenticates with USER/PASS and learns the remote home
    /// directory. Reply codes: 230 logged in, 331 password needed,
    /// 332 account needed (unsupported), 530 refused.
    pub async fn login(&mut self, user: &str, pass: &str) -> Result<(), FtpcError> {
        if !self.is_connected() {
            return Err(FtpcError::NotConnected);
        }

        match self.command(&format!("USER {}", user)).await {
            Ok(()) => {}
            Err(FtpcError::CommandRejected { code, text }) => {
                return Err(FtpcError::AuthFailed { code, text });
            }
            Err(e) => return Err(e),
        }

        match self.code {
            230 => {}
            331 => match self.command(&format!("PASS {}", pass)).await {
                // 332 after PASS wants an account; ACCT is not supported
                Ok(()) if self.code != 332 => {}
                Ok(()) => {
                    return Err(FtpcError::AuthFailed {
                        code: self.code,
                        text: self.reply.clone(),
                    });
                }
                Err(FtpcError::CommandRejected { code, text }) => {
                    return Err(FtpcError::AuthFailed { code, text });
                }
                Err(e) => return Err(e),
            },
            code => {
                return Err(FtpcError::AuthFailed {
                    code,
                    text: self.reply.clone(),
                });
            }
        }

        self.logged_in = true;
        self.credentials = Some((user.to_string(), pass.to_string()));
        info!("Logged in as {}", user);

        // The login directory anchors remote path resolution
        match self.pwd().await {
            Ok(dir) => {
                self.home_rdir = dir.clone();
                self.initial_rdir = dir.clone();
                self.curr_rdir = dir;
            }
            Err(e) => {
                warn!("PWD after login failed: {}", e);
            }
        }
        Ok(())
    }

    /// Convenience anonymous login using the configured identity.
    pub async fn login_anonymous(&mut self) -> Result<(), FtpcError> {
        let user = self.config.anonymous_user.clone();
        let pass = self.config.anonymous_password.clone();
        self.login(&user, &pass).await
    }

    /// Sends QUIT and closes every channel. The session object stays
    /// usable only for inspecting the final reply.
    pub async fn quit(&mut self) -> Result<(), FtpcError> {
        if self.is_connected() {
            if let Err(e) = self.command("QUIT").await {
                debug!("QUIT failed: {}", e);
            }
        }
        self.reset();
        Ok(())
    }

    /// NOOP keep-alive.
    pub async fn noop(&mut self) -> Result<(), FtpcError> {
        self.command("NOOP").await
    }

    /// Remote HELP text, optionally for one command.
    pub async fn remote_help(&mut self, topic: Option<&str>) -> Result<&str, FtpcError> {
        match topic {
            Some(t) => self.command(&format!("HELP {}", t)).await?,
            None => self.command("HELP").await?,
        }
        Ok(self.reply_text())
    }

    /// Sends an arbitrary command line and returns the reply text.
    pub async fn raw_command(&mut self, line: &str) -> Result<&str, FtpcError> {
        self.command(line).await?;
        Ok(self.reply_text())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::FtpcError;
    use crate::testutil::{connect, script_server, Step};

    /// Scenario: fresh connection. Banner consumed, capabilities all
    /// optimistic, connected predicate true.
    #[tokio::test]
    async fn test_connect_reads_banner_and_assumes_capabilities() {
        let (addr, server) = script_server(vec![vec![Step::Send("220 Ready")]]).await;
        let session = connect(addr).await;

        assert!(session.is_connected());
        assert_eq!(session.reply_code(), 220);
        let caps = session.capabilities();
        assert!(caps.mdtm && caps.size && caps.pasv && caps.stou && caps.chmod && caps.idle);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_connect_waits_out_delayed_ready() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("120 Service ready in a moment"),
            Step::Send("220 Ready now"),
        ]])
        .await;
        let session = connect(addr).await;
        assert_eq!(session.reply_code(), 220);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_user_pass() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("USER alice", "331 Password required"),
            Step::Expect("PASS secret", "230 User logged in"),
            Step::Expect("PWD", "257 \"/home/alice\" is the current directory"),
        ]])
        .await;

        let mut session = connect(addr).await;
        session.login("alice", "secret").await.unwrap();
        assert!(session.is_logged_in());
        assert_eq!(session.current_remote_dir(), "/home/alice");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_login_refused() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("USER alice", "331 Password required"),
            Step::Expect("PASS wrong", "530 Login incorrect"),
        ]])
        .await;

        let mut session = connect(addr).await;
        let err = session.login("alice", "wrong").await.unwrap_err();
        assert!(matches!(err, FtpcError::AuthFailed { code: 530, .. }));
        assert!(!session.is_logged_in());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let (addr, server) = script_server(vec![vec![
            Step::Send("220 Ready"),
            Step::Expect("QUIT", "221 Goodbye"),
        ]])
        .await;

        let mut session = connect(addr).await;
        session.quit().await.unwrap();
        assert!(!session.is_connected());
        server.await.unwrap();
    }
}
