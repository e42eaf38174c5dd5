use std::net::SocketAddr;
use std::time::Duration;

use log::{debug, info};
use tokio::net::{lookup_host, TcpListener, TcpStream};

use crate::config::ClientConfig;
use crate::core_command::RetryPolicy;
use crate::core_network::ControlChannel;
use crate::core_reply::read_reply;
use crate::core_transfer::TransferType;
use crate::error::FtpcError;

/// Optional server features, assumed present until the server answers
/// a probe with "not implemented". A cleared flag stays cleared for
/// the life of the session.
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    pub mdtm: bool,
    pub size: bool,
    pub pasv: bool,
    pub stou: bool,
    pub chmod: bool,
    pub idle: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            mdtm: true,
            size: true,
            pasv: true,
            stou: true,
            chmod: true,
            idle: true,
        }
    }
}

/// One FTP connection. Owns the control channel exclusively and, for
/// the duration of a single transfer, the data channel and (in active
/// mode) the listening acceptor. All operations take `&mut self`, so
/// one session has at most one operation in flight.
pub struct Session {
    pub(crate) config: ClientConfig,
    pub(crate) server: SocketAddr,
    pub(crate) cmd: Option<ControlChannel>,
    pub(crate) data: Option<TcpStream>,
    pub(crate) acceptor: Option<TcpListener>,
    pub(crate) credentials: Option<(String, String)>,
    pub(crate) logged_in: bool,

    // Remote and local directory context for path resolution
    pub(crate) home_rdir: String,
    pub(crate) initial_rdir: String,
    pub(crate) curr_rdir: String,
    pub(crate) home_ldir: String,
    pub(crate) curr_ldir: String,

    pub(crate) caps: Capabilities,
    pub(crate) xfr_type: Option<TransferType>,
    pub(crate) interrupted: bool,

    /// Code of the most recently completed command's reply.
    pub(crate) code: u32,
    /// Full text of the most recent reply, continuation lines included.
    pub(crate) reply: String,
    /// Resume offset for the transfer in progress.
    pub(crate) offset: u64,
    /// Cumulative bytes moved by the transfer in progress.
    pub(crate) size: u64,
    /// Server-chosen name from the last STOU upload.
    pub(crate) unique_rname: Option<String>,

    pub(crate) connect_timeout: Duration,
    pub(crate) reply_timeout: Duration,
    pub(crate) retry: RetryPolicy,
}

impl Session {
    /// Resolves `host`, opens the control channel and reads the
    /// welcome banner. A 120 "service ready in a while" banner is
    /// waited out for the real 220.
    pub async fn connect(host: &str, config: ClientConfig) -> Result<Self, FtpcError> {
        let mut addrs = lookup_host((host, config.port))
            .await
            .map_err(|e| FtpcError::Transport(format!("resolve {}: {}", host, e)))?;
        let server = addrs
            .next()
            .ok_or_else(|| FtpcError::Transport(format!("no address found for {}", host)))?;

        let home_ldir = std::env::var("HOME").unwrap_or_else(|_| String::from("/"));
        let curr_ldir = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| home_ldir.clone());

        let mut session = Self {
            connect_timeout: Duration::from_secs(config.connect_timeout_secs),
            reply_timeout: Duration::from_secs(config.reply_timeout_secs),
            retry: RetryPolicy {
                max_reconnects: config.max_reconnects,
            },
            config,
            server,
            cmd: None,
            data: None,
            acceptor: None,
            credentials: None,
            logged_in: false,
            home_rdir: String::from("/"),
            initial_rdir: String::from("/"),
            curr_rdir: String::from("/"),
            home_ldir,
            curr_ldir,
            caps: Capabilities::default(),
            xfr_type: None,
            interrupted: false,
            code: 0,
            reply: String::new(),
            offset: 0,
            size: 0,
            unique_rname: None,
        };

        session.open_control().await?;
        info!("Connected to {}", server);
        Ok(session)
    }

    /// (Re)opens the control channel and consumes the banner.
    pub(crate) async fn open_control(&mut self) -> Result<(), FtpcError> {
        let mut chan = ControlChannel::connect(self.server, self.connect_timeout).await?;

        let mut reply = read_reply(&mut chan, self.reply_timeout).await?;
        if reply.code == 120 {
            debug!("Server not ready yet, waiting for 220");
            reply = read_reply(&mut chan, self.reply_timeout).await?;
        }

        self.code = reply.code;
        self.reply = reply.text;
        if reply.code != 220 {
            return Err(FtpcError::Protocol(format!(
                "unexpected welcome reply: {}",
                self.reply
            )));
        }

        self.cmd = Some(chan);
        Ok(())
    }

    /// Drops every channel and clears the transfer state. Called on
    /// transport failure and on quit.
    pub(crate) fn reset(&mut self) {
        self.cmd = None;
        self.data = None;
        self.acceptor = None;
        self.logged_in = false;
        self.xfr_reset();
    }

    /// Resets the per-transfer variables.
    pub(crate) fn xfr_reset(&mut self) {
        self.size = 0;
        self.offset = 0;
        self.interrupted = false;
    }

    pub fn is_connected(&self) -> bool {
        self.cmd.is_some()
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    /// Status code of the most recently completed command.
    pub fn reply_code(&self) -> u32 {
        self.code
    }

    /// Full text of the most recent server reply.
    pub fn reply_text(&self) -> &str {
        &self.reply
    }

    /// Bytes moved by the last (or current) transfer.
    pub fn transferred_bytes(&self) -> u64 {
        self.size
    }

    /// The remote name the server picked for the last STOU upload.
    pub fn unique_remote_name(&self) -> Option<&str> {
        self.unique_rname.as_deref()
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn current_remote_dir(&self) -> &str {
        &self.curr_rdir
    }

    pub fn server_addr(&self) -> SocketAddr {
        self.server
    }

    /// Resolves a remote path against the remote home/current dirs.
    pub(crate) fn absrpath(&self, relpath: Option<&str>) -> String {
        crate::helpers::abspath(relpath, &self.home_rdir, &self.curr_rdir)
    }

    /// Resolves a local path against the local home/current dirs.
    pub(crate) fn abslpath(&self, relpath: Option<&str>) -> String {
        crate::helpers::abspath(relpath, &self.home_ldir, &self.curr_ldir)
    }

    pub(crate) fn xfer_buffer_size(&self) -> usize {
        self.config
            .xfer_buffer_size
            .unwrap_or(crate::constants::XFER_BUFFER_SIZE)
    }
}
