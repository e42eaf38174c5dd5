//! Data-channel establishment for transfers (RFC 959 + RFC 2428).
//!
//! Passive: EPSV (or PASV), then connect out to the announced port.
//! Active: bind a local acceptor on the interface facing the server,
//! then announce it with EPRT (or PORT) so the server connects back.

use log::{debug, error};
use regex::Regex;
use std::net::{IpAddr, SocketAddr};
use tokio::net::{TcpListener, TcpStream};

use crate::core_network::with_deadline;
use crate::error::FtpcError;
use crate::session::Session;

impl Session {
    /// Common transfer setup: establishes the data channel (passive)
    /// or the acceptor (active) for the RETR/STOR/LIST that follows.
    /// Any failure tears both down; the caller must not proceed.
    pub(crate) async fn xfr_init(&mut self) -> Result<(), FtpcError> {
        if !self.is_connected() {
            error!("Cannot initiate a transfer: not connected");
            return Err(FtpcError::NotConnected);
        }

        // A previous transfer must have released its channel already
        self.data = None;
        self.acceptor = None;

        let result = if self.config.passive {
            self.init_passive().await
        } else {
            self.init_active().await
        };

        if result.is_err() {
            self.data = None;
            self.acceptor = None;
        }
        result
    }

    async fn init_passive(&mut self) -> Result<(), FtpcError> {
        if !self.caps.pasv {
            error!("Host does not support passive mode");
            return Err(FtpcError::Unsupported("PASV"));
        }

        // EPSV replies with just a port on the server's own address;
        // PASV replies with a full address/port tuple.
        let addr = if self.config.extended {
            self.command("EPSV").await?;
            let port = parse_epsv_reply(&self.reply)?;
            SocketAddr::new(self.server.ip(), port)
        } else {
            self.command("PASV").await?;
            parse_pasv_reply(&self.reply)?
        };

        debug!("Connecting data channel to {}", addr);
        let stream = with_deadline("data connect", self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|e| FtpcError::DataChannel(e.to_string()))?;
        self.data = Some(stream);
        Ok(())
    }

    async fn init_active(&mut self) -> Result<(), FtpcError> {
        // Bind on the local address already facing the server, so the
        // announced address is reachable from its side.
        let local_ip = self
            .cmd
            .as_ref()
            .ok_or(FtpcError::NotConnected)?
            .local_addr()
            .ip();

        let listener = TcpListener::bind((local_ip, 0))
            .await
            .map_err(|e| FtpcError::DataChannel(format!("acceptor bind: {}", e)))?;
        let local = listener
            .local_addr()
            .map_err(|e| FtpcError::DataChannel(format!("acceptor local_addr: {}", e)))?;
        debug!("Listening for server data connection on {}", local);

        let line = if self.config.extended {
            let proto = match local.ip() {
                IpAddr::V4(_) => 1,
                IpAddr::V6(_) => 2,
            };
            format!("EPRT |{}|{}|{}|", proto, local.ip(), local.port())
        } else {
            let v4 = match local.ip() {
                IpAddr::V4(v4) => v4,
                IpAddr::V6(_) => {
                    return Err(FtpcError::DataChannel(String::from(
                        "PORT requires an IPv4 local address",
                    )))
                }
            };
            let o = v4.octets();
            format!(
                "PORT {},{},{},{},{},{}",
                o[0],
                o[1],
                o[2],
                o[3],
                local.port() >> 8,
                local.port() & 0xff
            )
        };

        self.acceptor = Some(listener);
        self.command(&line).await?;
        Ok(())
    }
}

/// Parses `(|||port|)` out of a 229 EPSV reply.
pub(crate) fn parse_epsv_reply(text: &str) -> Result<u16, FtpcError> {
    let re = Regex::new(r"\|\|\|(\d+)\|").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpcError::Protocol(format!("cannot parse EPSV reply: {}", text)))?;
    caps[1]
        .parse::<u16>()
        .map_err(|_| FtpcError::Protocol(format!("EPSV port out of range: {}", text)))
}

/// Parses `(h1,h2,h3,h4,p1,p2)` out of a 227 PASV reply.
pub(crate) fn parse_pasv_reply(text: &str) -> Result<SocketAddr, FtpcError> {
    let re = Regex::new(r"(\d+),(\d+),(\d+),(\d+),(\d+),(\d+)").unwrap();
    let caps = re
        .captures(text)
        .ok_or_else(|| FtpcError::Protocol(format!("cannot parse PASV reply: {}", text)))?;

    let mut nums = [0u8; 6];
    for (i, num) in nums.iter_mut().enumerate() {
        *num = caps[i + 1]
            .parse::<u8>()
            .map_err(|_| FtpcError::Protocol(format!("PASV octet out of range: {}", text)))?;
    }

    let ip = IpAddr::from([nums[0], nums[1], nums[2], nums[3]]);
    let port = (nums[4] as u16) * 256 + nums[5] as u16;
    Ok(SocketAddr::new(ip, port))
}
