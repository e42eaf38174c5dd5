use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Control connection port.
    pub port: u16,
    /// Use passive mode (PASV/EPSV) for data connections. Active mode
    /// (PORT/EPRT) requires the server to connect back to us.
    pub passive: bool,
    /// Prefer the extended commands (EPSV/EPRT) over PASV/PORT.
    pub extended: bool,
    /// Seconds allowed for TCP connection establishment (control and
    /// data channels alike).
    pub connect_timeout_secs: u64,
    /// Seconds allowed for a complete server reply, and for each
    /// data-channel read/write during a transfer.
    pub reply_timeout_secs: u64,
    pub xfer_buffer_size: Option<usize>, // Optional to allow default value
    /// How many times a 421 "service not available" may trigger a
    /// transparent reconnect-and-resend. The classic client allows one.
    pub max_reconnects: u32,
    pub anonymous_user: String,
    pub anonymous_password: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            port: crate::constants::DEFAULT_FTP_PORT,
            passive: true,
            extended: true,
            connect_timeout_secs: 15,
            reply_timeout_secs: 30,
            xfer_buffer_size: Some(crate::constants::XFER_BUFFER_SIZE),
            max_reconnects: 1,
            anonymous_user: String::from("anonymous"),
            anonymous_password: String::from("anonymous@"),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let config_str = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;
        let mut config: Config = toml::from_str(&config_str)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))?;

        // Set defaults if not specified
        if config.client.xfer_buffer_size.is_none() {
            config.client.xfer_buffer_size = Some(crate::constants::XFER_BUFFER_SIZE);
        }

        Ok(config)
    }
}
