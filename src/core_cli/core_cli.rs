use clap::Parser;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "rouilleftpc", about = "A FTP client written in Rust.")]
pub struct Cli {
    /// Host name or address of the FTP server
    pub host: String,

    /// Control-connection port
    #[arg(short, long, default_value_t = 21)]
    pub port: u16,

    /// Log in as this user once connected (prompts for a password)
    #[arg(short, long)]
    pub user: Option<String>,

    /// Path to the configuration file
    #[arg(short, long, default_value = "")]
    pub config: String,

    /// Enable verbose mode
    #[arg(short, long)]
    pub verbose: bool,
}
