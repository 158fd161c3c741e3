use clap::Parser;
use std::time::Duration;

/// Scopone table server: one table, four seats, line-delimited JSON over TCP.
#[derive(Parser, Debug, Clone)]
#[command(name = "scopone-server", version)]
pub struct ServerCli {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// TCP port
    #[arg(short, long, default_value_t = 12345)]
    pub port: u16,

    /// Show every hand to every connection
    #[arg(long, default_value_t = false)]
    pub debug: bool,

    /// How often lobby occupancy is broadcast while seats are free (ms)
    #[arg(long, default_value_t = 1000)]
    pub lobby_interval_ms: u64,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl ServerCli {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            reveal_all: self.debug,
            lobby_interval: Duration::from_millis(self.lobby_interval_ms.max(1)),
        }
    }
}

/// Runtime settings handed to the table.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub reveal_all: bool,
    pub lobby_interval: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            reveal_all: false,
            lobby_interval: Duration::from_secs(1),
        }
    }
}
