use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

const DEFAULT_PORT: u16 = 50051;
const DEFAULT_URL: &str = "http://127.0.0.1:50051";
const DEFAULT_MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Appliance agent: serves and probes the ApplianceAgent ping service.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// Path of the toml config file
    #[clap(short, long, default_value = "./config.toml")]
    pub conf: String,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the agent server
    Serve,
    /// Ping a running agent
    Ping {
        /// Message the agent should echo back
        #[clap(short, long, default_value = "ping")]
        message: String,
        /// Number of concurrent pings
        #[clap(short = 'n', long, default_value_t = 1)]
        count: u32,
    },
}

#[derive(Deserialize, Debug, Default)]
pub struct Conf {
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub agent: Agent,
    #[serde(default)]
    pub client: Client,
}

#[derive(Deserialize, Debug)]
pub struct Log {
    #[serde(default = "default_level")]
    pub level: String,
}

#[derive(Deserialize, Debug)]
pub struct Agent {
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

#[derive(Deserialize, Debug)]
pub struct Client {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,
}

impl Log {
    pub fn level(&self) -> Result<Level> {
        Level::from_str(&self.level).map_err(|_| anyhow::anyhow!("invalid log level {}", self.level))
    }
}

impl Client {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn keep_alive(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

impl Default for Client {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            keep_alive_secs: default_keep_alive_secs(),
            max_message_bytes: default_max_message_bytes(),
        }
    }
}

fn default_level() -> String {
    String::from("info")
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn default_url() -> String {
    String::from(DEFAULT_URL)
}

fn default_timeout_ms() -> u64 {
    3_000
}

fn default_connect_timeout_ms() -> u64 {
    3_000
}

fn default_keep_alive_secs() -> u64 {
    10
}

fn default_max_message_bytes() -> usize {
    DEFAULT_MAX_MESSAGE_BYTES
}

pub fn parse_conf(conf: &str) -> Result<Conf> {
    let conf = toml::from_str::<Conf>(conf)?;
    conf.log.level()?;
    Ok(conf)
}

pub async fn read_conf(path: &str) -> Result<Conf> {
    use tokio::fs;

    let conf = fs::read_to_string(path)
        .await
        .with_context(|| format!("read conf from {}", path))?;
    parse_conf(&conf).with_context(|| format!("parse conf {}", path))
}
