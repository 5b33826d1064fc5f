use clap::Parser;
use std::path::PathBuf;

const LONG_ABOUT: &str = r#"
Device Registry - in-memory device API with real-time status broadcast

HTTP endpoints:
  GET    /devices            List devices
  POST   /devices            Create a device {id, name, status?}
  PATCH  /devices/:id        Set status {status} and broadcast UPDATE
  PUT    /devices/:id/name   Rename {name}
  DELETE /devices/:id        Remove a device
  GET    /health             Service health

Real-time channel (WebSocket):
  GET /ws   INIT snapshot on connect, UPDATE on every status change,
            inbound esp_event frames are logged

Environment:
  DEVICE_REGISTRY_HOST, DEVICE_REGISTRY_PORT, DEVICE_REGISTRY_HEARTBEAT_SECS
  RUST_LOG overrides the log filter
"#;

#[derive(Parser, Clone, Debug)]
#[command(name = "device-registry")]
#[command(about = "In-memory device registry with real-time status broadcast")]
#[command(long_about = LONG_ABOUT)]
#[command(version)]
pub struct Cli {
    /// Address to bind (overrides DEVICE_REGISTRY_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides DEVICE_REGISTRY_PORT, default: 3000)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Seconds between WebSocket heartbeat pings
    #[arg(long)]
    pub heartbeat_secs: Option<u64>,

    /// Enable verbose output (-v)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output (-q)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json: bool,

    /// Write logs to this file instead of stdout
    #[arg(long, env = "DEVICE_REGISTRY_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}
