use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use uniform_runtime::ServerConfig;

/// Uniform size request portal server.
#[derive(Parser)]
#[command(name = "uniform-portal", version, about)]
pub struct Config {
    /// Address the action server binds to.
    #[arg(long, env = "PORTAL_ADDR", default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Shared staff password.
    #[arg(long, env = "PORTAL_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// SQLite database file. Records are kept in memory when unset.
    #[arg(long, env = "PORTAL_SQLITE_DB")]
    pub sqlite_db: Option<String>,

    /// Roster CSV (`studentId,englishName,arabicName,grade,class`) enrolled at startup.
    #[arg(long, env = "PORTAL_ROSTER_CSV")]
    pub roster_csv: Option<PathBuf>,

    #[arg(long, env = "PORTAL_MAX_BODY_BYTES", default_value_t = ServerConfig::default().max_body_bytes)]
    pub max_body_bytes: usize,
}

impl Config {
    pub fn server(&self) -> ServerConfig {
        ServerConfig {
            max_body_bytes: self.max_body_bytes,
        }
    }
}
