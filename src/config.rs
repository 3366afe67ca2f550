use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("linkden.db")
    }

    /// Token signing secret, written once at init time.
    #[must_use]
    pub fn secret_path(&self) -> PathBuf {
        self.data_dir.join(".jwt_secret")
    }

    /// Generated admin password, written once at init time.
    #[must_use]
    pub fn admin_password_path(&self) -> PathBuf {
        self.data_dir.join(".admin_password")
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
        }
    }
}

/// Token and admin settings for a running server.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret: String,
    /// Usernames granted admin rights.
    pub admins: HashSet<String>,
    pub token_ttl_hours: i64,
}
