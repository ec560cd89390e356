use meshcall_core::IceServerConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_DETECT_URL: &str = "http://localhost:5000/detect";
pub const DEFAULT_TRANSLATE_URL: &str = "http://localhost:5000/translate";
pub const DEFAULT_PROXY_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Upstream gesture detection endpoint behind `POST /detect`.
    pub detect_url: String,
    /// Upstream translation endpoint behind `POST /translate`.
    pub translate_url: String,
    pub proxy_timeout: Duration,
    /// Browser client assets served for every unmatched path.
    pub static_dir: Option<PathBuf>,
    /// Sent to each client in its `ice-config` frame.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            detect_url: DEFAULT_DETECT_URL.to_owned(),
            translate_url: DEFAULT_TRANSLATE_URL.to_owned(),
            proxy_timeout: DEFAULT_PROXY_TIMEOUT,
            static_dir: None,
            ice_servers: vec![IceServerConfig::stun(DEFAULT_STUN_ADDR)],
        }
    }
}
