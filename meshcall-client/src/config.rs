use crate::transport::TransportConfig;

#[derive(Debug, Clone)]
pub struct CallConfig {
    /// WebSocket URL of the signaling endpoint, e.g. `ws://host:3000/ws`.
    pub server_url: String,
    /// Base URL for the `/detect` and `/translate` proxies.
    pub http_base: String,
    pub display_name: String,
    pub transport: TransportConfig,
}

impl CallConfig {
    /// Derive both URLs from the server's HTTP base, e.g. `http://localhost:3000`.
    pub fn from_server(base: &str, display_name: impl Into<String>) -> Self {
        let http_base = base.trim_end_matches('/').to_owned();
        let ws_base = if let Some(rest) = http_base.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = http_base.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            http_base.clone()
        };

        Self {
            server_url: format!("{}/ws", ws_base),
            http_base,
            display_name: display_name.into(),
            transport: TransportConfig::default(),
        }
    }

    pub fn detect_url(&self) -> String {
        format!("{}/detect", self.http_base)
    }

    pub fn translate_url(&self) -> String {
        format!("{}/translate", self.http_base)
    }
}
