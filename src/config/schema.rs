use serde::{Deserialize, Serialize};

use crate::transform::TransformMode;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub listen: ListenConfig,
    /// Fixed next hop as "host:port". When set, header-based destination
    /// resolution is skipped entirely.
    #[serde(default)]
    pub next_hop: Option<String>,
    #[serde(default)]
    pub transform: TransformMode,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenConfig {
    #[serde(default = "default_listen_host")]
    pub host: String,
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: default_listen_host(),
            port: default_listen_port(),
        }
    }
}

// Default value functions
fn default_listen_host() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

impl Config {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen.host, self.listen.port)
    }

    /// One-line description of the operating mode, logged at startup.
    pub fn work_mode(&self) -> String {
        match &self.next_hop {
            Some(next_hop) => {
                let suffix = match self.transform {
                    TransformMode::None => "plain http proxy",
                    TransformMode::EncodeOnServerWrite => {
                        "forward proxy, encoding data sent to the next hop"
                    }
                    TransformMode::DecodeOnClientRead => {
                        "forward proxy, decoding data received from clients"
                    }
                };
                format!(
                    "start server on {} with next hop {}; {}",
                    self.listen_addr(),
                    next_hop,
                    suffix
                )
            }
            None => {
                let suffix = match self.transform {
                    TransformMode::None => "remote forward proxy",
                    TransformMode::EncodeOnServerWrite => {
                        "remote forward proxy, encoding data sent to destinations"
                    }
                    TransformMode::DecodeOnClientRead => {
                        "remote forward proxy, decoding data received from clients"
                    }
                };
                format!("start server on {}; {}", self.listen_addr(), suffix)
            }
        }
    }
}
