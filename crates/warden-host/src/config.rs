//! Host configuration.

use serde::Deserialize;
use std::net::SocketAddr;

fn default_bind() -> SocketAddr {
    ([127, 0, 0, 1], 9001).into()
}

fn default_name() -> String {
    "runtime".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Path component of the address proxies connect to.
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            name: default_name(),
        }
    }
}

impl HostConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
