//! Transport addresses.
//!
//! Address format: `scheme://locator`
//!
//! The scheme selects a channel implementation, the locator is opaque to this
//! crate. Examples:
//! - `ws://127.0.0.1:9001/runtime` - WebSocket channel on the loopback
//! - `mem://runtime` - in-process channel (tests)

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A transport address in the form `scheme://locator`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address {
    scheme: String,
    locator: String,
}

impl Address {
    /// Create a new address.
    pub fn new(scheme: impl Into<String>, locator: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            locator: locator.into(),
        }
    }

    /// The scheme (e.g., "ws", "mem").
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Everything after `://`.
    pub fn locator(&self) -> &str {
        &self.locator
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.locator)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (scheme, locator) = s
            .split_once("://")
            .ok_or_else(|| AddressError::MissingSeparator(s.to_string()))?;

        if scheme.is_empty() {
            return Err(AddressError::EmptyScheme);
        }
        if locator.is_empty() {
            return Err(AddressError::EmptyLocator);
        }

        Ok(Self::new(scheme, locator))
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

/// Error parsing an address, or building a channel for one.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address must contain '://' separator, got: {0}")]
    MissingSeparator(String),
    #[error("address scheme cannot be empty")]
    EmptyScheme,
    #[error("address locator cannot be empty")]
    EmptyLocator,
    #[error("unsupported address scheme: {0}")]
    UnsupportedScheme(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_ws() {
        let address: Address = "ws://127.0.0.1:9001/runtime".parse().unwrap();
        assert_eq!(address.scheme(), "ws");
        assert_eq!(address.locator(), "127.0.0.1:9001/runtime");
        assert_eq!(address.to_string(), "ws://127.0.0.1:9001/runtime");
    }

    #[test]
    fn reject_malformed() {
        assert!(matches!(
            "runtime".parse::<Address>(),
            Err(AddressError::MissingSeparator(_))
        ));
        assert_eq!("://runtime".parse::<Address>(), Err(AddressError::EmptyScheme));
        assert_eq!("ws://".parse::<Address>(), Err(AddressError::EmptyLocator));
    }

    #[test]
    fn deserialize_from_string() {
        let address: Address = serde_json::from_str("\"mem://runtime\"").unwrap();
        assert_eq!(address, Address::new("mem", "runtime"));
        assert!(serde_json::from_str::<Address>("\"runtime\"").is_err());
    }
}
