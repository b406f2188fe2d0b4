use crate::EndpointError;
use std::fmt;
use std::str::FromStr;
use url::Url;

/// A validated signaling URL.
///
/// Only `ws://` and `wss://` are accepted; the scheme decides whether the transport is
/// secure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: Url,
}

impl Endpoint {
    pub fn parse(raw: &str) -> Result<Self, EndpointError> {
        let url = Url::parse(raw).map_err(|source| EndpointError::Parse {
            url: raw.to_string(),
            source,
        })?;

        match url.scheme() {
            "ws" | "wss" => Ok(Self { url }),
            _ => Err(EndpointError::Scheme(raw.to_string())),
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }

    pub fn is_secure(&self) -> bool {
        self.url.scheme() == "wss"
    }
}

impl FromStr for Endpoint {
    type Err = EndpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}
