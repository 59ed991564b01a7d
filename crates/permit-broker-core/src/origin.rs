//! Requesting origin identity.
//!
//! An origin is the `scheme://host[:port]` triple of a URL. Paths, queries
//! and fragments are dropped, the host is lowercased and default ports are
//! elided, so two requests from different pages of the same site correlate
//! on the same origin.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CoreError, Result};

/// A normalized, tuple (non-opaque) origin.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Origin(String);

impl Origin {
    /// Parse and normalize an origin from any URL-like string.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input.trim()).map_err(|e| CoreError::InvalidOrigin {
            input: input.to_string(),
            reason: e.to_string(),
        })?;

        let origin = url.origin();
        if !origin.is_tuple() {
            return Err(CoreError::OpaqueOrigin(input.to_string()));
        }

        Ok(Self(origin.ascii_serialization()))
    }

    /// The serialized origin, e.g. `https://a.example:8443`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Origin({})", self.0)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Origin {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Origin {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Origin {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.0
    }
}

impl AsRef<str> for Origin {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_drops_path_and_default_port() {
        let origin = Origin::parse("HTTPS://A.Example:443/maps?q=1#top").unwrap();
        assert_eq!(origin.as_str(), "https://a.example");
    }

    #[test]
    fn test_origin_keeps_explicit_port() {
        let origin = Origin::parse("https://a.example:8443/").unwrap();
        assert_eq!(origin.as_str(), "https://a.example:8443");
    }

    #[test]
    fn test_same_site_pages_correlate() {
        let a = Origin::parse("https://www.chromium.org/a").unwrap();
        let b = Origin::parse("https://www.chromium.org/b/c").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_scheme_distinguishes_origins() {
        let secure = Origin::parse("https://a.example").unwrap();
        let plain = Origin::parse("http://a.example").unwrap();
        assert_ne!(secure, plain);
    }

    #[test]
    fn test_invalid_origin() {
        let err = Origin::parse("not a url").unwrap_err();
        assert!(matches!(err, CoreError::InvalidOrigin { .. }));
    }

    #[test]
    fn test_opaque_origin_rejected() {
        let err = Origin::parse("data:text/plain,hello").unwrap_err();
        assert!(matches!(err, CoreError::OpaqueOrigin(_)));
    }

    #[test]
    fn test_serde_as_string() {
        let origin = Origin::parse("https://a.example/path").unwrap();
        let json = serde_json::to_string(&origin).unwrap();
        assert_eq!(json, "\"https://a.example\"");

        let back: Origin = serde_json::from_str("\"https://A.EXAMPLE/x\"").unwrap();
        assert_eq!(back, origin);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn normalization_is_idempotent(
                host in "[a-z][a-z0-9]{0,11}\\.example",
                port in 1u16..=u16::MAX,
                path in "(/[a-z0-9]{0,8}){0,3}",
            ) {
                let raw = format!("https://{}:{}{}", host, port, path);
                let once = Origin::parse(&raw).unwrap();
                let twice = Origin::parse(once.as_str()).unwrap();
                prop_assert_eq!(once, twice);
            }
        }
    }
}
