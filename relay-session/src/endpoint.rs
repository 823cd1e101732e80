//! Runtime-bound inference endpoint.

use crate::error::{SessionError, SessionResult};
use std::fmt;

/// Path appended to the bound base URL to reach the generation API.
pub const GENERATE_PATH: &str = "/api/generate";

/// A user-supplied inference server address.
///
/// Validation is purely syntactic; an unreachable endpoint is only discovered
/// when it is called.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    base: String,
    generate_url: String,
}

impl Endpoint {
    /// Parse a raw URL as typed by the user.
    ///
    /// Surrounding whitespace and trailing `/` are dropped. The remainder must
    /// start with `http://` or `https://` and carry something after the scheme.
    pub fn parse(raw: &str) -> SessionResult<Self> {
        let base = raw.trim().trim_end_matches('/');

        let lower = base.to_ascii_lowercase();
        let rest = lower
            .strip_prefix("https://")
            .or_else(|| lower.strip_prefix("http://"))
            .ok_or_else(|| SessionError::InvalidUrl(raw.trim().to_string()))?;

        if rest.is_empty() || rest.starts_with('/') || rest.chars().any(char::is_whitespace) {
            return Err(SessionError::InvalidUrl(raw.trim().to_string()));
        }

        Ok(Self {
            base: base.to_string(),
            generate_url: format!("{base}{GENERATE_PATH}"),
        })
    }

    /// The URL as bound by the user, without trailing slashes.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The full URL of the generation API.
    pub fn generate_url(&self) -> &str {
        &self.generate_url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_https() {
        let ep = Endpoint::parse("https://x.test/").unwrap();
        assert_eq!(ep.base(), "https://x.test");
        assert_eq!(ep.generate_url(), "https://x.test/api/generate");
    }

    #[test]
    fn parse_strips_every_trailing_slash_and_whitespace() {
        let ep = Endpoint::parse("  http://1234-abcd.ngrok.io///  ").unwrap();
        assert_eq!(ep.base(), "http://1234-abcd.ngrok.io");
        assert_eq!(ep.to_string(), "http://1234-abcd.ngrok.io");
    }

    #[test]
    fn parse_keeps_path_and_port() {
        let ep = Endpoint::parse("http://10.0.0.2:11434/ollama").unwrap();
        assert_eq!(ep.generate_url(), "http://10.0.0.2:11434/ollama/api/generate");
    }

    #[test]
    fn parse_scheme_case_insensitive() {
        let ep = Endpoint::parse("HTTPS://Host.Test").unwrap();
        assert_eq!(ep.base(), "HTTPS://Host.Test");
    }

    #[test]
    fn parse_rejects_non_http() {
        assert_eq!(
            Endpoint::parse("not-a-url"),
            Err(SessionError::InvalidUrl("not-a-url".into()))
        );
        assert!(Endpoint::parse("ftp://x.test").is_err());
        assert!(Endpoint::parse("httpx://x.test").is_err());
        assert!(Endpoint::parse("").is_err());
    }

    #[test]
    fn parse_rejects_empty_host() {
        assert!(Endpoint::parse("https://").is_err());
        assert!(Endpoint::parse("http:///").is_err());
        assert!(Endpoint::parse("https:///path").is_err());
        assert!(Endpoint::parse("https://a b").is_err());
    }
}
