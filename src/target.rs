// File: target.rs
// SPDX-License-Identifier: MIT OR Apache-2.0
//
// Copyright (c) 2023-2025
// - Volker Schwaberow <volker@schwaberow.de>

use std::fmt;
use url::Url;

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_PATH_SUFFIX: &str = "/.git/config";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    Empty,
    Malformed { input: String, reason: url::ParseError },
    UnsupportedScheme { input: String, scheme: String },
    Read(String),
}

impl fmt::Display for TargetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty target"),
            Self::Malformed { input, reason } => {
                write!(f, "unable to parse {}, will skip: {}", input, reason)
            }
            Self::UnsupportedScheme { input, scheme } => {
                write!(f, "unsupported scheme {} in {}, will skip", scheme, input)
            }
            Self::Read(msg) => write!(f, "reading targets failed: {}", msg),
        }
    }
}

impl std::error::Error for TargetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

/// Builds the probe URL for a raw target line.
///
/// A missing scheme defaults to `https`. The existing path loses its trailing
/// slash before `suffix` is appended; query and fragment are left alone.
pub fn normalize(raw: &str, suffix: &str) -> Result<Url, TargetError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TargetError::Empty);
    }

    let candidate = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, trimmed)
    };

    let mut url = Url::parse(&candidate).map_err(|reason| TargetError::Malformed {
        input: trimmed.to_string(),
        reason,
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(TargetError::UnsupportedScheme {
            input: trimmed.to_string(),
            scheme: url.scheme().to_string(),
        });
    }

    let path = format!("{}{}", url.path().trim_end_matches('/'), suffix);
    url.set_path(&path);
    Ok(url)
}

/// One entry of the target stream. Invalid targets keep their load error and
/// are answered without touching the network.
#[derive(Debug, Clone)]
pub struct Target {
    input: String,
    url: Result<Url, TargetError>,
}

impl Target {
    pub fn new(url: Url) -> Self {
        Target {
            input: url.to_string(),
            url: Ok(url),
        }
    }

    pub fn invalid(input: impl Into<String>, error: TargetError) -> Self {
        Target {
            input: input.into(),
            url: Err(error),
        }
    }

    pub fn parse(raw: &str, suffix: &str) -> Self {
        match normalize(raw, suffix) {
            Ok(url) => Target {
                input: raw.trim().to_string(),
                url: Ok(url),
            },
            Err(e) => Target::invalid(raw.trim(), e),
        }
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn url(&self) -> Option<&Url> {
        self.url.as_ref().ok()
    }

    pub fn error(&self) -> Option<&TargetError> {
        self.url.as_ref().err()
    }

    pub fn into_parts(self) -> (String, Result<Url, TargetError>) {
        (self.input, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case("example.com", "https://example.com/.git/config")]
    #[case("http://example.com", "http://example.com/.git/config")]
    #[case("https://example.com/", "https://example.com/.git/config")]
    #[case("https://example.com/app/", "https://example.com/app/.git/config")]
    #[case("  example.com:8443  ", "https://example.com:8443/.git/config")]
    #[case("https://example.com/?a=1", "https://example.com/.git/config?a=1")]
    fn test_normalize(#[case] raw: &str, #[case] expected: &str) {
        let url = normalize(raw, DEFAULT_PATH_SUFFIX).unwrap();
        assert_eq!(url.as_str(), expected);
    }

    #[test]
    fn test_normalize_custom_suffix() {
        let url = normalize("example.com", "/.git/HEAD").unwrap();
        assert_eq!(url.path(), "/.git/HEAD");
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert_eq!(normalize("   ", DEFAULT_PATH_SUFFIX), Err(TargetError::Empty));
    }

    #[test]
    fn test_normalize_rejects_malformed() {
        let err = normalize("http://exa mple.com", DEFAULT_PATH_SUFFIX).unwrap_err();
        assert!(matches!(err, TargetError::Malformed { .. }));
        assert!(err.to_string().contains("exa mple.com"));
    }

    #[test]
    fn test_normalize_rejects_other_schemes() {
        let err = normalize("ftp://example.com", DEFAULT_PATH_SUFFIX).unwrap_err();
        assert!(matches!(err, TargetError::UnsupportedScheme { .. }));
    }

    #[test]
    fn test_target_parse_keeps_error() {
        let target = Target::parse("http://[::1", DEFAULT_PATH_SUFFIX);
        assert!(target.error().is_some());
        assert!(target.url().is_none());
        assert_eq!(target.input(), "http://[::1");
    }

    #[test]
    fn test_target_into_parts() {
        let target = Target::parse("example.com", DEFAULT_PATH_SUFFIX);
        let (input, url) = target.into_parts();
        assert_eq!(input, "example.com");
        assert_eq!(url.unwrap().host_str(), Some("example.com"));
    }
}
