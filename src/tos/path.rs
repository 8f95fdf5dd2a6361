//! `tos://bucket/key` remote path handling

use crate::error::{Error, Result};
use std::fmt;
use std::path::{Component, Path, PathBuf};

pub const TOS_SCHEME: &str = "tos";

/// Location of an artifact tree in object storage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RemotePath {
    pub bucket: String,
    /// Key prefix without leading or trailing `/`
    pub key: String,
}

impl RemotePath {
    pub fn new(bucket: impl Into<String>, key: impl AsRef<str>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.as_ref().trim_matches('/').to_string(),
        }
    }

    /// Parse `tos://bucket/key`; any other scheme is rejected
    pub fn parse(uri: &str) -> Result<Self> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| Error::invalid(format!("remote path '{}' has no scheme", uri)))?;

        if scheme != TOS_SCHEME {
            return Err(Error::invalid(format!(
                "unsupported remote path scheme '{}' in '{}'",
                scheme, uri
            )));
        }

        let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
        if bucket.is_empty() {
            return Err(Error::invalid(format!("remote path '{}' has no bucket", uri)));
        }

        Ok(Self::new(bucket, key))
    }

    /// Listing prefix for everything under this path
    ///
    /// Ends with `/` so sibling keys sharing the textual prefix are excluded.
    pub fn list_prefix(&self) -> String {
        if self.key.is_empty() {
            String::new()
        } else {
            format!("{}/", self.key)
        }
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", TOS_SCHEME, self.bucket, self.key)
    }
}

impl std::str::FromStr for RemotePath {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Local path of `key` relative to listing root `base`
///
/// Returns `None` for keys outside `base` or whose components would escape
/// the destination directory.
pub fn relative_key_path(base: &str, key: &str) -> Option<PathBuf> {
    let rest = key.strip_prefix(base)?;

    let mut path = PathBuf::new();
    for segment in rest.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s if s.contains('\\') || Path::new(s).is_absolute() => return None,
            s => path.push(s),
        }
    }
    Some(path)
}

/// Object key for a local file under an upload prefix, always `/`-separated
pub fn key_for_relative_path(prefix: &str, relative: &Path) -> String {
    let segments: Vec<_> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect();
    format!("{}{}", prefix, segments.join("/"))
}
