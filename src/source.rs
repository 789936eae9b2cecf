//! Classification of tool inputs into local paths and remote repositories
//!
//! Resolution is pure string work: no network or filesystem access happens
//! here. Missing local paths surface later, when the walker opens them.

use crate::error::{FlattenError, Result};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;
use url::Url;

/// Schemes accepted for remote references
const REMOTE_SCHEMES: &[&str] = &["http", "https", "git", "ssh", "git+ssh"];

/// `user@host:owner/repo`
static SCP_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._-]+@([A-Za-z0-9.-]+):(.+)$").expect("valid scp regex")
});

/// `host.tld/owner/repo[/...]`
static SHORTHAND: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^((?:[A-Za-z0-9-]+\.)+[A-Za-z]{2,}(?::\d+)?)/(.+/.+)$")
        .expect("valid shorthand regex")
});

/// `C:\...` or `C:/...`
static DRIVE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]:[\\/]").expect("valid drive regex"));

/// Normalized identity of a remote repository, used as the cache lookup key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CloneKey {
    host: String,
    path: String,
}

impl CloneKey {
    /// Lowercased host, including a port when one was given over http(s)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Repository path without leading/trailing slashes or `.git`, e.g. `org/repo`
    pub fn repo_path(&self) -> &str {
        &self.path
    }

    /// Last path segment, i.e. the repository name
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The URL handed to `git clone`
    pub fn canonical_url(&self) -> String {
        format!("https://{}/{}", self.host, self.path)
    }

    /// Directory name under the cache root.
    ///
    /// Readable prefix plus a sha256-derived suffix, so distinct repositories
    /// never share a directory and the same repository always maps to one.
    pub fn dir_name(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.canonical_url().as_bytes());
        let hash = format!("{:x}", hasher.finalize());

        let name: String = self
            .name()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        format!("{}-{}", name.trim_start_matches('.'), &hash[..16])
    }

    fn new(host: &str, raw_path: &str) -> Result<Self> {
        let host = host.trim().to_ascii_lowercase();
        if host.is_empty() {
            return Err(FlattenError::invalid_input(format!(
                "remote reference has no host: {raw_path}"
            )));
        }

        let path = normalize_repo_path(raw_path);
        if path.split('/').count() < 2 {
            return Err(FlattenError::invalid_input(format!(
                "remote reference must name an owner and a repository: {host}/{path}"
            )));
        }

        Ok(Self { host, path })
    }
}

impl fmt::Display for CloneKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_url())
    }
}

/// Where the files for one input come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A path on the local filesystem, used as given
    Local(PathBuf),
    /// A remote repository that has to be materialized first
    Remote(CloneKey),
}

/// Classify `input` as a local path or a remote repository reference.
pub fn resolve(input: &str) -> Result<Source> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(FlattenError::invalid_input("empty path or repository reference"));
    }

    if trimmed.starts_with(['.', '/', '\\', '~']) || DRIVE_PATH.is_match(trimmed) {
        return Ok(Source::Local(PathBuf::from(trimmed)));
    }

    if trimmed.contains("://") {
        return parse_url(trimmed).map(Source::Remote);
    }

    if let Some(caps) = SCP_LIKE.captures(trimmed) {
        return CloneKey::new(&caps[1], &caps[2]).map(Source::Remote);
    }

    if let Some(caps) = SHORTHAND.captures(trimmed) {
        return CloneKey::new(&caps[1], &caps[2]).map(Source::Remote);
    }

    Ok(Source::Local(PathBuf::from(trimmed)))
}

/// Resolve an input that must name a remote repository.
pub fn resolve_remote(input: &str) -> Result<CloneKey> {
    match resolve(input)? {
        Source::Remote(key) => Ok(key),
        Source::Local(path) => Err(FlattenError::invalid_input(format!(
            "expected a git repository URL, got local path: {}",
            path.display()
        ))),
    }
}

fn parse_url(input: &str) -> Result<CloneKey> {
    let url = Url::parse(input)
        .map_err(|e| FlattenError::invalid_input(format!("malformed URL '{input}': {e}")))?;

    if !REMOTE_SCHEMES.contains(&url.scheme()) {
        return Err(FlattenError::invalid_input(format!(
            "unsupported URL scheme '{}' in '{input}'",
            url.scheme()
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| FlattenError::invalid_input(format!("URL has no host: {input}")))?;

    // Ports only identify a different server over http(s); ssh ports are transport detail.
    let host = match (url.scheme(), url.port()) {
        ("http" | "https", Some(port)) => format!("{host}:{port}"),
        _ => host.to_string(),
    };

    CloneKey::new(&host, url.path())
}

/// Strip slashes, `.git`, and web-UI suffixes such as `/tree/main/src`.
fn normalize_repo_path(raw: &str) -> String {
    let raw = raw.split(['?', '#']).next().unwrap_or_default();

    let mut kept: Vec<&str> = Vec::new();
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        if kept.len() >= 2 && matches!(segment, "tree" | "blob" | "-") {
            break;
        }
        kept.push(segment);
    }

    if let Some(last) = kept.pop() {
        kept.push(last.strip_suffix(".git").unwrap_or(last));
    }

    kept.retain(|s| !s.is_empty());
    kept.join("/")
}
