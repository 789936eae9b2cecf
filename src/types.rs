use crate::render::OutputFormat;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Request for the directory tree of a repository or local directory
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DirectoryStructureRequest {
    /// Local path or remote repository reference (e.g. "https://github.com/org/repo",
    /// "github.com/org/repo" or "git@github.com:org/repo.git")
    pub source: String,
}

impl DirectoryStructureRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("source", &self.source)
    }
}

/// Request to read specific files from a repository or local directory
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReadFilesRequest {
    /// Local path or remote repository reference
    pub source: String,
    /// Paths relative to the source root, returned in this order
    pub file_paths: Vec<String>,
}

impl ReadFilesRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("source", &self.source)?;
        if self.file_paths.is_empty() {
            return Err("file_paths must not be empty".to_string());
        }
        Ok(())
    }
}

/// Outcome of reading one requested file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileResult {
    /// The path as requested
    pub path: String,
    /// Decoded text, absent for binary files and failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Whether the file exists but is not text
    #[serde(default)]
    pub binary: bool,
    /// Why this file could not be read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ReadFileResult {
    pub fn failed(path: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
            binary: false,
            error: Some(error.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Request to flatten one or more local paths and repositories into a single prompt
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlattenRequest {
    /// Local paths and/or remote repository references, rendered in this order
    pub paths: Vec<String>,
    /// Only include files with these extensions (e.g. ["rs", "toml"]); empty includes all
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Include files and directories whose names start with '.'
    #[serde(default)]
    pub include_hidden: bool,
    /// Glob patterns matched against file and directory names (e.g. ["*.lock", "tests"])
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Apply ignore_patterns to files only, never to directories
    #[serde(default)]
    pub ignore_files_only: bool,
    /// Do not honor .gitignore files
    #[serde(default)]
    pub ignore_gitignore: bool,
    /// Output format: "default", "cxml" or "markdown"
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Prefix every line with its line number
    #[serde(default)]
    pub include_line_numbers: bool,
    /// Also write the output to this file (overwritten if it exists)
    #[serde(default)]
    pub output_file: Option<String>,
}

impl FlattenRequest {
    /// Request with default options for the given sources
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            extensions: Vec::new(),
            include_hidden: false,
            ignore_patterns: Vec::new(),
            ignore_files_only: false,
            ignore_gitignore: false,
            output_format: OutputFormat::Default,
            include_line_numbers: false,
            output_file: None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.paths.is_empty() {
            return Err("paths must contain at least one path or repository".to_string());
        }
        for (i, path) in self.paths.iter().enumerate() {
            require_non_blank(&format!("paths[{}]", i), path)?;
        }
        Ok(())
    }
}

/// Request to clone a remote repository and flatten it in one step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CloneFlattenRequest {
    /// Remote repository reference (e.g. "https://github.com/org/repo")
    pub repo_url: String,
    /// Only include files with these extensions; empty includes all
    #[serde(default)]
    pub extensions: Vec<String>,
    /// Include hidden files and directories
    #[serde(default)]
    pub include_hidden: bool,
    /// Glob patterns matched against file and directory names
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Output format: "default", "cxml" or "markdown"
    #[serde(default)]
    pub output_format: OutputFormat,
    /// Prefix every line with its line number
    #[serde(default)]
    pub include_line_numbers: bool,
}

impl CloneFlattenRequest {
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("repo_url", &self.repo_url)
    }
}

impl From<CloneFlattenRequest> for FlattenRequest {
    fn from(req: CloneFlattenRequest) -> Self {
        Self {
            paths: vec![req.repo_url],
            extensions: req.extensions,
            include_hidden: req.include_hidden,
            ignore_patterns: req.ignore_patterns,
            ignore_files_only: false,
            ignore_gitignore: false,
            output_format: req.output_format,
            include_line_numbers: req.include_line_numbers,
            output_file: None,
        }
    }
}

/// A source that could not be flattened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SkippedSource {
    pub source: String,
    pub error: String,
}

/// A file or directory inside a source that could not be read
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UnreadableEntry {
    pub path: String,
    pub error: String,
}

/// Result of a flatten call
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FlattenResponse {
    /// The rendered document, including any skipped-sources note
    pub text: String,
    /// Number of files rendered, unreadable ones included
    pub files: usize,
    #[serde(default)]
    pub skipped: Vec<SkippedSource>,
    /// Entries rendered with an `[unreadable: ...]` marker or left out of the walk
    #[serde(default)]
    pub unreadable: Vec<UnreadableEntry>,
    /// Set when output_file could not be written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_error: Option<String>,
}

impl FlattenResponse {
    /// The text returned to tool callers: the document plus a write failure note
    pub fn into_tool_text(self) -> String {
        match self.write_error {
            Some(error) => format!("{}\n[output file not written: {}]\n", self.text, error),
            None => self.text,
        }
    }
}

/// Request to delete all cached repository checkouts
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClearCacheRequest {}

/// Response from clearing the repository cache
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ClearCacheResponse {
    /// Number of checkouts removed
    pub removed: usize,
    pub message: String,
}

/// Request to list cached repository checkouts
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListCacheRequest {}

/// A checkout held by the repository cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CachedRepository {
    /// URL the checkout was cloned from
    pub url: String,
    pub directory: String,
    /// Seconds since the checkout was cloned
    pub age_secs: u64,
    /// Seconds since the checkout was last used
    pub idle_secs: u64,
    /// Whether the next call reuses this checkout instead of cloning again
    pub fresh: bool,
}

/// Response from listing the repository cache
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ListCacheResponse {
    pub root: String,
    pub repositories: Vec<CachedRepository>,
}

fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be empty", field));
    }
    Ok(())
}
