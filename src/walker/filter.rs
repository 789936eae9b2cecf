//! Traversal filter configuration

use crate::error::{FlattenError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;

/// Everything that decides which entries a walk yields.
///
/// Built once per call with the `with_*` methods and then only read.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub(crate) extensions: Vec<String>,
    pub(crate) include_hidden: bool,
    pub(crate) ignore_patterns: Vec<String>,
    pub(crate) ignore_files_only: bool,
    pub(crate) ignore_gitignore: bool,
    pub(crate) max_file_size: u64,
}

impl Default for FilterSpec {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            include_hidden: false,
            ignore_patterns: Vec::new(),
            ignore_files_only: false,
            ignore_gitignore: false,
            max_file_size: crate::config::default_max_file_size(),
        }
    }
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only yield files with one of these extensions (empty = all).
    ///
    /// Matching is case-sensitive; a leading dot is tolerated and dropped.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_string())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Glob patterns matched against entry names, e.g. `*.lock` or `tests`
    pub fn with_ignore_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignore_patterns = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        self
    }

    /// Apply ignore patterns to files only, never pruning directories
    pub fn with_ignore_files_only(mut self, files_only: bool) -> Self {
        self.ignore_files_only = files_only;
        self
    }

    /// Disregard `.gitignore` rules
    pub fn with_ignore_gitignore(mut self, ignore_gitignore: bool) -> Self {
        self.ignore_gitignore = ignore_gitignore;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn include_hidden(&self) -> bool {
        self.include_hidden
    }

    pub fn ignore_patterns(&self) -> &[String] {
        &self.ignore_patterns
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Whether a file passes the extension allow-list
    pub fn allows_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext))
    }

    /// Compile the ignore patterns, rejecting malformed globs up front
    pub(crate) fn compile_patterns(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.ignore_patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                FlattenError::invalid_input(format!("invalid ignore pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| FlattenError::invalid_input(format!("invalid ignore patterns: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let spec = FilterSpec::new();
        assert!(spec.extensions().is_empty());
        assert!(!spec.include_hidden());
        assert!(spec.ignore_patterns().is_empty());
        assert!(!spec.ignore_files_only);
        assert!(!spec.ignore_gitignore);
        assert_eq!(spec.max_file_size(), 1_048_576);
    }

    #[test]
    fn test_extensions_normalized() {
        let spec = FilterSpec::new().with_extensions([".rs", "md", " ", "toml "]);
        assert_eq!(spec.extensions(), ["rs", "md", "toml"]);
    }

    #[test]
    fn test_allows_extension() {
        let spec = FilterSpec::new().with_extensions(["md"]);
        assert!(spec.allows_extension(Path::new("README.md")));
        assert!(!spec.allows_extension(Path::new("README.MD")));
        assert!(!spec.allows_extension(Path::new("main.bin")));
        assert!(!spec.allows_extension(Path::new("Makefile")));

        let all = FilterSpec::new();
        assert!(all.allows_extension(Path::new("Makefile")));
    }

    #[test]
    fn test_compile_patterns_matches_names() {
        let spec = FilterSpec::new().with_ignore_patterns(["*.lock", "target"]);
        let set = spec.compile_patterns().unwrap();
        assert!(set.is_match("Cargo.lock"));
        assert!(set.is_match("target"));
        assert!(!set.is_match("Cargo.toml"));
    }

    #[test]
    fn test_compile_patterns_rejects_malformed() {
        let spec = FilterSpec::new().with_ignore_patterns(["[unclosed"]);
        assert!(matches!(
            spec.compile_patterns(),
            Err(FlattenError::InvalidInput(_))
        ));
    }
}
