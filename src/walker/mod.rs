//! Lazy, ordered traversal of a file tree
//!
//! [`Walk`] is a pull iterator over the files under a root that pass a
//! [`FilterSpec`]. Entries are produced one at a time, so rendering can start
//! before the tree is fully enumerated and dropping the iterator stops the
//! traversal. Nothing persists between walks.
//!
//! Filters run in a fixed order: hidden entries, `.gitignore` rules, ignore
//! globs, then the extension allow-list (files only).

mod filter;

pub use filter::FilterSpec;

use crate::error::{FlattenError, Result};
use crate::paths::to_slash;
use ignore::WalkBuilder;
use std::fs;
use std::path::{Component, Path, PathBuf};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Content of a walked file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
    Text(String),
    /// Not valid UTF-8 text; only the path is rendered
    Binary,
    /// Larger than the configured limit; only the path is rendered
    TooLarge,
    /// Listed by the walk but could not be read; holds the reason
    Unreadable(String),
}

/// A file produced by a walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path shown in rendered output (forward slashes)
    pub path: String,
    /// Path relative to the walk root (forward slashes)
    pub relative_path: String,
    pub size: u64,
    pub content: FileContent,
}

impl FileEntry {
    /// Read `path` from disk, classifying its content
    pub fn read(path: &Path, display: String, relative: String, max_size: u64) -> Result<Self> {
        let metadata = fs::metadata(path).map_err(|e| FlattenError::from_io(e, path))?;
        if metadata.is_dir() {
            return Err(FlattenError::invalid_input(format!(
                "{} is a directory",
                path.display()
            )));
        }

        let size = metadata.len();
        let content = if size > max_size {
            tracing::debug!("Omitting content of large file: {:?} ({} bytes)", path, size);
            FileContent::TooLarge
        } else {
            let bytes = fs::read(path).map_err(|e| FlattenError::from_io(e, path))?;
            decode(bytes)
        };

        Ok(Self {
            path: display,
            relative_path: relative,
            size,
            content,
        })
    }

    /// An entry for a file the walk found but could not read
    pub fn unreadable(display: String, relative: String, reason: impl Into<String>) -> Self {
        Self {
            path: display,
            relative_path: relative,
            size: 0,
            content: FileContent::Unreadable(reason.into()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            FileContent::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        self.content == FileContent::Binary
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.path).extension().and_then(|e| e.to_str())
    }
}

/// Decode file bytes as text, falling back to [`FileContent::Binary`].
///
/// A NUL byte marks binary content even when the bytes are valid UTF-8.
pub fn decode(bytes: Vec<u8>) -> FileContent {
    if bytes.contains(&0) {
        return FileContent::Binary;
    }

    let bytes = if bytes.starts_with(UTF8_BOM) {
        bytes[UTF8_BOM.len()..].to_vec()
    } else {
        bytes
    };

    match String::from_utf8(bytes) {
        Ok(text) => FileContent::Text(text),
        Err(_) => FileContent::Binary,
    }
}

/// Iterator over the files under a root
pub struct Walk {
    root: PathBuf,
    root_is_file: bool,
    display_prefix: Option<PathBuf>,
    inner: ignore::Walk,
    spec: FilterSpec,
}

impl Walk {
    /// Start a walk. Fails with `NotFound` or `PermissionDenied` if the root
    /// cannot be opened, or `InvalidInput` for malformed ignore patterns.
    pub fn new(root: impl AsRef<Path>, spec: &FilterSpec) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let metadata = fs::metadata(&root).map_err(|e| FlattenError::from_io(e, &root))?;
        if metadata.is_dir() {
            fs::read_dir(&root).map_err(|e| FlattenError::from_io(e, &root))?;
        }

        let inner = build_walk(&root, spec)?;

        Ok(Self {
            root,
            root_is_file: !metadata.is_dir(),
            display_prefix: None,
            inner,
            spec: spec.clone(),
        })
    }

    /// Show entries as `prefix/relative` instead of `relative`.
    ///
    /// A prefix made only of `.` components is treated as no prefix.
    pub fn with_display_prefix(mut self, prefix: Option<PathBuf>) -> Self {
        self.display_prefix = prefix.filter(|p| {
            !p.as_os_str().is_empty() && !p.components().all(|c| c == Component::CurDir)
        });
        self
    }

    fn relative(&self, path: &Path) -> String {
        match path.strip_prefix(&self.root) {
            Ok(rel) if !rel.as_os_str().is_empty() => to_slash(rel),
            _ => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| to_slash(path)),
        }
    }

    fn display(&self, relative: &str) -> String {
        match &self.display_prefix {
            Some(prefix) if self.root_is_file => to_slash(prefix),
            Some(prefix) => to_slash(&prefix.join(relative)),
            None => relative.to_string(),
        }
    }
}

impl Iterator for Walk {
    type Item = Result<FileEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::warn!("Skipping unreadable entry: {}", err);
                    return Some(Err(walk_error(err)));
                }
            };

            if !is_file(&entry) {
                continue;
            }

            let path = entry.path();
            // An explicitly named file is always taken, like the other filters do for roots
            if entry.depth() > 0 && !self.spec.allows_extension(path) {
                continue;
            }

            let relative = self.relative(path);
            let display = self.display(&relative);
            let max_size = self.spec.max_file_size;
            let entry = FileEntry::read(path, display.clone(), relative.clone(), max_size)
                .unwrap_or_else(|e| {
                    tracing::warn!("Could not read {:?}: {}", path, e);
                    FileEntry::unreadable(display, relative, e.to_string())
                });
            return Some(Ok(entry));
        }
    }
}

/// Render the directory hierarchy under `root` as indented text.
///
/// The first line is `label`; every entry below it is indented two spaces
/// per level, and directories carry a trailing `/`.
pub fn directory_tree(root: &Path, label: &str, spec: &FilterSpec) -> Result<String> {
    let metadata = fs::metadata(root).map_err(|e| FlattenError::from_io(e, root))?;
    if !metadata.is_dir() {
        return Ok(format!("{}\n", label));
    }
    fs::read_dir(root).map_err(|e| FlattenError::from_io(e, root))?;

    let mut out = format!("{}/\n", label.trim_end_matches('/'));
    for entry in build_walk(root, spec)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!("Skipping unreadable entry in tree: {}", err);
                continue;
            }
        };
        if entry.depth() == 0 {
            continue;
        }

        let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
        if !is_dir && !spec.allows_extension(entry.path()) {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        out.push_str(&"  ".repeat(entry.depth()));
        out.push_str(&name);
        if is_dir {
            out.push('/');
        }
        out.push('\n');
    }

    Ok(out)
}

fn build_walk(root: &Path, spec: &FilterSpec) -> Result<ignore::Walk> {
    let patterns = spec.compile_patterns()?;
    let files_only = spec.ignore_files_only;
    let use_gitignore = !spec.ignore_gitignore;

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(!spec.include_hidden)
        .git_ignore(use_gitignore)
        .git_exclude(use_gitignore)
        .require_git(false)
        .follow_links(false)
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(move |entry| {
            // Repository metadata is never part of the tree
            if entry.file_name() == ".git" {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir && files_only {
                return true;
            }
            !patterns.is_match(entry.file_name())
        });

    Ok(builder.build())
}

fn is_file(entry: &ignore::DirEntry) -> bool {
    match entry.file_type() {
        Some(t) if t.is_file() => true,
        Some(t) if t.is_symlink() => entry.path().is_file(),
        _ => false,
    }
}

fn walk_error(err: ignore::Error) -> FlattenError {
    match err.io_error().map(|e| e.kind()) {
        Some(std::io::ErrorKind::PermissionDenied) => FlattenError::PermissionDenied(err.to_string()),
        Some(std::io::ErrorKind::NotFound) => FlattenError::NotFound(err.to_string()),
        _ => FlattenError::other(err.to_string()),
    }
}

#[cfg(test)]
mod tests;
