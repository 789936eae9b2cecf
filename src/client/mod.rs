//! Core library client for git-flatten
//!
//! [`FlattenClient`] composes the path resolver, the repository cache, the
//! tree walker and the renderer into the operations exposed by the MCP server
//! and the command line. It can also be used directly as a library.

use crate::config::Config;
use crate::error::{FlattenError, Result};
use crate::render::{RenderSpec, Renderer};
use crate::repo_cache::RepoCache;
use crate::source::{self, Source};
use crate::types::*;
use crate::walker::{self, FileContent, FileEntry, FilterSpec, Walk};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// A source resolved to a readable directory or file
#[derive(Debug, Clone)]
pub(crate) struct Located {
    /// The input as given by the caller
    pub(crate) input: String,
    pub(crate) root: PathBuf,
    /// Prefix for displayed paths; `None` shows paths relative to the root
    pub(crate) display_prefix: Option<PathBuf>,
    /// First line of a directory tree
    pub(crate) label: String,
}

/// Main client for flattening repositories and directories
///
/// Holds the repository cache shared by every call, so a repository cloned by
/// one call is reused by the next while it is fresh.
///
/// # Example
///
/// ```no_run
/// use git_flatten::{FlattenClient, FlattenRequest, OutputFormat};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = FlattenClient::new()?;
///
///     let mut req = FlattenRequest::new(["https://github.com/org/repo"]);
///     req.extensions = vec!["md".to_string()];
///     req.output_format = OutputFormat::Markdown;
///
///     let response = client.flatten(req).await?;
///     println!("{}", response.text);
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct FlattenClient {
    pub(crate) cache: Arc<RepoCache>,
    pub(crate) config: Arc<Config>,
}

impl FlattenClient {
    /// Create a client from the configuration file, environment and defaults
    pub fn new() -> Result<Self> {
        let config = Config::new()?;
        Self::with_config(config)
    }

    /// Create a client with an explicit configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(RepoCache::new(&config.cache));
        tracing::info!("Repository cache at {:?}", cache.root());
        Ok(Self::with_cache(config, cache))
    }

    /// Create a client around an existing cache
    pub fn with_cache(config: Config, cache: Arc<RepoCache>) -> Self {
        Self {
            cache,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &RepoCache {
        &self.cache
    }

    /// Resolve `input` and, for remote references, materialize the checkout
    pub(crate) async fn locate(&self, input: &str) -> Result<Located> {
        let input = input.trim();
        match source::resolve(input)? {
            Source::Local(path) => Ok(Located {
                input: input.to_string(),
                root: expand_home(&path),
                label: input.trim_end_matches(['/', '\\']).to_string(),
                display_prefix: Some(path),
            }),
            Source::Remote(key) => {
                let root = self.cache.materialize(&key).await?;
                Ok(Located {
                    input: input.to_string(),
                    root,
                    display_prefix: None,
                    label: key.name().to_string(),
                })
            }
        }
    }

    /// Indented directory tree of a repository or local directory.
    ///
    /// Hidden entries are listed; `.gitignore` rules and the `.git` directory
    /// are not.
    pub async fn directory_structure(&self, source: &str) -> Result<String> {
        if source.trim().is_empty() {
            return Err(FlattenError::invalid_input("source must not be empty"));
        }
        let located = self.locate(source).await?;
        let spec = FilterSpec::new().with_hidden(true);

        tokio::task::spawn_blocking(move || {
            walker::directory_tree(&located.root, &located.label, &spec)
        })
        .await
        .map_err(join_error)?
    }

    /// Read the given files, relative to the source root, in request order.
    ///
    /// A file that cannot be read gets an error entry; the others are still
    /// returned.
    pub async fn read_files(
        &self,
        source: &str,
        file_paths: Vec<String>,
    ) -> Result<Vec<ReadFileResult>> {
        if source.trim().is_empty() {
            return Err(FlattenError::invalid_input("source must not be empty"));
        }
        if file_paths.is_empty() {
            return Err(FlattenError::invalid_input("file_paths must not be empty"));
        }

        let located = self.locate(source).await?;
        let max_size = self.config.walk.max_file_size;

        tokio::task::spawn_blocking(move || {
            file_paths
                .into_iter()
                .map(|requested| read_one(&located.root, requested, max_size))
                .collect()
        })
        .await
        .map_err(join_error)
    }

    /// Flatten local paths and repositories into one document.
    ///
    /// Sources are handled independently and rendered in input order. A
    /// source that fails is listed in a trailing note; the call fails only
    /// when every source fails.
    pub async fn flatten(&self, req: FlattenRequest) -> Result<FlattenResponse> {
        req.validate().map_err(FlattenError::InvalidInput)?;
        let start = Instant::now();

        let filter = FilterSpec::new()
            .with_extensions(&req.extensions)
            .with_hidden(req.include_hidden)
            .with_ignore_patterns(&req.ignore_patterns)
            .with_ignore_files_only(req.ignore_files_only)
            .with_ignore_gitignore(req.ignore_gitignore)
            .with_max_file_size(self.config.walk.max_file_size);
        // Reject malformed globs before cloning anything
        filter.compile_patterns()?;

        let render_spec = RenderSpec::new(req.output_format)
            .with_line_numbers(req.include_line_numbers)
            .with_output_file(
                req.output_file
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(PathBuf::from),
            );

        let mut sources = Vec::with_capacity(req.paths.len());
        for input in &req.paths {
            let located = self.locate(input).await;
            if let Err(e) = &located {
                tracing::warn!("Skipping source {}: {}", input, e);
            }
            sources.push((input.clone(), located));
        }

        let total = sources.len();
        let Flattened {
            rendered,
            files,
            mut failures,
            unreadable,
        } = tokio::task::spawn_blocking(move || flatten_sources(sources, &filter, render_spec))
            .await
            .map_err(join_error)?;

        if failures.len() == total {
            return Err(if total == 1 {
                failures.remove(0).1
            } else {
                FlattenError::other(format!(
                    "all {} sources failed: {}",
                    total,
                    failures
                        .iter()
                        .map(|(source, e)| format!("{}: {}", source, e))
                        .collect::<Vec<_>>()
                        .join("; ")
                ))
            });
        }

        tracing::info!(
            "Flattened {} files from {} sources in {:?}",
            files,
            total - failures.len(),
            start.elapsed()
        );

        Ok(FlattenResponse {
            text: rendered.text,
            files,
            skipped: failures
                .into_iter()
                .map(|(source, error)| SkippedSource {
                    source,
                    error: error.to_string(),
                })
                .collect(),
            unreadable,
            write_error: rendered.write_error,
        })
    }

    /// Clone (or reuse) a single remote repository and flatten it
    pub async fn clone_and_flatten(&self, req: CloneFlattenRequest) -> Result<FlattenResponse> {
        req.validate().map_err(FlattenError::InvalidInput)?;
        source::resolve_remote(&req.repo_url)?;
        self.flatten(req.into()).await
    }

    /// Checkouts this process has materialized, sorted by repository
    pub async fn list_cache(&self) -> ListCacheResponse {
        let freshness = self.cache.freshness();
        let repositories = self
            .cache
            .entries()
            .await
            .into_iter()
            .map(|entry| CachedRepository {
                url: entry.key.canonical_url(),
                directory: entry.dir.display().to_string(),
                age_secs: secs_since(entry.fetched_at),
                idle_secs: secs_since(entry.last_used),
                fresh: entry.is_fresh(freshness),
            })
            .collect();

        ListCacheResponse {
            root: self.cache.root().display().to_string(),
            repositories,
        }
    }

    /// Delete every cached checkout
    pub async fn clear_cache(&self) -> Result<ClearCacheResponse> {
        let removed = self.cache.clear().await?;
        Ok(ClearCacheResponse {
            removed,
            message: format!(
                "Removed {} cached repositories from {}",
                removed,
                self.cache.root().display()
            ),
        })
    }
}

/// Output of [`flatten_sources`]
struct Flattened {
    rendered: crate::render::Rendered,
    files: usize,
    /// Sources that failed, in input order
    failures: Vec<(String, FlattenError)>,
    unreadable: Vec<UnreadableEntry>,
}

/// Walk every located source into one renderer.
fn flatten_sources(
    sources: Vec<(String, Result<Located>)>,
    filter: &FilterSpec,
    render_spec: RenderSpec,
) -> Flattened {
    let mut renderer = Renderer::new(render_spec);
    let mut failures = Vec::new();
    let mut unreadable = Vec::new();

    for (input, located) in sources {
        let located = match located {
            Ok(located) => located,
            Err(e) => {
                failures.push((input, e));
                continue;
            }
        };

        let walk = match Walk::new(&located.root, filter) {
            Ok(walk) => walk.with_display_prefix(located.display_prefix.clone()),
            Err(e) => {
                tracing::warn!("Skipping source {}: {}", located.input, e);
                failures.push((input, e));
                continue;
            }
        };

        for entry in walk {
            match entry {
                Ok(entry) => {
                    if let FileContent::Unreadable(reason) = &entry.content {
                        unreadable.push(UnreadableEntry {
                            path: entry.path.clone(),
                            error: reason.clone(),
                        });
                    }
                    renderer.push(&entry);
                }
                // The walk could not descend here, so there is no file to render
                Err(e) => {
                    tracing::warn!("Skipping entry under {}: {}", located.input, e);
                    unreadable.push(UnreadableEntry {
                        path: located.input.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }
    }

    if let Some(note) = trailing_note(&failures, &unreadable) {
        renderer.set_trailer(note);
    }

    Flattened {
        files: renderer.count(),
        rendered: renderer.finish(),
        failures,
        unreadable,
    }
}

fn trailing_note(
    failures: &[(String, FlattenError)],
    unreadable: &[UnreadableEntry],
) -> Option<String> {
    let mut note = String::new();
    if !failures.is_empty() {
        note.push_str("Skipped sources:\n");
        for (source, error) in failures {
            note.push_str(&format!("- {}: {}\n", source, error));
        }
    }
    if !unreadable.is_empty() {
        note.push_str("Unreadable entries:\n");
        for entry in unreadable {
            note.push_str(&format!("- {}: {}\n", entry.path, entry.error));
        }
    }
    (!note.is_empty()).then_some(note)
}

fn read_one(root: &Path, requested: String, max_size: u64) -> ReadFileResult {
    let relative = match checked_relative(&requested) {
        Ok(relative) => relative,
        Err(e) => return ReadFileResult::failed(requested, e.to_string()),
    };

    let path = root.join(&relative);
    let display = requested.clone();
    match FileEntry::read(&path, display, crate::paths::to_slash(&relative), max_size) {
        Ok(entry) => match entry.content {
            FileContent::Text(text) => ReadFileResult {
                path: requested,
                content: Some(text),
                binary: false,
                error: None,
            },
            FileContent::Binary => ReadFileResult {
                path: requested,
                content: None,
                binary: true,
                error: None,
            },
            FileContent::Unreadable(reason) => ReadFileResult::failed(requested, reason),
            FileContent::TooLarge => ReadFileResult::failed(
                requested,
                format!(
                    "file is {} bytes, larger than the {} byte limit",
                    entry.size, max_size
                ),
            ),
        },
        Err(e) => {
            tracing::warn!("Could not read {}: {}", requested, e);
            let error = match e {
                // Report the path as requested, not the checkout location
                FlattenError::NotFound(_) => FlattenError::NotFound(requested.clone()),
                FlattenError::PermissionDenied(_) => {
                    FlattenError::PermissionDenied(requested.clone())
                }
                other => other,
            };
            ReadFileResult::failed(requested, error.to_string())
        }
    }
}

/// A path that stays inside the source root
fn checked_relative(requested: &str) -> Result<PathBuf> {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return Err(FlattenError::invalid_input("file path must not be empty"));
    }

    let mut relative = PathBuf::new();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => {
                return Err(FlattenError::invalid_input(format!(
                    "'{}' must be relative to the source root",
                    requested
                )));
            }
        }
    }

    if relative.as_os_str().is_empty() {
        return Err(FlattenError::invalid_input(format!(
            "'{}' does not name a file",
            requested
        )));
    }
    Ok(relative)
}

/// Expand a leading `~` to the home directory
fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

fn secs_since(time: SystemTime) -> u64 {
    time.elapsed().map(|d| d.as_secs()).unwrap_or(0)
}

fn join_error(e: tokio::task::JoinError) -> FlattenError {
    FlattenError::other(format!("background task failed: {}", e))
}
