//! Serializes walked files into a single prompt-ready document
//!
//! Three formats are supported and selected by [`OutputFormat`]:
//!
//! - `default`: path line, `---`, content, blank line, `---`
//! - `cxml`: `<documents>` root with one `<document>` element per file
//! - `markdown`: `## path` heading followed by a fenced code block
//!
//! Binary, oversized and unreadable files always appear by path with a marker
//! in place of their content, so a flatten never fails because of one file.

mod language;

pub use language::fence_language;

use crate::error::FlattenError;
use crate::walker::{FileContent, FileEntry};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const BINARY_MARKER: &str = "[binary content omitted]";

/// Output layout of a rendered document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Path, `---`, content, `---`
    #[default]
    #[serde(alias = "plain")]
    Default,
    /// Claude-style XML documents
    #[serde(alias = "xml")]
    Cxml,
    /// Headings with fenced code blocks
    #[serde(alias = "md")]
    Markdown,
}

impl FromStr for OutputFormat {
    type Err = FlattenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "default" | "plain" => Ok(Self::Default),
            "cxml" | "xml" => Ok(Self::Cxml),
            "markdown" | "md" => Ok(Self::Markdown),
            other => Err(FlattenError::invalid_input(format!(
                "unknown output format '{}' (expected default, cxml or markdown)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Default => "default",
            Self::Cxml => "cxml",
            Self::Markdown => "markdown",
        })
    }
}

/// How to render one document
#[derive(Debug, Clone, Default)]
pub struct RenderSpec {
    pub format: OutputFormat,
    pub line_numbers: bool,
    /// Also write the document here, replacing any existing file
    pub output_file: Option<PathBuf>,
}

impl RenderSpec {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn with_line_numbers(mut self, line_numbers: bool) -> Self {
        self.line_numbers = line_numbers;
        self
    }

    /// An empty path means no file output
    pub fn with_output_file(mut self, output_file: Option<PathBuf>) -> Self {
        self.output_file = output_file.filter(|p| !p.as_os_str().is_empty());
        self
    }
}

/// Result of a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Set when the document could not be written to the requested file.
    /// The text is complete either way.
    pub write_error: Option<String>,
}

/// Incremental renderer: push entries as a walk produces them, then finish.
pub struct Renderer {
    spec: RenderSpec,
    out: String,
    count: usize,
    trailer: Option<String>,
}

impl Renderer {
    pub fn new(spec: RenderSpec) -> Self {
        let mut out = String::new();
        if spec.format == OutputFormat::Cxml {
            out.push_str("<documents>\n");
        }
        Self {
            spec,
            out,
            count: 0,
            trailer: None,
        }
    }

    /// Number of entries rendered so far
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn push(&mut self, entry: &FileEntry) {
        self.count += 1;
        let body = self.body(entry);

        match self.spec.format {
            OutputFormat::Default => {
                let _ = write!(self.out, "{}\n---\n{}\n\n---\n\n", entry.path, body);
            }
            OutputFormat::Cxml => {
                let _ = write!(
                    self.out,
                    "<document index=\"{}\" source=\"{}\">\n{}\n</document>\n",
                    self.count,
                    escape_xml(&entry.path),
                    escape_xml(&body)
                );
            }
            OutputFormat::Markdown => {
                let _ = write!(self.out, "## {}\n\n", entry.path);
                if entry.text().is_some() {
                    let fence = fence_for(&body);
                    let lang = entry.extension().and_then(fence_language).unwrap_or("");
                    let _ = write!(self.out, "{fence}{lang}\n{body}\n{fence}\n\n");
                } else {
                    let _ = write!(self.out, "{}\n\n", body);
                }
            }
        }
    }

    /// Text appended after all entries, outside any document element
    pub fn set_trailer(&mut self, trailer: impl Into<String>) {
        self.trailer = Some(trailer.into());
    }

    /// Close the document and write it to the output file, if any
    pub fn finish(mut self) -> Rendered {
        if self.spec.format == OutputFormat::Cxml {
            self.out.push_str("</documents>\n");
        }
        if let Some(trailer) = self.trailer.take() {
            self.out.push_str(&trailer);
            if !trailer.ends_with('\n') {
                self.out.push('\n');
            }
        }

        let write_error = self
            .spec
            .output_file
            .as_deref()
            .and_then(|path| write_output(path, &self.out).err())
            .map(|e| {
                tracing::warn!("{}", e);
                e.to_string()
            });

        Rendered {
            text: self.out,
            write_error,
        }
    }

    fn body(&self, entry: &FileEntry) -> String {
        match &entry.content {
            FileContent::Text(text) => {
                let text = text.strip_suffix('\n').unwrap_or(text);
                if self.spec.line_numbers {
                    number_lines(text)
                } else {
                    text.to_string()
                }
            }
            FileContent::Binary => BINARY_MARKER.to_string(),
            FileContent::TooLarge => {
                format!("[content omitted: {} bytes exceeds limit]", entry.size)
            }
            FileContent::Unreadable(reason) => format!("[unreadable: {}]", reason),
        }
    }
}

/// Render `entries` in one go
pub fn render<'a>(entries: impl IntoIterator<Item = &'a FileEntry>, spec: RenderSpec) -> Rendered {
    let mut renderer = Renderer::new(spec);
    for entry in entries {
        renderer.push(entry);
    }
    renderer.finish()
}

/// Prefix each line with its 1-based number, right-aligned to the widest one.
///
/// Blank lines, trailing ones included, are numbered too.
pub fn number_lines(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();
    let width = lines.len().to_string().len();
    let mut out = String::with_capacity(text.len() + lines.len() * (width + 2));
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = write!(out, "{:>width$}  {}", i + 1, line);
    }
    out
}

/// Escape text for XML element content and attribute values
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Backtick fence one longer than the longest run inside `body` (minimum 3)
fn fence_for(body: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in body.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

fn write_output(path: &Path, text: &str) -> Result<(), FlattenError> {
    let fail = |e: std::io::Error| {
        FlattenError::Render(format!("failed to write {}: {}", path.display(), e))
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(fail)?;
    }
    std::fs::write(path, text).map_err(fail)?;
    tracing::info!("Wrote {} bytes to {:?}", text.len(), path);
    Ok(())
}
