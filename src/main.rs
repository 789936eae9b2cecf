//! # git-flatten
//!
//! Runs the MCP server over stdio by default. The subcommands run the same
//! operations once from the command line and print the result to stdout.

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use git_flatten::config::Config;
use git_flatten::mcp_server::FlattenMcpServer;
use git_flatten::{FlattenClient, FlattenRequest, OutputFormat};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Flatten local directories and git repositories into prompt-ready text
#[derive(Parser, Debug)]
#[command(name = "git-flatten")]
#[command(version, long_version = env!("GIT_FLATTEN_LONG_VERSION"), about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding cloned repositories
    #[arg(long, global = true, env = "GIT_FLATTEN_CACHE_DIR", value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Seconds a clone is reused before fetching again (0 = forever)
    #[arg(long, global = true, env = "GIT_FLATTEN_FRESHNESS_SECS", value_name = "SECS")]
    freshness_secs: Option<u64>,

    /// Files larger than this many bytes are listed without content
    #[arg(long, global = true, env = "GIT_FLATTEN_MAX_FILE_SIZE", value_name = "BYTES")]
    max_file_size: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server over stdio (default)
    Serve,
    /// Flatten paths and repositories into one document
    Flatten(FlattenArgs),
    /// Print the directory tree of a path or repository
    Tree {
        source: String,
    },
    /// Print specific files from a path or repository as JSON
    Read {
        source: String,
        #[arg(required = true)]
        files: Vec<String>,
    },
    /// List cached clones as JSON
    ListCache,
    /// Delete all cached clones
    ClearCache,
}

#[derive(Args, Debug)]
struct FlattenArgs {
    /// Local paths or remote repository references
    #[arg(required = true)]
    sources: Vec<String>,

    /// Only include files with this extension (repeatable)
    #[arg(short, long = "extension", value_name = "EXT")]
    extensions: Vec<String>,

    /// Include files and directories starting with '.'
    #[arg(long)]
    include_hidden: bool,

    /// Skip entries whose name matches this glob (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    ignore_patterns: Vec<String>,

    /// Apply --ignore patterns to files only
    #[arg(long)]
    ignore_files_only: bool,

    /// Do not honor .gitignore files
    #[arg(long)]
    ignore_gitignore: bool,

    /// Output format
    #[arg(short, long, value_name = "FORMAT", default_value = "default")]
    format: String,

    /// Prefix lines with their line number
    #[arg(short = 'n', long)]
    line_numbers: bool,

    /// Write the output to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config = Config::new().context("Failed to load configuration")?;
        if let Some(dir) = &self.cache_dir {
            config.cache.root = dir.clone();
        }
        if let Some(secs) = self.freshness_secs {
            config.cache.freshness_secs = secs;
        }
        if let Some(size) = self.max_file_size {
            config.walk.max_file_size = size;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the MCP transport or command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = FlattenClient::with_config(cli.config()?)?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            FlattenMcpServer::with_client(Arc::new(client))
                .run_stdio()
                .await
        }
        Commands::Flatten(args) => flatten(&client, &args).await,
        Commands::Tree { source } => {
            print!("{}", client.directory_structure(&source).await?);
            Ok(())
        }
        Commands::Read { source, files } => {
            let results = client.read_files(&source, files).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
            Ok(())
        }
        Commands::ListCache => {
            let listing = client.list_cache().await;
            println!("{}", serde_json::to_string_pretty(&listing)?);
            Ok(())
        }
        Commands::ClearCache => {
            let response = client.clear_cache().await?;
            println!("{}", response.message);
            Ok(())
        }
    }
}

async fn flatten(client: &FlattenClient, args: &FlattenArgs) -> Result<()> {
    let format: OutputFormat = args.format.parse()?;

    let mut req = FlattenRequest::new(args.sources.iter().cloned());
    req.extensions = args.extensions.clone();
    req.include_hidden = args.include_hidden;
    req.ignore_patterns = args.ignore_patterns.clone();
    req.ignore_files_only = args.ignore_files_only;
    req.ignore_gitignore = args.ignore_gitignore;
    req.output_format = format;
    req.include_line_numbers = args.line_numbers;
    req.output_file = args
        .output
        .as_ref()
        .map(|p| p.to_string_lossy().into_owned());

    let response = client.flatten(req).await?;

    for skipped in &response.skipped {
        tracing::warn!("Skipped {}: {}", skipped.source, skipped.error);
    }
    for entry in &response.unreadable {
        tracing::warn!("Unreadable {}: {}", entry.path, entry.error);
    }
    if let Some(error) = response.write_error {
        bail!("{}", error);
    }
    if args.output.is_none() {
        print!("{}", response.text);
    }

    Ok(())
}
