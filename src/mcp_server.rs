use crate::client::FlattenClient;
use crate::types::*;

use anyhow::{Context, Result};
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
    handler::server::{router::prompt::PromptRouter, tool::ToolRouter, wrapper::Parameters},
    model::*,
    prompt, prompt_handler, prompt_router,
    service::RequestContext,
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct FlattenMcpServer {
    client: Arc<FlattenClient>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl FlattenMcpServer {
    /// Create a new server with configuration from file, environment and defaults
    pub fn new() -> Result<Self> {
        let client = FlattenClient::new().context("Failed to create flatten client")?;
        Ok(Self::with_client(Arc::new(client)))
    }

    /// Create a new server around an existing client
    pub fn with_client(client: Arc<FlattenClient>) -> Self {
        Self {
            client,
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }

    /// Get the underlying client
    pub fn client(&self) -> &FlattenClient {
        &self.client
    }
}

#[tool_router(router = tool_router)]
impl FlattenMcpServer {
    #[tool(
        description = "Get the directory tree of a git repository or local directory. Accepts a local path or a remote reference such as https://github.com/org/repo, github.com/org/repo or git@github.com:org/repo.git. Remote repositories are shallow-cloned once and reused."
    )]
    async fn git_directory_structure(
        &self,
        Parameters(req): Parameters<DirectoryStructureRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        self.client
            .directory_structure(&req.source)
            .await
            .map_err(|e| format!("{:#}", e))
    }

    #[tool(
        description = "Read specific files from a git repository or local directory. Paths are relative to the repository root. Returns a JSON array in request order; files that cannot be read carry an error instead of content, and binary files are flagged."
    )]
    async fn git_read_files(
        &self,
        Parameters(req): Parameters<ReadFilesRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let results = self
            .client
            .read_files(&req.source, req.file_paths)
            .await
            .map_err(|e| format!("{:#}", e))?;

        serde_json::to_string_pretty(&results).map_err(|e| format!("Serialization failed: {}", e))
    }

    #[tool(
        description = "Flatten local paths and/or git repositories into a single prompt-ready document. Supports extension filters, hidden files, ignore globs, .gitignore handling, line numbers and three output formats: default, cxml (XML documents) and markdown (fenced code blocks). Sources that fail are listed at the end."
    )]
    async fn files_to_prompt(
        &self,
        Parameters(req): Parameters<FlattenRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .flatten(req)
            .await
            .map_err(|e| format!("{:#}", e))?;

        Ok(response.into_tool_text())
    }

    #[tool(
        description = "Clone a remote git repository (or reuse a recent clone) and flatten its files into a single prompt-ready document."
    )]
    async fn git_files_to_prompt(
        &self,
        Parameters(req): Parameters<CloneFlattenRequest>,
    ) -> Result<String, String> {
        req.validate()?;

        let response = self
            .client
            .clone_and_flatten(req)
            .await
            .map_err(|e| format!("{:#}", e))?;

        Ok(response.into_tool_text())
    }

    #[tool(
        description = "List the repository clones held by this server, with their age and whether the next call will reuse them"
    )]
    async fn list_repo_cache(
        &self,
        Parameters(_req): Parameters<ListCacheRequest>,
    ) -> Result<String, String> {
        let response = self.client.list_cache().await;
        serde_json::to_string_pretty(&response).map_err(|e| format!("Serialization failed: {}", e))
    }

    #[tool(description = "Delete all cached repository clones so the next call fetches fresh copies")]
    async fn clear_repo_cache(
        &self,
        Parameters(_req): Parameters<ClearCacheRequest>,
    ) -> Result<String, String> {
        let response = self
            .client
            .clear_cache()
            .await
            .map_err(|e| format!("{:#}", e))?;

        serde_json::to_string_pretty(&response).map_err(|e| format!("Serialization failed: {}", e))
    }
}

// Prompts for slash commands
#[prompt_router]
impl FlattenMcpServer {
    #[prompt(
        name = "flatten",
        description = "Flatten a repository or directory into a single document for the conversation"
    )]
    async fn flatten_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<GetPromptResult, McpError> {
        let source = args.get("source").and_then(|v| v.as_str()).unwrap_or(".");
        let format = args
            .get("format")
            .and_then(|v| v.as_str())
            .unwrap_or("markdown");

        let messages = vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Please use files_to_prompt to flatten '{}' with output_format '{}', then use the result as context.",
                source, format
            ),
        )];

        Ok(GetPromptResult {
            description: Some(format!("Flatten {} as {}", source, format)),
            messages,
        })
    }

    #[prompt(
        name = "structure",
        description = "Show the directory tree of a repository or directory"
    )]
    async fn structure_prompt(
        &self,
        Parameters(args): Parameters<serde_json::Value>,
    ) -> Result<Vec<PromptMessage>, McpError> {
        let source = args.get("source").and_then(|v| v.as_str()).unwrap_or(".");

        Ok(vec![PromptMessage::new_text(
            PromptMessageRole::User,
            format!(
                "Please use git_directory_structure to show the directory tree of '{}'.",
                source
            ),
        )])
    }
}

#[tool_handler(router = self.tool_router)]
#[prompt_handler]
impl ServerHandler for FlattenMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .build(),
            server_info: Implementation {
                name: "git-flatten".into(),
                title: Some("Git Flatten - Repositories as Prompt Context".into()),
                version: env!("CARGO_PKG_VERSION").into(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Turns local directories and remote git repositories into prompt-ready text. \
                Use git_directory_structure to explore a repository, git_read_files to read specific files, \
                files_to_prompt to flatten one or more sources and git_files_to_prompt to clone and flatten in one step. \
                Remote clones are cached; clear_repo_cache discards them."
                    .into(),
            ),
        }
    }
}

impl FlattenMcpServer {
    pub async fn serve_stdio() -> Result<()> {
        let server = Self::new().context("Failed to create MCP server")?;
        server.run_stdio().await
    }

    /// Serve this instance over stdio until the client disconnects
    pub async fn run_stdio(self) -> Result<()> {
        tracing::info!("Starting git-flatten MCP server");

        let transport = rmcp::transport::io::stdio();

        self.serve(transport).await?.waiting().await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;
