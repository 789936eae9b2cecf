use super::*;
use crate::config::Config;
use crate::render::OutputFormat;
use crate::repo_cache::RepoCache;
use crate::repo_cache::tests::FakeCloner;
use std::time::Duration;
use tempfile::TempDir;

const REPO: &str = "https://example.com/org/repo";

fn create_test_server() -> (FlattenMcpServer, Arc<FakeCloner>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let cloner = Arc::new(FakeCloner::with_files([
        ("README.md", b"# Repo\n".as_slice()),
        ("main.bin", b"\x00\xff".as_slice()),
    ]));
    let cache = RepoCache::with_cloner(
        temp_dir.path().join("repos"),
        None,
        Duration::from_secs(5),
        cloner.clone(),
    );
    let client = FlattenClient::with_cache(Config::default(), Arc::new(cache));
    (FlattenMcpServer::with_client(Arc::new(client)), cloner, temp_dir)
}

#[tokio::test]
async fn test_get_info() {
    let (server, _cloner, _dir) = create_test_server();
    let info = server.get_info();

    assert_eq!(info.server_info.name, "git-flatten");
    assert!(info.server_info.title.is_some());
    assert!(info.instructions.is_some());
    assert!(info.capabilities.tools.is_some());
    assert!(info.capabilities.prompts.is_some());
}

#[tokio::test]
async fn test_tools_registered() {
    let (server, _cloner, _dir) = create_test_server();
    let mut names: Vec<String> = server
        .tool_router
        .list_all()
        .into_iter()
        .map(|tool| tool.name.to_string())
        .collect();
    names.sort();

    assert_eq!(
        names,
        [
            "clear_repo_cache",
            "files_to_prompt",
            "git_directory_structure",
            "git_files_to_prompt",
            "git_read_files",
            "list_repo_cache",
        ]
    );
}

#[tokio::test]
async fn test_directory_structure_tool() {
    let (server, _cloner, _dir) = create_test_server();
    let tree = server
        .git_directory_structure(Parameters(DirectoryStructureRequest {
            source: REPO.to_string(),
        }))
        .await
        .unwrap();
    assert_eq!(tree, "repo/\n  README.md\n  main.bin\n");
}

#[tokio::test]
async fn test_directory_structure_tool_rejects_blank_source() {
    let (server, cloner, _dir) = create_test_server();
    let err = server
        .git_directory_structure(Parameters(DirectoryStructureRequest {
            source: "".to_string(),
        }))
        .await
        .unwrap_err();
    assert!(err.contains("source"));
    assert_eq!(cloner.calls(), 0);
}

#[tokio::test]
async fn test_read_files_tool_returns_json_in_order() {
    let (server, _cloner, _dir) = create_test_server();
    let json = server
        .git_read_files(Parameters(ReadFilesRequest {
            source: REPO.to_string(),
            file_paths: vec![
                "README.md".to_string(),
                "missing.txt".to_string(),
                "main.bin".to_string(),
            ],
        }))
        .await
        .unwrap();

    let results: Vec<ReadFileResult> = serde_json::from_str(&json).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].content.as_deref(), Some("# Repo\n"));
    assert_eq!(results[1].error.as_deref(), Some("Not found: missing.txt"));
    assert!(results[2].binary);
}

#[tokio::test]
async fn test_files_to_prompt_tool() {
    let (server, cloner, _dir) = create_test_server();
    let mut req = FlattenRequest::new([REPO]);
    req.extensions = vec!["md".to_string()];
    req.output_format = OutputFormat::Markdown;

    let text = server.files_to_prompt(Parameters(req)).await.unwrap();

    assert_eq!(text.matches("```markdown").count(), 1);
    assert!(text.starts_with("## README.md\n"));
    assert!(!text.contains("main.bin"));
    assert_eq!(cloner.calls(), 1);
}

#[tokio::test]
async fn test_files_to_prompt_tool_reports_write_failure() {
    let (server, _cloner, dir) = create_test_server();
    let mut req = FlattenRequest::new([REPO]);
    // The cache root is a directory, so it cannot be written as a file
    req.output_file = Some(dir.path().to_string_lossy().into_owned());

    let text = server.files_to_prompt(Parameters(req)).await.unwrap();
    assert!(text.starts_with("README.md\n---\n"));
    assert!(text.contains("[output file not written: Render error"));
}

#[tokio::test]
async fn test_files_to_prompt_tool_error_names_input() {
    let (server, _cloner, _dir) = create_test_server();
    let err = server
        .files_to_prompt(Parameters(FlattenRequest::new(["/nonexistent/tool/input"])))
        .await
        .unwrap_err();
    assert!(err.contains("/nonexistent/tool/input"));
}

#[tokio::test]
async fn test_git_files_to_prompt_tool() {
    let (server, _cloner, _dir) = create_test_server();
    let req = CloneFlattenRequest {
        repo_url: "git@example.com:org/repo.git".to_string(),
        extensions: vec![],
        include_hidden: false,
        ignore_patterns: vec!["*.bin".to_string()],
        output_format: OutputFormat::Cxml,
        include_line_numbers: false,
    };

    let text = server.git_files_to_prompt(Parameters(req)).await.unwrap();
    assert_eq!(
        text,
        "<documents>\n<document index=\"1\" source=\"README.md\">\n# Repo\n</document>\n</documents>\n"
    );
}

#[tokio::test]
async fn test_git_files_to_prompt_tool_rejects_local_path() {
    let (server, cloner, _dir) = create_test_server();
    let req = CloneFlattenRequest {
        repo_url: "/tmp/some/dir".to_string(),
        extensions: vec![],
        include_hidden: false,
        ignore_patterns: vec![],
        output_format: OutputFormat::Default,
        include_line_numbers: false,
    };

    let err = server.git_files_to_prompt(Parameters(req)).await.unwrap_err();
    assert!(err.starts_with("Invalid input"));
    assert_eq!(cloner.calls(), 0);
}

#[tokio::test]
async fn test_list_repo_cache_tool() {
    let (server, _cloner, _dir) = create_test_server();
    let empty: ListCacheResponse = serde_json::from_str(
        &server
            .list_repo_cache(Parameters(ListCacheRequest {}))
            .await
            .unwrap(),
    )
    .unwrap();
    assert!(empty.repositories.is_empty());

    server
        .git_directory_structure(Parameters(DirectoryStructureRequest {
            source: REPO.to_string(),
        }))
        .await
        .unwrap();

    let json = server
        .list_repo_cache(Parameters(ListCacheRequest {}))
        .await
        .unwrap();
    let response: ListCacheResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(response.repositories.len(), 1);
    assert_eq!(response.repositories[0].url, "https://example.com/org/repo");
    assert!(response.repositories[0].fresh);
}

#[tokio::test]
async fn test_clear_repo_cache_tool() {
    let (server, _cloner, _dir) = create_test_server();
    server
        .git_directory_structure(Parameters(DirectoryStructureRequest {
            source: REPO.to_string(),
        }))
        .await
        .unwrap();

    let json = server
        .clear_repo_cache(Parameters(ClearCacheRequest {}))
        .await
        .unwrap();
    let response: ClearCacheResponse = serde_json::from_str(&json).unwrap();
    assert_eq!(response.removed, 1);
}

#[tokio::test]
async fn test_flatten_prompt() {
    let (server, _cloner, _dir) = create_test_server();
    let result = server
        .flatten_prompt(Parameters(serde_json::json!({"source": REPO, "format": "cxml"})))
        .await
        .unwrap();

    assert_eq!(result.messages.len(), 1);
    assert!(result.description.unwrap().contains(REPO));
}

#[tokio::test]
async fn test_structure_prompt_defaults_to_current_dir() {
    let (server, _cloner, _dir) = create_test_server();
    let messages = server
        .structure_prompt(Parameters(serde_json::json!({})))
        .await
        .unwrap();
    assert_eq!(messages.len(), 1);
}
