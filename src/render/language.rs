//! Code fence language tags from file extensions

/// Fence info string for a file extension, if it is a recognized language
pub fn fence_language(extension: &str) -> Option<&'static str> {
    let lang = match extension.to_lowercase().as_str() {
        // Programming languages
        "rs" => "rust",
        "py" | "pyi" => "python",
        "js" | "mjs" | "cjs" => "javascript",
        "ts" | "mts" | "cts" => "typescript",
        "jsx" => "jsx",
        "tsx" => "tsx",
        "java" => "java",
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => "cpp",
        "c" | "h" => "c",
        "cs" => "csharp",
        "go" => "go",
        "rb" => "ruby",
        "php" => "php",
        "swift" => "swift",
        "kt" | "kts" => "kotlin",
        "scala" => "scala",
        "lua" => "lua",
        "sh" | "bash" | "zsh" => "bash",
        "ps1" => "powershell",
        "sql" => "sql",

        // Web
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "vue" => "vue",
        "svelte" => "svelte",

        // Data and config
        "json" => "json",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "xml" => "xml",
        "ini" | "cfg" => "ini",
        "proto" => "protobuf",
        "graphql" | "gql" => "graphql",
        "dockerfile" => "dockerfile",

        // Documentation
        "md" | "markdown" => "markdown",
        "rst" => "rst",
        "tex" => "latex",
        "diff" | "patch" => "diff",

        _ => return None,
    };

    Some(lang)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fence_language_common() {
        assert_eq!(fence_language("rs"), Some("rust"));
        assert_eq!(fence_language("py"), Some("python"));
        assert_eq!(fence_language("md"), Some("markdown"));
        assert_eq!(fence_language("yml"), Some("yaml"));
    }

    #[test]
    fn test_fence_language_case_insensitive() {
        assert_eq!(fence_language("RS"), Some("rust"));
        assert_eq!(fence_language("Json"), Some("json"));
    }

    #[test]
    fn test_fence_language_headers() {
        assert_eq!(fence_language("h"), Some("c"));
        assert_eq!(fence_language("hpp"), Some("cpp"));
    }

    #[test]
    fn test_fence_language_unknown() {
        assert_eq!(fence_language("bin"), None);
        assert_eq!(fence_language("txt"), None);
        assert_eq!(fence_language(""), None);
    }
}
