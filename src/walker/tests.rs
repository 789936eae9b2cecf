//! Tests for Walk and directory_tree

use super::*;
use std::collections::BTreeSet;
use tempfile::TempDir;

/// Tree with hidden files, gitignored files, pattern-ignored files,
/// extension mismatches and a binary file.
fn fixture() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    for sub in [".config", "build", "logs", "src", ".git"] {
        fs::create_dir_all(root.join(sub)).unwrap();
    }
    fs::write(root.join(".gitignore"), "ignored.txt\nbuild/\n").unwrap();
    fs::write(root.join(".hidden.txt"), "secret").unwrap();
    fs::write(root.join(".config/settings.txt"), "k=v").unwrap();
    fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    fs::write(root.join("README.md"), "# Title\n").unwrap();
    fs::write(root.join("ignored.txt"), "ignored").unwrap();
    fs::write(root.join("build/out.txt"), "artifact").unwrap();
    fs::write(root.join("logs/app.log"), "log line").unwrap();
    fs::write(root.join("notes.log"), "note").unwrap();
    fs::write(root.join("src/main.rs"), "fn main() {}\n").unwrap();
    fs::write(root.join("src/lib.rs"), "pub fn lib() {}\n").unwrap();
    fs::write(root.join("src/data.bin"), [0u8, 159, 146, 150, 0, 1]).unwrap();
    dir
}

fn paths(root: &Path, spec: &FilterSpec) -> Vec<String> {
    Walk::new(root, spec)
        .unwrap()
        .map(|entry| entry.unwrap().path)
        .collect()
}

fn strict_spec() -> FilterSpec {
    FilterSpec::new()
        .with_extensions(["rs", "md", "txt"])
        .with_ignore_patterns(["*.log", "logs"])
}

fn assert_superset(relaxed: &[String], strict: &[String]) {
    let relaxed: BTreeSet<_> = relaxed.iter().collect();
    for path in strict {
        assert!(relaxed.contains(path), "{path} missing from relaxed walk");
    }
}

#[test]
fn test_walk_nonexistent_root() {
    let result = Walk::new("/nonexistent/path/12345", &FilterSpec::new());
    assert!(matches!(result, Err(FlattenError::NotFound(_))));
}

#[test]
fn test_walk_empty_directory() {
    let temp_dir = TempDir::new().unwrap();
    assert!(paths(temp_dir.path(), &FilterSpec::new()).is_empty());
}

#[test]
fn test_all_filters_active() {
    let dir = fixture();
    assert_eq!(
        paths(dir.path(), &strict_spec()),
        vec!["README.md", "src/lib.rs", "src/main.rs"]
    );
}

#[test]
fn test_relaxing_hidden_is_superset() {
    let dir = fixture();
    let strict = paths(dir.path(), &strict_spec());
    let relaxed = paths(dir.path(), &strict_spec().with_hidden(true));

    assert_superset(&relaxed, &strict);
    assert!(relaxed.contains(&".hidden.txt".to_string()));
    assert!(relaxed.contains(&".config/settings.txt".to_string()));
}

#[test]
fn test_relaxing_gitignore_is_superset() {
    let dir = fixture();
    let strict = paths(dir.path(), &strict_spec());
    let relaxed = paths(dir.path(), &strict_spec().with_ignore_gitignore(true));

    assert_superset(&relaxed, &strict);
    assert!(relaxed.contains(&"ignored.txt".to_string()));
    assert!(relaxed.contains(&"build/out.txt".to_string()));
}

#[test]
fn test_relaxing_patterns_is_superset() {
    let dir = fixture();
    let strict = paths(dir.path(), &strict_spec());
    let spec = strict_spec()
        .with_ignore_patterns(Vec::<String>::new())
        .with_extensions(["rs", "md", "txt", "log"]);
    let relaxed = paths(dir.path(), &spec);

    assert_superset(&relaxed, &strict);
    assert!(relaxed.contains(&"logs/app.log".to_string()));
    assert!(relaxed.contains(&"notes.log".to_string()));
}

#[test]
fn test_relaxing_extensions_is_superset() {
    let dir = fixture();
    let strict = paths(dir.path(), &strict_spec());
    let relaxed = paths(
        dir.path(),
        &strict_spec().with_extensions(Vec::<String>::new()),
    );

    assert_superset(&relaxed, &strict);
    assert!(relaxed.contains(&"src/data.bin".to_string()));
}

#[test]
fn test_ignore_files_only_keeps_directories() {
    let dir = fixture();
    let pruned = paths(dir.path(), &FilterSpec::new().with_ignore_patterns(["logs"]));
    assert!(!pruned.iter().any(|p| p.starts_with("logs/")));

    let kept = paths(
        dir.path(),
        &FilterSpec::new()
            .with_ignore_patterns(["logs"])
            .with_ignore_files_only(true),
    );
    assert!(kept.contains(&"logs/app.log".to_string()));
}

#[test]
fn test_ignore_files_only_still_filters_files() {
    let dir = fixture();
    let result = paths(
        dir.path(),
        &FilterSpec::new()
            .with_ignore_patterns(["*.log"])
            .with_ignore_files_only(true),
    );
    assert!(!result.iter().any(|p| p.ends_with(".log")));
}

#[test]
fn test_git_directory_never_walked() {
    let dir = fixture();
    let result = paths(
        dir.path(),
        &FilterSpec::new()
            .with_hidden(true)
            .with_ignore_gitignore(true),
    );
    assert!(!result.iter().any(|p| p.starts_with(".git/")));
    assert!(result.contains(&".gitignore".to_string()));
}

#[test]
fn test_order_is_deterministic_and_sorted() {
    let dir = fixture();
    let spec = FilterSpec::new().with_hidden(true).with_ignore_gitignore(true);
    let first = paths(dir.path(), &spec);
    let second = paths(dir.path(), &spec);
    assert_eq!(first, second);

    let src: Vec<_> = first.iter().filter(|p| p.starts_with("src/")).collect();
    assert_eq!(src, ["src/data.bin", "src/lib.rs", "src/main.rs"]);
}

#[test]
fn test_nearest_gitignore_wins() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("sub")).unwrap();
    fs::write(root.join(".gitignore"), "*.txt\n").unwrap();
    fs::write(root.join("sub/.gitignore"), "!keep.txt\n").unwrap();
    fs::write(root.join("top.txt"), "x").unwrap();
    fs::write(root.join("sub/keep.txt"), "x").unwrap();
    fs::write(root.join("sub/drop.txt"), "x").unwrap();

    assert_eq!(paths(root, &FilterSpec::new()), vec!["sub/keep.txt"]);
}

#[test]
fn test_binary_and_invalid_utf8_marked() {
    let dir = fixture();
    fs::write(dir.path().join("src/latin1.txt"), [0x63, 0x61, 0x66, 0xe9]).unwrap();

    let entries: Vec<FileEntry> = Walk::new(dir.path().join("src"), &FilterSpec::new())
        .unwrap()
        .map(|e| e.unwrap())
        .collect();

    let data = entries.iter().find(|e| e.path == "data.bin").unwrap();
    assert!(data.is_binary());
    assert_eq!(data.size, 6);

    let latin1 = entries.iter().find(|e| e.path == "latin1.txt").unwrap();
    assert_eq!(latin1.content, FileContent::Binary);

    let main = entries.iter().find(|e| e.path == "main.rs").unwrap();
    assert_eq!(main.text(), Some("fn main() {}\n"));
}

#[test]
fn test_decode_strips_bom() {
    let mut bytes = UTF8_BOM.to_vec();
    bytes.extend_from_slice(b"hello");
    assert_eq!(decode(bytes), FileContent::Text("hello".to_string()));
}

#[test]
fn test_large_file_content_omitted() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("small.txt"), "small").unwrap();
    fs::write(dir.path().join("large.txt"), "a".repeat(2000)).unwrap();

    let entries: Vec<FileEntry> = Walk::new(dir.path(), &FilterSpec::new().with_max_file_size(100))
        .unwrap()
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].path, "large.txt");
    assert_eq!(entries[0].content, FileContent::TooLarge);
    assert_eq!(entries[0].size, 2000);
    assert_eq!(entries[1].text(), Some("small"));
}

#[cfg(unix)]
#[test]
fn test_unreadable_file_is_listed_with_reason() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "A").unwrap();
    let secret = dir.path().join("secret.txt");
    fs::write(&secret, "hidden").unwrap();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users can read it anyway
    if fs::read(&secret).is_ok() {
        return;
    }

    let entries: Vec<FileEntry> = Walk::new(dir.path(), &FilterSpec::new())
        .unwrap()
        .map(|e| e.unwrap())
        .collect();
    fs::set_permissions(&secret, fs::Permissions::from_mode(0o644)).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].text(), Some("A"));
    assert_eq!(entries[1].path, "secret.txt");
    match &entries[1].content {
        FileContent::Unreadable(reason) => assert!(reason.starts_with("Permission denied")),
        other => panic!("expected unreadable content, got {:?}", other),
    }
}

#[test]
fn test_display_prefix() {
    let dir = fixture();
    let walk = Walk::new(dir.path(), &strict_spec())
        .unwrap()
        .with_display_prefix(Some(PathBuf::from("project")));
    let entries: Vec<FileEntry> = walk.map(|e| e.unwrap()).collect();

    assert_eq!(entries[0].path, "project/README.md");
    assert_eq!(entries[0].relative_path, "README.md");
    assert_eq!(entries[2].path, "project/src/main.rs");
}

#[test]
fn test_dot_prefix_is_ignored() {
    let dir = fixture();
    let walk = Walk::new(dir.path(), &strict_spec())
        .unwrap()
        .with_display_prefix(Some(PathBuf::from("./.")));
    let first = walk.map(|e| e.unwrap()).next().unwrap();
    assert_eq!(first.path, "README.md");
}

#[test]
fn test_file_root_yields_that_file() {
    let dir = fixture();
    let file = dir.path().join("src/main.rs");
    let entries: Vec<FileEntry> = Walk::new(&file, &FilterSpec::new().with_extensions(["md"]))
        .unwrap()
        .with_display_prefix(Some(PathBuf::from("src/main.rs")))
        .map(|e| e.unwrap())
        .collect();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "src/main.rs");
    assert_eq!(entries[0].relative_path, "main.rs");
}

#[test]
fn test_walk_is_lazy_and_stoppable() {
    let dir = fixture();
    let mut walk = Walk::new(dir.path(), &strict_spec()).unwrap();
    let first = walk.next().unwrap().unwrap();
    assert_eq!(first.path, "README.md");
    drop(walk);

    // A fresh walk starts over
    let again = Walk::new(dir.path(), &strict_spec()).unwrap().next().unwrap().unwrap();
    assert_eq!(again.path, "README.md");
}

#[test]
fn test_invalid_pattern_rejected() {
    let dir = fixture();
    let result = Walk::new(dir.path(), &FilterSpec::new().with_ignore_patterns(["a[b"]));
    assert!(matches!(result, Err(FlattenError::InvalidInput(_))));
}

#[test]
fn test_directory_tree() {
    let dir = fixture();
    let tree = directory_tree(dir.path(), "repo", &FilterSpec::new()).unwrap();

    assert_eq!(
        tree,
        "repo/\n\
         \x20\x20README.md\n\
         \x20\x20logs/\n\
         \x20\x20\x20\x20app.log\n\
         \x20\x20notes.log\n\
         \x20\x20src/\n\
         \x20\x20\x20\x20data.bin\n\
         \x20\x20\x20\x20lib.rs\n\
         \x20\x20\x20\x20main.rs\n"
    );
}

#[test]
fn test_directory_tree_with_hidden() {
    let dir = fixture();
    let tree = directory_tree(dir.path(), "repo", &FilterSpec::new().with_hidden(true)).unwrap();
    assert!(tree.contains("  .config/\n    settings.txt\n"));
    assert!(tree.contains("  .gitignore\n"));
    assert!(!tree.contains(".git/"));
    assert!(!tree.contains("build/"));
}

#[test]
fn test_directory_tree_missing_root() {
    let result = directory_tree(Path::new("/nonexistent/tree/root"), "x", &FilterSpec::new());
    assert!(matches!(result, Err(FlattenError::NotFound(_))));
}
