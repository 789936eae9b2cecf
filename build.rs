use std::process::Command;

/// Short hash of the commit being built, if this is a git checkout.
fn commit_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout)
        .ok()
        .map(|s| s.trim().to_string())
}

fn main() {
    let built_at = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let commit = commit_hash().unwrap_or_else(|| "unknown".to_string());

    // Consumed by `git-flatten --version`
    println!(
        "cargo:rustc-env=GIT_FLATTEN_LONG_VERSION={} ({}, built {})",
        env!("CARGO_PKG_VERSION"),
        commit,
        built_at
    );

    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
