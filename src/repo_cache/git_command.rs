//! Shallow clones through the system `git` executable
//!
//! Using the executable rather than libgit2 for the network side picks up
//! whatever the user already has configured: SSH keys and agents, credential
//! helpers, proxies and `insteadOf` rewrites from ~/.gitconfig.

use super::Cloner;
use crate::error::CloneError;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Clones with `git clone --depth 1` of the default branch
#[derive(Debug, Clone)]
pub struct GitCommandCloner {
    program: String,
    timeout: Duration,
}

impl GitCommandCloner {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Cloner for GitCommandCloner {
    async fn clone_shallow(&self, url: &str, target: &Path) -> Result<(), CloneError> {
        tracing::info!("Cloning {} into {}", url, target.display());

        let child = Command::new(&self.program)
            .args([
                "clone",
                "--depth",
                "1",
                "--single-branch",
                "--no-tags",
                "--quiet",
                "--",
                url,
            ])
            .arg(target)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CloneError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?;

        // Dropping the future on timeout drops the child, which kills it
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| CloneError::Spawn {
                program: self.program.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => {
                tracing::warn!("Clone of {} timed out after {:?}", url, self.timeout);
                return Err(CloneError::TimedOut {
                    url: url.to_string(),
                    secs: self.timeout.as_secs(),
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!("git clone of {} exited with {}", url, output.status);
            return Err(CloneError::Failed {
                url: url.to_string(),
                message: describe_failure(stderr.trim()),
            });
        }

        if !target.join(".git").exists() {
            return Err(CloneError::NotACheckout(url.to_string()));
        }

        Ok(())
    }
}

/// Add a hint to the common authentication failures
fn describe_failure(stderr: &str) -> String {
    let auth_failure = stderr.contains("Authentication failed")
        || stderr.contains("Permission denied")
        || stderr.contains("could not read Username")
        || stderr.contains("Could not read from remote repository");

    if auth_failure {
        format!(
            "authentication failed or repository is private. \
            Make sure an SSH key or git credential helper grants access. \
            git said: {}",
            stderr
        )
    } else if stderr.is_empty() {
        "git exited without a diagnostic".to_string()
    } else {
        stderr.to_string()
    }
}
