//! Token provider backed by the `gcloud` CLI.

use super::{AccessToken, TokenProvider};
use crate::error::{Result, RuntimeConfigError};
use async_trait::async_trait;
use tokio::process::Command;

/// Asks the locally installed Cloud SDK for a token.
///
/// Meant for development machines. The token carries whatever scopes the
/// active `gcloud` account was authorized with, so the requested scopes are
/// not forwarded.
pub struct GcloudCli {
    program: String,
}

impl GcloudCli {
    /// Use `gcloud` from `PATH`.
    pub fn new() -> Self {
        Self::with_program("gcloud")
    }

    /// Use a specific executable.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for GcloudCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenProvider for GcloudCli {
    async fn access_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
        let output = Command::new(&self.program)
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| {
                RuntimeConfigError::Credentials(format!("Failed to run {}: {}", self.program, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RuntimeConfigError::Credentials(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(RuntimeConfigError::Credentials(format!(
                "{} printed an empty token",
                self.program
            )));
        }

        Ok(AccessToken::new(token))
    }

    fn name(&self) -> String {
        format!("gcloud:{}", self.program)
    }
}
