//! Browser executor - wraps agent-browser CLI
//!
//! Provides async interface to the handful of agent-browser commands the
//! pipeline needs.

use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::trace;

use crate::capability::browser::snapshot::Snapshot;
use crate::capability::scripts::decode_eval_output;
use crate::core::{ExtractError, Result};

/// Executor for browser automation via agent-browser CLI
#[derive(Debug, Clone)]
pub struct BrowserExecutor {
    /// Session name for isolation
    session_name: String,
    /// Whether to run in headed mode
    headed: bool,
    /// Per-command timeout
    timeout: Duration,
}

impl BrowserExecutor {
    /// Create a new browser executor
    pub fn new(session_name: impl Into<String>) -> Self {
        Self {
            session_name: session_name.into(),
            headed: false,
            timeout: Duration::from_millis(30_000),
        }
    }

    /// Set headed mode
    pub fn headed(mut self, headed: bool) -> Self {
        self.headed = headed;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Check if agent-browser is installed
    pub async fn is_available() -> bool {
        Command::new("agent-browser")
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    /// Run an agent-browser command
    async fn run_command(&self, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("agent-browser");
        cmd.args(["--session", &self.session_name]);

        if self.headed {
            cmd.arg("--headed");
        }

        cmd.args(args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        trace!(session = %self.session_name, command = ?args.first(), "agent-browser");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                ExtractError::browser(format!(
                    "agent-browser {} timed out after {}ms",
                    args.first().copied().unwrap_or_default(),
                    self.timeout.as_millis()
                ))
            })?
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ExtractError::AgentBrowserNotFound
                } else {
                    ExtractError::browser(format!("Failed to run agent-browser: {}", e))
                }
            })?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ExtractError::browser(format!(
                "agent-browser command failed: {}",
                stderr.trim()
            )))
        }
    }

    /// Navigate to a URL and wait for the network to settle
    pub async fn open(&self, url: &str) -> Result<()> {
        self.run_command(&["open", url]).await?;
        // Best effort; some pages never go idle
        let _ = self.run_command(&["wait", "--load", "networkidle"]).await;
        Ok(())
    }

    /// Interactive accessibility snapshot
    pub async fn snapshot(&self) -> Result<Snapshot> {
        let output = self.run_command(&["snapshot", "-i", "--json"]).await?;
        serde_json::from_str(&output)
            .map_err(|e| ExtractError::browser(format!("Unreadable snapshot: {}", e)))
    }

    /// Evaluate JavaScript and decode its JSON result
    pub async fn eval(&self, script: &str) -> Result<serde_json::Value> {
        let output = self.run_command(&["eval", script]).await?;
        decode_eval_output(&output)
    }

    /// Get current URL
    pub async fn get_url(&self) -> Result<String> {
        self.run_command(&["get", "url"])
            .await
            .map(|s| s.trim().to_string())
    }

    /// Get page title
    pub async fn get_title(&self) -> Result<String> {
        self.run_command(&["get", "title"])
            .await
            .map(|s| s.trim().to_string())
    }

    /// Close the browser
    pub async fn close(&self) -> Result<()> {
        self.run_command(&["close"]).await.map(|_| ())
    }
}
