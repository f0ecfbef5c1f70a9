//! agent-browser backed sessions
//!
//! Each session gets its own agent-browser session name so concurrent jobs
//! never share a browser unless the batch asks for it.

pub mod executor;
pub mod picker;
pub mod snapshot;

pub use executor::BrowserExecutor;
pub use picker::run_picker;
pub use snapshot::{Element, Snapshot, SnapshotData};

use async_trait::async_trait;
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::capability::{Page, RefTarget, Session, SessionLauncher};
use crate::core::config::PickerConfig;
use crate::core::{Config, ExtractError, PickerSelection, Result};
use crate::selector::{SelectorSynthesizer, SynthesizerOptions};

/// Launches one agent-browser session per call
#[derive(Debug, Clone)]
pub struct AgentBrowserLauncher {
    session_prefix: String,
    headed: bool,
    timeout: Duration,
    synthesizer: SelectorSynthesizer,
    picker: PickerConfig,
}

impl AgentBrowserLauncher {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_prefix: config.browser.session_name.clone(),
            headed: config.browser.headed,
            timeout: Duration::from_millis(config.browser.timeout_ms),
            synthesizer: SelectorSynthesizer::new(SynthesizerOptions::from(&config.selector)),
            picker: config.picker.clone(),
        }
    }

    fn next_session_name(&self) -> String {
        let suffix: u32 = rand::rng().random();
        format!("{}-{:08x}", self.session_prefix, suffix)
    }
}

#[async_trait]
impl SessionLauncher for AgentBrowserLauncher {
    async fn launch(&self) -> Result<Box<dyn Session>> {
        if !BrowserExecutor::is_available().await {
            return Err(ExtractError::AgentBrowserNotFound);
        }

        let executor = BrowserExecutor::new(self.next_session_name())
            .headed(self.headed)
            .timeout(self.timeout);
        info!(session = executor.session_name(), "browser session launched");

        Ok(Box::new(AgentBrowserSession {
            executor,
            synthesizer: self.synthesizer.clone(),
            picker: self.picker.clone(),
            last_snapshot: Mutex::new(None),
            closed: AtomicBool::new(false),
        }))
    }
}

/// A live agent-browser session; also serves as its own [`Page`]
pub struct AgentBrowserSession {
    executor: BrowserExecutor,
    synthesizer: SelectorSynthesizer,
    picker: PickerConfig,
    last_snapshot: Mutex<Option<Snapshot>>,
    closed: AtomicBool,
}

#[async_trait]
impl Session for AgentBrowserSession {
    async fn navigate(&self, url: &str) -> Result<()> {
        *self.last_snapshot.lock().await = None;
        self.executor.open(url).await
    }

    fn page(&self) -> &dyn Page {
        self
    }

    async fn run_interactive_picker(&self) -> Result<PickerSelection> {
        run_picker(self, self.synthesizer.clone(), &self.picker).await
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        debug!(session = self.executor.session_name(), "closing browser session");
        self.executor.close().await
    }
}

#[async_trait]
impl Page for AgentBrowserSession {
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.executor.eval(script).await
    }

    async fn accessibility_snapshot(&self) -> Result<Snapshot> {
        let snapshot = self.executor.snapshot().await?;
        *self.last_snapshot.lock().await = Some(snapshot.clone());
        Ok(snapshot)
    }

    async fn describe_ref(&self, reference: &str) -> Result<Option<RefTarget>> {
        let mut guard = self.last_snapshot.lock().await;
        if guard.is_none() {
            *guard = Some(self.executor.snapshot().await?);
        }
        Ok(guard.as_ref().and_then(|s| s.describe(reference)))
    }

    async fn url(&self) -> Result<String> {
        self.executor.get_url().await
    }

    async fn title(&self) -> Result<String> {
        self.executor.get_title().await
    }
}
