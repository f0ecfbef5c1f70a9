//! Delegated capabilities
//!
//! The pipeline only talks to the browser, the LLM and the filesystem through
//! these traits. Concrete adapters live in the submodules and in [`crate::llm`].

pub mod browser;
pub mod extract;
pub mod output;
pub mod resolve;
pub mod scripts;
pub mod shared;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capability::browser::{AgentBrowserLauncher, Snapshot};
use crate::capability::extract::DomExtractor;
use crate::capability::output::FsOutputWriter;
use crate::core::{Config, Framework, PickerSelection, Result, Styling};
use crate::llm::{LlmLocator, LlmTransformer, OllamaClient};

/// Role and accessible name behind a snapshot ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefTarget {
    pub role: String,
    pub name: String,
}

/// Page state handed to the locate capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    /// Accessibility tree text; may be empty
    pub tree: String,
    /// Unix epoch milliseconds
    pub timestamp: u64,
}

impl PageSnapshot {
    pub fn is_empty(&self) -> bool {
        self.tree.trim().is_empty()
    }
}

/// Answer from the locate capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LocateResult {
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub confidence: f32,
    #[serde(default)]
    pub reasoning: String,
}

/// Kind of asset referenced by extracted markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Background,
    Font,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub url: String,
    #[serde(default)]
    pub kind: AssetKind,
}

/// Markup and styles pulled from the page
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExtractResult {
    pub html: String,
    #[serde(default)]
    pub css: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default, rename = "tagName")]
    pub tag_name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformRequest {
    pub html: String,
    pub css: String,
    pub framework: Framework,
    pub styling: Styling,
    pub component_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformResult {
    pub code: String,
    pub styles: Option<String>,
    pub filename: String,
    pub props_interface: Option<String>,
    /// Decides the style file name
    #[serde(default)]
    pub styling: Styling,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WriteResult {
    pub files: Vec<PathBuf>,
    pub assets: Vec<PathBuf>,
    pub import_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadedAsset {
    pub url: String,
    pub path: PathBuf,
}

/// Starts browser sessions
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self) -> Result<Box<dyn Session>>;
}

/// A live browser session, owned by one job at a time
#[async_trait]
pub trait Session: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<()>;

    fn page(&self) -> &dyn Page;

    async fn run_interactive_picker(&self) -> Result<PickerSelection>;

    /// Release the session. Calling it twice is harmless.
    async fn close(&self) -> Result<()>;
}

/// The page currently loaded in a session
#[async_trait]
pub trait Page: Send + Sync {
    /// Run a script and return its JSON result
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;

    async fn accessibility_snapshot(&self) -> Result<Snapshot>;

    /// Look up a ref from the most recent accessibility snapshot
    async fn describe_ref(&self, reference: &str) -> Result<Option<RefTarget>>;

    async fn url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;
}

#[async_trait]
pub trait Snapshotter: Send + Sync {
    async fn snapshot(&self, page: &dyn Page) -> Result<PageSnapshot>;
}

#[async_trait]
pub trait Locator: Send + Sync {
    async fn locate(&self, tree: &str, query: &str) -> Result<LocateResult>;

    async fn resolve_ref(&self, page: &dyn Page, reference: &str) -> Result<Option<String>>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, page: &dyn Page, selector: &str) -> Result<ExtractResult>;
}

#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult>;
}

#[async_trait]
pub trait OutputWriter: Send + Sync {
    async fn write(
        &self,
        dir: &Path,
        component_name: &str,
        result: &TransformResult,
    ) -> Result<WriteResult>;

    /// Download what it can; individual failures are logged, not returned
    async fn download_assets(&self, assets: &[Asset], dir: &Path) -> Result<Vec<DownloadedAsset>>;
}

/// Snapshotter backed by the page's own accessibility snapshot
#[derive(Debug, Clone, Default)]
pub struct AccessibilitySnapshotter;

#[async_trait]
impl Snapshotter for AccessibilitySnapshotter {
    async fn snapshot(&self, page: &dyn Page) -> Result<PageSnapshot> {
        let snapshot = page.accessibility_snapshot().await?;
        let tree = match snapshot.raw_tree() {
            Some(raw) if !raw.trim().is_empty() => raw.to_string(),
            _ if snapshot.count_elements() > 0 => snapshot.format_for_display(),
            _ => String::new(),
        };

        Ok(PageSnapshot {
            url: page.url().await.unwrap_or_default(),
            title: page.title().await.unwrap_or_default(),
            tree,
            timestamp: unix_millis(),
        })
    }
}

pub(crate) fn unix_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Run several locate queries against the same tree concurrently.
///
/// Results line up with `queries` by position.
pub async fn locate_many(
    locator: &dyn Locator,
    tree: &str,
    queries: &[String],
) -> Vec<Result<LocateResult>> {
    futures::future::join_all(queries.iter().map(|q| locator.locate(tree, q))).await
}

/// Everything the pipeline delegates to
#[derive(Clone)]
pub struct Capabilities {
    pub launcher: Arc<dyn SessionLauncher>,
    pub snapshotter: Arc<dyn Snapshotter>,
    pub locator: Arc<dyn Locator>,
    pub extractor: Arc<dyn Extractor>,
    pub transformer: Arc<dyn Transformer>,
    pub output: Arc<dyn OutputWriter>,
}

impl Capabilities {
    /// The production stack: agent-browser, Ollama, local filesystem
    pub fn from_config(config: &Config) -> Result<Self> {
        let llm = Arc::new(OllamaClient::from_config(config)?);

        Ok(Self {
            launcher: Arc::new(AgentBrowserLauncher::from_config(config)),
            snapshotter: Arc::new(AccessibilitySnapshotter),
            locator: Arc::new(LlmLocator::new(
                llm.clone(),
                config.llm.locate_model.clone(),
                (&config.selector).into(),
            )),
            extractor: Arc::new(DomExtractor),
            transformer: Arc::new(LlmTransformer::new(llm, config.llm.transform_model.clone())),
            output: Arc::new(FsOutputWriter::new(config.browser.timeout_ms)?),
        })
    }

    /// Swap the launcher, keeping everything else
    pub fn with_launcher(mut self, launcher: Arc<dyn SessionLauncher>) -> Self {
        self.launcher = launcher;
        self
    }
}
