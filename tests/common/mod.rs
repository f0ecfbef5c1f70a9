//! In-memory capabilities for driving the pipeline without a browser or LLM
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use uigrab::capability::browser::Snapshot;
use uigrab::capability::{
    Asset, Capabilities, DownloadedAsset, ExtractResult, Extractor, LocateResult, Locator,
    OutputWriter, Page, PageSnapshot, RefTarget, Session, SessionLauncher, Snapshotter,
    TransformRequest, TransformResult, Transformer, WriteResult,
};
use uigrab::core::{ExtractError, PickerSelection, Result};

/// How often each session operation ran
#[derive(Debug, Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub navigations: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// What each fake capability answers
#[derive(Debug, Clone)]
pub struct Script {
    pub tree: String,
    pub reference: Option<String>,
    pub resolved: Option<String>,
    /// Answer with `ref-<query>` instead of `reference`
    pub echo_refs: bool,
    pub navigate_error: Option<String>,
    pub pick: PickerSelection,
    pub assets: Vec<Asset>,
    pub transform_error: Option<String>,
    /// Component name that makes the transformer panic
    pub panic_on: Option<String>,
    pub fail_downloads: bool,
    /// Make `close()` fail after counting the call
    pub close_error: Option<String>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            tree: "- heading \"Pricing\" [ref=e1]\n- button \"Buy now\" [ref=e2]".to_string(),
            reference: Some("e2".to_string()),
            resolved: Some("#buy".to_string()),
            echo_refs: false,
            navigate_error: None,
            pick: PickerSelection {
                selector: "section.hero".to_string(),
                tag_name: "section".to_string(),
                text_preview: "Hello".to_string(),
            },
            assets: Vec::new(),
            transform_error: None,
            panic_on: None,
            fail_downloads: false,
            close_error: None,
        }
    }
}

/// Capabilities plus handles to inspect what they saw
pub struct Harness {
    pub caps: Capabilities,
    pub counters: Arc<Counters>,
    /// Component names passed to the transformer, in call order
    pub transformed: Arc<Mutex<Vec<String>>>,
}

impl Script {
    pub fn build(self) -> Harness {
        let counters = Arc::new(Counters::default());
        let transformed = Arc::new(Mutex::new(Vec::new()));
        let script = Arc::new(self);

        let caps = Capabilities {
            launcher: Arc::new(FakeLauncher {
                counters: counters.clone(),
                script: script.clone(),
            }),
            snapshotter: Arc::new(FakeSnapshotter {
                script: script.clone(),
            }),
            locator: Arc::new(FakeLocator {
                script: script.clone(),
            }),
            extractor: Arc::new(FakeExtractor {
                script: script.clone(),
            }),
            transformer: Arc::new(FakeTransformer {
                script: script.clone(),
                seen: transformed.clone(),
            }),
            output: Arc::new(FakeOutput { script }),
        };

        Harness {
            caps,
            counters,
            transformed,
        }
    }
}

pub struct FakeLauncher {
    counters: Arc<Counters>,
    script: Arc<Script>,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn Session>> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            counters: self.counters.clone(),
            script: self.script.clone(),
            page: FakePage,
        }))
    }
}

pub struct FakeSession {
    counters: Arc<Counters>,
    script: Arc<Script>,
    page: FakePage,
}

#[async_trait]
impl Session for FakeSession {
    async fn navigate(&self, _url: &str) -> Result<()> {
        self.counters.navigations.fetch_add(1, Ordering::SeqCst);
        match &self.script.navigate_error {
            Some(message) => Err(ExtractError::browser(message.clone())),
            None => Ok(()),
        }
    }

    fn page(&self) -> &dyn Page {
        &self.page
    }

    async fn run_interactive_picker(&self) -> Result<PickerSelection> {
        Ok(self.script.pick.clone())
    }

    async fn close(&self) -> Result<()> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        match &self.script.close_error {
            Some(message) => Err(ExtractError::browser(message.clone())),
            None => Ok(()),
        }
    }
}

pub struct FakePage;

#[async_trait]
impl Page for FakePage {
    async fn evaluate(&self, _script: &str) -> Result<Value> {
        Ok(Value::Null)
    }

    async fn accessibility_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn describe_ref(&self, _reference: &str) -> Result<Option<RefTarget>> {
        Ok(None)
    }

    async fn url(&self) -> Result<String> {
        Ok("https://shop.test/".to_string())
    }

    async fn title(&self) -> Result<String> {
        Ok("Shop".to_string())
    }
}

pub struct FakeSnapshotter {
    script: Arc<Script>,
}

#[async_trait]
impl Snapshotter for FakeSnapshotter {
    async fn snapshot(&self, page: &dyn Page) -> Result<PageSnapshot> {
        Ok(PageSnapshot {
            url: page.url().await?,
            title: page.title().await?,
            tree: self.script.tree.clone(),
            timestamp: 0,
        })
    }
}

pub struct FakeLocator {
    script: Arc<Script>,
}

#[async_trait]
impl Locator for FakeLocator {
    async fn locate(&self, _tree: &str, query: &str) -> Result<LocateResult> {
        let reference = if self.script.echo_refs {
            Some(format!("ref-{}", query))
        } else {
            self.script.reference.clone()
        };
        Ok(LocateResult {
            reference,
            confidence: 0.9,
            reasoning: format!("best match for {}", query),
        })
    }

    async fn resolve_ref(&self, _page: &dyn Page, _reference: &str) -> Result<Option<String>> {
        Ok(self.script.resolved.clone())
    }
}

pub struct FakeExtractor {
    script: Arc<Script>,
}

#[async_trait]
impl Extractor for FakeExtractor {
    async fn extract(&self, _page: &dyn Page, _selector: &str) -> Result<ExtractResult> {
        Ok(ExtractResult {
            html: "<section class=\"hero\"><h1>Hello</h1></section>".to_string(),
            css: ".hero { padding: 8px; }".to_string(),
            assets: self.script.assets.clone(),
            tag_name: "section".to_string(),
        })
    }
}

pub struct FakeTransformer {
    script: Arc<Script>,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transformer for FakeTransformer {
    async fn transform(&self, request: TransformRequest) -> Result<TransformResult> {
        self.seen.lock().unwrap().push(request.component_name.clone());

        if self.script.panic_on.as_deref() == Some(request.component_name.as_str()) {
            panic!("transformer blew up on {}", request.component_name);
        }
        if let Some(message) = &self.script.transform_error {
            return Err(ExtractError::Other(message.clone()));
        }

        Ok(TransformResult {
            code: format!("export default function {}() {{}}", request.component_name),
            styles: None,
            filename: format!("{}.{}", request.component_name, request.framework.extension()),
            props_interface: None,
            styling: request.styling,
        })
    }
}

pub struct FakeOutput {
    script: Arc<Script>,
}

#[async_trait]
impl OutputWriter for FakeOutput {
    async fn write(
        &self,
        dir: &Path,
        component_name: &str,
        result: &TransformResult,
    ) -> Result<WriteResult> {
        Ok(WriteResult {
            files: vec![dir.join(&result.filename)],
            assets: Vec::new(),
            import_path: format!("./{}", component_name),
        })
    }

    async fn download_assets(&self, assets: &[Asset], dir: &Path) -> Result<Vec<DownloadedAsset>> {
        if self.script.fail_downloads {
            return Err(ExtractError::output("disk full"));
        }
        Ok(assets
            .iter()
            .enumerate()
            .map(|(i, asset)| DownloadedAsset {
                url: asset.url.clone(),
                path: dir.join("assets").join(format!("asset-{}", i)),
            })
            .collect())
    }
}
