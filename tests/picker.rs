//! Interactive picker tests
//!
//! Drive the agent and the page binding on a paused clock.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

use uigrab::capability::browser::{run_picker, Snapshot};
use uigrab::capability::scripts::{self, with_arg};
use uigrab::capability::{Page, RefTarget};
use uigrab::core::config::PickerConfig;
use uigrab::core::{ExtractError, Result};
use uigrab::picker::{picker_channel, PickerAgent, PickerEvent};
use uigrab::selector::{DomNode, DomTree, SelectorSynthesizer, SynthesizerOptions};

const PREFIX: &str = "__tool-";

fn synth() -> SelectorSynthesizer {
    SelectorSynthesizer::new(SynthesizerOptions {
        reserved_prefix: PREFIX.to_string(),
        ..SynthesizerOptions::default()
    })
}

fn picker_config() -> PickerConfig {
    PickerConfig {
        debounce_ms: 16,
        poll_interval_ms: 50,
    }
}

/// A page whose event queue replays a fixed script
struct ScriptedPage {
    drains: Mutex<VecDeque<Result<Value>>>,
    labels: Mutex<Vec<String>>,
    installed: AtomicBool,
    torn_down: AtomicBool,
}

impl ScriptedPage {
    fn new(drains: Vec<Result<Value>>) -> Self {
        Self {
            drains: Mutex::new(drains.into()),
            labels: Mutex::new(Vec::new()),
            installed: AtomicBool::new(false),
            torn_down: AtomicBool::new(false),
        }
    }

    fn dom() -> Value {
        json!([
            {"tag": "body", "parent": null},
            {"tag": "ul", "classes": ["plans"], "parent": 0},
            {"tag": "li", "text": "Starter plan", "parent": 1},
            {"tag": "li", "text": "  Pro   plan  ", "parent": 1},
            {"tag": "div", "id": "__tool-overlay", "parent": 0}
        ])
    }
}

#[async_trait]
impl Page for ScriptedPage {
    async fn evaluate(&self, script: &str) -> Result<Value> {
        if script == scripts::CAPTURE_DOM {
            return Ok(Self::dom());
        }
        if script == with_arg(scripts::PICKER_INSTALL, PREFIX)? {
            self.installed.store(true, Ordering::SeqCst);
            return Ok(json!(true));
        }
        if script == with_arg(scripts::PICKER_DRAIN, PREFIX)? {
            let next = self.drains.lock().unwrap().pop_front();
            return next.unwrap_or_else(|| Ok(json!([])));
        }
        if script == with_arg(scripts::PICKER_TEARDOWN, PREFIX)? {
            self.torn_down.store(true, Ordering::SeqCst);
            return Ok(json!(true));
        }
        self.labels.lock().unwrap().push(script.to_string());
        Ok(json!(true))
    }

    async fn accessibility_snapshot(&self) -> Result<Snapshot> {
        Ok(Snapshot::default())
    }

    async fn describe_ref(&self, _reference: &str) -> Result<Option<RefTarget>> {
        Ok(None)
    }

    async fn url(&self) -> Result<String> {
        Ok("https://plans.test/".to_string())
    }

    async fn title(&self) -> Result<String> {
        Ok("Plans".to_string())
    }
}

#[tokio::test(start_paused = true)]
async fn test_click_after_hover() {
    let page = ScriptedPage::new(vec![
        Ok(json!([{"kind": "hover", "index": 3}])),
        Ok(json!([])),
        Ok(json!([{"kind": "click", "index": 3}])),
    ]);

    let picked = run_picker(&page, synth(), &picker_config()).await.unwrap();
    assert_eq!(picked.selector, "ul.plans > li:nth-of-type(2)");
    assert_eq!(picked.tag_name, "li");
    assert_eq!(picked.text_preview, "Pro plan");

    assert!(page.installed.load(Ordering::SeqCst));
    assert!(page.torn_down.load(Ordering::SeqCst));

    let labels = page.labels.lock().unwrap();
    assert_eq!(labels.len(), 1);
    assert!(labels[0].contains("ul.plans > li:nth-of-type(2)"));
}

#[tokio::test(start_paused = true)]
async fn test_escape_cancels_and_tears_down() {
    let page = ScriptedPage::new(vec![
        Ok(json!([{"kind": "hover", "index": 2}, {"kind": "key", "key": "Escape"}])),
    ]);

    let result = run_picker(&page, synth(), &picker_config()).await;
    assert!(matches!(result, Err(ExtractError::PickerCancelled)));
    assert!(page.torn_down.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_click_on_uncaptured_element_cancels() {
    let page = ScriptedPage::new(vec![Ok(json!([{"kind": "click", "index": 5}]))]);

    let result = run_picker(&page, synth(), &picker_config()).await;
    assert!(matches!(result, Err(ExtractError::PickerCancelled)));
}

#[tokio::test(start_paused = true)]
async fn test_drain_failure_still_tears_down() {
    let page = ScriptedPage::new(vec![
        Ok(json!([])),
        Err(ExtractError::browser("page crashed")),
    ]);

    let result = run_picker(&page, synth(), &picker_config()).await;
    assert!(matches!(result, Err(ExtractError::Browser(ref m)) if m == "page crashed"));
    assert!(page.torn_down.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_agent_debounces_on_event_stream() {
    let mut tree = DomTree::new();
    let body = tree.push(DomNode::element("body"), None);
    let ul = tree.push(DomNode::element("ul"), Some(body));
    let a = tree.push(DomNode::element("li").with_text("A"), Some(ul));
    let b = tree.push(DomNode::element("li").with_text("B"), Some(ul));

    let (host, callback) = picker_channel();
    let (preview_tx, mut preview_rx) = mpsc::unbounded_channel();
    let (events, rx) = mpsc::channel(8);
    let agent = PickerAgent::new(tree, synth(), Duration::from_millis(16), callback)
        .with_preview(preview_tx);
    let task = tokio::spawn(agent.run(rx));

    events.send(PickerEvent::Hover { index: a }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    events.send(PickerEvent::Hover { index: b }).await.unwrap();
    tokio::time::sleep(Duration::from_millis(30)).await;

    // a's recomputation was dropped when the target changed
    let preview = preview_rx.try_recv().unwrap();
    assert_eq!(preview.node, b);
    assert_eq!(preview.selector, "ul > li:nth-of-type(2)");
    assert!(preview_rx.try_recv().is_err());

    events.send(PickerEvent::Click { index: a }).await.unwrap();
    let picked = host.wait().await.unwrap();
    assert_eq!(picked.selector, "ul > li:nth-of-type(1)");
    assert_eq!(picked.text_preview, "A");

    tokio_test::assert_ok!(task.await);
}

#[tokio::test]
async fn test_closed_stream_cancels() {
    let (host, callback) = picker_channel();
    let (events, rx) = mpsc::channel::<PickerEvent>(1);
    let agent = PickerAgent::new(DomTree::new(), synth(), Duration::from_millis(16), callback);
    let task = tokio::spawn(agent.run(rx));

    drop(events);
    task.await.unwrap();
    assert!(matches!(host.wait().await, Err(ExtractError::PickerCancelled)));
}
