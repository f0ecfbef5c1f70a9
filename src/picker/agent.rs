//! Agent side of the picker protocol
//!
//! One [`PickerAgent`] exists per picking session. It owns the captured DOM,
//! tracks the hovered node and its debounce timer, and reports exactly one
//! result through its [`PickerCallback`] before tearing itself down.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, warn};

use crate::core::PickerSelection;
use crate::picker::channel::PickerCallback;
use crate::selector::{DomTree, NodeId, SelectorSynthesizer};

/// Key that dismisses the picker
pub const CANCEL_KEY: &str = "Escape";

/// Longest text preview before truncation
pub const PREVIEW_CHARS: usize = 50;

/// Raw input forwarded from the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PickerEvent {
    Hover { index: NodeId },
    Click { index: NodeId },
    Key { key: String },
}

/// Whether the agent wants more events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Finished,
}

#[derive(Debug, Clone, Copy)]
struct PendingRecompute {
    node: NodeId,
    deadline: Instant,
}

/// Debounced selector for the node under the cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoverPreview {
    pub node: NodeId,
    pub selector: String,
}

pub struct PickerAgent {
    tree: DomTree,
    synthesizer: SelectorSynthesizer,
    debounce: Duration,
    callback: PickerCallback,
    preview_tx: Option<mpsc::UnboundedSender<HoverPreview>>,
    hovered: Option<NodeId>,
    highlight: Option<NodeId>,
    pending: Option<PendingRecompute>,
    preview: Option<String>,
    active: bool,
}

impl PickerAgent {
    pub fn new(
        tree: DomTree,
        synthesizer: SelectorSynthesizer,
        debounce: Duration,
        callback: PickerCallback,
    ) -> Self {
        Self {
            tree,
            synthesizer,
            debounce,
            callback,
            preview_tx: None,
            hovered: None,
            highlight: None,
            pending: None,
            preview: None,
            active: true,
        }
    }

    /// Receive debounced hover selectors (for the overlay label)
    pub fn with_preview(mut self, tx: mpsc::UnboundedSender<HoverPreview>) -> Self {
        self.preview_tx = Some(tx);
        self
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    pub fn highlighted(&self) -> Option<NodeId> {
        self.highlight
    }

    pub fn pending_node(&self) -> Option<NodeId> {
        self.pending.map(|p| p.node)
    }

    pub fn preview(&self) -> Option<&str> {
        self.preview.as_deref()
    }

    /// When the pending recomputation is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.map(|p| p.deadline)
    }

    /// Move the highlight now; schedule the selector for later.
    ///
    /// A new target replaces any recomputation still waiting.
    pub fn on_hover(&mut self, node: NodeId, now: Instant) {
        if !self.active || self.hovered == Some(node) {
            return;
        }

        self.hovered = Some(node);
        self.highlight = Some(node);
        self.pending = Some(PendingRecompute {
            node,
            deadline: now + self.debounce,
        });
    }

    /// Run the pending recomputation if its window has elapsed
    pub fn fire_due(&mut self, now: Instant) -> Option<String> {
        let pending = self.pending?;
        if now < pending.deadline {
            return None;
        }
        self.pending = None;

        if self.hovered != Some(pending.node) {
            return None;
        }

        let selector = self
            .synthesizer
            .synthesize(&self.tree, pending.node, &self.tree)?;

        if let Some(tx) = &self.preview_tx {
            let _ = tx.send(HoverPreview {
                node: pending.node,
                selector: selector.clone(),
            });
        }
        self.preview = Some(selector.clone());
        Some(selector)
    }

    /// Select `node`: fresh selector, report, tear down
    pub fn on_click(&mut self, node: NodeId) -> Flow {
        if !self.active {
            return Flow::Finished;
        }

        let selection = match self.tree.node(node) {
            Some(el) => self
                .synthesizer
                .synthesize(&self.tree, node, &self.tree)
                .map(|selector| PickerSelection {
                    selector,
                    tag_name: el.tag.to_lowercase(),
                    text_preview: text_preview(&el.text),
                }),
            None => None,
        };

        let selection = selection.unwrap_or_else(|| {
            warn!(node, "clicked node is not in the captured DOM");
            PickerSelection::cancelled()
        });

        self.callback.invoke(selection);
        self.teardown();
        Flow::Finished
    }

    /// Cancel on the dismiss key, ignore everything else
    pub fn on_key(&mut self, key: &str) -> Flow {
        if !self.active {
            return Flow::Finished;
        }
        if key != CANCEL_KEY {
            return Flow::Continue;
        }

        self.callback.invoke(PickerSelection::cancelled());
        self.teardown();
        Flow::Finished
    }

    pub fn handle(&mut self, event: PickerEvent, now: Instant) -> Flow {
        match event {
            PickerEvent::Hover { index } => {
                self.on_hover(index, now);
                Flow::Continue
            }
            PickerEvent::Click { index } => self.on_click(index),
            PickerEvent::Key { key } => self.on_key(&key),
        }
    }

    /// Drop every piece of session state. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.active = false;
        self.hovered = None;
        self.highlight = None;
        self.pending = None;
        self.preview = None;
    }

    /// Drive the agent from an event stream until it reports
    pub async fn run(mut self, mut events: mpsc::Receiver<PickerEvent>) {
        loop {
            let deadline = self.next_deadline();

            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        if self.handle(event, Instant::now()) == Flow::Finished {
                            break;
                        }
                    }
                    None => {
                        debug!("picker event stream closed");
                        self.teardown();
                        break;
                    }
                },
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.fire_due(Instant::now());
                }
            }
        }
    }
}

/// Trimmed, whitespace-collapsed text, cut to [`PREVIEW_CHARS`] plus `...`
pub fn text_preview(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_CHARS {
        collapsed
    } else {
        let mut cut: String = collapsed.chars().take(PREVIEW_CHARS).collect();
        cut.push_str("...");
        cut
    }
}
