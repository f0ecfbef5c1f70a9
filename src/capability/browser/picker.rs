//! Binds the picker protocol to a live page
//!
//! The page-side shim only draws the highlight and queues raw events. The
//! host drains that queue on an interval and feeds a [`PickerAgent`], which
//! owns hover state, debouncing and the final selection.

use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::capability::resolve::capture_dom;
use crate::capability::scripts::{self, with_arg};
use crate::capability::Page;
use crate::core::config::PickerConfig;
use crate::core::{PickerSelection, Result};
use crate::picker::{picker_channel, PickerAgent, PickerEvent};
use crate::selector::SelectorSynthesizer;

/// Let the user click an element on `page` and return its selection.
///
/// The page shim is removed on every exit path.
pub async fn run_picker(
    page: &dyn Page,
    synthesizer: SelectorSynthesizer,
    config: &PickerConfig,
) -> Result<PickerSelection> {
    let prefix = synthesizer.options().reserved_prefix.clone();

    let tree = capture_dom(page).await?;
    debug!(nodes = tree.len(), "captured DOM for picker");

    page.evaluate(&with_arg(scripts::PICKER_INSTALL, &prefix)?)
        .await?;

    let outcome = drive(page, tree, synthesizer, config, &prefix).await;

    if let Err(e) = page
        .evaluate(&with_arg(scripts::PICKER_TEARDOWN, &prefix)?)
        .await
    {
        warn!(error = %e, "picker teardown failed");
    }

    outcome
}

async fn drive(
    page: &dyn Page,
    tree: crate::selector::DomTree,
    synthesizer: SelectorSynthesizer,
    config: &PickerConfig,
    prefix: &str,
) -> Result<PickerSelection> {
    let (host, callback) = picker_channel();
    let (event_tx, event_rx) = mpsc::channel::<PickerEvent>(64);
    let (preview_tx, mut preview_rx) = mpsc::unbounded_channel();

    let agent = PickerAgent::new(
        tree,
        synthesizer,
        Duration::from_millis(config.debounce_ms),
        callback,
    )
    .with_preview(preview_tx);
    let task = tokio::spawn(agent.run(event_rx));

    let drain = with_arg(scripts::PICKER_DRAIN, prefix)?;
    let mut wait = Box::pin(host.wait());
    let mut ticker = tokio::time::interval(Duration::from_millis(config.poll_interval_ms.max(1)));

    let outcome = loop {
        tokio::select! {
            result = &mut wait => break result,
            Some(preview) = preview_rx.recv() => {
                let script = with_arg(scripts::PICKER_LABEL, &(prefix, &preview.selector))?;
                if let Err(e) = page.evaluate(&script).await {
                    debug!(error = %e, "label update failed");
                }
            }
            _ = ticker.tick() => {
                let raw = match page.evaluate(&drain).await {
                    Ok(raw) => raw,
                    Err(e) => break Err(e),
                };
                for event in parse_events(raw) {
                    if event_tx.send(event).await.is_err() {
                        break;
                    }
                }
            }
        }
    };

    task.abort();
    outcome
}

/// Decode the drained queue, skipping entries that don't parse
pub fn parse_events(raw: serde_json::Value) -> Vec<PickerEvent> {
    match raw {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}
