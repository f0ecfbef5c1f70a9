//! Host side of the picker protocol
//!
//! The host hands a [`PickerCallback`] to the agent before installing it and
//! then awaits [`PickerHost::wait`]. The first selection delivered resolves the
//! wait; the receiver is consumed with it, so anything sent afterwards is
//! dropped on the floor.

use tokio::sync::mpsc;
use tracing::debug;

use crate::core::{ExtractError, PickerSelection, Result};

/// Create a connected host/callback pair
pub fn picker_channel() -> (PickerHost, PickerCallback) {
    let (tx, rx) = mpsc::unbounded_channel();
    (PickerHost { rx }, PickerCallback { tx })
}

/// Pending picker result, fulfilled by the first callback invocation
#[derive(Debug)]
pub struct PickerHost {
    rx: mpsc::UnboundedReceiver<PickerSelection>,
}

impl PickerHost {
    /// Wait for the agent to report.
    ///
    /// The empty-selector sentinel and a callback dropped without reporting
    /// both surface as [`ExtractError::PickerCancelled`].
    pub async fn wait(mut self) -> Result<PickerSelection> {
        match self.rx.recv().await {
            Some(selection) => {
                debug!(selector = %selection.selector, "picker resolved");
                selection.into_result()
            }
            None => Err(ExtractError::PickerCancelled),
        }
    }
}

/// The single callback exposed to the agent
#[derive(Debug, Clone)]
pub struct PickerCallback {
    tx: mpsc::UnboundedSender<PickerSelection>,
}

impl PickerCallback {
    /// Report a selection. Returns `false` once the host has stopped listening.
    pub fn invoke(&self, selection: PickerSelection) -> bool {
        self.tx.send(selection).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(selector: &str) -> PickerSelection {
        PickerSelection {
            selector: selector.to_string(),
            tag_name: "div".to_string(),
            text_preview: String::new(),
        }
    }

    #[tokio::test]
    async fn test_first_invocation_wins() {
        let (host, callback) = picker_channel();
        assert!(callback.invoke(selection("#first")));
        callback.invoke(selection("#second"));

        let picked = host.wait().await.unwrap();
        assert_eq!(picked.selector, "#first");
    }

    #[tokio::test]
    async fn test_invocation_after_resolution_is_noop() {
        let (host, callback) = picker_channel();
        let late = callback.clone();

        callback.invoke(selection("#only"));
        assert_eq!(host.wait().await.unwrap().selector, "#only");

        assert!(!late.invoke(selection("#late")));
    }

    #[tokio::test]
    async fn test_empty_selector_is_cancellation() {
        let (host, callback) = picker_channel();
        callback.invoke(PickerSelection::cancelled());
        assert!(matches!(host.wait().await, Err(ExtractError::PickerCancelled)));
    }

    #[tokio::test]
    async fn test_dropped_callback_is_cancellation() {
        let (host, callback) = picker_channel();
        drop(callback);
        assert!(matches!(host.wait().await, Err(ExtractError::PickerCancelled)));
    }
}
