//! Interactive element picker
//!
//! A one-shot channel between the host and a transient agent that follows the
//! cursor, shows a highlight, and reports the clicked element.

pub mod agent;
pub mod channel;

pub use agent::{text_preview, Flow, HoverPreview, PickerAgent, PickerEvent, CANCEL_KEY};
pub use channel::{picker_channel, PickerCallback, PickerHost};
