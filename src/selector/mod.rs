//! Selector synthesis
//!
//! A DOM arena captured from the page, a local match oracle over it, and the
//! algorithm that turns a node into a selector that addresses only that node.

pub mod dom;
pub mod matcher;
pub mod synthesizer;

pub use dom::{DomNode, DomTree, NodeId};
pub use matcher::MatchOracle;
pub use synthesizer::{
    css_escape, SelectorCandidate, SelectorSynthesizer, Strategy, Synthesis, SynthesizerOptions,
};
