//! Shared types used across uigrab modules
//!
//! Contains the extraction job description, its locate mode, and the
//! framework/styling enumerations.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::core::config::Config;
use crate::core::error::{ExtractError, Result};

/// Target component framework
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Framework {
    #[default]
    React,
    Vue,
    Svelte,
}

impl Framework {
    /// File extension for generated components
    pub fn extension(&self) -> &'static str {
        match self {
            Framework::React => "tsx",
            Framework::Vue => "vue",
            Framework::Svelte => "svelte",
        }
    }
}

impl std::fmt::Display for Framework {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framework::React => write!(f, "react"),
            Framework::Vue => write!(f, "vue"),
            Framework::Svelte => write!(f, "svelte"),
        }
    }
}

impl FromStr for Framework {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "react" | "tsx" | "jsx" => Ok(Framework::React),
            "vue" => Ok(Framework::Vue),
            "svelte" => Ok(Framework::Svelte),
            other => Err(ExtractError::validation(format!(
                "Unknown framework '{}'. Expected react, vue or svelte",
                other
            ))),
        }
    }
}

/// Styling approach for generated components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Styling {
    #[default]
    Tailwind,
    Css,
    CssModules,
    Inline,
}

impl std::fmt::Display for Styling {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Styling::Tailwind => write!(f, "tailwind"),
            Styling::Css => write!(f, "css"),
            Styling::CssModules => write!(f, "css-modules"),
            Styling::Inline => write!(f, "inline"),
        }
    }
}

impl FromStr for Styling {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "tailwind" => Ok(Styling::Tailwind),
            "css" | "plain" => Ok(Styling::Css),
            "css-modules" | "modules" => Ok(Styling::CssModules),
            "inline" => Ok(Styling::Inline),
            other => Err(ExtractError::validation(format!(
                "Unknown styling '{}'. Expected tailwind, css, css-modules or inline",
                other
            ))),
        }
    }
}

/// How the target element is found on the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "value")]
pub enum LocateSpec {
    /// A CSS selector used as given
    Selector(String),
    /// A natural-language description resolved by the LLM
    Query(String),
    /// Visual picking in a headed browser
    Interactive,
}

impl LocateSpec {
    /// Build a locate spec from the three optional inputs.
    ///
    /// Returns `Ok(None)` when nothing was given; the pipeline rejects that in
    /// its locate stage. More than one mode is a validation error here.
    pub fn from_parts(
        selector: Option<String>,
        query: Option<String>,
        interactive: bool,
    ) -> Result<Option<Self>> {
        let selector = selector.filter(|s| !s.trim().is_empty());
        let query = query.filter(|q| !q.trim().is_empty());

        let given = [selector.is_some(), query.is_some(), interactive]
            .iter()
            .filter(|set| **set)
            .count();
        if given > 1 {
            return Err(ExtractError::validation(
                "selector, find and interactive are mutually exclusive; use only one",
            ));
        }

        Ok(match (selector, query, interactive) {
            (Some(s), _, _) => Some(LocateSpec::Selector(s.trim().to_string())),
            (_, Some(q), _) => Some(LocateSpec::Query(q.trim().to_string())),
            (_, _, true) => Some(LocateSpec::Interactive),
            _ => None,
        })
    }

    /// Text used to derive a component name, if any
    pub fn naming_hint(&self) -> Option<&str> {
        match self {
            LocateSpec::Selector(s) => Some(s),
            LocateSpec::Query(q) => Some(q),
            LocateSpec::Interactive => None,
        }
    }
}

/// Values a job falls back to when it does not set them itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDefaults {
    pub framework: Framework,
    pub styling: Styling,
    pub output_dir: PathBuf,
    pub include_assets: bool,
}

impl Default for JobDefaults {
    fn default() -> Self {
        Self {
            framework: Framework::React,
            styling: Styling::Tailwind,
            output_dir: PathBuf::from("./components"),
            include_assets: false,
        }
    }
}

impl JobDefaults {
    /// Take the output section of a loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            framework: config.output.framework,
            styling: config.output.styling,
            output_dir: config.output.output_dir.clone(),
            include_assets: config.output.include_assets,
        }
    }
}

/// One request to extract and transform a single page element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionJob {
    pub url: String,
    /// `None` is accepted here and rejected by the locate stage
    pub locate: Option<LocateSpec>,
    pub framework: Framework,
    pub styling: Styling,
    pub output_dir: PathBuf,
    pub component_name: Option<String>,
    pub include_assets: bool,
    pub verbose: bool,
}

impl ExtractionJob {
    /// Start building a job for `url`
    pub fn builder(url: impl Into<String>) -> JobBuilder {
        JobBuilder::new(url)
    }
}

/// Builder for [`ExtractionJob`]
#[derive(Debug, Clone, Default)]
pub struct JobBuilder {
    url: String,
    selector: Option<String>,
    query: Option<String>,
    interactive: bool,
    framework: Option<Framework>,
    styling: Option<Styling>,
    output_dir: Option<PathBuf>,
    component_name: Option<String>,
    include_assets: Option<bool>,
    verbose: bool,
    defaults: JobDefaults,
}

impl JobBuilder {
    /// Create a new builder for the given URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn framework(mut self, framework: Option<Framework>) -> Self {
        self.framework = framework;
        self
    }

    pub fn styling(mut self, styling: Option<Styling>) -> Self {
        self.styling = styling;
        self
    }

    pub fn output_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.output_dir = dir;
        self
    }

    pub fn component_name(mut self, name: Option<String>) -> Self {
        self.component_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn include_assets(mut self, include: Option<bool>) -> Self {
        self.include_assets = include;
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Values used for anything not set explicitly
    pub fn defaults(mut self, defaults: JobDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the job, rejecting more than one locate mode
    pub fn build(self) -> Result<ExtractionJob> {
        if self.url.trim().is_empty() {
            return Err(ExtractError::validation("A URL is required"));
        }

        let locate = LocateSpec::from_parts(self.selector, self.query, self.interactive)?;

        Ok(ExtractionJob {
            url: self.url,
            locate,
            framework: self.framework.unwrap_or(self.defaults.framework),
            styling: self.styling.unwrap_or(self.defaults.styling),
            output_dir: self.output_dir.unwrap_or(self.defaults.output_dir),
            component_name: self.component_name,
            include_assets: self.include_assets.unwrap_or(self.defaults.include_assets),
            verbose: self.verbose,
        })
    }
}

/// Result of an interactive pick.
///
/// An empty `selector` is the cancellation sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerSelection {
    pub selector: String,
    pub tag_name: String,
    pub text_preview: String,
}

impl PickerSelection {
    /// The cancellation sentinel
    pub fn cancelled() -> Self {
        Self {
            selector: String::new(),
            tag_name: String::new(),
            text_preview: String::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.selector.is_empty()
    }

    /// Turn the sentinel into [`ExtractError::PickerCancelled`]
    pub fn into_result(self) -> Result<Self> {
        if self.is_cancelled() {
            Err(ExtractError::PickerCancelled)
        } else {
            Ok(self)
        }
    }
}
