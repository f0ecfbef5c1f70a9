//! Batch extraction
//!
//! Jobs run one after another through the same [`Pipeline`]. A failing,
//! malformed or panicking job is recorded and the batch moves on; running a
//! batch never returns an error.

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::capability::shared::SharedSessionLauncher;
use crate::capability::Capabilities;
use crate::core::{
    Config, ErrorKind, ExtractError, ExtractionJob, Framework, JobDefaults, Result, SessionMode,
    Styling,
};
use crate::pipeline::orchestrator::Pipeline;
use crate::pipeline::state::{PipelineOutcome, PipelineOutput, PipelineTiming};

/// One entry of a batch file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchComponent {
    pub url: String,
    #[serde(default)]
    pub selector: Option<String>,
    #[serde(default)]
    pub find: Option<String>,
    #[serde(default)]
    pub interactive: Option<bool>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub styling: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub include_assets: Option<bool>,
}

/// Batch-wide values for anything a component leaves unset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDefaults {
    #[serde(default)]
    pub framework: Option<String>,
    #[serde(default)]
    pub styling: Option<String>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub include_assets: Option<bool>,
}

/// A parsed batch file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSpec {
    pub components: Vec<BatchComponent>,
    #[serde(default)]
    pub defaults: Option<BatchDefaults>,
}

fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: std::str::FromStr<Err = ExtractError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::parse)
        .transpose()
}

impl BatchSpec {
    /// Read a batch file; unreadable or malformed files are validation errors
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExtractError::validation(format!("Cannot read batch file {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
            .map_err(|e| ExtractError::validation(format!("{}: {}", path.display(), e)))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let spec: BatchSpec = serde_json::from_str(content)
            .map_err(|e| ExtractError::validation(format!("Invalid batch file: {}", e)))?;
        if spec.components.is_empty() {
            return Err(ExtractError::validation("Batch file lists no components"));
        }
        Ok(spec)
    }
}

impl BatchDefaults {
    /// Layer these over `fallback`
    pub fn merge(&self, fallback: &JobDefaults) -> Result<JobDefaults> {
        Ok(JobDefaults {
            framework: parse_opt::<Framework>(self.framework.as_deref())?
                .unwrap_or(fallback.framework),
            styling: parse_opt::<Styling>(self.styling.as_deref())?.unwrap_or(fallback.styling),
            output_dir: self
                .output_dir
                .clone()
                .unwrap_or_else(|| fallback.output_dir.clone()),
            include_assets: self.include_assets.unwrap_or(fallback.include_assets),
        })
    }
}

impl BatchComponent {
    /// Label used in results and logs
    pub fn display_name(&self, index: usize) -> String {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("component-{}", index + 1))
    }

    /// Build the job: component values, then batch defaults, then fallback
    pub fn to_job(&self, defaults: &BatchDefaults, fallback: &JobDefaults) -> Result<ExtractionJob> {
        let merged = defaults.merge(fallback)?;

        let mut builder = ExtractionJob::builder(self.url.clone())
            .framework(parse_opt(self.framework.as_deref())?)
            .styling(parse_opt(self.styling.as_deref())?)
            .output_dir(self.output_dir.clone())
            .component_name(self.name.clone())
            .include_assets(self.include_assets)
            .interactive(self.interactive.unwrap_or(false))
            .defaults(merged);

        if let Some(selector) = &self.selector {
            builder = builder.selector(selector.clone());
        }
        if let Some(find) = &self.find {
            builder = builder.query(find.clone());
        }

        builder.build()
    }
}

/// Outcome of one batch entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJobResult {
    pub name: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<PipelineOutput>,
    pub timing: PipelineTiming,
}

impl BatchJobResult {
    fn from_outcome(name: String, outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Success { output, timing } => Self {
                name,
                success: true,
                error: None,
                error_kind: None,
                result: Some(output),
                timing,
            },
            PipelineOutcome::Failure { error, timing, .. } => Self::failed(name, &error, timing),
        }
    }

    fn failed(name: String, error: &ExtractError, timing: PipelineTiming) -> Self {
        Self {
            name,
            success: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            result: None,
            timing,
        }
    }
}

/// Aggregate of a whole batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<BatchJobResult>,
    pub total_time_ms: u64,
}

impl BatchResult {
    fn new(results: Vec<BatchJobResult>, total_time_ms: u64) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
            total_time_ms,
        }
    }
}

/// Runs a [`BatchSpec`] sequentially
pub struct BatchRunner {
    caps: Capabilities,
    fallback: JobDefaults,
    session_mode: SessionMode,
}

impl BatchRunner {
    pub fn new(caps: Capabilities, config: &Config) -> Self {
        Self {
            caps,
            fallback: JobDefaults::from_config(config),
            session_mode: config.batch.session_mode,
        }
    }

    pub fn with_session_mode(mut self, mode: SessionMode) -> Self {
        self.session_mode = mode;
        self
    }

    pub fn session_mode(&self) -> SessionMode {
        self.session_mode
    }

    pub async fn run(&self, spec: &BatchSpec) -> BatchResult {
        let started = Instant::now();

        let (pipeline, shared) = match self.session_mode {
            SessionMode::PerJob => (Pipeline::new(self.caps.clone()), None),
            SessionMode::Shared => {
                let shared = Arc::new(SharedSessionLauncher::new(self.caps.launcher.clone()));
                let caps = self.caps.clone().with_launcher(shared.clone());
                (Pipeline::new(caps), Some(shared))
            }
        };

        let defaults = spec.defaults.clone().unwrap_or_default();
        let total = spec.components.len();
        let mut results = Vec::with_capacity(total);

        for (index, component) in spec.components.iter().enumerate() {
            let name = component.display_name(index);
            info!(job = index + 1, total, name = %name, url = %component.url, "batch job");

            let result = self
                .run_one(&pipeline, component, &defaults, name.clone())
                .instrument(info_span!("job", name = %name))
                .await;

            if result.success {
                info!(name = %result.name, total_ms = result.timing.total, "job succeeded");
            } else {
                warn!(
                    name = %result.name,
                    error = result.error.as_deref().unwrap_or_default(),
                    "job failed"
                );
            }
            results.push(result);
        }

        if let Some(shared) = shared {
            if let Err(e) = shared.shutdown().await {
                warn!(error = %e, "failed to close shared browser session");
            }
        }

        let batch = BatchResult::new(results, started.elapsed().as_millis() as u64);
        info!(
            total = batch.total,
            succeeded = batch.succeeded,
            failed = batch.failed,
            "batch finished"
        );
        batch
    }

    async fn run_one(
        &self,
        pipeline: &Pipeline,
        component: &BatchComponent,
        defaults: &BatchDefaults,
        name: String,
    ) -> BatchJobResult {
        let started = Instant::now();
        let elapsed_timing = |started: Instant| {
            let mut timing = PipelineTiming::default();
            timing.finish(started.elapsed());
            timing
        };

        let job = match component.to_job(defaults, &self.fallback) {
            Ok(job) => job,
            Err(e) => return BatchJobResult::failed(name, &e, elapsed_timing(started)),
        };

        match AssertUnwindSafe(pipeline.run(&job)).catch_unwind().await {
            Ok(outcome) => BatchJobResult::from_outcome(name, outcome),
            Err(panic) => {
                let error = ExtractError::Other(format!(
                    "job panicked: {}",
                    panic_message(panic.as_ref())
                ));
                BatchJobResult::failed(name, &error, elapsed_timing(started))
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_batch_file() {
        let spec = BatchSpec::from_json(
            r#"{
                "components": [
                    {"url": "https://a.test", "selector": ".hero", "name": "Hero"},
                    {"url": "https://b.test", "find": "pricing table", "name": "Pricing",
                     "framework": "vue", "outputDir": "./out/pricing"}
                ],
                "defaults": {"styling": "css-modules", "includeAssets": true}
            }"#,
        )
        .unwrap();

        assert_eq!(spec.components.len(), 2);
        assert_eq!(spec.components[1].output_dir, Some(PathBuf::from("./out/pricing")));
        assert_eq!(spec.defaults.unwrap().include_assets, Some(true));
    }

    #[test]
    fn test_malformed_batch_is_validation() {
        assert!(matches!(
            BatchSpec::from_json("{ nope"),
            Err(ExtractError::Validation(_))
        ));
        assert!(matches!(
            BatchSpec::from_json(r#"{"components": []}"#),
            Err(ExtractError::Validation(_))
        ));
        assert!(matches!(
            BatchSpec::from_file(Path::new("/definitely/missing/batch.json")),
            Err(ExtractError::Validation(_))
        ));
    }

    #[test]
    fn test_merge_order() {
        let fallback = JobDefaults::default();
        let defaults = BatchDefaults {
            framework: Some("svelte".into()),
            styling: Some("css".into()),
            output_dir: None,
            include_assets: Some(true),
        };
        let component = BatchComponent {
            url: "https://a.test".into(),
            selector: Some(".x".into()),
            framework: Some("vue".into()),
            ..Default::default()
        };

        let job = component.to_job(&defaults, &fallback).unwrap();
        assert_eq!(job.framework, Framework::Vue);
        assert_eq!(job.styling, Styling::Css);
        assert!(job.include_assets);
        assert_eq!(job.output_dir, fallback.output_dir);
    }

    #[test]
    fn test_bad_component_values_fail_that_job() {
        let component = BatchComponent {
            url: "https://a.test".into(),
            selector: Some(".x".into()),
            find: Some("hero".into()),
            ..Default::default()
        };
        assert!(component
            .to_job(&BatchDefaults::default(), &JobDefaults::default())
            .is_err());

        let component = BatchComponent {
            url: "https://a.test".into(),
            framework: Some("angular".into()),
            ..Default::default()
        };
        assert!(matches!(
            component.to_job(&BatchDefaults::default(), &JobDefaults::default()),
            Err(ExtractError::Validation(_))
        ));
    }

    #[test]
    fn test_display_name() {
        let mut component = BatchComponent::default();
        assert_eq!(component.display_name(2), "component-3");
        component.name = Some("Hero".into());
        assert_eq!(component.display_name(2), "Hero");
    }
}
