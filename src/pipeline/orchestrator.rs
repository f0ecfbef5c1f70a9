//! Extraction pipeline
//!
//! Drives one [`ExtractionJob`] through browse, locate, extract, transform and
//! write. Every stage is timed; a failing stage stops the run, and the browser
//! session is closed no matter how the run ended.

use std::future::Future;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;

use crate::capability::{Asset, Capabilities, ExtractResult, Page, Session, TransformRequest};
use crate::core::{classify_llm_error, ExtractError, ExtractionJob, LocateSpec, Result};
use crate::pipeline::naming::resolve_component_name;
use crate::pipeline::state::{PipelineOutcome, PipelineOutput, PipelineState, PipelineTiming, Stage};

/// URL schemes a job may navigate to
pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "file"];

/// Message for a job with no locate mode
pub const MISSING_LOCATE_MODE: &str =
    "No way to find the element: provide a selector, find (natural-language query), or interactive";

type StageResult<T> = std::result::Result<T, (Stage, ExtractError)>;

/// Runs extraction jobs against a set of capabilities
#[derive(Clone)]
pub struct Pipeline {
    caps: Capabilities,
}

/// Mutable bookkeeping for one run
struct Run {
    state: PipelineState,
    timing: PipelineTiming,
    session: Option<Box<dyn Session>>,
}

impl Run {
    fn new() -> Self {
        Self {
            state: PipelineState::Idle,
            timing: PipelineTiming::default(),
            session: None,
        }
    }

    fn enter(&mut self, next: PipelineState) {
        debug_assert!(self.state.can_advance_to(next), "{:?} -> {:?}", self.state, next);
        debug!(from = ?self.state, to = ?next, "pipeline state");
        self.state = next;
    }
}

/// The live session, or an error attributed to `stage`
fn live(session: &Option<Box<dyn Session>>, stage: Stage) -> StageResult<&dyn Session> {
    session
        .as_deref()
        .ok_or_else(|| (stage, ExtractError::Other("No browser session".to_string())))
}

/// Time a stage and record its duration only if it succeeds
async fn timed<T, F>(timing: &mut PipelineTiming, stage: Stage, fut: F) -> StageResult<T>
where
    F: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let result = fut.instrument(info_span!("stage", name = stage.name())).await;
    match result {
        Ok(value) => {
            timing.record(stage, started.elapsed());
            Ok(value)
        }
        Err(error) => Err((stage, error)),
    }
}

impl Pipeline {
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// Run one job to completion. Never panics on capability errors and
    /// always releases the session it acquired.
    pub async fn run(&self, job: &ExtractionJob) -> PipelineOutcome {
        let started = Instant::now();
        let mut run = Run::new();

        let result = self.run_stages(job, &mut run).await;

        if let Some(session) = run.session.take() {
            if let Err(e) = session.close().await {
                warn!(error = %e, "failed to close browser session");
            }
        }

        let mut timing = run.timing;
        timing.finish(started.elapsed());

        match result {
            Ok(output) => {
                run.enter(PipelineState::Done);
                info!(
                    component = %output.component_name,
                    total_ms = timing.total,
                    "extraction finished"
                );
                PipelineOutcome::Success { output, timing }
            }
            Err((stage, error)) => {
                run.enter(PipelineState::Failed);
                warn!(%stage, kind = %error.kind(), error = %error, "extraction failed");
                PipelineOutcome::Failure {
                    error,
                    stage: Some(stage),
                    timing,
                }
            }
        }
    }

    async fn run_stages(&self, job: &ExtractionJob, run: &mut Run) -> StageResult<PipelineOutput> {
        run.enter(PipelineState::Browsing);
        timed(
            &mut run.timing,
            Stage::Browse,
            self.browse(&job.url, &mut run.session),
        )
        .await?;

        run.enter(PipelineState::Locating);
        let session = live(&run.session, Stage::Locate)?;
        let selector = timed(&mut run.timing, Stage::Locate, self.locate(job, session)).await?;
        info!(%selector, "element located");

        run.enter(PipelineState::Extracting);
        let session = live(&run.session, Stage::Extract)?;
        let extracted = timed(
            &mut run.timing,
            Stage::Extract,
            self.extract(job, session.page(), &selector),
        )
        .await?;

        run.enter(PipelineState::Transforming);
        let hint = job
            .locate
            .as_ref()
            .and_then(LocateSpec::naming_hint)
            .unwrap_or(selector.as_str());
        let component_name = resolve_component_name(job.component_name.as_deref(), Some(hint));
        let request = TransformRequest {
            html: extracted.html.clone(),
            css: extracted.css.clone(),
            framework: job.framework,
            styling: job.styling,
            component_name: component_name.clone(),
        };
        let transformed = timed(&mut run.timing, Stage::Transform, async {
            self.caps
                .transformer
                .transform(request)
                .await
                .map_err(classify_llm_error)
        })
        .await?;

        run.enter(PipelineState::Writing);
        let (files, downloaded_assets, import_path) = timed(&mut run.timing, Stage::Write, async {
            let written = self
                .caps
                .output
                .write(&job.output_dir, &component_name, &transformed)
                .await?;

            let mut assets = written.assets;
            if job.include_assets && !extracted.assets.is_empty() {
                assets.extend(self.download_assets(job, &extracted).await);
            }
            Ok::<_, ExtractError>((written.files, assets, written.import_path))
        })
        .await?;

        Ok(PipelineOutput {
            component_name,
            selector,
            files,
            import_path,
            downloaded_assets,
        })
    }

    /// Normalize the URL, launch a session and navigate.
    ///
    /// The session goes into `slot` as soon as it exists so cleanup sees it
    /// even when navigation fails.
    async fn browse(&self, raw_url: &str, slot: &mut Option<Box<dyn Session>>) -> Result<()> {
        let url = normalize_url(raw_url)?;
        let session = self
            .caps
            .launcher
            .launch()
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;
        let session = slot.insert(session);

        session
            .navigate(url.as_str())
            .await
            .map_err(|e| navigation_error(url.as_str(), e))?;
        info!(url = %url, "page loaded");
        Ok(())
    }

    async fn locate(&self, job: &ExtractionJob, session: &dyn Session) -> Result<String> {
        let result = match &job.locate {
            None => return Err(ExtractError::validation(MISSING_LOCATE_MODE)),
            Some(LocateSpec::Selector(selector)) => Ok(selector.clone()),
            Some(LocateSpec::Query(query)) => self.locate_by_query(session.page(), query).await,
            Some(LocateSpec::Interactive) => session
                .run_interactive_picker()
                .await
                .and_then(|selection| selection.into_result())
                .map(|selection| {
                    info!(
                        tag = %selection.tag_name,
                        text = %selection.text_preview,
                        "element picked"
                    );
                    selection.selector
                }),
        };
        result.map_err(classify_llm_error)
    }

    async fn locate_by_query(&self, page: &dyn Page, query: &str) -> Result<String> {
        let snapshot = self.caps.snapshotter.snapshot(page).await?;
        if snapshot.is_empty() {
            return Err(ExtractError::not_found(format!(
                "'{}' (page has no accessibility tree)",
                query
            )));
        }

        let located = self.caps.locator.locate(&snapshot.tree, query).await?;
        debug!(
            reference = ?located.reference,
            confidence = located.confidence,
            reasoning = %located.reasoning,
            "locate result"
        );

        let Some(reference) = located.reference else {
            return Err(ExtractError::not_found(format!("'{}'", query)));
        };

        self.caps
            .locator
            .resolve_ref(page, &reference)
            .await?
            .ok_or_else(|| {
                ExtractError::not_found(format!(
                    "'{}' (ref {} could not be resolved to a selector)",
                    query, reference
                ))
            })
    }

    async fn extract(
        &self,
        job: &ExtractionJob,
        page: &dyn Page,
        selector: &str,
    ) -> Result<ExtractResult> {
        let extracted = self.caps.extractor.extract(page, selector).await?;

        let (html, css, assets) = (extracted.html.len(), extracted.css.len(), extracted.assets.len());
        if job.verbose {
            info!(html_bytes = html, css_bytes = css, assets, "extracted");
        } else {
            debug!(html_bytes = html, css_bytes = css, assets, "extracted");
        }
        Ok(extracted)
    }

    /// Asset download never fails the job
    async fn download_assets(
        &self,
        job: &ExtractionJob,
        extracted: &ExtractResult,
    ) -> Vec<std::path::PathBuf> {
        let page_is_local = normalize_url(&job.url).is_ok_and(|url| url.scheme() == "file");
        let (allowed, skipped): (Vec<Asset>, Vec<Asset>) = extracted
            .assets
            .iter()
            .cloned()
            .partition(|asset| page_is_local || !is_local_file(&asset.url));
        if !skipped.is_empty() {
            warn!(
                skipped = skipped.len(),
                "ignoring file:// assets referenced by a remote page"
            );
        }
        if allowed.is_empty() {
            return Vec::new();
        }

        match self
            .caps
            .output
            .download_assets(&allowed, &job.output_dir)
            .await
        {
            Ok(downloaded) => {
                if downloaded.len() < allowed.len() {
                    warn!(
                        downloaded = downloaded.len(),
                        found = allowed.len(),
                        "some assets were not downloaded"
                    );
                }
                downloaded.into_iter().map(|a| a.path).collect()
            }
            Err(e) => {
                warn!(error = %e, "asset download failed");
                Vec::new()
            }
        }
    }
}

/// Asset URLs pointing into the local filesystem
fn is_local_file(asset_url: &str) -> bool {
    Url::parse(asset_url).is_ok_and(|url| url.scheme() == "file")
}

/// Untyped browse failures become navigation errors for `url`
fn navigation_error(url: &str, error: ExtractError) -> ExtractError {
    if error.is_typed() {
        error
    } else {
        ExtractError::navigation(url, error.to_string())
    }
}

/// Whether the text before the first `:` is a URL scheme (not `host:port`)
fn has_scheme(input: &str) -> bool {
    match input.split_once(':') {
        Some((scheme, rest)) => {
            !scheme.is_empty()
                && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && !rest.starts_with(|c: char| c.is_ascii_digit())
        }
        None => false,
    }
}

/// Trim, default to https, parse, and allow only http/https/file
pub fn normalize_url(input: &str) -> Result<Url> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ExtractError::navigation(input, "empty URL"));
    }

    let candidate = if has_scheme(trimmed) {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    };

    let url = Url::parse(&candidate)
        .map_err(|e| ExtractError::navigation(trimmed, format!("invalid URL: {}", e)))?;

    if !ALLOWED_SCHEMES.contains(&url.scheme()) {
        return Err(ExtractError::navigation(
            trimmed,
            format!("unsupported protocol '{}:'", url.scheme()),
        ));
    }
    if url.scheme() != "file" && url.host_str().map_or(true, str::is_empty) {
        return Err(ExtractError::navigation(trimmed, "URL has no host"));
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_adds_https() {
        assert_eq!(
            normalize_url("  example.com/pricing ").unwrap().as_str(),
            "https://example.com/pricing"
        );
        assert_eq!(
            normalize_url("localhost:3000").unwrap().as_str(),
            "https://localhost:3000/"
        );
    }

    #[test]
    fn test_normalize_keeps_allowed_schemes() {
        assert_eq!(normalize_url("http://a.test").unwrap().scheme(), "http");
        assert_eq!(normalize_url("file:///tmp/page.html").unwrap().scheme(), "file");
    }

    #[test]
    fn test_local_file_assets() {
        assert!(is_local_file("file:///etc/passwd"));
        assert!(is_local_file("FILE:///tmp/logo.png"));
        assert!(!is_local_file("https://cdn.test/logo.png"));
        assert!(!is_local_file("/etc/passwd"));
    }

    #[test]
    fn test_normalize_rejects() {
        for bad in ["", "not a url", "ftp://files.test", "javascript:alert(1)"] {
            let err = normalize_url(bad).unwrap_err();
            assert!(
                matches!(err, ExtractError::Navigation { .. }),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_navigation_error_keeps_typed() {
        let err = navigation_error("https://a.test", ExtractError::AgentBrowserNotFound);
        assert!(matches!(err, ExtractError::AgentBrowserNotFound));

        let err = navigation_error("https://a.test", ExtractError::browser("net::ERR_NAME"));
        assert!(matches!(err, ExtractError::Navigation { ref url, .. } if url == "https://a.test"));
    }
}
