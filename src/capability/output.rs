//! Filesystem output capability

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::capability::{Asset, DownloadedAsset, OutputWriter, TransformResult, WriteResult};
use crate::core::{ExtractError, Result, Styling};

/// Subdirectory of the output dir that receives downloaded assets
pub const ASSETS_DIR: &str = "assets";

/// Writes components under the job's output directory
#[derive(Debug, Clone)]
pub struct FsOutputWriter {
    client: Client,
}

impl FsOutputWriter {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ExtractError::config(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Style file name for a component, matching the import the code uses
    pub fn styles_filename(component_name: &str, styling: Styling) -> String {
        match styling {
            Styling::CssModules => format!("{}.module.css", component_name),
            _ => format!("{}.css", component_name),
        }
    }

    async fn fetch(&self, url: &Url, dest: &Path) -> Result<()> {
        match url.scheme() {
            "http" | "https" => {
                let response = self.client.get(url.clone()).send().await?;
                if !response.status().is_success() {
                    return Err(ExtractError::Other(format!("HTTP {}", response.status())));
                }
                let bytes = response.bytes().await?;
                tokio::fs::write(dest, &bytes).await?;
            }
            "file" => {
                let source = url
                    .to_file_path()
                    .map_err(|_| ExtractError::Other(format!("Bad file URL: {}", url)))?;
                tokio::fs::copy(source, dest).await?;
            }
            other => {
                return Err(ExtractError::Other(format!("Unsupported scheme: {}", other)));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl OutputWriter for FsOutputWriter {
    async fn write(
        &self,
        dir: &Path,
        component_name: &str,
        result: &TransformResult,
    ) -> Result<WriteResult> {
        for name in [component_name, result.filename.as_str()] {
            if !is_plain_file_name(name) {
                return Err(ExtractError::output(format!(
                    "Refusing to write '{}' outside {}",
                    name,
                    dir.display()
                )));
            }
        }

        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            ExtractError::output(format!("Cannot create {}: {}", dir.display(), e))
        })?;

        let mut files = Vec::new();

        let code_path = dir.join(&result.filename);
        tokio::fs::write(&code_path, &result.code)
            .await
            .map_err(|e| ExtractError::output(format!("Cannot write {}: {}", code_path.display(), e)))?;
        files.push(code_path);

        if let Some(styles) = result.styles.as_deref().filter(|s| !s.trim().is_empty()) {
            let styles_path = dir.join(Self::styles_filename(component_name, result.styling));
            tokio::fs::write(&styles_path, styles).await.map_err(|e| {
                ExtractError::output(format!("Cannot write {}: {}", styles_path.display(), e))
            })?;
            files.push(styles_path);
        }

        debug!(dir = %dir.display(), files = files.len(), "component written");

        Ok(WriteResult {
            files,
            assets: Vec::new(),
            import_path: format!("./{}", component_name),
        })
    }

    async fn download_assets(&self, assets: &[Asset], dir: &Path) -> Result<Vec<DownloadedAsset>> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }

        let assets_dir = dir.join(ASSETS_DIR);
        tokio::fs::create_dir_all(&assets_dir).await.map_err(|e| {
            ExtractError::output(format!("Cannot create {}: {}", assets_dir.display(), e))
        })?;

        let mut taken = HashSet::new();
        let mut downloaded = Vec::new();

        for (index, asset) in assets.iter().enumerate() {
            let url = match Url::parse(&asset.url) {
                Ok(url) => url,
                Err(e) => {
                    warn!(url = %asset.url, error = %e, "skipping asset with bad URL");
                    continue;
                }
            };

            let name = unique_name(asset_filename(&url, index), &mut taken);
            let dest = assets_dir.join(&name);

            match self.fetch(&url, &dest).await {
                Ok(()) => downloaded.push(DownloadedAsset {
                    url: asset.url.clone(),
                    path: dest,
                }),
                Err(e) => warn!(url = %asset.url, error = %e, "asset download failed"),
            }
        }

        Ok(downloaded)
    }
}

/// Last path segment reduced to a safe file name
pub fn asset_filename(url: &Url, index: usize) -> String {
    let segment = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or_default();

    let clean: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let clean = clean.trim_matches('.').to_string();

    if clean.is_empty() {
        format!("asset-{}", index + 1)
    } else {
        clean
    }
}

fn unique_name(name: String, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.clone()) {
        return name;
    }

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) => (stem.to_string(), format!(".{}", ext)),
        None => (name.clone(), String::new()),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}{}", stem, n, ext);
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Paths relative to `base`, for display
pub fn relative_to(paths: &[PathBuf], base: &Path) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            p.strip_prefix(base)
                .unwrap_or(p.as_path())
                .display()
                .to_string()
        })
        .collect()
}

/// A single path component with no directory parts
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && Path::new(name).file_name() == Some(std::ffi::OsStr::new(name))
}
