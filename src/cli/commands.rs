//! CLI commands
//!
//! Each subcommand builds the production capabilities from the loaded config,
//! runs, and prints its result to stdout. Diagnostics go through `tracing`.

use serde::Serialize;
use std::process::ExitCode;
use tracing::warn;

use crate::capability::{locate_many, Capabilities, Session};
use crate::cli::{BatchArgs, Cli, Command, ConfigCommand, ExtractArgs, LocateArgs};
use crate::core::{Config, ErrorKind, ExtractError, ExtractionJob, JobDefaults, SessionMode};
use crate::pipeline::{
    normalize_url, BatchResult, BatchRunner, BatchSpec, Pipeline, PipelineOutcome,
};

/// Load the config file (or the one given with `--config`) and apply global flags
pub fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    if cli.debug {
        config.debug = true;
    }
    if cli.headed {
        config.browser.headed = true;
    }

    Ok(config)
}

/// Dispatch a parsed command line
pub async fn run(cli: Cli, config: Config) -> anyhow::Result<ExitCode> {
    match cli.command {
        Command::Extract(args) => extract(args, config).await,
        Command::Batch(args) => batch(args, config).await,
        Command::Locate(args) => locate(args, config).await,
        Command::Config(cmd) => config_command(cmd, &config),
    }
}

async fn extract(args: ExtractArgs, mut config: Config) -> anyhow::Result<ExitCode> {
    // The picker needs a window to click in
    if args.interactive {
        config.browser.headed = true;
    }

    let mut builder = ExtractionJob::builder(args.url)
        .interactive(args.interactive)
        .framework(args.framework)
        .styling(args.styling)
        .output_dir(args.out)
        .component_name(args.name)
        .include_assets(args.assets.then_some(true))
        .verbose(args.verbose)
        .defaults(JobDefaults::from_config(&config));
    if let Some(selector) = args.selector {
        builder = builder.selector(selector);
    }
    if let Some(query) = args.find {
        builder = builder.query(query);
    }
    let job = builder.build()?;

    let pipeline = Pipeline::new(Capabilities::from_config(&config)?);
    let outcome = pipeline.run(&job).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome.report())?);
    } else {
        print_outcome(&outcome);
    }

    Ok(exit_code(outcome.is_success()))
}

fn print_outcome(outcome: &PipelineOutcome) {
    let timing = outcome.timing();
    match outcome {
        PipelineOutcome::Success { output, .. } => {
            println!("✓ Extracted {} ({})", output.component_name, output.selector);
            for file in &output.files {
                println!("  {}", file.display());
            }
            if !output.downloaded_assets.is_empty() {
                println!("  + {} asset(s)", output.downloaded_assets.len());
            }
            println!();
            println!("  import {} from '{}'", output.component_name, output.import_path);
        }
        PipelineOutcome::Failure { error, stage, .. } => {
            match stage {
                Some(stage) => println!("✗ Failed during {}: {}", stage, error),
                None => println!("✗ Failed: {}", error),
            }
            if let Some(hint) = hint_for(error) {
                println!("  {}", hint);
            }
        }
    }
    println!(
        "  browse {}ms · locate {}ms · extract {}ms · transform {}ms · write {}ms · total {}ms",
        timing.browse, timing.locate, timing.extract, timing.transform, timing.write, timing.total
    );
}

fn hint_for(error: &ExtractError) -> Option<&'static str> {
    match error.kind() {
        ErrorKind::Unavailable => Some("Is Ollama running? Start it with: ollama serve"),
        ErrorKind::Timeout => Some("Raise llm.timeout_secs in the config file or try a smaller model"),
        ErrorKind::ElementNotFound => Some("Try a more specific description or pass --selector"),
        _ => None,
    }
}

async fn batch(args: BatchArgs, config: Config) -> anyhow::Result<ExitCode> {
    let spec = BatchSpec::from_file(&args.file)?;

    let mut runner = BatchRunner::new(Capabilities::from_config(&config)?, &config);
    if args.shared_session {
        runner = runner.with_session_mode(SessionMode::Shared);
    }

    let result = runner.run(&spec).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_batch(&result);
    }

    Ok(exit_code(result.failed == 0))
}

fn print_batch(result: &BatchResult) {
    for job in &result.results {
        match (&job.result, &job.error) {
            (Some(output), _) => println!(
                "✓ {} → {} ({}ms)",
                job.name, output.import_path, job.timing.total
            ),
            (None, error) => println!(
                "✗ {}: {}",
                job.name,
                error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
    println!();
    println!(
        "{}/{} succeeded, {} failed in {}ms",
        result.succeeded, result.total, result.failed, result.total_time_ms
    );
}

/// One answer of `uigrab locate`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocateRow {
    query: String,
    #[serde(rename = "ref", skip_serializing_if = "Option::is_none")]
    reference: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<String>,
    confidence: f32,
    #[serde(skip_serializing_if = "String::is_empty")]
    reasoning: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn locate(args: LocateArgs, config: Config) -> anyhow::Result<ExitCode> {
    let url = normalize_url(&args.url)?;
    let caps = Capabilities::from_config(&config)?;

    let session = caps.launcher.launch().await?;
    let rows = locate_on_page(&caps, session.as_ref(), url.as_str(), &args.find).await;
    if let Err(e) = session.close().await {
        warn!(error = %e, "failed to close browser session");
    }
    let rows = rows?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        for row in &rows {
            match (&row.selector, &row.error) {
                (Some(selector), _) => println!(
                    "✓ {} → {} ({:.0}%)",
                    row.query,
                    selector,
                    row.confidence * 100.0
                ),
                (None, Some(error)) => println!("✗ {}: {}", row.query, error),
                (None, None) => println!("✗ {}: no matching element", row.query),
            }
        }
    }

    Ok(exit_code(rows.iter().all(|row| row.selector.is_some())))
}

async fn locate_on_page(
    caps: &Capabilities,
    session: &dyn Session,
    url: &str,
    queries: &[String],
) -> crate::core::Result<Vec<LocateRow>> {
    session.navigate(url).await?;
    let page = session.page();
    let snapshot = caps.snapshotter.snapshot(page).await?;
    if snapshot.is_empty() {
        return Err(ExtractError::not_found("the page has no accessible elements"));
    }

    let answers = locate_many(caps.locator.as_ref(), &snapshot.tree, queries).await;

    let mut rows = Vec::with_capacity(queries.len());
    for (query, answer) in queries.iter().zip(answers) {
        let row = match answer {
            Ok(found) => {
                let selector = match &found.reference {
                    Some(reference) => caps.locator.resolve_ref(page, reference).await?,
                    None => None,
                };
                LocateRow {
                    query: query.clone(),
                    reference: found.reference,
                    selector,
                    confidence: found.confidence,
                    reasoning: found.reasoning,
                    error: None,
                }
            }
            Err(e) => LocateRow {
                query: query.clone(),
                reference: None,
                selector: None,
                confidence: 0.0,
                reasoning: String::new(),
                error: Some(e.to_string()),
            },
        };
        rows.push(row);
    }

    Ok(rows)
}

fn config_command(cmd: ConfigCommand, config: &Config) -> anyhow::Result<ExitCode> {
    match cmd {
        ConfigCommand::Show => {
            print!("{}", config.to_toml());
        }
        ConfigCommand::Path => {
            println!("{}", Config::config_file().display());
        }
        ConfigCommand::Init { force } => {
            if Config::config_exists() && !force {
                println!(
                    "Config already exists at {} (use --force to overwrite)",
                    Config::config_file().display()
                );
                return Ok(ExitCode::FAILURE);
            }
            let path = Config::default().save()?;
            println!("Wrote {}", path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn exit_code(success: bool) -> ExitCode {
    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
