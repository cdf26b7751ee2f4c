//! `scribeflow run`: pick a recording, transcode it, run the pipeline, and
//! record the outcome.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use scribeflow_common::{Error, WorkItem};
use scribeflow_keys::{CredentialRegistry, LeaseCoordinator, RotationCursor};
use scribeflow_pipeline::{PipelineController, PipelineReport, PipelineState, RemoteStage};
use tracing::Instrument;

use crate::config::Config;
use crate::inbox::{InboxEntry, InboxSource};
use crate::inference::GeminiClient;
use crate::outcome_log::OutcomeLog;
use crate::stages::{build_stages, TextGenerator};
use crate::transcode::Transcoder;

/// File name of the combined segment transcripts.
pub const COMBINED_FILE: &str = "z1_combined.txt";

/// Scratch layout under the work directory.
#[derive(Debug, Clone)]
pub struct WorkDirs {
    pub root: PathBuf,
    pub downloads: PathBuf,
    pub audio: PathBuf,
    pub segments: PathBuf,
    pub output: PathBuf,
}

impl WorkDirs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            downloads: root.join("downloads"),
            audio: root.join("audio"),
            segments: root.join("segments"),
            output: root.join("output"),
            root,
        }
    }

    /// Remove leftovers from a previous run and create every directory.
    pub fn recreate(&self) -> Result<()> {
        for dir in [&self.downloads, &self.audio, &self.segments, &self.output] {
            if dir.exists() {
                std::fs::remove_dir_all(dir)
                    .with_context(|| format!("Failed to clear {:?}", dir))?;
            }
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {:?}", dir))?;
        }
        Ok(())
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunSummary {
    /// Nothing waiting in the inbox.
    Idle,
    /// Every stage succeeded.
    Completed {
        entry: InboxEntry,
        output_dir: PathBuf,
        written: Vec<PathBuf>,
    },
    /// The pipeline stopped early.
    Aborted {
        entry: InboxEntry,
        stage: String,
        reason: String,
    },
}

/// Run the pipeline over `segments`, writing the combined transcript and
/// every chain stage output under `output_dir`.
///
/// Outputs are written for whatever completed, even if a later stage
/// aborted.
pub async fn process_segments(
    config: &Config,
    coordinator: Arc<LeaseCoordinator>,
    generator: Arc<dyn TextGenerator>,
    segments: Vec<WorkItem>,
    output_dir: &Path,
) -> Result<(PipelineReport, Vec<PathBuf>)> {
    let (transcribe, chain) = build_stages(generator, config);
    let mut controller = PipelineController::new(coordinator, config.pipeline.controller_config());

    let report = controller
        .run(transcribe as Arc<dyn RemoteStage<WorkItem>>, &chain, segments)
        .await;

    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output dir {:?}", output_dir))?;

    let mut written = Vec::new();
    if let Some(combined) = &report.combined {
        let path = output_dir.join(COMBINED_FILE);
        write_output(&path, combined)?;
        written.push(path);
    }

    for (outcome, stage) in report.chain.iter().zip(&config.stages) {
        if let Ok(text) = &outcome.result {
            let path = output_dir.join(&stage.output_file);
            write_output(&path, text)?;
            written.push(path);
        }
    }

    Ok((report, written))
}

fn write_output(path: &Path, text: &str) -> Result<()> {
    std::fs::write(path, text).with_context(|| format!("Failed to write {:?}", path))?;
    tracing::info!("Wrote {:?} ({} bytes)", path, text.len());
    Ok(())
}

/// Full `run` command.
///
/// The rotation cursor is saved on every exit path once the pool is loaded.
pub async fn run(config: &Config, input: Option<&Path>) -> Result<RunSummary> {
    let registry = CredentialRegistry::from_env(&config.credentials.env_prefix);
    if registry.is_empty() {
        return Err(Error::NoCredentialsAvailable).with_context(|| {
            format!(
                "Set {} (and optionally {}_1, {}_2, ...)",
                config.credentials.env_prefix,
                config.credentials.env_prefix,
                config.credentials.env_prefix
            )
        });
    }

    let cursor = RotationCursor::new(&config.credentials.cursor_path);
    let pool_size = registry.len();
    let start = cursor.load(pool_size);
    let coordinator = Arc::new(LeaseCoordinator::new(registry, start));
    tracing::info!("Key rotation resumes after {}", coordinator.last_used());

    let generator: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(config.inference.clone()));
    let run_id = uuid::Uuid::new_v4();
    let result = run_with(config, Arc::clone(&coordinator), generator, input)
        .instrument(tracing::info_span!("run", id = %run_id))
        .await;

    cursor.save(coordinator.cursor(), pool_size);
    tracing::info!(
        "Granted {} lease(s); last used {}",
        coordinator.leases_granted(),
        coordinator.last_used()
    );

    result
}

async fn run_with(
    config: &Config,
    coordinator: Arc<LeaseCoordinator>,
    generator: Arc<dyn TextGenerator>,
    input: Option<&Path>,
) -> Result<RunSummary> {
    let dirs = WorkDirs::new(&config.workspace.work_dir);
    dirs.recreate()?;

    let log = OutcomeLog::new(&config.logs.success_log, &config.logs.failure_log);
    let inbox = InboxSource::new(&config.workspace.inbox);

    let (entry, local) = match input {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Input file does not exist: {:?}", path);
            }
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.to_string_lossy().to_string());
            let entry = InboxEntry {
                id: name.clone(),
                name,
                path: path.to_path_buf(),
            };
            (entry, path.to_path_buf())
        }
        None => {
            let Some(entry) = inbox.next(&log.processed_ids()) else {
                tracing::info!("No unprocessed recordings in {:?}", inbox.dir());
                return Ok(RunSummary::Idle);
            };
            let local = match inbox.fetch(&entry, &dirs.downloads) {
                Ok(p) => p,
                Err(e) => {
                    log.record_failure(&entry.id, &entry.name, &e.to_string());
                    return Err(e).context("Failed to fetch recording");
                }
            };
            (entry, local)
        }
    };

    tracing::info!("Processing {}", entry.name);

    let segments = match prepare_segments(config, &local, &dirs).await {
        Ok(s) => s,
        Err(e) => {
            log.record_failure(&entry.id, &entry.name, &e.to_string());
            return Err(e).context("Failed to transcode recording");
        }
    };

    let (report, written) =
        match process_segments(config, coordinator, generator, segments, &dirs.output).await {
            Ok(r) => r,
            Err(e) => {
                log.record_failure(&entry.id, &entry.name, &e.to_string());
                return Err(e);
            }
        };

    match report.state {
        PipelineState::Completed => {
            log.record_success(&entry.id, &entry.name);
            Ok(RunSummary::Completed {
                entry,
                output_dir: dirs.output,
                written,
            })
        }
        PipelineState::Aborted { stage, reason } => {
            log.record_failure(&entry.id, &entry.name, &format!("{stage}: {reason}"));
            Ok(RunSummary::Aborted {
                entry,
                stage,
                reason,
            })
        }
        other => Err(anyhow::anyhow!("Pipeline ended in non-terminal state {other}")),
    }
}

async fn prepare_segments(config: &Config, input: &Path, dirs: &WorkDirs) -> Result<Vec<WorkItem>> {
    let transcoder = Transcoder::discover(&config.transcode)?;
    Ok(transcoder.prepare(input, &dirs.audio, &dirs.segments).await?)
}
