//! ffmpeg transcoding: convert a recording to mono AAC, then split it into
//! fixed-length segments.

use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;

use scribeflow_common::{Error, Result, WorkItem};
use tokio::process::Command;

use crate::config::TranscodeConfig;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Builder for one external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl ToolCommand {
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Run the command, capturing stdout and stderr.
    ///
    /// # Errors
    ///
    /// [`Error::Tool`] if spawning fails, the process exits non-zero (message
    /// includes stderr) or the timeout expires.
    pub async fn execute(&self) -> Result<ToolOutput> {
        let program_name = self
            .program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string());

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running {} {}", program_name, self.args.join(" "));

        let child = cmd
            .spawn()
            .map_err(|e| Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}

/// Availability of one external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    pub path: Option<PathBuf>,
}

/// Locate ffmpeg: the configured path if it exists, otherwise `PATH`.
pub fn find_ffmpeg(config: &TranscodeConfig) -> Option<PathBuf> {
    match config.ffmpeg_path.as_deref() {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        _ => which::which("ffmpeg").ok(),
    }
}

/// Report the tools a run needs.
pub fn check_tools(config: &TranscodeConfig) -> Vec<ToolInfo> {
    let path = find_ffmpeg(config);
    vec![ToolInfo {
        name: "ffmpeg".to_string(),
        available: path.is_some(),
        path,
    }]
}

/// Runs the two ffmpeg passes with fixed settings.
#[derive(Debug, Clone)]
pub struct Transcoder {
    ffmpeg: PathBuf,
    config: TranscodeConfig,
}

impl Transcoder {
    pub fn new(ffmpeg: PathBuf, config: TranscodeConfig) -> Self {
        Self { ffmpeg, config }
    }

    /// Resolve ffmpeg from `config`.
    pub fn discover(config: &TranscodeConfig) -> Result<Self> {
        let ffmpeg = find_ffmpeg(config).ok_or_else(|| {
            Error::tool("ffmpeg", "ffmpeg not found; is it installed and in PATH?")
        })?;
        Ok(Self::new(ffmpeg, config.clone()))
    }

    fn command(&self) -> ToolCommand {
        let mut cmd = ToolCommand::new(self.ffmpeg.clone());
        cmd.timeout(Duration::from_secs(self.config.timeout_secs));
        cmd.args(["-hide_banner", "-y"]);
        cmd
    }

    /// Command converting `input` to mono AAC at `output`.
    pub fn convert_command(&self, input: &Path, output: &Path) -> ToolCommand {
        let mut cmd = self.command();
        cmd.arg("-i")
            .arg(input.to_string_lossy())
            .arg("-vn")
            .args(["-ac", "1"])
            .arg("-af")
            .arg(format!(
                "atempo={},aresample={}",
                self.config.tempo, self.config.sample_rate
            ))
            .arg("-ab")
            .arg(&self.config.bitrate)
            .args(["-acodec", "aac"])
            .arg(output.to_string_lossy());
        cmd
    }

    /// Command splitting `input` into `{stem}_split%03d.m4a` under `out_dir`.
    pub fn split_command(&self, input: &Path, out_dir: &Path, stem: &str) -> ToolCommand {
        let pattern = out_dir.join(format!("{stem}_split%03d.m4a"));
        let mut cmd = self.command();
        cmd.arg("-i")
            .arg(input.to_string_lossy())
            .args(["-f", "segment"])
            .arg("-segment_time")
            .arg(self.config.segment_secs.to_string())
            .args(["-c", "copy"])
            .arg(pattern.to_string_lossy());
        cmd
    }

    /// Convert `input` into `audio_dir`, split it into `segment_dir`, and
    /// return the segments as sorted work items.
    pub async fn prepare(
        &self,
        input: &Path,
        audio_dir: &Path,
        segment_dir: &Path,
    ) -> Result<Vec<WorkItem>> {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .ok_or_else(|| Error::Validation(format!("input has no file name: {:?}", input)))?;

        let converted = audio_dir.join(format!("{stem}.m4a"));
        tracing::info!("Converting {:?} -> {:?}", input, converted);
        self.convert_command(input, &converted).execute().await?;

        tracing::info!(
            "Splitting into {}s segments under {:?}",
            self.config.segment_secs,
            segment_dir
        );
        self.split_command(&converted, segment_dir, &stem)
            .execute()
            .await?;

        let segments = list_segments(segment_dir)?;
        if segments.is_empty() {
            return Err(Error::tool("ffmpeg", "split produced no segments"));
        }
        tracing::info!("Produced {} segment(s)", segments.len());
        Ok(segments)
    }
}

/// List `*.m4a` files directly under `dir`, sorted.
pub fn list_segments(dir: &Path) -> Result<Vec<WorkItem>> {
    if !dir.is_dir() {
        return Err(Error::Validation(format!("not a directory: {:?}", dir)));
    }
    let mut items: Vec<WorkItem> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            e.path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("m4a"))
        })
        .map(|e| WorkItem::new(e.into_path()))
        .collect();
    items.sort();
    Ok(items)
}
