use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use scribeflow_keys::{DEFAULT_CURSOR_FILE, DEFAULT_ENV_PREFIX};
use scribeflow_pipeline::{ControllerConfig, RetryPolicy};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub inference: InferenceConfig,

    #[serde(default)]
    pub transcode: TranscodeConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub logs: LogsConfig,

    /// Prompt sent with every audio segment.
    #[serde(default = "default_transcribe_prompt")]
    pub transcribe_prompt: String,

    /// Sequential stages run on the combined transcript, in order.
    #[serde(default = "default_stages")]
    pub stages: Vec<StageConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: CredentialsConfig::default(),
            pipeline: PipelineConfig::default(),
            inference: InferenceConfig::default(),
            transcode: TranscodeConfig::default(),
            workspace: WorkspaceConfig::default(),
            logs: LogsConfig::default(),
            transcribe_prompt: default_transcribe_prompt(),
            stages: default_stages(),
        }
    }
}

fn default_transcribe_prompt() -> String {
    "Transcribe the speech in this audio verbatim. Output only the transcript text.".to_string()
}

fn default_stages() -> Vec<StageConfig> {
    vec![
        StageConfig {
            name: "edit".to_string(),
            prompt: "Edit the following transcript into clean, readable prose. \
                     Fix recognition errors and remove filler words without \
                     changing the meaning.\n\n{input}"
                .to_string(),
            output_file: "z2_edited.txt".to_string(),
        },
        StageConfig {
            name: "magazine".to_string(),
            prompt: "Rewrite the following text as a magazine-style article in \
                     Markdown with a title and section headings.\n\n{input}"
                .to_string(),
            output_file: "z3_magazine.md".to_string(),
        },
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Environment variable prefix: `PREFIX`, `PREFIX_1`, `PREFIX_2`, ...
    #[serde(default = "default_env_prefix")]
    pub env_prefix: String,

    /// Where the rotation cursor is persisted between runs.
    #[serde(default = "default_cursor_path")]
    pub cursor_path: PathBuf,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            env_prefix: default_env_prefix(),
            cursor_path: default_cursor_path(),
        }
    }
}

fn default_env_prefix() -> String {
    DEFAULT_ENV_PREFIX.to_string()
}

fn default_cursor_path() -> PathBuf {
    PathBuf::from(DEFAULT_CURSOR_FILE)
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Maximum transcription calls in flight.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Remote calls per unit of work before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed pause between attempts, in seconds.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// Inserted between segment transcripts when combining.
    #[serde(default)]
    pub combine_separator: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_attempts: default_max_attempts(),
            retry_delay_secs: default_retry_delay(),
            combine_separator: String::new(),
        }
    }
}

impl PipelineConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_secs(self.retry_delay_secs))
    }

    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            concurrency: self.concurrency,
            retry: self.retry_policy(),
            separator: self.combine_separator.clone(),
        }
    }
}

fn default_concurrency() -> usize {
    1
}

fn default_max_attempts() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InferenceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_inference_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_inference_timeout(),
            temperature: default_temperature(),
            max_output_tokens: default_max_output_tokens(),
        }
    }
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_inference_timeout() -> u64 {
    600
}

fn default_temperature() -> f32 {
    0.1
}

fn default_max_output_tokens() -> u32 {
    50_000
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranscodeConfig {
    /// Custom ffmpeg path; falls back to `PATH` lookup.
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Segment length in seconds.
    #[serde(default = "default_segment_secs")]
    pub segment_secs: u64,

    /// Playback speed factor applied while converting.
    #[serde(default = "default_tempo")]
    pub tempo: f64,

    #[serde(default = "default_bitrate")]
    pub bitrate: String,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Timeout for a single ffmpeg invocation, in seconds.
    #[serde(default = "default_transcode_timeout")]
    pub timeout_secs: u64,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            segment_secs: default_segment_secs(),
            tempo: default_tempo(),
            bitrate: default_bitrate(),
            sample_rate: default_sample_rate(),
            timeout_secs: default_transcode_timeout(),
        }
    }
}

fn default_segment_secs() -> u64 {
    240
}

fn default_tempo() -> f64 {
    1.3
}

fn default_bitrate() -> String {
    "64k".to_string()
}

fn default_sample_rate() -> u32 {
    44_100
}

fn default_transcode_timeout() -> u64 {
    3600
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Directory scanned for new recordings.
    #[serde(default = "default_inbox")]
    pub inbox: PathBuf,

    /// Scratch directory, recreated on every run.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            inbox: default_inbox(),
            work_dir: default_work_dir(),
        }
    }
}

fn default_inbox() -> PathBuf {
    PathBuf::from("inbox")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("work")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogsConfig {
    #[serde(default = "default_success_log")]
    pub success_log: PathBuf,

    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            success_log: default_success_log(),
            failure_log: default_failure_log(),
        }
    }
}

fn default_success_log() -> PathBuf {
    PathBuf::from("processed_success.log")
}

fn default_failure_log() -> PathBuf {
    PathBuf::from("processed_failure.log")
}

/// One stage of the sequential chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StageConfig {
    pub name: String,

    /// Prompt template; `{input}` is replaced with the previous stage's output.
    pub prompt: String,

    /// File name under the output directory.
    pub output_file: String,
}
