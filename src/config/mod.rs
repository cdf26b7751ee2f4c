mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

use crate::stages::INPUT_PLACEHOLDER;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./scribeflow.toml",
        "./config.toml",
        "~/.config/scribeflow/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.credentials.env_prefix.trim().is_empty() {
        anyhow::bail!("credentials.env_prefix cannot be empty");
    }

    if config.pipeline.concurrency == 0 {
        anyhow::bail!("pipeline.concurrency must be at least 1");
    }

    if config.pipeline.max_attempts == 0 {
        anyhow::bail!("pipeline.max_attempts must be at least 1");
    }

    if config.inference.model.trim().is_empty() {
        anyhow::bail!("inference.model cannot be empty");
    }

    if config.transcode.segment_secs == 0 {
        anyhow::bail!("transcode.segment_secs must be at least 1");
    }

    if !(0.5..=100.0).contains(&config.transcode.tempo) {
        anyhow::bail!(
            "transcode.tempo must be between 0.5 and 100.0, got {}",
            config.transcode.tempo
        );
    }

    if config.transcribe_prompt.trim().is_empty() {
        anyhow::bail!("transcribe_prompt cannot be empty");
    }

    let mut names = HashSet::new();
    for stage in &config.stages {
        if stage.name.trim().is_empty() {
            anyhow::bail!("Stage name cannot be empty");
        }
        if !names.insert(stage.name.as_str()) {
            anyhow::bail!("Duplicate stage name '{}'", stage.name);
        }
        if stage.output_file.trim().is_empty() {
            anyhow::bail!("Stage '{}' has no output_file", stage.name);
        }
        if !stage.prompt.contains(INPUT_PLACEHOLDER) {
            tracing::warn!(
                "Stage '{}' prompt has no {} placeholder; the previous output will be ignored",
                stage.name,
                INPUT_PLACEHOLDER
            );
        }
    }

    if !config.workspace.inbox.exists() {
        tracing::warn!("Inbox does not exist: {:?}", config.workspace.inbox);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.credentials.env_prefix, "GOOGLE_API_KEY");
        assert_eq!(config.credentials.cursor_path, Path::new(".session_data.json"));
        assert_eq!(config.pipeline.max_attempts, 10);
        assert_eq!(config.pipeline.retry_delay_secs, 10);
        assert_eq!(config.pipeline.combine_separator, "");
        assert_eq!(config.inference.max_output_tokens, 50_000);
        assert_eq!(config.transcode.segment_secs, 240);
        assert_eq!(config.stages.len(), 2);
        assert_eq!(config.stages[0].name, "edit");
        assert_eq!(config.stages[1].name, "magazine");
        validate_config(&config).unwrap();
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
[pipeline]
concurrency = 4
retry_delay_secs = 2

[credentials]
env_prefix = "MY_KEY"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.pipeline.concurrency, 4);
        assert_eq!(config.pipeline.max_attempts, 10);
        assert_eq!(config.credentials.env_prefix, "MY_KEY");
        assert_eq!(config.inference.model, "gemini-2.5-flash");

        let controller = config.pipeline.controller_config();
        assert_eq!(controller.concurrency, 4);
        assert_eq!(controller.retry.delay.as_secs(), 2);
    }

    #[test]
    fn test_custom_stages_replace_defaults() {
        let file = write_config(
            r#"
[[stages]]
name = "summary"
prompt = "Summarise: {input}"
output_file = "summary.txt"
"#,
        );
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.stages.len(), 1);
        assert_eq!(config.stages[0].output_file, "summary.txt");
    }

    #[test]
    fn test_empty_stage_list_is_valid() {
        let file = write_config("stages = []\n");
        let config = load_config(file.path()).unwrap();
        assert!(config.stages.is_empty());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        let file = write_config("[pipeline]\nconcurrency = 0\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_duplicate_stage_rejected() {
        let file = write_config(
            r#"
[[stages]]
name = "a"
prompt = "{input}"
output_file = "a.txt"

[[stages]]
name = "a"
prompt = "{input}"
output_file = "b.txt"
"#,
        );
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Duplicate stage"));
    }

    #[test]
    fn test_invalid_toml() {
        let file = write_config("[pipeline\n");
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/scribeflow.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
