//! Shared helpers for integration tests.
//!
//! Provides a scripted [`TextGenerator`] that needs no network, plus builders
//! for coordinators, configs and on-disk segment fixtures.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use scribeflow::config::{Config, StageConfig};
use scribeflow::inference::InlineAudio;
use scribeflow::stages::TextGenerator;
use scribeflow_common::{Credential, Error, Result, WorkItem};
use scribeflow_keys::{CredentialRegistry, LeaseCoordinator};

/// One recorded generator call.
#[derive(Debug, Clone)]
pub struct Call {
    pub key: String,
    pub prompt: String,
    pub audio: Option<Vec<u8>>,
}

/// Generator that echoes its input and can be told to fail.
///
/// - Audio calls return the audio bytes as text.
/// - Prompt calls return `"<stage>(<prompt>)"` where the stage name is the
///   first word of the prompt.
/// - Keys listed in `rejected_keys` always get `CredentialRejected`.
/// - Prompts containing any of `failing_prompts` always fail.
#[derive(Default)]
pub struct ScriptedGenerator {
    pub rejected_keys: Vec<String>,
    pub failing_prompts: Vec<String>,
    pub calls: Mutex<Vec<Call>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, key: &str) -> Self {
        self.rejected_keys.push(key.to_string());
        self
    }

    pub fn failing_on(mut self, prompt_fragment: &str) -> Self {
        self.failing_prompts.push(prompt_fragment.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl TextGenerator for ScriptedGenerator {
    fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        audio: Option<&InlineAudio>,
    ) -> Result<String> {
        self.calls.lock().push(Call {
            key: credential.expose().to_string(),
            prompt: prompt.to_string(),
            audio: audio.map(|a| a.data.clone()),
        });

        if self.rejected_keys.iter().any(|k| k == credential.expose()) {
            return Err(Error::rejected(credential.hint(), "HTTP 429: quota exceeded"));
        }
        if self.failing_prompts.iter().any(|p| prompt.contains(p.as_str())) {
            return Err(Error::transient("HTTP 503: unavailable"));
        }

        match audio {
            Some(audio) => Ok(String::from_utf8_lossy(&audio.data).to_string()),
            None => {
                let stage = prompt.split_whitespace().next().unwrap_or_default();
                Ok(format!("{stage}({prompt})"))
            }
        }
    }
}

/// Coordinator over `n` keys named `key-0`, `key-1`, ...
pub fn coordinator(n: usize, cursor: Option<usize>) -> Arc<LeaseCoordinator> {
    let registry = CredentialRegistry::from_values((0..n).map(|i| format!("key-{i}")));
    Arc::new(LeaseCoordinator::new(registry, cursor))
}

/// Config with no retry delay and two chain stages named `edit` and
/// `magazine` whose prompts start with their own names.
pub fn test_config(concurrency: usize, max_attempts: u32) -> Config {
    let mut config = Config::default();
    config.pipeline.concurrency = concurrency;
    config.pipeline.max_attempts = max_attempts;
    config.pipeline.retry_delay_secs = 0;
    config.stages = vec![
        StageConfig {
            name: "edit".into(),
            prompt: "edit {input}".into(),
            output_file: "z2_edited.txt".into(),
        },
        StageConfig {
            name: "magazine".into(),
            prompt: "magazine {input}".into(),
            output_file: "z3_magazine.md".into(),
        },
    ];
    config
}

/// Write `count` segment files whose contents are `seg0`, `seg1`, ... and
/// return them as work items in reverse order so callers exercise sorting.
pub fn write_segments(dir: &Path, count: usize) -> Vec<WorkItem> {
    let mut items: Vec<WorkItem> = (0..count)
        .map(|i| {
            let path = dir.join(format!("talk_split{i:03}.m4a"));
            std::fs::write(&path, format!("seg{i}")).expect("failed to write segment");
            WorkItem::new(path)
        })
        .collect();
    items.reverse();
    items
}

/// Read a file under `dir` to a string.
pub fn read(dir: &Path, name: &str) -> String {
    std::fs::read_to_string(dir.join(name)).unwrap_or_else(|e| panic!("read {name}: {e}"))
}
