//! Remote stages backed by a text generator.

use std::sync::Arc;

use scribeflow_common::{Credential, Result, WorkItem};
use scribeflow_pipeline::RemoteStage;

use crate::config::{Config, StageConfig};
use crate::inference::{GeminiClient, InlineAudio};

/// Replaced with the previous stage's output in chain prompts.
pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Something that turns a prompt (and optional audio) into text.
pub trait TextGenerator: Send + Sync {
    fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        audio: Option<&InlineAudio>,
    ) -> Result<String>;
}

impl TextGenerator for GeminiClient {
    fn generate(
        &self,
        credential: &Credential,
        prompt: &str,
        audio: Option<&InlineAudio>,
    ) -> Result<String> {
        GeminiClient::generate(self, credential, prompt, audio)
    }
}

/// Fan-out stage: transcribes one audio segment.
pub struct TranscribeStage {
    generator: Arc<dyn TextGenerator>,
    prompt: String,
}

impl TranscribeStage {
    pub fn new(generator: Arc<dyn TextGenerator>, prompt: impl Into<String>) -> Self {
        Self {
            generator,
            prompt: prompt.into(),
        }
    }
}

impl RemoteStage<WorkItem> for TranscribeStage {
    fn name(&self) -> &str {
        "transcribe"
    }

    fn call(&self, credential: &Credential, item: &WorkItem) -> Result<String> {
        let audio = InlineAudio::from_file(item.path())?;
        tracing::debug!("Transcribing {} ({} bytes)", item, audio.data.len());
        self.generator.generate(credential, &self.prompt, Some(&audio))
    }
}

/// Chain stage: renders a prompt template around the previous output.
pub struct PromptStage {
    generator: Arc<dyn TextGenerator>,
    name: String,
    template: String,
}

impl PromptStage {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        name: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            generator,
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn from_config(generator: Arc<dyn TextGenerator>, stage: &StageConfig) -> Self {
        Self::new(generator, &stage.name, &stage.prompt)
    }

    pub fn render(&self, input: &str) -> String {
        self.template.replace(INPUT_PLACEHOLDER, input)
    }
}

impl RemoteStage<String> for PromptStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, credential: &Credential, input: &String) -> Result<String> {
        self.generator.generate(credential, &self.render(input), None)
    }
}

/// Build the fan-out stage and the chain stages described by `config`.
pub fn build_stages(
    generator: Arc<dyn TextGenerator>,
    config: &Config,
) -> (Arc<TranscribeStage>, Vec<Arc<dyn RemoteStage<String>>>) {
    let transcribe = Arc::new(TranscribeStage::new(
        Arc::clone(&generator),
        &config.transcribe_prompt,
    ));
    let chain = config
        .stages
        .iter()
        .map(|stage| {
            Arc::new(PromptStage::from_config(Arc::clone(&generator), stage))
                as Arc<dyn RemoteStage<String>>
        })
        .collect();
    (transcribe, chain)
}
